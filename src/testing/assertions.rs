//! Assertions over rows and chunk streams.

use crate::error::Result;
use crate::row::Row;

/// Flatten a chunk stream into its rows, propagating the first error.
///
/// # Errors
/// The first error yielded by `chunks`.
pub fn concat_chunks<I>(chunks: I) -> Result<Vec<Row>>
where
    I: IntoIterator<Item = Result<Vec<Row>>>,
{
    let mut rows = Vec::new();
    for chunk in chunks {
        rows.extend(chunk?);
    }
    Ok(rows)
}

/// Assert that rows match in order and content.
///
/// # Panics
///
/// Panics with the first differing position if the rows differ.
pub fn assert_rows_equal(actual: &[Row], expected: &[Row]) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "Row count mismatch:\n  Expected: {}\n  Actual: {}",
        expected.len(),
        actual.len()
    );
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert_eq!(a, e, "Row mismatch at index {i}:\n  Expected: {e:?}\n  Actual: {a:?}");
    }
}

/// Assert that every chunk but the last holds exactly `chunksize` rows and
/// the last holds between zero and `chunksize`.
///
/// # Panics
///
/// Panics when the chunk sizes break that shape or there are no chunks.
pub fn assert_chunk_sizes(chunks: &[Vec<Row>], chunksize: usize) {
    let Some((last, full)) = chunks.split_last() else {
        panic!("a read must yield at least one chunk");
    };
    for (i, chunk) in full.iter().enumerate() {
        assert_eq!(chunk.len(), chunksize, "chunk {i} holds {} rows", chunk.len());
    }
    assert!(
        last.len() <= chunksize,
        "last chunk holds {} rows, more than {chunksize}",
        last.len()
    );
}

/// Assert that `predicate` holds for every row.
///
/// # Panics
///
/// Panics naming the source line of the first row that fails.
pub fn assert_all_rows<F>(rows: &[Row], predicate: F)
where
    F: Fn(&Row) -> bool,
{
    if let Some(bad) = rows.iter().find(|r| !predicate(r)) {
        panic!("row from line {} failed the predicate: {bad:?}", bad.line());
    }
}
