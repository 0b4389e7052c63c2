use anyhow::Result;
use tabsniff::testing::*;
use tabsniff::{CellValue, Dialect, Row};

#[test]
fn fixture_positions() {
    let fixture = annotations_fixture();
    assert_eq!(fixture.header_line(), Some(2));
    assert_eq!(fixture.data_start(), 3);
    assert_eq!(fixture.build().lines().count(), 8);

    let bare = DsvFixture::new(b',').row(["1"]);
    assert_eq!(bare.header_line(), None);
    assert_eq!(bare.data_start(), 0);
}

#[test]
fn fixture_dialect_and_line_endings() {
    let text = DsvFixture::with_dialect(Dialect::tsv())
        .header(["a", "b"])
        .row(["1", "2"])
        .crlf()
        .build();
    assert_eq!(text, "a\tb\r\n1\t2\r\n");
}

#[test]
fn temp_files_hold_the_text() -> Result<()> {
    let file = write_temp_with_extension("x,y\n", "tsv")?;
    assert!(file.path().to_string_lossy().ends_with(".tsv"));
    assert_eq!(read_text(file.path())?, "x,y\n");
    Ok(())
}

#[test]
fn concat_propagates_errors() {
    let chunks = vec![
        Ok(vec![Row::from_pairs(0, [("a", CellValue::Int(1))])]),
        Err(tabsniff::TabError::EmptySource),
    ];
    assert!(concat_chunks(chunks).is_err());
}

#[test]
fn chunk_shape_accepts_short_tail() {
    let row = || Row::from_pairs(0, [("a", 1i64)]);
    assert_chunk_sizes(&[vec![row(), row()], vec![row()]], 2);
    assert_chunk_sizes(&[vec![]], 2);
}

#[test]
#[should_panic(expected = "chunk 0 holds 1 rows")]
fn chunk_shape_rejects_short_middle() {
    let row = || Row::from_pairs(0, [("a", 1i64)]);
    assert_chunk_sizes(&[vec![row()], vec![row()]], 2);
}

#[test]
#[should_panic(expected = "Row count mismatch")]
fn rows_equal_reports_length() {
    let row = Row::from_pairs(0, [("a", 1i64)]);
    assert_rows_equal(&[row.clone(), row.clone()], &[row]);
}
