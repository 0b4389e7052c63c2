use anyhow::Result;
use std::io::Cursor;
use tabsniff::testing::*;
use tabsniff::{CellValue, HeaderSpec, ReadOptions, Reader, TabError};

fn annotations() -> Reader {
    let _ = env_logger::builder().is_test(true).try_init();
    Reader::new(Cursor::new(annotations_fixture().build()))
}

#[test]
fn header_line_override_moves_metadata() -> Result<()> {
    let mut reader = annotations();
    reader.set_header(HeaderSpec::Line(1))?;

    let header = reader.header()?.clone();
    assert_eq!(header.line, Some(1));
    assert_eq!(header.names, ["Recorded_by:_lab_3"]);
    assert_eq!(header.string.as_deref(), Some("Recorded by: lab 3"));
    assert_eq!(reader.metadata()?.lines, 0..1);
    assert_eq!(reader.metadata()?.string.as_deref(), Some("Experiment: open field"));
    assert_eq!(reader.data_start()?, 2);
    Ok(())
}

#[test]
fn header_line_beyond_the_source_fails_and_keeps_the_old_header() -> Result<()> {
    let mut reader = annotations();
    assert!(matches!(
        reader.set_header(HeaderSpec::Line(40)),
        Err(TabError::SourceExhausted { line: 40 })
    ));
    assert_eq!(reader.header_spec(), &HeaderSpec::Sniffed);
    assert_eq!(reader.header()?.line, Some(2));
    Ok(())
}

#[test]
fn explicit_names_are_sanitized() -> Result<()> {
    let mut reader = annotations();
    reader.set_header(HeaderSpec::Names(vec![" trial no ".into(), "t".into(), "t".into()]))?;
    assert_eq!(reader.header()?.names, ["trial_no", "t_0", "t_1"]);
    assert_eq!(reader.header()?.line, None);
    // the sniffed boundary still applies
    assert_eq!(reader.data_start()?, 3);

    let rows = concat_chunks(reader.read(ReadOptions::default())?)?;
    assert_eq!(rows[0].get("trial_no"), Some(&CellValue::Int(1)));
    assert_eq!(rows[0].get("t_1"), Some(&CellValue::from("resting")));
    Ok(())
}

#[test]
fn names_must_match_the_column_count() {
    let mut reader = annotations();
    let err = reader.set_header(HeaderSpec::Names(vec!["a".into(), "b".into()]));
    assert!(matches!(err, Err(TabError::HeaderLength { expected: 3, got: 2 })));
}

#[test]
fn generic_names_and_back_to_sniffed() -> Result<()> {
    let mut reader = annotations();
    reader.set_header(HeaderSpec::Generic)?;
    assert_eq!(reader.header()?.names, ["Column_0", "Column_1", "Column_2"]);
    let rows = concat_chunks(reader.read(ReadOptions::default())?)?;
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[4].get("Column_2"), Some(&CellValue::from("grooming")));

    reader.set_header(HeaderSpec::Sniffed)?;
    assert_eq!(reader.header()?.names, ["Number", "Start_Time", "Annotation"]);
    Ok(())
}

#[test]
fn spaced_and_repeated_sniffed_names_are_repaired() -> Result<()> {
    let text = DsvFixture::new(b'\t')
        .header(["Start Time", "Value", "Value", "Note"])
        .row(["10:00:00", "1.5", "2", "ok"])
        .row(["10:00:01", "1.7", "3", "ok"])
        .row(["10:00:02", "1.9", "4", "late"])
        .build();
    let _ = env_logger::builder().is_test(true).try_init();
    let mut reader = Reader::new(Cursor::new(text));
    assert_eq!(reader.dialect()?.delimiter, b'\t');
    assert_eq!(reader.header()?.names, ["Start_Time", "Value_0", "Value_1", "Note"]);
    Ok(())
}
