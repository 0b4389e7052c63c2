use anyhow::Result;
use regex::Regex;
use std::io::Cursor;
use tabsniff::testing::*;
use tabsniff::{CellValue, ColumnSelect, HeaderSpec, ReadOptions, Reader, Row, Tab, TabError};

fn annotations() -> Reader {
    let _ = env_logger::builder().is_test(true).try_init();
    Reader::new(Cursor::new(annotations_fixture().build()))
}

fn read_all(reader: &mut Reader) -> Result<Vec<Row>> {
    Ok(concat_chunks(reader.read(ReadOptions::default())?)?)
}

fn numbers(rows: &[Row]) -> Vec<i64> {
    rows.iter()
        .filter_map(|r| r.get("Number").and_then(CellValue::as_i64))
        .collect()
}

#[test]
fn equality_tab_keeps_the_single_match() -> Result<()> {
    let mut reader = annotations();
    reader.tab("Annotation", Tab::equal("exploring"))?;

    let chunks: Vec<Vec<Row>> = reader.read(ReadOptions::default())?.collect::<Result<_, _>>()?;
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].len(), 1);
    let row = &chunks[0][0];
    assert_eq!(row.line(), 5);
    assert_eq!(row.get("Number"), Some(&CellValue::Int(3)));
    assert_eq!(row.get("Annotation"), Some(&CellValue::from("exploring")));
    Ok(())
}

#[test]
fn equality_operand_is_cast_to_the_column_type() -> Result<()> {
    let mut reader = annotations();
    reader.tab("Number", Tab::equal("4"))?;
    assert_eq!(numbers(&read_all(&mut reader)?), [4]);
    Ok(())
}

#[test]
fn membership_tab() -> Result<()> {
    let mut reader = annotations();
    reader.tab("Annotation", Tab::is_in(["resting", "grooming"]))?;
    assert_eq!(numbers(&read_all(&mut reader)?), [1, 2, 4, 5]);
    Ok(())
}

#[test]
fn chained_comparison_on_ints() -> Result<()> {
    let mut reader = annotations();
    reader.tab("Number", Tab::compare(">= 2 AND < 5")?)?;
    assert_eq!(numbers(&read_all(&mut reader)?), [2, 3, 4]);
    Ok(())
}

#[test]
fn comparison_on_times() -> Result<()> {
    let mut reader = annotations();
    reader.tab("Start_Time", Tab::compare("> 08:05:00")?)?;
    assert_eq!(numbers(&read_all(&mut reader)?), [3, 4, 5]);
    Ok(())
}

#[test]
fn regex_tab_sees_raw_text() -> Result<()> {
    let mut reader = annotations();
    reader.tab("Start_Time", Tab::regex(r"^08:0[0-4]")?)?;
    assert_eq!(numbers(&read_all(&mut reader)?), [1, 2]);
    Ok(())
}

#[test]
fn calling_tab_receives_value_and_row() -> Result<()> {
    let mut reader = annotations();
    reader.tab(
        "Number",
        Tab::calling(|value, row| {
            value.as_i64().is_some_and(|n| n % 2 == 1) && row.get("Annotation") != Some(&CellValue::from("exploring"))
        }),
    )?;
    assert_eq!(numbers(&read_all(&mut reader)?), [1, 5]);
    Ok(())
}

#[test]
fn every_tab_must_accept() -> Result<()> {
    let mut reader = annotations();
    reader.tabs([
        ("Annotation", Tab::equal("resting")),
        ("Number", Tab::compare("> 1")?),
    ])?;
    assert_eq!(numbers(&read_all(&mut reader)?), [4]);
    Ok(())
}

#[test]
fn adding_tabs_only_narrows() -> Result<()> {
    let mut reader = annotations();
    let all = read_all(&mut reader)?;
    reader.tab("Number", Tab::compare("< 5")?)?;
    let some = read_all(&mut reader)?;
    reader.tab("Annotation", Tab::is_in(["grooming", "exploring"]))?;
    let fewer = read_all(&mut reader)?;

    assert_eq!(all.len(), 5);
    assert!(some.iter().all(|r| all.contains(r)));
    assert!(fewer.iter().all(|r| some.contains(r)));
    assert_eq!(numbers(&fewer), [2, 3]);
    Ok(())
}

#[test]
fn adding_membership_values_only_widens() -> Result<()> {
    let mut reader = annotations();
    let mut previous = Vec::new();
    for values in [
        vec!["resting"],
        vec!["resting", "sleeping"],
        vec!["resting", "sleeping", "grooming"],
        vec!["resting", "sleeping", "grooming", "exploring"],
    ] {
        reader.tab("Annotation", Tab::is_in(values))?;
        let rows = read_all(&mut reader)?;
        assert!(previous.iter().all(|r| rows.contains(r)));
        previous = rows;
    }
    assert_eq!(numbers(&previous), [1, 2, 3, 4, 5]);
    Ok(())
}

#[test]
fn a_later_tab_replaces_an_earlier_one() -> Result<()> {
    let mut reader = annotations();
    reader.tab("Annotation", Tab::equal("resting"))?;
    reader.tab("Annotation", Tab::equal("grooming"))?;
    assert_eq!(numbers(&read_all(&mut reader)?), [2, 5]);

    reader.clear_tabs();
    assert_eq!(read_all(&mut reader)?.len(), 5);
    Ok(())
}

#[test]
fn unknown_columns_are_rejected() {
    let mut reader = annotations();
    let err = reader.tab("Duration", Tab::equal("1"));
    match err {
        Err(TabError::UnknownColumn { name, available }) => {
            assert_eq!(name, "Duration");
            assert_eq!(available, ["Number", "Start_Time", "Annotation"]);
        }
        other => panic!("expected UnknownColumn, got {other:?}"),
    }
    assert!(matches!(
        reader.select([ColumnSelect::Pattern(Regex::new("^Dur").unwrap())]),
        Err(TabError::UnknownColumn { .. })
    ));
    assert!(matches!(reader.select([7usize]), Err(TabError::UnknownColumn { .. })));
}

#[test]
fn bad_expressions_fail_at_declaration() {
    assert!(matches!(Tab::compare("about 3"), Err(TabError::InvalidComparison { .. })));
    assert!(matches!(Tab::regex("(unclosed"), Err(TabError::InvalidPattern(_))));
}

#[test]
fn projection_happens_after_filtering() -> Result<()> {
    let mut reader = annotations();
    reader.tab("Annotation", Tab::equal("grooming"))?;
    reader.select(["Number"])?;

    let rows = read_all(&mut reader)?;
    assert_eq!(rows.len(), 2);
    for row in &rows {
        assert_eq!(row.names().collect::<Vec<_>>(), ["Number"]);
        assert!(row.get("Annotation").is_none());
    }
    Ok(())
}

#[test]
fn selection_mixes_names_indices_and_patterns() -> Result<()> {
    let mut reader = annotations();
    reader.select([
        ColumnSelect::from(2usize),
        ColumnSelect::Pattern(Regex::new("^Num")?),
        ColumnSelect::from("Annotation"),
    ])?;
    let rows = read_all(&mut reader)?;
    assert_eq!(rows[0].names().collect::<Vec<_>>(), ["Number", "Annotation"]);
    Ok(())
}

#[test]
fn changing_the_header_clears_tabs() -> Result<()> {
    let mut reader = annotations();
    reader.tab("Annotation", Tab::equal("exploring"))?;
    reader.set_header(HeaderSpec::Names(vec!["n".into(), "t".into(), "a".into()]))?;
    let rows = read_all(&mut reader)?;
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0].get("n"), Some(&CellValue::Int(1)));
    Ok(())
}

#[test]
fn missing_cells_fail_their_tab() -> Result<()> {
    let text = DsvFixture::new(b',')
        .header(["id", "label"])
        .row(["1", "a"])
        .row(["2"])
        .row(["3", "a"])
        .row(["4", "b"])
        .build();
    let _ = env_logger::builder().is_test(true).try_init();
    let mut reader = Reader::new(Cursor::new(text));
    // the short row ends the sniffer's scan, so name the header line explicitly
    reader.set_header(HeaderSpec::Line(0))?;
    reader.tab("label", Tab::compare("!= b")?)?;
    let rows = read_all(&mut reader)?;
    let ids: Vec<_> = rows.iter().filter_map(|r| r.get("id").and_then(CellValue::as_i64)).collect();
    assert_eq!(ids, [1, 3]);
    assert_eq!(reader.errors().count(tabsniff::ErrorKind::Ragged), 1);
    Ok(())
}
