use chrono::{NaiveDate, NaiveTime};
use num_complex::Complex64;
use tabsniff::parsing::{is_numeric, is_temporal};
use tabsniff::{CellType, CellValue, Formats, cast, classify, convert};

#[test]
fn precedence_picks_the_narrowest_type() {
    let f = Formats::standard();
    assert_eq!(classify("42", &f), CellType::Int);
    assert_eq!(classify("-3.5e2", &f), CellType::Float);
    assert_eq!(classify("1+2j", &f), CellType::Complex);
    assert_eq!(classify("13:45:00", &f), CellType::Time);
    assert_eq!(classify("03/07/2022", &f), CellType::Date);
    assert_eq!(classify("2022-03-07 13:45:00", &f), CellType::DateTime);
    assert_eq!(classify("resting", &f), CellType::Str);
}

#[test]
fn converts_to_typed_values() {
    let f = Formats::standard();
    assert_eq!(convert("7", &f), CellValue::Int(7));
    assert_eq!(convert("(3-4i)", &f), CellValue::Complex(Complex64::new(3.0, -4.0)));
    assert_eq!(
        convert("08:01:10", &f),
        CellValue::Time(NaiveTime::from_hms_opt(8, 1, 10).unwrap())
    );
    assert_eq!(
        convert("2022-03-07", &f),
        CellValue::Date(NaiveDate::from_ymd_opt(2022, 3, 7).unwrap())
    );
}

#[test]
fn two_digit_years_are_not_read_as_year_zero() {
    let f = Formats::standard();
    let d = f.parse_date("03-07-22").unwrap();
    assert_eq!(d, NaiveDate::from_ymd_opt(2022, 3, 7).unwrap());
}

#[test]
fn twelve_hour_times_need_a_meridiem() {
    let f = Formats::standard();
    assert_eq!(
        f.parse_time("01:15:00 PM"),
        NaiveTime::from_hms_opt(13, 15, 0)
    );
    assert_eq!(f.parse_time("1:15"), None);
}

#[test]
fn cast_failure_names_raw_and_target() {
    let f = Formats::standard();
    let err = cast("seven", CellType::Int, &f).unwrap_err();
    assert_eq!(err.raw, "seven");
    assert_eq!(err.target, CellType::Int);
    assert!(err.to_string().contains("cannot cast 'seven' to int"));
}

#[test]
fn string_target_always_succeeds() {
    let f = Formats::standard();
    assert_eq!(cast("", CellType::Str, &f).unwrap(), CellValue::Str(String::new()));
}

#[test]
fn custom_formats_extend_recognition() {
    let mut f = Formats::empty();
    assert!(!is_temporal("2022.067", &f));
    f.date.push("%Y.%j".to_string());
    assert_eq!(classify("2022.067", &f), CellType::Float);
    assert_eq!(
        cast("2022.067", CellType::Date, &f).unwrap(),
        CellValue::Date(NaiveDate::from_ymd_opt(2022, 3, 8).unwrap())
    );
}

#[test]
fn numeric_check_covers_complex() {
    assert!(is_numeric(" 12 "));
    assert!(is_numeric("2.5j"));
    assert!(!is_numeric("twelve"));
}

#[test]
fn values_order_across_numeric_kinds() {
    assert!(CellValue::Int(2) < CellValue::Float(2.5));
    assert!(CellValue::Float(1.0) == CellValue::Int(1));
    assert_eq!(
        CellValue::Complex(Complex64::new(1.0, 1.0)).partial_cmp(&CellValue::Complex(Complex64::new(2.0, 0.0))),
        None
    );
}

#[test]
fn values_render_iso_and_complex() -> anyhow::Result<()> {
    let f = Formats::standard();
    let json = serde_json::to_string(&[
        convert("03/07/2022", &f),
        convert("1+2j", &f),
        convert("3", &f),
    ])?;
    assert_eq!(json, r#"["2022-03-07","1+2i",3]"#);
    Ok(())
}
