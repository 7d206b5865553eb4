use chrono::NaiveDate;
use pilalib::{
    error::PilaError,
    model::Period,
    records::{
        detail::{DetailRecord, NoveltyDates, NoveltyFlags},
        header::HeaderRecord,
        layout::fit_record_length,
    },
};

fn cols(line: &str, start: usize, end: usize) -> String {
    line.chars().skip(start - 1).take(end + 1 - start).collect()
}

fn header() -> HeaderRecord {
    let period = Period::new(2025, 12).expect("period");
    HeaderRecord {
        registration_code: "10001".into(),
        company_name: "ATIEMPO S.A.S.".into(),
        document_type: "NI".into(),
        tax_id: 890404383,
        check_digit: "5".into(),
        submission_type: "E".into(),
        presentation_mode: "U".into(),
        risk_administrator: "14-28".into(),
        period,
        payment_period: period.next(),
        contributors: 2,
        payroll_total: 2_000_000,
        employer_type: "01".into(),
    }
}

fn detail() -> DetailRecord {
    DetailRecord {
        sequence: 1,
        document_type: "CC".into(),
        document_number: "1017000001".into(),
        contributor_type: "01".into(),
        contributor_subtype: "00".into(),
        location: "05001".into(),
        first_surname: "PEREZ".into(),
        first_name: "ANA".into(),
        novelties: NoveltyFlags {
            vac: true,
            ..NoveltyFlags::default()
        },
        pension_days: 30,
        health_days: 30,
        risk_days: 30,
        family_fund_days: 30,
        basic_salary: 2_000_000,
        salary_type: "F".into(),
        health_base: 2_000_000,
        pension_rate: "0.16000".into(),
        pension_contribution: 320_000,
        health_rate: "0.12500".into(),
        health_contribution: 250_000,
        risk_tariff: Some("0.0052200".into()),
        work_center: 1,
        risk_amount: Some(10_500),
        exempt: Some("N".into()),
        risk_class: "1".into(),
        dates: NoveltyDates {
            vac: (NaiveDate::from_ymd_opt(2025, 12, 20), NaiveDate::from_ymd_opt(2025, 12, 29)),
            ..NoveltyDates::default()
        },
        hours: Some(240),
        economic_activity: Some("0004711".into()),
        ..DetailRecord::default()
    }
}

#[test]
fn header_columns() {
    let line = header().encode().expect("encode");
    assert_eq!(line.chars().count(), 359);
    assert_eq!(cols(&line, 1, 2), "01");
    assert_eq!(cols(&line, 3, 7), "10001");
    assert_eq!(cols(&line, 8, 21), "ATIEMPO S.A.S.");
    assert_eq!(cols(&line, 210, 218), "890404383");
    assert_eq!(cols(&line, 226, 227), "5E");
    assert_eq!(cols(&line, 248, 248), "U");
    assert_eq!(cols(&line, 299, 304), "14-28 ");
    assert_eq!(cols(&line, 305, 311), "2025-12");
    assert_eq!(cols(&line, 312, 318), "2026-01");
    assert_eq!(cols(&line, 339, 343), "00002");
    assert_eq!(cols(&line, 344, 355), "000002000000");
    assert_eq!(cols(&line, 356, 357), "01");
}

#[test]
fn header_decodes_back() {
    let h = header();
    let back = HeaderRecord::decode(&h.encode().expect("encode")).expect("decode");
    assert_eq!(back, h);
}

#[test]
fn header_rejects_long_company_name() {
    let mut h = header();
    h.company_name = "X".repeat(201);
    assert!(matches!(h.encode(), Err(PilaError::FieldOverflow { width: 200, .. })));
}

#[test]
fn detail_columns() {
    let line = detail().encode().expect("encode");
    assert_eq!(line.chars().count(), 693);
    assert_eq!(cols(&line, 1, 7), "0200001");
    assert_eq!(cols(&line, 8, 25), "CC1017000001      ");
    assert_eq!(cols(&line, 149, 149), "X");
    assert_eq!(cols(&line, 137, 137), " ");
    assert_eq!(cols(&line, 184, 191), "30303030");
    assert_eq!(cols(&line, 238, 244), "0.16000");
    assert_eq!(cols(&line, 308, 314), "0.12500");
    assert_eq!(cols(&line, 381, 389), "0.0052200");
    assert_eq!(cols(&line, 399, 407), "000010500");
    assert_eq!(cols(&line, 506, 506), "N");
    assert_eq!(cols(&line, 513, 513), "1");
    assert_eq!(cols(&line, 605, 624), "2025-12-202025-12-29");
    assert_eq!(cols(&line, 674, 676), "240");
    assert_eq!(cols(&line, 687, 693), "0004711");
    // SENA не задана: колонки пустые
    assert_eq!(cols(&line, 424, 439), " ".repeat(16));
}

#[test]
fn detail_tail_survives_reencode() {
    let mut d = detail();
    let mut tail = String::from("ABCDEFGHIJKLMNO");
    tail.push_str(&" ".repeat(9));
    tail.push_str(&"Z".repeat(24));
    tail.push_str(&" ".repeat(361 - tail.len()));
    d.raw_tail = Some(tail.clone());
    d.risk_tariff = None;
    let line = d.encode().expect("encode");
    // неразмеченные колонки приходят из хвоста
    assert_eq!(cols(&line, 333, 347), "ABCDEFGHIJKLMNO");
    assert_eq!(cols(&line, 357, 380), "Z".repeat(24));
    // поля поверх хвоста
    assert_eq!(cols(&line, 399, 407), "000010500");
    // поле без значения оставляет хвост
    assert_eq!(cols(&line, 381, 389), " ".repeat(9));

    let back = DetailRecord::decode(&line).expect("decode");
    assert_eq!(back.encode().expect("re-encode"), line);
}

fn put(line: &str, start: usize, text: &str) -> String {
    let mut chars: Vec<char> = line.chars().collect();
    for (i, c) in text.chars().enumerate() {
        chars[start - 1 + i] = c;
    }
    chars.into_iter().collect()
}

#[test]
fn detail_line_from_receiver_survives_decode_encode() {
    // неразмеченные колонки в начале и пустые числовые поля
    let mut line = detail().encode().expect("encode");
    line = put(&line, 30, "X");
    line = put(&line, 144, "X");
    line = put(&line, 160, "ABC123");
    line = put(&line, 152, "  ");
    line = put(&line, 390, &" ".repeat(9));

    let back = DetailRecord::decode(&line).expect("decode");
    assert_eq!(back.incapacity_days, 0);
    assert_eq!(back.work_center, 0);
    assert_eq!(back.raw_head.as_ref().map(|h| h.chars().count()), Some(332));
    assert_eq!(back.encode().expect("re-encode"), line);
}

#[test]
fn built_detail_writes_zero_numerics() {
    let mut d = detail();
    d.work_center = 0;
    let line = d.encode().expect("encode");
    assert_eq!(cols(&line, 152, 153), "00");
    assert_eq!(cols(&line, 390, 398), "000000000");
}

#[test]
fn detail_decode_reads_overlay_fields() {
    let d = detail();
    let back = DetailRecord::decode(&d.encode().expect("encode")).expect("decode");
    assert_eq!(back.document_number, "1017000001");
    assert!(back.novelties.vac);
    assert!(!back.novelties.ing);
    assert_eq!(back.risk_tariff.as_deref(), Some("0.0052200"));
    assert_eq!(back.risk_amount, Some(10_500));
    assert_eq!(back.sena_value, None);
    assert_eq!(back.dates.vac, d.dates.vac);
    assert_eq!(back.hours, Some(240));
    assert_eq!(back.raw_tail.as_ref().map(|t| t.chars().count()), Some(361));
}

#[test]
fn detail_rejects_bad_tail_width() {
    let mut d = detail();
    d.raw_tail = Some("9".repeat(360));
    assert!(matches!(d.encode(), Err(PilaError::RawWidth { expected: 361, actual: 360, .. })));
}

#[test]
fn detail_rejects_wide_economic_activity() {
    let mut d = detail();
    d.economic_activity = Some("12345678".into());
    assert!(matches!(d.encode(), Err(PilaError::FieldOverflow { .. })));
}

#[test]
fn decode_checks_record_length() {
    let err = DetailRecord::decode(&" ".repeat(692)).expect_err("short line");
    assert!(matches!(err, PilaError::RecordLength { record: "detail", expected: 693, actual: 692 }));
}

#[test]
fn one_extra_char_is_truncated() {
    let fixed = fit_record_length("A".repeat(694), 693, "detail").expect("fit");
    assert_eq!(fixed.chars().count(), 693);
    assert!(fit_record_length("A".repeat(693), 693, "detail").is_ok());
    assert!(matches!(
        fit_record_length("A".repeat(695), 693, "detail"),
        Err(PilaError::RecordLength { actual: 695, .. })
    ));
    assert!(fit_record_length("A".repeat(692), 693, "detail").is_err());
}
