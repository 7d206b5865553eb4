use pilalib::{
    calculator::{calculate_run, pension_mandatory, split_worker_share},
    config::RateTable,
    error::PilaError,
    model::{LineState, PayrollRun, RunState},
    payload::RunPayload,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};

fn run_with(company_exempt: bool, employee: Value) -> PayrollRun {
    let payload = json!({
        "company": { "name": "ACME", "tax_id": "900123456", "exempt": company_exempt },
        "period": "2025-06",
        "run": { "reference": "R1" },
        "parameters": { "minimum_wage": "1300000" },
        "employees": [employee]
    });
    serde_json::from_value::<RunPayload>(payload)
        .expect("payload")
        .into_run(1)
        .expect("run")
}

fn employee(salary: &str, base: &str, days: i32) -> Value {
    json!({
        "document_type": "CC",
        "document_number": "100",
        "first_surname": "PEREZ",
        "first_name": "ANA",
        "contributor_type": "01",
        "contributor_subtype": "00",
        "basic_salary": salary,
        "entities": { "family_fund": "CCF04" },
        "risk_class": "1",
        "days": { "health": days, "pension": days, "risk": days, "family_fund": days },
        "bases": { "health": base, "pension": base, "risk": base, "parafiscal": base }
    })
}

#[test]
fn full_month_standard_employee() {
    let run = run_with(false, employee("2000000", "2000000", 30));
    let calc = calculate_run(&run, &RateTable::default()).expect("calculate");
    let line = &calc.lines[0];
    assert_eq!(line.state, LineState::Ok);
    let b = line.breakdown.as_ref().expect("breakdown");

    assert_eq!(b.health.base, 2_000_000);
    assert_eq!((b.health.employee, b.health.employer, b.health.total), (80_000, 170_000, 250_000));
    assert_eq!((b.pension.employee, b.pension.employer, b.pension.total), (80_000, 240_000, 320_000));
    assert_eq!((b.pension.solidarity, b.pension.subsistence), (0, 0));
    assert_eq!(b.risk.employer, 10_500);
    assert_eq!(b.family_fund.employer, 80_000);
    assert_eq!(line.employee_total, 160_000);
    assert_eq!(line.employer_total, 500_500);

    assert_eq!(calc.outcome.state, RunState::Completed);
    let totals = calc.outcome.totals.expect("totals");
    assert_eq!(totals.total, 660_500);
}

#[test]
fn base_above_cap_is_clamped_and_pays_solidarity() {
    let run = run_with(false, employee("40000000", "40000000", 30));
    let calc = calculate_run(&run, &RateTable::default()).expect("calculate");
    let line = &calc.lines[0];
    let b = line.breakdown.as_ref().expect("breakdown");

    assert_eq!(b.pension.base, 32_500_000);
    assert_eq!(b.health.base, 32_500_000);
    assert_eq!(b.pension.solidarity, 325_000);
    assert_eq!(b.pension.subsistence, 325_000);
    assert!(line.warnings.iter().any(|w| w.contains("cap")));
    assert_eq!(calc.outcome.summary.warnings, 1);
}

#[test]
fn base_below_minimum_is_raised() {
    let run = run_with(false, employee("500000", "500000", 30));
    let calc = calculate_run(&run, &RateTable::default()).expect("calculate");
    let line = &calc.lines[0];
    assert_eq!(line.breakdown.as_ref().expect("breakdown").health.base, 1_300_000);
    assert!(line.warnings.iter().any(|w| w.contains("raised")));
}

#[test]
fn exempt_employer_moves_health_to_worker() {
    let run = run_with(true, employee("2000000", "2000000", 30));
    let calc = calculate_run(&run, &RateTable::default()).expect("calculate");
    let b = calc.lines[0].breakdown.as_ref().expect("breakdown");

    assert!(b.health.employer_exempt);
    assert_eq!(b.health.employer_rate, Decimal::ZERO);
    assert_eq!((b.health.employee, b.health.employer), (80_000, 0));
    assert!(b.family_fund.exempt);
    assert_eq!(b.family_fund.employer, 0);
    // пенсия и ARL не освобождаются
    assert_eq!(b.pension.total, 320_000);
    assert_eq!(b.risk.employer, 10_500);
}

#[test]
fn exemption_needs_salary_below_ten_wages() {
    let run = run_with(true, employee("14000000", "14000000", 30));
    let calc = calculate_run(&run, &RateTable::default()).expect("calculate");
    let b = calc.lines[0].breakdown.as_ref().expect("breakdown");
    assert!(!b.health.employer_exempt);
    assert!(b.health.employer > 0);
    assert!(b.family_fund.employer > 0);
}

#[test]
fn student_pays_only_risk() {
    let mut emp = employee("1300000", "1300000", 30);
    emp["contributor_type"] = json!("23");
    let run = run_with(false, emp);
    let calc = calculate_run(&run, &RateTable::default()).expect("calculate");
    let line = &calc.lines[0];
    let b = line.breakdown.as_ref().expect("breakdown");

    assert!(!b.health.applies && !b.pension.applies && !b.family_fund.applies);
    assert_eq!(b.health.total + b.pension.total + b.family_fund.employer, 0);
    assert_eq!(b.risk.employer, 6_800);
    assert_eq!(line.employee_total, 0);
    assert_eq!(line.employer_total, 6_800);
    assert_eq!(line.days.health, 0);
    assert_eq!(line.days.risk, 30);
}

#[test]
fn vacation_line_has_no_risk() {
    let mut emp = employee("2000000", "666667", 10);
    emp["novelties"] = json!([{ "code": "VAC", "start": "2025-06-20", "end": "2025-06-29" }]);
    let run = run_with(false, emp);
    let calc = calculate_run(&run, &RateTable::default()).expect("calculate");
    let b = calc.lines[0].breakdown.as_ref().expect("breakdown");
    assert_eq!(b.risk.rate, Decimal::ZERO);
    assert_eq!(b.risk.employer, 0);
    assert_eq!(b.health.total, 83_400);
}

#[test]
fn missing_minimum_wage_is_fatal() {
    let mut run = run_with(false, employee("2000000", "2000000", 30));
    run.parameters.minimum_wage = None;
    let err = calculate_run(&run, &RateTable::default()).expect_err("must fail");
    assert!(matches!(err, PilaError::MissingParameter("minimum_wage")));
}

#[test]
fn out_of_range_days_reject_only_that_line() {
    let payload = json!({
        "company": { "name": "ACME", "tax_id": "900123456" },
        "period": "2025-06",
        "run": { "reference": "R1" },
        "parameters": { "minimum_wage": "1300000" },
        "employees": [employee("2000000", "2000000", 31), employee("2000000", "2000000", 30)]
    });
    let run = serde_json::from_value::<RunPayload>(payload)
        .expect("payload")
        .into_run(7)
        .expect("run");
    let calc = calculate_run(&run, &RateTable::default()).expect("calculate");

    assert_eq!(calc.lines[0].state, LineState::Error);
    assert!(calc.lines[0].breakdown.is_none());
    assert!(!calc.lines[0].errors.is_empty());
    assert_eq!(calc.lines[1].state, LineState::Ok);

    assert_eq!(calc.outcome.state, RunState::CompletedWithErrors);
    assert_eq!(calc.outcome.summary.processed, 2);
    assert_eq!(calc.outcome.summary.errored, 1);
    // в итоги идёт только OK-строка
    assert_eq!(calc.outcome.totals.expect("totals").total, 660_500);
}

#[test]
fn invalid_risk_class_is_a_line_error() {
    let mut run = run_with(false, employee("2000000", "2000000", 30));
    run.lines[0].risk_class = "9".into();
    let calc = calculate_run(&run, &RateTable::default()).expect("calculate");
    assert_eq!(calc.lines[0].state, LineState::Error);
    assert!(calc.lines[0].errors[0].contains("risk class"));
}

#[test]
fn negative_base_is_a_line_error() {
    let run = run_with(false, employee("2000000", "-1", 30));
    let calc = calculate_run(&run, &RateTable::default()).expect("calculate");
    assert_eq!(calc.lines[0].state, LineState::Error);
}

#[test]
fn entry_novelty_overrides_contributed_days() {
    let mut emp = employee("2000000", "1000000", 15);
    emp["novelties"] = json!([{ "code": "ING", "start": "2025-06-16", "contributed_days": 15 }]);
    emp["days"]["health"] = json!(30);
    let run = run_with(false, emp);
    let calc = calculate_run(&run, &RateTable::default()).expect("calculate");
    assert_eq!(calc.lines[0].contributed_days, 15);
}

#[test]
fn sample_run_totals() {
    let run = RunPayload::from_json(include_str!("data/run.json"))
        .expect("payload")
        .into_run(1)
        .expect("run");
    let calc = calculate_run(&run, &RateTable::default()).expect("calculate");
    assert_eq!(calc.outcome.summary.processed, 3);
    assert_eq!(calc.outcome.summary.errored, 0);

    let t = calc.outcome.totals.expect("totals");
    assert_eq!(t.health.total, 250_100);
    assert_eq!(t.pension.total, 320_100);
    assert_eq!(t.risk_employer, 13_800);
    assert_eq!(t.family_fund_employer, 80_100);
    assert_eq!(t.employee + t.employer, t.total);
    assert_eq!(t.health.employee + t.health.employer, t.health.total);
}

#[test]
fn worker_share_is_floored() {
    let (w, e) = (Decimal::new(4, 2), Decimal::new(85, 3));
    assert_eq!(split_worker_share(250_000, w, e), 80_000);
    assert_eq!(split_worker_share(166_700, w, e), 53_344);
    assert_eq!(split_worker_share(101, Decimal::new(4, 2), Decimal::new(12, 2)), 25);
    assert_eq!(split_worker_share(1_000, Decimal::ZERO, Decimal::ZERO), 0);
}

#[test]
fn pension_only_for_listed_subtypes() {
    assert!(pension_mandatory("01", "00"));
    assert!(pension_mandatory("01", "0"));
    assert!(pension_mandatory("01", "12"));
    assert!(!pension_mandatory("01", "01"));
    assert!(!pension_mandatory("23", "00"));
}
