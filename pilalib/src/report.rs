//! CSV-отчёт по строкам ведомости. Заголовки:
//! line_id,doc_type,doc_number,contributor_type,line_kind,state,days,health_base,pension_base,risk_base,family_fund_base,
//! health_employee,health_employer,pension_employee,pension_employer,solidarity,subsistence,risk_employer,
//! family_fund_employer,employee_total,employer_total,warnings,errors

use crate::{error::Result, model::{LineState, PayrollRun}};
use csv::WriterBuilder;
use std::io::Write;

#[derive(serde::Serialize)]
struct ReportRow<'a> {
    line_id: u64,
    doc_type: &'a str,
    doc_number: &'a str,
    contributor_type: &'a str,
    line_kind: &'a str,
    state: &'static str,
    days: i32,

    health_base: i64,
    pension_base: i64,
    risk_base: i64,
    family_fund_base: i64,

    health_employee: i64,
    health_employer: i64,
    pension_employee: i64,
    pension_employer: i64,
    solidarity: i64,
    subsistence: i64,
    risk_employer: i64,
    family_fund_employer: i64,

    employee_total: i64,
    employer_total: i64,
    warnings: String,
    errors: String,
}

pub fn write_report<W: Write>(mut w: W, run: &PayrollRun) -> Result<()> {
    let mut wrt = WriterBuilder::new().from_writer(&mut w);

    for l in &run.lines {
        let b = l.breakdown.clone().unwrap_or_default();
        let out = ReportRow {
            line_id: l.id,
            doc_type: &l.document.kind,
            doc_number: &l.document.number,
            contributor_type: &l.contributor_type,
            line_kind: &l.line_kind,
            state: match l.state { LineState::Ok => "OK", LineState::Error => "ERROR" },
            days: l.contributed_days,
            health_base: b.health.base,
            pension_base: b.pension.base,
            risk_base: b.risk.base,
            family_fund_base: b.family_fund.base,
            health_employee: b.health.employee,
            health_employer: b.health.employer,
            pension_employee: b.pension.employee,
            pension_employer: b.pension.employer,
            solidarity: b.pension.solidarity,
            subsistence: b.pension.subsistence,
            risk_employer: b.risk.employer,
            family_fund_employer: b.family_fund.employer,
            employee_total: l.employee_total,
            employer_total: l.employer_total,
            warnings: l.warnings.join("; "),
            errors: l.errors.join("; "),
        };
        wrt.serialize(out)?;
    }
    wrt.flush()?;
    Ok(())
}
