//! Сборка файла PILA: регистр 01 + по регистру 02 на каждую OK-строку,
//! соединённые `\n`, в однобайтовой кодировке (Latin-1).

use crate::calculator::pension_mandatory;
use crate::config::RateTable;
use crate::error::{PilaError, Result};
use crate::model::{DetailLine, EmployeeProfile, Employer, NoveltyCode, PayrollRun};
use crate::records::detail::{DetailRecord, NoveltyDates, NoveltyFlags};
use crate::records::header::HeaderRecord;
use crate::rounding::{percent_of, round_contribution};
use encoding_rs::WINDOWS_1252;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;
use std::io::{BufRead, Read, Write};
use std::str::FromStr;
use tracing::info;

const ZERO_TARIFF: &str = "0.0000000";
const DEFAULT_REGISTRATION_CODE: &str = "10001";
const DEFAULT_EMPLOYER_TYPE: &str = "01";

/// Какие строки попадают в файл.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmissionMode {
    #[default]
    All,
    /// Только тип 23 (планилья `K`).
    Students,
    /// Все, кроме типа 23 (планилья `E`).
    NonStudents,
}

impl SubmissionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionMode::All => "all",
            SubmissionMode::Students => "students",
            SubmissionMode::NonStudents => "non-students",
        }
    }

    /// Тип планильи в заголовке; при `None` берётся из ведомости.
    pub fn code(self) -> Option<&'static str> {
        match self {
            SubmissionMode::All => None,
            SubmissionMode::Students => Some("K"),
            SubmissionMode::NonStudents => Some("E"),
        }
    }

    pub fn includes(self, line: &DetailLine) -> bool {
        match self {
            SubmissionMode::All => true,
            SubmissionMode::Students => line.is_student(),
            SubmissionMode::NonStudents => !line.is_student(),
        }
    }
}

impl FromStr for SubmissionMode {
    type Err = PilaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "" => Ok(SubmissionMode::All),
            "students" | "k" => Ok(SubmissionMode::Students),
            "non-students" | "e" => Ok(SubmissionMode::NonStudents),
            other => Err(PilaError::Parse(format!("unknown submission mode {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PilaFile {
    pub header: HeaderRecord,
    pub details: Vec<DetailRecord>,
}

impl PilaFile {
    /// Строит файл из посчитанной ведомости. Непосчитанные строки не попадают.
    pub fn build(run: &PayrollRun, rates: &RateTable, mode: SubmissionMode) -> Result<Self> {
        let lines: Vec<&DetailLine> = run
            .lines
            .iter()
            .filter(|l| l.is_ok() && l.breakdown.is_some() && mode.includes(l))
            .collect();
        if lines.is_empty() {
            return Err(PilaError::EmptyRun {
                run_id: run.id,
                mode: mode.as_str(),
            });
        }

        let header = header_record(run, &lines, mode);
        let details = lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let profile = employee_of(run, line)?;
                detail_record(i as i64 + 1, line, profile, rates)
            })
            .collect::<Result<Vec<_>>>()?;

        info!(run_id = run.id, mode = mode.as_str(), details = details.len(), "file assembled");
        Ok(Self { header, details })
    }

    /// Текст файла: строки через `\n`, без завершающего перевода строки.
    pub fn render(&self) -> Result<String> {
        let mut out = Vec::with_capacity(self.details.len() + 1);
        out.push(self.header.encode()?);
        for d in &self.details {
            out.push(d.encode()?);
        }
        Ok(out.join("\n"))
    }
}

fn employee_of<'a>(run: &'a PayrollRun, line: &DetailLine) -> Result<&'a EmployeeProfile> {
    run.employee(&line.document).ok_or_else(|| {
        PilaError::Store(format!(
            "run {}: no reference data for {} {}",
            run.id, line.document.kind, line.document.number
        ))
    })
}

/// Первые `n` символов.
fn clip(s: &str, n: usize) -> String {
    s.trim().chars().take(n).collect()
}

fn or_default(s: &str, default: &str) -> String {
    let s = s.trim();
    if s.is_empty() {
        default.to_string()
    } else {
        s.to_string()
    }
}

/// Целая часть суммы (к нулю).
fn whole(v: Decimal) -> i64 {
    v.trunc().to_i64().unwrap_or(0)
}

fn fmt_rate(rate: Decimal, scale: usize) -> String {
    format!("{rate:.scale$}")
}

fn header_record(run: &PayrollRun, lines: &[&DetailLine], mode: SubmissionMode) -> HeaderRecord {
    let company: &Employer = &run.company;
    let contributors: BTreeSet<_> = lines.iter().map(|l| &l.document).collect();
    let payroll_total = lines
        .iter()
        .filter_map(|l| l.breakdown.as_ref())
        .map(|b| b.family_fund.base)
        .sum::<i64>();

    let tax_id = clip(&company.tax_id, 9);
    let submission_type = match mode.code() {
        Some(code) => code.to_string(),
        None => clip(&or_default(&run.submission_type, "E"), 1),
    };

    HeaderRecord {
        registration_code: or_default(&company.registration_code, DEFAULT_REGISTRATION_CODE),
        company_name: company.name.trim().to_string(),
        document_type: or_default(&company.document_type, "NI"),
        tax_id: if tax_id.chars().all(|c| c.is_ascii_digit()) {
            tax_id.parse().unwrap_or(0)
        } else {
            0
        },
        check_digit: clip(company.check_digit.as_deref().unwrap_or(""), 1),
        submission_type,
        presentation_mode: clip(&or_default(&company.presentation_mode, "U"), 1),
        risk_administrator: clip(company.risk_administrator.as_deref().unwrap_or(""), 6),
        period: run.period,
        payment_period: run.period.next(),
        contributors: contributors.len() as i64,
        payroll_total,
        employer_type: clip(&or_default(&company.employer_type, DEFAULT_EMPLOYER_TYPE), 2),
    }
}

/// Отметки, даты и дни IRL из новедадов строки.
fn novelty_fields(line: &DetailLine) -> (NoveltyFlags, NoveltyDates, i64) {
    let mut flags = NoveltyFlags::default();
    let mut dates = NoveltyDates::default();
    let mut irl_days = 0;
    for e in &line.events {
        let span = (Some(e.start), e.end);
        match e.code {
            NoveltyCode::Ing => {
                flags.ing = true;
                dates.ing = Some(e.start);
            }
            NoveltyCode::Ret => {
                flags.ret = true;
                dates.ret = Some(e.start);
            }
            NoveltyCode::Vsp => {
                flags.vsp = true;
                dates.vsp = Some(e.start);
            }
            NoveltyCode::Vst => flags.vst = true,
            NoveltyCode::Sln => {
                flags.sln = true;
                dates.sln = span;
            }
            NoveltyCode::Ige => {
                flags.ige = true;
                dates.ige = span;
            }
            NoveltyCode::Lma => {
                flags.lma = true;
                dates.lma = span;
            }
            NoveltyCode::Vac => {
                flags.vac = true;
                dates.vac = span;
            }
            NoveltyCode::Irl => {
                irl_days = i64::from(e.days.unwrap_or(0));
                dates.irl = span;
            }
        }
    }
    (flags, dates, irl_days)
}

/// Тариф ARL как доля с 7 знаками (`0.0052200`).
fn risk_tariff(class: &str, profile: &EmployeeProfile, pension_exempt: bool, rates: &RateTable) -> Option<String> {
    let by_class = rates.risk_rate(class);
    let explicit = profile
        .risk_tariff
        .filter(|t| *t > Decimal::ZERO)
        .map(|t| t / Decimal::ONE_HUNDRED);
    let effective = if pension_exempt {
        by_class.or(explicit)
    } else {
        explicit.or(by_class)
    };
    effective.map(|r| fmt_rate(r, 7))
}

fn detail_record(
    sequence: i64,
    line: &DetailLine,
    profile: &EmployeeProfile,
    rates: &RateTable,
) -> Result<DetailRecord> {
    let b = line.breakdown.clone().unwrap_or_default();
    let student = line.is_student();
    let pension_exempt = !pension_mandatory(&line.contributor_type, &line.contributor_subtype);
    let (novelties, dates, incapacity_days) = novelty_fields(line);
    let absence = novelties.vac || novelties.ige || novelties.lma || novelties.sln || incapacity_days > 0;

    let class = profile
        .risk_class
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(&line.risk_class);
    let tariff = if absence {
        Some(ZERO_TARIFF.to_string())
    } else {
        risk_tariff(class, profile, pension_exempt, rates)
    };

    // парафискальные пересчитываются здесь, CCF не обнуляется при освобождении
    let ff = &b.family_fund;
    let ff_base = Decimal::from(ff.base);
    let computed = ff.applies && ff.base > 0;
    let allied = computed && !ff.exempt;
    let parafiscal = |on: bool, rate: Decimal| -> (Option<String>, i64) {
        if on {
            (Some(fmt_rate(rate, 5)), round_contribution(percent_of(ff_base, rate)))
        } else {
            (None, 0)
        }
    };
    let (ff_rate, ff_value) = parafiscal(computed, rates.family_fund);
    let (sena_rate, sena_value) = parafiscal(allied, rates.sena);
    let (icbf_rate, icbf_value) = parafiscal(allied, rates.icbf);

    let health_rate = if student {
        Decimal::ZERO
    } else if b.health.employer > 0 {
        b.health.employee_rate + b.health.employer_rate
    } else {
        b.health.employee_rate
    };
    let pension_rate = if pension_exempt {
        Decimal::ZERO
    } else {
        rates.pension_total_rate()
    };

    let exempt = if student {
        "N"
    } else if ff.exempt || b.health.employer_exempt {
        "S"
    } else {
        "N"
    };

    let risk_class = if rates.risk_rate(&line.risk_class).is_some() {
        line.risk_class.trim().to_string()
    } else {
        "1".to_string()
    };

    let entities = &profile.entities;
    let code = |c: &Option<String>| c.as_deref().map(str::trim).unwrap_or("").to_string();

    let voluntary_affiliate = 0;
    let voluntary_employer = 0;

    Ok(DetailRecord {
        sequence,
        document_type: line.document.kind.trim().to_string(),
        document_number: line.document.number.trim().to_string(),
        contributor_type: line.contributor_type.trim().to_string(),
        contributor_subtype: or_default(&line.contributor_subtype, "00"),
        location: clip(
            &format!("{}{}", profile.department_code.trim(), profile.municipality_code.trim()),
            5,
        ),
        first_surname: profile.first_surname.trim().to_string(),
        second_surname: profile.second_surname.trim().to_string(),
        first_name: profile.first_name.trim().to_string(),
        second_name: profile.second_name.trim().to_string(),
        novelties,
        incapacity_days,
        pension_fund: if pension_exempt { String::new() } else { code(&entities.pension_fund) },
        health_insurer: if student { String::new() } else { code(&entities.health_insurer) },
        family_fund: if student { String::new() } else { code(&entities.family_fund) },
        pension_days: i64::from(line.days.pension),
        health_days: i64::from(line.days.health),
        risk_days: i64::from(line.days.risk),
        family_fund_days: i64::from(line.days.family_fund),
        basic_salary: whole(profile.basic_salary),
        salary_type: if student {
            String::new()
        } else {
            profile.salary_scheme.code().to_string()
        },
        pension_base: b.pension.base,
        health_base: b.health.base,
        risk_base: b.risk.base,
        family_fund_base: ff.base,
        pension_rate: fmt_rate(pension_rate, 5),
        pension_contribution: b.pension.total,
        voluntary_affiliate,
        voluntary_employer,
        pension_total: b.pension.total + voluntary_affiliate + voluntary_employer,
        solidarity: b.pension.solidarity,
        subsistence: b.pension.subsistence,
        not_withheld: 0,
        health_rate: fmt_rate(health_rate, 5),
        health_contribution: b.health.total,
        upc: 0,
        raw_head: None,
        raw_tail: None,
        sickness_value: line.event(NoveltyCode::Ige).and_then(|e| e.value).map(whole),
        risk_tariff: tariff,
        work_center: i64::from(profile.work_center),
        risk_amount: Some(if absence { 0 } else { b.risk.employer }),
        family_fund_rate: ff_rate,
        family_fund_value: Some(ff_value),
        sena_rate,
        sena_value: Some(sena_value),
        icbf_rate,
        icbf_value: Some(icbf_value),
        exempt: Some(exempt.to_string()),
        risk_administrator: entities
            .risk_administrator
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
        risk_class,
        dates,
        other_parafiscal_base: Some(if sena_value > 0 || icbf_value > 0 { ff.base } else { 0 }),
        hours: Some(i64::from(line.days.family_fund.max(0)) * 8),
        economic_activity: profile
            .economic_activity
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(|a| format!("{a:0>7}")),
    })
}

/// Кодирует текст в windows-1252; символ вне кодировки даёт ошибку.
pub fn encode_latin1(text: &str) -> Result<Vec<u8>> {
    let (bytes, _, had_errors) = WINDOWS_1252.encode(text);
    if had_errors {
        let mut buf = [0u8; 4];
        let ch = text
            .chars()
            .find(|c| WINDOWS_1252.encode(c.encode_utf8(&mut buf)).2)
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        return Err(PilaError::Unencodable { ch });
    }
    Ok(bytes.into_owned())
}

pub fn decode_latin1(bytes: &[u8]) -> String {
    let (text, _, _) = WINDOWS_1252.decode(bytes);
    text.into_owned()
}

/// Файл PILA фиксированной ширины в Latin-1.
pub struct FixedWidth;

impl crate::traits::ReadFormat for FixedWidth {
    fn read<R: BufRead>(mut r: R) -> Result<PilaFile> {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;
        let text = decode_latin1(&bytes);
        let mut lines = text.lines().filter(|l| !l.is_empty());

        let header = lines
            .next()
            .ok_or_else(|| PilaError::Parse("empty PILA file".into()))
            .and_then(HeaderRecord::decode)?;
        let details = lines.map(DetailRecord::decode).collect::<Result<Vec<_>>>()?;
        Ok(PilaFile { header, details })
    }
}

impl crate::traits::WriteFormat for FixedWidth {
    fn write<W: Write>(mut w: W, file: &PilaFile) -> Result<()> {
        let bytes = encode_latin1(&file.render()?)?;
        w.write_all(&bytes)?;
        w.flush()?;
        Ok(())
    }
}
