//! Входной JSON ведомости: типизированные записи и проверка на границе.
//! После `into_run` дальше по коду никто не проверяет форму данных.

use crate::config::LegalParameters;
use crate::error::{PilaError, Result};
use crate::model::{
    DetailLine, DocumentId, EmployeeProfile, Employer, EntityCodes, EventMetadata, LineState,
    NoveltyCode, NoveltyEvent, PayrollRun, Period, RunId, RunState, RunSummary, SalaryScheme,
    SubsystemBases, SubsystemDays, SubsystemFlags,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use tracing::{debug, warn};

const RISK_CLASSES: [&str; 5] = ["1", "2", "3", "4", "5"];

fn default_document_type() -> String {
    "NI".into()
}
fn default_presentation() -> String {
    "U".into()
}
fn default_registration_code() -> String {
    "10001".into()
}
fn default_employer_type() -> String {
    "01".into()
}
fn default_risk_class() -> String {
    "1".into()
}
fn default_subtype() -> String {
    "00".into()
}
fn default_line_kind() -> String {
    "NORMAL".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompanyPayload {
    pub name: String,
    pub tax_id: String,
    #[serde(default)]
    pub check_digit: Option<String>,
    #[serde(default)]
    pub branch: String,
    #[serde(default = "default_document_type")]
    pub document_type: String,
    #[serde(default = "default_employer_type")]
    pub employer_type: String,
    #[serde(default = "default_presentation")]
    pub presentation_mode: String,
    #[serde(default)]
    pub risk_administrator: Option<String>,
    #[serde(default = "default_registration_code")]
    pub registration_code: String,
    #[serde(default)]
    pub exempt: bool,
    #[serde(default = "default_risk_class")]
    pub default_risk_class: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunInfoPayload {
    pub reference: String,
    #[serde(default)]
    pub submission_type: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct BasesPayload {
    pub health: Decimal,
    pub pension: Decimal,
    pub risk: Decimal,
    pub parafiscal: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NoveltyPayload {
    pub code: String,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub days: Option<u32>,
    #[serde(default)]
    pub value: Option<Decimal>,
    #[serde(default)]
    pub contributed_days: Option<i32>,
    #[serde(default)]
    pub previous_salary: Option<Decimal>,
    #[serde(default)]
    pub new_salary: Option<Decimal>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Один слот `registros`, будущая строка 02.
#[derive(Debug, Clone, Deserialize)]
pub struct LinePayload {
    #[serde(default = "default_line_kind")]
    pub kind: String,
    #[serde(default)]
    pub days: SubsystemDays,
    #[serde(default)]
    pub bases: BasesPayload,
    #[serde(default)]
    pub novelties: Vec<NoveltyPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmployeePayload {
    pub document_type: String,
    pub document_number: String,
    #[serde(default)]
    pub first_surname: String,
    #[serde(default)]
    pub second_surname: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub second_name: String,
    #[serde(default)]
    pub department_code: String,
    #[serde(default)]
    pub municipality_code: String,
    pub contributor_type: String,
    #[serde(default = "default_subtype")]
    pub contributor_subtype: String,
    #[serde(default)]
    pub basic_salary: Option<Decimal>,
    #[serde(default)]
    pub salary_scheme: SalaryScheme,
    #[serde(default)]
    pub flags: SubsystemFlags,
    #[serde(default)]
    pub entities: EntityCodes,
    #[serde(default)]
    pub risk_class: Option<String>,
    /// Тариф ARL в процентах.
    #[serde(default)]
    pub risk_tariff: Option<Decimal>,
    #[serde(default)]
    pub work_center: Option<u32>,
    #[serde(default)]
    pub economic_activity: Option<String>,

    // старый формат: одна строка прямо в сотруднике
    #[serde(default)]
    pub days: Option<SubsystemDays>,
    #[serde(default)]
    pub bases: Option<BasesPayload>,
    #[serde(default)]
    pub novelties: Vec<NoveltyPayload>,

    #[serde(default)]
    pub lines: Vec<LinePayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunPayload {
    pub company: CompanyPayload,
    pub period: String,
    pub run: RunInfoPayload,
    #[serde(default)]
    pub parameters: LegalParameters,
    pub employees: Vec<EmployeePayload>,
}

impl RunPayload {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_reader<R: Read>(r: R) -> Result<Self> {
        Ok(serde_json::from_reader(r)?)
    }

    /// Проверяет и превращает в ведомость: по строке на каждый слот.
    pub fn into_run(self, id: RunId) -> Result<PayrollRun> {
        let period: Period = self.period.parse()?;
        if self.employees.is_empty() {
            return Err(PilaError::Parse("employees must not be empty".into()));
        }

        let company = self.company.into_employer();
        let mut employees = Vec::with_capacity(self.employees.len());
        let mut lines = Vec::new();
        let mut next_id = 1;

        for emp in self.employees {
            let risk_class = emp
                .risk_class
                .as_deref()
                .map(str::trim)
                .filter(|c| RISK_CLASSES.contains(c))
                .unwrap_or(company.default_risk_class.as_str())
                .to_string();
            let profile = emp.profile(&risk_class);

            let slots = if emp.lines.is_empty() {
                vec![LinePayload {
                    kind: default_line_kind(),
                    days: emp.days.unwrap_or_default(),
                    bases: emp.bases.unwrap_or_default(),
                    novelties: emp.novelties,
                }]
            } else {
                emp.lines
            };

            for slot in slots {
                let events = slot
                    .novelties
                    .into_iter()
                    .map(NoveltyPayload::into_event)
                    .collect::<Result<Vec<_>>>()?
                    .into_iter()
                    .flatten()
                    .collect();
                lines.push(DetailLine {
                    id: next_id,
                    document: profile.document.clone(),
                    first_name: profile.first_name.clone(),
                    first_surname: profile.first_surname.clone(),
                    contributor_type: profile.contributor_type.clone(),
                    contributor_subtype: profile.contributor_subtype.clone(),
                    line_kind: slot.kind,
                    contributed_days: slot.days.health,
                    days: slot.days,
                    declared_base: slot.bases.health,
                    bases: SubsystemBases {
                        health: slot.bases.health,
                        pension: slot.bases.pension,
                        risk: slot.bases.risk,
                        family_fund: slot.bases.parafiscal,
                    },
                    risk_class: risk_class.clone(),
                    family_fund: profile
                        .entities
                        .family_fund
                        .as_deref()
                        .is_some_and(|c| !c.trim().is_empty()),
                    state: LineState::Ok,
                    errors: Vec::new(),
                    warnings: Vec::new(),
                    breakdown: None,
                    employee_total: 0,
                    employer_total: 0,
                    events,
                });
                next_id += 1;
            }
            employees.push(profile);
        }

        debug!(run_id = id, employees = employees.len(), lines = lines.len(), "payload ingested");
        Ok(PayrollRun {
            id,
            reference: self.run.reference,
            period,
            company,
            submission_type: self.run.submission_type,
            state: RunState::InProgress,
            totals: None,
            summary: RunSummary::default(),
            errors: Vec::new(),
            has_file: false,
            parameters: self.parameters,
            employees,
            lines,
        })
    }
}

impl CompanyPayload {
    fn into_employer(self) -> Employer {
        let default_risk_class = if RISK_CLASSES.contains(&self.default_risk_class.trim()) {
            self.default_risk_class.trim().to_string()
        } else {
            default_risk_class()
        };
        Employer {
            name: self.name,
            document_type: self.document_type,
            tax_id: self.tax_id,
            check_digit: self.check_digit,
            branch: self.branch,
            employer_type: self.employer_type,
            presentation_mode: self.presentation_mode,
            risk_administrator: self.risk_administrator,
            registration_code: self.registration_code,
            exempt: self.exempt,
            default_risk_class,
        }
    }
}

impl EmployeePayload {
    fn profile(&self, risk_class: &str) -> EmployeeProfile {
        EmployeeProfile {
            document: DocumentId::new(self.document_type.trim(), self.document_number.trim()),
            first_surname: self.first_surname.clone(),
            second_surname: self.second_surname.clone(),
            first_name: self.first_name.clone(),
            second_name: self.second_name.clone(),
            department_code: self.department_code.clone(),
            municipality_code: self.municipality_code.clone(),
            contributor_type: self.contributor_type.trim().to_string(),
            contributor_subtype: self.contributor_subtype.trim().to_string(),
            basic_salary: self.basic_salary.unwrap_or_default(),
            salary_scheme: self.salary_scheme,
            flags: self.flags,
            entities: self.entities.clone(),
            risk_class: Some(risk_class.to_string()),
            risk_tariff: self.risk_tariff,
            work_center: self.work_center.unwrap_or(0),
            economic_activity: self.economic_activity.clone(),
        }
    }
}

fn parse_date(field: &str, s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| PilaError::Parse(format!("{field} '{s}': {e}")))
}

impl NoveltyPayload {
    /// `Ok(None)`: новедад без даты начала, пропускается.
    fn into_event(self) -> Result<Option<NoveltyEvent>> {
        let code: NoveltyCode = self.code.parse()?;
        let Some(start) = self.start.as_deref().filter(|s| !s.trim().is_empty()) else {
            warn!(code = code.as_str(), "novelty without start date skipped");
            return Ok(None);
        };
        let start = parse_date("novelty start", start)?;
        let end = match self.end.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(s) => Some(parse_date("novelty end", s)?),
            None => None,
        };
        Ok(Some(NoveltyEvent {
            code,
            start,
            end,
            days: self.days,
            value: self.value,
            metadata: EventMetadata {
                contributed_days: self.contributed_days,
                previous_salary: self.previous_salary,
                new_salary: self.new_salary,
                extra: self.extra,
            },
        }))
    }
}
