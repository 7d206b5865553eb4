//! Доменные модели: ведомость взносов, её строки и новедады (события отсутствия/движения).

use crate::config::LegalParameters;
use crate::error::{PilaError, Result};
use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

pub type RunId = u64;
pub type LineId = u64;

/// Тип взносоплательщика «студент-практикант»: платит только ARL.
pub const STUDENT_CONTRIBUTOR_TYPE: &str = "23";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    InProgress,
    Completed,
    CompletedWithErrors,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineState {
    Ok,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId {
    pub kind: String,
    pub number: String,
}

impl DocumentId {
    pub fn new(kind: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            number: number.into(),
        }
    }
}

/// Период взносов `YYYY-MM`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(PilaError::Parse(format!("period month {month} out of range")));
        }
        Ok(Self { year, month })
    }

    /// Период оплаты: следующий календарный месяц.
    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

static PERIOD_RE: OnceLock<Regex> = OnceLock::new();

fn period_re() -> Result<&'static Regex> {
    if let Some(re) = PERIOD_RE.get() {
        return Ok(re);
    }
    let re = Regex::new(r"^(?P<y>\d{4})-(?P<m>\d{2})$").map_err(|e| PilaError::Parse(e.to_string()))?;
    Ok(PERIOD_RE.get_or_init(|| re))
}

impl FromStr for Period {
    type Err = PilaError;

    fn from_str(s: &str) -> Result<Self> {
        let caps = period_re()?
            .captures(s.trim())
            .ok_or_else(|| PilaError::Parse(format!("period '{s}' is not YYYY-MM")))?;
        let year: i32 = caps["y"]
            .parse()
            .map_err(|e| PilaError::Parse(format!("period year: {e}")))?;
        let month: u32 = caps["m"]
            .parse()
            .map_err(|e| PilaError::Parse(format!("period month: {e}")))?;
        Period::new(year, month)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl TryFrom<String> for Period {
    type Error = PilaError;
    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Period> for String {
    fn from(p: Period) -> Self {
        p.to_string()
    }
}

/// Коды новедадов, которые понимает расчёт и запись файла.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum NoveltyCode {
    /// Ингресо, поступление на работу.
    Ing,
    /// Ретиро, увольнение.
    Ret,
    /// Постоянное изменение оклада.
    Vsp,
    /// Временное изменение оклада.
    Vst,
    /// Неоплачиваемый отпуск.
    Sln,
    /// Болезнь общего характера.
    Ige,
    /// Декрет (материнство/отцовство).
    Lma,
    /// Отпуск.
    Vac,
    /// Нетрудоспособность по профессиональному риску.
    Irl,
}

impl NoveltyCode {
    pub fn as_str(self) -> &'static str {
        match self {
            NoveltyCode::Ing => "ING",
            NoveltyCode::Ret => "RET",
            NoveltyCode::Vsp => "VSP",
            NoveltyCode::Vst => "VST",
            NoveltyCode::Sln => "SLN",
            NoveltyCode::Ige => "IGE",
            NoveltyCode::Lma => "LMA",
            NoveltyCode::Vac => "VAC",
            NoveltyCode::Irl => "IRL",
        }
    }

    /// Может переопределить число отработанных дней строки.
    pub fn overrides_days(self) -> bool {
        matches!(self, NoveltyCode::Ing | NoveltyCode::Ret)
    }

    /// Нет экспозиции риску: ставка ARL в расчёте нулевая.
    pub fn is_no_exposure(self) -> bool {
        matches!(self, NoveltyCode::Vac | NoveltyCode::Ige | NoveltyCode::Lma)
    }
}

impl FromStr for NoveltyCode {
    type Err = PilaError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "ING" => NoveltyCode::Ing,
            "RET" => NoveltyCode::Ret,
            "VSP" => NoveltyCode::Vsp,
            "VST" => NoveltyCode::Vst,
            "SLN" => NoveltyCode::Sln,
            "IGE" => NoveltyCode::Ige,
            "LMA" => NoveltyCode::Lma,
            "VAC" => NoveltyCode::Vac,
            "IRL" => NoveltyCode::Irl,
            other => return Err(PilaError::Parse(format!("unknown novelty code {other}"))),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EventMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributed_days: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_salary: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_salary: Option<Decimal>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoveltyEvent {
    pub code: NoveltyCode,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub days: Option<u32>,
    pub value: Option<Decimal>,
    #[serde(default)]
    pub metadata: EventMetadata,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubsystemDays {
    pub health: i32,
    pub pension: i32,
    pub risk: i32,
    pub family_fund: i32,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct SubsystemBases {
    pub health: Decimal,
    pub pension: Decimal,
    pub risk: Decimal,
    pub family_fund: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SubsystemFlags {
    pub health: bool,
    pub pension: bool,
    pub risk: bool,
    pub family_fund: bool,
}

impl Default for SubsystemFlags {
    fn default() -> Self {
        Self {
            health: true,
            pension: true,
            risk: true,
            family_fund: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SalaryScheme {
    #[default]
    Fixed,
    Variable,
    /// Интегральный оклад (всё включено).
    Integral,
}

impl SalaryScheme {
    pub fn code(self) -> &'static str {
        match self {
            SalaryScheme::Fixed => "F",
            SalaryScheme::Variable => "V",
            SalaryScheme::Integral => "X",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EntityCodes {
    pub pension_fund: Option<String>,
    pub health_insurer: Option<String>,
    pub risk_administrator: Option<String>,
    pub family_fund: Option<String>,
}

/// Справочные данные сотрудника, которых нет в строке ведомости.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmployeeProfile {
    pub document: DocumentId,
    pub first_surname: String,
    pub second_surname: String,
    pub first_name: String,
    pub second_name: String,
    pub department_code: String,
    pub municipality_code: String,
    pub contributor_type: String,
    pub contributor_subtype: String,
    pub basic_salary: Decimal,
    pub salary_scheme: SalaryScheme,
    pub flags: SubsystemFlags,
    pub entities: EntityCodes,
    pub risk_class: Option<String>,
    /// Тариф ARL в процентах (например `0.522`).
    pub risk_tariff: Option<Decimal>,
    pub work_center: u32,
    pub economic_activity: Option<String>,
}

impl EmployeeProfile {
    pub fn is_integral(&self) -> bool {
        self.salary_scheme == SalaryScheme::Integral
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Employer {
    pub name: String,
    pub document_type: String,
    pub tax_id: String,
    pub check_digit: Option<String>,
    pub branch: String,
    pub employer_type: String,
    /// `U` единая подача, `S` по филиалам.
    pub presentation_mode: String,
    pub risk_administrator: Option<String>,
    pub registration_code: String,
    pub exempt: bool,
    pub default_risk_class: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct HealthContribution {
    pub applies: bool,
    pub base: i64,
    pub employee_rate: Decimal,
    pub employer_rate: Decimal,
    pub employee: i64,
    pub employer: i64,
    pub total: i64,
    pub employer_exempt: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct PensionContribution {
    pub applies: bool,
    pub base: i64,
    pub employee_rate: Decimal,
    pub employer_rate: Decimal,
    pub employee: i64,
    pub employer: i64,
    pub total: i64,
    pub solidarity: i64,
    pub subsistence: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RiskContribution {
    pub applies: bool,
    pub base: i64,
    pub risk_class: String,
    pub rate: Decimal,
    pub employer: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct FamilyFundContribution {
    pub applies: bool,
    pub base: i64,
    pub rate: Decimal,
    pub employer: i64,
    pub exempt: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContributionBreakdown {
    pub health: HealthContribution,
    pub pension: PensionContribution,
    pub risk: RiskContribution,
    pub family_fund: FamilyFundContribution,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetailLine {
    pub id: LineId,
    pub document: DocumentId,
    pub first_name: String,
    pub first_surname: String,
    pub contributor_type: String,
    pub contributor_subtype: String,
    /// `NORMAL`, `VAC`, ...: откуда взялась строка.
    pub line_kind: String,
    pub contributed_days: i32,
    pub days: SubsystemDays,
    pub declared_base: Decimal,
    pub bases: SubsystemBases,
    pub risk_class: String,
    pub family_fund: bool,
    pub state: LineState,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub breakdown: Option<ContributionBreakdown>,
    pub employee_total: i64,
    pub employer_total: i64,
    pub events: Vec<NoveltyEvent>,
}

impl DetailLine {
    pub fn is_ok(&self) -> bool {
        self.state == LineState::Ok
    }

    pub fn is_student(&self) -> bool {
        self.contributor_type == STUDENT_CONTRIBUTOR_TYPE
    }

    pub fn has_event(&self, code: NoveltyCode) -> bool {
        self.events.iter().any(|e| e.code == code)
    }

    pub fn event(&self, code: NoveltyCode) -> Option<&NoveltyEvent> {
        self.events.iter().find(|e| e.code == code)
    }

    pub fn apply(&mut self, r: LineResult) {
        self.contributed_days = r.contributed_days;
        self.days = r.days;
        self.bases = r.bases;
        self.state = r.state;
        self.errors = r.errors;
        self.warnings = r.warnings;
        self.breakdown = r.breakdown;
        self.employee_total = r.employee_total;
        self.employer_total = r.employer_total;
    }
}

/// Результат расчёта одной строки, сохраняется обратно в хранилище.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineResult {
    pub line_id: LineId,
    pub contributed_days: i32,
    pub days: SubsystemDays,
    pub bases: SubsystemBases,
    pub state: LineState,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub breakdown: Option<ContributionBreakdown>,
    pub employee_total: i64,
    pub employer_total: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShareTotals {
    pub employee: i64,
    pub employer: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunTotals {
    pub employee: i64,
    pub employer: i64,
    pub total: i64,
    pub health: ShareTotals,
    pub pension: ShareTotals,
    pub risk_employer: i64,
    pub family_fund_employer: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: u32,
    pub errored: u32,
    pub warnings: u32,
}

/// Итог прохода калькулятора, который сохраняется на уровне ведомости.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunOutcome {
    pub state: RunState,
    pub totals: Option<RunTotals>,
    pub summary: RunSummary,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayrollRun {
    pub id: RunId,
    pub reference: String,
    pub period: Period,
    pub company: Employer,
    /// Тип планильи из заявки (`E`, `K`, ...).
    pub submission_type: String,
    pub state: RunState,
    pub totals: Option<RunTotals>,
    pub summary: RunSummary,
    pub errors: Vec<String>,
    pub has_file: bool,
    pub parameters: LegalParameters,
    pub employees: Vec<EmployeeProfile>,
    pub lines: Vec<DetailLine>,
}

impl PayrollRun {
    pub fn employee(&self, doc: &DocumentId) -> Option<&EmployeeProfile> {
        self.employees.iter().find(|e| &e.document == doc)
    }

    pub fn apply_outcome(&mut self, o: RunOutcome) {
        self.state = o.state;
        self.totals = o.totals;
        self.summary = o.summary;
        self.errors = o.errors;
    }
}
