//! Регистр 02, строка сотрудника (693 колонки).
//!
//! Размечены не все колонки: неразмеченное берётся из `raw_head` (1-332) и
//! `raw_tail` (333-693), которые пишутся первыми и перекрываются известными полями.

use super::layout::{encode, Cell, Column, Decoded, Kind, Layout};
use crate::error::{PilaError, Result};
use chrono::NaiveDate;
use serde::Serialize;

const DATE_FMT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailField {
    RecordType,
    Sequence,
    DocumentType,
    DocumentNumber,
    ContributorType,
    ContributorSubtype,
    Location,
    FirstSurname,
    SecondSurname,
    FirstName,
    SecondName,
    Ing,
    Ret,
    Vsp,
    Vst,
    Sln,
    Ige,
    Lma,
    Vac,
    IncapacityDays,
    PensionFund,
    HealthInsurer,
    FamilyFund,
    PensionDays,
    HealthDays,
    RiskDays,
    FamilyFundDays,
    BasicSalary,
    SalaryType,
    PensionBase,
    HealthBase,
    RiskBase,
    FamilyFundBase,
    PensionRate,
    PensionContribution,
    VoluntaryAffiliate,
    VoluntaryEmployer,
    PensionTotal,
    Solidarity,
    Subsistence,
    NotWithheld,
    HealthRate,
    HealthContribution,
    Upc,
    Head,
    Tail,
    SicknessValue,
    RiskTariff,
    WorkCenter,
    RiskAmount,
    FamilyFundRate,
    FamilyFundValue,
    SenaRate,
    SenaValue,
    IcbfRate,
    IcbfValue,
    Exempt,
    RiskAdministrator,
    RiskClass,
    IngDate,
    RetDate,
    VspDate,
    SlnStart,
    SlnEnd,
    IgeStart,
    IgeEnd,
    LmaStart,
    LmaEnd,
    VacStart,
    VacEnd,
    IrlStart,
    IrlEnd,
    OtherParafiscalBase,
    Hours,
    EconomicActivity,
}

/// Однобуквенные отметки новедадов (колонки 137–149).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NoveltyFlags {
    pub ing: bool,
    pub ret: bool,
    pub vsp: bool,
    pub vst: bool,
    pub sln: bool,
    pub ige: bool,
    pub lma: bool,
    pub vac: bool,
}

/// Даты новедадов (колонки 515–664).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NoveltyDates {
    pub ing: Option<NaiveDate>,
    pub ret: Option<NaiveDate>,
    pub vsp: Option<NaiveDate>,
    pub sln: (Option<NaiveDate>, Option<NaiveDate>),
    pub ige: (Option<NaiveDate>, Option<NaiveDate>),
    pub lma: (Option<NaiveDate>, Option<NaiveDate>),
    pub vac: (Option<NaiveDate>, Option<NaiveDate>),
    pub irl: (Option<NaiveDate>, Option<NaiveDate>),
}

/// Полностью подготовленные значения строки 02. Всё, что в `Option`,
/// при `None` не пишется и остаётся от хвоста.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetailRecord {
    pub sequence: i64,
    pub document_type: String,
    pub document_number: String,
    pub contributor_type: String,
    pub contributor_subtype: String,
    pub location: String,
    pub first_surname: String,
    pub second_surname: String,
    pub first_name: String,
    pub second_name: String,
    pub novelties: NoveltyFlags,
    pub incapacity_days: i64,
    pub pension_fund: String,
    pub health_insurer: String,
    pub family_fund: String,
    pub pension_days: i64,
    pub health_days: i64,
    pub risk_days: i64,
    pub family_fund_days: i64,
    pub basic_salary: i64,
    pub salary_type: String,
    pub pension_base: i64,
    pub health_base: i64,
    pub risk_base: i64,
    pub family_fund_base: i64,
    pub pension_rate: String,
    pub pension_contribution: i64,
    pub voluntary_affiliate: i64,
    pub voluntary_employer: i64,
    pub pension_total: i64,
    pub solidarity: i64,
    pub subsistence: i64,
    pub not_withheld: i64,
    pub health_rate: String,
    pub health_contribution: i64,
    pub upc: i64,

    /// Колонки 1-332 как есть (ровно 332 символа), только у разобранной строки.
    pub raw_head: Option<String>,
    /// Колонки 333-693 как есть (ровно 361 символ).
    pub raw_tail: Option<String>,
    pub sickness_value: Option<i64>,
    pub risk_tariff: Option<String>,
    pub work_center: i64,
    pub risk_amount: Option<i64>,
    pub family_fund_rate: Option<String>,
    pub family_fund_value: Option<i64>,
    pub sena_rate: Option<String>,
    pub sena_value: Option<i64>,
    pub icbf_rate: Option<String>,
    pub icbf_value: Option<i64>,
    pub exempt: Option<String>,
    pub risk_administrator: Option<String>,
    pub risk_class: String,
    pub dates: NoveltyDates,
    pub other_parafiscal_base: Option<i64>,
    pub hours: Option<i64>,
    pub economic_activity: Option<String>,
}

impl DetailRecord {
    pub const RECORD_TYPE: &'static str = "02";
    pub const TAIL_START: usize = 333;

    pub fn encode(&self) -> Result<String> {
        encode(self)
    }

    /// Разбирает строку обратно. Исходные колонки сохраняются в `raw_head` и
    /// `raw_tail`, поэтому повторная запись даёт ту же строку.
    pub fn decode(line: &str) -> Result<Self> {
        use DetailField as F;
        let d = Decoded::<Self>::parse(line)?;
        Ok(Self {
            sequence: d.number(F::Sequence)?,
            document_type: d.text(F::DocumentType)?,
            document_number: d.text(F::DocumentNumber)?,
            contributor_type: d.text(F::ContributorType)?,
            contributor_subtype: d.text(F::ContributorSubtype)?,
            location: d.text(F::Location)?,
            first_surname: d.text(F::FirstSurname)?,
            second_surname: d.text(F::SecondSurname)?,
            first_name: d.text(F::FirstName)?,
            second_name: d.text(F::SecondName)?,
            novelties: NoveltyFlags {
                ing: d.flag(F::Ing)?,
                ret: d.flag(F::Ret)?,
                vsp: d.flag(F::Vsp)?,
                vst: d.flag(F::Vst)?,
                sln: d.flag(F::Sln)?,
                ige: d.flag(F::Ige)?,
                lma: d.flag(F::Lma)?,
                vac: d.flag(F::Vac)?,
            },
            incapacity_days: d.number(F::IncapacityDays)?,
            pension_fund: d.text(F::PensionFund)?,
            health_insurer: d.text(F::HealthInsurer)?,
            family_fund: d.text(F::FamilyFund)?,
            pension_days: d.number(F::PensionDays)?,
            health_days: d.number(F::HealthDays)?,
            risk_days: d.number(F::RiskDays)?,
            family_fund_days: d.number(F::FamilyFundDays)?,
            basic_salary: d.number(F::BasicSalary)?,
            salary_type: d.text(F::SalaryType)?,
            pension_base: d.number(F::PensionBase)?,
            health_base: d.number(F::HealthBase)?,
            risk_base: d.number(F::RiskBase)?,
            family_fund_base: d.number(F::FamilyFundBase)?,
            pension_rate: d.text(F::PensionRate)?,
            pension_contribution: d.number(F::PensionContribution)?,
            voluntary_affiliate: d.number(F::VoluntaryAffiliate)?,
            voluntary_employer: d.number(F::VoluntaryEmployer)?,
            pension_total: d.number(F::PensionTotal)?,
            solidarity: d.number(F::Solidarity)?,
            subsistence: d.number(F::Subsistence)?,
            not_withheld: d.number(F::NotWithheld)?,
            health_rate: d.text(F::HealthRate)?,
            health_contribution: d.number(F::HealthContribution)?,
            upc: d.number(F::Upc)?,
            raw_head: Some(d.raw(F::Head)?),
            raw_tail: Some(d.raw(F::Tail)?),
            sickness_value: d.opt_number(F::SicknessValue)?,
            risk_tariff: d.opt_text(F::RiskTariff)?,
            work_center: d.number(F::WorkCenter)?,
            risk_amount: d.opt_number(F::RiskAmount)?,
            family_fund_rate: d.opt_text(F::FamilyFundRate)?,
            family_fund_value: d.opt_number(F::FamilyFundValue)?,
            sena_rate: d.opt_text(F::SenaRate)?,
            sena_value: d.opt_number(F::SenaValue)?,
            icbf_rate: d.opt_text(F::IcbfRate)?,
            icbf_value: d.opt_number(F::IcbfValue)?,
            exempt: d.opt_text(F::Exempt)?,
            risk_administrator: d.opt_text(F::RiskAdministrator)?,
            risk_class: d.text(F::RiskClass)?,
            dates: NoveltyDates {
                ing: date(&d, F::IngDate)?,
                ret: date(&d, F::RetDate)?,
                vsp: date(&d, F::VspDate)?,
                sln: (date(&d, F::SlnStart)?, date(&d, F::SlnEnd)?),
                ige: (date(&d, F::IgeStart)?, date(&d, F::IgeEnd)?),
                lma: (date(&d, F::LmaStart)?, date(&d, F::LmaEnd)?),
                vac: (date(&d, F::VacStart)?, date(&d, F::VacEnd)?),
                irl: (date(&d, F::IrlStart)?, date(&d, F::IrlEnd)?),
            },
            other_parafiscal_base: d.opt_number(F::OtherParafiscalBase)?,
            hours: d.opt_number(F::Hours)?,
            economic_activity: d.opt_text(F::EconomicActivity)?,
        })
    }
}

fn date(d: &Decoded<DetailRecord>, field: DetailField) -> Result<Option<NaiveDate>> {
    d.opt_text(field)?
        .map(|t| {
            NaiveDate::parse_from_str(t.trim(), DATE_FMT)
                .map_err(|e| PilaError::Parse(format!("detail {field:?} '{t}': {e}")))
        })
        .transpose()
}

fn flag(on: bool) -> Cell<'static> {
    if on {
        Cell::text("X")
    } else {
        Cell::Keep
    }
}

fn date_cell(d: Option<NaiveDate>) -> Cell<'static> {
    d.map_or(Cell::Keep, |d| Cell::owned(d.format(DATE_FMT).to_string()))
}

impl Layout for DetailRecord {
    type Field = DetailField;

    const NAME: &'static str = "detail";
    const LEN: usize = 693;
    const COLUMNS: &'static [Column<DetailField>] = &[
        // сырые фрагменты первыми: всё ниже их перекрывает
        Column::new(DetailField::Head, 1, 332, Kind::Raw),
        Column::new(DetailField::Tail, 333, 693, Kind::Raw),
        Column::new(DetailField::RecordType, 1, 2, Kind::Alpha),
        Column::new(DetailField::Sequence, 3, 7, Kind::Numeric),
        Column::new(DetailField::DocumentType, 8, 9, Kind::Alpha),
        Column::new(DetailField::DocumentNumber, 10, 25, Kind::Alpha),
        Column::new(DetailField::ContributorType, 26, 27, Kind::Alpha),
        Column::new(DetailField::ContributorSubtype, 28, 29, Kind::Alpha),
        Column::new(DetailField::Location, 32, 36, Kind::Alpha),
        Column::new(DetailField::FirstSurname, 37, 56, Kind::Alpha),
        Column::new(DetailField::SecondSurname, 57, 86, Kind::Alpha),
        Column::new(DetailField::FirstName, 87, 106, Kind::Alpha),
        Column::new(DetailField::SecondName, 107, 136, Kind::Alpha),
        Column::new(DetailField::Ing, 137, 137, Kind::Alpha),
        Column::new(DetailField::Ret, 138, 138, Kind::Alpha),
        Column::new(DetailField::Vsp, 143, 143, Kind::Alpha),
        Column::new(DetailField::Vst, 145, 145, Kind::Alpha),
        Column::new(DetailField::Sln, 146, 146, Kind::Alpha),
        Column::new(DetailField::Ige, 147, 147, Kind::Alpha),
        Column::new(DetailField::Lma, 148, 148, Kind::Alpha),
        Column::new(DetailField::Vac, 149, 149, Kind::Alpha),
        Column::new(DetailField::IncapacityDays, 152, 153, Kind::Numeric),
        Column::new(DetailField::PensionFund, 154, 159, Kind::Alpha),
        Column::new(DetailField::HealthInsurer, 166, 171, Kind::Alpha),
        Column::new(DetailField::FamilyFund, 178, 183, Kind::Alpha),
        Column::new(DetailField::PensionDays, 184, 185, Kind::Numeric),
        Column::new(DetailField::HealthDays, 186, 187, Kind::Numeric),
        Column::new(DetailField::RiskDays, 188, 189, Kind::Numeric),
        Column::new(DetailField::FamilyFundDays, 190, 191, Kind::Numeric),
        Column::new(DetailField::BasicSalary, 192, 200, Kind::Numeric),
        Column::new(DetailField::SalaryType, 201, 201, Kind::Alpha),
        Column::new(DetailField::PensionBase, 202, 210, Kind::Numeric),
        Column::new(DetailField::HealthBase, 211, 219, Kind::Numeric),
        Column::new(DetailField::RiskBase, 220, 228, Kind::Numeric),
        Column::new(DetailField::FamilyFundBase, 229, 237, Kind::Numeric),
        Column::new(DetailField::PensionRate, 238, 244, Kind::Alpha),
        Column::new(DetailField::PensionContribution, 245, 253, Kind::Numeric),
        Column::new(DetailField::VoluntaryAffiliate, 254, 262, Kind::Numeric),
        Column::new(DetailField::VoluntaryEmployer, 263, 271, Kind::Numeric),
        Column::new(DetailField::PensionTotal, 272, 280, Kind::Numeric),
        Column::new(DetailField::Solidarity, 281, 289, Kind::Numeric),
        Column::new(DetailField::Subsistence, 290, 298, Kind::Numeric),
        Column::new(DetailField::NotWithheld, 299, 307, Kind::Numeric),
        Column::new(DetailField::HealthRate, 308, 314, Kind::Alpha),
        Column::new(DetailField::HealthContribution, 315, 323, Kind::Numeric),
        Column::new(DetailField::Upc, 324, 332, Kind::Numeric),
        Column::new(DetailField::SicknessValue, 348, 356, Kind::Numeric),
        Column::new(DetailField::RiskTariff, 381, 389, Kind::Alpha),
        Column::new(DetailField::WorkCenter, 390, 398, Kind::Numeric),
        Column::new(DetailField::RiskAmount, 399, 407, Kind::Numeric),
        Column::new(DetailField::FamilyFundRate, 408, 414, Kind::Alpha),
        Column::new(DetailField::FamilyFundValue, 415, 423, Kind::Numeric),
        Column::new(DetailField::SenaRate, 424, 430, Kind::Alpha),
        Column::new(DetailField::SenaValue, 431, 439, Kind::Numeric),
        Column::new(DetailField::IcbfRate, 440, 446, Kind::Alpha),
        Column::new(DetailField::IcbfValue, 447, 455, Kind::Numeric),
        Column::new(DetailField::Exempt, 506, 506, Kind::Alpha),
        Column::new(DetailField::RiskAdministrator, 507, 512, Kind::Alpha),
        Column::new(DetailField::RiskClass, 513, 513, Kind::Alpha),
        Column::new(DetailField::IngDate, 515, 524, Kind::Alpha),
        Column::new(DetailField::RetDate, 525, 534, Kind::Alpha),
        Column::new(DetailField::VspDate, 535, 544, Kind::Alpha),
        Column::new(DetailField::SlnStart, 545, 554, Kind::Alpha),
        Column::new(DetailField::SlnEnd, 555, 564, Kind::Alpha),
        Column::new(DetailField::IgeStart, 565, 574, Kind::Alpha),
        Column::new(DetailField::IgeEnd, 575, 584, Kind::Alpha),
        Column::new(DetailField::LmaStart, 585, 594, Kind::Alpha),
        Column::new(DetailField::LmaEnd, 595, 604, Kind::Alpha),
        Column::new(DetailField::VacStart, 605, 614, Kind::Alpha),
        Column::new(DetailField::VacEnd, 615, 624, Kind::Alpha),
        Column::new(DetailField::IrlStart, 645, 654, Kind::Alpha),
        Column::new(DetailField::IrlEnd, 655, 664, Kind::Alpha),
        Column::new(DetailField::OtherParafiscalBase, 665, 673, Kind::Numeric),
        Column::new(DetailField::Hours, 674, 676, Kind::Numeric),
        Column::new(DetailField::EconomicActivity, 687, 693, Kind::Alpha),
    ];

    fn cell(&self, field: DetailField) -> Cell<'_> {
        use DetailField as F;
        let n = &self.novelties;
        let dt = &self.dates;
        match field {
            F::RecordType => Cell::text(Self::RECORD_TYPE),
            F::Sequence => Cell::Number(self.sequence),
            F::DocumentType => Cell::text(&self.document_type),
            F::DocumentNumber => Cell::text(&self.document_number),
            F::ContributorType => Cell::text(&self.contributor_type),
            F::ContributorSubtype => Cell::text(&self.contributor_subtype),
            F::Location => Cell::text(&self.location),
            F::FirstSurname => Cell::text(&self.first_surname),
            F::SecondSurname => Cell::text(&self.second_surname),
            F::FirstName => Cell::text(&self.first_name),
            F::SecondName => Cell::text(&self.second_name),
            F::Ing => flag(n.ing),
            F::Ret => flag(n.ret),
            F::Vsp => flag(n.vsp),
            F::Vst => flag(n.vst),
            F::Sln => flag(n.sln),
            F::Ige => flag(n.ige),
            F::Lma => flag(n.lma),
            F::Vac => flag(n.vac),
            F::IncapacityDays => Cell::Number(self.incapacity_days),
            F::PensionFund => Cell::text(&self.pension_fund),
            F::HealthInsurer => Cell::text(&self.health_insurer),
            F::FamilyFund => Cell::text(&self.family_fund),
            F::PensionDays => Cell::Number(self.pension_days),
            F::HealthDays => Cell::Number(self.health_days),
            F::RiskDays => Cell::Number(self.risk_days),
            F::FamilyFundDays => Cell::Number(self.family_fund_days),
            F::BasicSalary => Cell::Number(self.basic_salary),
            F::SalaryType => Cell::text(&self.salary_type),
            F::PensionBase => Cell::Number(self.pension_base),
            F::HealthBase => Cell::Number(self.health_base),
            F::RiskBase => Cell::Number(self.risk_base),
            F::FamilyFundBase => Cell::Number(self.family_fund_base),
            F::PensionRate => Cell::text(&self.pension_rate),
            F::PensionContribution => Cell::Number(self.pension_contribution),
            F::VoluntaryAffiliate => Cell::Number(self.voluntary_affiliate),
            F::VoluntaryEmployer => Cell::Number(self.voluntary_employer),
            F::PensionTotal => Cell::Number(self.pension_total),
            F::Solidarity => Cell::Number(self.solidarity),
            F::Subsistence => Cell::Number(self.subsistence),
            F::NotWithheld => Cell::Number(self.not_withheld),
            F::HealthRate => Cell::text(&self.health_rate),
            F::HealthContribution => Cell::Number(self.health_contribution),
            F::Upc => Cell::Number(self.upc),
            F::Head => Cell::opt_text(self.raw_head.as_deref()),
            F::Tail => Cell::opt_text(self.raw_tail.as_deref()),
            F::SicknessValue => Cell::opt_number(self.sickness_value),
            F::RiskTariff => Cell::opt_text(self.risk_tariff.as_deref()),
            F::WorkCenter => Cell::Number(self.work_center),
            F::RiskAmount => Cell::opt_number(self.risk_amount),
            F::FamilyFundRate => Cell::opt_text(self.family_fund_rate.as_deref()),
            F::FamilyFundValue => Cell::opt_number(self.family_fund_value),
            F::SenaRate => Cell::opt_text(self.sena_rate.as_deref()),
            F::SenaValue => Cell::opt_number(self.sena_value),
            F::IcbfRate => Cell::opt_text(self.icbf_rate.as_deref()),
            F::IcbfValue => Cell::opt_number(self.icbf_value),
            F::Exempt => Cell::opt_text(self.exempt.as_deref()),
            F::RiskAdministrator => Cell::opt_text(self.risk_administrator.as_deref()),
            F::RiskClass => Cell::text(&self.risk_class),
            F::IngDate => date_cell(dt.ing),
            F::RetDate => date_cell(dt.ret),
            F::VspDate => date_cell(dt.vsp),
            F::SlnStart => date_cell(dt.sln.0),
            F::SlnEnd => date_cell(dt.sln.1),
            F::IgeStart => date_cell(dt.ige.0),
            F::IgeEnd => date_cell(dt.ige.1),
            F::LmaStart => date_cell(dt.lma.0),
            F::LmaEnd => date_cell(dt.lma.1),
            F::VacStart => date_cell(dt.vac.0),
            F::VacEnd => date_cell(dt.vac.1),
            F::IrlStart => date_cell(dt.irl.0),
            F::IrlEnd => date_cell(dt.irl.1),
            F::OtherParafiscalBase => Cell::opt_number(self.other_parafiscal_base),
            F::Hours => Cell::opt_number(self.hours),
            F::EconomicActivity => Cell::opt_text(self.economic_activity.as_deref()),
        }
    }
}
