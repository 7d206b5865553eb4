//! Регистр 01, заголовок планильи (359 колонок).

use super::layout::{encode, Cell, Column, Decoded, Kind, Layout};
use crate::error::Result;
use crate::model::Period;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderField {
    RecordType,
    RegistrationCode,
    CompanyName,
    DocumentType,
    TaxId,
    CheckDigit,
    SubmissionType,
    PresentationMode,
    RiskAdministrator,
    Period,
    PaymentPeriod,
    Contributors,
    PayrollTotal,
    EmployerType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderRecord {
    pub registration_code: String,
    pub company_name: String,
    pub document_type: String,
    /// Только цифры, без DV.
    pub tax_id: i64,
    pub check_digit: String,
    pub submission_type: String,
    pub presentation_mode: String,
    pub risk_administrator: String,
    pub period: Period,
    pub payment_period: Period,
    /// Уникальные (тип, номер документа), не число строк.
    pub contributors: i64,
    /// Сумма IBC кассы по включённым строкам.
    pub payroll_total: i64,
    pub employer_type: String,
}

impl HeaderRecord {
    pub const RECORD_TYPE: &'static str = "01";

    pub fn encode(&self) -> Result<String> {
        encode(self)
    }

    pub fn decode(line: &str) -> Result<Self> {
        use HeaderField as H;
        let d = Decoded::<Self>::parse(line)?;
        Ok(Self {
            registration_code: d.text(H::RegistrationCode)?,
            company_name: d.text(H::CompanyName)?,
            document_type: d.text(H::DocumentType)?,
            tax_id: d.number(H::TaxId)?,
            check_digit: d.text(H::CheckDigit)?,
            submission_type: d.text(H::SubmissionType)?,
            presentation_mode: d.text(H::PresentationMode)?,
            risk_administrator: d.text(H::RiskAdministrator)?,
            period: d.text(H::Period)?.parse()?,
            payment_period: d.text(H::PaymentPeriod)?.parse()?,
            contributors: d.number(H::Contributors)?,
            payroll_total: d.number(H::PayrollTotal)?,
            employer_type: d.text(H::EmployerType)?,
        })
    }
}

impl Layout for HeaderRecord {
    type Field = HeaderField;

    const NAME: &'static str = "header";
    const LEN: usize = 359;
    const COLUMNS: &'static [Column<HeaderField>] = &[
        Column::new(HeaderField::RecordType, 1, 2, Kind::Alpha),
        Column::new(HeaderField::RegistrationCode, 3, 7, Kind::Alpha),
        Column::new(HeaderField::CompanyName, 8, 207, Kind::Alpha),
        Column::new(HeaderField::DocumentType, 208, 209, Kind::Alpha),
        Column::new(HeaderField::TaxId, 210, 218, Kind::Numeric),
        Column::new(HeaderField::CheckDigit, 226, 226, Kind::Alpha),
        Column::new(HeaderField::SubmissionType, 227, 227, Kind::Alpha),
        Column::new(HeaderField::PresentationMode, 248, 248, Kind::Alpha),
        Column::new(HeaderField::RiskAdministrator, 299, 304, Kind::Alpha),
        Column::new(HeaderField::Period, 305, 311, Kind::Alpha),
        Column::new(HeaderField::PaymentPeriod, 312, 318, Kind::Alpha),
        Column::new(HeaderField::Contributors, 339, 343, Kind::Numeric),
        Column::new(HeaderField::PayrollTotal, 344, 355, Kind::Numeric),
        Column::new(HeaderField::EmployerType, 356, 357, Kind::Alpha),
    ];

    fn cell(&self, field: HeaderField) -> Cell<'_> {
        match field {
            HeaderField::RecordType => Cell::text(Self::RECORD_TYPE),
            HeaderField::RegistrationCode => Cell::text(&self.registration_code),
            HeaderField::CompanyName => Cell::text(&self.company_name),
            HeaderField::DocumentType => Cell::text(&self.document_type),
            HeaderField::TaxId => Cell::Number(self.tax_id),
            HeaderField::CheckDigit => Cell::text(&self.check_digit),
            HeaderField::SubmissionType => Cell::text(&self.submission_type),
            HeaderField::PresentationMode => Cell::text(&self.presentation_mode),
            HeaderField::RiskAdministrator => Cell::text(&self.risk_administrator),
            HeaderField::Period => Cell::owned(self.period.to_string()),
            HeaderField::PaymentPeriod => Cell::owned(self.payment_period.to_string()),
            HeaderField::Contributors => Cell::Number(self.contributors),
            HeaderField::PayrollTotal => Cell::Number(self.payroll_total),
            HeaderField::EmployerType => Cell::text(&self.employer_type),
        }
    }
}
