//! Конфигурация расчёта: статутные ставки (неизменяемая таблица) и правовые параметры ведомости.
//!
//! `RateTable` грузится один раз на вызов (из TOML или по умолчанию) и передаётся явно
//! в калькулятор и в запись файла; никто её не мутирует.

use crate::error::{PilaError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Статутные ставки взносов (доли, не проценты).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateTable {
    pub health_employee: Decimal,
    pub health_employer: Decimal,
    /// Ставка работодателя для IBC > 10 SMMLV или интегрального оклада.
    pub health_employer_high: Decimal,
    pub pension_employee: Decimal,
    pub pension_employer: Decimal,
    pub family_fund: Decimal,
    pub sena: Decimal,
    pub icbf: Decimal,
    /// Класс риска `1`..`5` → ставка ARL.
    pub risk_classes: BTreeMap<String, Decimal>,
}

impl Default for RateTable {
    fn default() -> Self {
        let risk_classes = [
            ("1", Decimal::new(522, 5)),
            ("2", Decimal::new(1044, 5)),
            ("3", Decimal::new(2436, 5)),
            ("4", Decimal::new(4350, 5)),
            ("5", Decimal::new(6960, 5)),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            health_employee: Decimal::new(4, 2),
            health_employer: Decimal::new(85, 3),
            health_employer_high: Decimal::new(85, 3),
            pension_employee: Decimal::new(4, 2),
            pension_employer: Decimal::new(12, 2),
            family_fund: Decimal::new(4, 2),
            sena: Decimal::new(2, 2),
            icbf: Decimal::new(3, 2),
            risk_classes,
        }
    }
}

impl RateTable {
    pub fn risk_rate(&self, class: &str) -> Option<Decimal> {
        self.risk_classes.get(class.trim()).copied()
    }

    pub fn pension_total_rate(&self) -> Decimal {
        self.pension_employee + self.pension_employer
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let table: RateTable = toml::from_str(s).map_err(|e| PilaError::Config(e.to_string()))?;
        table.validate()?;
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<()> {
        let scalar = [
            ("health_employee", self.health_employee),
            ("health_employer", self.health_employer),
            ("health_employer_high", self.health_employer_high),
            ("pension_employee", self.pension_employee),
            ("pension_employer", self.pension_employer),
            ("family_fund", self.family_fund),
            ("sena", self.sena),
            ("icbf", self.icbf),
        ];
        let classes = self.risk_classes.values().map(|v| ("risk_classes", *v));
        for (name, rate) in scalar.into_iter().chain(classes) {
            if rate.is_sign_negative() || rate >= Decimal::ONE {
                return Err(PilaError::Config(format!("rate {name}={rate} must be in [0, 1)")));
            }
        }
        if self.pension_total_rate().is_zero() {
            return Err(PilaError::Config("pension rates must not both be zero".into()));
        }
        Ok(())
    }
}

/// Проценты фонда пенсионной солидарности по диапазонам IBC/SMMLV.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SolidarityTable {
    pub from_4_to_16: Decimal,
    pub from_16_to_17: Decimal,
    pub from_17_to_18: Decimal,
    pub from_18_to_19: Decimal,
    pub from_19_to_20: Decimal,
    pub above_20: Decimal,
}

impl Default for SolidarityTable {
    fn default() -> Self {
        Self {
            from_4_to_16: Decimal::new(1, 2),
            from_16_to_17: Decimal::new(12, 3),
            from_17_to_18: Decimal::new(14, 3),
            from_18_to_19: Decimal::new(16, 3),
            from_19_to_20: Decimal::new(18, 3),
            above_20: Decimal::new(2, 2),
        }
    }
}

impl SolidarityTable {
    /// Процент для отношения IBC/SMMLV; `None`, если взнос не положен (≤ 4 SMMLV).
    pub fn rate_for(&self, wage_multiple: Decimal) -> Option<Decimal> {
        if wage_multiple <= Decimal::from(4) {
            None
        } else if wage_multiple <= Decimal::from(16) {
            Some(self.from_4_to_16)
        } else if wage_multiple <= Decimal::from(17) {
            Some(self.from_16_to_17)
        } else if wage_multiple <= Decimal::from(18) {
            Some(self.from_17_to_18)
        } else if wage_multiple <= Decimal::from(19) {
            Some(self.from_18_to_19)
        } else if wage_multiple <= Decimal::from(20) {
            Some(self.from_19_to_20)
        } else {
            Some(self.above_20)
        }
    }
}

/// Правовые параметры, пришедшие вместе с ведомостью.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LegalParameters {
    /// SMMLV. Без него расчёт ведомости невозможен.
    pub minimum_wage: Option<Decimal>,
    pub base_cap_multiple: Decimal,
    pub base_days: Decimal,
    pub solidarity: SolidarityTable,
    /// Переопределяет `RateTable::health_employee` для этой ведомости.
    pub health_employee_rate: Option<Decimal>,
    /// Переопределяет `RateTable::health_employer_high` для этой ведомости.
    pub health_employer_rate_high: Option<Decimal>,
}

impl Default for LegalParameters {
    fn default() -> Self {
        Self {
            minimum_wage: None,
            base_cap_multiple: Decimal::from(25),
            base_days: Decimal::from(30),
            solidarity: SolidarityTable::default(),
            health_employee_rate: None,
            health_employer_rate_high: None,
        }
    }
}

impl LegalParameters {
    pub fn with_minimum_wage(minimum_wage: Decimal) -> Self {
        Self {
            minimum_wage: Some(minimum_wage),
            ..Self::default()
        }
    }

    /// SMMLV, если он задан и положителен.
    pub fn minimum_wage(&self) -> Result<Decimal> {
        match self.minimum_wage {
            Some(w) if w > Decimal::ZERO => Ok(w),
            _ => Err(PilaError::MissingParameter("minimum_wage")),
        }
    }
}
