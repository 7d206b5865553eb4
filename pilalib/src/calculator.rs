//! Калькулятор взносов: из фактов ведомости и правовых параметров получает
//! IBC по подсистемам, разбивку взносов по строке и итоги ведомости.
//!
//! Чистая функция: ничего не пишет, результат сохраняет вызывающий.

use crate::config::{LegalParameters, RateTable};
use crate::error::{PilaError, Result};
use crate::model::{
    ContributionBreakdown, DetailLine, EmployeeProfile, FamilyFundContribution, HealthContribution,
    LineResult, LineState, PayrollRun, PensionContribution, RiskContribution,
    RunOutcome, RunState, RunSummary, RunTotals, SubsystemBases, SubsystemDays, SubsystemFlags,
    STUDENT_CONTRIBUTOR_TYPE,
};
use crate::rounding::{percent_of, round_base, round_contribution, to_cents};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, warn};

/// Подтипы, при которых пенсия обязательна.
const PENSION_SUBTYPES: [&str; 2] = ["00", "12"];
const MAX_DAYS: i32 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct RunCalculation {
    pub lines: Vec<LineResult>,
    pub outcome: RunOutcome,
}

/// Неизменяемый контекст одного прохода.
struct Context<'a> {
    minimum_wage: Decimal,
    cap: Decimal,
    base_days: Decimal,
    rates: &'a RateTable,
    health_employee_rate: Decimal,
    health_employer_high: Decimal,
    params: &'a LegalParameters,
    employer_exempt: bool,
}

impl<'a> Context<'a> {
    fn new(run: &'a PayrollRun, rates: &'a RateTable) -> Result<Self> {
        let params = &run.parameters;
        let minimum_wage = params.minimum_wage()?;
        if params.base_days <= Decimal::ZERO {
            return Err(PilaError::Config(format!("base_days must be positive, got {}", params.base_days)));
        }
        Ok(Self {
            minimum_wage,
            cap: to_cents(minimum_wage * params.base_cap_multiple),
            base_days: params.base_days,
            rates,
            health_employee_rate: params.health_employee_rate.unwrap_or(rates.health_employee),
            health_employer_high: params.health_employer_rate_high.unwrap_or(rates.health_employer_high),
            params,
            employer_exempt: run.company.exempt,
        })
    }

    fn wage_multiple(&self, n: i64) -> Decimal {
        self.minimum_wage * Decimal::from(n)
    }

    /// Пропорциональный минимум IBC для числа дней подсистемы.
    fn proportional_minimum(&self, days: i32) -> Decimal {
        if days <= 0 {
            return Decimal::ZERO;
        }
        to_cents(self.minimum_wage * Decimal::from(days) / self.base_days)
    }
}

/// Считает всю ведомость. Без SMMLV падает целиком, строки не трогаются.
pub fn calculate_run(run: &PayrollRun, rates: &RateTable) -> Result<RunCalculation> {
    let ctx = Context::new(run, rates)?;

    let mut lines = Vec::with_capacity(run.lines.len());
    let mut totals = RunTotals::default();
    let mut summary = RunSummary::default();

    for line in &run.lines {
        let result = calculate_line(line, run.employee(&line.document), &ctx);
        summary.processed += 1;
        summary.warnings += result.warnings.len() as u32;
        if result.state == LineState::Ok {
            if let Some(b) = &result.breakdown {
                accumulate(&mut totals, b);
            }
        } else {
            summary.errored += 1;
            warn!(run_id = run.id, line_id = line.id, errors = ?result.errors, "line rejected");
        }
        lines.push(result);
    }

    let state = if summary.errored == 0 {
        RunState::Completed
    } else {
        RunState::CompletedWithErrors
    };

    Ok(RunCalculation {
        lines,
        outcome: RunOutcome {
            state,
            totals: Some(totals),
            summary,
            errors: Vec::new(),
        },
    })
}

fn accumulate(t: &mut RunTotals, b: &ContributionBreakdown) {
    t.health.employee += b.health.employee;
    t.health.employer += b.health.employer;
    t.health.total += b.health.employee + b.health.employer;
    t.pension.employee += b.pension.employee;
    t.pension.employer += b.pension.employer;
    t.pension.total += b.pension.employee + b.pension.employer;
    t.risk_employer += b.risk.employer;
    t.family_fund_employer += b.family_fund.employer;

    t.employee = t.health.employee + t.pension.employee;
    t.employer = t.health.employer + t.pension.employer + t.risk_employer + t.family_fund_employer;
    t.total = t.employee + t.employer;
}

/// Дни строки с учётом переопределения из ING/RET.
fn effective_days(line: &DetailLine) -> i32 {
    line.events
        .iter()
        .filter(|e| e.code.overrides_days())
        .filter_map(|e| e.metadata.contributed_days)
        .last()
        .unwrap_or(line.contributed_days)
}

/// Подтип, приведённый к двум цифрам; пустой считается `00`.
fn normalized_subtype(subtype: &str) -> String {
    format!("{:0>2}", subtype.trim())
}

/// Обязан ли взносоплательщик платить пенсию (тип 23 и «чужие» подтипы не обязаны).
pub fn pension_mandatory(contributor_type: &str, contributor_subtype: &str) -> bool {
    contributor_type != STUDENT_CONTRIBUTOR_TYPE
        && PENSION_SUBTYPES.contains(&normalized_subtype(contributor_subtype).as_str())
}

/// Применимость подсистем после флагов сотрудника и переопределений по типу.
fn applicability(line: &DetailLine, profile: Option<&EmployeeProfile>) -> SubsystemFlags {
    let mut flags = profile.map(|p| p.flags).unwrap_or_default();
    flags.family_fund = flags.family_fund && line.family_fund;

    if line.is_student() {
        flags.health = false;
        flags.family_fund = false;
    }
    if !pension_mandatory(&line.contributor_type, &line.contributor_subtype) {
        flags.pension = false;
    }
    flags
}

fn calculate_line(line: &DetailLine, profile: Option<&EmployeeProfile>, ctx: &Context<'_>) -> LineResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let contributed_days = effective_days(line);
    if !(0..=MAX_DAYS).contains(&contributed_days) {
        errors.push(format!("contributed days {contributed_days} out of range (0..{MAX_DAYS})"));
    }
    let d = line.days;
    for (name, v) in [("health", d.health), ("pension", d.pension), ("risk", d.risk), ("family fund", d.family_fund)] {
        if !(0..=MAX_DAYS).contains(&v) {
            errors.push(format!("{name} days {v} out of range (0..{MAX_DAYS})"));
        }
    }
    if line.declared_base < Decimal::ZERO {
        errors.push(format!("negative base {}", line.declared_base));
    }

    let flags = applicability(line, profile);
    let declared = if contributed_days == 0 {
        Decimal::ZERO
    } else {
        line.declared_base.max(Decimal::ZERO)
    };

    let mut raised = false;
    let mut capped = false;
    let mut clamp = |applies: bool, days: i32| -> Decimal {
        if !applies {
            return Decimal::ZERO;
        }
        let min = ctx.proportional_minimum(days);
        if declared < min {
            raised = true;
            min
        } else if declared > ctx.cap {
            capped = true;
            ctx.cap
        } else {
            declared
        }
    };

    let health = clamp(flags.health, d.health);
    let pension = clamp(flags.pension, d.pension);
    let risk = clamp(flags.risk, d.risk);
    let bases = SubsystemBases {
        health,
        pension,
        risk,
        family_fund: if flags.family_fund { health } else { Decimal::ZERO },
    };
    let days = SubsystemDays {
        health: if flags.health { d.health } else { 0 },
        pension: if flags.pension { d.pension } else { 0 },
        risk: if flags.risk { d.risk } else { 0 },
        family_fund: if flags.family_fund { d.family_fund } else { 0 },
    };

    if raised {
        warnings.push(format!("base {declared} raised to proportional minimum"));
    }
    if capped {
        warnings.push(format!("base {declared} clamped to cap {}", ctx.cap));
    }

    let mut result = LineResult {
        line_id: line.id,
        contributed_days,
        days,
        bases,
        state: LineState::Error,
        errors: Vec::new(),
        warnings,
        breakdown: None,
        employee_total: 0,
        employer_total: 0,
    };

    if errors.is_empty() {
        match contributions(line, profile, &flags, &bases, ctx) {
            Ok(b) => {
                result.employee_total = b.health.employee + b.pension.employee;
                result.employer_total =
                    b.health.employer + b.pension.employer + b.risk.employer + b.family_fund.employer;
                result.breakdown = Some(b);
                result.state = LineState::Ok;
                debug!(
                    line_id = line.id,
                    employee = result.employee_total,
                    employer = result.employer_total,
                    "line calculated"
                );
            }
            Err(reason) => errors.push(reason),
        }
    }
    result.errors = errors;
    result
}

/// Исключение работодателя из health/SENA/ICBF/кассы.
fn employer_exemption(profile: Option<&EmployeeProfile>, ctx: &Context<'_>) -> bool {
    let Some(p) = profile else {
        return ctx.employer_exempt;
    };
    ctx.employer_exempt && !p.is_integral() && p.basic_salary < ctx.wage_multiple(10)
}

/// Разбивка по подсистемам. В `Err` причина ошибки строки.
fn contributions(
    line: &DetailLine,
    profile: Option<&EmployeeProfile>,
    flags: &SubsystemFlags,
    bases: &SubsystemBases,
    ctx: &Context<'_>,
) -> std::result::Result<ContributionBreakdown, String> {
    let rates = ctx.rates;
    let exempt = employer_exemption(profile, ctx);
    let integral = profile.is_some_and(EmployeeProfile::is_integral);

    // health
    let health_base = round_base(bases.health);
    let hb = Decimal::from(health_base);
    let high = hb > ctx.wage_multiple(10) || integral;
    let (health_employee_rate, health_employer_rate) = if !flags.health {
        (Decimal::ZERO, Decimal::ZERO)
    } else if high {
        (ctx.health_employee_rate, ctx.health_employer_high)
    } else if exempt {
        (ctx.health_employee_rate, Decimal::ZERO)
    } else {
        (ctx.health_employee_rate, rates.health_employer)
    };
    let health_worker_raw = percent_of(hb, health_employee_rate);
    let health_employer_raw = percent_of(hb, health_employer_rate);
    let health_total = round_contribution(health_worker_raw + health_employer_raw);
    let health_worker = if health_employer_raw.is_zero() {
        health_total
    } else {
        split_worker_share(health_total, health_employee_rate, health_employer_rate)
    };

    // pension
    let pension_base = round_base(bases.pension);
    let pb = Decimal::from(pension_base);
    let (pension_employee_rate, pension_employer_rate) = if flags.pension {
        (rates.pension_employee, rates.pension_employer)
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };
    let pension_raw = percent_of(pb, pension_employee_rate) + percent_of(pb, pension_employer_rate);
    let pension_total = round_contribution(pension_raw);
    let pension_worker = split_worker_share(pension_total, pension_employee_rate, pension_employer_rate);
    let (solidarity, subsistence) = if flags.pension {
        solidarity_fund(pb, ctx.minimum_wage, ctx.params)
    } else {
        (0, 0)
    };

    // risk
    let risk_base = round_base(bases.risk);
    let no_exposure = line.events.iter().any(|e| e.code.is_no_exposure());
    let risk_rate = if flags.risk && !no_exposure {
        rates
            .risk_rate(&line.risk_class)
            .ok_or_else(|| format!("invalid risk class '{}' (expected 1..5)", line.risk_class))?
    } else {
        Decimal::ZERO
    };
    let risk_amount = round_contribution(percent_of(Decimal::from(risk_base), risk_rate));

    // family fund
    let family_base = round_base(bases.family_fund);
    let family_rate = if flags.family_fund && !exempt {
        rates.family_fund
    } else {
        Decimal::ZERO
    };
    let family_amount = round_contribution(percent_of(Decimal::from(family_base), family_rate));

    Ok(ContributionBreakdown {
        health: HealthContribution {
            applies: flags.health,
            base: health_base,
            employee_rate: health_employee_rate,
            employer_rate: health_employer_rate,
            employee: health_worker,
            employer: health_total - health_worker,
            total: health_total,
            employer_exempt: exempt,
        },
        pension: PensionContribution {
            applies: flags.pension,
            base: pension_base,
            employee_rate: pension_employee_rate,
            employer_rate: pension_employer_rate,
            employee: pension_worker,
            employer: pension_total - pension_worker,
            total: pension_total,
            solidarity,
            subsistence,
        },
        risk: RiskContribution {
            applies: flags.risk,
            base: risk_base,
            risk_class: line.risk_class.clone(),
            rate: risk_rate,
            employer: risk_amount,
        },
        family_fund: FamilyFundContribution {
            applies: flags.family_fund,
            base: family_base,
            rate: family_rate,
            employer: family_amount,
            exempt,
        },
    })
}

/// Доля работника: ⌊total × worker / (worker + employer)⌋, остаток работодателю.
pub fn split_worker_share(total: i64, worker_rate: Decimal, employer_rate: Decimal) -> i64 {
    let sum = worker_rate + employer_rate;
    if total <= 0 || sum <= Decimal::ZERO {
        return 0;
    }
    (Decimal::from(total) * worker_rate / sum)
        .floor()
        .to_i64()
        .unwrap_or(0)
}

/// Фонд солидарности: процент по кратности SMMLV, пополам на две части,
/// каждая округляется отдельно.
fn solidarity_fund(pension_base: Decimal, minimum_wage: Decimal, params: &LegalParameters) -> (i64, i64) {
    if pension_base <= Decimal::ZERO {
        return (0, 0);
    }
    let Some(rate) = params.solidarity.rate_for(pension_base / minimum_wage) else {
        return (0, 0);
    };
    let half = percent_of(pension_base, rate) / Decimal::from(2);
    (round_contribution(half), round_contribution(half))
}
