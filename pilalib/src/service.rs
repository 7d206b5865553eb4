//! Две точки входа ядра: `calculate` и `render_file`. Обе работают
//! под эксклюзивной блокировкой ведомости в хранилище.

use crate::calculator::calculate_run;
use crate::config::RateTable;
use crate::error::Result;
use crate::file::{FixedWidth, PilaFile, SubmissionMode};
use crate::model::{RunId, RunOutcome, RunState, RunSummary, RunTotals};
use crate::store::RunStore;
use crate::traits::WriteFormat;
use serde::Serialize;
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationSummary {
    pub run_id: RunId,
    pub state: RunState,
    pub summary: RunSummary,
    pub totals: Option<RunTotals>,
    pub errors: Vec<String>,
}

pub struct PilaService<S> {
    store: S,
    rates: RateTable,
}

impl<S: RunStore> PilaService<S> {
    pub fn new(store: S, rates: RateTable) -> Self {
        Self { store, rates }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    /// Считает ведомость и сохраняет строки и итоги. Фатальная ошибка
    /// (нет SMMLV) тоже сохраняется в ведомость и возвращается как `Err`.
    pub fn calculate(&self, run_id: RunId) -> Result<CalculationSummary> {
        self.store.with_run_locked(run_id, || {
            let run = self.store.get_run_with_lines(run_id)?;
            info!(run_id, lines = run.lines.len(), period = %run.period, "calculation started");

            let calc = match calculate_run(&run, &self.rates) {
                Ok(calc) => calc,
                Err(e) => {
                    error!(run_id, error = %e, "calculation aborted");
                    let failed = RunOutcome {
                        state: RunState::CompletedWithErrors,
                        totals: None,
                        summary: run.summary,
                        errors: vec![e.to_string()],
                    };
                    self.store.save_run_summary(run_id, &failed)?;
                    return Err(e);
                }
            };

            self.store.save_outcome(run_id, &calc.lines, &calc.outcome)?;

            let outcome = calc.outcome;
            info!(
                run_id,
                state = ?outcome.state,
                processed = outcome.summary.processed,
                errored = outcome.summary.errored,
                "calculation finished"
            );
            Ok(CalculationSummary {
                run_id,
                state: outcome.state,
                summary: outcome.summary,
                totals: outcome.totals,
                errors: outcome.errors,
            })
        })
    }

    /// Собирает файл PILA в Latin-1 и отмечает, что файл сгенерирован.
    pub fn render_file(&self, run_id: RunId, mode: SubmissionMode) -> Result<Vec<u8>> {
        self.store.with_run_locked(run_id, || {
            let run = self.store.get_run_with_lines(run_id)?;
            let file = PilaFile::build(&run, &self.rates, mode)?;

            let mut bytes = Vec::new();
            FixedWidth::write(&mut bytes, &file)?;
            self.store.mark_file_generated(run_id)?;

            info!(run_id, mode = mode.as_str(), bytes = bytes.len(), "file rendered");
            Ok(bytes)
        })
    }
}
