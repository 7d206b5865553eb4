//! Контракт хранилища ведомостей и реализация в памяти.

use crate::error::{PilaError, Result};
use crate::model::{LineResult, PayrollRun, RunId, RunOutcome};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// То, что ядро читает и пишет снаружи.
pub trait RunStore {
    fn get_run_with_lines(&self, run_id: RunId) -> Result<PayrollRun>;
    fn save_line_results(&self, run_id: RunId, results: &[LineResult]) -> Result<()>;
    fn save_run_summary(&self, run_id: RunId, outcome: &RunOutcome) -> Result<()>;
    /// Строки и итоги одной записью: либо сохраняется всё, либо ничего.
    fn save_outcome(&self, run_id: RunId, results: &[LineResult], outcome: &RunOutcome) -> Result<()>;
    fn mark_file_generated(&self, run_id: RunId) -> Result<()>;

    /// Выполняет `f`, удерживая эксклюзивный доступ к ведомости.
    /// Доступ снимается на любом выходе, включая ошибку.
    fn with_run_locked<T, F>(&self, run_id: RunId, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>;
}

#[derive(Default)]
pub struct InMemoryRunStore {
    runs: Mutex<HashMap<RunId, PayrollRun>>,
    locks: Mutex<HashMap<RunId, Arc<Mutex<()>>>>,
}

fn poisoned<T>(_: T) -> PilaError {
    PilaError::Store("store mutex poisoned".into())
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Кладёт ведомость целиком, заменяя прежние строки с тем же id.
    pub fn insert(&self, run: PayrollRun) -> Result<()> {
        self.runs()?.insert(run.id, run);
        Ok(())
    }

    fn runs(&self) -> Result<MutexGuard<'_, HashMap<RunId, PayrollRun>>> {
        self.runs.lock().map_err(poisoned)
    }

    fn update<F>(&self, run_id: RunId, f: F) -> Result<()>
    where
        F: FnOnce(&mut PayrollRun) -> Result<()>,
    {
        let mut runs = self.runs()?;
        let run = runs.get_mut(&run_id).ok_or(PilaError::RunNotFound(run_id))?;
        f(run)
    }

    fn run_lock(&self, run_id: RunId) -> Result<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(poisoned)?;
        Ok(locks.entry(run_id).or_default().clone())
    }

    /// Отпускает ссылку на блокировку; последний владелец удаляет запись.
    fn release(&self, run_id: RunId, lock: Arc<Mutex<()>>) -> Result<()> {
        let mut locks = self.locks.lock().map_err(poisoned)?;
        drop(lock);
        if locks.get(&run_id).is_some_and(|l| Arc::strong_count(l) == 1) {
            locks.remove(&run_id);
        }
        Ok(())
    }
}

/// Сначала проверяет все id, потом пишет: неизвестная строка не оставляет частичных изменений.
fn apply_line_results(run: &mut PayrollRun, results: &[LineResult]) -> Result<()> {
    if let Some(r) = results.iter().find(|r| !run.lines.iter().any(|l| l.id == r.line_id)) {
        return Err(PilaError::Store(format!("run {} has no line {}", run.id, r.line_id)));
    }
    for r in results {
        if let Some(line) = run.lines.iter_mut().find(|l| l.id == r.line_id) {
            line.apply(r.clone());
        }
    }
    Ok(())
}

impl RunStore for InMemoryRunStore {
    fn get_run_with_lines(&self, run_id: RunId) -> Result<PayrollRun> {
        self.runs()?
            .get(&run_id)
            .cloned()
            .ok_or(PilaError::RunNotFound(run_id))
    }

    fn save_line_results(&self, run_id: RunId, results: &[LineResult]) -> Result<()> {
        self.update(run_id, |run| apply_line_results(run, results))
    }

    fn save_run_summary(&self, run_id: RunId, outcome: &RunOutcome) -> Result<()> {
        self.update(run_id, |run| {
            run.apply_outcome(outcome.clone());
            Ok(())
        })
    }

    fn save_outcome(&self, run_id: RunId, results: &[LineResult], outcome: &RunOutcome) -> Result<()> {
        self.update(run_id, |run| {
            apply_line_results(run, results)?;
            run.apply_outcome(outcome.clone());
            Ok(())
        })
    }

    fn mark_file_generated(&self, run_id: RunId) -> Result<()> {
        self.update(run_id, |run| {
            run.has_file = true;
            Ok(())
        })
    }

    fn with_run_locked<T, F>(&self, run_id: RunId, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let lock = self.run_lock(run_id)?;
        let result = match lock.lock() {
            Ok(_guard) => f(),
            Err(e) => Err(poisoned(e)),
        };
        self.release(run_id, lock)?;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn locks_len(store: &InMemoryRunStore) -> usize {
        store.locks.lock().expect("locks").len()
    }

    #[test]
    fn lock_entries_are_removed_after_use() {
        let store = InMemoryRunStore::new();
        for run_id in 0..100 {
            store.with_run_locked(run_id, || Ok(())).expect("locked");
        }
        assert_eq!(locks_len(&store), 0);

        let err = store
            .with_run_locked(7, || -> Result<()> { Err(PilaError::Store("boom".into())) })
            .expect_err("inner error");
        assert!(matches!(err, PilaError::Store(_)));
        assert_eq!(locks_len(&store), 0);
    }

    #[test]
    fn concurrent_sections_leave_no_entries() {
        let store = Arc::new(InMemoryRunStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..50 {
                        store.with_run_locked(i % 2, || Ok(())).expect("locked");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().expect("join");
        }
        assert_eq!(locks_len(&store), 0);
    }
}
