use pilalib::{
    calculator::calculate_run,
    config::RateTable,
    error::PilaError,
    file::SubmissionMode,
    model::{LineState, RunState},
    payload::RunPayload,
    service::PilaService,
    store::{InMemoryRunStore, RunStore},
};
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use std::thread;
use std::time::Duration;

fn service_with_sample(id: u64) -> PilaService<InMemoryRunStore> {
    let run = RunPayload::from_json(include_str!("data/run.json"))
        .expect("payload")
        .into_run(id)
        .expect("run");
    let store = InMemoryRunStore::new();
    store.insert(run).expect("insert");
    PilaService::new(store, RateTable::default())
}

#[test]
fn calculate_then_render() {
    let service = service_with_sample(5);
    let summary = service.calculate(5).expect("calculate");
    assert_eq!(summary.run_id, 5);
    assert_eq!(summary.state, RunState::Completed);
    assert_eq!(summary.summary.processed, 3);
    assert!(summary.errors.is_empty());

    let stored = service.store().get_run_with_lines(5).expect("get");
    assert_eq!(stored.state, RunState::Completed);
    assert!(stored.lines.iter().all(|l| l.state == LineState::Ok && l.breakdown.is_some()));
    assert!(!stored.has_file);

    let bytes = service.render_file(5, SubmissionMode::All).expect("render");
    assert_eq!(&bytes[..2], b"01");
    assert!(service.store().get_run_with_lines(5).expect("get").has_file);
}

#[test]
fn recalculation_is_stable() {
    let service = service_with_sample(1);
    let first = service.calculate(1).expect("first");
    let second = service.calculate(1).expect("second");
    assert_eq!(first, second);
}

#[test]
fn missing_minimum_wage_is_persisted() {
    let mut run = RunPayload::from_json(include_str!("data/run.json"))
        .expect("payload")
        .into_run(2)
        .expect("run");
    run.parameters.minimum_wage = None;
    let store = InMemoryRunStore::new();
    store.insert(run).expect("insert");
    let service = PilaService::new(store, RateTable::default());

    let err = service.calculate(2).expect_err("fatal");
    assert!(matches!(err, PilaError::MissingParameter(_)));

    let stored = service.store().get_run_with_lines(2).expect("get");
    assert_eq!(stored.state, RunState::CompletedWithErrors);
    assert_eq!(stored.errors.len(), 1);
    assert!(stored.totals.is_none());
    assert!(stored.lines.iter().all(|l| l.breakdown.is_none()));
}

#[test]
fn render_without_calculation_fails() {
    let service = service_with_sample(3);
    let err = service.render_file(3, SubmissionMode::All).expect_err("nothing to render");
    assert!(matches!(err, PilaError::EmptyRun { .. }));
    assert!(!service.store().get_run_with_lines(3).expect("get").has_file);
}

#[test]
fn unknown_run_is_reported() {
    let service = service_with_sample(1);
    assert!(matches!(service.calculate(99), Err(PilaError::RunNotFound(99))));
}

#[test]
fn run_lock_is_exclusive() {
    let store = Arc::new(InMemoryRunStore::new());
    let inside = Arc::new(AtomicBool::new(false));
    let overlaps = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let (store, inside, overlaps) = (store.clone(), inside.clone(), overlaps.clone());
            thread::spawn(move || {
                store
                    .with_run_locked(1, || {
                        if inside.swap(true, Ordering::SeqCst) {
                            overlaps.fetch_add(1, Ordering::SeqCst);
                        }
                        thread::sleep(Duration::from_millis(10));
                        inside.store(false, Ordering::SeqCst);
                        Ok(())
                    })
                    .expect("locked section");
            })
        })
        .collect();
    for h in handles {
        h.join().expect("join");
    }
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
}

#[test]
fn lock_is_released_on_error() {
    let store = InMemoryRunStore::new();
    let res: Result<(), PilaError> = store.with_run_locked(1, || Err(PilaError::Store("boom".into())));
    assert!(res.is_err());
    store.with_run_locked(1, || Ok(())).expect("lock free again");
}

#[test]
fn outcome_with_unknown_line_changes_nothing() {
    let service = service_with_sample(4);
    let run = service.store().get_run_with_lines(4).expect("get");
    let mut calc = calculate_run(&run, service.rates()).expect("calculate");
    calc.lines[2].line_id = 99;

    let err = service
        .store()
        .save_outcome(4, &calc.lines, &calc.outcome)
        .expect_err("unknown line");
    assert!(matches!(err, PilaError::Store(m) if m.contains("99")));

    let stored = service.store().get_run_with_lines(4).expect("get");
    assert_eq!(stored.state, RunState::InProgress);
    assert!(stored.totals.is_none());
    assert!(stored.lines.iter().all(|l| l.breakdown.is_none()));

    assert!(service.store().save_line_results(4, &calc.lines).is_err());
    let stored = service.store().get_run_with_lines(4).expect("get");
    assert!(stored.lines.iter().all(|l| l.breakdown.is_none()));
}
