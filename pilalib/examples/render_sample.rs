use pilalib::{
    config::RateTable,
    file::SubmissionMode,
    payload::RunPayload,
    service::PilaService,
    store::InMemoryRunStore,
};
use std::io::Write;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Пример: JSON ведомости (stdin) -> файл PILA (stdout)
    let run = RunPayload::from_reader(std::io::stdin())?.into_run(1)?;
    let store = InMemoryRunStore::new();
    store.insert(run)?;

    let service = PilaService::new(store, RateTable::default());
    let summary = service.calculate(1)?;
    eprintln!("{summary:?}");

    let bytes = service.render_file(1, SubmissionMode::All)?;
    std::io::stdout().write_all(&bytes)?;
    Ok(())
}
