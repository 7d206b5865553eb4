use clap::{Parser, Subcommand, ValueEnum};
use pilalib::{
    config::RateTable,
    error::{PilaError, Result},
    file::{FixedWidth, SubmissionMode},
    payload::RunPayload,
    report::write_report,
    service::PilaService,
    store::{InMemoryRunStore, RunStore},
    traits::ReadFormat,
};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Локальный запуск работает с одной ведомостью.
const LOCAL_RUN_ID: u64 = 1;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Mode {
    All,
    Students,
    NonStudents,
}

impl From<Mode> for SubmissionMode {
    fn from(m: Mode) -> Self {
        match m {
            Mode::All => SubmissionMode::All,
            Mode::Students => SubmissionMode::Students,
            Mode::NonStudents => SubmissionMode::NonStudents,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pila", version, about = "Расчёт взносов и файл PILA")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Посчитать ведомость и вывести итог в JSON
    Calculate {
        /// JSON ведомости
        #[arg(long)]
        payload: PathBuf,
        /// TOML со ставками (по умолчанию законные)
        #[arg(long)]
        rates: Option<PathBuf>,
        /// CSV-отчёт по строкам
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Посчитать и записать файл PILA
    Render {
        #[arg(long)]
        payload: PathBuf,
        #[arg(long)]
        rates: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "all")]
        mode: Mode,
        /// Выходной файл (по умолчанию stdout)
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
    /// Разобрать готовый файл PILA в JSON
    Inspect {
        /// Входной файл (по умолчанию stdin)
        #[arg(short = 'i', long = "input")]
        input: Option<PathBuf>,
    },
}

fn load_service(payload: &Path, rates: Option<&Path>) -> Result<PilaService<InMemoryRunStore>> {
    let rates = match rates {
        Some(path) => RateTable::load(path)?,
        None => RateTable::default(),
    };
    let run = RunPayload::from_reader(BufReader::new(File::open(payload)?))?.into_run(LOCAL_RUN_ID)?;
    let store = InMemoryRunStore::new();
    store.insert(run)?;
    Ok(PilaService::new(store, rates))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let stdout = io::stdout();

    match cli.command {
        Command::Calculate { payload, rates, report } => {
            let service = load_service(&payload, rates.as_deref())?;
            let summary = service.calculate(LOCAL_RUN_ID)?;
            if let Some(path) = report {
                let run = service.store().get_run_with_lines(LOCAL_RUN_ID)?;
                write_report(File::create(path)?, &run)?;
            }
            serde_json::to_writer_pretty(stdout.lock(), &summary)?;
            writeln!(stdout.lock())?;
        }
        Command::Render { payload, rates, mode, output } => {
            let service = load_service(&payload, rates.as_deref())?;
            service.calculate(LOCAL_RUN_ID)?;
            let bytes = service.render_file(LOCAL_RUN_ID, mode.into())?;

            let mut writer: Box<dyn Write> = match output {
                Some(path) => Box::new(File::create(path)?),
                None => Box::new(stdout.lock()),
            };
            writer.write_all(&bytes)?;
            writer.flush().map_err(PilaError::from)?;
        }
        Command::Inspect { input } => {
            let reader: Box<dyn io::Read> = match input {
                Some(path) => Box::new(File::open(path)?),
                None => Box::new(io::stdin()),
            };
            let file = FixedWidth::read(BufReader::new(reader))?;
            serde_json::to_writer_pretty(stdout.lock(), &file)?;
            writeln!(stdout.lock())?;
        }
    }
    Ok(())
}
