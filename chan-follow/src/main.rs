use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Mutex,
    time::Duration,
};

use chan_ref::subject_stem;
use chan_threads::{Config, Error, Follower, Format, HttpSource, PointerStore};
use clap::{Parser, ValueEnum};
use log::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "chan-follow",
    about = "Print the anonymous posts of a recurring thread, following it across rebuilds",
    version
)]
struct Cli {
    /// Board the thread lives on, e.g. "g"
    board: String,

    /// Thread subject, matched exactly or as a "/subject/" tag
    subject: String,

    /// Directory for the output log and the stored thread url
    #[arg(long, default_value = "/tmp")]
    out_dir: PathBuf,

    /// Request timeout in seconds
    #[arg(long, default_value = "3")]
    timeout: u64,

    /// Fetch threads from the json api or scrape the html page
    #[arg(long, value_enum, default_value_t = SourceFormat::Json)]
    format: SourceFormat,

    /// Catalog pages to search for the subject
    #[arg(long, default_value_t = Config::DEFAULT_MAX_PAGES)]
    max_pages: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SourceFormat {
    Json,
    Html,
}

impl From<SourceFormat> for Format {
    fn from(format: SourceFormat) -> Self {
        match format {
            SourceFormat::Json => Format::Json,
            SourceFormat::Html => Format::Html,
        }
    }
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            board: self.board.clone(),
            subject: self.subject.clone(),
            max_pages: self.max_pages,
        }
    }

    /// Output log, and the stored thread url next to it.
    fn paths(&self) -> (PathBuf, PathBuf) {
        let stem = subject_stem(&self.board, &self.subject);
        (
            self.out_dir.join(&stem),
            self.out_dir.join(format!("{}.url", stem)),
        )
    }
}

/// Every log record goes to `path` as a bare message line; the thread itself is logged.
fn init_logging(path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .without_time()
        .with_level(false)
        .with_target(false)
        .init();

    Ok(())
}

fn run(cli: &Cli, store: &PointerStore) -> Result<(), Error> {
    let config = cli.config();
    let source = HttpSource::new(Duration::from_secs(cli.timeout), cli.format.into())?;
    Follower::new(&source, store, &config).run()?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let (log_path, pointer_path) = cli.paths();

    if let Err(err) = init_logging(&log_path) {
        eprintln!("Failed to open {}: {}", log_path.display(), err);
        return ExitCode::FAILURE;
    }

    let store = PointerStore::new(pointer_path);
    match run(&cli, &store) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
