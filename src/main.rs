use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use kat::report::{self, Detail};
use kat::{Database, TracingObserver, process_reader};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Log filter used when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Attempt to read and process FILENAME (an SQL file)
    Read {
        filename: PathBuf,

        /// Report detail: summary, tables, keys, all
        #[arg(short, long, default_value = "summary", value_parser = parse_detail)]
        detail: Detail,
    },
}

fn parse_detail(s: &str) -> Result<Detail, String> {
    Detail::from_str(s).ok_or_else(|| format!("Invalid detail level: {s}"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("kat={}", cli.log_level))),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Read { filename, detail } => {
            if !filename.is_file() {
                bail!("File does not exist: {}", filename.display());
            }

            let file = File::open(&filename)
                .with_context(|| format!("Failed to open {}", filename.display()))?;
            let database = Database::with_observer(filename.display().to_string(), TracingObserver);
            let database = process_reader(BufReader::new(file), database)
                .with_context(|| format!("Failed to process {}", filename.display()))?;

            print!("{}", report::render(&database, detail));
        }
    }

    Ok(())
}
