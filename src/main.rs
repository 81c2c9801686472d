use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use vulnsight::bundle;
use vulnsight::config::Config;
use vulnsight::corpus::{self, export};
use vulnsight::model;

#[derive(Parser)]
#[command(name = "vulnsight", version, about = "Vulnerability snippet classifier")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, global = true, default_value = vulnsight::config::DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Recover records from a corpus and report failures.
    Recover {
        /// Corpus file (defaults to `corpus_path` from the config).
        corpus: Option<PathBuf>,

        /// Write recovered records as CSV.
        #[arg(long)]
        export: Option<PathBuf>,

        /// Write failed chunks as CSV.
        #[arg(long)]
        failures: Option<PathBuf>,
    },

    /// Train a model bundle from a corpus.
    Train {
        corpus: Option<PathBuf>,

        /// Bundle destination (defaults to `bundle_path` from the config).
        #[arg(long)]
        bundle: Option<PathBuf>,
    },

    /// Score a snippet and print the prediction as JSON.
    Predict {
        #[arg(long)]
        bundle: Option<PathBuf>,

        snippet: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Command::Recover {
            corpus: corpus_path,
            export: export_path,
            failures: failures_path,
        } => {
            let path = corpus_path.unwrap_or_else(|| PathBuf::from(&config.corpus_path));
            let recovery = corpus::load_corpus(&path, &config.recovery)?;
            recovery.log_summary(config.recovery.diagnostic_sample);

            let export_path =
                export_path.or_else(|| config.export_path.as_ref().map(PathBuf::from));
            if let Some(out) = export_path {
                let file = File::create(&out)
                    .with_context(|| format!("failed to create {}", out.display()))?;
                export::write_records_csv(&recovery.records, BufWriter::new(file))
                    .with_context(|| format!("failed to write {}", out.display()))?;
                info!("Exported {} records to {}", recovery.records.len(), out.display());
            }

            if let Some(out) = failures_path {
                let file = File::create(&out)
                    .with_context(|| format!("failed to create {}", out.display()))?;
                export::write_failures_csv(&recovery.failures, BufWriter::new(file))
                    .with_context(|| format!("failed to write {}", out.display()))?;
                info!("Exported {} failed chunks to {}", recovery.failures.len(), out.display());
            }
        }

        Command::Train {
            corpus: corpus_path,
            bundle: dest,
        } => {
            let path = corpus_path.unwrap_or_else(|| PathBuf::from(&config.corpus_path));
            let recovery = corpus::load_corpus(&path, &config.recovery)?;
            recovery.log_summary(config.recovery.diagnostic_sample);
            let records = recovery.into_records()?;

            let (trained, _report) =
                model::train(&records, &config.training, &config.vectorizer)
                    .context("training failed")?;

            let dest = dest.unwrap_or_else(|| PathBuf::from(&config.bundle_path));
            bundle::save(&trained, &dest)?;
        }

        Command::Predict {
            bundle: source,
            snippet,
        } => {
            let source = source.unwrap_or_else(|| PathBuf::from(&config.bundle_path));
            let loaded = bundle::load(&source)?;
            let prediction = loaded.predict(&snippet)?;
            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }
    }

    Ok(())
}
