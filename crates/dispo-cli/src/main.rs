mod batch;
mod display;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use dispo_ai::eval::{self, EvalRow};
use dispo_ai::{ExtractionService, HttpGenerator};
use dispo_core::{Normalizer, NormalizerConfig, RawExtraction, SourceContext};
use tracing::{Level, debug, info};

#[derive(Parser)]
#[command(name = "dispo", version, about = "Normalize and evaluate loan-collection call extractions")]
struct Cli {
    /// Normalizer config (JSON). Unset fields keep their defaults.
    #[arg(long, global = true, env = "DISPO_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Normalize one raw model extraction against its transcript.
    Normalize {
        #[command(flatten)]
        transcript: TranscriptArgs,

        /// Raw model output: a JSON object, or text containing one.
        #[arg(long, conflicts_with = "raw_file")]
        raw: Option<String>,

        #[arg(long, value_name = "FILE")]
        raw_file: Option<PathBuf>,

        #[arg(long, env = "DISPO_REFERENCE_DATE", value_parser = parse_date)]
        reference_date: Option<NaiveDate>,
    },

    /// Normalize a JSONL file of `{id, transcript, reference_date, raw}` lines.
    Batch {
        #[command(flatten)]
        io: BatchIo,

        #[arg(long, env = "DISPO_REFERENCE_DATE", value_parser = parse_date)]
        reference_date: Option<NaiveDate>,
    },

    /// Run the model on one transcript and normalize its output.
    Predict {
        #[command(flatten)]
        transcript: TranscriptArgs,

        #[command(flatten)]
        backend: BackendArgs,

        #[arg(long, env = "DISPO_REFERENCE_DATE", value_parser = parse_date)]
        reference_date: Option<NaiveDate>,
    },

    /// Run the model on a JSONL file of `{id, transcript, reference_date}` lines.
    PredictBatch {
        #[command(flatten)]
        io: BatchIo,

        #[command(flatten)]
        backend: BackendArgs,

        /// Generations in flight at once.
        #[arg(long, default_value_t = 4)]
        concurrency: usize,

        #[arg(long, env = "DISPO_REFERENCE_DATE", value_parser = parse_date)]
        reference_date: Option<NaiveDate>,
    },

    /// Score a JSONL file of `{gold, prediction}` rows.
    Eval {
        #[arg(long, value_name = "FILE")]
        input: PathBuf,

        /// Print the report as JSON instead of tables.
        #[arg(long)]
        json: bool,
    },

    /// Display records from a Parquet export.
    Show {
        #[arg(value_name = "FILE")]
        parquet: PathBuf,

        /// Show the record with this id as a card.
        #[arg(long, conflicts_with = "row")]
        id: Option<String>,

        /// Show the record at this row as a card.
        #[arg(long)]
        row: Option<usize>,
    },
}

#[derive(Args)]
struct TranscriptArgs {
    #[arg(long, conflicts_with = "transcript_file", required_unless_present = "transcript_file")]
    transcript: Option<String>,

    #[arg(long, value_name = "FILE")]
    transcript_file: Option<PathBuf>,
}

impl TranscriptArgs {
    fn load(self) -> anyhow::Result<String> {
        match (self.transcript, self.transcript_file) {
            (Some(text), _) => Ok(text),
            (None, Some(path)) => std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display())),
            (None, None) => bail!("a transcript is required"),
        }
    }
}

#[derive(Args)]
struct BatchIo {
    #[arg(long, value_name = "FILE")]
    input: PathBuf,

    #[arg(long, value_name = "FILE")]
    output: PathBuf,

    /// Also export the normalized records as Parquet.
    #[arg(long, value_name = "FILE")]
    parquet: Option<PathBuf>,
}

#[derive(Args)]
struct BackendArgs {
    /// Base URL of the generation server.
    #[arg(long, env = "DISPO_ENDPOINT", default_value = "http://localhost:8000")]
    endpoint: String,

    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,
}

impl BackendArgs {
    fn generator(&self) -> anyhow::Result<HttpGenerator> {
        HttpGenerator::with_timeout(self.endpoint.clone(), Duration::from_secs(self.timeout_secs))
            .context("building HTTP client")
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    dispo_core::calendar::parse_reference_date(value).map_err(|e| e.to_string())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<NormalizerConfig> {
    let Some(path) = path else {
        return Ok(NormalizerConfig::default());
    };
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
    let config = NormalizerConfig::from_json_str(&text)
        .with_context(|| format!("parsing config {}", path.display()))?;
    info!(path = %path.display(), "loaded normalizer config");
    Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    info!("dispo v{}", env!("CARGO_PKG_VERSION"));

    let normalizer = Normalizer::new(load_config(cli.config.as_deref())?);
    debug!(config = ?normalizer.config(), "normalizer ready");

    match cli.command {
        Command::Normalize {
            transcript,
            raw,
            raw_file,
            reference_date,
        } => {
            let transcript = transcript.load()?;
            let raw_text = match (raw, raw_file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, None) => bail!("one of --raw or --raw-file is required"),
            };
            let raw = RawExtraction(
                dispo_ai::extract::first_json_object(&raw_text).context("parsing raw extraction")?,
            );
            let ctx = SourceContext::new(transcript, reference_date);
            print_json(&normalizer.normalize(&raw, &ctx))?;
        }

        Command::Batch { io, reference_date } => {
            eprintln!("Normalizing {}", io.input.display());
            let stats = batch::run_normalize_batch(
                &normalizer,
                &io.input,
                &io.output,
                io.parquet.as_deref(),
                reference_date,
            )?;
            eprintln!(
                "Done: {} rows ({} skipped) in {:.1}s",
                stats.total_rows, stats.failed_rows, stats.elapsed_secs
            );
        }

        Command::Predict {
            transcript,
            backend,
            reference_date,
        } => {
            let transcript = transcript.load()?;
            let service = ExtractionService::new(backend.generator()?, normalizer);
            let record = service
                .predict(&transcript, reference_date)
                .await
                .with_context(|| format!("prediction via {}", backend.endpoint))?;
            print_json(&record)?;
        }

        Command::PredictBatch {
            io,
            backend,
            concurrency,
            reference_date,
        } => {
            let service = ExtractionService::new(backend.generator()?, normalizer);
            eprintln!("Predicting {} via {}", io.input.display(), backend.endpoint);
            let stats = batch::run_predict_batch(
                &service,
                &io.input,
                &io.output,
                io.parquet.as_deref(),
                reference_date,
                concurrency,
            )
            .await?;
            eprintln!(
                "Done: {} rows ({} failed) in {:.1}s",
                stats.total_rows, stats.failed_rows, stats.elapsed_secs
            );
        }

        Command::Eval { input, json } => {
            let rows: Vec<EvalRow> = dispo_store::read_jsonl(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let report = eval::evaluate(&rows);
            if json {
                print_json(&report)?;
            } else {
                display::print_eval_report(&report);
            }
        }

        Command::Show { parquet, id, row } => {
            let batches = dispo_store::read_parquet(&parquet)
                .with_context(|| format!("reading {}", parquet.display()))?;
            let Some(first) = batches.first() else {
                bail!("{} holds no records", parquet.display());
            };
            let batch = arrow::compute::concat_batches(&first.schema(), &batches)
                .context("combining record batches")?;

            match (id, row) {
                (Some(id), _) => {
                    let Some(row) = display::find_row(&batch, &id) else {
                        bail!("no record with id {id:?}");
                    };
                    display::print_record_card(&batch, row)?;
                }
                (None, Some(row)) => display::print_record_card(&batch, row)?,
                (None, None) => {
                    arrow::util::pretty::print_batches(&[batch]).context("printing records")?
                }
            }
        }
    }

    Ok(())
}
