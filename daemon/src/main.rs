//! Samaritan daemon: entry point for running the integrity engine offline.

mod replay;

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::Parser;

use samaritan_device::{compute_fingerprint, DeviceAttributes};
use samaritan_engine::{EngineConfig, IntegrityEngine, StorageBackend};
use samaritan_utils::{format_millis, init_logging, LogFormat};

use crate::replay::{execute, parse_line, ReplaySummary};

#[derive(Parser)]
#[command(name = "samaritan-daemon", about = "Samaritan trust & integrity engine")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "SAMARITAN_CONFIG")]
    config: Option<PathBuf>,

    /// Storage backend: "memory" or "lmdb".
    #[arg(long, env = "SAMARITAN_STORAGE")]
    storage: Option<String>,

    /// Data directory for the LMDB backend.
    #[arg(long, env = "SAMARITAN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Upper bound on engine operations running at once.
    #[arg(long, env = "SAMARITAN_MAX_CONCURRENT_OPS")]
    max_concurrent_ops: Option<usize>,

    /// Log level filter, e.g. "info" or "debug,samaritan_engine=trace".
    #[arg(long, env = "SAMARITAN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "SAMARITAN_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Validate the effective configuration and print it as TOML.
    #[command(name = "check-config")]
    CheckConfig,

    /// Print the fingerprint of a JSON-encoded set of device attributes.
    Fingerprint {
        /// Device attributes as a JSON object.
        attributes: String,
    },

    /// Replay JSON-lines engine commands and print one outcome per line.
    Replay {
        /// Input file; "-" reads standard input.
        #[arg(long, default_value = "-")]
        input: String,

        /// Print Prometheus metrics to stderr when done.
        #[arg(long)]
        print_metrics: bool,
    },
}

fn parse_backend(s: &str) -> anyhow::Result<StorageBackend> {
    match s.to_ascii_lowercase().as_str() {
        "memory" => Ok(StorageBackend::Memory),
        "lmdb" => Ok(StorageBackend::Lmdb),
        other => bail!("unknown storage backend '{other}' (expected 'memory' or 'lmdb')"),
    }
}

/// File settings first, then CLI flags and env vars on top.
fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::default(),
    };

    if let Some(storage) = &cli.storage {
        config.storage.backend = parse_backend(storage)?;
    }
    if let Some(dir) = &cli.data_dir {
        config.storage.data_dir = dir.clone();
    }
    if let Some(max) = cli.max_concurrent_ops {
        config.max_concurrent_ops = max;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }

    config.validate()?;
    Ok(config)
}

async fn run_replay(config: &EngineConfig, input: &str, print_metrics: bool) -> anyhow::Result<()> {
    let engine = IntegrityEngine::open(config)?;
    let reader: Box<dyn BufRead> = if input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = File::open(input).with_context(|| format!("opening {input}"))?;
        Box::new(BufReader::new(file))
    };

    let started = Instant::now();
    let mut summary = ReplaySummary::default();
    let mut stdout = io::stdout().lock();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let Some(command) = parse_line(&line) else {
            continue;
        };
        let command = command.with_context(|| format!("line {}: invalid command", index + 1))?;
        let outcome = execute(&engine, command)
            .await
            .with_context(|| format!("line {}", index + 1))?;
        summary.commands += 1;
        if outcome.get("error").is_some() {
            summary.rejected += 1;
        }
        writeln!(stdout, "{outcome}")?;
    }

    let flushed = engine.flush_pending_audits().await?;
    if flushed.remaining > 0 {
        tracing::warn!(remaining = flushed.remaining, "audit entries still pending at exit");
    }

    tracing::info!(
        commands = summary.commands,
        rejected = summary.rejected,
        elapsed = %format_millis(started.elapsed().as_millis() as u64),
        "replay finished"
    );

    if print_metrics {
        eprintln!("{}", engine.metrics().encode_text()?);
    }
    engine.close();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(config.log_format, &config.log_level)?;

    match cli.command {
        Command::CheckConfig => {
            print!("{}", config.to_toml_string()?);
            tracing::info!("configuration is valid");
        }
        Command::Fingerprint { attributes } => {
            let attrs: DeviceAttributes =
                serde_json::from_str(&attributes).context("parsing device attributes")?;
            println!("{}", compute_fingerprint(&attrs));
        }
        Command::Replay {
            input,
            print_metrics,
        } => {
            if config.storage.backend == StorageBackend::Lmdb {
                tracing::info!(data_dir = %config.storage.data_dir.display(), "replaying against LMDB");
            }
            run_replay(&config, &input, print_metrics).await?;
        }
    }

    Ok(())
}
