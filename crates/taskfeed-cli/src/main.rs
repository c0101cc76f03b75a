//! Taskfeed - streaming progress log for agent task output.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use taskfeed_cli::{config, logging, render, replay, watch};
use taskfeed_core::TaskSession;
use taskfeed_types::SessionEvent;

use config::Config;
use logging::{LogConfig, LogFormat};
use render::OutputFormat;

/// Taskfeed - turn a model's streamed markup into an ordered step log.
#[derive(Parser, Debug)]
#[command(name = "taskfeed")]
#[command(about = "Turn streamed assistant markup into a collapsible progress log")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (step appends and file tracking)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging (diff decisions)
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable trace logging (TRACE level for everything)
    #[arg(long, global = true)]
    trace: bool,

    /// Quiet mode (WARN and ERROR only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Set log level for specific targets (e.g., "diff=debug" or "classify=trace").
    /// Can be specified multiple times. Targets are prefixed with "taskfeed::" automatically.
    #[arg(long = "log", value_name = "TARGET=LEVEL", global = true)]
    log_overrides: Vec<String>,

    /// Log output format
    #[arg(long = "log-format", value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a JSONL recording of buffer snapshots and commands
    Replay {
        /// Recording file
        file: PathBuf,

        /// Final log format
        #[arg(long, value_name = "FORMAT", default_value = "text")]
        format: OutputFormat,

        /// Print every event as a JSON line instead of the final log
        #[arg(long)]
        events: bool,
    },
    /// Follow a file holding the cumulative buffer until Ctrl-C
    Watch {
        /// Buffer file
        file: PathBuf,

        /// Final log format
        #[arg(long, value_name = "FORMAT", default_value = "text")]
        format: OutputFormat,

        /// Print every event as a JSON line as it happens
        #[arg(long)]
        events: bool,
    },
}

fn print_event(event: &SessionEvent) {
    match render::render_event(event) {
        Ok(line) => println!("{}", line),
        Err(e) => tracing::warn!(target: "taskfeed::cli", "Failed to serialize event: {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::from_cli(
        cli.verbose,
        cli.debug,
        cli.trace,
        cli.quiet,
        cli.log_overrides,
        cli.log_format,
    );
    logging::init(&log_config);

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    tracing::debug!(target: "taskfeed::cli", "Loaded configuration: {:?}", config);

    let mut session = TaskSession::new(&config.session);

    let (format, events) = match cli.command {
        Command::Replay {
            file,
            format,
            events,
        } => {
            let summary = if events {
                replay::run_file(&mut session, &file, print_event)?
            } else {
                replay::run_file(&mut session, &file, |_| {})?
            };
            if summary.skipped + summary.rejected > 0 {
                tracing::warn!(
                    target: "taskfeed::cli",
                    "{} lines skipped, {} commands rejected",
                    summary.skipped,
                    summary.rejected
                );
            }
            (format, events)
        }
        Command::Watch {
            file,
            format,
            events,
        } => {
            if events {
                watch::run(&file, &mut session, print_event).await?;
            } else {
                watch::run(&file, &mut session, |_| {}).await?;
            }
            (format, events)
        }
    };

    if !events {
        println!("{}", render::render(&session.snapshot(), format)?);
    }
    Ok(())
}
