//! hms-mirror CLI - Hive metastore migration planner.

use clap::{Parser, Subcommand};
use hms_mirror::{report, Config, ConversionResult, DataStrategy, InventoryFile, MirrorError, Orchestrator};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "hms-mirror")]
#[command(about = "Plan Hive metastore migrations between clusters")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Print progress updates as JSON lines to stderr
    #[arg(long)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan the migration of every selected table
    Run {
        /// Inventory of discovered LEFT/RIGHT metadata
        #[arg(short, long)]
        inventory: PathBuf,

        /// Directory for reports and execute scripts
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Override number of tables planned at once
        #[arg(long)]
        concurrency: Option<usize>,

        /// Override the data strategy (e.g. SCHEMA_ONLY, SQL, HYBRID)
        #[arg(long)]
        strategy: Option<DataStrategy>,
    },

    /// Check the configuration flag combinations without planning
    Validate {
        /// Override the data strategy
        #[arg(long)]
        strategy: Option<DataStrategy>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<u8, MirrorError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Run {
            inventory,
            output_dir,
            concurrency,
            strategy,
        } => {
            if let Some(strategy) = strategy {
                config.data_strategy = strategy;
            }
            if let Some(c) = concurrency {
                config.concurrency = Some(c);
            }
            config.validate()?;
            let config = config.with_auto_tuning();

            let source = InventoryFile::load(&inventory).await?;
            let cancel_token = setup_signal_handler();

            let orchestrator = Orchestrator::new(config).with_progress(cli.progress);
            let result = orchestrator.run(&source, cancel_token).await?;

            if let Some(dir) = output_dir {
                report::write_reports(&result, &dir)?;
            }

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                print_summary(&result);
            }
            Ok(exit_code(result.return_code()))
        }

        Commands::Validate { strategy } => {
            if let Some(strategy) = strategy {
                config.data_strategy = strategy;
            }
            match hms_mirror::config::validate_flags(&config) {
                Ok(()) => {
                    println!("Configuration is valid for {}", config.data_strategy);
                    Ok(0)
                }
                Err(failure) => {
                    warn!("{}", failure);
                    if cli.output_json {
                        println!("{}", serde_json::to_string_pretty(&failure)?);
                    } else {
                        println!("Configuration is not valid (return code {}):", failure.return_code());
                        for code in &failure.codes {
                            println!("  {:?}: {}", code, code.message());
                        }
                    }
                    Ok(exit_code(failure.return_code()))
                }
            }
        }
    }
}

fn print_summary(result: &ConversionResult) {
    println!("\nConversion completed!");
    println!("  Job: {}", result.key);
    println!("  Strategy: {}", result.strategy);
    println!("  Databases: {}", result.databases.len());
    println!("  Tables: {}", result.table_count());
    for (state, count) in result.phase_summary() {
        println!("    {}: {}", state, count);
    }
    if let Some(failure) = &result.validation {
        println!("  Validation failed: {}", failure);
    }
    if result.cancelled {
        println!("  Cancelled before every table finished");
    }
    println!("  Return code: {}", result.return_code());
}

/// Exit status for a job return code. Negative codes wrap like a shell does,
/// but a non-zero code never wraps to success.
fn exit_code(return_code: i64) -> u8 {
    match return_code.rem_euclid(256) {
        0 if return_code != 0 => 1,
        wrapped => wrapped as u8,
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Setup signal handlers for graceful shutdown.
/// Tables already being planned finish; no new table starts.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    for (kind, name) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ] {
        let token = cancel_token.clone();
        tokio::spawn(async move {
            let mut stream = match signal(kind) {
                Ok(stream) => stream,
                Err(e) => {
                    warn!("Failed to setup {} handler: {}", name, e);
                    return;
                }
            };
            stream.recv().await;
            eprintln!("\nReceived {}. Finishing tables in flight...", name);
            token.cancel();
        });
    }

    cancel_token
}

/// Setup signal handler for Windows (only Ctrl-C)
#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Finishing tables in flight...");
            token.cancel();
        }
    });

    cancel_token
}
