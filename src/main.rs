use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use env_logger::Env;
use keepwatch::configuration::config::Config;
use keepwatch::controller::controller_handler::Controller;
use keepwatch::storage::{open_storage, FindingFilter};
use log::{error, info, warn};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "keepwatch")]
#[command(version = "0.0.2")]
#[command(about = "Passive keyword monitor for outbound web traffic")]
struct Args {
    config_file: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Capture traffic and store findings (default)
    Run {
        /// Run a single capture session, then exit
        #[arg(long)]
        once: bool,
    },
    /// Print stored findings, one JSON object per line
    Findings {
        /// Only findings captured at or after this RFC 3339 instant
        #[arg(long)]
        since: Option<DateTime<Utc>>,
        /// Only findings for this Host value
        #[arg(long)]
        host: Option<String>,
    },
    /// Delete stored findings older than the given number of days
    Prune {
        #[arg(long)]
        older_than_days: u32,
    },
}

#[tokio::main]
async fn main() {
    log_builder(Env::default()).init();

    let args = Args::parse();

    info!("Importing configuration");
    let mut config = Config::from_file(&args.config_file).unwrap_or_else(|e| {
        error!("Unable to import configuration from file: {}", e);
        std::process::exit(1);
    });
    info!("Configuration imported successfully");

    let result = match args.command.unwrap_or(Command::Run { once: false }) {
        Command::Run { once } => {
            if once {
                config.schedule.continuous = false;
            }
            run(config).await
        }
        Command::Findings { since, host } => {
            let filter = FindingFilter {
                since,
                until: None,
                host,
            };
            blocking(move || print_findings(&config, filter)).await
        }
        Command::Prune { older_than_days } => {
            blocking(move || prune(&config, older_than_days)).await
        }
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

/// Info by default; a level set in the environment always wins.
fn log_builder(env: Env) -> env_logger::Builder {
    let mut builder = env_logger::Builder::from_env(env.default_filter_or("info"));
    builder.format_target(false);
    builder
}

type CommandResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Storage backends block on their own runtime; keep them off the async workers.
async fn blocking<F>(f: F) -> CommandResult
where
    F: FnOnce() -> CommandResult + Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

async fn run(config: Config) -> CommandResult {
    let controller = tokio::task::spawn_blocking(move || Controller::new(config)).await??;

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let mut handle = tokio::spawn(async move {
        info!("Spawning the controller");
        controller.run(token).await
    });

    tokio::select! {
        joined = &mut handle => return Ok(joined??),
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!("Unable to listen for Ctrl-C: {}", e);
            }
            info!("Shutdown requested, waiting for the current session to stop");
            cancel.cancel();
        }
    }

    handle.await??;
    Ok(())
}

fn print_findings(config: &Config, filter: FindingFilter) -> CommandResult {
    let storage = open_storage(&config.storage)?;
    let findings = storage.get_findings(Some(filter))?;
    for finding in &findings {
        println!("{}", serde_json::to_string(finding)?);
    }
    info!("{} finding(s) listed", findings.len());
    Ok(())
}

fn prune(config: &Config, older_than_days: u32) -> CommandResult {
    let storage = open_storage(&config.storage)?;
    let cutoff = Utc::now() - Duration::days(i64::from(older_than_days));
    let removed = storage.cleanup_old_findings(cutoff)?;
    info!("Pruned {} finding(s) older than {}", removed, cutoff.to_rfc3339());
    Ok(())
}
