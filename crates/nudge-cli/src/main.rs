use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use nudge_core::app::{EngineBuilder, ReminderEngine};
use nudge_core::config::{self, NudgeConfig};
use nudge_core::domain::{ErrorReport, TimeResolver};
use nudge_core::impls::{InMemoryEntityStore, LogEmailSender, Snapshot};
use nudge_core::ports::{Clock, FixedClock, SystemClock};
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "nudge",
    version,
    about = "Resolve due CRM reminders and dispatch them to email, chat, SMS and popups"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "nudge.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one pass and print the report as JSON.
    Run {
        /// Entity store snapshot (JSON); rewritten in place after the run.
        #[arg(short, long)]
        data: PathBuf,

        /// Pretend the current time is this timestamp.
        #[arg(long)]
        now: Option<String>,
    },
    /// Run a pass every N seconds until Ctrl-C.
    Watch {
        #[arg(short, long)]
        data: PathBuf,

        #[arg(long, default_value_t = 60)]
        interval_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;

    // stdout carries the JSON report, so logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.log.level)),
        )
        .init();

    match cli.command {
        Commands::Run { data, now } => {
            let clock: Arc<dyn Clock> = match now {
                Some(raw) => {
                    let resolver = TimeResolver::from_zone_str(&cfg.engine.home_timezone)?;
                    let at = resolver
                        .resolve(&raw)
                        .with_context(|| format!("invalid --now {raw:?}"))?;
                    Arc::new(FixedClock::new(at))
                }
                None => Arc::new(SystemClock),
            };
            let (engine, store) = wire(&cfg, &data, clock)?;

            match engine.run().await {
                Ok(report) => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                    save(&data, &store.snapshot().await)?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => {
                    error!(error = %err, "reminder run failed");
                    println!("{}", serde_json::to_string_pretty(&ErrorReport::new(&err))?);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Watch {
            data,
            interval_secs,
        } => {
            let (engine, store) = wire(&cfg, &data, Arc::new(SystemClock))?;
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
            info!(interval_secs, "watching for due reminders");

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        info!("shutting down");
                        return Ok(ExitCode::SUCCESS);
                    }
                    _ = ticker.tick() => {
                        match engine.run().await {
                            Ok(report) => {
                                let line = serde_json::json!({
                                    "serverTime": report.debug_info.server_time,
                                    "summary": report.debug_info.summary,
                                    "popups": report.popups,
                                });
                                println!("{line}");
                                save(&data, &store.snapshot().await)?;
                            }
                            Err(err) => error!(error = %err, "reminder run failed"),
                        }
                    }
                }
            }
        }
    }
}

fn wire(
    cfg: &NudgeConfig,
    data: &Path,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<(ReminderEngine, Arc<InMemoryEntityStore>)> {
    let raw = std::fs::read_to_string(data)
        .with_context(|| format!("failed to read snapshot {}", data.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse snapshot {}", data.display()))?;

    let store = Arc::new(InMemoryEntityStore::new(snapshot, Arc::clone(&clock)));
    let engine = EngineBuilder::new(cfg.engine.clone())
        .store(store.clone())
        .email(Arc::new(LogEmailSender))
        .outbox(store.clone())
        .clock(clock)
        .build()?;
    Ok((engine, store))
}

/// Write via a sibling temp file so a crash never leaves half a snapshot.
fn save(path: &Path, snapshot: &Snapshot) -> anyhow::Result<()> {
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path).with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}
