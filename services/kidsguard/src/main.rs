//! KidsGuard CLI
//!
//! Command-line front end for the KidsGuard child-safety backend.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use kidsguard::api::DangerLevel;
use kidsguard::confirm::{AssumeYes, Confirm};
use kidsguard::history::EXPORT_FILE_NAME;
use kidsguard::{check, digest, events, history, jobs, stream};
use kidsguard::{load_config, Config, KidsGuard, KidsGuardBuilder, KidsGuardError};
use tracing::Level;

#[derive(Parser)]
#[command(name = "kidsguard")]
#[command(about = "Dashboard client for the KidsGuard child-safety backend")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL (overrides config file)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Dashboard port (overrides config file)
    #[arg(long, global = true)]
    dashboard_port: Option<u16>,

    /// Log level
    #[arg(short, long, default_value = "info", global = true)]
    log_level: Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check that a stream is reachable
    Validate { url: String },
    /// List the one-click safety presets
    Presets,
    /// Run one safety check against a stream
    Check {
        #[arg(long)]
        url: String,
        /// Use a preset instead of a free-text condition
        #[arg(long, conflicts_with = "condition")]
        preset: Option<String>,
        condition: Option<String>,
    },
    /// Show, export or clear the alert history
    History {
        /// Only show records of this level (safe, medium, high)
        #[arg(long)]
        level: Option<DangerLevel>,
        #[command(subcommand)]
        action: Option<HistoryAction>,
    },
    /// Manage backend monitoring jobs
    Monitor {
        #[command(subcommand)]
        action: MonitorAction,
    },
    /// Show or create the webhook relay token
    Token {
        #[arg(long)]
        create: bool,
    },
    /// Fetch the relay event feed once
    Events,
    /// Follow the live digest of a stream until it ends or ctrl-c
    Digest {
        #[arg(long)]
        url: String,
    },
    /// List past digest summaries
    Summaries,
    /// Serve the local dashboard for a stream, optionally monitoring a condition
    Watch {
        #[arg(long)]
        url: String,
        #[arg(long)]
        condition: Option<String>,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// Save the backend export to a file
    Export {
        #[arg(short, long, default_value = EXPORT_FILE_NAME)]
        output: PathBuf,
    },
    /// Delete every stored alert
    Clear {
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum MonitorAction {
    /// Start a monitoring job
    Start {
        #[arg(long)]
        url: String,
        condition: String,
    },
    /// Stop every running job
    StopAll {
        #[arg(long)]
        yes: bool,
    },
    /// Stop one job
    Cancel { job_id: String },
    /// List jobs
    Jobs,
    /// Show one job
    Job { job_id: String },
}

/// Asks on the terminal
struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        if std::io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        if std::io::stdin().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
    }
}

fn confirmer(yes: bool) -> Box<dyn Confirm> {
    if yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinConfirm)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, backend_url={:?}, dashboard_port={:?}, log_level={:?}",
        args.config,
        args.backend_url,
        args.dashboard_port,
        args.log_level
    );

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    if let Some(backend_url) = args.backend_url {
        config.backend.base_url = backend_url;
    }
    if let Some(dashboard_port) = args.dashboard_port {
        config.dashboard.port = dashboard_port;
    }

    let session = KidsGuardBuilder::new(config).build().await?;

    match run(&session, args.command).await {
        Err(KidsGuardError::Cancelled(what)) => {
            println!("Cancelled: {}", what);
            Ok(())
        }
        other => Ok(other?),
    }
}

async fn run(session: &KidsGuard, command: Command) -> kidsguard::Result<()> {
    let ctx = session.context();

    match command {
        Command::Validate { url } => {
            let preview = stream::validate(ctx, &url).await?;
            match preview.embed_url(&ctx.preview.embed_parent) {
                Some(embed) => println!("Preview: {}", embed),
                None => println!("Preview: not embeddable"),
            }
        }
        Command::Presets => {
            for preset in check::load_presets(ctx).await? {
                println!("{:<20} {}", preset.id, preset.condition);
            }
        }
        Command::Check {
            url,
            preset,
            condition,
        } => {
            stream::validate(ctx, &url).await?;
            let result = match preset {
                Some(preset) => check::run_preset(ctx, &preset).await?,
                None => check::run_check(ctx, condition.as_deref().unwrap_or_default()).await?,
            };
            println!(
                "{} triggered={} ({}ms): {}",
                result.danger_level.as_str().to_uppercase(),
                result.triggered,
                result.latency_ms,
                result.explanation
            );
        }
        Command::History { level, action } => match action {
            None => {
                for record in history::load(ctx, level).await? {
                    println!(
                        "{:<20} {:<6} {:<5} {}",
                        record.timestamp,
                        record.danger_level.as_str().to_uppercase(),
                        if record.triggered { "YES" } else { "no" },
                        record.condition
                    );
                }
            }
            Some(HistoryAction::Export { output }) => {
                let bytes = history::export(ctx, &output).await?;
                println!("Wrote {} bytes to {}", bytes, output.display());
            }
            Some(HistoryAction::Clear { yes }) => {
                history::clear(ctx, confirmer(yes).as_ref()).await?;
            }
        },
        Command::Monitor { action } => match action {
            MonitorAction::Start { url, condition } => {
                stream::validate(ctx, &url).await?;
                events::load_token(ctx).await.ok();
                let started = session.controller().start(&condition).await?;
                println!("Started job {}", started.job_id);
            }
            MonitorAction::StopAll { yes } => {
                let stopped = session.controller().stop_all(confirmer(yes).as_ref()).await?;
                println!("Stopped {} job(s)", stopped);
            }
            MonitorAction::Cancel { job_id } => {
                session.controller().cancel(&job_id).await?;
            }
            MonitorAction::Jobs => {
                for job in jobs::refresh(ctx).await? {
                    println!(
                        "{:<10} {:<8} {:<14} checks={} triggers={}",
                        job.short_id(),
                        job.status,
                        job.job_type,
                        job.details.checks_performed,
                        job.details.triggers_fired
                    );
                }
            }
            MonitorAction::Job { job_id } => {
                let job = jobs::detail(ctx, &job_id).await?;
                println!("{}", serde_json::to_string_pretty(&job)?);
            }
        },
        Command::Token { create } => {
            let token = if create {
                events::create_token(ctx).await?
            } else {
                events::load_token(ctx).await?
            };
            println!("{} {}", token.uuid, token.url);
        }
        Command::Events => {
            let feed = ctx.backend.relay_events().await?;
            events::apply_relay_events(ctx, &feed.events).await;
            for event in &feed.events {
                println!(
                    "{:<20} {:<6} {}",
                    event.timestamp,
                    event.danger_level.as_str().to_uppercase(),
                    event.headline()
                );
            }
        }
        Command::Digest { url } => {
            stream::validate(ctx, &url).await?;
            session.digest().start().await?;
            tokio::select! {
                _ = session.digest().wait() => {}
                _ = tokio::signal::ctrl_c() => {
                    session.digest().close().await;
                }
            }
            println!("Digest {:?}", session.digest().phase().await);
        }
        Command::Summaries => {
            for summary in digest::list_summaries(ctx).await? {
                println!("{:<26} {}", summary.timestamp, summary.summary);
            }
        }
        Command::Watch { url, condition } => {
            session.watch(&url, condition.as_deref()).await?;
        }
    }

    Ok(())
}
