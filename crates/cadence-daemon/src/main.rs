use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use cadence_core::CadenceConfig;
use cadence_notify::ResultBroadcaster;
use cadence_scheduler::{Dispatcher, JobKind, Scheduler};
use cadence_worker::ExecutionQueue;

#[derive(Parser, Debug)]
#[command(name = "cadence")]
#[command(version)]
#[command(about = "In-process job scheduler: shell commands on a clock")]
struct Args {
    /// Path to cadence.toml (default: $CADENCE_CONFIG, then ~/.cadence/cadence.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the scheduler daemon (dispatcher + worker + result log)
    Run,

    /// Store a new job. A running daemon picks it up at its next startup.
    Add {
        /// Human-readable job label
        #[arg(long)]
        name: String,

        /// Shell command executed via `sh -c` when the job fires
        #[arg(long)]
        command: String,

        /// Absolute due-time, epoch seconds
        #[arg(long, conflicts_with = "in_secs")]
        at: Option<i64>,

        /// Relative due-time, seconds from now
        #[arg(long = "in", conflicts_with = "at")]
        in_secs: Option<i64>,

        /// Recurrence interval in seconds (makes the job recurring)
        #[arg(long)]
        every: Option<i64>,
    },

    /// List all stored jobs
    List {
        /// Emit the job records as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Cancel a job by exact name and due-time
    Remove {
        #[arg(long)]
        name: String,

        /// Due-time of the job, epoch seconds
        #[arg(long)]
        at: i64,
    },

    /// Delete every stored job
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    // load config: explicit flag > CADENCE_CONFIG env > ~/.cadence/cadence.toml
    let config_path = args
        .config
        .clone()
        .or_else(|| std::env::var("CADENCE_CONFIG").ok());
    let config = CadenceConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({e}), using defaults");
        CadenceConfig::default()
    });

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    let conn = rusqlite::Connection::open(db_path)
        .with_context(|| format!("opening database at {db_path}"))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    let scheduler = Scheduler::new(conn)?;

    match args.command {
        Commands::Run => run_daemon(config, scheduler).await,
        Commands::Add {
            name,
            command,
            at,
            in_secs,
            every,
        } => {
            let due_at = match (at, in_secs) {
                (Some(at), None) => at,
                (None, Some(secs)) => chrono::Utc::now().timestamp() + secs,
                _ => anyhow::bail!("exactly one of --at or --in is required"),
            };
            let kind = if every.is_some() {
                JobKind::Recurring
            } else {
                JobKind::OneTime
            };
            let job = scheduler.create_job(&name, kind, due_at, every, &command)?;
            println!(
                "Created {} job \"{}\" due at {} (id {})",
                job.kind, job.name, job.due_at, job.id
            );
            Ok(())
        }
        Commands::List { json } => {
            let jobs = scheduler.list_jobs()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&jobs)?);
                return Ok(());
            }
            if jobs.is_empty() {
                println!("No jobs stored.");
                return Ok(());
            }
            println!(
                "{:<38} {:<16} {:<10} {:>12} {:>10} {:>5}  COMMAND",
                "ID", "NAME", "KIND", "DUE_AT", "STATUS", "RUNS"
            );
            for job in jobs {
                println!(
                    "{:<38} {:<16} {:<10} {:>12} {:>10} {:>5}  {}",
                    job.id,
                    job.name,
                    job.kind.to_string(),
                    job.due_at,
                    job.status.to_string(),
                    job.runs,
                    job.command
                );
            }
            Ok(())
        }
        Commands::Remove { name, at } => {
            scheduler.cancel_job(&name, at)?;
            println!("Removed job \"{name}\" @ {at}");
            Ok(())
        }
        Commands::Clear => {
            let removed = scheduler.clear_all()?;
            println!("Removed {removed} job(s)");
            Ok(())
        }
    }
}

/// Wire and run the full pipeline until ctrl-c.
async fn run_daemon(config: CadenceConfig, scheduler: Scheduler) -> anyhow::Result<()> {
    let loaded = scheduler.load_pending()?;
    info!(loaded, db = %config.database.path, "scheduler ready");

    let broadcaster = ResultBroadcaster::new(config.notify.capacity);
    let exec_timeout = config
        .worker
        .exec_timeout_secs
        .map(std::time::Duration::from_secs);
    let queue = ExecutionQueue::new(
        scheduler.store(),
        scheduler.index(),
        broadcaster.clone(),
        exec_timeout,
    );

    // Result log: the in-process observer on the broadcast stream.
    let mut results = broadcaster.subscribe();
    tokio::spawn(async move {
        use tokio::sync::broadcast::error::RecvError;
        loop {
            match results.recv().await {
                Ok(result) if result.success => {
                    info!(job_id = %result.job_id, name = %result.name, "{}", result.message);
                }
                Ok(result) => {
                    error!(job_id = %result.job_id, name = %result.name, "{}", result.message);
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!(missed, "result log lagging; events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let dispatcher = Dispatcher::new(scheduler.index(), queue);
    let dispatcher_task = tokio::spawn(dispatcher.run(shutdown_rx));

    tokio::signal::ctrl_c()
        .await
        .context("listening for ctrl-c")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);
    let _ = dispatcher_task.await;
    Ok(())
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
