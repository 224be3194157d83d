//! `svcdir` command-line entry point.
//!
//! # Responsibility
//! - Run the periodic publishing jobs (scheduled commit, archive sweep).
//! - Expose read-only probes over a database file.
//!
//! # Invariants
//! - Every command prints one JSON document on stdout.
//! - A job that reports failures exits with a non-zero status.

use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;
use svcdir_core::db::migrations::latest_version;
use svcdir_core::{
    init_logging, open_db, Clock, CoreConfig, CoreError, JobReport, PublishingService,
    SelectionService, ServiceContext, ViewerContext,
};
use uuid::Uuid;

mod error;

use error::CliError;

/// Service directory publishing core toolbox.
#[derive(Parser, Debug)]
#[command(name = "svcdir", version, about)]
struct Cli {
    /// JSON config file; omitted keys use defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// SQLite database file, overriding `database_path`.
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Absolute directory for rolling log files.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print core linkage and version.
    Ping,
    /// Create or migrate the database.
    InitDb,
    /// Publish every scheduled language that is due.
    CommitScheduled {
        /// Epoch ms to treat as now.
        #[arg(long)]
        now: Option<i64>,
    },
    /// Delete expired, unreviewed publications.
    ArchiveSweep {
        #[arg(long)]
        now: Option<i64>,
    },
    /// Show what a viewer sees for one root and language.
    Resolve {
        #[arg(long)]
        root: Uuid,
        #[arg(long)]
        language: String,
        /// Resolve as an editor instead of the public.
        #[arg(long)]
        editor: bool,
    },
    /// List status transitions of a version.
    History {
        #[arg(long)]
        version_id: Uuid,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            eprintln!("svcdir: {err}");
            ExitCode::from(2)
        }
    }
}

/// Returns `Ok(false)` when a job completed with failures.
fn run(cli: Cli) -> Result<bool, CliError> {
    let config = load_config(&cli)?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir)?;
    }

    if let Commands::Ping = cli.command {
        print_json(&serde_json::json!({
            "ping": svcdir_core::ping(),
            "version": svcdir_core::core_version(),
        }))?;
        return Ok(true);
    }

    let conn = open_db(&config.database_path)?;
    let ctx = ServiceContext::bootstrap(&conn, config.clone())?;
    match cli.command {
        Commands::Ping => Ok(true),
        Commands::InitDb => {
            print_json(&serde_json::json!({
                "database": config.database_path,
                "schema_version": latest_version(),
            }))?;
            Ok(true)
        }
        Commands::CommitScheduled { now } => {
            let now = now.unwrap_or_else(|| ctx.clock.now_ms());
            let report = PublishingService::new(&conn, ctx).commit_due_schedules(now)?;
            finish_job(&report)
        }
        Commands::ArchiveSweep { now } => {
            let now = now.unwrap_or_else(|| ctx.clock.now_ms());
            let report = PublishingService::new(&conn, ctx).archive_expired(now)?;
            finish_job(&report)
        }
        Commands::Resolve {
            root,
            language,
            editor,
        } => {
            let language = ctx.lookup.parse(&language).map_err(CoreError::from)?;
            let viewer = if editor {
                ViewerContext::Editor
            } else {
                ViewerContext::Public
            };
            let resolution =
                SelectionService::new(&conn, ctx).resolve_for_viewer(root, &language, viewer)?;
            print_json(&resolution)?;
            Ok(true)
        }
        Commands::History { version_id } => {
            let history = PublishingService::new(&conn, ctx).history(version_id)?;
            print_json(&history)?;
            Ok(true)
        }
    }
}

fn load_config(cli: &Cli) -> Result<CoreConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };
    if let Some(db) = &cli.db {
        config.database_path = db.clone();
    }
    if let Some(log_dir) = &cli.log_dir {
        config.log_dir = Some(log_dir.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    config.validate()?;
    Ok(config)
}

fn finish_job(report: &JobReport) -> Result<bool, CliError> {
    print_json(report)?;
    info!(
        "event=cli_job module=cli status={} job={} committed={} failed={}",
        if report.is_clean() { "ok" } else { "partial" },
        report.job,
        report.committed.len(),
        report.failed.len()
    );
    Ok(report.is_clean())
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value).map_err(CliError::Output)?;
    println!("{rendered}");
    Ok(())
}
