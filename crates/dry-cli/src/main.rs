mod commands;
mod logging;
mod output;
mod progress;

use std::fs;
use std::io;
use std::path::Path;
use std::process;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, Format, GroupArgs, IndexArgs, OutputArgs, ScanArgs, ScopeArgs};
use dotenv::dotenv;
use dry_core::config::{self, AppConfig, IN_MEMORY};
use dry_core::storage::SessionScope;
use dry_core::{DryEngine, DuplicateGroup, Error, StorageKind};
use logging::Verbosity;
use progress::CliReporter;
use tracing::{error, info, warn};

fn main() {
    dotenv().ok();

    let args = Cli::parse();
    let verbosity = Verbosity::from_flags(args.verbose, args.quiet);
    let _guard = logging::init_logger(verbosity);

    let config = match config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let reporter = CliReporter::new(verbosity == Verbosity::Quiet);
    let result = match args.command {
        Some(Commands::Scan(scan)) => run_scan(config, &scan, &reporter),
        Some(Commands::Index(index)) => run_index(config, &index, &reporter),
        Some(Commands::Group(group)) => run_group(config, &group, &reporter),
        Some(Commands::LastSession) => run_last_session(config),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
            Ok(())
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run_scan(mut config: AppConfig, args: &ScanArgs, reporter: &CliReporter) -> Result<()> {
    let format = args.output.format;
    let kind = config.storage_kind()?;
    let target = report_target(&args.output);

    match (kind, format) {
        (StorageKind::Embedded, Format::Sqlite) => {
            config.sqlite_path = target.to_string_lossy().into_owned();
        }
        (StorageKind::Embedded, _) => config.sqlite_path = IN_MEMORY.to_string(),
        (StorageKind::Distributed, Format::Sqlite) => {
            bail!("sqlite output needs sqlite storage")
        }
        (StorageKind::Distributed, _) => {}
    }
    info!(
        "in: {} out[{:?}]: {}",
        args.path.display(),
        format,
        target.display()
    );

    let engine = DryEngine::new(config);
    let result = engine
        .scan(&args.path, reporter)
        .with_context(|| format!("scanning {}", args.path.display()))?;

    write_report(&result.group.groups, format, &target)?;
    info!(
        "Index: {}, Compare: {}",
        format!("{:.2}s", result.index.duration.as_secs_f64()).green(),
        format!("{:.2}s", result.group.duration.as_secs_f64()).green(),
    );
    info!(
        "{} duplicate groups, {} files with duplicates, {} bytes wasted",
        format!("{}", result.group.duplicate_groups().count()).red(),
        format!("{}", result.group.duplicate_files()).red(),
        format!("{}", result.group.wasted_bytes()).red(),
    );
    info!("---- done ----");
    Ok(())
}

fn run_index(mut config: AppConfig, args: &IndexArgs, reporter: &CliReporter) -> Result<()> {
    require_distributed(&config)?;
    config.scope = Some(resolve_scope(&config, &args.scope, None)?);

    let engine = DryEngine::new(config);
    let mut storage = engine.open_storage().context("opening the shared store")?;
    let outcome = engine
        .index(&mut storage, &args.path, reporter)
        .with_context(|| format!("indexing {}", args.path.display()))?;

    info!(
        "{} files indexed ({} bytes), {} links skipped",
        format!("{}", outcome.stats.files_indexed).green(),
        outcome.stats.bytes_indexed,
        outcome.stats.links_skipped,
    );
    report_degraded(&mut storage);
    storage.close();
    Ok(())
}

fn run_group(mut config: AppConfig, args: &GroupArgs, reporter: &CliReporter) -> Result<()> {
    require_distributed(&config)?;
    config.scope = Some(resolve_scope(&config, &args.scope, Some(0))?);
    let target = report_target(&args.output);

    let engine = DryEngine::new(config);
    let mut storage = engine.open_storage().context("opening the shared store")?;
    let outcome = engine.group(&mut storage, reporter).context("grouping")?;
    match args.output.format {
        Format::Sqlite => info!(
            "{} groups written to the shared store",
            outcome.duplicate_groups().count()
        ),
        format => write_report(&outcome.groups, format, &target)?,
    }

    if args.cleanup {
        if let Some(distributed) = storage.distributed() {
            let removed = distributed.cleanup().context("cleaning up file records")?;
            info!("{} file records removed", removed);
        }
    }
    report_degraded(&mut storage);
    storage.close();
    Ok(())
}

fn run_last_session(config: AppConfig) -> Result<()> {
    require_distributed(&config)?;
    let engine = DryEngine::new(config);
    let mut storage = engine.open_storage().context("opening the shared store")?;
    let last = match storage.distributed() {
        Some(distributed) => distributed.last_session()?,
        None => None,
    };
    match last {
        Some(session) => println!("{}", session),
        None => println!("no sessions"),
    }
    storage.close();
    Ok(())
}

fn require_distributed(config: &AppConfig) -> Result<()> {
    if config.storage_kind()? != StorageKind::Distributed {
        bail!(Error::InvalidConfig(
            "this command needs storage = \"pg\"".to_string()
        ));
    }
    Ok(())
}

fn resolve_scope(
    config: &AppConfig,
    args: &ScopeArgs,
    default_producer: Option<i32>,
) -> Result<SessionScope> {
    let producer_id = args
        .producer
        .or(config.scope.map(|s| s.producer_id))
        .or(default_producer);
    let session_id = args.session.or(config.scope.map(|s| s.session_id));
    match (producer_id, session_id) {
        (Some(producer_id), Some(session_id)) => Ok(SessionScope {
            producer_id,
            session_id,
        }),
        _ => bail!(Error::InvalidConfig(
            "--producer and --session are required".to_string()
        )),
    }
}

fn report_target(args: &OutputArgs) -> std::path::PathBuf {
    let now_ms = chrono::Utc::now().timestamp_millis();
    output::resolve_target(&args.target, args.format, now_ms)
}

fn write_report(groups: &[DuplicateGroup], format: Format, target: &Path) -> Result<()> {
    match format {
        Format::Json => {
            let json = output::to_json(groups)?;
            fs::write(target, json)
                .with_context(|| format!("writing {}", target.display()))?;
            info!("report saved to {}", target.display());
        }
        Format::Stdout => output::write_json(&mut io::stdout().lock(), groups)?,
        Format::Text => output::write_text(&mut io::stdout().lock(), groups)?,
        Format::Sqlite => info!("database saved to {}", target.display()),
    }
    Ok(())
}

fn report_degraded(storage: &mut dry_core::Storage) {
    if let Some(distributed) = storage.distributed() {
        let degraded = distributed.degraded_failures();
        if degraded > 0 {
            warn!(
                "{} store operations failed and were skipped",
                format!("{}", degraded).yellow()
            );
        }
    }
}
