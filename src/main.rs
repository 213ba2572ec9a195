//! live-config command line tool.
//!
//! ```text
//! live-config dump app.properties          records as JSON
//! live-config diff old.toml new.toml       created / deleted / modified
//! live-config watch app.properties         live cache, change events as JSON lines
//! ```

use clap::{Parser, Subcommand};
use live_config::cache::{LiveCache, RefreshOutcome};
use live_config::config::loader::{finalize, load_settings};
use live_config::config::watcher::FileTrigger;
use live_config::config::Settings;
use live_config::diff::diff_snapshots;
use live_config::loader::{file_loader, Loader, SourceFormat};
use live_config::observability::logging;
use live_config::record::Record;
use live_config::watcher::{ChannelWatcher, ConfigEvent};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "live-config")]
#[command(about = "Inspect and watch flat configuration record sources", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the records of a source file as JSON
    Dump {
        file: PathBuf,
        /// Source format; guessed from the extension by default
        #[arg(long, value_enum)]
        format: Option<SourceFormat>,
    },
    /// Show what changed between two source files
    Diff { old: PathBuf, new: PathBuf },
    /// Keep a live cache over a source file and print change events
    Watch {
        /// Records file; overrides `source.path` from the settings file
        file: Option<PathBuf>,
        /// Settings file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Refresh interval, e.g. `5s` or `500ms`
        #[arg(long, value_parser = humantime::parse_duration)]
        interval: Option<Duration>,
        /// Do not refresh on file change events
        #[arg(long)]
        no_watch_file: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Dump { file, format } => {
            logging::init(cli.log_level.as_deref().unwrap_or("warn"));
            let records = load_file(&file, format)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Commands::Diff { old, new } => {
            logging::init(cli.log_level.as_deref().unwrap_or("warn"));
            let diff = diff_snapshots(&load_file(&old, None)?, &load_file(&new, None)?);
            println!("{}", serde_json::to_string_pretty(&diff)?);
        }
        Commands::Watch {
            file,
            config,
            interval,
            no_watch_file,
        } => {
            let mut settings = match config {
                Some(path) => load_settings(&path)?,
                None => Settings::default(),
            };
            if let Some(file) = file {
                settings.source.path = Some(file);
            }
            if let Some(interval) = interval {
                settings.refresh.interval_ms = interval.as_millis() as u64;
            }
            if no_watch_file {
                settings.refresh.watch_file = false;
            }
            if let Some(level) = cli.log_level {
                settings.observability.log_level = level;
            }

            let settings = finalize(settings)?;
            logging::init(&settings.observability.log_level);
            watch(settings).await?;
        }
    }

    Ok(())
}

async fn watch(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let path = settings.source.path.clone().ok_or("no source file configured")?;
    let format = settings
        .source
        .resolved_format()
        .ok_or("cannot tell the source format")?;

    let (watcher, mut events) = ChannelWatcher::new();
    let cache = Arc::new(
        LiveCache::builder(file_loader(&path, format))
            .watcher(watcher)
            .refresh_interval(settings.refresh.interval())
            .build()?,
    );

    let initial = {
        let cache = cache.clone();
        tokio::task::spawn_blocking(move || cache.refresh_now()).await?
    };
    if initial == RefreshOutcome::Failed {
        return Err(format!("initial load of {} failed", path.display()).into());
    }
    tracing::info!(
        path = %path.display(),
        records = cache.raw_records().len(),
        interval_ms = settings.refresh.interval_ms,
        "Watching configuration source"
    );

    let _file_watcher = match cache.refresh_handle() {
        Some(handle) if settings.refresh.watch_file => Some(FileTrigger::new(&path, handle).run()?),
        _ => None,
    };

    loop {
        tokio::select! {
            Some(event) = events.recv() => print_event(event)?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
        }
    }

    cache.close();
    cache.join().await;
    Ok(())
}

fn load_file(
    path: &Path,
    format: Option<SourceFormat>,
) -> Result<Vec<Record>, Box<dyn std::error::Error>> {
    let format = format
        .or_else(|| SourceFormat::from_path(path))
        .ok_or_else(|| format!("cannot tell the format of {}", path.display()))?;
    Ok(file_loader(path, format).load()?)
}

fn print_event(event: ConfigEvent) -> Result<(), serde_json::Error> {
    let line = match event {
        ConfigEvent::Created(record) => serde_json::json!({ "event": "created", "record": record }),
        ConfigEvent::Modified(record) => serde_json::json!({ "event": "modified", "record": record }),
        ConfigEvent::Deleted(record) => serde_json::json!({ "event": "deleted", "record": record }),
        ConfigEvent::Error(message) => serde_json::json!({ "event": "error", "message": message }),
    };
    println!("{}", serde_json::to_string(&line)?);
    Ok(())
}
