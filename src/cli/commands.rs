//! CLI command implementations
//!
//! `serve` owns the tokio runtime; `summary` and `export` read the durable
//! store directly and never start a server. The offline commands open the
//! store read-only, so they are safe to run beside a live server.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::args::Command;
use super::config::Config;
use super::errors::{CliError, CliResult};
use crate::aggregate::{strict_export_rows, write_export, Aggregator, ExportRows};
use crate::http_server::{AppState, HttpServer};
use crate::storage::{FileStore, FormStore, MemoryStore};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, port } => serve(&config, port),
        Command::Summary { config, form_id } => summary(&config, &form_id, &mut io::stdout()),
        Command::Export {
            config,
            form_id,
            output,
        } => export(&config, &form_id, output.as_deref()),
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Shared state over the configured storage engine
pub fn open_state(config: &Config) -> CliResult<AppState> {
    match &config.data_dir {
        Some(dir) => {
            let store = Arc::new(FileStore::open(dir)?);
            info!(data_dir = %dir.display(), "using file store");
            Ok(AppState::new(store.clone(), store))
        }
        None => {
            info!("no data_dir configured, using in-memory store");
            let store = Arc::new(MemoryStore::new());
            Ok(AppState::new(store.clone(), store))
        }
    }
}

/// Start the HTTP server and block until it stops
pub fn serve(config_path: &Path, port: Option<u16>) -> CliResult<()> {
    let mut config = Config::load(config_path)?;
    if let Some(port) = port {
        config.server.port = port;
        config.validate()?;
    }
    init_tracing(&config.log_level);

    let state = open_state(&config)?;
    let server = HttpServer::with_state(config.server.clone(), state);

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::serve_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::serve_failed(format!("HTTP server failed: {}", e)))
    })
}

fn open_file_store(config: &Config) -> CliResult<FileStore> {
    let dir: &PathBuf = config.data_dir.as_ref().ok_or_else(|| {
        CliError::config_error("data_dir is required to read stored responses")
    })?;
    Ok(FileStore::open_read_only(dir)?)
}

/// Print a form's summary as JSON
pub fn summary<W: Write>(config_path: &Path, form_id: &str, out: &mut W) -> CliResult<()> {
    let config = Config::load(config_path)?;
    init_tracing(&config.log_level);

    let store = Arc::new(open_file_store(&config)?);
    store.get_form(form_id)?;

    let summary = Aggregator::new(store).summarize(form_id)?;
    serde_json::to_writer_pretty(&mut *out, &summary)?;
    writeln!(out)?;
    Ok(())
}

/// Write a form's CSV export to a file or stdout.
///
/// An unreadable response fails the export. A file target is written beside
/// the destination and only renamed into place once complete.
pub fn export(config_path: &Path, form_id: &str, output: Option<&Path>) -> CliResult<()> {
    let config = Config::load(config_path)?;
    init_tracing(&config.log_level);

    let store = open_file_store(&config)?;
    store.get_form(form_id)?;
    let rows = strict_export_rows(&store, form_id)?;

    match output {
        Some(path) => {
            let partial = partial_path(path);
            if let Err(e) = export_to_file(rows, &partial, path) {
                let _ = fs::remove_file(&partial);
                return Err(e);
            }
            info!(form_id, path = %path.display(), "export written");
        }
        None => write_export(rows, &mut io::stdout().lock())?,
    }
    Ok(())
}

fn export_to_file(rows: ExportRows, partial: &Path, path: &Path) -> CliResult<()> {
    let mut out = BufWriter::new(File::create(partial)?);
    write_export(rows, &mut out)?;
    out.into_inner().map_err(|e| e.into_error())?.sync_all()?;
    fs::rename(partial, path)?;
    Ok(())
}

/// Sibling of `path` holding an export until it is complete
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}
