use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use raidvod_cli::config::{self, AppConfig, ConfigManager, LogLevel};
use raidvod_cli::error::CliError;
use raidvod_cli::orchestrators::{UploadOrchestrator, WatchSummary};
use raidvod_cli::progress::{self, create_progress_infrastructure, render_progress};
use raidvod_cli::{auth, terminal};
use raidvod_core::error::UploadError;
use raidvod_core::{
    Eligibility, EligibilityFilter, LogProvider, MetadataExtractor, ProgressProvider,
    SqliteTrackingStore, TrackingStore, WatchedDirectory, YouTubeUploader,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "raidvod")]
#[command(author, version, about = "Raid VOD uploader - watch a recordings folder and upload new kills to YouTube", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Use this configuration file instead of the default one
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a directory and upload new eligible recordings until interrupted
    Watch {
        /// Directory to watch (defaults to watch.directory)
        #[arg(long, value_name = "DIR")]
        directory: Option<PathBuf>,

        /// Disable progress bar display
        #[arg(long)]
        no_progress: bool,
    },

    /// Show the metadata and eligibility of a recording without uploading it
    Inspect {
        /// Recording to inspect
        file: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Mark a file as already uploaded
    Track {
        file: PathBuf,

        /// Scope directory (defaults to watch.directory)
        #[arg(long, value_name = "DIR")]
        directory: Option<PathBuf>,
    },

    /// Forget a file so the next watch uploads it again
    Untrack {
        file: PathBuf,

        /// Scope directory (defaults to watch.directory)
        #[arg(long, value_name = "DIR")]
        directory: Option<PathBuf>,
    },

    /// List tracked files of a watched directory
    Tracked {
        /// Scope directory (defaults to watch.directory)
        #[arg(long, value_name = "DIR")]
        directory: Option<PathBuf>,
    },

    /// List every directory that has been watched
    Scopes,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Authorize uploads to YouTube
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Interactive setup of the watch directory and upload defaults
    Init {
        /// Reconfigure even if already set up
        #[arg(short, long)]
        force: bool,
    },

    /// Get a configuration value
    Get {
        /// Configuration key (e.g., watch.poll_interval_seconds)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., youtube_video.visibility)
        key: String,

        /// Value to set; lists are comma-separated
        value: String,
    },

    /// List all configuration values
    List,

    /// Print the configuration file path
    Path,
}

#[derive(Subcommand)]
enum AuthCommand {
    /// Sign in with Google and save the upload token
    Login,

    /// Revoke and remove the saved token
    Logout,

    /// Show authentication status
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let debug = cli.debug;

    if let Err(error) = run(cli).await {
        let error = CliError::from(error);
        eprint!("{}", error.format_for_user(debug));
        std::process::exit(error.exit_code().code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let manager = match cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    };

    let loaded = manager.load();
    let log_level = loaded.as_ref().map(|c| c.log_level).unwrap_or_default();
    init_logging(cli.debug, log_level);

    let config = loaded.map_err(|e| CliError::configuration(&format!("{e:#}")));

    match cli.command {
        Commands::Watch {
            directory,
            no_progress,
        } => watch_command(manager, config?, directory, no_progress).await?,
        Commands::Inspect { file, json } => inspect_command(&config?, &file, json)?,
        Commands::Track { file, directory } => {
            track_command(&config?, &file, directory.as_deref(), true).await?
        }
        Commands::Untrack { file, directory } => {
            track_command(&config?, &file, directory.as_deref(), false).await?
        }
        Commands::Tracked { directory } => tracked_command(&config?, directory.as_deref()).await?,
        Commands::Scopes => scopes_command(&config?).await?,
        Commands::Config { command } => config_command(manager, command)?,
        Commands::Auth { command } => {
            let config = config?;
            match command {
                AuthCommand::Login => auth::login(&config).await?,
                AuthCommand::Logout => auth::logout(&config).await?,
                AuthCommand::Status => auth::status(&config).await?,
            }
        }
        Commands::Completions { shell } => generate_completions(shell),
    }

    Ok(())
}

/// `--debug` beats `RUST_LOG`, which beats the configured level
fn init_logging(debug: bool, level: LogLevel) {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(level.to_level_filter().as_str()),
    );

    if debug {
        builder
            .filter_level(log::LevelFilter::Debug)
            .filter_module("raidvod_core", log::LevelFilter::Debug)
            .filter_module("raidvod_cli", log::LevelFilter::Debug);
    }

    builder.format_timestamp_millis().init();

    if debug {
        eprintln!("Debug logging enabled");
    }
}

async fn watch_command(
    manager: ConfigManager,
    config: AppConfig,
    directory: Option<PathBuf>,
    no_progress: bool,
) -> Result<()> {
    config
        .validate()
        .map_err(|e| CliError::configuration(&format!("{e:#}")))?;
    let directory = config
        .watch_directory(directory.as_deref())
        .map_err(|e| CliError::configuration(&format!("{e:#}")))?;

    let client = auth::oauth_client(&config).await?;
    if client.stored_token().await?.is_none() {
        return Err(raidvod_core::Error::from(UploadError::auth(
            "no saved token for YouTube uploads",
        ))
        .into());
    }
    let gateway = Arc::new(YouTubeUploader::new(Arc::new(client)));

    let store = Arc::new(
        SqliteTrackingStore::open(&config.database_path())
            .await
            .context("Failed to open tracking database")?,
    );

    // Bars for a person at a terminal, log lines otherwise
    let show_progress = !no_progress && terminal::should_show_progress_by_default();
    let (provider, progress_handle): (Arc<dyn ProgressProvider>, _) = if show_progress {
        let (provider, rx) = create_progress_infrastructure();
        (provider, Some(tokio::spawn(render_progress(rx))))
    } else {
        (Arc::new(LogProvider::new()) as Arc<dyn ProgressProvider>, None)
    };

    let cancel = CancellationToken::new();
    let mut orchestrator =
        UploadOrchestrator::new(config, store.clone(), gateway, cancel.clone())
            .with_config_manager(manager)
            .with_progress(provider.clone());

    spawn_interrupt_listener(cancel);
    #[cfg(unix)]
    spawn_reload_listener(orchestrator.reload_handle());

    eprintln!(
        "{} {} (Ctrl-C to stop)",
        "Watching".bold().cyan(),
        directory.display()
    );
    let result = orchestrator.run(&directory).await;

    provider.complete();
    if let Some(handle) = progress_handle {
        let _ = tokio::time::timeout(Duration::from_millis(500), handle).await;
    }
    store.close().await;

    display_summary(&result?);
    Ok(())
}

fn spawn_interrupt_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Interrupted, shutting down");
            cancel.cancel();
        }
    });
}

#[cfg(unix)]
fn spawn_reload_listener(reload_requested: Arc<std::sync::atomic::AtomicBool>) {
    use std::sync::atomic::Ordering;
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::hangup()) {
        Ok(mut hangups) => {
            tokio::spawn(async move {
                while hangups.recv().await.is_some() {
                    log::info!("SIGHUP received, reloading configuration before the next file");
                    reload_requested.store(true, Ordering::SeqCst);
                }
            });
        }
        Err(e) => log::warn!("Configuration reload on SIGHUP unavailable: {e}"),
    }
}

fn display_summary(summary: &WatchSummary) {
    eprintln!("\n{}", "Summary:".bold().green());

    for video in &summary.uploaded {
        let url = format!("https://youtu.be/{}", video.video_id);
        println!(
            "  {} {} {}",
            "✓".green(),
            video.title,
            terminal::hyperlink_with_fallback(&url, &video.video_id)
        );
    }

    eprintln!("Uploaded: {}", summary.uploaded.len());
    eprintln!("Skipped (ineligible): {}", summary.ineligible);
    eprintln!("Directory passes: {}", summary.passes);
    eprintln!(
        "Running time: {}",
        progress::format_duration(summary.elapsed.as_secs())
    );
    if summary.interrupted {
        eprintln!(
            "{}",
            "An upload was interrupted; the file will be uploaded on the next run".yellow()
        );
    }
}

fn inspect_command(config: &AppConfig, file: &Path, json: bool) -> Result<()> {
    let size = std::fs::metadata(file)
        .map_err(|e| CliError::from_io_error(e, &file.display().to_string()))?
        .len();

    let verdict = EligibilityFilter::new(config.eligibility()).evaluate(file);
    let metadata = MetadataExtractor::new(config.video_template()).extract_path(file);

    if json {
        let (eligible, reason) = match &verdict {
            Eligibility::Eligible { .. } => (true, None),
            Eligibility::Ineligible(reason) => (false, Some(reason.to_string())),
        };
        let (metadata, error) = match &metadata {
            Ok(metadata) => (Some(metadata), None),
            Err(e) => (None, Some(e.to_string())),
        };
        let output = serde_json::json!({
            "file": file.display().to_string(),
            "size": size,
            "eligible": eligible,
            "reason": reason,
            "metadata": metadata,
            "error": error,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("File: {}", file.display());
    println!("Size: {} ({size})", progress::format_bytes(size));
    match &verdict {
        Eligibility::Eligible { .. } => println!("Eligible: {}", "yes".green()),
        Eligibility::Ineligible(reason) => {
            println!("Eligible: {} ({reason})", "no".yellow())
        }
    }

    match metadata {
        Ok(metadata) => {
            println!();
            println!("{}: {}", "Title".cyan(), metadata.title);
            println!(
                "{}: {}",
                "Killed on".cyan(),
                metadata.killed_on.as_deref().unwrap_or("unknown")
            );
            println!(
                "{}: {}",
                "Killed at".cyan(),
                metadata.killed_at.as_deref().unwrap_or("unknown")
            );
            println!("{}: {}", "Difficulty".cyan(), metadata.difficulty);
            println!("{}: {}", "Tags".cyan(), metadata.tags.join(", "));
            println!("{}:", "Description".cyan());
            for line in metadata.description.lines() {
                println!("  {line}");
            }
        }
        Err(e) => println!("{}: {e}", "Metadata".cyan()),
    }

    Ok(())
}

async fn open_store(config: &AppConfig) -> Result<SqliteTrackingStore> {
    SqliteTrackingStore::open(&config.database_path())
        .await
        .context("Failed to open tracking database")
}

fn scope_directory(config: &AppConfig, directory: Option<&Path>) -> Result<WatchedDirectory> {
    let directory = config
        .watch_directory(directory)
        .map_err(|e| CliError::configuration(&format!("{e:#}")))?;
    Ok(WatchedDirectory::new(directory)?)
}

async fn track_command(
    config: &AppConfig,
    file: &Path,
    directory: Option<&Path>,
    track: bool,
) -> Result<()> {
    let file = file
        .canonicalize()
        .map_err(|e| CliError::from_io_error(e, &file.display().to_string()))?;
    let watched = scope_directory(config, directory)?;
    if !file.starts_with(watched.path()) {
        eprintln!(
            "{}",
            format!("Note: {} is not inside {watched}", file.display()).yellow()
        );
    }

    let store = open_store(config).await?;
    let scope = store.ensure_scope(&watched).await?;
    if track {
        store.track(&scope, &file).await?;
        eprintln!("{} Tracked {}", "✓".green(), file.display());
    } else {
        store.untrack(&scope, &file).await?;
        eprintln!("{} Untracked {}", "✓".green(), file.display());
    }
    store.close().await;

    Ok(())
}

async fn tracked_command(config: &AppConfig, directory: Option<&Path>) -> Result<()> {
    let watched = scope_directory(config, directory)?;
    let store = open_store(config).await?;
    let scope = store.ensure_scope(&watched).await?;
    let records = store.tracked_files(&scope).await?;
    store.close().await;

    if records.is_empty() {
        eprintln!("No tracked files for {watched}");
        return Ok(());
    }

    eprintln!("{} {} ({})", "Tracked files in".bold(), watched, scope.key());
    for record in records {
        println!(
            "{}  {}",
            record.tracked_at.format("%Y-%m-%d %H:%M:%S"),
            record.file_path
        );
    }
    Ok(())
}

async fn scopes_command(config: &AppConfig) -> Result<()> {
    let store = open_store(config).await?;
    let scopes = store.scopes().await?;
    store.close().await;

    if scopes.is_empty() {
        eprintln!("No directories have been watched yet.");
        return Ok(());
    }

    for scope in scopes {
        println!(
            "{}  {}  {}",
            scope.scope_key.cyan(),
            scope.created_at.format("%Y-%m-%d"),
            scope.directory.display()
        );
    }
    Ok(())
}

fn config_command(mut manager: ConfigManager, command: ConfigCommand) -> Result<()> {
    let configuration_error = |e: anyhow::Error| CliError::configuration(&format!("{e:#}"));

    match command {
        ConfigCommand::Init { force } => {
            config::interactive_init(&mut manager, force)?;
        }
        ConfigCommand::Get { key } => {
            let value = manager.get(&key).map_err(configuration_error)?;
            println!("{value}");
        }
        ConfigCommand::Set { key, value } => {
            manager.set(&key, &value).map_err(configuration_error)?;
            eprintln!("{}", format!("Set {key} = {value}").green());
            eprintln!(
                "Configuration saved to: {}",
                manager.get_config_path().display()
            );
        }
        ConfigCommand::List => {
            let items = manager.list().map_err(configuration_error)?;
            eprintln!("{}", "Configuration:".bold().blue());
            eprintln!("Config file: {}", manager.get_config_path().display());
            eprintln!();

            // Group items by section
            let mut sections: BTreeMap<String, Vec<(String, String)>> = BTreeMap::new();
            for (key, value) in items {
                let (section, name) = key
                    .split_once('.')
                    .map(|(s, n)| (s.to_string(), n.to_string()))
                    .unwrap_or_else(|| ("general".to_string(), key.clone()));
                sections.entry(section).or_default().push((name, value));
            }

            for (section, mut items) in sections {
                println!("[{}]", section.yellow());
                items.sort_by(|a, b| a.0.cmp(&b.0));
                for (key, value) in items {
                    println!("  {} = {}", key.cyan(), value);
                }
                println!();
            }
        }
        ConfigCommand::Path => {
            println!("{}", manager.get_config_path().display());
        }
    }

    Ok(())
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
