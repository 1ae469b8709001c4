mod cli;

use mediadex::{
    config::{self, Config},
    events::EventBus,
    metadata::{
        title::{clean_title, extract_year},
        CatalogClient, CatalogError, MetadataResolver, OfflineClient, RateLimiter, TmdbClient,
    },
    scanner::{classify, MergeEngine, ScanCoordinator, ScanOptions},
    watch::FileWatcher,
};
use mediadex_common::paths::normalize;
use mediadex_db::{
    pool::{get_conn, init_pool, DbPool},
    queries::{catalog, folders},
};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, FolderAction};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

/// Everything the ingestion commands need, wired once per process.
struct Services {
    pool: DbPool,
    events: Arc<EventBus>,
    coordinator: Arc<ScanCoordinator>,
}

fn open_pool(config: &Config) -> Result<DbPool> {
    let db_path = config.database.path.to_string_lossy();
    tracing::debug!("Opening database at {}", db_path);
    init_pool(&db_path).with_context(|| format!("Failed to open database {}", db_path))
}

fn build_services(config: &Config) -> Result<Services> {
    let pool = open_pool(config)?;

    seed_folders(&pool, config)?;

    let client: Arc<dyn CatalogClient> = match TmdbClient::new(&config.catalog) {
        Ok(client) => Arc::new(client),
        Err(CatalogError::NotConfigured) => {
            tracing::warn!(
                "No TMDB API key configured (set {}), items get fallback metadata",
                config::API_KEY_ENV
            );
            Arc::new(OfflineClient)
        }
        Err(e) => return Err(e).context("Failed to build TMDB client"),
    };

    let limiter = Arc::new(RateLimiter::new(config.catalog.min_interval()));
    let resolver = Arc::new(MetadataResolver::new(
        client,
        limiter,
        config.catalog.rate_limit_backoff(),
    ));
    let events = Arc::new(EventBus::default());
    let engine = MergeEngine::new(pool.clone(), resolver, events.clone());
    let coordinator = Arc::new(ScanCoordinator::new(
        pool.clone(),
        engine,
        events.clone(),
        ScanOptions {
            max_depth: config.watch.max_depth,
            extensions: config.watch.extensions.clone(),
        },
    ));

    Ok(Services {
        pool,
        events,
        coordinator,
    })
}

fn seed_folders(pool: &DbPool, config: &Config) -> Result<()> {
    if config.folders.is_empty() {
        return Ok(());
    }
    let conn = get_conn(pool)?;
    for folder in &config.folders {
        let path = normalize(&folder.path);
        let path = path.to_string_lossy();
        folders::ensure_folder(&conn, &path, folder.content)
            .with_context(|| format!("Failed to register folder {}", path))?;
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    let path = std::path::absolute(path).with_context(|| format!("Invalid path: {:?}", path))?;
    Ok(normalize(&path))
}

async fn watch(config: Config) -> Result<()> {
    let services = build_services(&config)?;

    let roots: Vec<PathBuf> = {
        let conn = get_conn(&services.pool)?;
        folders::list_folders(&conn)?
            .into_iter()
            .map(|f| PathBuf::from(f.path))
            .collect()
    };
    if roots.is_empty() {
        tracing::warn!("No watched folders registered; use `mediadex folders add <path>`");
    }

    let mut events = services.events.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Ok(line) = serde_json::to_string(&event) {
                        println!("{}", line);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event printer lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut watcher = FileWatcher::new(
        config.watch.clone(),
        services.coordinator.clone(),
        services.events.clone(),
    );
    // Catch up on anything added while we were not running.
    let report = watcher.start_with_catch_up(&roots).await?;
    tracing::info!(added = report.added_count, "Initial scan finished");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    tracing::info!("Shutting down...");
    watcher.stop();
    Ok(())
}

async fn scan(config: Config, folder: PathBuf, file: Option<PathBuf>) -> Result<()> {
    let services = build_services(&config)?;
    let folder = absolute(&folder)?;

    {
        let conn = get_conn(&services.pool)?;
        if folders::get_folder_by_path(&conn, &folder.to_string_lossy())?.is_none() {
            anyhow::bail!(
                "Folder is not registered: {:?} (use `mediadex folders add`)",
                folder
            );
        }
    }

    let report = services
        .coordinator
        .scan_folder(&folder, file.as_deref())
        .await;
    print_json(&report)
}

async fn rescan(config: Config) -> Result<()> {
    let services = build_services(&config)?;
    let report = services.coordinator.rescan_all().await;
    print_json(&report)
}

async fn refresh(config: Config) -> Result<()> {
    let services = build_services(&config)?;
    let report = services
        .coordinator
        .engine()
        .refresh_missing_metadata()
        .await?;
    print_json(&report)
}

fn manage_folders(config: Config, action: FolderAction) -> Result<()> {
    let pool = open_pool(&config)?;
    let conn = get_conn(&pool)?;

    match action {
        FolderAction::Add { path, content } => {
            let path = absolute(&path)?;
            if !path.is_dir() {
                tracing::warn!("Folder does not exist yet: {:?}", path);
            }
            let folder = folders::add_folder(&conn, &path.to_string_lossy(), content)?;
            print_json(&folder)
        }
        FolderAction::List => print_json(&folders::list_folders(&conn)?),
        FolderAction::Remove { path } => {
            let path = absolute(&path)?;
            if !folders::remove_folder(&conn, &path.to_string_lossy())? {
                anyhow::bail!("Folder is not registered: {:?}", path);
            }
            println!("Removed {}", path.display());
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct TitleInfo {
    title: String,
    year: Option<i32>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "mediadex=debug,mediadex_db=debug,mediadex_common=debug".to_string()
        } else {
            "mediadex=info,mediadex_db=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Classify { file_name } => print_json(&classify(&file_name)),
        Commands::CleanTitle { file_name } => print_json(&TitleInfo {
            title: clean_title(&file_name),
            year: extract_year(&file_name),
        }),
        Commands::Folders { action } => manage_folders(load(&cli.config)?, action),
        Commands::Stats => {
            let pool = open_pool(&load(&cli.config)?)?;
            let conn = get_conn(&pool)?;
            print_json(&catalog::stats(&conn)?)
        }
        Commands::Watch => runtime()?.block_on(watch(load(&cli.config)?)),
        Commands::Scan { folder, file } => {
            runtime()?.block_on(scan(load(&cli.config)?, folder, file))
        }
        Commands::Rescan => runtime()?.block_on(rescan(load(&cli.config)?)),
        Commands::Refresh => runtime()?.block_on(refresh(load(&cli.config)?)),
    }
}

fn load(path: &Option<PathBuf>) -> Result<Config> {
    config::load_config_or_default(path.as_deref())
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to start tokio runtime")
}
