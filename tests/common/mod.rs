//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which wires an in-memory DB, an [`EventBus`],
//! a scripted [`StubCatalog`], and a [`ScanCoordinator`] over a temporary
//! media folder.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use mediadex::events::EventBus;
use mediadex::metadata::{
    CatalogClient, CatalogError, EpisodeDetails, MetadataResolver, MovieMatch, RateLimiter,
    ShowMatch,
};
use mediadex::scanner::{MergeEngine, ScanCoordinator, ScanOptions};
use mediadex_common::{ContentHint, MediaKind};
use mediadex_db::pool::{get_conn, init_memory_pool, DbPool, PooledConnection};
use mediadex_db::queries::folders;

/// Catalog client answering from in-memory tables keyed by search title.
pub struct StubCatalog {
    movies: Mutex<HashMap<String, MovieMatch>>,
    shows: Mutex<HashMap<String, ShowMatch>>,
    failing: Mutex<bool>,
    searches: Mutex<Vec<String>>,
    calls: AtomicUsize,
    gate: Semaphore,
}

impl StubCatalog {
    pub fn new() -> Self {
        Self::with_gate(Semaphore::MAX_PERMITS)
    }

    /// A catalog whose searches block until [`StubCatalog::open_gate`].
    pub fn gated() -> Self {
        Self::with_gate(0)
    }

    fn with_gate(permits: usize) -> Self {
        Self {
            movies: Mutex::new(HashMap::new()),
            shows: Mutex::new(HashMap::new()),
            failing: Mutex::new(false),
            searches: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            gate: Semaphore::new(permits),
        }
    }

    pub fn open_gate(&self) {
        self.gate.add_permits(1_000);
    }

    pub fn add_movie(&self, search: &str, external_id: &str, title: &str, year: i32) {
        self.movies.lock().insert(
            search.to_string(),
            MovieMatch {
                external_id: external_id.to_string(),
                title: title.to_string(),
                year: Some(year),
                overview: Some(format!("{title} overview")),
                poster_ref: Some(format!("https://img.test/{external_id}.jpg")),
                backdrop_ref: None,
                rating: Some(7.5),
                genre_ids: vec![18],
            },
        );
    }

    pub fn add_show(&self, search: &str, external_id: &str, title: &str) {
        self.shows.lock().insert(
            search.to_string(),
            ShowMatch {
                external_id: external_id.to_string(),
                title: title.to_string(),
                first_air_date: Some("2004-09-22".to_string()),
                overview: Some(format!("{title} overview")),
                poster_ref: Some(format!("https://img.test/{external_id}.jpg")),
                backdrop_ref: None,
                rating: Some(8.0),
                genre_ids: vec![18, 9648],
            },
        );
    }

    /// Make every call fail with a server error.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    /// Titles passed to `search_movie` and `search_tv`, in call order.
    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().clone()
    }

    /// Total outbound calls of any kind.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> Result<(), CatalogError> {
        let _permit = self.gate.acquire().await.expect("gate closed");
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.failing.lock() {
            return Err(CatalogError::Status(500));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogClient for StubCatalog {
    async fn search_movie(
        &self,
        title: &str,
        _year: Option<i32>,
    ) -> Result<Vec<MovieMatch>, CatalogError> {
        self.searches.lock().push(title.to_string());
        self.enter().await?;
        Ok(self.movies.lock().get(title).cloned().into_iter().collect())
    }

    async fn search_tv(&self, title: &str) -> Result<Vec<ShowMatch>, CatalogError> {
        self.searches.lock().push(title.to_string());
        self.enter().await?;
        Ok(self.shows.lock().get(title).cloned().into_iter().collect())
    }

    async fn episode_details(
        &self,
        _show_external_id: &str,
        season: u32,
        episode: u32,
    ) -> Result<Option<EpisodeDetails>, CatalogError> {
        self.enter().await?;
        Ok(Some(EpisodeDetails {
            title: Some(format!("Episode {season}x{episode}")),
            overview: None,
            still_ref: None,
        }))
    }

    async fn genres(&self, _kind: MediaKind) -> Result<HashMap<u32, String>, CatalogError> {
        self.enter().await?;
        Ok(HashMap::from([
            (18, "Drama".to_string()),
            (9648, "Mystery".to_string()),
        ]))
    }
}

/// Coordinator, engine, and catalog over an in-memory DB and a temp folder.
pub struct TestHarness {
    pub pool: DbPool,
    pub events: Arc<EventBus>,
    pub catalog: Arc<StubCatalog>,
    pub coordinator: Arc<ScanCoordinator>,
    pub root: PathBuf,
    _dir: TempDir,
}

impl TestHarness {
    /// A harness whose media folder is already registered.
    pub fn new() -> Self {
        Self::with_catalog(StubCatalog::new())
    }

    pub fn with_catalog(catalog: StubCatalog) -> Self {
        let harness = Self::unregistered(catalog);
        harness.register(&harness.root.clone());
        harness
    }

    /// A harness with an empty folder registry.
    pub fn unregistered(catalog: StubCatalog) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = dir.path().join("media");
        fs::create_dir_all(&root).expect("failed to create media root");

        let pool = init_memory_pool().expect("failed to create in-memory pool");
        let events = Arc::new(EventBus::default());
        let catalog = Arc::new(catalog);

        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(1)));
        let resolver = Arc::new(MetadataResolver::new(
            catalog.clone(),
            limiter,
            Duration::from_millis(1),
        ));
        let engine = MergeEngine::new(pool.clone(), resolver, events.clone());
        let coordinator = Arc::new(ScanCoordinator::new(
            pool.clone(),
            engine,
            events.clone(),
            ScanOptions::default(),
        ));

        Self {
            pool,
            events,
            catalog,
            coordinator,
            root,
            _dir: dir,
        }
    }

    pub fn conn(&self) -> PooledConnection {
        get_conn(&self.pool).expect("failed to get connection")
    }

    pub fn register(&self, path: &Path) {
        folders::add_folder(&self.conn(), &path.to_string_lossy(), ContentHint::Mixed)
            .expect("failed to register folder");
    }

    /// Create a small file under the media root and return its path.
    pub fn write_file(&self, relative: &str) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        fs::write(&path, b"not really a video").expect("failed to write file");
        path
    }
}
