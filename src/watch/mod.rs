//! Filesystem watching.
//!
//! Notify callbacks forward raw paths into a channel. A single task owns the
//! settle tracker and the debounce deadline: settled files go into the scan
//! coordinator's pending set, and one pass runs once the folder has been
//! quiet for the debounce window.

pub mod settle;

pub use settle::FileSettleTracker;

use crate::config::WatchConfig;
use crate::events::{CatalogEvent, EventBus};
use crate::scanner::{ScanCoordinator, ScanReport};
use anyhow::{Context, Result};
use mediadex_common::paths::{has_extension, is_ignored_path};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// File watcher that feeds new media files to the scan coordinator.
pub struct FileWatcher {
    config: WatchConfig,
    coordinator: Arc<ScanCoordinator>,
    events: Arc<EventBus>,
    session: Option<WatchSession>,
}

struct WatchSession {
    _watcher: RecommendedWatcher,
    cancel: CancellationToken,
    paths: Vec<PathBuf>,
}

impl FileWatcher {
    pub fn new(config: WatchConfig, coordinator: Arc<ScanCoordinator>, events: Arc<EventBus>) -> Self {
        Self {
            config,
            coordinator,
            events,
            session: None,
        }
    }

    /// Start watching `paths`, replacing any running session.
    ///
    /// Missing folders are logged and skipped. An empty list leaves the
    /// watcher idle.
    pub fn start(&mut self, paths: &[PathBuf]) -> Result<()> {
        self.stop();

        if !self.config.enabled {
            tracing::info!("File watcher is disabled");
            return Ok(());
        }

        let roots: Vec<PathBuf> = paths
            .iter()
            .filter(|path| {
                let exists = path.is_dir();
                if !exists {
                    tracing::warn!("Watch path does not exist: {:?}", path);
                }
                exists
            })
            .cloned()
            .collect();

        if roots.is_empty() {
            tracing::info!("No watch paths to observe");
            return Ok(());
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel::<PathBuf>();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if event.kind.is_create() || event.kind.is_modify() {
                    for path in event.paths {
                        let _ = event_tx.send(path);
                    }
                }
            }
            Err(e) => tracing::warn!("Watch error: {}", e),
        })
        .context("Failed to create file watcher")?;

        for root in &roots {
            watcher
                .watch(root, RecursiveMode::Recursive)
                .with_context(|| format!("Failed to watch path: {:?}", root))?;
            tracing::info!("Watching directory: {:?}", root);
        }

        let cancel = CancellationToken::new();
        let state = DebounceState::new(&self.config, roots.clone());
        tokio::spawn(run_loop(
            state,
            event_rx,
            self.config.poll_interval(),
            cancel.clone(),
            self.coordinator.clone(),
            self.events.clone(),
        ));

        self.session = Some(WatchSession {
            _watcher: watcher,
            cancel,
            paths: roots,
        });
        Ok(())
    }

    /// Start watching, then rescan every registered folder once.
    ///
    /// The watcher is live before the rescan walks, so a file that lands
    /// while the rescan runs is still reported and picked up.
    pub async fn start_with_catch_up(&mut self, paths: &[PathBuf]) -> Result<ScanReport> {
        self.start(paths)?;
        Ok(self.coordinator.rescan_all().await)
    }

    /// Stop watching and drop any queued paths. A pass already running
    /// finishes on its own.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            session.cancel.cancel();
            tracing::info!("File watcher stopped");
        }
        self.coordinator.clear_pending();
    }

    pub fn is_watching(&self) -> bool {
        self.session.is_some()
    }

    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.session
            .as_ref()
            .map(|s| s.paths.clone())
            .unwrap_or_default()
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        if let Some(session) = &self.session {
            session.cancel.cancel();
        }
    }
}

/// Filtering, settle tracking, and the debounce deadline for one session.
struct DebounceState {
    roots: Vec<PathBuf>,
    extensions: Vec<String>,
    tracker: FileSettleTracker,
    debounce: Duration,
    deadline: Option<Instant>,
}

impl DebounceState {
    fn new(config: &WatchConfig, roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            extensions: config.extensions.clone(),
            tracker: FileSettleTracker::new(config.stability_threshold()),
            debounce: config.debounce(),
            deadline: None,
        }
    }

    fn accepts(&self, path: &Path) -> bool {
        let Some(root) = self
            .roots
            .iter()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())
        else {
            return false;
        };
        !is_ignored_path(root, path) && has_extension(path, &self.extensions)
    }

    fn observe(&mut self, path: PathBuf, now: Instant) {
        if self.accepts(&path) {
            tracing::trace!("File event: {:?}", path);
            self.tracker.file_changed(path, now);
        }
    }

    /// Settled files; re-arms the debounce deadline when any settled.
    fn settle(&mut self, now: Instant) -> Vec<PathBuf> {
        let settled = self.tracker.poll(now);
        if !settled.is_empty() {
            self.deadline = Some(now + self.debounce);
        }
        settled
    }

    fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

async fn run_loop(
    mut state: DebounceState,
    mut event_rx: mpsc::UnboundedReceiver<PathBuf>,
    poll_interval: Duration,
    cancel: CancellationToken,
    coordinator: Arc<ScanCoordinator>,
    events: Arc<EventBus>,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        let deadline = state.deadline;
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,

            received = event_rx.recv() => match received {
                Some(path) => state.observe(path, Instant::now()),
                None => break,
            },

            _ = ticker.tick() => {
                for path in state.settle(Instant::now()) {
                    tracing::info!("File settled: {:?}", path);
                    coordinator.enqueue(path.clone());
                    events.emit(CatalogEvent::Discovered { path });
                }
            }

            _ = wait_until(deadline) => {
                if state.take_due(Instant::now()) {
                    let coordinator = coordinator.clone();
                    let events = events.clone();
                    tokio::spawn(async move {
                        let report = coordinator.run_pending().await;
                        if let Some(errors) = report.errors {
                            for message in errors {
                                events.emit(CatalogEvent::Error { message });
                            }
                        }
                    });
                }
            }
        }
    }

    tracing::debug!("Watch loop exited");
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
