//! Scan coordination.
//!
//! [`ScanCoordinator`] owns the pending-file set and the "scan in progress"
//! flag. Paths arrive from the watcher or from explicit scan requests; one
//! pass at a time drains them through classification, metadata resolution,
//! and the [`MergeEngine`].

pub mod classifier;
pub mod merge;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mediadex_common::paths::{has_extension, is_ignored_path, normalize};
use mediadex_db::{
    models::WatchedFolder,
    pool::{get_conn, DbPool},
    queries::{catalog, folders},
};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::events::{CatalogEvent, EventBus};

pub use classifier::{classify, Classification};
pub use merge::{IngestOutcome, MergeEngine, RefreshReport};

/// Outcome of a scan request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanReport {
    pub added_count: usize,
    pub errors: Option<Vec<String>>,
    /// Another pass was running; the paths were queued for it.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deferred: bool,
}

impl ScanReport {
    fn deferred() -> Self {
        Self {
            deferred: true,
            ..Self::default()
        }
    }

    fn error(&mut self, message: String) {
        self.errors.get_or_insert_with(Vec::new).push(message);
    }

    fn absorb_errors(&mut self, errors: Vec<String>) {
        for message in errors {
            self.error(message);
        }
    }
}

/// Scan settings taken from the `[watch]` config section.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub max_depth: usize,
    /// Empty means the built-in video extension list.
    pub extensions: Vec<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_depth: 16,
            extensions: Vec::new(),
        }
    }
}

#[derive(Default)]
struct ScanState {
    pending: BTreeSet<PathBuf>,
    scanning: bool,
}

/// Serializes scan passes and drains the pending-file set.
pub struct ScanCoordinator {
    pool: DbPool,
    engine: MergeEngine,
    events: Arc<EventBus>,
    options: ScanOptions,
    state: Mutex<ScanState>,
}

impl ScanCoordinator {
    pub fn new(pool: DbPool, engine: MergeEngine, events: Arc<EventBus>, options: ScanOptions) -> Self {
        Self {
            pool,
            engine,
            events,
            options,
            state: Mutex::new(ScanState::default()),
        }
    }

    pub fn engine(&self) -> &MergeEngine {
        &self.engine
    }

    /// Queue a path for the next pass.
    pub fn enqueue(&self, path: PathBuf) {
        self.state.lock().pending.insert(normalize(&path));
    }

    /// Drop every queued path.
    pub fn clear_pending(&self) {
        self.state.lock().pending.clear();
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn is_scanning(&self) -> bool {
        self.state.lock().scanning
    }

    /// Run a pass over whatever is queued.
    pub async fn run_pending(&self) -> ScanReport {
        self.scan_paths(Vec::new()).await
    }

    /// Run a pass over `paths` plus anything already queued.
    ///
    /// If a pass is already running the paths are queued for it and a
    /// deferred report is returned.
    pub async fn scan_paths(&self, paths: Vec<PathBuf>) -> ScanReport {
        let paths = paths.into_iter().map(|p| normalize(&p));
        let mut batch = {
            let mut state = self.state.lock();
            if state.scanning {
                state.pending.extend(paths);
                debug!(queued = state.pending.len(), "Scan in progress, deferring");
                return ScanReport::deferred();
            }
            state.scanning = true;
            let mut batch = std::mem::take(&mut state.pending);
            batch.extend(paths);
            batch
        };

        let mut report = ScanReport::default();
        loop {
            debug!(files = batch.len(), "Starting scan pass");
            for path in &batch {
                self.scan_one(path, &mut report).await;
            }

            let next = {
                let mut state = self.state.lock();
                if state.pending.is_empty() {
                    state.scanning = false;
                    None
                } else {
                    Some(std::mem::take(&mut state.pending))
                }
            };
            match next {
                Some(more) => batch = more,
                None => break,
            }
        }

        if report.added_count > 0 {
            self.events.emit(CatalogEvent::ScanComplete {
                added_count: report.added_count,
            });
        }
        info!(
            added = report.added_count,
            errors = report.errors.as_ref().map_or(0, Vec::len),
            "Scan finished"
        );
        report
    }

    /// Force-scan a folder, or a single file inside it.
    pub async fn scan_folder(&self, folder: &Path, file: Option<&Path>) -> ScanReport {
        let folder = normalize(folder);
        if !folder.is_dir() {
            let mut report = ScanReport::default();
            report.error(format!("folder does not exist: {}", folder.display()));
            return report;
        }

        let (paths, walk_errors) = match file {
            Some(file) => {
                let file = normalize(&folder.join(file));
                if file.starts_with(&folder) {
                    (vec![file], Vec::new())
                } else {
                    (
                        Vec::new(),
                        vec![format!(
                            "{} is not inside {}",
                            file.display(),
                            folder.display()
                        )],
                    )
                }
            }
            None => self.walk_blocking(vec![folder]).await,
        };

        let mut report = self.scan_paths(paths).await;
        report.absorb_errors(walk_errors);
        report
    }

    /// Walk every registered folder and scan what is found.
    pub async fn rescan_all(&self) -> ScanReport {
        let registered = match get_conn(&self.pool).and_then(|conn| folders::list_folders(&conn)) {
            Ok(list) => list,
            Err(e) => {
                let mut report = ScanReport::default();
                report.error(format!("failed to list watched folders: {e}"));
                return report;
            }
        };

        if registered.is_empty() {
            let mut report = ScanReport::default();
            report.error("no watched folders registered".to_string());
            return report;
        }

        let roots = registered.into_iter().map(|f| PathBuf::from(f.path)).collect();
        let (paths, walk_errors) = self.walk_blocking(roots).await;

        let mut report = self.scan_paths(paths).await;
        report.absorb_errors(walk_errors);
        report
    }

    async fn walk_blocking(&self, roots: Vec<PathBuf>) -> (Vec<PathBuf>, Vec<String>) {
        let options = self.options.clone();
        match tokio::task::spawn_blocking(move || walk_roots(&roots, &options)).await {
            Ok(found) => found,
            Err(e) => (Vec::new(), vec![format!("directory walk failed: {e}")]),
        }
    }

    async fn scan_one(&self, path: &Path, report: &mut ScanReport) {
        let file_path = path.to_string_lossy();

        let precheck = get_conn(&self.pool).and_then(|conn| {
            let folders = folders::list_folders(&conn)?;
            let owner = owning_folder(&folders, path).cloned();
            let indexed = catalog::path_exists(&conn, &file_path)?;
            Ok((owner, indexed))
        });

        let owner = match precheck {
            Ok((_, true)) => {
                debug!(path = %file_path, "Skipping indexed file");
                return;
            }
            Ok((Some(owner), false)) => owner,
            Ok((None, false)) => {
                warn!(path = %file_path, "File is not inside a watched folder");
                report.error(format!("{file_path}: not inside a watched folder"));
                return;
            }
            Err(e) => {
                report.error(format!("{file_path}: {e}"));
                return;
            }
        };

        if !path.is_file() {
            warn!(path = %file_path, "File no longer exists");
            report.error(format!("{file_path}: file no longer exists"));
            return;
        }

        let Some(file_name) = path.file_name().map(|n| n.to_string_lossy()) else {
            report.error(format!("{file_path}: no file name"));
            return;
        };

        let classification = classify(&file_name);
        debug!(path = %file_path, folder = %owner.path, ?classification, "Classified file");

        match self.engine.ingest(path, &classification).await {
            Ok(IngestOutcome::Added) => report.added_count += 1,
            Ok(IngestOutcome::AlreadyIndexed) => {}
            Err(e) => {
                warn!(path = %file_path, error = %e, "Failed to ingest file");
                report.error(format!("{file_path}: {e}"));
            }
        }
    }
}

/// The registered folder with the longest path that contains `path`.
pub fn owning_folder<'a>(folders: &'a [WatchedFolder], path: &Path) -> Option<&'a WatchedFolder> {
    folders
        .iter()
        .filter(|f| path.starts_with(&f.path))
        .max_by_key(|f| Path::new(&f.path).components().count())
}

/// Depth-bounded walk collecting candidate video files and per-entry errors.
pub fn walk_roots(roots: &[PathBuf], options: &ScanOptions) -> (Vec<PathBuf>, Vec<String>) {
    let mut found = Vec::new();
    let mut errors = Vec::new();

    for root in roots {
        let root = &normalize(root);
        if !root.is_dir() {
            warn!("Watched folder does not exist: {:?}", root);
            errors.push(format!("folder does not exist: {}", root.display()));
            continue;
        }

        let walker = WalkDir::new(root)
            .max_depth(options.max_depth)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_ignored_path(root, entry.path()));

        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file()
                        && has_extension(entry.path(), &options.extensions)
                    {
                        found.push(entry.into_path());
                    }
                }
                Err(e) => {
                    let at = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| root.display().to_string());
                    warn!(path = %at, error = %e, "Walk error");
                    errors.push(format!("{at}: {e}"));
                }
            }
        }
    }

    (found, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mediadex_common::{ContentHint, FolderId};
    use std::fs;

    fn folder(path: &str) -> WatchedFolder {
        WatchedFolder {
            id: FolderId::new(),
            path: path.to_string(),
            content: ContentHint::Mixed,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn owning_folder_prefers_longest_prefix() {
        let folders = vec![folder("/media"), folder("/media/tv"), folder("/other")];

        let owner = owning_folder(&folders, Path::new("/media/tv/Lost/S01E01.mkv")).unwrap();
        assert_eq!(owner.path, "/media/tv");

        let owner = owning_folder(&folders, Path::new("/media/movies/Heat.mkv")).unwrap();
        assert_eq!(owner.path, "/media");

        assert!(owning_folder(&folders, Path::new("/mediax/a.mkv")).is_none());
    }

    #[test]
    fn walk_filters_hidden_reserved_and_non_video() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        fs::create_dir_all(root.join("Movies")).unwrap();
        fs::create_dir_all(root.join(".hidden")).unwrap();
        fs::create_dir_all(root.join("@eaDir")).unwrap();
        fs::write(root.join("Movies/Heat.1995.mkv"), b"x").unwrap();
        fs::write(root.join("Movies/Heat.1995.srt"), b"x").unwrap();
        fs::write(root.join(".hidden/secret.mkv"), b"x").unwrap();
        fs::write(root.join("@eaDir/thumb.mkv"), b"x").unwrap();
        fs::write(root.join(".partial.mkv"), b"x").unwrap();

        let (found, errors) = walk_roots(&[root.clone()], &ScanOptions::default());
        assert!(errors.is_empty());
        assert_eq!(found, vec![root.join("Movies/Heat.1995.mkv")]);
    }

    #[test]
    fn walk_respects_max_depth() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        fs::write(root.join("a/shallow.mkv"), b"x").unwrap();
        fs::write(root.join("a/b/c/deep.mkv"), b"x").unwrap();

        let options = ScanOptions {
            max_depth: 2,
            ..ScanOptions::default()
        };
        let (found, _) = walk_roots(&[root.clone()], &options);
        assert_eq!(found, vec![root.join("a/shallow.mkv")]);
    }

    #[test]
    fn walk_reports_missing_root() {
        let (found, errors) = walk_roots(
            &[PathBuf::from("/definitely/not/here")],
            &ScanOptions::default(),
        );
        assert!(found.is_empty());
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn custom_extensions_replace_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        fs::write(root.join("a.mkv"), b"x").unwrap();
        fs::write(root.join("b.iso"), b"x").unwrap();

        let options = ScanOptions {
            extensions: vec!["iso".into()],
            ..ScanOptions::default()
        };
        let (found, _) = walk_roots(&[root.clone()], &options);
        assert_eq!(found, vec![root.join("b.iso")]);
    }
}
