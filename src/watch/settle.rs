use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Observation {
    size: Option<u64>,
    stable_since: Instant,
}

/// Tracks files and determines when they've "settled" (size stopped changing).
pub struct FileSettleTracker {
    pending: HashMap<PathBuf, Observation>,
    /// How long the size must stay unchanged
    threshold: Duration,
}

impl FileSettleTracker {
    pub fn new(threshold: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            threshold,
        }
    }

    /// Record that a file was created or modified.
    pub fn file_changed(&mut self, path: PathBuf, now: Instant) {
        let size = file_size(&path);
        self.pending.insert(
            path,
            Observation {
                size,
                stable_since: now,
            },
        );
    }

    /// Re-check sizes and return the files that have been stable long enough.
    ///
    /// Files that vanished are dropped without being reported.
    pub fn poll(&mut self, now: Instant) -> Vec<PathBuf> {
        let mut settled = Vec::new();

        self.pending.retain(|path, obs| {
            let Some(size) = file_size(path) else {
                tracing::debug!("File vanished before settling: {:?}", path);
                return false;
            };

            if obs.size != Some(size) {
                obs.size = Some(size);
                obs.stable_since = now;
                return true;
            }

            if now.saturating_duration_since(obs.stable_since) >= self.threshold {
                settled.push(path.clone());
                return false;
            }
            true
        });

        settled.sort();
        settled
    }
}

fn file_size(path: &Path) -> Option<u64> {
    std::fs::metadata(path)
        .ok()
        .filter(|m| m.is_file())
        .map(|m| m.len())
}
