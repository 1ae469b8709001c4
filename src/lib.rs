//! Mediadex - media catalog ingestion
//!
//! This library crate exposes the ingestion core: the filesystem watcher,
//! the scan coordinator, the filename classifier, the metadata resolver, and
//! the merge engine that writes into the `mediadex-db` catalog.

pub mod config;
pub mod events;
pub mod metadata;
pub mod scanner;
pub mod watch;
