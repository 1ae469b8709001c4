//! Mediadex-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across mediadex:
//!
//! - **Typed IDs**: Type-safe UUID wrappers for shows and watched folders
//! - **Core Types**: Enums for folder content hints and catalog media kinds
//! - **Path Utilities**: Video extension allow-list and ignored-path rules
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use mediadex_common::{ShowId, ContentHint, Error, Result};
//! use mediadex_common::paths::is_video_file;
//! use std::path::Path;
//!
//! let show_id = ShowId::new();
//! let hint = ContentHint::Mixed;
//!
//! assert!(is_video_file(Path::new("movie.mkv")));
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("show"))
//! }
//! ```

pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
