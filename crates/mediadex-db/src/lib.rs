//! Mediadex-DB: Database schema, migrations, and query operations
//!
//! This crate provides the catalog store for mediadex using SQLite
//! with rusqlite and r2d2 connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching database schema
//! - `queries` - Database query operations
//!
//! # Example
//!
//! ```no_run
//! use mediadex_db::pool::{init_pool, get_conn};
//! use mediadex_db::queries::catalog;
//!
//! let pool = init_pool("/var/lib/mediadex/catalog.db").unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let known = catalog::path_exists(&conn, "/media/Movies/Heat.1995.mkv").unwrap();
//! println!("already indexed: {known}");
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
