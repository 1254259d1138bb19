//! Persistence layer over SQLite.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows and conversions
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: the pooled storage handle
//! - one file per functional area with its repository methods

pub mod bia;
pub mod compliance;
pub mod models;
pub mod organizations;
pub mod policies;
pub mod risks;
pub mod runbooks;
pub mod schema;
pub mod sqlite;

pub use schema::SQLITE_INIT;
pub use sqlite::{GrcStorage, SqlitePool};
