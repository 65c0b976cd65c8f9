//! edmig store: SQLite persistence for editable migrations
//!
//! Provides:
//! - SQLite schema with a migrations framework
//! - `SqliteRepo`, implementing the core document, element, user and
//!   template ports over one connection

pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;

// Re-export key types
pub use errors::Result;
pub use repo::SqliteRepo;
