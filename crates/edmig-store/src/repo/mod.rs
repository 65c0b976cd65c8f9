//! Repository layer: the core ports over SQLite

pub mod sqlite_repo;

pub use sqlite_repo::SqliteRepo;
