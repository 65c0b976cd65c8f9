//! Schema migration framework
//!
//! - Embedded SQL migrations applied in order
//! - `schema_version` ledger with SHA-256 checksums
//! - Idempotent: re-running applies only what is missing

mod checksums;
mod embedded;
mod runner;

pub use runner::{applied_migrations, apply_migrations};
