//! edmig core: editable naming migration protocol
//!
//! Moves the stored names of document editables from one naming strategy to
//! another in three phases:
//!
//! - **Collect**: render every document under an observer that records the
//!   old-name to new-name pairs actually exercised
//! - **Validate**: read-only preflight against the element store (old record
//!   present, new name free)
//! - **Apply**: every rename in one transaction, or none of them
//!
//! Storage, rendering and user lookup are reached through the traits in
//! [`ports`]; `edmig-store` implements them over SQLite.

pub mod cancel;
pub mod collector;
pub mod errors;
pub mod executor;
pub mod logging_facility;
pub mod model;
pub mod naming;
pub mod orchestrator;
pub mod ports;
pub mod preflight;
pub mod render;

pub use edmig_core_types as core_types;

// Re-export commonly used types
pub use cancel::CancellationToken;
pub use collector::MappingCollector;
pub use errors::{ExError, ExErrorKind, MigrationError, Result};
pub use executor::{ApplyReport, RenameExecutor};
pub use model::{DocumentHandle, DocumentId, DocumentKind, EditableName, NameMapping, Rename};
pub use naming::{NamingStrategy, StrategyDescriptor};
pub use orchestrator::{
    Collaborators, Confirm, MigrationOrchestrator, MigrationOutcome, MigrationPhase,
    MigrationReport, MigrationRequest, MigrationSettings,
};
pub use preflight::{MissingOldPolicy, PreflightReport, PreflightValidator};
pub use render::{RenderContext, RenderDriver, RenderOutcome};
