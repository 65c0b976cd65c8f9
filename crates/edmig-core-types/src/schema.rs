//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_RUN_ID: &str = "run_id";

// Entity identifiers
pub const FIELD_DOCUMENT_ID: &str = "document_id";
pub const FIELD_OLD_NAME: &str = "old_name";
pub const FIELD_NEW_NAME: &str = "new_name";

// Collection sizes
pub const FIELD_DOCUMENT_COUNT: &str = "document_count";
pub const FIELD_RENAME_COUNT: &str = "rename_count";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Canonical operation names
pub const OP_MIGRATE: &str = "migrate";
pub const OP_COLLECT: &str = "collect";
pub const OP_RENDER_DOCUMENT: &str = "render_document";
pub const OP_PREFLIGHT: &str = "preflight";
pub const OP_APPLY: &str = "apply";
