use crate::model::DocumentId;
use edmig_core_types::RunId;
use thiserror::Error;

/// Result type alias using MigrationError
pub type Result<T> = std::result::Result<T, MigrationError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that can be used for programmatic
/// error handling, testing, and log filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Configuration / input
    InvalidInput,
    Configuration,
    NotFound,
    DisallowedKind,
    Unauthorised,

    // Collect phase
    RenderFailed,
    TemplateSyntax,
    NamingFailed,
    ConflictingRename,

    // Preflight
    Collision,
    MissingEditable,

    // Apply
    RowCountMismatch,
    Cancelled,

    // Integration/IO
    Io,
    Serialization,
    Persistence,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::Configuration => "ERR_CONFIGURATION",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::DisallowedKind => "ERR_DISALLOWED_KIND",
            ExErrorKind::Unauthorised => "ERR_UNAUTHORISED",
            ExErrorKind::RenderFailed => "ERR_RENDER_FAILED",
            ExErrorKind::TemplateSyntax => "ERR_TEMPLATE_SYNTAX",
            ExErrorKind::NamingFailed => "ERR_NAMING_FAILED",
            ExErrorKind::ConflictingRename => "ERR_CONFLICTING_RENAME",
            ExErrorKind::Collision => "ERR_COLLISION",
            ExErrorKind::MissingEditable => "ERR_MISSING_EDITABLE",
            ExErrorKind::RowCountMismatch => "ERR_ROW_COUNT_MISMATCH",
            ExErrorKind::Cancelled => "ERR_CANCELLED",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries classification fields for programmatic handling and context
/// for debugging. Collaborator implementations (stores, render pipelines)
/// report failures with this type.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    document_id: Option<DocumentId>,
    name: Option<String>,
    run_id: Option<RunId>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            document_id: None,
            name: None,
            run_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add document context
    pub fn with_document_id(mut self, id: DocumentId) -> Self {
        self.document_id = Some(id);
        self
    }

    /// Add editable name context
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add run correlation
    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn document_id(&self) -> Option<DocumentId> {
        self.document_id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn run_id(&self) -> Option<&RunId> {
        self.run_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(document_id) = self.document_id {
            write!(f, " (document_id: {})", document_id)?;
        }
        if let Some(name) = &self.name {
            write!(f, " (name: {})", name)?;
        }
        if let Some(run_id) = &self.run_id {
            write!(f, " (run_id: {})", run_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Error taxonomy for migration runs
#[derive(Error, Debug, Clone)]
pub enum MigrationError {
    // ===== Configuration Errors =====
    /// Target strategy equals the configured one; nothing would change
    #[error("Naming strategy '{strategy}' is already the configured strategy")]
    StrategyUnchanged { strategy: String },

    #[error("Unknown naming strategy: {strategy}")]
    UnknownStrategy { strategy: String },

    #[error("Naming strategy '{strategy}' does not accept option '{option}'")]
    InvalidStrategyOption { strategy: String, option: String },

    #[error("User '{user}' does not exist")]
    UserNotFound { user: String },

    #[error("User '{user}' is not an admin")]
    UserNotPrivileged { user: String },

    /// No domain/base address to build preview requests against
    #[error("No site domain configured")]
    MissingDomain,

    // ===== Input Errors =====
    #[error("Invalid document id: {value}")]
    InvalidDocumentId { value: i64 },

    #[error("Invalid editable name: {reason}")]
    InvalidEditableName { reason: String },

    #[error("Document not found: {document_id}")]
    DocumentNotFound { document_id: DocumentId },

    #[error("Document {document_id} has type '{kind}', which cannot be migrated")]
    DisallowedDocumentKind {
        document_id: DocumentId,
        kind: String,
    },

    // ===== Collect Errors =====
    #[error("Rendering document {document_id} failed: {message}")]
    Render {
        document_id: DocumentId,
        message: String,
    },

    #[error("Template error at line {line}: {message}")]
    Template { line: usize, message: String },

    #[error("Naming strategy '{strategy}' cannot resolve position: {reason}")]
    Naming { strategy: String, reason: String },

    /// Same old name resolved to two different targets within one document
    #[error(
        "Editable '{old_name}' in document {document_id} maps to both '{first}' and '{second}'"
    )]
    ConflictingRename {
        document_id: DocumentId,
        old_name: String,
        first: String,
        second: String,
    },

    // ===== Preflight Errors =====
    #[error("Editable '{new_name}' already exists in document {document_id}")]
    Collision {
        document_id: DocumentId,
        new_name: String,
    },

    #[error("Editable '{old_name}' not found in document {document_id}")]
    MissingOldEditable {
        document_id: DocumentId,
        old_name: String,
    },

    // ===== Apply Errors =====
    /// An update touched a number of rows other than exactly one
    #[error(
        "Renaming '{old_name}' to '{new_name}' in document {document_id} affected {rows} rows"
    )]
    RowCountMismatch {
        document_id: DocumentId,
        old_name: String,
        new_name: String,
        rows: usize,
    },

    #[error("Migration cancelled")]
    Cancelled,

    // ===== Collaborator Errors =====
    #[error("{0}")]
    Store(#[from] ExError),
}

impl From<MigrationError> for ExError {
    fn from(err: MigrationError) -> Self {
        match err {
            MigrationError::StrategyUnchanged { strategy } => {
                ExError::new(ExErrorKind::Configuration)
                    .with_op("check_strategy")
                    .with_message(format!("Strategy '{}' is already configured", strategy))
            }
            MigrationError::UnknownStrategy { strategy } => {
                ExError::new(ExErrorKind::Configuration)
                    .with_op("check_strategy")
                    .with_message(format!("Unknown strategy '{}'", strategy))
            }
            MigrationError::InvalidStrategyOption { strategy, option } => {
                ExError::new(ExErrorKind::Configuration)
                    .with_op("check_strategy")
                    .with_message(format!(
                        "Strategy '{}' does not accept option '{}'",
                        strategy, option
                    ))
            }
            MigrationError::UserNotFound { user } => ExError::new(ExErrorKind::Unauthorised)
                .with_op("resolve_user")
                .with_message(format!("User '{}' does not exist", user)),
            MigrationError::UserNotPrivileged { user } => {
                ExError::new(ExErrorKind::Unauthorised)
                    .with_op("resolve_user")
                    .with_message(format!("User '{}' is not an admin", user))
            }
            MigrationError::MissingDomain => ExError::new(ExErrorKind::Configuration)
                .with_op("resolve_domain")
                .with_message("No site domain configured"),
            MigrationError::InvalidDocumentId { value } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_message(format!("Invalid document id {}", value))
            }
            MigrationError::InvalidEditableName { reason } => {
                ExError::new(ExErrorKind::InvalidInput).with_message(reason)
            }
            MigrationError::DocumentNotFound { document_id } => {
                ExError::new(ExErrorKind::NotFound)
                    .with_document_id(document_id)
                    .with_message("Document not found")
            }
            MigrationError::DisallowedDocumentKind { document_id, kind } => {
                ExError::new(ExErrorKind::DisallowedKind)
                    .with_document_id(document_id)
                    .with_message(format!("Document type '{}' cannot be migrated", kind))
            }
            MigrationError::Render {
                document_id,
                message,
            } => ExError::new(ExErrorKind::RenderFailed)
                .with_op("render_document")
                .with_document_id(document_id)
                .with_message(message),
            MigrationError::Template { line, message } => {
                ExError::new(ExErrorKind::TemplateSyntax)
                    .with_op("parse_template")
                    .with_message(format!("line {}: {}", line, message))
            }
            MigrationError::Naming { strategy, reason } => {
                ExError::new(ExErrorKind::NamingFailed)
                    .with_op("resolve_name")
                    .with_message(format!("{}: {}", strategy, reason))
            }
            MigrationError::ConflictingRename {
                document_id,
                old_name,
                first,
                second,
            } => ExError::new(ExErrorKind::ConflictingRename)
                .with_op("collect")
                .with_document_id(document_id)
                .with_name(old_name)
                .with_message(format!("maps to both '{}' and '{}'", first, second)),
            MigrationError::Collision {
                document_id,
                new_name,
            } => ExError::new(ExErrorKind::Collision)
                .with_op("preflight")
                .with_document_id(document_id)
                .with_name(new_name)
                .with_message("Target editable already exists"),
            MigrationError::MissingOldEditable {
                document_id,
                old_name,
            } => ExError::new(ExErrorKind::MissingEditable)
                .with_op("preflight")
                .with_document_id(document_id)
                .with_name(old_name)
                .with_message("Source editable not found"),
            MigrationError::RowCountMismatch {
                document_id,
                old_name,
                new_name,
                rows,
            } => ExError::new(ExErrorKind::RowCountMismatch)
                .with_op("apply")
                .with_document_id(document_id)
                .with_name(old_name)
                .with_message(format!("rename to '{}' affected {} rows", new_name, rows)),
            MigrationError::Cancelled => {
                ExError::new(ExErrorKind::Cancelled).with_message("Migration cancelled")
            }
            MigrationError::Store(err) => err,
        }
    }
}
