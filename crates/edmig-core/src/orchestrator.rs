//! Migration orchestrator
//!
//! Sequences collect, validate and apply for one run:
//!
//! ```text
//! Idle -> Collecting -> Validating -> Applying -> Done
//!            |              |            |
//!            +--------------+------------+------> Aborted
//! ```
//!
//! Configuration problems abort before any document is rendered. Render
//! failures are per document and only abort if the operator declines to
//! continue without them.

use std::collections::BTreeSet;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::collector::MappingCollector;
use crate::core_types::schema::{OP_COLLECT, OP_MIGRATE};
use crate::core_types::RunId;
use crate::errors::{ExError, MigrationError, Result};
use crate::executor::{ApplyReport, RenameExecutor};
use crate::model::{DocumentHandle, DocumentId, DocumentKind, NameMapping, Rename, User};
use crate::naming::{strategy_by_id, NamingStrategy, StrategyDescriptor};
use crate::ports::{DocumentStore, ElementStore, RenderPipeline, UserDirectory};
use crate::preflight::{MissingOldPolicy, PreflightValidator};
use crate::render::{RenderContext, RenderDriver, RenderOutcome, SiteAddress};
use crate::{log_op_end, log_op_error, log_op_start};

/// Lifecycle state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationPhase {
    Idle,
    Collecting,
    Validating,
    Applying,
    Done,
    Aborted,
}

/// Operator input for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRequest {
    /// Strategy the stored names should follow afterwards
    pub target: StrategyDescriptor,
    /// Documents to migrate; empty means every migratable document
    pub documents: Vec<DocumentId>,
    pub ignore: Vec<DocumentId>,
    pub run_as_user: String,
    pub dry_run: bool,
    pub missing_old_policy: MissingOldPolicy,
}

impl MigrationRequest {
    pub fn new(target: StrategyDescriptor, run_as_user: impl Into<String>) -> Self {
        Self {
            target,
            documents: Vec::new(),
            ignore: Vec::new(),
            run_as_user: run_as_user.into(),
            dry_run: false,
            missing_old_policy: MissingOldPolicy::default(),
        }
    }
}

/// Site-level configuration the run depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSettings {
    /// Strategy the stored names currently follow
    pub current: StrategyDescriptor,
    pub domain: Option<String>,
    pub scheme: String,
}

impl MigrationSettings {
    pub fn new(current: StrategyDescriptor, domain: Option<String>) -> Self {
        Self {
            current,
            domain,
            scheme: "https".to_string(),
        }
    }
}

/// External systems a run talks to
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub documents: &'a dyn DocumentStore,
    pub elements: &'a dyn ElementStore,
    pub users: &'a dyn UserDirectory,
    pub pipeline: &'a dyn RenderPipeline,
}

/// Asks the operator a yes/no question
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> bool;
}

/// Answers yes to everything (non-interactive runs)
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _question: &str) -> bool {
        true
    }
}

/// Answers no to everything
pub struct AssumeNo;

impl Confirm for AssumeNo {
    fn confirm(&mut self, _question: &str) -> bool {
        false
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MigrationOutcome {
    NothingToMigrate,
    Completed { dry_run: bool, renamed: usize },
    InvalidUser { message: String },
    MissingDomain,
    Declined { failed_documents: usize },
    PreflightFailed { message: String },
    ApplyFailed { message: String },
    ConfigurationError { message: String },
    Cancelled,
}

impl MigrationOutcome {
    /// Process exit status for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            MigrationOutcome::NothingToMigrate | MigrationOutcome::Completed { .. } => 0,
            MigrationOutcome::InvalidUser { .. } => 1,
            MigrationOutcome::MissingDomain => 2,
            MigrationOutcome::Declined { .. } => 3,
            MigrationOutcome::PreflightFailed { .. } => 4,
            MigrationOutcome::ApplyFailed { .. } => 5,
            MigrationOutcome::ConfigurationError { .. } => 6,
            MigrationOutcome::Cancelled => 130,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code() == 0
    }

    /// One-line description for the operator
    pub fn summary(&self) -> String {
        match self {
            MigrationOutcome::NothingToMigrate => "Nothing to migrate".to_string(),
            MigrationOutcome::Completed {
                dry_run: true,
                renamed,
            } => format!("Dry run: {} editables would be renamed", renamed),
            MigrationOutcome::Completed {
                dry_run: false,
                renamed,
            } => format!("Migration completed: {} editables renamed", renamed),
            MigrationOutcome::InvalidUser { message } => format!("Invalid user: {}", message),
            MigrationOutcome::MissingDomain => "No site domain configured".to_string(),
            MigrationOutcome::Declined { failed_documents } => format!(
                "Aborted: {} documents failed to render",
                failed_documents
            ),
            MigrationOutcome::PreflightFailed { message } => {
                format!("Preflight failed: {}", message)
            }
            MigrationOutcome::ApplyFailed { message } => {
                format!("Apply failed, all renames rolled back: {}", message)
            }
            MigrationOutcome::ConfigurationError { message } => {
                format!("Configuration error: {}", message)
            }
            MigrationOutcome::Cancelled => "Migration cancelled".to_string(),
        }
    }

    /// Suggested next step, if the run did not succeed
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            MigrationOutcome::NothingToMigrate | MigrationOutcome::Completed { .. } => None,
            MigrationOutcome::InvalidUser { .. } => {
                Some("Run the migration as an existing admin account.")
            }
            MigrationOutcome::MissingDomain => {
                Some("Configure the site domain so preview requests can be built.")
            }
            MigrationOutcome::Declined { .. } => {
                Some("Fix the rendering issues listed above and run the migration again.")
            }
            MigrationOutcome::PreflightFailed { .. } => Some(
                "Nothing was written. Resolve the conflicting editables and run the migration again.",
            ),
            MigrationOutcome::ApplyFailed { .. } => {
                Some("Nothing was committed. Fix the cause and run the migration again.")
            }
            MigrationOutcome::ConfigurationError { .. } => {
                Some("Check the target strategy and the document selection.")
            }
            MigrationOutcome::Cancelled => Some("Nothing was committed."),
        }
    }
}

/// A document that could not be rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFailure {
    pub document_id: DocumentId,
    pub path: String,
    pub message: String,
}

/// Everything a run did, for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub run_id: RunId,
    pub target: StrategyDescriptor,
    pub phase: MigrationPhase,
    pub outcome: MigrationOutcome,
    pub rendered: Vec<DocumentId>,
    pub failures: Vec<DocumentFailure>,
    /// Mapping after failed documents were excluded
    pub mapping: NameMapping,
    /// Renames whose old record was missing at preflight
    pub missing: Vec<Rename>,
    pub applied: Option<ApplyReport>,
}

impl MigrationReport {
    fn new(run_id: RunId, target: StrategyDescriptor) -> Self {
        Self {
            run_id,
            target,
            phase: MigrationPhase::Idle,
            outcome: MigrationOutcome::NothingToMigrate,
            rendered: Vec::new(),
            failures: Vec::new(),
            mapping: NameMapping::new(),
            missing: Vec::new(),
            applied: None,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }
}

type StrategyResolver<'a> = Box<dyn Fn(&StrategyDescriptor) -> Result<Box<dyn NamingStrategy>> + 'a>;

pub struct MigrationOrchestrator<'a> {
    collaborators: Collaborators<'a>,
    settings: MigrationSettings,
    resolver: StrategyResolver<'a>,
    cancel: CancellationToken,
    phase: MigrationPhase,
    failure: Option<ExError>,
}

impl<'a> MigrationOrchestrator<'a> {
    pub fn new(collaborators: Collaborators<'a>, settings: MigrationSettings) -> Self {
        Self {
            collaborators,
            settings,
            resolver: Box::new(strategy_by_id),
            cancel: CancellationToken::new(),
            phase: MigrationPhase::Idle,
            failure: None,
        }
    }

    /// Replace the built-in strategy registry
    pub fn with_strategy_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&StrategyDescriptor) -> Result<Box<dyn NamingStrategy>> + 'a,
    {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn phase(&self) -> MigrationPhase {
        self.phase
    }

    /// Run one migration to completion
    ///
    /// Never returns an error: every failure ends in an `Aborted` phase with
    /// a matching outcome in the report.
    pub fn run(&mut self, request: &MigrationRequest, confirm: &mut dyn Confirm) -> MigrationReport {
        let start = Instant::now();
        let run_id = RunId::new();
        let span = tracing::info_span!("migration", run_id = %run_id);
        let _guard = span.enter();

        log_op_start!(
            OP_MIGRATE,
            target = %request.target,
            current = %self.settings.current,
            dry_run = request.dry_run
        );

        self.phase = MigrationPhase::Idle;
        self.failure = None;
        let mut report = MigrationReport::new(run_id, request.target.clone());
        report.outcome = self.execute(request, confirm, &mut report);
        report.phase = self.phase;

        let duration_ms = start.elapsed().as_millis() as u64;
        if report.outcome.is_success() {
            log_op_end!(
                OP_MIGRATE,
                duration_ms = duration_ms,
                outcome = %report.outcome.summary(),
                exit_code = report.outcome.exit_code()
            );
        } else if let Some(err) = self.failure.take() {
            log_op_error!(
                OP_MIGRATE,
                err.with_run_id(report.run_id.clone()),
                duration_ms = duration_ms,
                outcome = %report.outcome.summary(),
                exit_code = report.outcome.exit_code()
            );
        } else {
            tracing::error!(
                component = module_path!(),
                op = OP_MIGRATE,
                event = crate::core_types::schema::EVENT_END_ERROR,
                duration_ms = duration_ms,
                outcome = %report.outcome.summary(),
                exit_code = report.outcome.exit_code(),
            );
        }
        report
    }

    fn execute(
        &mut self,
        request: &MigrationRequest,
        confirm: &mut dyn Confirm,
        report: &mut MigrationReport,
    ) -> MigrationOutcome {
        // Idle: everything that can be rejected without rendering
        let target = match self.resolve_target(&request.target) {
            Ok(target) => target,
            Err(err) => return self.abort(err),
        };
        let user = match self.resolve_user(&request.run_as_user) {
            Ok(user) => user,
            Err(err) => return self.abort(err),
        };
        let site = match SiteAddress::new(
            self.settings.domain.as_deref().unwrap_or_default(),
            &self.settings.scheme,
        ) {
            Ok(site) => site,
            Err(err) => return self.abort(err),
        };
        let documents = match self.resolve_documents(request) {
            Ok(documents) => documents,
            Err(err) => return self.abort(err),
        };

        // Collecting
        self.phase = MigrationPhase::Collecting;
        let context = RenderContext::admin_preview(user, self.settings.current.clone());
        let mapping = match self.collect(&documents, target.as_ref(), &context, &site, report) {
            Ok(mapping) => mapping,
            Err(err) => return self.abort(err),
        };

        if !report.failures.is_empty() {
            let mut question = format!(
                "{} of {} documents failed to render:\n",
                report.failures.len(),
                documents.len()
            );
            for failure in &report.failures {
                question.push_str(&format!(
                    "  {} ({}): {}\n",
                    failure.path, failure.document_id, failure.message
                ));
            }
            question.push_str("Continue with the remaining documents?");
            if !confirm.confirm(&question) {
                self.phase = MigrationPhase::Aborted;
                return MigrationOutcome::Declined {
                    failed_documents: report.failures.len(),
                };
            }
        }

        let failed: BTreeSet<DocumentId> = report.failures.iter().map(|f| f.document_id).collect();
        let mut mapping = mapping;
        mapping.retain_documents(|id| !failed.contains(&id));
        report.mapping = mapping.clone();

        if mapping.is_empty() {
            self.phase = MigrationPhase::Done;
            return MigrationOutcome::NothingToMigrate;
        }

        // Validating
        self.phase = MigrationPhase::Validating;
        let preflight = PreflightValidator::new(self.collaborators.elements)
            .with_policy(request.missing_old_policy)
            .with_cancellation(&self.cancel)
            .validate(&mapping);
        let preflight = match preflight {
            Ok(preflight) => preflight,
            Err(err) => return self.abort(err),
        };
        report.missing = preflight.missing;
        if preflight.approved.is_empty() {
            self.phase = MigrationPhase::Done;
            return MigrationOutcome::NothingToMigrate;
        }

        // Applying
        self.phase = MigrationPhase::Applying;
        let applied = RenameExecutor::new(self.collaborators.elements)
            .with_cancellation(&self.cancel)
            .apply(&preflight.approved, request.dry_run);
        let applied = match applied {
            Ok(applied) => applied,
            Err(err) => return self.abort(err),
        };

        self.phase = MigrationPhase::Done;
        let outcome = MigrationOutcome::Completed {
            dry_run: applied.dry_run,
            renamed: applied.renames.len(),
        };
        report.applied = Some(applied);
        outcome
    }

    fn resolve_target(&self, target: &StrategyDescriptor) -> Result<Box<dyn NamingStrategy>> {
        if *target == self.settings.current {
            return Err(MigrationError::StrategyUnchanged {
                strategy: target.to_string(),
            });
        }
        let strategy = (self.resolver)(target)?;
        // Resolution may normalise the descriptor; compare what will actually run
        if strategy.descriptor() == self.settings.current {
            return Err(MigrationError::StrategyUnchanged {
                strategy: target.to_string(),
            });
        }
        Ok(strategy)
    }

    fn resolve_user(&self, name: &str) -> Result<User> {
        let user = self
            .collaborators
            .users
            .find_user(name)?
            .ok_or_else(|| MigrationError::UserNotFound {
                user: name.to_string(),
            })?;
        if !user.admin {
            return Err(MigrationError::UserNotPrivileged {
                user: name.to_string(),
            });
        }
        Ok(user)
    }

    fn resolve_documents(&self, request: &MigrationRequest) -> Result<Vec<DocumentHandle>> {
        let ids: BTreeSet<DocumentId> = if request.documents.is_empty() {
            self.collaborators
                .documents
                .list_all_ids(&DocumentKind::MIGRATABLE)?
                .into_iter()
                .collect()
        } else {
            request.documents.iter().copied().collect()
        };

        let mut handles = Vec::with_capacity(ids.len());
        for id in ids {
            if request.ignore.contains(&id) {
                continue;
            }
            let handle = self
                .collaborators
                .documents
                .resolve(id)?
                .ok_or(MigrationError::DocumentNotFound { document_id: id })?;
            handle.ensure_migratable()?;
            handles.push(handle);
        }
        Ok(handles)
    }

    fn collect(
        &self,
        documents: &[DocumentHandle],
        target: &dyn NamingStrategy,
        context: &RenderContext,
        site: &SiteAddress,
        report: &mut MigrationReport,
    ) -> Result<NameMapping> {
        let start = Instant::now();
        log_op_start!(OP_COLLECT, document_count = documents.len());

        let driver = RenderDriver::new(self.collaborators.pipeline, context, site);
        let mut collector = MappingCollector::new(target);

        for document in documents {
            if let Err(err) = self.cancel.check() {
                log_op_error!(
                    OP_COLLECT,
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                return Err(err);
            }

            match driver.render(document, &mut collector) {
                RenderOutcome::Success => report.rendered.push(document.id),
                RenderOutcome::Failure { message } => {
                    tracing::warn!(
                        document_id = document.id.get(),
                        path = %document.path,
                        error = %message,
                        "Document failed to render and will be skipped"
                    );
                    report.failures.push(DocumentFailure {
                        document_id: document.id,
                        path: document.path.clone(),
                        message,
                    });
                }
            }
        }

        let mapping = collector.into_mapping();
        log_op_end!(
            OP_COLLECT,
            duration_ms = start.elapsed().as_millis() as u64,
            rendered = report.rendered.len(),
            failed = report.failures.len(),
            rename_count = mapping.len()
        );
        Ok(mapping)
    }

    fn abort(&mut self, err: MigrationError) -> MigrationOutcome {
        let during = self.phase;
        self.phase = MigrationPhase::Aborted;
        let message = err.to_string();
        self.failure = Some(ExError::from(err.clone()));

        match err {
            MigrationError::UserNotFound { .. } | MigrationError::UserNotPrivileged { .. } => {
                MigrationOutcome::InvalidUser { message }
            }
            MigrationError::MissingDomain => MigrationOutcome::MissingDomain,
            MigrationError::Cancelled => MigrationOutcome::Cancelled,
            _ => match during {
                MigrationPhase::Validating => MigrationOutcome::PreflightFailed { message },
                MigrationPhase::Applying => MigrationOutcome::ApplyFailed { message },
                _ => MigrationOutcome::ConfigurationError { message },
            },
        }
    }
}
