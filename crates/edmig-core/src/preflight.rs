//! Preflight validation
//!
//! Read-only pass over a mapping confirming every rename can be applied:
//! the old record exists, and the new name is neither stored nor claimed by
//! another rename in the same document.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::core_types::schema::OP_PREFLIGHT;
use crate::errors::{MigrationError, Result};
use crate::model::{DocumentId, EditableName, NameMapping, Rename};
use crate::ports::ElementStore;
use crate::{log_op_end, log_op_error, log_op_start};

/// What to do when the record for an old name is missing
///
/// A missing record is expected on sparse documents, where a template
/// declares an editable that was never filled in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingOldPolicy {
    /// Log a warning, report the rename and leave it out of the approved mapping
    #[default]
    Warn,
    /// Abort validation
    Fail,
}

impl FromStr for MissingOldPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "warn" => Ok(MissingOldPolicy::Warn),
            "fail" => Ok(MissingOldPolicy::Fail),
            other => Err(format!(
                "unknown policy '{}' (expected warn or fail)",
                other
            )),
        }
    }
}

/// Outcome of a successful preflight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreflightReport {
    /// Renames cleared for apply
    pub approved: NameMapping,
    /// Renames whose old record was not found; never part of `approved`
    pub missing: Vec<Rename>,
    /// Number of renames inspected
    pub checked: usize,
}

pub struct PreflightValidator<'a> {
    store: &'a dyn ElementStore,
    policy: MissingOldPolicy,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> PreflightValidator<'a> {
    pub fn new(store: &'a dyn ElementStore) -> Self {
        Self {
            store,
            policy: MissingOldPolicy::default(),
            cancel: None,
        }
    }

    pub fn with_policy(mut self, policy: MissingOldPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cancellation(mut self, cancel: &'a CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Validate every rename in document order, then mapping order
    ///
    /// Stops at the first collision.
    ///
    /// # Errors
    /// * `Collision` - If a new name already exists for its document, or two
    ///   renames in one document share a new name
    /// * `MissingOldEditable` - If an old record is missing and the policy is `Fail`
    /// * `Cancelled` - If the run was cancelled
    /// * `Store` - If the element store could not be queried
    pub fn validate(&self, mapping: &NameMapping) -> Result<PreflightReport> {
        let start = Instant::now();
        log_op_start!(OP_PREFLIGHT, rename_count = mapping.len(), policy = ?self.policy);

        match self.check_all(mapping) {
            Ok(report) => {
                log_op_end!(
                    OP_PREFLIGHT,
                    duration_ms = start.elapsed().as_millis() as u64,
                    checked = report.checked,
                    missing = report.missing.len()
                );
                Ok(report)
            }
            Err(err) => {
                log_op_error!(
                    OP_PREFLIGHT,
                    err.clone(),
                    duration_ms = start.elapsed().as_millis() as u64
                );
                Err(err)
            }
        }
    }

    fn check_all(&self, mapping: &NameMapping) -> Result<PreflightReport> {
        let mut approved = mapping.clone();
        let mut missing = Vec::new();
        let mut claimed: HashMap<DocumentId, HashSet<&EditableName>> = HashMap::new();
        let mut checked = 0;

        for rename in mapping.iter() {
            if let Some(cancel) = self.cancel {
                cancel.check()?;
            }
            checked += 1;

            let present = self.store.exists(rename.document_id, &rename.old_name)?;
            if !present {
                if self.policy == MissingOldPolicy::Fail {
                    return Err(MigrationError::MissingOldEditable {
                        document_id: rename.document_id,
                        old_name: rename.old_name.to_string(),
                    });
                }
                tracing::warn!(
                    document_id = rename.document_id.get(),
                    old_name = %rename.old_name,
                    "Editable to rename not found, skipping"
                );
                approved.remove_rename(rename.document_id, &rename.old_name);
                missing.push(rename.clone());
            }

            let collision = || MigrationError::Collision {
                document_id: rename.document_id,
                new_name: rename.new_name.to_string(),
            };
            if self.store.exists(rename.document_id, &rename.new_name)? {
                return Err(collision());
            }
            // A skipped rename writes nothing, so it claims no name
            if present
                && !claimed
                    .entry(rename.document_id)
                    .or_default()
                    .insert(&rename.new_name)
            {
                return Err(collision());
            }
        }

        Ok(PreflightReport {
            approved,
            missing,
            checked,
        })
    }
}
