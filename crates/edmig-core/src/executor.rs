//! Rename executor
//!
//! Applies a validated mapping inside one transaction. Either every rename
//! is committed or none is.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::core_types::schema::OP_APPLY;
use crate::errors::{MigrationError, Result};
use crate::model::{NameMapping, Rename};
use crate::ports::{ElementStore, RenameTransaction};
use crate::{log_op_end, log_op_error, log_op_start};

/// Renames applied, or planned when `dry_run` is set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    pub dry_run: bool,
    pub renames: Vec<Rename>,
}

pub struct RenameExecutor<'a> {
    store: &'a dyn ElementStore,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> RenameExecutor<'a> {
    pub fn new(store: &'a dyn ElementStore) -> Self {
        Self {
            store,
            cancel: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: &'a CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Apply `mapping`
    ///
    /// With `dry_run` the store is not touched at all and the report lists
    /// what would have been renamed, in the order a real run would use.
    ///
    /// # Errors
    /// * `RowCountMismatch` - If an update affected anything other than one row
    /// * `Cancelled` - If the run was cancelled mid-transaction
    /// * `Store` - If the store failed; the transaction is rolled back
    pub fn apply(&self, mapping: &NameMapping, dry_run: bool) -> Result<ApplyReport> {
        let start = Instant::now();
        log_op_start!(OP_APPLY, rename_count = mapping.len(), dry_run = dry_run);

        let result = if dry_run {
            Ok(self.plan(mapping))
        } else {
            self.apply_in_transaction(mapping)
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(report) => {
                log_op_end!(
                    OP_APPLY,
                    duration_ms = duration_ms,
                    rename_count = report.renames.len(),
                    dry_run = dry_run
                );
            }
            Err(err) => log_op_error!(OP_APPLY, err.clone(), duration_ms = duration_ms),
        }
        result
    }

    fn plan(&self, mapping: &NameMapping) -> ApplyReport {
        let renames: Vec<Rename> = mapping.iter().cloned().collect();
        for rename in &renames {
            tracing::info!(
                document_id = rename.document_id.get(),
                old_name = %rename.old_name,
                new_name = %rename.new_name,
                "Would rename editable"
            );
        }
        ApplyReport {
            dry_run: true,
            renames,
        }
    }

    fn apply_in_transaction(&self, mapping: &NameMapping) -> Result<ApplyReport> {
        let mut tx = self.store.begin()?;
        let mut applied = Vec::with_capacity(mapping.len());

        for rename in mapping.iter() {
            if let Some(cancel) = self.cancel {
                if let Err(err) = cancel.check() {
                    return Err(abort(tx, err));
                }
            }

            let rows = match tx.update_name(rename.document_id, &rename.old_name, &rename.new_name)
            {
                Ok(rows) => rows,
                Err(err) => return Err(abort(tx, err)),
            };
            if rows != 1 {
                let err = MigrationError::RowCountMismatch {
                    document_id: rename.document_id,
                    old_name: rename.old_name.to_string(),
                    new_name: rename.new_name.to_string(),
                    rows,
                };
                return Err(abort(tx, err));
            }

            tracing::debug!(
                document_id = rename.document_id.get(),
                old_name = %rename.old_name,
                new_name = %rename.new_name,
                "Renamed editable"
            );
            applied.push(rename.clone());
        }

        tx.commit()?;
        Ok(ApplyReport {
            dry_run: false,
            renames: applied,
        })
    }
}

/// Roll back and hand back the error that caused it
fn abort(tx: Box<dyn RenameTransaction + '_>, cause: MigrationError) -> MigrationError {
    if let Err(rollback_err) = tx.rollback() {
        tracing::error!(error = %rollback_err, cause = %cause, "Rollback failed");
    } else {
        tracing::warn!(cause = %cause, "Rolled back all renames");
    }
    cause
}
