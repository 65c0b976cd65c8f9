use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::document::DocumentId;
use super::editable::EditableName;
use crate::errors::{MigrationError, Result};

/// A single planned rename
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rename {
    pub document_id: DocumentId,
    pub old_name: EditableName,
    pub new_name: EditableName,
}

impl std::fmt::Display for Rename {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "document {}: {} -> {}",
            self.document_id, self.old_name, self.new_name
        )
    }
}

/// Per-document old-name to new-name mapping for one migration run
///
/// Documents iterate in ascending id order; renames within a document keep
/// the order in which they were first observed. Documents with no renames
/// left are dropped, so `is_empty()` means there is nothing to migrate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameMapping {
    documents: BTreeMap<DocumentId, Vec<Rename>>,
}

impl NameMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `old_name` becomes `new_name` in `document_id`
    ///
    /// Returns `Ok(true)` if a new entry was added. Identity renames and
    /// repeated observations of the same pair are no-ops.
    ///
    /// # Errors
    /// * `ConflictingRename` - If `old_name` was already mapped to a different target
    pub fn record(
        &mut self,
        document_id: DocumentId,
        old_name: EditableName,
        new_name: EditableName,
    ) -> Result<bool> {
        if old_name == new_name {
            return Ok(false);
        }

        let renames = self.documents.entry(document_id).or_default();
        if let Some(existing) = renames.iter().find(|r| r.old_name == old_name) {
            if existing.new_name == new_name {
                return Ok(false);
            }
            return Err(MigrationError::ConflictingRename {
                document_id,
                old_name: old_name.to_string(),
                first: existing.new_name.to_string(),
                second: new_name.to_string(),
            });
        }

        renames.push(Rename {
            document_id,
            old_name,
            new_name,
        });
        Ok(true)
    }

    /// Renames for one document, in observation order
    pub fn get(&self, document_id: DocumentId) -> Option<&[Rename]> {
        self.documents.get(&document_id).map(Vec::as_slice)
    }

    pub fn contains_document(&self, document_id: DocumentId) -> bool {
        self.documents.contains_key(&document_id)
    }

    /// Documents with at least one rename, ascending
    pub fn documents(&self) -> impl Iterator<Item = DocumentId> + '_ {
        self.documents.keys().copied()
    }

    /// All renames in document order, then observation order
    pub fn iter(&self) -> impl Iterator<Item = &Rename> {
        self.documents.values().flatten()
    }

    /// Total number of renames across all documents
    pub fn len(&self) -> usize {
        self.documents.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Drop every rename recorded for a document
    pub fn remove_document(&mut self, document_id: DocumentId) -> Option<Vec<Rename>> {
        self.documents.remove(&document_id)
    }

    /// Keep only the documents for which `keep` returns true
    pub fn retain_documents<F>(&mut self, mut keep: F)
    where
        F: FnMut(DocumentId) -> bool,
    {
        self.documents.retain(|id, _| keep(*id));
    }

    /// Drop a single rename
    pub fn remove_rename(&mut self, document_id: DocumentId, old_name: &EditableName) -> bool {
        let Some(renames) = self.documents.get_mut(&document_id) else {
            return false;
        };
        let before = renames.len();
        renames.retain(|r| &r.old_name != old_name);
        let removed = renames.len() != before;
        if renames.is_empty() {
            self.documents.remove(&document_id);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: i64) -> DocumentId {
        DocumentId::new(id).unwrap()
    }

    fn name(n: &str) -> EditableName {
        EditableName::new(n).unwrap()
    }

    #[test]
    fn test_identity_rename_is_not_recorded() {
        let mut mapping = NameMapping::new();
        assert!(!mapping.record(doc(1), name("b"), name("b")).unwrap());
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_repeated_pair_is_recorded_once() {
        let mut mapping = NameMapping::new();
        assert!(mapping.record(doc(1), name("a"), name("x")).unwrap());
        assert!(!mapping.record(doc(1), name("a"), name("x")).unwrap());
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn test_conflicting_target_is_rejected() {
        let mut mapping = NameMapping::new();
        mapping.record(doc(1), name("a"), name("x")).unwrap();
        let err = mapping.record(doc(1), name("a"), name("y")).unwrap_err();
        assert!(matches!(err, MigrationError::ConflictingRename { .. }));
    }

    #[test]
    fn test_iteration_is_document_then_observation_order() {
        let mut mapping = NameMapping::new();
        mapping.record(doc(5), name("z"), name("z1")).unwrap();
        mapping.record(doc(2), name("b"), name("b1")).unwrap();
        mapping.record(doc(2), name("a"), name("a1")).unwrap();

        let order: Vec<_> = mapping
            .iter()
            .map(|r| (r.document_id.get(), r.old_name.as_str().to_string()))
            .collect();
        assert_eq!(
            order,
            vec![
                (2, "b".to_string()),
                (2, "a".to_string()),
                (5, "z".to_string())
            ]
        );
    }

    #[test]
    fn test_removing_last_rename_drops_document() {
        let mut mapping = NameMapping::new();
        mapping.record(doc(1), name("a"), name("x")).unwrap();
        assert!(mapping.remove_rename(doc(1), &name("a")));
        assert!(mapping.is_empty());
        assert!(!mapping.remove_rename(doc(1), &name("a")));
    }

    #[test]
    fn test_retain_documents() {
        let mut mapping = NameMapping::new();
        mapping.record(doc(1), name("a"), name("x")).unwrap();
        mapping.record(doc(2), name("a"), name("x")).unwrap();
        mapping.retain_documents(|id| id != doc(2));
        assert_eq!(mapping.documents().collect::<Vec<_>>(), vec![doc(1)]);
    }
}
