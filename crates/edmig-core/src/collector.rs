//! Mapping collector
//!
//! Observes renders and records, per document, every editable whose name
//! under the target strategy differs from the name it was rendered under.

use crate::errors::Result;
use crate::model::{DocumentId, NameMapping};
use crate::naming::NamingStrategy;
use crate::ports::{EditableEvent, RenderObserver};

pub struct MappingCollector<'a> {
    target: &'a dyn NamingStrategy,
    mapping: NameMapping,
    observed: usize,
}

impl<'a> MappingCollector<'a> {
    pub fn new(target: &'a dyn NamingStrategy) -> Self {
        Self {
            target,
            mapping: NameMapping::new(),
            observed: 0,
        }
    }

    /// Mapping accumulated so far, including documents still being rendered
    pub fn mapping(&self) -> &NameMapping {
        &self.mapping
    }

    /// Number of editable notifications seen, renamed or not
    pub fn observed(&self) -> usize {
        self.observed
    }

    /// Forget everything recorded for a document
    pub fn discard_document(&mut self, document_id: DocumentId) {
        self.mapping.remove_document(document_id);
    }

    pub fn into_mapping(self) -> NameMapping {
        self.mapping
    }
}

impl RenderObserver for MappingCollector<'_> {
    fn on_editable(&mut self, event: &EditableEvent) -> Result<()> {
        self.observed += 1;
        let new_name = self.target.resolve(&event.position)?;
        if self
            .mapping
            .record(event.document_id, event.name.clone(), new_name.clone())?
        {
            tracing::debug!(
                document_id = event.document_id.get(),
                old_name = %event.name,
                new_name = %new_name,
                "Recorded rename"
            );
        }
        Ok(())
    }
}
