//! Collaborator interfaces consumed by the migration protocol
//!
//! Storage, rendering and user lookup live outside the core. The core only
//! talks to them through these traits; `edmig-store` provides the SQLite
//! implementations and the tests provide in-memory ones.

use std::io::Write;

use crate::errors::Result;
use crate::model::{DocumentHandle, DocumentId, DocumentKind, EditableName, EditablePosition, User};
use crate::render::{PreviewRequest, RenderContext};

/// Document lookup
pub trait DocumentStore {
    /// Resolve a document id; `Ok(None)` if it does not exist
    fn resolve(&self, id: DocumentId) -> Result<Option<DocumentHandle>>;

    /// Ids of every document whose kind is in `kinds`, ascending
    fn list_all_ids(&self, kinds: &[DocumentKind]) -> Result<Vec<DocumentId>>;
}

/// Persisted editable records keyed by (document, name)
pub trait ElementStore {
    fn exists(&self, document_id: DocumentId, name: &EditableName) -> Result<bool>;

    /// Open a transaction covering every rename of the run
    fn begin(&self) -> Result<Box<dyn RenameTransaction + '_>>;
}

/// A write transaction over the element store
///
/// Dropping a transaction without calling `commit` must discard its writes.
pub trait RenameTransaction {
    /// Rename one record; returns the number of rows affected
    fn update_name(
        &mut self,
        document_id: DocumentId,
        old_name: &EditableName,
        new_name: &EditableName,
    ) -> Result<usize>;

    fn commit(self: Box<Self>) -> Result<()>;

    fn rollback(self: Box<Self>) -> Result<()>;
}

/// Account lookup for the identity the run renders as
pub trait UserDirectory {
    fn find_user(&self, name: &str) -> Result<Option<User>>;
}

/// One editable encountered during a render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditableEvent {
    pub document_id: DocumentId,
    /// Name the editable was rendered under (current strategy)
    pub name: EditableName,
    pub position: EditablePosition,
}

/// Receives editable notifications from a render in progress
///
/// An error returned here aborts the render of the current document.
pub trait RenderObserver {
    fn on_editable(&mut self, event: &EditableEvent) -> Result<()>;
}

/// Host rendering pipeline
pub trait RenderPipeline {
    /// Render the requested document into `output`, notifying `observer` of
    /// every editable along the way
    fn render(
        &self,
        request: &PreviewRequest,
        context: &RenderContext,
        output: &mut dyn Write,
        observer: &mut dyn RenderObserver,
    ) -> Result<()>;
}
