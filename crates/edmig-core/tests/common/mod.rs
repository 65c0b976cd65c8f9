//! In-memory collaborators for migration tests

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use edmig_core::errors::{MigrationError, Result};
use edmig_core::model::{DocumentHandle, DocumentId, DocumentKind, EditableName, EditablePosition, User};
use edmig_core::naming::{NamingStrategy, StrategyDescriptor};
use edmig_core::ports::{
    DocumentStore, ElementStore, RenameTransaction, RenderObserver, RenderPipeline, UserDirectory,
};
use edmig_core::render::{PreviewRequest, RenderContext, TemplateDocument, TemplateSource};

pub fn doc(id: i64) -> DocumentId {
    DocumentId::new(id).unwrap()
}

pub fn name(n: &str) -> EditableName {
    EditableName::new(n).unwrap()
}

/// Documents, templates and users
#[derive(Default)]
pub struct MemorySite {
    documents: BTreeMap<DocumentId, (DocumentHandle, TemplateDocument)>,
    users: Vec<User>,
}

impl MemorySite {
    pub fn new() -> Self {
        Self::default().with_user("admin", true)
    }

    pub fn with_user(mut self, user: &str, admin: bool) -> Self {
        self.users.push(User::new(user, admin));
        self
    }

    pub fn with_page(self, id: i64, template: &str) -> Self {
        self.with_document(id, DocumentKind::Page, template)
    }

    pub fn with_document(mut self, id: i64, kind: DocumentKind, template: &str) -> Self {
        let handle = DocumentHandle::new(doc(id), kind, format!("/doc-{}", id));
        let template = TemplateDocument {
            published: true,
            body: template.to_string(),
        };
        self.documents.insert(doc(id), (handle, template));
        self
    }
}

impl DocumentStore for MemorySite {
    fn resolve(&self, id: DocumentId) -> Result<Option<DocumentHandle>> {
        Ok(self.documents.get(&id).map(|(h, _)| h.clone()))
    }

    fn list_all_ids(&self, kinds: &[DocumentKind]) -> Result<Vec<DocumentId>> {
        Ok(self
            .documents
            .values()
            .filter(|(h, _)| kinds.contains(&h.kind))
            .map(|(h, _)| h.id)
            .collect())
    }
}

impl UserDirectory for MemorySite {
    fn find_user(&self, name: &str) -> Result<Option<User>> {
        Ok(self.users.iter().find(|u| u.name == name).cloned())
    }
}

impl TemplateSource for MemorySite {
    fn load_template(&self, document_id: DocumentId) -> Result<Option<TemplateDocument>> {
        Ok(self.documents.get(&document_id).map(|(_, t)| t.clone()))
    }
}

/// Editable records with a call log
#[derive(Default)]
pub struct MemoryElements {
    rows: RefCell<BTreeSet<(DocumentId, String)>>,
    calls: RefCell<Vec<String>>,
    zero_rows_for: RefCell<Option<String>>,
}

impl MemoryElements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, id: i64, names: &[&str]) -> Self {
        for n in names {
            self.rows.borrow_mut().insert((doc(id), n.to_string()));
        }
        self
    }

    /// Make the update of `old_name` report zero affected rows
    pub fn fail_update_of(&self, old_name: &str) {
        *self.zero_rows_for.borrow_mut() = Some(old_name.to_string());
    }

    pub fn names(&self, id: i64) -> Vec<String> {
        self.rows
            .borrow()
            .iter()
            .filter(|(d, _)| *d == doc(id))
            .map(|(_, n)| n.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl ElementStore for MemoryElements {
    fn exists(&self, document_id: DocumentId, name: &EditableName) -> Result<bool> {
        self.calls
            .borrow_mut()
            .push(format!("exists {} {}", document_id, name));
        Ok(self
            .rows
            .borrow()
            .contains(&(document_id, name.as_str().to_string())))
    }

    fn begin(&self) -> Result<Box<dyn RenameTransaction + '_>> {
        self.calls.borrow_mut().push("begin".to_string());
        Ok(Box::new(MemoryTransaction {
            store: self,
            staged: self.rows.borrow().clone(),
        }))
    }
}

struct MemoryTransaction<'a> {
    store: &'a MemoryElements,
    staged: BTreeSet<(DocumentId, String)>,
}

impl RenameTransaction for MemoryTransaction<'_> {
    fn update_name(
        &mut self,
        document_id: DocumentId,
        old_name: &EditableName,
        new_name: &EditableName,
    ) -> Result<usize> {
        self.store
            .calls
            .borrow_mut()
            .push(format!("update {} {} {}", document_id, old_name, new_name));
        if self.store.zero_rows_for.borrow().as_deref() == Some(old_name.as_str()) {
            return Ok(0);
        }
        if self
            .staged
            .remove(&(document_id, old_name.as_str().to_string()))
        {
            self.staged
                .insert((document_id, new_name.as_str().to_string()));
            Ok(1)
        } else {
            Ok(0)
        }
    }

    fn commit(self: Box<Self>) -> Result<()> {
        self.store.calls.borrow_mut().push("commit".to_string());
        *self.store.rows.borrow_mut() = self.staged;
        Ok(())
    }

    fn rollback(self: Box<Self>) -> Result<()> {
        self.store.calls.borrow_mut().push("rollback".to_string());
        Ok(())
    }
}

/// Runs the inner pipeline, then fails or panics for selected documents
///
/// Editables are observed before the failure, like a template that breaks
/// half way through.
pub struct FailingPipeline<'a> {
    pub inner: &'a dyn RenderPipeline,
    pub fail: BTreeSet<DocumentId>,
    pub panic: BTreeSet<DocumentId>,
}

impl<'a> FailingPipeline<'a> {
    pub fn new(inner: &'a dyn RenderPipeline) -> Self {
        Self {
            inner,
            fail: BTreeSet::new(),
            panic: BTreeSet::new(),
        }
    }

    pub fn failing(mut self, id: i64) -> Self {
        self.fail.insert(doc(id));
        self
    }

    pub fn panicking(mut self, id: i64) -> Self {
        self.panic.insert(doc(id));
        self
    }
}

impl RenderPipeline for FailingPipeline<'_> {
    fn render(
        &self,
        request: &PreviewRequest,
        context: &RenderContext,
        output: &mut dyn Write,
        observer: &mut dyn RenderObserver,
    ) -> Result<()> {
        self.inner.render(request, context, output, observer)?;
        if self.panic.contains(&request.document_id) {
            panic!("template engine crashed on {}", request.path);
        }
        if self.fail.contains(&request.document_id) {
            return Err(MigrationError::Render {
                document_id: request.document_id,
                message: "exception in template".to_string(),
            });
        }
        Ok(())
    }
}

/// Appends `_0` to every declared name; ignores blocks
pub struct SuffixStrategy;

impl NamingStrategy for SuffixStrategy {
    fn descriptor(&self) -> StrategyDescriptor {
        StrategyDescriptor::new("suffix")
    }

    fn resolve(&self, position: &EditablePosition) -> Result<EditableName> {
        EditableName::new(format!("{}_0", position.declared_name))
    }
}

/// Renames `a` to `x` and `c` to `y`; every other name is kept
pub struct TableStrategy;

impl NamingStrategy for TableStrategy {
    fn descriptor(&self) -> StrategyDescriptor {
        StrategyDescriptor::new("table")
    }

    fn resolve(&self, position: &EditablePosition) -> Result<EditableName> {
        let renamed = match position.declared_name.as_str() {
            "a" => "x",
            "c" => "y",
            other => other,
        };
        EditableName::new(renamed)
    }
}

/// Resolver accepting the test strategies plus the built-ins
pub fn test_resolver(descriptor: &StrategyDescriptor) -> Result<Box<dyn NamingStrategy>> {
    match descriptor.id.as_str() {
        "suffix" => Ok(Box::new(SuffixStrategy)),
        "table" => Ok(Box::new(TableStrategy)),
        _ => edmig_core::naming::strategy_by_id(descriptor),
    }
}
