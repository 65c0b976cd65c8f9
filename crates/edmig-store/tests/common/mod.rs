//! Shared fixtures for store tests

#![allow(dead_code)]

use edmig_core::model::{DocumentHandle, DocumentId, DocumentKind, EditableName, User};
use edmig_store::SqliteRepo;

pub fn doc(id: i64) -> DocumentId {
    DocumentId::new(id).unwrap()
}

pub fn name(n: &str) -> EditableName {
    EditableName::new(n).unwrap()
}

/// Add a page with `template` and one stored record per editable name
pub fn seed_page(repo: &SqliteRepo, id: i64, template: &str, editables: &[&str]) {
    repo.put_document(
        &DocumentHandle::new(doc(id), DocumentKind::Page, format!("/page-{}", id)),
        template,
    )
    .unwrap();
    for editable in editables {
        repo.put_editable(
            doc(id),
            &name(editable),
            "input",
            &serde_json::json!({ "text": format!("{} of {}", editable, id) }),
        )
        .unwrap();
    }
}

/// In-memory repo with an `admin` user
pub fn repo() -> SqliteRepo {
    let repo = SqliteRepo::in_memory().unwrap();
    repo.put_user(&User::new("admin", true)).unwrap();
    repo
}
