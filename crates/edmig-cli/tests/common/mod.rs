//! Helpers for driving the edmig binary

#![allow(dead_code)]

use edmig_core::model::{DocumentHandle, DocumentId, DocumentKind, EditableName, User};
use edmig_store::SqliteRepo;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

pub fn doc(id: i64) -> DocumentId {
    DocumentId::new(id).unwrap()
}

/// Temp directory holding `store.db` with two pages and two users
///
/// Page 10 has a block stored under legacy names; page 11 has a broken
/// template.
pub fn setup_site() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("store.db");
    let repo = SqliteRepo::open(&db).unwrap();
    repo.put_user(&User::new("admin", true)).unwrap();
    repo.put_user(&User::new("editor", false)).unwrap();

    repo.put_document(
        &DocumentHandle::new(doc(10), DocumentKind::Page, "/en/home"),
        "{{ input \"title\" }}{{ block \"main\" count=2 }}{{ wysiwyg \"content\" }}{{ /block }}",
    )
    .unwrap();
    for name in ["title", "contentmain1", "contentmain2"] {
        put_editable(&repo, 10, name);
    }

    repo.put_document(
        &DocumentHandle::new(doc(11), DocumentKind::Page, "/en/broken"),
        "{{ block \"main\" }}{{ input \"content\" }}",
    )
    .unwrap();
    put_editable(&repo, 11, "contentmain1");

    (dir, db)
}

pub fn put_editable(repo: &SqliteRepo, id: i64, name: &str) {
    repo.put_editable(
        doc(id),
        &EditableName::new(name).unwrap(),
        "input",
        &serde_json::json!(name),
    )
    .unwrap();
}

pub fn names(db: &Path, id: i64) -> Vec<String> {
    SqliteRepo::open(db).unwrap().editable_names(doc(id)).unwrap()
}

/// Run `edmig` in `dir` with stdin closed
pub fn edmig(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_edmig"))
        .current_dir(dir)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("Failed to execute CLI")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
