//! SQLite repository implementation
//!
//! One connection serves every port a migration run needs: document lookup,
//! editable records, users and templates. Renames go through a single
//! SQLite transaction opened by `ElementStore::begin`.

#![allow(clippy::result_large_err)]

use crate::db;
use crate::errors::{from_rusqlite, invalid_row, Result};
use crate::migrations::apply_migrations;
use edmig_core::errors::Result as MigrationResult;
use edmig_core::model::{DocumentHandle, DocumentId, DocumentKind, EditableName, User};
use edmig_core::ports::{DocumentStore, ElementStore, RenameTransaction, UserDirectory};
use edmig_core::render::{TemplateDocument, TemplateSource};
use rusqlite::{Connection, OptionalExtension, Transaction};
use std::path::Path;

/// SQLite repository for documents, editables and users
pub struct SqliteRepo {
    conn: Connection,
}

impl SqliteRepo {
    /// Wrap an already configured and migrated connection
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open the store at `path`, creating and migrating it as needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(db::open_store(path)?))
    }

    /// Fresh migrated in-memory store
    pub fn in_memory() -> Result<Self> {
        let mut conn = db::open_in_memory()?;
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self::new(conn))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Insert or replace a document row
    pub fn put_document(
        &self,
        document: &DocumentHandle,
        template: &str,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO documents (id, kind, path, template, published)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    kind = excluded.kind,
                    path = excluded.path,
                    template = excluded.template,
                    published = excluded.published",
                rusqlite::params![
                    document.id.get(),
                    document.kind.as_str(),
                    document.path,
                    template,
                    document.published,
                ],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    /// Store an editable record under `name`
    pub fn put_editable(
        &self,
        document_id: DocumentId,
        name: &EditableName,
        kind: &str,
        data: &serde_json::Value,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO document_editables (document_id, name, kind, data)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![document_id.get(), name.as_str(), kind, data.to_string()],
            )
            .map_err(|e| from_rusqlite(e).with_document_id(document_id).with_name(name.as_str()))?;
        Ok(())
    }

    /// Insert or update a user
    pub fn put_user(&self, user: &User) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO users (name, admin) VALUES (?1, ?2)
                 ON CONFLICT(name) DO UPDATE SET admin = excluded.admin",
                rusqlite::params![user.name, user.admin],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    /// Stored editable names of one document, sorted
    pub fn editable_names(&self, document_id: DocumentId) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM document_editables WHERE document_id = ?1 ORDER BY name")
            .map_err(from_rusqlite)?;
        let names = stmt
            .query_map([document_id.get()], |row| row.get(0))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<String>, _>>()
            .map_err(from_rusqlite)?;
        Ok(names)
    }

    /// Stored payload of one editable
    pub fn editable_data(
        &self,
        document_id: DocumentId,
        name: &str,
    ) -> Result<Option<serde_json::Value>> {
        let raw: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT data FROM document_editables WHERE document_id = ?1 AND name = ?2",
                rusqlite::params![document_id.get(), name],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?;

        match raw.flatten() {
            None => Ok(None),
            Some(s) => serde_json::from_str(&s)
                .map(Some)
                .map_err(|e| invalid_row("document_editables", e)),
        }
    }
}

fn document_id_from_row(id: i64) -> Result<DocumentId> {
    DocumentId::new(id).map_err(|e| invalid_row("documents", e))
}

impl DocumentStore for SqliteRepo {
    fn resolve(&self, id: DocumentId) -> MigrationResult<Option<DocumentHandle>> {
        let row: Option<(String, String, bool)> = self
            .conn
            .query_row(
                "SELECT kind, path, published FROM documents WHERE id = ?1",
                [id.get()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(from_rusqlite)?;

        Ok(row.map(|(kind, path, published)| DocumentHandle {
            id,
            kind: DocumentKind::parse(&kind),
            path,
            published,
        }))
    }

    fn list_all_ids(&self, kinds: &[DocumentKind]) -> MigrationResult<Vec<DocumentId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, kind FROM documents ORDER BY id")
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        let mut ids = Vec::with_capacity(rows.len());
        for (id, kind) in rows {
            if kinds.contains(&DocumentKind::parse(&kind)) {
                ids.push(document_id_from_row(id)?);
            }
        }
        Ok(ids)
    }
}

impl ElementStore for SqliteRepo {
    fn exists(&self, document_id: DocumentId, name: &EditableName) -> MigrationResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM document_editables WHERE document_id = ?1 AND name = ?2",
                rusqlite::params![document_id.get(), name.as_str()],
                |_| Ok(()),
            )
            .optional()
            .map_err(from_rusqlite)?;
        Ok(found.is_some())
    }

    fn begin(&self) -> MigrationResult<Box<dyn RenameTransaction + '_>> {
        let tx = self.conn.unchecked_transaction().map_err(from_rusqlite)?;
        Ok(Box::new(SqliteRenameTransaction { tx }))
    }
}

/// Open rename transaction; dropping it rolls back
struct SqliteRenameTransaction<'conn> {
    tx: Transaction<'conn>,
}

impl RenameTransaction for SqliteRenameTransaction<'_> {
    fn update_name(
        &mut self,
        document_id: DocumentId,
        old_name: &EditableName,
        new_name: &EditableName,
    ) -> MigrationResult<usize> {
        let rows = self
            .tx
            .execute(
                "UPDATE document_editables SET name = ?3 WHERE document_id = ?1 AND name = ?2",
                rusqlite::params![document_id.get(), old_name.as_str(), new_name.as_str()],
            )
            .map_err(|e| {
                from_rusqlite(e)
                    .with_op("rename_editable")
                    .with_document_id(document_id)
                    .with_name(old_name.as_str())
            })?;
        Ok(rows)
    }

    fn commit(self: Box<Self>) -> MigrationResult<()> {
        self.tx.commit().map_err(from_rusqlite)?;
        Ok(())
    }

    fn rollback(self: Box<Self>) -> MigrationResult<()> {
        self.tx.rollback().map_err(from_rusqlite)?;
        Ok(())
    }
}

impl UserDirectory for SqliteRepo {
    fn find_user(&self, name: &str) -> MigrationResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT name, admin FROM users WHERE name = ?1",
                [name],
                |row| Ok(User::new(row.get::<_, String>(0)?, row.get::<_, bool>(1)?)),
            )
            .optional()
            .map_err(from_rusqlite)?;
        Ok(user)
    }
}

impl TemplateSource for SqliteRepo {
    fn load_template(&self, document_id: DocumentId) -> MigrationResult<Option<TemplateDocument>> {
        let template = self
            .conn
            .query_row(
                "SELECT template, published FROM documents WHERE id = ?1",
                [document_id.get()],
                |row| {
                    Ok(TemplateDocument {
                        body: row.get(0)?,
                        published: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(from_rusqlite)?;
        Ok(template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: i64) -> DocumentId {
        DocumentId::new(id).unwrap()
    }

    fn repo_with_page() -> SqliteRepo {
        let repo = SqliteRepo::in_memory().unwrap();
        repo.put_document(
            &DocumentHandle::new(doc(1), DocumentKind::Page, "/home"),
            "{{ input \"a\" }}",
        )
        .unwrap();
        repo.put_editable(
            doc(1),
            &EditableName::new("a").unwrap(),
            "input",
            &serde_json::json!("Hello"),
        )
        .unwrap();
        repo
    }

    #[test]
    fn test_resolve_document() {
        let repo = repo_with_page();
        let handle = repo.resolve(doc(1)).unwrap().unwrap();
        assert_eq!(handle.kind, DocumentKind::Page);
        assert_eq!(handle.path, "/home");
        assert!(repo.resolve(doc(2)).unwrap().is_none());
    }

    #[test]
    fn test_dropped_transaction_rolls_back() {
        let repo = repo_with_page();
        {
            let mut tx = repo.begin().unwrap();
            let rows = tx
                .update_name(
                    doc(1),
                    &EditableName::new("a").unwrap(),
                    &EditableName::new("x").unwrap(),
                )
                .unwrap();
            assert_eq!(rows, 1);
        }
        assert_eq!(repo.editable_names(doc(1)).unwrap(), vec!["a"]);
    }

    #[test]
    fn test_editable_data_survives_rename() {
        let repo = repo_with_page();
        let mut tx = repo.begin().unwrap();
        tx.update_name(
            doc(1),
            &EditableName::new("a").unwrap(),
            &EditableName::new("x").unwrap(),
        )
        .unwrap();
        tx.commit().unwrap();

        assert_eq!(
            repo.editable_data(doc(1), "x").unwrap(),
            Some(serde_json::json!("Hello"))
        );
        assert_eq!(repo.editable_data(doc(1), "a").unwrap(), None);
    }
}
