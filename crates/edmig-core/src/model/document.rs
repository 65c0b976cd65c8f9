use serde::{Deserialize, Serialize};

use crate::errors::{MigrationError, Result};

/// Identifier of a stored document
///
/// Always a positive integer; zero and negative values are rejected at
/// construction so every `DocumentId` in the system is usable as a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct DocumentId(u32);

impl DocumentId {
    /// Create a DocumentId from a raw integer
    ///
    /// # Errors
    /// * `InvalidDocumentId` - If the value is not a positive 32-bit integer
    pub fn new(value: i64) -> Result<Self> {
        if value <= 0 || value > i64::from(u32::MAX) {
            return Err(MigrationError::InvalidDocumentId { value });
        }
        Ok(Self(value as u32))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for DocumentId {
    type Error = MigrationError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<DocumentId> for i64 {
    fn from(id: DocumentId) -> Self {
        i64::from(id.0)
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DocumentId {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| MigrationError::InvalidDocumentId { value: 0 })?;
        Self::new(value)
    }
}

/// Structural type of a document
///
/// Only the page-like kinds carry editables and can be migrated. Anything
/// the store reports that is not in this set is kept as `Other` so the
/// caller can report it instead of failing to load the row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Page,
    Snippet,
    Email,
    Newsletter,
    PrintPage,
    PrintContainer,
    Other(String),
}

impl DocumentKind {
    /// Kinds that carry editables
    pub const MIGRATABLE: [DocumentKind; 6] = [
        DocumentKind::Page,
        DocumentKind::Snippet,
        DocumentKind::Email,
        DocumentKind::Newsletter,
        DocumentKind::PrintPage,
        DocumentKind::PrintContainer,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            DocumentKind::Page => "page",
            DocumentKind::Snippet => "snippet",
            DocumentKind::Email => "email",
            DocumentKind::Newsletter => "newsletter",
            DocumentKind::PrintPage => "printpage",
            DocumentKind::PrintContainer => "printcontainer",
            DocumentKind::Other(kind) => kind,
        }
    }

    pub fn parse(kind: &str) -> Self {
        match kind {
            "page" => DocumentKind::Page,
            "snippet" => DocumentKind::Snippet,
            "email" => DocumentKind::Email,
            "newsletter" => DocumentKind::Newsletter,
            "printpage" => DocumentKind::PrintPage,
            "printcontainer" => DocumentKind::PrintContainer,
            other => DocumentKind::Other(other.to_string()),
        }
    }

    pub fn is_migratable(&self) -> bool {
        Self::MIGRATABLE.contains(self)
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved document, as returned by the document store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHandle {
    pub id: DocumentId,
    pub kind: DocumentKind,
    /// Site-absolute path, e.g. `/en/about`
    pub path: String,
    pub published: bool,
}

impl DocumentHandle {
    pub fn new(id: DocumentId, kind: DocumentKind, path: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            path: path.into(),
            published: true,
        }
    }

    pub fn unpublished(mut self) -> Self {
        self.published = false;
        self
    }

    /// Check that this document can take part in a migration
    ///
    /// # Errors
    /// * `DisallowedDocumentKind` - If the kind is not page-like
    pub fn ensure_migratable(&self) -> Result<()> {
        if self.kind.is_migratable() {
            Ok(())
        } else {
            Err(MigrationError::DisallowedDocumentKind {
                document_id: self.id,
                kind: self.kind.to_string(),
            })
        }
    }
}
