use serde::{Deserialize, Serialize};

use crate::errors::{MigrationError, Result};

/// Name of an editable within one document
///
/// Unique only per document. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EditableName(String);

impl EditableName {
    /// # Errors
    /// * `InvalidEditableName` - If the name is empty or only whitespace
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(MigrationError::InvalidEditableName {
                reason: "editable name must not be empty".to_string(),
            });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EditableName {
    type Error = MigrationError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<EditableName> for String {
    fn from(name: EditableName) -> Self {
        name.0
    }
}

impl std::fmt::Display for EditableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One enclosing block on the way from the document root to an editable
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockFrame {
    /// Declared name of the block
    pub name: String,
    /// 1-based index of the block iteration currently rendered
    pub index: u32,
}

impl BlockFrame {
    pub fn new(name: impl Into<String>, index: u32) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }
}

/// Structural position of an editable inside a document render
///
/// This is the input to a naming strategy: the editable's declared name and
/// type plus the stack of blocks it sits in, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EditablePosition {
    /// Editable type as written in the template (`input`, `wysiwyg`, ...)
    pub kind: String,
    /// Name as declared in the template, before any strategy is applied
    pub declared_name: String,
    /// Enclosing blocks, outermost first
    pub blocks: Vec<BlockFrame>,
}

impl EditablePosition {
    pub fn new(kind: impl Into<String>, declared_name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            declared_name: declared_name.into(),
            blocks: Vec::new(),
        }
    }

    pub fn within(mut self, blocks: Vec<BlockFrame>) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn is_top_level(&self) -> bool {
        self.blocks.is_empty()
    }
}
