//! Naming strategies
//!
//! A naming strategy turns the structural position of an editable into the
//! name it is stored under. Strategies are compared by their descriptor
//! (identifier plus options), never by the names they produce.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{MigrationError, Result};
use crate::model::{EditableName, EditablePosition};

/// Canonical description of a configured strategy
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrategyDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

impl StrategyDescriptor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for StrategyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)?;
        if !self.options.is_empty() {
            let opts: Vec<String> = self
                .options
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, "({})", opts.join(","))?;
        }
        Ok(())
    }
}

/// Maps an editable's structural position to its canonical name
pub trait NamingStrategy: Send + Sync {
    fn descriptor(&self) -> StrategyDescriptor;

    /// Resolve the stored name for an editable at `position`
    ///
    /// # Errors
    /// * `Naming` - If the position cannot be expressed under this strategy
    fn resolve(&self, position: &EditablePosition) -> Result<EditableName>;
}

pub const LEGACY: &str = "legacy";
pub const NESTED: &str = "nested";

/// Declared name followed by every enclosing block's name and index
///
/// `content` inside block `main` (iteration 2) becomes `contentmain2`.
#[derive(Debug, Clone, Default)]
pub struct LegacyNamingStrategy;

impl NamingStrategy for LegacyNamingStrategy {
    fn descriptor(&self) -> StrategyDescriptor {
        StrategyDescriptor::new(LEGACY)
    }

    fn resolve(&self, position: &EditablePosition) -> Result<EditableName> {
        let mut name = position.declared_name.clone();
        for frame in &position.blocks {
            name.push_str(&frame.name);
            name.push_str(&frame.index.to_string());
        }
        EditableName::new(name)
    }
}

/// Block path prefix with `:` before the index and `.` between levels
///
/// `content` inside block `main` (iteration 2) becomes `main:2.content`.
#[derive(Debug, Clone, Default)]
pub struct NestedNamingStrategy;

impl NestedNamingStrategy {
    fn check_segment(segment: &str) -> Result<()> {
        if segment.contains(':') || segment.contains('.') {
            return Err(MigrationError::Naming {
                strategy: NESTED.to_string(),
                reason: format!("'{}' contains a reserved character (':' or '.')", segment),
            });
        }
        Ok(())
    }
}

impl NamingStrategy for NestedNamingStrategy {
    fn descriptor(&self) -> StrategyDescriptor {
        StrategyDescriptor::new(NESTED)
    }

    fn resolve(&self, position: &EditablePosition) -> Result<EditableName> {
        Self::check_segment(&position.declared_name)?;

        let mut parts = Vec::with_capacity(position.blocks.len() + 1);
        for frame in &position.blocks {
            Self::check_segment(&frame.name)?;
            parts.push(format!("{}:{}", frame.name, frame.index));
        }
        parts.push(position.declared_name.clone());
        EditableName::new(parts.join("."))
    }
}

/// Build the built-in strategy `descriptor` names
///
/// Built-ins take no options, so a descriptor resolves only when it is
/// exactly what the strategy itself reports.
///
/// # Errors
/// * `UnknownStrategy` - If no strategy is registered under the id
/// * `InvalidStrategyOption` - If the descriptor carries an option the strategy does not accept
pub fn strategy_by_id(descriptor: &StrategyDescriptor) -> Result<Box<dyn NamingStrategy>> {
    let strategy: Box<dyn NamingStrategy> = match descriptor.id.as_str() {
        LEGACY => Box::new(LegacyNamingStrategy),
        NESTED => Box::new(NestedNamingStrategy),
        other => {
            return Err(MigrationError::UnknownStrategy {
                strategy: other.to_string(),
            })
        }
    };

    let accepted = strategy.descriptor();
    if let Some(option) = descriptor
        .options
        .keys()
        .find(|key| !accepted.options.contains_key(*key))
    {
        return Err(MigrationError::InvalidStrategyOption {
            strategy: descriptor.id.clone(),
            option: option.clone(),
        });
    }
    Ok(strategy)
}

/// Descriptors of all built-in strategies
pub fn available_strategies() -> Vec<StrategyDescriptor> {
    vec![
        LegacyNamingStrategy.descriptor(),
        NestedNamingStrategy.descriptor(),
    ]
}
