//! Configuration file support
//!
//! An optional `edmig.toml` in the working directory (or the file named by
//! `--config`) supplies defaults; command-line flags override it.
//!
//! ```toml
//! [site]
//! domain = "example.com"
//! scheme = "https"
//!
//! [naming]
//! current = "legacy"
//!
//! [store]
//! db = ".edmig/store.db"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "edmig.toml";
pub const DEFAULT_DB_PATH: &str = ".edmig/store.db";
pub const DEFAULT_SCHEME: &str = "https";
pub const DEFAULT_CURRENT_STRATEGY: &str = "legacy";

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub site: SiteSection,
    #[serde(default)]
    pub naming: NamingSection,
    #[serde(default)]
    pub store: StoreSection,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SiteSection {
    pub domain: Option<String>,
    pub scheme: Option<String>,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NamingSection {
    pub current: Option<String>,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StoreSection {
    pub db: Option<PathBuf>,
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(toml::from_str(text)?)
    }

    /// Load `explicit`, or `edmig.toml` if present, or nothing
    ///
    /// An explicitly named file must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let path = match explicit {
            Some(path) => path,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read config file {}: {}", path.display(), e))?;
        Self::parse(&text).map_err(|e| format!("Invalid config file {}: {}", path.display(), e).into())
    }
}

/// Values a migrate run needs after merging file and flags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub db: PathBuf,
    pub domain: Option<String>,
    pub scheme: String,
    pub current: String,
}

/// Command-line values that take precedence over the file
#[derive(Debug, Default)]
pub struct Overrides {
    pub db: Option<PathBuf>,
    pub domain: Option<String>,
    pub scheme: Option<String>,
    pub current: Option<String>,
}

impl ResolvedConfig {
    pub fn merge(file: FileConfig, flags: Overrides) -> Self {
        Self {
            db: flags
                .db
                .or(file.store.db)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            domain: flags.domain.or(file.site.domain),
            scheme: flags
                .scheme
                .or(file.site.scheme)
                .unwrap_or_else(|| DEFAULT_SCHEME.to_string()),
            current: flags
                .current
                .or(file.naming.current)
                .unwrap_or_else(|| DEFAULT_CURRENT_STRATEGY.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let file = FileConfig::parse(
            r#"
            [site]
            domain = "example.com"
            scheme = "http"
            [naming]
            current = "nested"
            [store]
            db = "data/site.db"
            "#,
        )
        .unwrap();

        assert_eq!(file.site.domain.as_deref(), Some("example.com"));
        assert_eq!(file.site.scheme.as_deref(), Some("http"));
        assert_eq!(file.naming.current.as_deref(), Some("nested"));
        assert_eq!(file.store.db, Some(PathBuf::from("data/site.db")));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(FileConfig::parse("[site]\nhost = \"example.com\"").is_err());
    }

    #[test]
    fn test_defaults_when_nothing_configured() {
        let resolved = ResolvedConfig::merge(FileConfig::default(), Overrides::default());
        assert_eq!(resolved.db, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(resolved.domain, None);
        assert_eq!(resolved.scheme, "https");
        assert_eq!(resolved.current, "legacy");
    }

    #[test]
    fn test_flags_override_file() {
        let file = FileConfig::parse("[site]\ndomain = \"file.example\"\n[naming]\ncurrent = \"legacy\"").unwrap();
        let flags = Overrides {
            domain: Some("flag.example".to_string()),
            ..Default::default()
        };

        let resolved = ResolvedConfig::merge(file, flags);

        assert_eq!(resolved.domain.as_deref(), Some("flag.example"));
        assert_eq!(resolved.current, "legacy");
    }
}
