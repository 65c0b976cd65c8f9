use crate::errors::{MigrationError, Result};
use crate::model::{DocumentHandle, DocumentId, User};
use crate::naming::StrategyDescriptor;

/// Base address preview requests are built against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteAddress {
    scheme: String,
    domain: String,
}

impl SiteAddress {
    /// Build a site address from a configured domain
    ///
    /// A domain given as a full URL (`https://example.com/`) keeps its scheme;
    /// a bare host takes `default_scheme`.
    ///
    /// # Errors
    /// * `MissingDomain` - If the domain is empty
    pub fn new(domain: &str, default_scheme: &str) -> Result<Self> {
        let domain = domain.trim().trim_end_matches('/');
        let (scheme, host) = match domain.split_once("://") {
            Some((scheme, host)) => (scheme, host),
            None => (default_scheme, domain),
        };
        if host.is_empty() {
            return Err(MigrationError::MissingDomain);
        }
        Ok(Self {
            scheme: scheme.to_string(),
            domain: host.to_string(),
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.domain)
    }
}

/// Synthetic preview request for one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRequest {
    pub document_id: DocumentId,
    pub path: String,
    pub url: String,
}

impl PreviewRequest {
    pub fn for_document(document: &DocumentHandle, site: &SiteAddress) -> Self {
        let path = if document.path.starts_with('/') {
            document.path.clone()
        } else {
            format!("/{}", document.path)
        };
        Self {
            document_id: document.id,
            url: format!("{}{}?preview=true", site.base_url(), path),
            path,
        }
    }
}

/// Everything a batch render needs beyond the request itself
///
/// Elevated, uncached, non-editmode rendering is expressed here as a value
/// handed to each render instead of process-wide switches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderContext {
    pub user: User,
    /// Render unpublished documents
    pub show_unpublished: bool,
    pub cache_enabled: bool,
    pub editmode: bool,
    /// Strategy the stored names currently follow
    pub strategy: StrategyDescriptor,
}

impl RenderContext {
    /// Admin preview: unpublished visible, caching off, editmode off
    pub fn admin_preview(user: User, strategy: StrategyDescriptor) -> Self {
        Self {
            user,
            show_unpublished: true,
            cache_enabled: false,
            editmode: false,
            strategy,
        }
    }
}
