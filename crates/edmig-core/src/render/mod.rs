//! Rendering: request/context values, the per-document driver, and a
//! minimal template pipeline used as the reference host renderer.

pub mod context;
pub mod driver;
pub mod template;

pub use context::{PreviewRequest, RenderContext, SiteAddress};
pub use driver::{OutputCapture, RenderDriver, RenderOutcome};
pub use template::{TemplateDocument, TemplatePipeline, TemplateSource};
