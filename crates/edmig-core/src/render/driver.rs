use std::any::Any;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::context::{PreviewRequest, RenderContext, SiteAddress};
use crate::core_types::schema::OP_RENDER_DOCUMENT;
use crate::errors::MigrationError;
use crate::model::DocumentHandle;
use crate::ports::{RenderObserver, RenderPipeline};
use crate::{log_op_end, log_op_error, log_op_start};

/// Result of rendering one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RenderOutcome {
    Success,
    Failure { message: String },
}

impl RenderOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RenderOutcome::Success)
    }
}

/// Sink for render output that is never shown
///
/// Lives only for the duration of one render; whatever the pipeline wrote is
/// released when the capture goes out of scope, including during unwinding.
#[derive(Debug, Default)]
pub struct OutputCapture {
    buffer: Vec<u8>,
}

impl OutputCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Write for OutputCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Drives one document at a time through the host pipeline
pub struct RenderDriver<'a> {
    pipeline: &'a dyn RenderPipeline,
    context: &'a RenderContext,
    site: &'a SiteAddress,
}

impl<'a> RenderDriver<'a> {
    pub fn new(
        pipeline: &'a dyn RenderPipeline,
        context: &'a RenderContext,
        site: &'a SiteAddress,
    ) -> Self {
        Self {
            pipeline,
            context,
            site,
        }
    }

    /// Render `document`, reporting every editable to `observer`
    ///
    /// Never fails: pipeline errors and panics both come back as
    /// `RenderOutcome::Failure` so the batch can carry on.
    pub fn render(
        &self,
        document: &DocumentHandle,
        observer: &mut dyn RenderObserver,
    ) -> RenderOutcome {
        let start = Instant::now();
        let request = PreviewRequest::for_document(document, self.site);
        log_op_start!(
            OP_RENDER_DOCUMENT,
            document_id = document.id.get(),
            url = %request.url
        );

        let mut capture = OutputCapture::new();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.pipeline
                .render(&request, self.context, &mut capture, observer)
        }));
        let discarded = capture.len();
        drop(capture);

        let duration_ms = start.elapsed().as_millis() as u64;
        let message = match result {
            Ok(Ok(())) => {
                log_op_end!(
                    OP_RENDER_DOCUMENT,
                    duration_ms = duration_ms,
                    document_id = document.id.get(),
                    discarded_bytes = discarded
                );
                return RenderOutcome::Success;
            }
            Ok(Err(err)) => err.to_string(),
            Err(payload) => format!("render panicked: {}", panic_message(payload.as_ref())),
        };

        log_op_error!(
            OP_RENDER_DOCUMENT,
            MigrationError::Render {
                document_id: document.id,
                message: message.clone(),
            },
            duration_ms = duration_ms,
            document_id = document.id.get(),
            path = %document.path
        );
        RenderOutcome::Failure { message }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Result;
    use crate::model::{DocumentId, DocumentKind, EditableName, EditablePosition, User};
    use crate::naming::StrategyDescriptor;
    use crate::ports::EditableEvent;

    struct CountingObserver(usize);

    impl RenderObserver for CountingObserver {
        fn on_editable(&mut self, _event: &EditableEvent) -> Result<()> {
            self.0 += 1;
            Ok(())
        }
    }

    enum Behaviour {
        Ok,
        Fail,
        Panic,
    }

    struct ScriptedPipeline(Behaviour);

    impl RenderPipeline for ScriptedPipeline {
        fn render(
            &self,
            request: &PreviewRequest,
            _context: &RenderContext,
            output: &mut dyn Write,
            observer: &mut dyn RenderObserver,
        ) -> Result<()> {
            output.write_all(b"<html>").ok();
            observer.on_editable(&EditableEvent {
                document_id: request.document_id,
                name: EditableName::new("content").unwrap(),
                position: EditablePosition::new("input", "content"),
            })?;
            match self.0 {
                Behaviour::Ok => Ok(()),
                Behaviour::Fail => Err(MigrationError::Render {
                    document_id: request.document_id,
                    message: "template missing".to_string(),
                }),
                Behaviour::Panic => panic!("boom"),
            }
        }
    }

    fn fixture() -> (RenderContext, SiteAddress, DocumentHandle) {
        (
            RenderContext::admin_preview(User::new("admin", true), StrategyDescriptor::new("legacy")),
            SiteAddress::new("example.com", "https").unwrap(),
            DocumentHandle::new(DocumentId::new(10).unwrap(), DocumentKind::Page, "/home"),
        )
    }

    #[test]
    fn test_success() {
        let (ctx, site, doc) = fixture();
        let pipeline = ScriptedPipeline(Behaviour::Ok);
        let mut observer = CountingObserver(0);
        let outcome = RenderDriver::new(&pipeline, &ctx, &site).render(&doc, &mut observer);
        assert!(outcome.is_success());
        assert_eq!(observer.0, 1);
    }

    #[test]
    fn test_error_becomes_failure() {
        let (ctx, site, doc) = fixture();
        let pipeline = ScriptedPipeline(Behaviour::Fail);
        let outcome =
            RenderDriver::new(&pipeline, &ctx, &site).render(&doc, &mut CountingObserver(0));
        match outcome {
            RenderOutcome::Failure { message } => assert!(message.contains("template missing")),
            RenderOutcome::Success => panic!("expected failure"),
        }
    }

    #[test]
    fn test_panic_becomes_failure() {
        let (ctx, site, doc) = fixture();
        let pipeline = ScriptedPipeline(Behaviour::Panic);
        let outcome =
            RenderDriver::new(&pipeline, &ctx, &site).render(&doc, &mut CountingObserver(0));
        assert_eq!(
            outcome,
            RenderOutcome::Failure {
                message: "render panicked: boom".to_string()
            }
        );
    }

    #[test]
    fn test_output_capture_collects_bytes() {
        let mut capture = OutputCapture::new();
        assert!(capture.is_empty());
        capture.write_all(b"abc").unwrap();
        assert_eq!(capture.len(), 3);
    }
}
