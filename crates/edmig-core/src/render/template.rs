//! Minimal template renderer
//!
//! Serves as the host rendering pipeline for the CLI. A template is plain
//! text with two kinds of tags:
//!
//! ```text
//! {{ input "headline" }}
//! {{ block "main" count=2 }}
//!   {{ wysiwyg "content" }}
//! {{ /block }}
//! ```
//!
//! Any single word other than `block` names an editable type. Blocks repeat
//! their body `count` times and may nest. Editable names are produced by the
//! context's current naming strategy, which is what makes the stored names
//! observable to a `RenderObserver`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;

use super::context::{PreviewRequest, RenderContext};
use crate::errors::{MigrationError, Result};
use crate::model::{BlockFrame, DocumentId, EditablePosition};
use crate::naming::{strategy_by_id, NamingStrategy};
use crate::ports::{EditableEvent, RenderObserver, RenderPipeline};

/// Stored template of one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDocument {
    pub published: bool,
    pub body: String,
}

/// Where templates come from
pub trait TemplateSource {
    fn load_template(&self, document_id: DocumentId) -> Result<Option<TemplateDocument>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Text(String),
    Editable {
        kind: String,
        name: String,
    },
    Block {
        name: String,
        count: u32,
        body: Vec<Node>,
    },
}

pub struct TemplatePipeline<'a> {
    source: &'a dyn TemplateSource,
    cache: RefCell<HashMap<DocumentId, Vec<Node>>>,
}

impl<'a> TemplatePipeline<'a> {
    pub fn new(source: &'a dyn TemplateSource) -> Self {
        Self {
            source,
            cache: RefCell::new(HashMap::new()),
        }
    }

    fn nodes_for(&self, document_id: DocumentId, body: &str, cache: bool) -> Result<Vec<Node>> {
        if cache {
            if let Some(nodes) = self.cache.borrow().get(&document_id) {
                return Ok(nodes.clone());
            }
        }
        let nodes = parse(body)?;
        if cache {
            self.cache.borrow_mut().insert(document_id, nodes.clone());
        }
        Ok(nodes)
    }
}

impl RenderPipeline for TemplatePipeline<'_> {
    fn render(
        &self,
        request: &PreviewRequest,
        context: &RenderContext,
        output: &mut dyn Write,
        observer: &mut dyn RenderObserver,
    ) -> Result<()> {
        let template = self
            .source
            .load_template(request.document_id)?
            .ok_or_else(|| MigrationError::Render {
                document_id: request.document_id,
                message: format!("no template for {}", request.path),
            })?;

        if !template.published && !context.show_unpublished {
            return Err(MigrationError::Render {
                document_id: request.document_id,
                message: format!("{} is not published", request.path),
            });
        }

        let nodes = self.nodes_for(request.document_id, &template.body, context.cache_enabled)?;
        let current = strategy_by_id(&context.strategy)?;
        let mut walker = Walker {
            document_id: request.document_id,
            strategy: current.as_ref(),
            output,
            observer,
            stack: Vec::new(),
        };
        walker.walk(&nodes)
    }
}

struct Walker<'w> {
    document_id: DocumentId,
    strategy: &'w dyn NamingStrategy,
    output: &'w mut dyn Write,
    observer: &'w mut dyn RenderObserver,
    stack: Vec<BlockFrame>,
}

impl Walker<'_> {
    fn walk(&mut self, nodes: &[Node]) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => self.emit(text)?,
                Node::Editable { kind, name } => {
                    let position = EditablePosition::new(kind.clone(), name.clone())
                        .within(self.stack.clone());
                    let rendered = self.strategy.resolve(&position)?;
                    self.emit(&format!(
                        "<div class=\"editable-{}\" data-name=\"{}\"></div>",
                        kind, rendered
                    ))?;
                    self.observer.on_editable(&EditableEvent {
                        document_id: self.document_id,
                        name: rendered,
                        position,
                    })?;
                }
                Node::Block { name, count, body } => {
                    for index in 1..=*count {
                        self.stack.push(BlockFrame::new(name.clone(), index));
                        let result = self.walk(body);
                        self.stack.pop();
                        result?;
                    }
                }
            }
        }
        Ok(())
    }

    fn emit(&mut self, text: &str) -> Result<()> {
        self.output
            .write_all(text.as_bytes())
            .map_err(|e| MigrationError::Render {
                document_id: self.document_id,
                message: format!("output write failed: {}", e),
            })
    }
}

fn template_error(line: usize, message: impl Into<String>) -> MigrationError {
    MigrationError::Template {
        line,
        message: message.into(),
    }
}

fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

fn parse(source: &str) -> Result<Vec<Node>> {
    // Each open block keeps its (name, count, line, children) until `/block`
    let mut open: Vec<(String, u32, usize, Vec<Node>)> = Vec::new();
    let mut root = Vec::new();
    let mut rest = source;
    let mut offset = 0;

    fn push(open: &mut [(String, u32, usize, Vec<Node>)], root: &mut Vec<Node>, node: Node) {
        match open.last_mut() {
            Some((_, _, _, children)) => children.push(node),
            None => root.push(node),
        }
    }

    while let Some(start) = rest.find("{{") {
        if start > 0 {
            push(&mut open, &mut root, Node::Text(rest[..start].to_string()));
        }
        let tag_line = line_of(source, offset + start);
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or_else(|| template_error(tag_line, "unclosed tag"))?;
        let tag = after[..end].trim();

        if tag == "/block" {
            let (name, count, _, body) = open
                .pop()
                .ok_or_else(|| template_error(tag_line, "'/block' without open block"))?;
            push(&mut open, &mut root, Node::Block { name, count, body });
        } else {
            let (kind, name, args) = parse_tag(tag, tag_line)?;
            if kind == "block" {
                let count = parse_count(args, tag_line)?;
                open.push((name, count, tag_line, Vec::new()));
            } else {
                if !args.is_empty() {
                    return Err(template_error(
                        tag_line,
                        format!("unexpected arguments for '{}'", kind),
                    ));
                }
                push(
                    &mut open,
                    &mut root,
                    Node::Editable {
                        kind: kind.to_string(),
                        name,
                    },
                );
            }
        }

        let consumed = start + 2 + end + 2;
        offset += consumed;
        rest = &rest[consumed..];
    }

    if let Some((name, _, line, _)) = open.pop() {
        return Err(template_error(line, format!("block '{}' is never closed", name)));
    }
    if !rest.is_empty() {
        root.push(Node::Text(rest.to_string()));
    }
    Ok(root)
}

/// Split `kind "name" args...`
fn parse_tag(tag: &str, line: usize) -> Result<(&str, String, &str)> {
    let (kind, rest) = tag
        .split_once(char::is_whitespace)
        .ok_or_else(|| template_error(line, format!("tag '{}' has no name", tag)))?;
    if kind.is_empty() || !kind.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(template_error(line, format!("invalid editable type '{}'", kind)));
    }

    let rest = rest.trim_start();
    let quoted = rest
        .strip_prefix('"')
        .ok_or_else(|| template_error(line, "editable name must be quoted"))?;
    let close = quoted
        .find('"')
        .ok_or_else(|| template_error(line, "unterminated editable name"))?;
    let name = &quoted[..close];
    if name.trim().is_empty() {
        return Err(template_error(line, "editable name must not be empty"));
    }
    Ok((kind, name.to_string(), quoted[close + 1..].trim()))
}

fn parse_count(args: &str, line: usize) -> Result<u32> {
    if args.is_empty() {
        return Ok(1);
    }
    let value = args
        .strip_prefix("count=")
        .ok_or_else(|| template_error(line, format!("unexpected block arguments '{}'", args)))?;
    value
        .trim()
        .parse()
        .map_err(|_| template_error(line, format!("invalid block count '{}'", value)))
}
