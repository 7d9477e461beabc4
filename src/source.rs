use crate::lexer::{LineBreaks, Span};
use compact_str::CompactString;
use std::sync::Arc;

/// A named piece of program text.
#[derive(Debug)]
pub struct SourceFile {
    name: CompactString,
    text: String,
    line_breaks: LineBreaks,
}

impl SourceFile {
    pub fn new(name: &str, text: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            text: text.to_string(),
            line_breaks: LineBreaks::new(text),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// 1-based line and column of the start of a span.
    pub fn position(&self, span: Span) -> (u32, u32) {
        self.line_breaks.get_position(span.start)
    }
}
