use std::fmt::{self, Display};

use miette::{Diagnostic, LabeledSpan, SourceCode, SourceSpan};
use thiserror::Error;

use crate::{
    scope::Context,
    span::{Position, Span},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    IllegalCharacter,
    ExpectedCharacter,
    InvalidSyntax,
    ConstantReassignment,
    Runtime,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::IllegalCharacter => write!(f, "Illegal Character"),
            ErrorKind::ExpectedCharacter => write!(f, "Expected Character"),
            ErrorKind::InvalidSyntax => write!(f, "Invalid Syntax"),
            ErrorKind::ConstantReassignment => write!(f, "Constant Reassignment"),
            ErrorKind::Runtime => write!(f, "Runtime Error"),
        }
    }
}

/// One entry of a runtime traceback: the frame label and where execution was
/// inside that frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub label: String,
    pub position: Position,
}

/// Every failure the pipeline can produce, from an illegal character to a
/// runtime error deep in a call chain.
///
/// Runtime errors capture their call chain when they are created, so an
/// `Error` owns no interpreter state and can travel anywhere.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind}: {details}")]
pub struct Error {
    pub kind: ErrorKind,
    pub details: String,
    pub span: Span,
    pub traceback: Vec<Frame>,
}

impl Error {
    fn new(kind: ErrorKind, span: Span, details: impl Into<String>) -> Self {
        Error {
            kind,
            details: details.into(),
            span,
            traceback: Vec::new(),
        }
    }

    pub fn illegal_character(span: Span, details: impl Into<String>) -> Self {
        Error::new(ErrorKind::IllegalCharacter, span, details)
    }

    pub fn expected_character(span: Span, details: impl Into<String>) -> Self {
        Error::new(ErrorKind::ExpectedCharacter, span, details)
    }

    pub fn invalid_syntax(span: Span, details: impl Into<String>) -> Self {
        Error::new(ErrorKind::InvalidSyntax, span, details)
    }

    pub fn runtime(span: Span, details: impl Into<String>, context: &Context) -> Self {
        let traceback = capture_traceback(&span.start, context);
        Error {
            traceback,
            ..Error::new(ErrorKind::Runtime, span, details)
        }
    }

    pub fn constant_reassignment(span: Span, name: &str, context: &Context) -> Self {
        let traceback = capture_traceback(&span.start, context);
        Error {
            traceback,
            ..Error::new(
                ErrorKind::ConstantReassignment,
                span,
                format!("Cannot reassign constant '{name}'"),
            )
        }
    }

    /// Lexical and syntax errors abort before evaluation starts.
    pub fn is_static(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::IllegalCharacter | ErrorKind::ExpectedCharacter | ErrorKind::InvalidSyntax
        )
    }

    /// The plain text report shown to users.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.traceback.is_empty() {
            out.push_str(&format!("{}: {}\n", self.kind, self.details));
            out.push_str(&format!(
                "File {}, line {}\n",
                self.span.start.source_name(),
                self.span.start.line + 1
            ));
        } else {
            out.push_str("Traceback (most recent call last):\n");
            for frame in &self.traceback {
                out.push_str(&format!(
                    "  File {}, line {}, in {}\n",
                    frame.position.source_name(),
                    frame.position.line + 1,
                    frame.label
                ));
            }
            out.push_str(&format!("{}: {}\n", self.kind, self.details));
        }
        out.push('\n');
        out.push_str(&excerpt(&self.span));
        out
    }
}

fn capture_traceback(position: &Position, context: &Context) -> Vec<Frame> {
    let mut frames = Vec::new();
    let mut position = position.clone();
    let mut current = Some(context);
    while let Some(context) = current {
        frames.push(Frame {
            label: context.label.clone(),
            position: position.clone(),
        });
        if let Some(entry) = &context.entry {
            position = entry.clone();
        }
        current = context.parent.as_deref();
    }
    frames.reverse();
    frames
}

/// Source lines covered by `span`, each followed by a line of carets.
fn excerpt(span: &Span) -> String {
    let text = span.source().text();
    let lines: Vec<&str> = text.split('\n').collect();

    let first = span.start.line;
    let (last, last_to) = if span.end.line > first && span.end.column == 0 {
        // a span ending right after a newline points at the end of the line before
        (span.end.line - 1, None)
    } else {
        (span.end.line.max(first), Some(span.end.column))
    };

    let mut out = String::new();
    for line_number in first..=last {
        let line = lines
            .get(line_number)
            .copied()
            .unwrap_or("")
            .trim_end_matches('\r')
            .replace('\t', " ");
        let width = line.chars().count();
        let from = if line_number == first {
            span.start.column
        } else {
            0
        };
        let to = match last_to {
            Some(column) if line_number == last => column,
            _ => width.max(from + 1),
        };

        out.push_str(&line);
        out.push('\n');
        out.push_str(&" ".repeat(from));
        out.push_str(&"^".repeat(to.saturating_sub(from).max(1)));
        if line_number != last {
            out.push('\n');
        }
    }
    out
}

impl Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        Some(Box::new(self.kind))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        match self.kind {
            ErrorKind::ConstantReassignment => Some(Box::new(
                "declare the name with ':' instead of '=' to make it reassignable",
            )),
            ErrorKind::Runtime if self.traceback.len() > 1 => {
                let chain = self
                    .traceback
                    .iter()
                    .map(|frame| frame.label.as_str())
                    .collect::<Vec<_>>()
                    .join(" -> ");
                Some(Box::new(format!("call chain: {chain}")))
            }
            _ => None,
        }
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(self.span.source().as_ref())
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some("here".to_string()),
            SourceSpan::from(&self.span),
        ))))
    }
}
