use std::{fmt, sync::Arc};

use miette::{MietteError, MietteSpanContents, SourceCode, SourceSpan, SpanContents};

/// A named piece of program text. Every [`Position`] keeps a handle to the
/// source it points into so that errors can be rendered long after lexing.
#[derive(Debug)]
pub struct Source {
    name: String,
    text: String,
}

impl Source {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Arc<Self> {
        Arc::new(Source {
            name: name.into(),
            text: text.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl SourceCode for Source {
    fn read_span<'a>(
        &'a self,
        span: &SourceSpan,
        context_lines_before: usize,
        context_lines_after: usize,
    ) -> Result<Box<dyn SpanContents<'a> + 'a>, MietteError> {
        let contents =
            self.text
                .as_str()
                .read_span(span, context_lines_before, context_lines_after)?;
        Ok(Box::new(MietteSpanContents::new_named(
            self.name.clone(),
            contents.data(),
            *contents.span(),
            contents.line(),
            contents.column(),
            contents.line_count(),
        )))
    }
}

/// A location in a [`Source`]: byte offset, zero-based line and zero-based
/// column (counted in characters).
///
/// Positions are values. Advancing one never affects the copies already held
/// by tokens or nodes.
#[derive(Clone)]
pub struct Position {
    pub index: usize,
    pub line: usize,
    pub column: usize,
    source: Arc<Source>,
}

impl Position {
    pub fn start(source: Arc<Source>) -> Self {
        Position {
            index: 0,
            line: 0,
            column: 0,
            source,
        }
    }

    pub fn advance(&mut self, current: char) -> &mut Self {
        self.index += current.len_utf8();
        self.column += 1;
        if current == '\n' {
            self.line += 1;
            self.column = 0;
        }
        self
    }

    /// A copy of this position moved past `current`.
    pub fn advanced(&self, current: char) -> Self {
        let mut next = self.clone();
        next.advance(current);
        next
    }

    pub fn source(&self) -> &Arc<Source> {
        &self.source
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
            && self.line == other.line
            && self.column == other.column
            && self.source.name == other.source.name
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{}",
            self.source.name,
            self.line + 1,
            self.column + 1
        )
    }
}

/// Start and end positions of a token or node; `end` is exclusive.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Span { start, end }
    }

    /// The span from the start of `self` to the end of `other`.
    pub fn to(&self, other: &Span) -> Span {
        Span::new(self.start.clone(), other.end.clone())
    }

    pub fn source(&self) -> &Arc<Source> {
        self.start.source()
    }
}

impl From<&Span> for SourceSpan {
    fn from(span: &Span) -> Self {
        let end = span.end.index.max(span.start.index);
        SourceSpan::from(span.start.index..end)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn advancing_over_newline_resets_column() {
        let source = Source::new("<test>", "a\nb");
        let mut position = Position::start(source);
        position.advance('a');
        assert_eq!((position.index, position.line, position.column), (1, 0, 1));
        position.advance('\n');
        assert_eq!((position.index, position.line, position.column), (2, 1, 0));
    }

    #[test]
    fn copies_do_not_move_with_the_original() {
        let mut position = Position::start(Source::new("<test>", "xy"));
        let snapshot = position.clone();
        position.advance('x');
        assert_eq!(snapshot.index, 0);
        assert_eq!(position.index, 1);
    }

    #[test]
    fn multibyte_characters_advance_by_their_utf8_width() {
        let mut position = Position::start(Source::new("<test>", "é"));
        position.advance('é');
        assert_eq!(position.index, 2);
        assert_eq!(position.column, 1);
    }
}
