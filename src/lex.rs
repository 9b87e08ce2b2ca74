use std::{fmt::Display, sync::Arc};

use crate::{
    error::Error,
    span::{Position, Source, Span},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Var,
    And,
    Or,
    Not,
    If,
    Elif,
    Else,
    For,
    To,
    Step,
    While,
    Func,
    End,
    Return,
    Continue,
    Break,
}

impl Keyword {
    pub const ALL: [Keyword; 16] = [
        Keyword::Var,
        Keyword::And,
        Keyword::Or,
        Keyword::Not,
        Keyword::If,
        Keyword::Elif,
        Keyword::Else,
        Keyword::For,
        Keyword::To,
        Keyword::Step,
        Keyword::While,
        Keyword::Func,
        Keyword::End,
        Keyword::Return,
        Keyword::Continue,
        Keyword::Break,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Var => "var",
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Not => "not",
            Keyword::If => "if",
            Keyword::Elif => "elif",
            Keyword::Else => "else",
            Keyword::For => "for",
            Keyword::To => "to",
            Keyword::Step => "step",
            Keyword::While => "while",
            Keyword::Func => "func",
            Keyword::End => "end",
            Keyword::Return => "return",
            Keyword::Continue => "continue",
            Keyword::Break => "break",
        }
    }

    pub fn lookup(word: &str) -> Option<Keyword> {
        Keyword::ALL.into_iter().find(|keyword| keyword.as_str() == word)
    }

    /// The keyword `word` most likely misspells: same length, exactly one
    /// character different.
    pub fn suggest(word: &str) -> Option<Keyword> {
        Keyword::ALL.into_iter().find(|keyword| {
            let candidate = keyword.as_str();
            candidate.chars().count() == word.chars().count()
                && candidate.chars().zip(word.chars()).filter(|(a, b)| a != b).count() == 1
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Int(i64),
    Float(f64),
    String(String),
    Ident(String),
    Keyword(Keyword),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Equal,
    EqualEqual,
    BangEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Arrow,
    LeftParen,
    RightParen,
    LeftSquare,
    RightSquare,
    LeftBrace,
    RightBrace,
    Colon,
    Comma,
    Dot,
    Newline,
    /// A comment or `}` followed a function definition without a blank line
    /// in between. Passed through for tooling; the parser skips it.
    NoBlankLine,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(name) => Some(name),
            _ => None,
        }
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Int(n) => write!(f, "INT:{n}"),
            TokenKind::Float(n) => write!(f, "FLOAT:{n:?}"),
            TokenKind::String(s) => write!(f, "STRING:{s}"),
            TokenKind::Ident(name) => write!(f, "IDENTIFIER:{name}"),
            TokenKind::Keyword(keyword) => write!(f, "KEYWORD:{}", keyword.as_str()),
            TokenKind::Plus => write!(f, "PLUS"),
            TokenKind::Minus => write!(f, "MINUS"),
            TokenKind::Star => write!(f, "MULTIPLY"),
            TokenKind::Slash => write!(f, "DIVIDE"),
            TokenKind::Caret => write!(f, "POWER"),
            TokenKind::Equal => write!(f, "EQUAL"),
            TokenKind::EqualEqual => write!(f, "EQUAL_EQUAL"),
            TokenKind::BangEqual => write!(f, "NOT_EQUAL"),
            TokenKind::Less => write!(f, "LESS_THAN"),
            TokenKind::Greater => write!(f, "GREATER_THAN"),
            TokenKind::LessEqual => write!(f, "LESS_THAN_EQUAL"),
            TokenKind::GreaterEqual => write!(f, "GREATER_THAN_EQUAL"),
            TokenKind::Arrow => write!(f, "ARROW"),
            TokenKind::LeftParen => write!(f, "LEFT_PAREN"),
            TokenKind::RightParen => write!(f, "RIGHT_PAREN"),
            TokenKind::LeftSquare => write!(f, "LEFT_SQUARE"),
            TokenKind::RightSquare => write!(f, "RIGHT_SQUARE"),
            TokenKind::LeftBrace => write!(f, "LEFT_BRACE"),
            TokenKind::RightBrace => write!(f, "RIGHT_BRACE"),
            TokenKind::Colon => write!(f, "COLON"),
            TokenKind::Comma => write!(f, "COMMA"),
            TokenKind::Dot => write!(f, "DOT"),
            TokenKind::Newline => write!(f, "NEWLINE"),
            TokenKind::NoBlankLine => write!(f, "NO_BLANK_LINE"),
            TokenKind::Eof => write!(f, "END_OF_FILE"),
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}:{}]",
            self.kind,
            self.span.start.line + 1,
            self.span.start.column + 1
        )
    }
}

pub struct Lexer<'de> {
    rest: &'de str,
    position: Position,
    pending: Option<Token>,
    newlines_since_func: usize,
    after_func: bool,
    finished: bool,
}

impl<'de> Lexer<'de> {
    pub fn new(filename: &str, input: &'de str) -> Self {
        Lexer {
            rest: input,
            position: Position::start(Source::new(filename, input)),
            pending: None,
            newlines_since_func: 0,
            after_func: false,
            finished: false,
        }
    }

    pub fn source(&self) -> &Arc<Source> {
        self.position.source()
    }

    /// Lexes the whole input, ending with an `Eof` token, or stops at the
    /// first lexical error.
    pub fn tokenize(self) -> Result<Vec<Token>, Error> {
        self.collect()
    }

    fn bump(&mut self) -> Option<char> {
        let mut chars = self.rest.chars();
        let c = chars.next()?;
        self.rest = chars.as_str();
        self.position.advance(c);
        Some(c)
    }

    fn bump_while(&mut self, mut keep: impl FnMut(char) -> bool) -> &'de str {
        let start = self.rest;
        let len = start.find(|c| !keep(c)).unwrap_or(start.len());
        for c in start[..len].chars() {
            self.position.advance(c);
        }
        self.rest = &start[len..];
        &start[..len]
    }

    fn span_from(&self, start: &Position) -> Span {
        Span::new(start.clone(), self.position.clone())
    }

    fn blank_line_marker(&mut self, at: &Position) -> Option<Token> {
        (self.after_func && self.newlines_since_func < 2).then(|| Token {
            kind: TokenKind::NoBlankLine,
            span: Span::new(at.clone(), at.clone()),
        })
    }

    fn skip_line_comment(&mut self) {
        self.bump_while(|c| c != '\n');
    }

    fn skip_block_comment(&mut self) {
        let mut depth = 1;
        while depth > 0 {
            if self.rest.starts_with("/*") {
                self.bump();
                self.bump();
                depth += 1;
            } else if self.rest.starts_with("*/") {
                self.bump();
                self.bump();
                depth -= 1;
            } else if self.bump().is_none() {
                break;
            }
        }
    }

    fn string(&mut self, start: Position) -> Result<Token, Error> {
        let mut value = String::new();
        let mut escaped = false;
        loop {
            let Some(c) = self.bump() else {
                return Err(Error::expected_character(
                    self.span_from(&start),
                    "'\"' to close the string literal",
                ));
            };
            match c {
                _ if escaped => {
                    value.push(match c {
                        'n' => '\n',
                        't' => '\t',
                        other => other,
                    });
                    escaped = false;
                }
                '\\' => escaped = true,
                '"' => break,
                c => value.push(c),
            }
        }
        Ok(Token {
            kind: TokenKind::String(value),
            span: self.span_from(&start),
        })
    }

    fn number(&mut self, start: Position) -> Result<Token, Error> {
        let mut dotted = false;
        let literal = self.bump_while(|c| match c {
            '0'..='9' => true,
            '.' if !dotted => {
                dotted = true;
                true
            }
            _ => false,
        });
        let span = self.span_from(&start);

        let kind = if dotted {
            literal.parse().map(TokenKind::Float).ok()
        } else {
            literal.parse().map(TokenKind::Int).ok()
        };
        match kind {
            Some(kind) => Ok(Token { kind, span }),
            None => Err(Error::illegal_character(
                span,
                format!("'{literal}' is not a representable number"),
            )),
        }
    }

    fn word(&mut self, start: Position) -> Token {
        let literal = self.bump_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let kind = match Keyword::lookup(literal) {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Ident(literal.to_string()),
        };
        Token {
            kind,
            span: self.span_from(&start),
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(pending) = self.pending.take() {
            return Some(Ok(pending));
        }
        loop {
            let start = self.position.clone();
            let Some(c) = self.rest.chars().next() else {
                if self.finished {
                    return None;
                }
                self.finished = true;
                return Some(Ok(Token {
                    kind: TokenKind::Eof,
                    span: Span::new(start.clone(), start),
                }));
            };

            enum Start {
                Comment,
                BlockComment,
                Newline,
                String,
                Number,
                Word,
                Bang,
                Equal,
                OrEqual(TokenKind, TokenKind),
                Single(TokenKind),
            }

            let started = match c {
                ' ' | '\t' | '\r' => {
                    self.bump();
                    continue;
                }
                '#' => Start::Comment,
                '/' if self.rest.starts_with("//") => Start::Comment,
                '/' if self.rest.starts_with("/*") => Start::BlockComment,
                ';' | '\n' => Start::Newline,
                '"' => Start::String,
                '0'..='9' => Start::Number,
                'a'..='z' | 'A'..='Z' | '_' => Start::Word,
                '!' => Start::Bang,
                '=' => Start::Equal,
                '<' => Start::OrEqual(TokenKind::LessEqual, TokenKind::Less),
                '>' => Start::OrEqual(TokenKind::GreaterEqual, TokenKind::Greater),
                '+' => Start::Single(TokenKind::Plus),
                '-' => Start::Single(TokenKind::Minus),
                '*' => Start::Single(TokenKind::Star),
                '/' => Start::Single(TokenKind::Slash),
                '^' => Start::Single(TokenKind::Caret),
                '(' => Start::Single(TokenKind::LeftParen),
                ')' => Start::Single(TokenKind::RightParen),
                '[' => Start::Single(TokenKind::LeftSquare),
                ']' => Start::Single(TokenKind::RightSquare),
                '{' => Start::Single(TokenKind::LeftBrace),
                '}' => Start::Single(TokenKind::RightBrace),
                ':' => Start::Single(TokenKind::Colon),
                ',' => Start::Single(TokenKind::Comma),
                '.' => Start::Single(TokenKind::Dot),
                c => {
                    self.bump();
                    return Some(Err(Error::illegal_character(
                        self.span_from(&start),
                        format!("'{c}'"),
                    )));
                }
            };

            let token = match started {
                Start::Comment => {
                    self.skip_line_comment();
                    match self.blank_line_marker(&start) {
                        Some(marker) => return Some(Ok(marker)),
                        None => continue,
                    }
                }
                Start::BlockComment => {
                    self.bump();
                    self.bump();
                    self.skip_block_comment();
                    match self.blank_line_marker(&start) {
                        Some(marker) => return Some(Ok(marker)),
                        None => continue,
                    }
                }
                Start::Newline => {
                    self.bump();
                    self.newlines_since_func += 1;
                    if self.newlines_since_func >= 2 {
                        self.after_func = false;
                    }
                    Token {
                        kind: TokenKind::Newline,
                        span: self.span_from(&start),
                    }
                }
                Start::String => {
                    self.bump();
                    match self.string(start) {
                        Ok(token) => token,
                        Err(e) => return Some(Err(e)),
                    }
                }
                Start::Number => {
                    self.newlines_since_func = 0;
                    match self.number(start) {
                        Ok(token) => token,
                        Err(e) => return Some(Err(e)),
                    }
                }
                Start::Word => {
                    self.newlines_since_func = 0;
                    let token = self.word(start);
                    if token.is_keyword(Keyword::Func) {
                        self.after_func = true;
                    }
                    token
                }
                Start::Bang => {
                    self.bump();
                    if self.rest.starts_with('=') {
                        self.bump();
                        Token {
                            kind: TokenKind::BangEqual,
                            span: self.span_from(&start),
                        }
                    } else {
                        return Some(Err(Error::expected_character(
                            self.span_from(&start),
                            "'=' (after '!')",
                        )));
                    }
                }
                Start::Equal => {
                    self.bump();
                    let kind = if self.rest.starts_with('=') {
                        self.bump();
                        TokenKind::EqualEqual
                    } else if self.rest.starts_with('>') {
                        self.bump();
                        TokenKind::Arrow
                    } else {
                        TokenKind::Equal
                    };
                    Token {
                        kind,
                        span: self.span_from(&start),
                    }
                }
                Start::OrEqual(yes, no) => {
                    self.bump();
                    let kind = if self.rest.starts_with('=') {
                        self.bump();
                        yes
                    } else {
                        no
                    };
                    Token {
                        kind,
                        span: self.span_from(&start),
                    }
                }
                Start::Single(kind) => {
                    self.bump();
                    let token = Token {
                        kind,
                        span: self.span_from(&start),
                    };
                    if token.kind == TokenKind::RightBrace {
                        if let Some(marker) = self.blank_line_marker(&start) {
                            self.pending = Some(token);
                            return Some(Ok(marker));
                        }
                    }
                    token
                }
            };
            return Some(Ok(token));
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new("<test>", input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn int_plus_float() {
        assert_eq!(
            kinds("1 + 2.5"),
            vec![
                TokenKind::Int(1),
                TokenKind::Plus,
                TokenKind::Float(2.5),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn a_second_dot_ends_the_number() {
        assert_eq!(
            kinds("1.2.3"),
            vec![
                TokenKind::Float(1.2),
                TokenKind::Dot,
                TokenKind::Int(3),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("var counter_1 : not x"),
            vec![
                TokenKind::Keyword(Keyword::Var),
                TokenKind::Ident("counter_1".into()),
                TokenKind::Colon,
                TokenKind::Keyword(Keyword::Not),
                TokenKind::Ident("x".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn two_character_operators() {
        assert_eq!(
            kinds("!= == => <= >= < > ="),
            vec![
                TokenKind::BangEqual,
                TokenKind::EqualEqual,
                TokenKind::Arrow,
                TokenKind::LessEqual,
                TokenKind::GreaterEqual,
                TokenKind::Less,
                TokenKind::Greater,
                TokenKind::Equal,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            kinds(r#""a\tb\n\"q\" \z""#),
            vec![TokenKind::String("a\tb\n\"q\" z".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn semicolons_and_newlines_separate_statements() {
        assert_eq!(
            kinds("a;b\nc"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Newline,
                TokenKind::Ident("b".into()),
                TokenKind::Newline,
                TokenKind::Ident("c".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn comments_are_skipped_but_keep_the_line_break() {
        assert_eq!(
            kinds("a # note\nb // more\nc /* x /* nested */ y */ / d"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Newline,
                TokenKind::Ident("b".into()),
                TokenKind::Newline,
                TokenKind::Ident("c".into()),
                TokenKind::Slash,
                TokenKind::Ident("d".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn unterminated_block_comment_runs_to_the_end() {
        assert_eq!(kinds("a /* never closed"), vec![
            TokenKind::Ident("a".into()),
            TokenKind::Eof
        ]);
    }

    #[test]
    fn illegal_character_has_a_one_character_span() {
        let error = Lexer::new("<test>", "1 + @").tokenize().unwrap_err();
        assert_eq!(error.kind, crate::error::ErrorKind::IllegalCharacter);
        assert_eq!(error.details, "'@'");
        assert_eq!((error.span.start.index, error.span.end.index), (4, 5));
    }

    #[test]
    fn lone_bang_expects_an_equals_sign() {
        let error = Lexer::new("<test>", "!x").tokenize().unwrap_err();
        assert_eq!(error.kind, crate::error::ErrorKind::ExpectedCharacter);
    }

    #[test]
    fn unterminated_string_is_reported() {
        let error = Lexer::new("<test>", "\"abc").tokenize().unwrap_err();
        assert_eq!(error.kind, crate::error::ErrorKind::ExpectedCharacter);
        assert_eq!((error.span.start.index, error.span.end.index), (0, 4));
    }

    #[test]
    fn comment_right_after_a_function_is_flagged() {
        let flagged = kinds("func f() => 1\n# comment\nf()");
        assert!(flagged.contains(&TokenKind::NoBlankLine));

        let spaced = kinds("func f() => 1\n\n# comment\nf()");
        assert!(!spaced.contains(&TokenKind::NoBlankLine));
    }

    #[test]
    fn closing_brace_after_a_function_is_flagged_before_the_brace() {
        let tokens = kinds("func f() {\nreturn 1\n}");
        let brace = tokens
            .iter()
            .position(|kind| *kind == TokenKind::RightBrace)
            .unwrap();
        assert_eq!(tokens[brace - 1], TokenKind::NoBlankLine);
    }

    #[test]
    fn spans_track_lines_and_columns() {
        let tokens = Lexer::new("<test>", "a\n  bc").tokenize().unwrap();
        let bc = &tokens[2];
        assert_eq!((bc.span.start.line, bc.span.start.column), (1, 2));
        assert_eq!((bc.span.end.line, bc.span.end.column), (1, 4));
    }

    #[test]
    fn lexing_is_deterministic() {
        let input = "func f(int a) => a ^ 2\nvar x : [1, \"two\", 3.0]\n";
        assert_eq!(
            Lexer::new("<a>", input).tokenize().unwrap(),
            Lexer::new("<a>", input).tokenize().unwrap()
        );
    }

    #[test]
    fn keyword_suggestions() {
        assert_eq!(Keyword::suggest("whle"), None);
        assert_eq!(Keyword::suggest("whilw"), Some(Keyword::While));
        assert_eq!(Keyword::suggest("fro"), None);
        assert_eq!(Keyword::suggest("fir"), Some(Keyword::For));
    }
}
