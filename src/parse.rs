use std::rc::Rc;

use crate::{
    ast::{BinaryOp, Branch, ClassDef, ElseBranch, FuncDef, Node, NodeKind, Param, TypeName, UnaryOp},
    error::Error,
    lex::{Keyword, Lexer, Token, TokenKind},
    span::{Position, Span},
};

const EXPECTED_STATEMENT: &str = "Expected 'return', 'continue', 'break', 'var', 'if', 'for', \
     'while', 'func', int, float, identifier, '+', '-', '(', '[' or 'not'";
const EXPECTED_EXPRESSION: &str =
    "Expected 'var', 'if', 'for', 'while', 'func', int, float, identifier, '+', '-', '(', '[' or 'not'";
const EXPECTED_OPERAND: &str =
    "Expected int, float, identifier, '+', '-', '(', '[', 'if', 'for', 'while', 'func' or 'not'";
const EXPECTED_ATOM: &str =
    "Expected int, float, identifier, '+', '-', '(', '[', 'if', 'for', 'while', 'func'";

/// Recursive descent over a fully lexed token vector.
///
/// Statement sequences parse each statement speculatively and rewind the
/// cursor when one fails. The furthest error seen so far is remembered, so a
/// failure that surfaces late (for example as a leftover token at the top
/// level) reports the deepest cause instead.
pub struct Parser {
    tokens: Vec<Token>,
    cursor: usize,
    furthest: Option<Error>,
}

type ParseResult<T> = Result<T, Error>;

impl Parser {
    pub fn new(filename: &str, input: &str) -> Result<Self, Error> {
        let tokens: Vec<Token> = Lexer::new(filename, input)
            .tokenize()?
            .into_iter()
            .filter(|token| token.kind != TokenKind::NoBlankLine)
            .collect();
        tracing::debug!(filename, tokens = tokens.len(), "lexed source");
        Ok(Parser {
            tokens,
            cursor: 0,
            furthest: None,
        })
    }

    pub fn parse(mut self) -> Result<Node, Error> {
        let program = self.statements()?;
        let leftover = self.current().clone();
        if leftover.kind != TokenKind::Eof {
            let details = match (&leftover.kind, &self.peek().kind) {
                (TokenKind::Ident(name), TokenKind::Equal) => format!(
                    "Unexpected identifier '{name}'. Use ':' to assign, '=' only declares typed constants"
                ),
                (TokenKind::Ident(name), _) => format!(
                    "Unexpected identifier '{name}'. Did you forget to use 'var' for variable declaration?"
                ),
                (TokenKind::Equal, _) => {
                    "Unexpected '='. Use ':' to assign, '=' only declares typed constants".to_string()
                }
                (kind, _) => format!("Unexpected token '{kind}'"),
            };
            return Err(self.error(Error::invalid_syntax(leftover.span, details)));
        }
        tracing::debug!("parsed program");
        Ok(program)
    }

    fn current(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.cursor.min(last)]
    }

    fn peek(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.cursor + 1).min(last)]
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if token.kind != TokenKind::Eof {
            self.cursor += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        &self.current().kind == kind
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.current().is_keyword(keyword)
    }

    fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    /// End of the last consumed token, or the start of the current one when
    /// nothing was consumed yet.
    fn previous_end(&self) -> Position {
        match self.cursor.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            Some(token) => token.span.end.clone(),
            None => self.current().span.start.clone(),
        }
    }

    fn span_from(&self, start: &Position) -> Span {
        let end = self.previous_end();
        if end.index < start.index {
            Span::new(start.clone(), start.clone())
        } else {
            Span::new(start.clone(), end)
        }
    }

    /// Keeps whichever of `error` and the furthest error so far starts
    /// later; ties go to the one recorded first, which is the more specific.
    fn error(&mut self, error: Error) -> Error {
        match &self.furthest {
            Some(furthest) if furthest.span.start.index >= error.span.start.index => {
                furthest.clone()
            }
            _ => {
                self.furthest = Some(error.clone());
                error
            }
        }
    }

    fn error_here(&mut self, details: impl Into<String>) -> Error {
        let span = self.current().span.clone();
        self.error(Error::invalid_syntax(span, details))
    }

    fn expect(&mut self, kind: TokenKind, details: &str) -> ParseResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(details))
        }
    }

    fn expect_ident(&mut self, details: &str) -> ParseResult<(String, Span)> {
        match &self.current().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                let token = self.advance();
                Ok((name, token.span))
            }
            _ => Err(self.error_here(details)),
        }
    }

    fn statements(&mut self) -> ParseResult<Node> {
        let start = self.current().span.start.clone();
        let mut statements = Vec::new();
        loop {
            self.skip_newlines();
            let checkpoint = self.cursor;
            match self.statement() {
                Ok(statement) => statements.push(statement),
                Err(_) => {
                    self.cursor = checkpoint;
                    break;
                }
            }
            if !self.check(&TokenKind::Newline) {
                break;
            }
        }

        let span = match (statements.first(), statements.last()) {
            (Some(first), Some(last)) => first.span.to(&last.span),
            _ => Span::new(start.clone(), start),
        };
        Ok(Node::new(NodeKind::Block(statements), span))
    }

    fn statement(&mut self) -> ParseResult<Node> {
        let start = self.current().span.start.clone();

        if self.check_keyword(Keyword::Return) {
            self.advance();
            let checkpoint = self.cursor;
            let value = match self.expression() {
                Ok(value) => Some(Box::new(value)),
                Err(_) => {
                    self.cursor = checkpoint;
                    None
                }
            };
            return Ok(Node::new(NodeKind::Return(value), self.span_from(&start)));
        }
        if self.check_keyword(Keyword::Continue) {
            let token = self.advance();
            return Ok(Node::new(NodeKind::Continue, token.span));
        }
        if self.check_keyword(Keyword::Break) {
            let token = self.advance();
            return Ok(Node::new(NodeKind::Break, token.span));
        }

        if let (TokenKind::Ident(name), TokenKind::Colon) = (&self.current().kind, &self.peek().kind) {
            let name = name.clone();
            self.advance();
            self.advance();
            let value = self.expression()?;
            let span = self.span_from(&start);
            return Ok(Node::new(
                NodeKind::Reassign {
                    name,
                    value: Box::new(value),
                },
                span,
            ));
        }

        let expression = match self.expression() {
            Ok(expression) => expression,
            Err(_) => return Err(self.error_here(EXPECTED_STATEMENT)),
        };

        if self.check(&TokenKind::Colon) {
            if let NodeKind::AttrAccess { object, name } = expression.kind {
                self.advance();
                let value = self.expression()?;
                let span = self.span_from(&start);
                return Ok(Node::new(
                    NodeKind::AttrAssign {
                        object,
                        name,
                        value: Box::new(value),
                    },
                    span,
                ));
            }
        }
        Ok(expression)
    }

    fn expression(&mut self) -> ParseResult<Node> {
        let start = self.current().span.start.clone();

        if self.check_keyword(Keyword::Var) {
            self.advance();
            let (name, _) = self.expect_ident("Expected identifier")?;
            self.expect(TokenKind::Colon, "Expected ':'")?;
            let value = self.expression()?;
            let span = self.span_from(&start);
            return Ok(Node::new(
                NodeKind::VarAssign {
                    name,
                    ty: None,
                    constant: false,
                    value: Box::new(value),
                },
                span,
            ));
        }

        let declared = match (&self.current().kind, &self.peek().kind) {
            (TokenKind::Ident(word), TokenKind::Ident(_)) => TypeName::lookup(word),
            _ => None,
        };
        if let Some(ty) = declared {
            self.advance();
            let (name, _) = self.expect_ident("Expected identifier")?;
            let constant = match self.current().kind {
                TokenKind::Equal => true,
                TokenKind::Colon => false,
                _ => {
                    return Err(
                        self.error_here("Expected '=' (for constants) or ':' (for variables)")
                    );
                }
            };
            self.advance();
            let value = self.expression()?;
            let span = self.span_from(&start);
            return Ok(Node::new(
                NodeKind::VarAssign {
                    name,
                    ty: Some(ty),
                    constant,
                    value: Box::new(value),
                },
                span,
            ));
        }

        match self.binary(Self::comparison, logical_op, Self::comparison) {
            Ok(node) => Ok(node),
            Err(_) => Err(self.error_here(EXPECTED_EXPRESSION)),
        }
    }

    fn binary(
        &mut self,
        operand: fn(&mut Self) -> ParseResult<Node>,
        operator: fn(&TokenKind) -> Option<BinaryOp>,
        right_operand: fn(&mut Self) -> ParseResult<Node>,
    ) -> ParseResult<Node> {
        let mut left = operand(self)?;
        while let Some(op) = operator(&self.current().kind) {
            self.advance();
            let right = right_operand(self)?;
            let span = left.span.to(&right.span);
            left = Node::new(
                NodeKind::BinaryOp {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn comparison(&mut self) -> ParseResult<Node> {
        if self.check_keyword(Keyword::Not) {
            let token = self.advance();
            let operand = self.comparison()?;
            let span = token.span.to(&operand.span);
            return Ok(Node::new(
                NodeKind::UnaryOp {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                span,
            ));
        }

        match self.binary(Self::arith, comparison_op, Self::arith) {
            Ok(node) => Ok(node),
            Err(_) => Err(self.error_here(EXPECTED_OPERAND)),
        }
    }

    fn arith(&mut self) -> ParseResult<Node> {
        self.binary(Self::term, additive_op, Self::term)
    }

    fn term(&mut self) -> ParseResult<Node> {
        self.binary(Self::factor, multiplicative_op, Self::factor)
    }

    fn factor(&mut self) -> ParseResult<Node> {
        let op = match self.current().kind {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            _ => return self.power(),
        };
        let token = self.advance();
        let operand = self.factor()?;
        let span = token.span.to(&operand.span);
        Ok(Node::new(
            NodeKind::UnaryOp {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn power(&mut self) -> ParseResult<Node> {
        self.binary(Self::call, power_op, Self::factor)
    }

    fn call(&mut self) -> ParseResult<Node> {
        let mut node = self.atom()?;
        loop {
            match self.current().kind {
                TokenKind::LeftParen => {
                    let args = self.arguments(
                        TokenKind::RightParen,
                        "Expected ')', 'var', 'if', 'for', 'while', 'func', int, float, identifier, '+', '-', '(', '[' or 'not'",
                        "Expected ',' or ')'",
                    )?;
                    let span = self.span_from(&node.span.start);
                    node = Node::new(
                        NodeKind::Call {
                            callee: Box::new(node),
                            args,
                        },
                        span,
                    );
                }
                TokenKind::LeftSquare => {
                    self.advance();
                    let index = self.expression()?;
                    self.expect(TokenKind::RightSquare, "Expected ']'")?;
                    let span = self.span_from(&node.span.start);
                    node = Node::new(
                        NodeKind::Index {
                            target: Box::new(node),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                TokenKind::Dot => {
                    self.advance();
                    let (name, _) = self.expect_ident("Expected attribute name after '.'")?;
                    let object = Box::new(node);
                    if self.check(&TokenKind::LeftParen) {
                        let args = self.arguments(
                            TokenKind::RightParen,
                            "Expected ')', 'var', 'if', 'for', 'while', 'func', int, float, identifier, '+', '-', '(', '[' or 'not'",
                            "Expected ',' or ')'",
                        )?;
                        let span = self.span_from(&object.span.start);
                        node = Node::new(NodeKind::MethodCall { object, name, args }, span);
                    } else {
                        let span = self.span_from(&object.span.start);
                        node = Node::new(NodeKind::AttrAccess { object, name }, span);
                    }
                }
                _ => return Ok(node),
            }
        }
    }

    /// A comma separated expression list between the current opening token
    /// and `close`.
    fn arguments(&mut self, close: TokenKind, first: &str, separator: &str) -> ParseResult<Vec<Node>> {
        self.advance();
        let mut nodes = Vec::new();
        if self.check(&close) {
            self.advance();
            return Ok(nodes);
        }

        match self.expression() {
            Ok(node) => nodes.push(node),
            Err(_) => return Err(self.error_here(first)),
        }
        while self.check(&TokenKind::Comma) {
            self.advance();
            nodes.push(self.expression()?);
        }
        self.expect(close, separator)?;
        Ok(nodes)
    }

    fn atom(&mut self) -> ParseResult<Node> {
        let token = self.current().clone();
        match &token.kind {
            TokenKind::Int(n) => {
                self.advance();
                Ok(Node::new(NodeKind::Int(*n), token.span))
            }
            TokenKind::Float(n) => {
                self.advance();
                Ok(Node::new(NodeKind::Float(*n), token.span))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Node::new(NodeKind::String(s.clone()), token.span))
            }
            TokenKind::Ident(name) => {
                let next_is_name = matches!(self.peek().kind, TokenKind::Ident(_));
                if name == "class" && next_is_name {
                    return self.class_definition();
                }
                if name == "new" && next_is_name {
                    return self.instance_creation();
                }
                let next_is_operand = matches!(
                    self.peek().kind,
                    TokenKind::Int(_) | TokenKind::Float(_) | TokenKind::String(_) | TokenKind::Ident(_)
                );
                if let Some(keyword) = Keyword::suggest(name).filter(|_| next_is_operand) {
                    let details = format!(
                        "Unexpected identifier '{name}'. Did you mean '{}'?",
                        keyword.as_str()
                    );
                    return Err(self.error(Error::invalid_syntax(token.span, details)));
                }
                self.advance();
                Ok(Node::new(NodeKind::VarAccess(name.clone()), token.span))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expression = self.expression()?;
                self.expect(TokenKind::RightParen, "Expected ')'")?;
                Ok(expression)
            }
            TokenKind::LeftSquare => {
                let elements = self.arguments(
                    TokenKind::RightSquare,
                    "Expected ']', 'var', 'if', 'for', 'while', 'func', int, float, identifier, '+', '-', '(', '[' or 'not'",
                    "Expected ',' or ']'",
                )?;
                Ok(Node::new(NodeKind::List(elements), self.span_from(&token.span.start)))
            }
            TokenKind::Keyword(Keyword::If) => self.if_expression(),
            TokenKind::Keyword(Keyword::For) => self.for_expression(),
            TokenKind::Keyword(Keyword::While) => self.while_expression(),
            TokenKind::Keyword(Keyword::Func) => {
                let def = self.function_definition()?;
                let span = self.span_from(&token.span.start);
                Ok(Node::new(NodeKind::FuncDef(Rc::new(def)), span))
            }
            _ => Err(self.error_here(EXPECTED_ATOM)),
        }
    }

    fn if_expression(&mut self) -> ParseResult<Node> {
        let start = self.advance().span.start;
        let mut branches = Vec::new();
        let mut else_branch = None;

        loop {
            let condition = self.expression()?;
            let (body, emits_null) = self.branch_body()?;
            branches.push(Branch {
                condition,
                body,
                emits_null,
            });

            let checkpoint = self.cursor;
            self.skip_newlines();
            if self.check_keyword(Keyword::Elif) {
                self.advance();
                continue;
            }
            if self.check_keyword(Keyword::Else) {
                self.advance();
                let (body, emits_null) = self.branch_body()?;
                else_branch = Some(Box::new(ElseBranch { body, emits_null }));
            } else {
                self.cursor = checkpoint;
            }
            break;
        }

        Ok(Node::new(
            NodeKind::If {
                branches,
                else_branch,
            },
            self.span_from(&start),
        ))
    }

    /// `:` or `{`, then either a newline and a statement sequence (the branch
    /// emits null) or a single statement whose value is the branch value.
    fn branch_body(&mut self) -> ParseResult<(Node, bool)> {
        let braced = match self.current().kind {
            TokenKind::Colon => false,
            TokenKind::LeftBrace => true,
            _ => return Err(self.error_here("Expected ':' or '{'")),
        };
        self.advance();

        let body = if self.check(&TokenKind::Newline) {
            self.advance();
            (self.statements()?, true)
        } else {
            (self.statement()?, false)
        };
        if braced {
            self.skip_newlines();
            self.expect(TokenKind::RightBrace, "Expected '}'")?;
        }
        Ok(body)
    }

    fn for_expression(&mut self) -> ParseResult<Node> {
        let start = self.advance().span.start;
        let (var, _) = self.expect_ident("Expected identifier")?;
        self.expect(TokenKind::Equal, "Expected '='")?;
        let from = self.expression()?;
        if !self.check_keyword(Keyword::To) {
            return Err(self.error_here("Expected 'to'"));
        }
        self.advance();
        let to = self.expression()?;
        let step = if self.check_keyword(Keyword::Step) {
            self.advance();
            Some(Box::new(self.expression()?))
        } else {
            None
        };

        let (body, emits_null) = match self.current().kind {
            TokenKind::Colon => {
                self.advance();
                if self.check(&TokenKind::Newline) {
                    self.advance();
                    let body = self.statements()?;
                    self.expect_end()?;
                    (body, true)
                } else {
                    (self.statement()?, false)
                }
            }
            TokenKind::LeftBrace => {
                self.advance();
                let body = self.statements()?;
                self.expect(TokenKind::RightBrace, "Expected '}'")?;
                (body, true)
            }
            _ => return Err(self.error_here("Expected ':' or '{'")),
        };

        Ok(Node::new(
            NodeKind::For {
                var,
                start: Box::new(from),
                end: Box::new(to),
                step,
                body: Box::new(body),
                emits_null,
            },
            self.span_from(&start),
        ))
    }

    fn while_expression(&mut self) -> ParseResult<Node> {
        let start = self.advance().span.start;
        let condition = self.expression()?;

        let (body, emits_null) = match self.current().kind {
            TokenKind::LeftBrace => {
                self.advance();
                let body = self.statements()?;
                self.expect(TokenKind::RightBrace, "Expected '}'")?;
                (body, true)
            }
            TokenKind::Colon if self.peek().kind != TokenKind::Newline => {
                self.advance();
                (self.statement()?, false)
            }
            TokenKind::Colon | TokenKind::Newline => {
                if self.check(&TokenKind::Colon) {
                    self.advance();
                }
                self.advance();
                let body = self.statements()?;
                self.expect_end()?;
                (body, true)
            }
            _ => return Err(self.error_here("Expected ':', '{' or NEWLINE")),
        };

        Ok(Node::new(
            NodeKind::While {
                condition: Box::new(condition),
                body: Box::new(body),
                emits_null,
            },
            self.span_from(&start),
        ))
    }

    fn expect_end(&mut self) -> ParseResult<()> {
        if !self.check_keyword(Keyword::End) {
            return Err(self.error_here("Expected 'end'"));
        }
        self.advance();
        Ok(())
    }

    fn function_definition(&mut self) -> ParseResult<FuncDef> {
        let start = self.advance().span.start;

        let name = match &self.current().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        };
        let open = if name.is_some() {
            "Expected '('"
        } else {
            "Expected identifier or '('"
        };
        self.expect(TokenKind::LeftParen, open)?;

        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                let ty = match self.current().ident().and_then(TypeName::lookup) {
                    Some(ty) => ty,
                    None => return Err(self.error_here("Expected type identifier")),
                };
                self.advance();
                let (name, span) = self.expect_ident("Expected parameter name after type")?;
                params.push(Param { name, ty, span });
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.expect(TokenKind::RightParen, "Expected ')', ',' or identifier")?;

        let (body, auto_return) = match self.current().kind {
            TokenKind::Arrow => {
                self.advance();
                (self.expression()?, true)
            }
            TokenKind::Keyword(Keyword::Return) => {
                let return_start = self.advance().span.start;
                let value = self.expression()?;
                let span = Span::new(return_start, value.span.end.clone());
                let ret = Node::new(NodeKind::Return(Some(Box::new(value))), span.clone());
                let body_span = Span::new(start.clone(), span.end);
                (Node::new(NodeKind::Block(vec![ret]), body_span), false)
            }
            TokenKind::LeftBrace | TokenKind::Colon => {
                self.advance();
                if self.check(&TokenKind::Newline) {
                    self.advance();
                }
                let body = self.statements()?;
                self.skip_newlines();
                if self.check(&TokenKind::RightBrace) || self.check_keyword(Keyword::End) {
                    self.advance();
                } else {
                    return Err(self.error_here("Expected '}' or 'end'"));
                }
                (body, false)
            }
            _ => return Err(self.error_here("Expected '=>', 'return', ':' or '{'")),
        };

        Ok(FuncDef {
            name,
            params,
            body,
            auto_return,
        })
    }

    fn class_definition(&mut self) -> ParseResult<Node> {
        let start = self.advance().span.start;
        let (name, _) = self.expect_ident("Expected class name")?;

        let parent = if self.current().ident() == Some("extends") {
            self.advance();
            Some(self.expect_ident("Expected parent class name")?.0)
        } else {
            None
        };

        let braced = match self.current().kind {
            TokenKind::LeftBrace => true,
            TokenKind::Colon => false,
            _ => return Err(self.error_here("Expected ':' or '{'")),
        };
        self.advance();

        let mut methods = Vec::new();
        loop {
            self.skip_newlines();
            if braced && self.check(&TokenKind::RightBrace)
                || !braced && self.check_keyword(Keyword::End)
            {
                self.advance();
                break;
            }
            if !self.check_keyword(Keyword::Func) {
                let close = if braced { "'}'" } else { "'end'" };
                return Err(self.error_here(format!("Expected 'func' or {close}")));
            }
            let method_start = self.current().span.clone();
            let method = self.function_definition()?;
            if method.name.is_none() {
                return Err(self.error(Error::invalid_syntax(
                    method_start,
                    "Expected a method name after 'func'",
                )));
            }
            methods.push(Rc::new(method));
        }

        Ok(Node::new(
            NodeKind::ClassDef(Rc::new(ClassDef {
                name,
                parent,
                methods,
            })),
            self.span_from(&start),
        ))
    }

    fn instance_creation(&mut self) -> ParseResult<Node> {
        let start = self.advance().span.start;
        let (class, _) = self.expect_ident("Expected class name")?;
        if !self.check(&TokenKind::LeftParen) {
            return Err(self.error_here("Expected '('"));
        }
        let args = self.arguments(
            TokenKind::RightParen,
            "Expected ')', 'var', 'if', 'for', 'while', 'func', int, float, identifier, '+', '-', '(', '[' or 'not'",
            "Expected ',' or ')'",
        )?;
        Ok(Node::new(NodeKind::New { class, args }, self.span_from(&start)))
    }
}

fn logical_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Keyword(Keyword::And) => Some(BinaryOp::And),
        TokenKind::Keyword(Keyword::Or) => Some(BinaryOp::Or),
        _ => None,
    }
}

fn comparison_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::EqualEqual => Some(BinaryOp::Eq),
        TokenKind::BangEqual => Some(BinaryOp::Ne),
        TokenKind::Less => Some(BinaryOp::Lt),
        TokenKind::Greater => Some(BinaryOp::Gt),
        TokenKind::LessEqual => Some(BinaryOp::Le),
        TokenKind::GreaterEqual => Some(BinaryOp::Ge),
        _ => None,
    }
}

fn additive_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Plus => Some(BinaryOp::Add),
        TokenKind::Minus => Some(BinaryOp::Sub),
        _ => None,
    }
}

fn multiplicative_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Star => Some(BinaryOp::Mul),
        TokenKind::Slash => Some(BinaryOp::Div),
        _ => None,
    }
}

fn power_op(kind: &TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Caret => Some(BinaryOp::Pow),
        _ => None,
    }
}
