use std::rc::Rc;

use thiserror::Error;
use tracing::debug;

use crate::ast::{Expr, FunctionDecl, LiteralValue, NodeIds, Stmt};
use crate::diagnostics::{Diagnostic, DiagnosticSink, Phase};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Literal, Token, TokenKind};

const MAX_ARGUMENTS: usize = 255;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    pub token: Token,
    pub message: String,
}

impl ParseError {
    fn new(token: &Token, message: impl Into<String>) -> Self {
        Self {
            token: token.clone(),
            message: message.into(),
        }
    }
}

/// Returned instead of statements when at least one statement failed to parse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("parsing failed with {} error(s)", errors.len())]
pub struct ParseFailure {
    pub errors: Vec<ParseError>,
}

type ParseResult<T> = Result<T, ParseError>;

pub struct Parser<'a> {
    tokens: Vec<Token>,
    current: usize,
    ids: &'a mut NodeIds,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: Vec<Token>, ids: &'a mut NodeIds) -> Self {
        Self {
            tokens,
            current: 0,
            ids,
        }
    }

    /// Parses every declaration. A failed declaration is reported, the parser
    /// skips to the next statement boundary and keeps going.
    pub fn parse_program(mut self, sink: &mut dyn DiagnosticSink) -> Result<Vec<Stmt>, ParseFailure> {
        let mut statements = Vec::new();
        let mut errors = Vec::new();
        while !self.is_at_end() {
            match self.declaration() {
                Ok(statement) => statements.push(statement),
                Err(error) => {
                    sink.report(Diagnostic::at_token(Phase::Parse, &error.token, &error.message));
                    errors.push(error);
                    self.synchronize();
                }
            }
        }

        if errors.is_empty() {
            debug!(statements = statements.len(), "parsed program");
            Ok(statements)
        } else {
            Err(ParseFailure { errors })
        }
    }

    fn declaration(&mut self) -> ParseResult<Stmt> {
        ensure_sufficient_stack(|| {
            if self.match_kind(TokenKind::Fun) {
                return Ok(Stmt::Function(self.function()?));
            }
            if self.match_kind(TokenKind::Var) {
                return self.var_declaration();
            }
            if self.check(TokenKind::Class) {
                return Err(ParseError::new(self.peek(), "Classes are not supported."));
            }
            self.statement()
        })
    }

    fn function(&mut self) -> ParseResult<Rc<FunctionDecl>> {
        let name = self.consume(TokenKind::Identifier, "Expect function name.")?;
        self.consume(TokenKind::LeftParen, "Expect '(' after function name.")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= MAX_ARGUMENTS {
                    return Err(ParseError::new(
                        self.peek(),
                        format!("Can't have more than {MAX_ARGUMENTS} parameters."),
                    ));
                }
                params.push(self.consume(TokenKind::Identifier, "Expect parameter name.")?);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.")?;
        self.consume(TokenKind::LeftBrace, "Expect '{' before function body.")?;
        let body = self.block()?;
        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expect variable name.")?;
        let initializer = if self.match_kind(TokenKind::Equal) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.")?;
        Ok(Stmt::Var { name, initializer })
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        ensure_sufficient_stack(|| {
            match self.peek().kind {
                TokenKind::Print => {
                    let keyword = self.advance().clone();
                    let expression = self.expression()?;
                    self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
                    Ok(Stmt::Print { keyword, expression })
                }
                TokenKind::If => {
                    self.advance();
                    self.if_statement()
                }
                TokenKind::While => {
                    self.advance();
                    self.while_statement()
                }
                TokenKind::For => {
                    self.advance();
                    self.for_statement()
                }
                TokenKind::Return => {
                    let keyword = self.advance().clone();
                    let value = if self.check(TokenKind::Semicolon) {
                        None
                    } else {
                        Some(self.expression()?)
                    };
                    self.consume(TokenKind::Semicolon, "Expect ';' after return value.")?;
                    Ok(Stmt::Return { keyword, value })
                }
                TokenKind::LeftBrace => {
                    self.advance();
                    Ok(Stmt::Block(self.block()?))
                }
                _ => {
                    let expression = self.expression()?;
                    self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
                    Ok(Stmt::Expression(expression))
                }
            }
        })
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after if condition.")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_kind(TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    /// `for` has no node of its own: it becomes a block holding the
    /// initializer and a `while` whose body runs the increment last.
    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.")?;
        let initializer = if self.match_kind(TokenKind::Semicolon) {
            None
        } else if self.match_kind(TokenKind::Var) {
            Some(self.var_declaration()?)
        } else {
            let expression = self.expression()?;
            self.consume(TokenKind::Semicolon, "Expect ';' after loop initializer.")?;
            Some(Stmt::Expression(expression))
        };

        let condition = if self.check(TokenKind::Semicolon) {
            Expr::Literal(LiteralValue::Bool(true))
        } else {
            self.expression()?
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if self.check(TokenKind::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;
        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }
        let mut desugared = Stmt::While {
            condition,
            body: Box::new(body),
        };
        if let Some(initializer) = initializer {
            desugared = Stmt::Block(vec![initializer, desugared]);
        }
        Ok(desugared)
    }

    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.declaration()?);
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        ensure_sufficient_stack(|| {
            let expr = self.ternary()?;

            if self.check(TokenKind::Equal) || self.check(TokenKind::PlusEqual) || self.check(TokenKind::MinusEqual) {
                let operator = self.advance().clone();
                let value = self.assignment()?;

                let Expr::Variable { name, .. } = &expr else {
                    return Err(ParseError::new(&operator, "Invalid assignment target."));
                };
                let name = name.clone();
                // `a += b` assigns `a (+=) b`, which evaluates like `a + b`
                let value = if operator.kind == TokenKind::Equal {
                    value
                } else {
                    Expr::Binary {
                        left: Box::new(Expr::Variable {
                            id: self.ids.next_id(),
                            name: name.clone(),
                        }),
                        operator,
                        right: Box::new(value),
                    }
                };
                return Ok(Expr::Assign {
                    id: self.ids.next_id(),
                    name,
                    value: Box::new(value),
                });
            }

            Ok(expr)
        })
    }

    fn ternary(&mut self) -> ParseResult<Expr> {
        ensure_sufficient_stack(|| {
            let condition = self.or()?;
            if self.match_kind(TokenKind::Question) {
                let then_branch = self.expression()?;
                self.consume(TokenKind::Colon, "Expect ':' in conditional expression.")?;
                let else_branch = self.ternary()?;
                return Ok(Expr::Ternary {
                    condition: Box::new(condition),
                    then_branch: Box::new(then_branch),
                    else_branch: Box::new(else_branch),
                });
            }
            Ok(condition)
        })
    }

    fn or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.and()?;
        while self.check(TokenKind::Or) {
            let operator = self.advance().clone();
            let right = self.and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;
        while self.check(TokenKind::And) {
            let operator = self.advance().clone();
            let right = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        self.binary_level(&[TokenKind::BangEqual, TokenKind::EqualEqual], Self::comparison)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        self.binary_level(
            &[
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
            ],
            Self::term,
        )
    }

    fn term(&mut self) -> ParseResult<Expr> {
        self.binary_level(&[TokenKind::Minus, TokenKind::Plus], Self::factor)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        self.binary_level(&[TokenKind::Slash, TokenKind::Star], Self::unary)
    }

    fn binary_level(
        &mut self,
        operators: &[TokenKind],
        operand: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let mut expr = operand(self)?;
        while operators.contains(&self.peek().kind) {
            let operator = self.advance().clone();
            let right = operand(self)?;
            expr = Expr::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        ensure_sufficient_stack(|| {
            if self.check(TokenKind::Bang) || self.check(TokenKind::Minus) {
                let operator = self.advance().clone();
                let right = self.unary()?;
                return Ok(Expr::Unary {
                    operator,
                    right: Box::new(right),
                });
            }
            self.call()
        })
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;
        while self.match_kind(TokenKind::LeftParen) {
            let mut arguments = Vec::new();
            if !self.check(TokenKind::RightParen) {
                loop {
                    if arguments.len() >= MAX_ARGUMENTS {
                        return Err(ParseError::new(
                            self.peek(),
                            format!("Can't have more than {MAX_ARGUMENTS} arguments."),
                        ));
                    }
                    arguments.push(self.expression()?);
                    if !self.match_kind(TokenKind::Comma) {
                        break;
                    }
                }
            }
            let paren = self.consume(TokenKind::RightParen, "Expect ')' after arguments.")?;
            expr = Expr::Call {
                callee: Box::new(expr),
                paren,
                arguments,
            };
        }
        Ok(expr)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let token = self.peek().clone();
        let expr = match token.kind {
            TokenKind::False => Expr::Literal(LiteralValue::Bool(false)),
            TokenKind::True => Expr::Literal(LiteralValue::Bool(true)),
            TokenKind::Nil => Expr::Literal(LiteralValue::Nil),
            TokenKind::Number | TokenKind::String => match &token.literal {
                Some(Literal::Number(value)) => Expr::Literal(LiteralValue::Number(*value)),
                Some(Literal::Str(value)) => Expr::Literal(LiteralValue::Str(Rc::from(value.as_str()))),
                None => return Err(ParseError::new(&token, "Literal token without a value.")),
            },
            TokenKind::Identifier => Expr::Variable {
                id: self.ids.next_id(),
                name: token,
            },
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.expression()?;
                self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;
                return Ok(Expr::Grouping(Box::new(inner)));
            }
            TokenKind::Host => {
                self.advance();
                self.consume(TokenKind::LeftParen, "Expect '(' after 'host'.")?;
                let code = self.expression()?;
                self.consume(TokenKind::RightParen, "Expect ')' after host code.")?;
                return Ok(Expr::HostEscape {
                    keyword: token,
                    code: Box::new(code),
                });
            }
            TokenKind::This | TokenKind::Super => {
                return Err(ParseError::new(&token, "Classes are not supported."));
            }
            _ => return Err(ParseError::new(&token, "Expect expression.")),
        };
        self.advance();
        Ok(expr)
    }

    /// Discards tokens until a likely statement boundary.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }
}

impl Parser<'_> {
    fn consume(&mut self, kind: TokenKind, message: &str) -> ParseResult<Token> {
        if self.check(kind) {
            return Ok(self.advance().clone());
        }
        Err(ParseError::new(self.peek(), message))
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        // the scanner always terminates the stream with `Eof`
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }
}

pub fn parse_tokens(
    mut tokens: Vec<Token>,
    ids: &mut NodeIds,
    sink: &mut dyn DiagnosticSink,
) -> Result<Vec<Stmt>, ParseFailure> {
    if tokens.last().is_none_or(|token| token.kind != TokenKind::Eof) {
        let line = tokens.last().map_or(1, |token| token.line);
        tokens.push(Token::new(TokenKind::Eof, "", None, line));
    }
    Parser::new(tokens, ids).parse_program(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::print_ast;
    use crate::diagnostics::Diagnostics;
    use crate::lexer::tokenize;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Result<Vec<Stmt>, (ParseFailure, Diagnostics)> {
        let mut sink = Diagnostics::new();
        let tokens = tokenize(source, &mut sink).expect("tokenize should succeed");
        let mut ids = NodeIds::new();
        parse_tokens(tokens, &mut ids, &mut sink).map_err(|failure| (failure, sink))
    }

    fn parse_expression(source: &str) -> String {
        let statements = parse(&format!("{source};")).expect("parse should succeed");
        match &statements[..] {
            [Stmt::Expression(expr)] => print_ast(expr),
            other => panic!("expected one expression statement, got {other:?}"),
        }
    }

    #[test]
    fn respects_precedence() {
        assert_eq!(parse_expression("1 + 2 * 3 - 4"), "(- (+ 1 (* 2 3)) 4)");
        assert_eq!(parse_expression("-a < b == !c"), "(== (< (- a) b) (! c))");
        assert_eq!(parse_expression("a or b and c"), "(or a (and b c))");
    }

    #[test]
    fn ternary_is_right_associative() {
        assert_eq!(parse_expression("a ? b : c ? d : e"), "(?: a b (?: c d e))");
    }

    #[test]
    fn compound_assignment_becomes_binary() {
        assert_eq!(parse_expression("x += 2"), "(= x (+= x 2))");
        assert_eq!(parse_expression("x = y = 3"), "(= x (= y 3))");
    }

    #[test]
    fn calls_and_host_escape() {
        assert_eq!(parse_expression("f(1, \"a\")(g)"), "(call (call f 1 \"a\") g)");
        assert_eq!(parse_expression("host(\"echo hi\")"), "(host \"echo hi\")");
    }

    #[test]
    fn variable_nodes_get_distinct_ids() {
        let statements = parse("a; a;").expect("parse");
        let ids = statements
            .iter()
            .map(|statement| match statement {
                Stmt::Expression(Expr::Variable { id, .. }) => *id,
                other => panic!("unexpected {other:?}"),
            })
            .collect::<Vec<_>>();
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn for_loop_desugars_into_while() {
        let statements = parse("for (var i = 0; i < 3; i = i + 1) print i;").expect("parse");
        let [Stmt::Block(outer)] = &statements[..] else {
            panic!("expected block, got {statements:?}");
        };
        assert!(matches!(outer[0], Stmt::Var { .. }));
        let Stmt::While { body, .. } = &outer[1] else {
            panic!("expected while, got {:?}", outer[1]);
        };
        let Stmt::Block(body) = body.as_ref() else {
            panic!("expected body block, got {body:?}");
        };
        assert!(matches!(body[0], Stmt::Print { .. }));
        assert!(matches!(body[1], Stmt::Expression(Expr::Assign { .. })));
    }

    #[test]
    fn parses_function_declaration() {
        let source = indoc! {"
            fun add(a, b) {
                return a + b;
            }
        "};
        let statements = parse(source).expect("parse");
        let [Stmt::Function(decl)] = &statements[..] else {
            panic!("expected function, got {statements:?}");
        };
        assert_eq!(decl.name.lexeme, "add");
        assert_eq!(decl.params.len(), 2);
        assert!(matches!(decl.body[0], Stmt::Return { value: Some(_), .. }));
    }

    #[test]
    fn reports_every_bad_statement() {
        let source = indoc! {"
            var = 1;
            print 2;
            1 = 2;
        "};
        let (failure, sink) = parse(source).expect_err("expected parse failure");
        assert_eq!(failure.errors.len(), 2);
        assert_eq!(
            sink.messages(),
            vec![
                "[line 1] Error at '=': Expect variable name.".to_string(),
                "[line 3] Error at '=': Invalid assignment target.".to_string(),
            ]
        );
    }

    #[test]
    fn rejects_classes() {
        let (failure, _) = parse("class A {}").expect_err("expected parse failure");
        assert_eq!(failure.errors[0].message, "Classes are not supported.");
    }

    fn grouping_depth(mut expr: &Expr) -> usize {
        let mut depth = 0;
        while let Expr::Grouping(inner) = expr {
            expr = inner;
            depth += 1;
        }
        depth
    }

    #[test]
    fn parses_deeply_nested_groupings() {
        const DEPTH: usize = 100_000;
        let source = format!("print {}1{};", "(".repeat(DEPTH), ")".repeat(DEPTH));
        let statements = parse(&source).expect("parse");
        let [Stmt::Print { expression, .. }] = &statements[..] else {
            panic!("expected one print statement");
        };
        assert_eq!(grouping_depth(expression), DEPTH);
    }

    #[test]
    fn parses_deeply_nested_blocks_and_operators() {
        let blocks = format!("{}print 1;{}", "{".repeat(100_000), "}".repeat(100_000));
        assert!(parse(&blocks).is_ok());

        let negations = format!("print {}1;", "-".repeat(200_000));
        assert!(parse(&negations).is_ok());

        let sum = format!("print {}1;", "1 + ".repeat(100_000));
        assert!(parse(&sum).is_ok());
    }

    #[test]
    fn reports_unclosed_deep_nesting() {
        let source = format!("print {}1;", "(".repeat(200_000));
        let (failure, sink) = parse(&source).expect_err("expected parse failure");
        assert_eq!(failure.errors.len(), 1);
        assert_eq!(
            sink.messages(),
            vec!["[line 1] Error at ';': Expect ')' after expression.".to_string()]
        );
    }
}
