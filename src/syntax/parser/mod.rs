//! Program text parser
//!
//! Parses the JavaScript subset the engine analyses into the syntax tree.
//! Statement kinds outside the subset (imports, loops, functions, returns)
//! are skipped by balanced-token scanning and kept as `Unsupported`
//! statements, so the engine can decide what to do with them.

mod lexer;

use std::fmt;
use std::path::Path;

use crate::syntax::ast::{
    AssignmentOperator, BinaryOperator, DeclarationKind, Declarator, Expression, IfStatement,
    Literal, Statement, UnaryOperator, UpdateOperator, VariableDeclaration,
};
use lexer::{Lexer, Token, TokenKind};

/// Parse error with location information
#[derive(Debug, Clone)]
pub struct ParseError {
    pub line_number: usize,
    pub column: Option<usize>,
    pub message: String,
    pub line_content: String,
}

impl ParseError {
    pub fn new(
        line_number: usize,
        message: impl Into<String>,
        line_content: impl Into<String>,
    ) -> Self {
        Self {
            line_number,
            column: None,
            message: message.into(),
            line_content: line_content.into(),
        }
    }

    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = self.column {
            write!(
                f,
                "line {}, column {}: {}\n  | {}\n  | {}^",
                self.line_number,
                col,
                self.message,
                self.line_content,
                " ".repeat(col.saturating_sub(1))
            )
        } else {
            write!(
                f,
                "line {}: {}\n  | {}",
                self.line_number, self.message, self.line_content
            )
        }
    }
}

impl std::error::Error for ParseError {}

/// Keywords that open a statement kind the analysis does not model
const UNSUPPORTED_KEYWORDS: &[(&str, &str)] = &[
    ("import", "ImportDeclaration"),
    ("export", "ExportDeclaration"),
    ("while", "WhileStatement"),
    ("for", "ForStatement"),
    ("do", "DoWhileStatement"),
    ("function", "FunctionDeclaration"),
    ("async", "FunctionDeclaration"),
    ("class", "ClassDeclaration"),
    ("return", "ReturnStatement"),
    ("break", "BreakStatement"),
    ("continue", "ContinueStatement"),
    ("switch", "SwitchStatement"),
    ("try", "TryStatement"),
];

/// Unsupported statements that end at the end of their line
const LINE_TERMINATED: &[&str] = &["import", "export", "return", "break", "continue"];

/// Words that may follow a closing brace and still belong to the same statement
const BLOCK_CONTINUATIONS: &[&str] = &["else", "catch", "finally", "while"];

const RESERVED: &[&str] = &["let", "const", "var", "if", "else", "throw", "new"];

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Result<Self, ParseError> {
        Ok(Self {
            source,
            tokens: Lexer::new(source).tokenize()?,
            pos: 0,
        })
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        &self.tokens[(self.pos + ahead).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn is_punct(&self, punct: &str) -> bool {
        matches!(self.peek().kind, TokenKind::Punct(p) if p == punct)
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(&self.peek().kind, TokenKind::Identifier(name) if name == keyword)
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.is_punct(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> ParseError {
        let line_content = self
            .source
            .lines()
            .nth(token.line.saturating_sub(1))
            .unwrap_or("");
        ParseError::new(token.line, message, line_content).with_column(token.column)
    }

    fn describe(token: &Token) -> String {
        match &token.kind {
            TokenKind::Identifier(name) => format!("'{}'", name),
            TokenKind::Number(value) => format!("number {}", value),
            TokenKind::String(value) => format!("string \"{}\"", value),
            TokenKind::Punct(p) => format!("'{}'", p),
            TokenKind::Eof => "end of input".to_string(),
        }
    }

    fn expect_punct(&mut self, punct: &str) -> Result<Token, ParseError> {
        if self.is_punct(punct) {
            Ok(self.advance())
        } else {
            let token = self.peek().clone();
            Err(self.error_at(
                &token,
                format!("expected '{}', found {}", punct, Self::describe(&token)),
            ))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Identifier(name) if !RESERVED.contains(&name.as_str()) => Ok(name),
            TokenKind::Punct("[") | TokenKind::Punct("{") => Err(self.error_at(
                &token,
                "destructuring patterns are not supported",
            )),
            _ => Err(self.error_at(
                &token,
                format!("expected identifier, found {}", Self::describe(&token)),
            )),
        }
    }

    fn program(&mut self) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();
        while !self.at_eof() {
            statements.push(self.statement()?);
        }
        Ok(statements)
    }

    fn statement(&mut self) -> Result<Statement, ParseError> {
        if self.eat_punct(";") {
            return Ok(Statement::EmptyStatement);
        }
        if self.is_punct("{") {
            return self.block();
        }

        let keyword = match &self.peek().kind {
            TokenKind::Identifier(name) => Some(name.clone()),
            _ => None,
        };
        match keyword.as_deref() {
            Some("let") | Some("const") | Some("var") => self.declaration(),
            Some("if") => self.if_statement(),
            Some("throw") => {
                self.advance();
                let argument = self.expression()?;
                self.eat_punct(";");
                Ok(Statement::ThrowStatement { argument })
            }
            Some(word) => match UNSUPPORTED_KEYWORDS.iter().find(|(k, _)| *k == word) {
                Some((keyword, kind)) => self.unsupported(keyword, kind),
                None => self.expression_statement(),
            },
            None => self.expression_statement(),
        }
    }

    fn block(&mut self) -> Result<Statement, ParseError> {
        let open = self.expect_punct("{")?;
        let mut body = Vec::new();
        while !self.is_punct("}") {
            if self.at_eof() {
                return Err(self.error_at(&open, "unclosed block"));
            }
            body.push(self.statement()?);
        }
        self.advance();
        Ok(Statement::BlockStatement { body })
    }

    fn declaration(&mut self) -> Result<Statement, ParseError> {
        let kind = match self.advance().kind {
            TokenKind::Identifier(name) if name == "const" => DeclarationKind::Const,
            TokenKind::Identifier(name) if name == "var" => DeclarationKind::Var,
            _ => DeclarationKind::Let,
        };
        let mut declarations = Vec::new();
        loop {
            let id = self.expect_identifier()?;
            let init = if self.eat_punct("=") {
                Some(self.assignment()?)
            } else {
                None
            };
            declarations.push(Declarator { id, init });
            if !self.eat_punct(",") {
                break;
            }
        }
        self.eat_punct(";");
        Ok(Statement::VariableDeclaration(VariableDeclaration {
            kind,
            declarations,
        }))
    }

    fn if_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance();
        self.expect_punct("(")?;
        let test = self.expression()?;
        self.expect_punct(")")?;
        let consequent = Box::new(self.statement()?);
        let alternate = if self.is_keyword("else") {
            self.advance();
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Statement::IfStatement(IfStatement {
            test,
            consequent,
            alternate,
        }))
    }

    fn expression_statement(&mut self) -> Result<Statement, ParseError> {
        let expression = self.expression()?;
        self.eat_punct(";");
        Ok(Statement::ExpressionStatement { expression })
    }

    /// Skip a statement outside the subset, keeping its source text
    fn unsupported(&mut self, keyword: &str, kind: &str) -> Result<Statement, ParseError> {
        let start = self.advance();
        let line_terminated = LINE_TERMINATED.contains(&keyword);
        let mut depth = 0usize;
        let mut last_line = start.line;

        loop {
            let next = self.peek().clone();
            match &next.kind {
                TokenKind::Eof => {
                    if depth > 0 {
                        return Err(self.error_at(&start, format!("unbalanced {}", kind)));
                    }
                    break;
                }
                TokenKind::Punct(";") if depth == 0 => {
                    self.advance();
                    break;
                }
                _ if depth == 0 && line_terminated && next.line > last_line => break,
                TokenKind::Punct("(") | TokenKind::Punct("[") | TokenKind::Punct("{") => {
                    depth += 1;
                    self.advance();
                }
                TokenKind::Punct(close @ (")" | "]" | "}")) => {
                    if depth == 0 {
                        return Err(self.error_at(&next, format!("unexpected '{}'", close)));
                    }
                    depth -= 1;
                    self.advance();
                    if depth == 0 && *close == "}" && !line_terminated {
                        let follows = match &self.peek().kind {
                            TokenKind::Identifier(word) => BLOCK_CONTINUATIONS.contains(&word.as_str()),
                            _ => false,
                        };
                        if !follows {
                            break;
                        }
                    }
                }
                _ => {
                    self.advance();
                }
            }
            last_line = self.tokens[self.pos.saturating_sub(1)].line;
        }

        let end = self.peek().offset;
        let source = self.source[start.offset..end.max(start.offset)]
            .trim_end()
            .to_string();
        Ok(Statement::Unsupported {
            kind: kind.to_string(),
            source,
        })
    }

    fn expression(&mut self) -> Result<Expression, ParseError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expression, ParseError> {
        let left = self.equality()?;
        let operator = match self.peek().kind {
            TokenKind::Punct("=") => AssignmentOperator::Assign,
            TokenKind::Punct("+=") => AssignmentOperator::AddAssign,
            TokenKind::Punct("-=") => AssignmentOperator::SubAssign,
            TokenKind::Punct("*=") => AssignmentOperator::MulAssign,
            TokenKind::Punct("/=") => AssignmentOperator::DivAssign,
            TokenKind::Punct("%=") => AssignmentOperator::RemAssign,
            _ => return Ok(left),
        };
        let token = self.advance();
        if !matches!(left, Expression::Identifier { .. } | Expression::Member { .. }) {
            return Err(self.error_at(&token, "invalid assignment target"));
        }
        let right = self.assignment()?;
        Ok(Expression::Assignment {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn binary_level(
        &mut self,
        operators: &[(&str, BinaryOperator)],
        next: fn(&mut Self) -> Result<Expression, ParseError>,
    ) -> Result<Expression, ParseError> {
        let mut left = next(self)?;
        loop {
            let operator = match self.peek().kind {
                TokenKind::Punct(p) => operators.iter().find(|(s, _)| *s == p).map(|(_, op)| *op),
                _ => None,
            };
            let Some(operator) = operator else {
                break;
            };
            self.advance();
            let right = next(self)?;
            left = Expression::binary(operator, left, right);
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expression, ParseError> {
        let expression = self.binary_level(
            &[
                ("===", BinaryOperator::StrictEq),
                ("!==", BinaryOperator::StrictNe),
                ("==", BinaryOperator::Eq),
                ("!=", BinaryOperator::Ne),
            ],
            Self::relational,
        )?;
        if let TokenKind::Punct(p @ ("&&" | "||" | "?" | "&" | "|" | "^")) = self.peek().kind {
            let token = self.peek().clone();
            return Err(self.error_at(&token, format!("operator '{}' is not supported", p)));
        }
        Ok(expression)
    }

    fn relational(&mut self) -> Result<Expression, ParseError> {
        self.binary_level(
            &[
                ("<=", BinaryOperator::Le),
                (">=", BinaryOperator::Ge),
                ("<", BinaryOperator::Lt),
                (">", BinaryOperator::Gt),
            ],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Expression, ParseError> {
        self.binary_level(
            &[("+", BinaryOperator::Add), ("-", BinaryOperator::Sub)],
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self) -> Result<Expression, ParseError> {
        self.binary_level(
            &[
                ("*", BinaryOperator::Mul),
                ("/", BinaryOperator::Div),
                ("%", BinaryOperator::Rem),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expression, ParseError> {
        let operator = match self.peek().kind {
            TokenKind::Punct("-") => Some(UnaryOperator::Minus),
            TokenKind::Punct("+") => Some(UnaryOperator::Plus),
            TokenKind::Punct("!") => Some(UnaryOperator::Not),
            _ => None,
        };
        if let Some(operator) = operator {
            self.advance();
            let argument = self.unary()?;
            return Ok(Expression::Unary {
                operator,
                argument: Box::new(argument),
            });
        }

        let update = match self.peek().kind {
            TokenKind::Punct("++") => Some(UpdateOperator::Increment),
            TokenKind::Punct("--") => Some(UpdateOperator::Decrement),
            _ => None,
        };
        if let Some(operator) = update {
            self.advance();
            let argument = self.unary()?;
            return Ok(Expression::Update {
                operator,
                prefix: true,
                argument: Box::new(argument),
            });
        }

        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expression, ParseError> {
        let line = self.peek().line;
        let expression = self.call_member()?;
        let operator = match self.peek().kind {
            TokenKind::Punct("++") => UpdateOperator::Increment,
            TokenKind::Punct("--") => UpdateOperator::Decrement,
            _ => return Ok(expression),
        };
        // A line break before `++` starts a new statement
        if self.peek().line != line && self.tokens[self.pos - 1].line != self.peek().line {
            return Ok(expression);
        }
        self.advance();
        Ok(Expression::Update {
            operator,
            prefix: false,
            argument: Box::new(expression),
        })
    }

    fn arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.expect_punct("(")?;
        let mut arguments = Vec::new();
        if self.eat_punct(")") {
            return Ok(arguments);
        }
        loop {
            arguments.push(self.assignment()?);
            if self.eat_punct(")") {
                return Ok(arguments);
            }
            self.expect_punct(",")?;
        }
    }

    fn member_chain(&mut self, mut expression: Expression, calls: bool) -> Result<Expression, ParseError> {
        loop {
            if self.eat_punct(".") {
                let property = self.expect_property()?;
                expression = Expression::Member {
                    object: Box::new(expression),
                    property,
                };
            } else if calls && self.is_punct("(") {
                let arguments = self.arguments()?;
                expression = Expression::Call {
                    callee: Box::new(expression),
                    arguments,
                };
            } else {
                return Ok(expression);
            }
        }
    }

    fn expect_property(&mut self) -> Result<String, ParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Identifier(name) => Ok(name),
            _ => Err(self.error_at(
                &token,
                format!("expected property name, found {}", Self::describe(&token)),
            )),
        }
    }

    fn call_member(&mut self) -> Result<Expression, ParseError> {
        if self.is_keyword("new") {
            self.advance();
            let name = self.expect_identifier()?;
            let callee = self.member_chain(Expression::identifier(name), false)?;
            let arguments = if self.is_punct("(") {
                self.arguments()?
            } else {
                Vec::new()
            };
            let expression = Expression::New {
                callee: Box::new(callee),
                arguments,
            };
            return self.member_chain(expression, true);
        }
        let primary = self.primary()?;
        self.member_chain(primary, true)
    }

    fn primary(&mut self) -> Result<Expression, ParseError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number(value) => Ok(Expression::number(value)),
            TokenKind::String(value) => Ok(Expression::Literal {
                value: Literal::String(value),
            }),
            TokenKind::Identifier(ref name) => match name.as_str() {
                "true" => Ok(Expression::Literal {
                    value: Literal::Boolean(true),
                }),
                "false" => Ok(Expression::Literal {
                    value: Literal::Boolean(false),
                }),
                "null" => Ok(Expression::Literal {
                    value: Literal::Null,
                }),
                reserved if RESERVED.contains(&reserved) => Err(self.error_at(
                    &token,
                    format!("unexpected keyword '{}'", reserved),
                )),
                _ => Ok(Expression::Identifier { name: name.clone() }),
            },
            TokenKind::Punct("(") => {
                let expression = self.expression()?;
                self.expect_punct(")")?;
                Ok(expression)
            }
            _ => Err(self.error_at(
                &token,
                format!("unexpected {}", Self::describe(&token)),
            )),
        }
    }
}

/// Parse program source into a statement list
pub fn parse_program(source: &str) -> Result<Vec<Statement>, ParseError> {
    let mut parser = Parser::new(source)?;
    let statements = parser.program()?;
    if parser.peek_at(0).kind != TokenKind::Eof {
        let token = parser.peek().clone();
        return Err(parser.error_at(&token, "trailing input"));
    }
    Ok(statements)
}

/// Parse a program file into a statement list
pub fn parse_program_file(path: &Path) -> Result<Vec<Statement>, ParseError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ParseError::new(
            0,
            format!("failed to read file: {}", e),
            path.display().to_string(),
        )
    })?;

    parse_program(&content)
}
