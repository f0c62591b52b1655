//! Syntax tree for the analysed program subset
//!
//! The tree mirrors the ESTree shapes the engine consumes: statements are a
//! tagged union, expressions are a tagged union, and both serialize to JSON
//! with a `type` tag so diff and cache files stay readable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declaration keyword of a variable declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Let,
    Const,
    Var,
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclarationKind::Let => write!(f, "let"),
            DeclarationKind::Const => write!(f, "const"),
            DeclarationKind::Var => write!(f, "var"),
        }
    }
}

/// A single `name = init` pair inside a declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declarator {
    pub id: String,
    pub init: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub kind: DeclarationKind,
    pub declarations: Vec<Declarator>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStatement {
    pub test: Expression,
    pub consequent: Box<Statement>,
    pub alternate: Option<Box<Statement>>,
}

impl IfStatement {
    /// Statements of the consequent, with a block unwrapped
    pub fn consequent_body(&self) -> Vec<Statement> {
        self.consequent.body()
    }

    /// Statements of the alternate, empty when there is no `else`
    pub fn alternate_body(&self) -> Vec<Statement> {
        self.alternate
            .as_ref()
            .map(|alternate| alternate.body())
            .unwrap_or_default()
    }
}

/// Program statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Statement {
    VariableDeclaration(VariableDeclaration),
    ExpressionStatement {
        expression: Expression,
    },
    IfStatement(IfStatement),
    BlockStatement {
        body: Vec<Statement>,
    },
    ThrowStatement {
        argument: Expression,
    },
    EmptyStatement,
    /// A statement kind outside the analysed subset, kept as source text
    Unsupported {
        kind: String,
        source: String,
    },
    /// Diff sentinel marking the first point where two program versions differ.
    /// A missing side means the statement was inserted or removed.
    Divergence {
        old: Option<Box<Statement>>,
        new: Option<Box<Statement>>,
    },
}

impl Statement {
    /// ESTree-style name of the statement kind
    pub fn kind_name(&self) -> &str {
        match self {
            Statement::VariableDeclaration(_) => "VariableDeclaration",
            Statement::ExpressionStatement { .. } => "ExpressionStatement",
            Statement::IfStatement(_) => "IfStatement",
            Statement::BlockStatement { .. } => "BlockStatement",
            Statement::ThrowStatement { .. } => "ThrowStatement",
            Statement::EmptyStatement => "EmptyStatement",
            Statement::Unsupported { kind, .. } => kind,
            Statement::Divergence { .. } => "Divergence",
        }
    }

    /// The statement as a list: block contents, or the statement itself
    pub fn body(&self) -> Vec<Statement> {
        match self {
            Statement::BlockStatement { body } => body.clone(),
            other => vec![other.clone()],
        }
    }

    pub fn as_if(&self) -> Option<&IfStatement> {
        match self {
            Statement::IfStatement(if_statement) => Some(if_statement),
            _ => None,
        }
    }

    /// Whether a divergence sentinel appears anywhere in this statement
    pub fn contains_divergence(&self) -> bool {
        match self {
            Statement::Divergence { .. } => true,
            Statement::BlockStatement { body } => body.iter().any(Statement::contains_divergence),
            Statement::IfStatement(if_statement) => {
                if_statement.consequent.contains_divergence()
                    || if_statement
                        .alternate
                        .as_ref()
                        .is_some_and(|alternate| alternate.contains_divergence())
            }
            _ => false,
        }
    }
}

/// Literal values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
}

impl Literal {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Literal::Number(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(value) => write!(f, "{}", value),
            Literal::String(value) => {
                write!(f, "\"")?;
                for c in value.chars() {
                    match c {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        other => write!(f, "{}", other)?,
                    }
                }
                write!(f, "\"")
            }
            Literal::Boolean(value) => write!(f, "{}", value),
            Literal::Null => write!(f, "null"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    #[serde(rename = "-")]
    Minus,
    #[serde(rename = "+")]
    Plus,
    #[serde(rename = "!")]
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "===")]
    StrictEq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "!==")]
    StrictNe,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Rem,
}

impl BinaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "==",
            BinaryOperator::StrictEq => "===",
            BinaryOperator::Ne => "!=",
            BinaryOperator::StrictNe => "!==",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentOperator {
    #[serde(rename = "=")]
    Assign,
    #[serde(rename = "+=")]
    AddAssign,
    #[serde(rename = "-=")]
    SubAssign,
    #[serde(rename = "*=")]
    MulAssign,
    #[serde(rename = "/=")]
    DivAssign,
    #[serde(rename = "%=")]
    RemAssign,
}

impl AssignmentOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            AssignmentOperator::Assign => "=",
            AssignmentOperator::AddAssign => "+=",
            AssignmentOperator::SubAssign => "-=",
            AssignmentOperator::MulAssign => "*=",
            AssignmentOperator::DivAssign => "/=",
            AssignmentOperator::RemAssign => "%=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOperator {
    #[serde(rename = "++")]
    Increment,
    #[serde(rename = "--")]
    Decrement,
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Expression {
    Identifier {
        name: String,
    },
    Literal {
        value: Literal,
    },
    Unary {
        operator: UnaryOperator,
        argument: Box<Expression>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Assignment {
        operator: AssignmentOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Update {
        operator: UpdateOperator,
        prefix: bool,
        argument: Box<Expression>,
    },
    New {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    Member {
        object: Box<Expression>,
        property: String,
    },
}

impl Expression {
    pub fn identifier(name: impl Into<String>) -> Self {
        Expression::Identifier { name: name.into() }
    }

    pub fn number(value: f64) -> Self {
        Expression::Literal {
            value: Literal::Number(value),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expression::Literal {
            value: Literal::String(value.into()),
        }
    }

    pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Expression::Identifier { .. } => "Identifier",
            Expression::Literal { .. } => "Literal",
            Expression::Unary { .. } => "UnaryExpression",
            Expression::Binary { .. } => "BinaryExpression",
            Expression::Assignment { .. } => "AssignmentExpression",
            Expression::Update { .. } => "UpdateExpression",
            Expression::New { .. } => "NewExpression",
            Expression::Call { .. } => "CallExpression",
            Expression::Member { .. } => "MemberExpression",
        }
    }

    /// Numeric value of a literal, looking through unary minus and plus
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Expression::Literal { value } => value.as_number(),
            Expression::Unary {
                operator: UnaryOperator::Minus,
                argument,
            } => argument.as_number().map(|value| -value),
            Expression::Unary {
                operator: UnaryOperator::Plus,
                argument,
            } => argument.as_number(),
            _ => None,
        }
    }

    fn is_compound(&self) -> bool {
        matches!(
            self,
            Expression::Binary { .. } | Expression::Assignment { .. } | Expression::Unary { .. }
        )
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expression: &Expression) -> fmt::Result {
    if expression.is_compound() {
        write!(f, "({})", expression)
    } else {
        write!(f, "{}", expression)
    }
}

fn write_arguments(f: &mut fmt::Formatter<'_>, arguments: &[Expression]) -> fmt::Result {
    write!(f, "(")?;
    for (i, argument) in arguments.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", argument)?;
    }
    write!(f, ")")
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Identifier { name } => write!(f, "{}", name),
            Expression::Literal { value } => write!(f, "{}", value),
            Expression::Unary { operator, argument } => {
                let symbol = match operator {
                    UnaryOperator::Minus => "-",
                    UnaryOperator::Plus => "+",
                    UnaryOperator::Not => "!",
                };
                write!(f, "{}", symbol)?;
                write_operand(f, argument)
            }
            Expression::Binary {
                operator,
                left,
                right,
            } => {
                write_operand(f, left)?;
                write!(f, " {} ", operator.symbol())?;
                write_operand(f, right)
            }
            Expression::Assignment {
                operator,
                left,
                right,
            } => write!(f, "{} {} {}", left, operator.symbol(), right),
            Expression::Update {
                operator,
                prefix,
                argument,
            } => {
                let symbol = match operator {
                    UpdateOperator::Increment => "++",
                    UpdateOperator::Decrement => "--",
                };
                if *prefix {
                    write!(f, "{}{}", symbol, argument)
                } else {
                    write!(f, "{}{}", argument, symbol)
                }
            }
            Expression::New { callee, arguments } => {
                write!(f, "new {}", callee)?;
                write_arguments(f, arguments)
            }
            Expression::Call { callee, arguments } => {
                write_operand(f, callee)?;
                write_arguments(f, arguments)
            }
            Expression::Member { object, property } => {
                write_operand(f, object)?;
                write!(f, ".{}", property)
            }
        }
    }
}

fn write_statement(f: &mut fmt::Formatter<'_>, statement: &Statement, depth: usize) -> fmt::Result {
    let indent = "    ".repeat(depth);
    match statement {
        Statement::VariableDeclaration(declaration) => {
            write!(f, "{}{} ", indent, declaration.kind)?;
            for (i, declarator) in declaration.declarations.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", declarator.id)?;
                if let Some(init) = &declarator.init {
                    write!(f, " = {}", init)?;
                }
            }
            writeln!(f, ";")
        }
        Statement::ExpressionStatement { expression } => writeln!(f, "{}{};", indent, expression),
        Statement::IfStatement(if_statement) => {
            write!(f, "{}if ({}) ", indent, if_statement.test)?;
            write_branch(f, &if_statement.consequent, depth)?;
            if let Some(alternate) = &if_statement.alternate {
                write!(f, " else ")?;
                write_branch(f, alternate, depth)?;
            }
            writeln!(f)
        }
        Statement::BlockStatement { body } => {
            writeln!(f, "{}{{", indent)?;
            for inner in body {
                write_statement(f, inner, depth + 1)?;
            }
            writeln!(f, "{}}}", indent)
        }
        Statement::ThrowStatement { argument } => writeln!(f, "{}throw {};", indent, argument),
        Statement::EmptyStatement => writeln!(f, "{};", indent),
        Statement::Unsupported { source, .. } => writeln!(f, "{}{}", indent, source),
        Statement::Divergence { old, new } => {
            writeln!(f, "{}/* <<< old */", indent)?;
            if let Some(old) = old {
                write_statement(f, old, depth)?;
            }
            writeln!(f, "{}/* === new */", indent)?;
            if let Some(new) = new {
                write_statement(f, new, depth)?;
            }
            writeln!(f, "{}/* >>> */", indent)
        }
    }
}

/// Branches always print as braced blocks so `else` binds unambiguously
fn write_branch(f: &mut fmt::Formatter<'_>, branch: &Statement, depth: usize) -> fmt::Result {
    let indent = "    ".repeat(depth);
    writeln!(f, "{{")?;
    for inner in branch.body() {
        write_statement(f, &inner, depth + 1)?;
    }
    write!(f, "{}}}", indent)
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_statement(f, self, 0)
    }
}

/// Render a statement list as program source
pub fn render_program(statements: &[Statement]) -> String {
    statements.iter().map(|statement| statement.to_string()).collect()
}
