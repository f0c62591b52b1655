//! Program syntax: tree, parser, printer and structural differ

pub mod ast;
pub mod diff;
pub mod parser;

pub use ast::{
    render_program, AssignmentOperator, BinaryOperator, DeclarationKind, Declarator, Expression,
    IfStatement, Literal, Statement, UnaryOperator, UpdateOperator, VariableDeclaration,
};
pub use diff::{diff_programs, read_diff, write_diff};
pub use parser::{parse_program, parse_program_file, ParseError};
