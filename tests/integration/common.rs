//! Concrete re-execution of programs for checking witnesses

use std::collections::HashMap;

use diffsym::engine::{ResultRecord, Terminal};
use diffsym::syntax::{
    AssignmentOperator, BinaryOperator, Expression, Statement, UnaryOperator,
};

/// Run `program` with symbolic numbers bound to the record's witnesses
/// (unconstrained ones default to zero) and return how it ended.
pub fn execute_with_witnesses(program: &[Statement], record: &ResultRecord) -> Terminal {
    let mut env = HashMap::new();
    let mut pending: Vec<Statement> = program.iter().rev().cloned().collect();

    while let Some(statement) = pending.pop() {
        match statement {
            Statement::VariableDeclaration(declaration) => {
                for declarator in declaration.declarations {
                    let value = match declarator.init {
                        Some(Expression::New { .. }) => record
                            .witness(&declarator.id)
                            .and_then(|v| v.as_f64())
                            .unwrap_or(0.0),
                        Some(init) => evaluate(&init, &env),
                        None => 0.0,
                    };
                    env.insert(declarator.id, value);
                }
            }
            Statement::ExpressionStatement {
                expression:
                    Expression::Assignment {
                        operator: AssignmentOperator::Assign,
                        left,
                        right,
                    },
            } => {
                if let Expression::Identifier { name } = *left {
                    let value = evaluate(&right, &env);
                    env.insert(name, value);
                }
            }
            Statement::BlockStatement { body } => pending.extend(body.into_iter().rev()),
            Statement::IfStatement(conditional) => {
                let branch = if holds(&conditional.test, &env) {
                    Some(*conditional.consequent)
                } else {
                    conditional.alternate.map(|alternate| *alternate)
                };
                pending.extend(branch);
            }
            Statement::ThrowStatement { argument } => {
                return Terminal::ReachedThrow {
                    detail: argument.to_string(),
                };
            }
            _ => {}
        }
    }
    Terminal::ReachedEnd
}

fn evaluate(expression: &Expression, env: &HashMap<String, f64>) -> f64 {
    match expression {
        Expression::Identifier { name } => env.get(name).copied().unwrap_or(0.0),
        Expression::Unary {
            operator: UnaryOperator::Minus,
            argument,
        } => -evaluate(argument, env),
        other => other.as_number().unwrap_or(0.0),
    }
}

fn holds(test: &Expression, env: &HashMap<String, f64>) -> bool {
    let Expression::Binary {
        operator,
        left,
        right,
    } = test
    else {
        return false;
    };
    let (l, r) = (evaluate(left, env), evaluate(right, env));
    match operator {
        BinaryOperator::Eq | BinaryOperator::StrictEq => l == r,
        BinaryOperator::Ne => l != r,
        BinaryOperator::Gt => l > r,
        BinaryOperator::Ge => l >= r,
        BinaryOperator::Lt => l < r,
        BinaryOperator::Le => l <= r,
        _ => false,
    }
}

/// Number of root-to-terminal paths through the statement tree
pub fn count_paths(statements: &[Statement]) -> usize {
    for (index, statement) in statements.iter().enumerate() {
        let rest = &statements[index + 1..];
        match statement {
            Statement::ThrowStatement { .. } => return 1,
            Statement::BlockStatement { body } => {
                let mut inlined = body.clone();
                inlined.extend_from_slice(rest);
                return count_paths(&inlined);
            }
            Statement::IfStatement(conditional) => {
                let mut consequent = conditional.consequent.body();
                consequent.extend_from_slice(rest);
                let mut alternate = conditional
                    .alternate
                    .as_deref()
                    .map(Statement::body)
                    .unwrap_or_default();
                alternate.extend_from_slice(rest);
                return count_paths(&consequent) + count_paths(&alternate);
            }
            _ => {}
        }
    }
    1
}
