//! Static scope verification over a whole program.

use std::collections::BTreeSet;

use crate::{Expr, Program, ScopeError, Statement, VariableTable};

/// Checks that every variable reference is bound before use.
///
/// Names bound inside an `if` body are visible only within that body: the body
/// is verified against a copy of the enclosing bindings and the copy is
/// discarded afterwards. The first unbound reference aborts verification.
///
/// # Errors
///
/// Returns [`ScopeError::UndefinedIdentifier`] naming the first unbound
/// identifier in program order.
pub fn verify(initial: &VariableTable, program: &Program) -> Result<(), ScopeError> {
    let mut bound: BTreeSet<&str> = initial.names().collect();
    verify_block(program.statements(), &mut bound)
}

fn verify_block<'a>(
    block: &'a [Statement],
    bound: &mut BTreeSet<&'a str>,
) -> Result<(), ScopeError> {
    for statement in block {
        match statement {
            Statement::Let { name, value, lines } => {
                check_expr(value, bound, lines.start)?;
                bound.insert(name.as_str());
            }
            Statement::If { cond, body, lines } => {
                check_expr(cond, bound, lines.start)?;
                let mut nested = bound.clone();
                verify_block(body, &mut nested)?;
            }
        }
    }
    Ok(())
}

fn check_expr(expr: &Expr, bound: &BTreeSet<&str>, line: usize) -> Result<(), ScopeError> {
    match expr {
        Expr::Number(_) => Ok(()),
        Expr::Variable(name) => {
            if bound.contains(name.as_str()) {
                Ok(())
            } else {
                Err(ScopeError::UndefinedIdentifier {
                    name: name.clone(),
                    line,
                })
            }
        }
        Expr::Binary { lhs, rhs, .. } => {
            check_expr(lhs, bound, line)?;
            check_expr(rhs, bound, line)
        }
        Expr::Unary { operand, .. } | Expr::Random(operand) => check_expr(operand, bound, line),
    }
}
