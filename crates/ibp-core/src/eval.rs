//! Expression evaluation over a flat variable table.
//!
//! Arithmetic follows the host's native `i64` model: overflow wraps, shift
//! amounts are masked to 6 bits, `>>` is arithmetic, and division or
//! remainder by zero yields 0. Relational and logical operators produce 0 or 1.

use rand::Rng;

use crate::{BinaryOp, EvalError, Expr, UnaryOp, VariableTable};

/// Evaluates `expr` against `table`, drawing `rand(..)` values from `rng`.
///
/// `&&` and `||` skip their right operand when the left one decides the
/// result, so a skipped `rand(..)` consumes no randomness.
///
/// # Errors
///
/// Returns [`EvalError::UnboundVariable`] when a referenced name is missing
/// from `table`. This cannot happen for programs that passed
/// [`verify`](crate::verify).
pub fn evaluate<R: Rng>(expr: &Expr, table: &VariableTable, rng: &mut R) -> Result<i64, EvalError> {
    match expr {
        Expr::Number(value) => Ok(*value),
        Expr::Variable(name) => table
            .get(name)
            .ok_or_else(|| EvalError::UnboundVariable { name: name.clone() }),
        Expr::Binary {
            op: BinaryOp::And,
            lhs,
            rhs,
        } => {
            if evaluate(lhs, table, rng)? == 0 {
                return Ok(0);
            }
            Ok(i64::from(evaluate(rhs, table, rng)? != 0))
        }
        Expr::Binary {
            op: BinaryOp::Or,
            lhs,
            rhs,
        } => {
            if evaluate(lhs, table, rng)? != 0 {
                return Ok(1);
            }
            Ok(i64::from(evaluate(rhs, table, rng)? != 0))
        }
        Expr::Binary { op, lhs, rhs } => {
            let lhs = evaluate(lhs, table, rng)?;
            let rhs = evaluate(rhs, table, rng)?;
            Ok(apply_binary(*op, lhs, rhs))
        }
        Expr::Unary { op, operand } => Ok(apply_unary(*op, evaluate(operand, table, rng)?)),
        Expr::Random(arg) => {
            let bound = evaluate(arg, table, rng)?;
            Ok(draw_random(bound, rng))
        }
    }
}

/// Applies a binary operator to two already-evaluated operands.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub const fn apply_binary(op: BinaryOp, lhs: i64, rhs: i64) -> i64 {
    let shift = (rhs & 63) as u32;
    match op {
        BinaryOp::Mul => lhs.wrapping_mul(rhs),
        BinaryOp::Div => {
            if rhs == 0 {
                0
            } else {
                lhs.wrapping_div(rhs)
            }
        }
        BinaryOp::Rem => {
            if rhs == 0 {
                0
            } else {
                lhs.wrapping_rem(rhs)
            }
        }
        BinaryOp::Add => lhs.wrapping_add(rhs),
        BinaryOp::Sub => lhs.wrapping_sub(rhs),
        BinaryOp::Shl => lhs.wrapping_shl(shift),
        BinaryOp::Shr => lhs.wrapping_shr(shift),
        BinaryOp::Lt => (lhs < rhs) as i64,
        BinaryOp::Gt => (lhs > rhs) as i64,
        BinaryOp::Le => (lhs <= rhs) as i64,
        BinaryOp::Ge => (lhs >= rhs) as i64,
        BinaryOp::Eq => (lhs == rhs) as i64,
        BinaryOp::Ne => (lhs != rhs) as i64,
        BinaryOp::BitAnd => lhs & rhs,
        BinaryOp::BitXor => lhs ^ rhs,
        BinaryOp::BitOr => lhs | rhs,
        BinaryOp::And => (lhs != 0 && rhs != 0) as i64,
        BinaryOp::Or => (lhs != 0 || rhs != 0) as i64,
    }
}

/// Applies a unary operator to an already-evaluated operand.
#[must_use]
pub const fn apply_unary(op: UnaryOp, operand: i64) -> i64 {
    match op {
        UnaryOp::Not => (operand == 0) as i64,
        UnaryOp::BitNot => !operand,
    }
}

/// Draws from `[0, bound)` for positive bounds and `(bound, 0]` for negative
/// ones; a zero bound yields 0.
pub fn draw_random<R: Rng>(bound: i64, rng: &mut R) -> i64 {
    match bound {
        0 => 0,
        b if b > 0 => rng.gen_range(0..b),
        b => rng.gen_range(b + 1..=0),
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::SmallRng;
    use rand::{RngCore, SeedableRng};
    use rstest::rstest;

    use super::{apply_binary, apply_unary, draw_random, evaluate};
    use crate::{BinaryOp, EvalError, Expr, UnaryOp, VariableTable};

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    #[rstest]
    #[case(BinaryOp::Mul, 6, 7, 42)]
    #[case(BinaryOp::Div, 7, 2, 3)]
    #[case(BinaryOp::Div, -7, 2, -3)]
    #[case(BinaryOp::Rem, -7, 2, -1)]
    #[case(BinaryOp::Add, 2, 3, 5)]
    #[case(BinaryOp::Sub, 2, 3, -1)]
    #[case(BinaryOp::Shl, 1, 4, 16)]
    #[case(BinaryOp::Shr, -16, 2, -4)]
    #[case(BinaryOp::Lt, 1, 2, 1)]
    #[case(BinaryOp::Gt, 1, 2, 0)]
    #[case(BinaryOp::Le, 2, 2, 1)]
    #[case(BinaryOp::Ge, 1, 2, 0)]
    #[case(BinaryOp::Eq, 3, 3, 1)]
    #[case(BinaryOp::Ne, 3, 3, 0)]
    #[case(BinaryOp::BitAnd, 0b1100, 0b1010, 0b1000)]
    #[case(BinaryOp::BitXor, 0b1100, 0b1010, 0b0110)]
    #[case(BinaryOp::BitOr, 0b1100, 0b1010, 0b1110)]
    #[case(BinaryOp::And, 5, -3, 1)]
    #[case(BinaryOp::And, 5, 0, 0)]
    #[case(BinaryOp::Or, 0, 9, 1)]
    #[case(BinaryOp::Or, 0, 0, 0)]
    fn binary_operators_follow_integer_semantics(
        #[case] op: BinaryOp,
        #[case] lhs: i64,
        #[case] rhs: i64,
        #[case] expected: i64,
    ) {
        assert_eq!(apply_binary(op, lhs, rhs), expected);
    }

    #[test]
    fn division_and_remainder_by_zero_yield_zero() {
        assert_eq!(apply_binary(BinaryOp::Div, 10, 0), 0);
        assert_eq!(apply_binary(BinaryOp::Rem, 10, 0), 0);
    }

    #[test]
    fn overflow_wraps_instead_of_panicking() {
        assert_eq!(apply_binary(BinaryOp::Add, i64::MAX, 1), i64::MIN);
        assert_eq!(apply_binary(BinaryOp::Div, i64::MIN, -1), i64::MIN);
        assert_eq!(apply_binary(BinaryOp::Shl, 1, 64), 1);
    }

    #[test]
    fn unary_operators() {
        assert_eq!(apply_unary(UnaryOp::Not, 0), 1);
        assert_eq!(apply_unary(UnaryOp::Not, -2), 0);
        assert_eq!(apply_unary(UnaryOp::BitNot, 0), -1);
    }

    #[test]
    fn logical_operators_yield_booleans_not_operands() {
        let table = VariableTable::with_binding("x", 7);
        let expr = Expr::binary(BinaryOp::Or, Expr::var("x"), Expr::number(3));
        assert_eq!(evaluate(&expr, &table, &mut rng()), Ok(1));
    }

    #[test]
    fn short_circuit_skips_unbound_right_operand() {
        let table = VariableTable::new();
        let expr = Expr::binary(BinaryOp::And, Expr::number(0), Expr::var("missing"));
        assert_eq!(evaluate(&expr, &table, &mut rng()), Ok(0));
    }

    #[test]
    fn short_circuit_skips_random_draws() {
        let table = VariableTable::new();
        let skipped = Expr::binary(
            BinaryOp::Or,
            Expr::number(1),
            Expr::random(Expr::number(1000)),
        );
        let mut used = rng();
        assert_eq!(evaluate(&skipped, &table, &mut used), Ok(1));
        assert_eq!(used.next_u64(), rng().next_u64());

        let taken = Expr::binary(
            BinaryOp::Or,
            Expr::number(0),
            Expr::random(Expr::number(1000)),
        );
        let mut used = rng();
        evaluate(&taken, &table, &mut used).expect("evaluates");
        assert_ne!(used.next_u64(), rng().next_u64());
    }

    #[test]
    fn missing_variable_reports_unbound_name() {
        let table = VariableTable::with_binding("i", 0);
        assert_eq!(
            evaluate(&Expr::var("j"), &table, &mut rng()),
            Err(EvalError::UnboundVariable {
                name: "j".to_string()
            })
        );
    }

    #[test]
    fn nested_expression_reads_table() {
        let mut table = VariableTable::with_binding("i", 3);
        table.set("x", 5);
        let expr = Expr::binary(
            BinaryOp::Gt,
            Expr::binary(BinaryOp::Mul, Expr::var("i"), Expr::var("x")),
            Expr::number(10),
        );
        assert_eq!(evaluate(&expr, &table, &mut rng()), Ok(1));
    }

    #[test]
    fn random_range_respects_sign_of_bound() {
        let mut rng = rng();
        for _ in 0..500 {
            let positive = draw_random(4, &mut rng);
            assert!((0..4).contains(&positive));
            let negative = draw_random(-4, &mut rng);
            assert!((-3..=0).contains(&negative));
        }
        assert_eq!(draw_random(0, &mut rng), 0);
        assert_eq!(draw_random(1, &mut rng), 0);
        assert_eq!(draw_random(-1, &mut rng), 0);
    }

    #[test]
    fn random_expression_evaluates_its_argument() {
        let table = VariableTable::with_binding("n", 2);
        let expr = Expr::random(Expr::var("n"));
        let value = evaluate(&expr, &table, &mut rng()).expect("bound");
        assert!(value == 0 || value == 1);
    }
}
