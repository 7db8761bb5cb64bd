//! Statement and expression tree consumed by the verifier and the stepper.
//!
//! Trees are produced once by a parser and never mutated afterwards. Only
//! statements carry source lines; they are used for highlighting and as the
//! program counter of `if` branches.

use std::collections::BTreeMap;
use std::fmt;

/// Inclusive, 1-indexed range of source lines covered by a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct LineRange {
    /// First line of the statement.
    pub start: usize,
    /// Last line of the statement.
    pub end: usize,
}

impl LineRange {
    /// Creates a range spanning `start..=end`.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Creates a range covering a single line.
    #[must_use]
    pub const fn single(line: usize) -> Self {
        Self {
            start: line,
            end: line,
        }
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Binary operators, listed from tightest to loosest binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum BinaryOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

impl BinaryOp {
    /// Every binary operator in precedence order.
    pub const ALL: [Self; 18] = [
        Self::Mul,
        Self::Div,
        Self::Rem,
        Self::Add,
        Self::Sub,
        Self::Shl,
        Self::Shr,
        Self::Lt,
        Self::Gt,
        Self::Le,
        Self::Ge,
        Self::Eq,
        Self::Ne,
        Self::BitAnd,
        Self::BitXor,
        Self::BitOr,
        Self::And,
        Self::Or,
    ];

    /// Returns the source spelling of the operator.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::BitAnd => "&",
            Self::BitXor => "^",
            Self::BitOr => "|",
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    /// Binding strength used by parsers; larger binds tighter.
    #[must_use]
    pub const fn precedence(self) -> u8 {
        match self {
            Self::Mul | Self::Div | Self::Rem => 10,
            Self::Add | Self::Sub => 9,
            Self::Shl | Self::Shr => 8,
            Self::Lt | Self::Gt | Self::Le | Self::Ge => 7,
            Self::Eq | Self::Ne => 6,
            Self::BitAnd => 5,
            Self::BitXor => 4,
            Self::BitOr => 3,
            Self::And => 2,
            Self::Or => 1,
        }
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum UnaryOp {
    /// Logical not (`!`), yielding 0 or 1.
    Not,
    /// Bitwise complement (`~`).
    BitNot,
}

impl UnaryOp {
    /// Returns the source spelling of the operator.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::BitNot => "~",
        }
    }
}

/// Expression tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Expr {
    /// Integer literal.
    Number(i64),
    /// Reference to a bound variable.
    Variable(String),
    /// Infix operation.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// Prefix operation.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },
    /// Random draw between 0 (inclusive) and the argument (exclusive).
    Random(Box<Expr>),
}

impl Expr {
    /// Builds a literal.
    #[must_use]
    pub const fn number(value: i64) -> Self {
        Self::Number(value)
    }

    /// Builds a variable reference.
    #[must_use]
    pub fn var(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// Builds an infix node.
    #[must_use]
    pub fn binary(op: BinaryOp, lhs: Self, rhs: Self) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Builds a prefix node.
    #[must_use]
    pub fn unary(op: UnaryOp, operand: Self) -> Self {
        Self::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Builds a random-range node.
    #[must_use]
    pub fn random(arg: Self) -> Self {
        Self::Random(Box::new(arg))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Variable(name) => write!(f, "{name}"),
            Self::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            Self::Unary { op, operand } => write!(f, "{}{operand}", op.symbol()),
            Self::Random(arg) => write!(f, "rand({arg})"),
        }
    }
}

/// Statement node with its source line range.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Statement {
    /// Binds or overwrites `name` in the current scope.
    Let {
        /// Variable name.
        name: String,
        /// Bound value.
        value: Expr,
        /// Source lines of the statement.
        lines: LineRange,
    },
    /// Conditional block; an empty body is never entered.
    If {
        /// Branch condition; nonzero means taken.
        cond: Expr,
        /// Statements executed when taken.
        body: Vec<Statement>,
        /// Source lines from `if` through the closing brace.
        lines: LineRange,
    },
}

impl Statement {
    /// Builds a `let` statement.
    #[must_use]
    pub fn let_binding(name: impl Into<String>, value: Expr, lines: LineRange) -> Self {
        Self::Let {
            name: name.into(),
            value,
            lines,
        }
    }

    /// Builds an `if` statement.
    #[must_use]
    pub const fn if_block(cond: Expr, body: Vec<Self>, lines: LineRange) -> Self {
        Self::If { cond, body, lines }
    }

    /// Source lines covered by the statement.
    #[must_use]
    pub const fn lines(&self) -> LineRange {
        match self {
            Self::Let { lines, .. } | Self::If { lines, .. } => *lines,
        }
    }

    /// Nested block of an `if`; empty for `let`.
    #[must_use]
    pub fn body(&self) -> &[Self] {
        match self {
            Self::If { body, .. } => body,
            Self::Let { .. } => &[],
        }
    }
}

/// Top-level statement sequence (the implicit outer block).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Program {
    statements: Vec<Statement>,
}

impl Program {
    /// Wraps a top-level statement sequence.
    #[must_use]
    pub const fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    /// Top-level statements in order.
    #[must_use]
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Returns `true` when the program has no statements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Start lines of every `if` in source order, nested ones included.
    #[must_use]
    pub fn branch_sites(&self) -> Vec<usize> {
        fn collect(block: &[Statement], sites: &mut Vec<usize>) {
            for statement in block {
                if let Statement::If { body, lines, .. } = statement {
                    sites.push(lines.start);
                    collect(body, sites);
                }
            }
        }

        let mut sites = Vec::new();
        collect(&self.statements, &mut sites);
        sites
    }
}

/// Flat name-to-integer mapping owned by one evaluation context.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct VariableTable {
    values: BTreeMap<String, i64>,
}

impl VariableTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            values: BTreeMap::new(),
        }
    }

    /// Creates a table holding a single binding.
    #[must_use]
    pub fn with_binding(name: impl Into<String>, value: i64) -> Self {
        let mut table = Self::new();
        table.set(name, value);
        table
    }

    /// Looks up a binding.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<i64> {
        self.values.get(name).copied()
    }

    /// Binds or overwrites `name`.
    pub fn set(&mut self, name: impl Into<String>, value: i64) {
        self.values.insert(name.into(), value);
    }

    /// Returns `true` when `name` is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Bound names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Bindings in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), *value))
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{BinaryOp, Expr, LineRange, Program, Statement, UnaryOp, VariableTable};

    #[test]
    fn multiplicative_binds_tighter_than_logical_or() {
        assert!(BinaryOp::Mul.precedence() > BinaryOp::Add.precedence());
        assert!(BinaryOp::BitAnd.precedence() > BinaryOp::BitXor.precedence());
        assert!(BinaryOp::BitXor.precedence() > BinaryOp::BitOr.precedence());
        assert!(BinaryOp::And.precedence() > BinaryOp::Or.precedence());
    }

    #[test]
    fn expression_display_is_fully_parenthesized() {
        let expr = Expr::binary(
            BinaryOp::And,
            Expr::binary(BinaryOp::Gt, Expr::var("x"), Expr::number(0)),
            Expr::unary(UnaryOp::Not, Expr::random(Expr::number(2))),
        );
        assert_eq!(expr.to_string(), "((x > 0) && !rand(2))");
    }

    #[test]
    fn branch_sites_include_nested_ifs_in_source_order() {
        let inner = Statement::if_block(Expr::number(1), Vec::new(), LineRange::single(3));
        let outer = Statement::if_block(
            Expr::number(1),
            vec![
                Statement::let_binding("a", Expr::number(1), LineRange::single(2)),
                inner,
            ],
            LineRange::new(1, 4),
        );
        let tail = Statement::if_block(Expr::number(0), Vec::new(), LineRange::new(5, 6));
        let program = Program::new(vec![outer, tail]);

        assert_eq!(program.branch_sites(), vec![1, 3, 5]);
    }

    #[test]
    fn let_statements_have_no_body() {
        let stmt = Statement::let_binding("x", Expr::number(5), LineRange::single(1));
        assert!(stmt.body().is_empty());
        assert_eq!(stmt.lines(), LineRange::single(1));
    }

    #[test]
    fn variable_table_overwrites_and_iterates_in_name_order() {
        let mut table = VariableTable::with_binding("i", 0);
        table.set("b", 2);
        table.set("a", 1);
        table.set("b", 3);

        assert_eq!(table.len(), 3);
        assert_eq!(table.get("b"), Some(3));
        assert!(!table.contains("z"));
        assert_eq!(
            table.iter().collect::<Vec<_>>(),
            vec![("a", 1), ("b", 3), ("i", 0)]
        );
    }

    #[test]
    fn line_range_display() {
        assert_eq!(LineRange::single(4).to_string(), "4");
        assert_eq!(LineRange::new(2, 5).to_string(), "2-5");
    }
}
