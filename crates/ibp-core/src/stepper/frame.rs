use crate::{Statement, VariableTable};

/// One active block: its private variable table and statement cursor.
///
/// A frame does not hold its block. The block of frame `k` is the body of the
/// `if` that frame `k - 1` is pointing at, which stays put while the child is
/// active.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Frame {
    table: VariableTable,
    index: usize,
}

impl Frame {
    pub(crate) const fn new(table: VariableTable) -> Self {
        Self { table, index: 0 }
    }

    /// Bindings visible in this block.
    #[must_use]
    pub const fn table(&self) -> &VariableTable {
        &self.table
    }

    /// Index of the next statement to execute in this block.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    pub(crate) const fn table_mut(&mut self) -> &mut VariableTable {
        &mut self.table
    }

    pub(crate) const fn advance(&mut self) {
        self.index += 1;
    }
}

/// Resolves the block a frame executes from the frames enclosing it.
pub(crate) fn block_for<'p>(top_level: &'p [Statement], parents: &[Frame]) -> &'p [Statement] {
    parents
        .iter()
        .fold(top_level, |block, parent| match block.get(parent.index) {
            Some(statement) => statement.body(),
            None => &[],
        })
}
