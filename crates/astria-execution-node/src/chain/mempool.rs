use parking_lot::RwLock;

use super::{
    Transaction,
    TxPool,
};

/// The ordered transaction pool.
///
/// Unlike a general purpose mempool this holds exactly one list: the
/// sequencer-ordered transactions of the block currently being built. The
/// payload builder consumes it in order and the execution service clears it
/// after the block is inserted.
#[derive(Default)]
pub(crate) struct Mempool {
    ordered: RwLock<Vec<Transaction>>,
}

impl Mempool {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl TxPool for Mempool {
    fn set_ordered(&self, transactions: Vec<Transaction>) {
        *self.ordered.write() = transactions;
    }

    fn ordered(&self) -> Vec<Transaction> {
        self.ordered.read().clone()
    }

    fn clear_ordered(&self) {
        self.ordered.write().clear();
    }

    fn len(&self) -> usize {
        self.ordered.read().len()
    }
}
