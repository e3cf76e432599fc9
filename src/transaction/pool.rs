use log::debug;
use std::collections::HashMap;

use super::model::Transaction;
use crate::blockchain::Block;

/// Transaction id -> transaction.
pub type TransactionMap = HashMap<String, Transaction>;

/// Replica-local staging area for transactions not yet in the chain.
#[derive(Debug, Default, Clone)]
pub struct TransactionPool {
    map: TransactionMap,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Insert or overwrite the slot for `transaction.id`.
    pub fn set_transaction(&mut self, transaction: Transaction) {
        self.map.insert(transaction.id.clone(), transaction);
    }

    /// The pool's transaction sent by `sender_address`, if any.
    pub fn existing_transaction(&self, sender_address: &str) -> Option<&Transaction> {
        self.map
            .values()
            .find(|tx| tx.sender() == Some(sender_address))
    }

    pub fn existing_transaction_mut(&mut self, sender_address: &str) -> Option<&mut Transaction> {
        self.map
            .values_mut()
            .find(|tx| tx.sender() == Some(sender_address))
    }

    /// Remove every entry from `sender_address` that fails validation.
    /// Returns how many were dropped.
    pub fn drop_invalid_from(&mut self, sender_address: &str) -> usize {
        let before = self.map.len();
        self.map
            .retain(|_, tx| tx.sender() != Some(sender_address) || tx.validate());
        before - self.map.len()
    }

    /// Wholesale replace, used when syncing with a peer.
    pub fn set_map(&mut self, map: TransactionMap) {
        debug!("pool replaced: {} -> {} entries", self.map.len(), map.len());
        self.map = map;
    }

    /// Regular transactions that pass validation, ordered by input timestamp
    /// then id. Rewards are left out.
    pub fn valid_transactions(&self) -> Vec<Transaction> {
        let mut valid: Vec<Transaction> = self
            .map
            .values()
            .filter(|tx| !tx.is_reward() && tx.validate())
            .cloned()
            .collect();
        valid.sort_by(|a, b| {
            input_timestamp(a)
                .cmp(&input_timestamp(b))
                .then_with(|| a.id.cmp(&b.id))
        });
        valid
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Drop every entry whose id appears in a non-genesis block of `chain`.
    pub fn clear_committed(&mut self, chain: &[Block]) {
        let before = self.map.len();
        for block in chain.iter().skip(1) {
            for tx in &block.data {
                self.map.remove(&tx.id);
            }
        }
        debug!(
            "pool pruned: {} -> {} (removed {})",
            before,
            self.map.len(),
            before - self.map.len()
        );
    }

    pub fn transaction_map(&self) -> &TransactionMap {
        &self.map
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn input_timestamp(tx: &Transaction) -> i64 {
    match &tx.input {
        super::TxInput::Signed(input) => input.timestamp,
        super::TxInput::Reward => i64::MAX,
    }
}
