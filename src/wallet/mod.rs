use serde_json::Value;

use crate::blockchain::{Block, STARTING_BALANCE};
use crate::crypto::KeyPair;
use crate::error::LedgerError;
use crate::transaction::Transaction;

/// A keypair plus a cached balance. The authoritative balance is always
/// recomputable from a chain with [`Wallet::calculate_balance`].
#[derive(Debug, Clone)]
pub struct Wallet {
    keypair: KeyPair,
    pub balance: u64,
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

impl Wallet {
    pub fn new() -> Self {
        Self {
            keypair: KeyPair::generate(),
            balance: STARTING_BALANCE,
        }
    }

    /// Hex of the compressed public key.
    pub fn address(&self) -> String {
        self.keypair.public_key_hex()
    }

    pub fn sign(&self, data: &Value) -> String {
        self.keypair.sign(data)
    }

    /// Build a signed transaction. When `chain` is given the cached balance is
    /// first recomputed from it.
    pub fn create_transaction(
        &mut self,
        amount: u64,
        recipient: &str,
        chain: Option<&[Block]>,
    ) -> Result<Transaction, LedgerError> {
        if let Some(chain) = chain {
            self.balance = Self::calculate_balance(chain, &self.address());
        }

        Transaction::new(self, recipient, amount)
    }

    /// Balance of `address` from chain history alone.
    ///
    /// Blocks are scanned from the tip back to (excluding) genesis, summing
    /// every output to `address`. The scan stops after the first block that
    /// holds a transaction sent by `address`: that transaction's change output
    /// already accounts for everything older. If no such transaction exists the
    /// starting balance is added.
    pub fn calculate_balance(chain: &[Block], address: &str) -> u64 {
        let mut has_conducted_transaction = false;
        let mut outputs_total: u64 = 0;

        for block in chain.iter().skip(1).rev() {
            for tx in &block.data {
                if tx.sender() == Some(address) {
                    has_conducted_transaction = true;
                }
                if let Some(amount) = tx.output_map.get(address) {
                    outputs_total = outputs_total.saturating_add(*amount);
                }
            }
            if has_conducted_transaction {
                break;
            }
        }

        if has_conducted_transaction {
            outputs_total
        } else {
            STARTING_BALANCE.saturating_add(outputs_total)
        }
    }
}
