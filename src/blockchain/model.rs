use log::{error, info};
use std::collections::{BTreeSet, HashSet};

use super::{Block, MINING_REWARD};
use crate::error::{LedgerError, TransactionDataFault};
use crate::transaction::{Transaction, TxInput};
use crate::wallet::Wallet;

/// Simple in-memory blockchain with Proof-of-Work.
#[derive(Debug, Clone)]
pub struct Blockchain {
    pub chain: Vec<Block>,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    /// Initialize a new blockchain with the genesis block.
    pub fn new() -> Self {
        Self {
            chain: vec![Block::genesis()],
        }
    }

    /// Return the last block in the chain.
    pub fn last_block(&self) -> &Block {
        // Never empty: starts with genesis and is only replaced by valid chains.
        &self.chain[self.chain.len() - 1]
    }

    /// Mine and append a new block holding `data`.
    pub fn add_block(&mut self, data: Vec<Transaction>) -> &Block {
        let block = Block::mine(self.last_block(), data);
        self.chain.push(block);
        self.last_block()
    }

    /// Append a block mined elsewhere against what was then the tip.
    pub fn append_mined_block(&mut self, block: Block) -> Result<&Block, LedgerError> {
        let tip = self.last_block();
        if block.last_hash != tip.hash
            || !block.is_valid()
            || tip.difficulty.abs_diff(block.difficulty) > 1
        {
            return Err(LedgerError::StaleBlock);
        }
        self.chain.push(block);
        Ok(self.last_block())
    }

    /// Structural validation: genesis, linkage, hash integrity, PoW and
    /// difficulty steps of at most one.
    pub fn is_valid_chain(chain: &[Block]) -> bool {
        let Some(first) = chain.first() else {
            return false;
        };
        if *first != Block::genesis() {
            return false;
        }

        chain.windows(2).all(|pair| {
            let (prev, current) = (&pair[0], &pair[1]);
            current.last_hash == prev.hash
                && current.is_valid()
                && prev.difficulty.abs_diff(current.difficulty) <= 1
        })
    }

    /// Validate the transactions of an incoming `chain` against this (local)
    /// chain's balances.
    pub fn validate_transaction_data(&self, chain: &[Block]) -> Result<(), TransactionDataFault> {
        let mut seen: HashSet<&str> = HashSet::new();

        for (index, block) in chain.iter().enumerate().skip(1) {
            let mut reward_count = 0;

            for tx in &block.data {
                match &tx.input {
                    TxInput::Reward => {
                        reward_count += 1;
                        if reward_count > 1 {
                            return Err(TransactionDataFault::MultipleRewards { block: index });
                        }
                        let mut amounts = tx.output_map.values();
                        if amounts.next() != Some(&MINING_REWARD) || amounts.next().is_some() {
                            return Err(TransactionDataFault::InvalidRewardAmount { block: index });
                        }
                    }
                    TxInput::Signed(input) => {
                        if !tx.validate() {
                            return Err(TransactionDataFault::InvalidTransaction {
                                block: index,
                                id: tx.id.clone(),
                            });
                        }

                        let real_balance = Wallet::calculate_balance(&self.chain, &input.address);
                        if input.amount != real_balance {
                            return Err(TransactionDataFault::StaleInputAmount {
                                block: index,
                                id: tx.id.clone(),
                                asserted: input.amount,
                                actual: real_balance,
                            });
                        }

                        if !seen.insert(&tx.id) {
                            return Err(TransactionDataFault::DuplicateTransaction {
                                block: index,
                                id: tx.id.clone(),
                            });
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Longest-valid-chain rule. Replaces the whole chain or nothing;
    /// `on_success` runs just before the swap.
    pub fn replace_chain<F>(
        &mut self,
        chain: Vec<Block>,
        validate_transactions: bool,
        on_success: F,
    ) -> Result<(), LedgerError>
    where
        F: FnOnce(&[Block]),
    {
        let result = self.check_replacement(&chain, validate_transactions);
        if let Err(e) = &result {
            error!("chain replacement rejected: {}", e);
            return result;
        }

        on_success(&chain);
        info!(
            "replacing chain: {} -> {} blocks (tip {})",
            self.chain.len(),
            chain.len(),
            chain.last().map(|b| b.hash.as_str()).unwrap_or_default()
        );
        self.chain = chain;
        Ok(())
    }

    fn check_replacement(&self, chain: &[Block], validate_transactions: bool) -> Result<(), LedgerError> {
        if validate_transactions {
            self.validate_transaction_data(chain)?;
        }
        if chain.len() <= self.chain.len() {
            return Err(LedgerError::ChainTooShort {
                incoming: chain.len(),
                local: self.chain.len(),
            });
        }
        if !Self::is_valid_chain(chain) {
            return Err(LedgerError::ChainStructurallyInvalid);
        }
        Ok(())
    }

    /// Every address that appears as an output anywhere in the chain.
    pub fn known_addresses(&self) -> BTreeSet<String> {
        self.chain
            .iter()
            .flat_map(|block| &block.data)
            .flat_map(|tx| tx.output_map.keys().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn difficulty(&self) -> u32 {
        self.last_block().difficulty
    }
}
