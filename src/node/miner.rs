use log::{debug, info, warn};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use super::events::{Broadcaster, NodeEvent};
use crate::blockchain::{Block, Blockchain};
use crate::error::LedgerError;
use crate::transaction::{Transaction, TransactionPool};

/// Turns the valid contents of the pool into a mined block.
pub struct TransactionMiner<'a> {
    pub(super) blockchain: &'a Mutex<Blockchain>,
    pub(super) pool: &'a Mutex<TransactionPool>,
    pub(super) chain_epoch: &'a AtomicU64,
    pub(super) broadcaster: &'a dyn Broadcaster,
    pub(super) miner_address: String,
}

/// A freshly appended block and its index in the chain it was appended to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinedBlock {
    pub index: usize,
    pub block: Block,
}

/// Everything a nonce search needs, captured under the locks.
pub(super) struct Candidate {
    parent: Block,
    data: Vec<Transaction>,
    epoch: u64,
}

impl TransactionMiner<'_> {
    /// Valid pool transactions plus one reward go into a new block. The PoW
    /// search runs without holding the chain lock and is abandoned as soon as
    /// the chain changes underneath it. On success the chain is broadcast and
    /// the whole pool is cleared.
    pub fn mine_transactions(&self) -> Result<MinedBlock, LedgerError> {
        let candidate = self.prepare();
        debug!(
            "MINER - {} transactions on top of {} (epoch {})",
            candidate.data.len(),
            candidate.parent.hash,
            candidate.epoch
        );

        let epoch = candidate.epoch;
        let Some(block) = Block::mine_cancellable(&candidate.parent, candidate.data, || {
            self.chain_epoch.load(Ordering::Acquire) != epoch
        }) else {
            warn!("MINER - search aborted, chain changed");
            return Err(LedgerError::MiningAborted);
        };

        let chain = self.commit(epoch, block.clone())?;
        let index = chain.len() - 1;
        info!(
            "MINER - sealed block #{} (hash={}, nonce={}, difficulty={})",
            index, block.hash, block.nonce, block.difficulty
        );

        self.broadcaster.broadcast(NodeEvent::ChainChanged(chain));
        self.pool.lock().expect("mutex poisoned").clear();
        Ok(MinedBlock { index, block })
    }

    pub(super) fn prepare(&self) -> Candidate {
        let mut data = self.pool.lock().expect("mutex poisoned").valid_transactions();
        data.push(Transaction::reward(&self.miner_address));

        let bc = self.blockchain.lock().expect("mutex poisoned");
        Candidate {
            parent: bc.last_block().clone(),
            data,
            epoch: self.chain_epoch.load(Ordering::Acquire),
        }
    }

    /// Append `block` if nothing touched the chain since `epoch`; returns the
    /// resulting chain snapshot.
    pub(super) fn commit(&self, epoch: u64, block: Block) -> Result<Vec<Block>, LedgerError> {
        let mut bc = self.blockchain.lock().expect("mutex poisoned");
        if self.chain_epoch.load(Ordering::Acquire) != epoch {
            warn!("MINER - chain changed before block {} could be appended", block.hash);
            return Err(LedgerError::MiningAborted);
        }
        bc.append_mined_block(block)?;
        self.chain_epoch.fetch_add(1, Ordering::AcqRel);
        Ok(bc.chain.clone())
    }
}
