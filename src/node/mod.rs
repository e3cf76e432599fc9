pub mod events;
pub mod miner;

use log::{debug, warn};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::blockchain::{Block, Blockchain, MINE_RATE_MS};
use crate::error::LedgerError;
use crate::transaction::{Transaction, TransactionMap, TransactionPool};
use crate::wallet::Wallet;

pub use events::{Broadcaster, LogBroadcaster, NodeEvent};
pub use miner::{MinedBlock, TransactionMiner};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletInfo {
    pub address: String,
    pub balance: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeStats {
    pub height: usize,
    pub difficulty: u32,
    pub mine_rate_ms: i64,
    pub last_interval_ms: Option<i64>,
    pub pool_size: usize,
}

/// One replica: chain, pool and wallet behind their own locks.
///
/// Locks are always taken in the order wallet, chain, pool. `chain_epoch` is
/// bumped under the chain lock on every chain mutation; an in-flight mining
/// search gives up when it sees the epoch move.
pub struct Node {
    blockchain: Mutex<Blockchain>,
    pool: Mutex<TransactionPool>,
    wallet: Mutex<Wallet>,
    chain_epoch: AtomicU64,
    broadcaster: Arc<dyn Broadcaster>,
}

impl Node {
    pub fn new(wallet: Wallet, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            blockchain: Mutex::new(Blockchain::new()),
            pool: Mutex::new(TransactionPool::new()),
            wallet: Mutex::new(wallet),
            chain_epoch: AtomicU64::new(0),
            broadcaster,
        }
    }

    /// Pay `recipient` from this node's wallet.
    pub fn submit_transaction(&self, recipient: &str, amount: u64) -> Result<Transaction, LedgerError> {
        let mut wallet = self.wallet.lock().expect("mutex poisoned");
        self.submit_transaction_with(&mut wallet, recipient, amount)
    }

    /// Pay `recipient` from `wallet`. A valid pending transaction from the
    /// same sender is extended with [`Transaction::update`]; otherwise a new
    /// one is built against the balance derived from the current chain. The
    /// result is admitted and broadcast.
    ///
    /// Pending entries claiming this sender that fail validation (a peer can
    /// admit anything) are dropped first so they are never re-signed.
    pub fn submit_transaction_with(
        &self,
        wallet: &mut Wallet,
        recipient: &str,
        amount: u64,
    ) -> Result<Transaction, LedgerError> {
        let tx = {
            let bc = self.blockchain.lock().expect("mutex poisoned");
            let mut pool = self.pool.lock().expect("mutex poisoned");
            let address = wallet.address();

            let dropped = pool.drop_invalid_from(&address);
            if dropped > 0 {
                warn!("dropped {} invalid pending transaction(s) claiming {}", dropped, address);
            }

            match pool.existing_transaction_mut(&address) {
                Some(existing) => {
                    existing.update(wallet, recipient, amount)?;
                    existing.clone()
                }
                None => {
                    let tx = wallet.create_transaction(amount, recipient, Some(&bc.chain))?;
                    pool.set_transaction(tx.clone());
                    tx
                }
            }
        };

        debug!("transaction {} admitted to pool", tx.id);
        self.broadcaster
            .broadcast(NodeEvent::TransactionAdmitted(tx.clone()));
        Ok(tx)
    }

    /// Admit a transaction received from a peer.
    pub fn admit_transaction(&self, tx: Transaction) {
        debug!("transaction {} received from peer", tx.id);
        self.pool.lock().expect("mutex poisoned").set_transaction(tx);
    }

    /// Adopt `candidate` if it is longer and fully valid, pruning the pool of
    /// whatever it commits.
    pub fn replace_chain(&self, candidate: Vec<Block>) -> Result<(), LedgerError> {
        let mut bc = self.blockchain.lock().expect("mutex poisoned");
        bc.replace_chain(candidate, true, |chain| {
            self.pool
                .lock()
                .expect("mutex poisoned")
                .clear_committed(chain);
        })?;
        self.chain_epoch.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Last writer wins.
    pub fn replace_pool(&self, map: TransactionMap) {
        self.pool.lock().expect("mutex poisoned").set_map(map);
    }

    pub fn mine_transactions(&self) -> Result<MinedBlock, LedgerError> {
        let miner_address = self.wallet.lock().expect("mutex poisoned").address();
        TransactionMiner {
            blockchain: &self.blockchain,
            pool: &self.pool,
            chain_epoch: &self.chain_epoch,
            broadcaster: self.broadcaster.as_ref(),
            miner_address,
        }
        .mine_transactions()
    }

    /// Oldest block first.
    pub fn chain(&self) -> Vec<Block> {
        self.blockchain.lock().expect("mutex poisoned").chain.clone()
    }

    pub fn chain_newest_first(&self) -> Vec<Block> {
        let mut chain = self.chain();
        chain.reverse();
        chain
    }

    pub fn is_chain_valid(&self) -> bool {
        let bc = self.blockchain.lock().expect("mutex poisoned");
        Blockchain::is_valid_chain(&bc.chain)
    }

    pub fn pool_map(&self) -> TransactionMap {
        self.pool
            .lock()
            .expect("mutex poisoned")
            .transaction_map()
            .clone()
    }

    /// Address and chain-derived balance of this node's wallet.
    pub fn wallet_info(&self) -> WalletInfo {
        let address = self.wallet.lock().expect("mutex poisoned").address();
        let bc = self.blockchain.lock().expect("mutex poisoned");
        WalletInfo {
            balance: Wallet::calculate_balance(&bc.chain, &address),
            address,
        }
    }

    pub fn known_addresses(&self) -> BTreeSet<String> {
        self.blockchain
            .lock()
            .expect("mutex poisoned")
            .known_addresses()
    }

    pub fn stats(&self) -> NodeStats {
        let (height, difficulty, last_interval_ms) = {
            let bc = self.blockchain.lock().expect("mutex poisoned");
            let last_interval = match bc.chain.as_slice() {
                [.., older, newer] if bc.len() > 2 => Some(newer.timestamp.saturating_sub(older.timestamp)),
                _ => None,
            };
            (bc.len(), bc.difficulty(), last_interval)
        };
        let pool_size = self.pool.lock().expect("mutex poisoned").len();

        NodeStats {
            height,
            difficulty,
            mine_rate_ms: MINE_RATE_MS,
            last_interval_ms,
            pool_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::events::testing::RecordingBroadcaster;
    use super::*;
    use crate::blockchain::{MINING_REWARD, STARTING_BALANCE};
    use crate::crypto::hash_meets_difficulty;
    use crate::transaction::{OutputMap, TxInput};

    fn node() -> (Node, Arc<RecordingBroadcaster>) {
        let recorder = Arc::new(RecordingBroadcaster::default());
        (Node::new(Wallet::new(), recorder.clone()), recorder)
    }

    #[test]
    fn submit_admits_and_broadcasts() {
        let (node, recorder) = node();
        let tx = node.submit_transaction("foo", 50).unwrap();

        assert_eq!(node.pool_map().get(&tx.id), Some(&tx));
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec![NodeEvent::TransactionAdmitted(tx)]
        );
    }

    #[test]
    fn repeated_submits_coalesce_into_one_transaction() {
        let (node, _) = node();
        let first = node.submit_transaction("foo", 50).unwrap();
        let second = node.submit_transaction("bar", 25).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(node.pool_map().len(), 1);
        assert_eq!(second.output_map["foo"], 50);
        assert_eq!(second.output_map["bar"], 25);
        assert!(second.validate());
    }

    #[test]
    fn forged_pending_entry_is_never_re_signed() {
        let (node, _) = node();
        let address = node.wallet_info().address;

        let mut forged = Transaction::new(&Wallet::new(), "attacker", 1).unwrap();
        forged.output_map = OutputMap::from([("attacker".into(), 900), (address.clone(), 100)]);
        if let TxInput::Signed(input) = &mut forged.input {
            input.address = address.clone();
            input.amount = STARTING_BALANCE;
            input.signature = "00".into();
        }
        node.admit_transaction(forged.clone());

        let tx = node.submit_transaction("foo", 1).unwrap();

        assert_ne!(tx.id, forged.id);
        assert!(tx.validate());
        assert!(!tx.output_map.contains_key("attacker"));
        assert_eq!(tx.output_map[&address], STARTING_BALANCE - 1);
        assert!(!node.pool_map().contains_key(&forged.id));

        let block = node.mine_transactions().unwrap().block;
        assert!(block.data.iter().all(|tx| !tx.output_map.contains_key("attacker")));
    }

    #[test]
    fn adopting_a_far_past_tip_does_not_break_mining() {
        let (node, _) = node();
        let genesis = Block::genesis();
        let data = vec![Transaction::reward("someone")];
        let (timestamp, difficulty) = (i64::MIN, genesis.difficulty - 1);

        let mut nonce = 0;
        let hash = loop {
            let hash = Block::compute_hash(timestamp, &genesis.hash, nonce, difficulty, &data);
            if hash_meets_difficulty(&hash, difficulty) {
                break hash;
            }
            nonce += 1;
        };
        let tip = Block {
            timestamp,
            last_hash: genesis.hash.clone(),
            hash,
            nonce,
            difficulty,
            data,
        };
        node.replace_chain(vec![genesis, tip]).unwrap();

        let mined = node.mine_transactions().unwrap();
        assert_eq!(mined.index, 2);
        assert_eq!(mined.block.difficulty, 1);
        assert_eq!(node.stats().last_interval_ms, Some(i64::MAX));
    }

    #[test]
    fn submit_over_balance_changes_nothing() {
        let (node, recorder) = node();
        let err = node.submit_transaction("foo", 9_999_999).unwrap_err();

        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert!(node.pool_map().is_empty());
        assert!(recorder.events.lock().unwrap().is_empty());
    }

    #[test]
    fn mining_commits_pool_and_clears_it() {
        let (node, recorder) = node();
        let tx = node.submit_transaction("foo", 50).unwrap();

        let MinedBlock { index, block } = node.mine_transactions().unwrap();

        assert_eq!(index, 1);
        assert_eq!(block.data.len(), 2);
        assert_eq!(block.data[0], tx);
        assert!(block.data[1].is_reward());
        assert!(node.pool_map().is_empty());
        assert!(node.is_chain_valid());
        assert_eq!(node.chain().len(), 2);
        assert_eq!(node.chain_newest_first()[0], block);

        // 1000 - 50 change, plus the reward in the same block.
        let info = node.wallet_info();
        assert_eq!(info.balance, STARTING_BALANCE - 50 + MINING_REWARD);

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.last(), Some(&NodeEvent::ChainChanged(node.chain())));
    }

    #[test]
    fn mining_skips_invalid_pool_entries() {
        let (node, _) = node();
        let mut forged = Transaction::new(&Wallet::new(), "foo", 10).unwrap();
        forged.output_map.insert("foo".into(), 1_000_000);
        node.admit_transaction(forged);

        let block = node.mine_transactions().unwrap().block;
        assert_eq!(block.data.len(), 1);
        assert!(block.data[0].is_reward());
    }

    #[test]
    fn peer_chain_replaces_and_prunes_pool() {
        let (peer, _) = node();
        let (local, _) = node();

        let tx = peer.submit_transaction("foo", 30).unwrap();
        local.admit_transaction(tx.clone());
        let untouched = Transaction::new(&Wallet::new(), "bar", 5).unwrap();
        local.admit_transaction(untouched.clone());

        peer.mine_transactions().unwrap();
        local.replace_chain(peer.chain()).unwrap();

        assert_eq!(local.chain(), peer.chain());
        let pool = local.pool_map();
        assert!(!pool.contains_key(&tx.id));
        assert!(pool.contains_key(&untouched.id));
    }

    #[test]
    fn rejected_peer_chain_leaves_state_alone() {
        let (peer, _) = node();
        let (local, _) = node();
        local.mine_transactions().unwrap();
        local.mine_transactions().unwrap();
        peer.mine_transactions().unwrap();

        let before = local.chain();
        let err = local.replace_chain(peer.chain()).unwrap_err();
        assert!(matches!(err, LedgerError::ChainTooShort { .. }));
        assert_eq!(local.chain(), before);
    }

    #[test]
    fn replace_pool_overwrites_map() {
        let (node, _) = node();
        node.submit_transaction("foo", 1).unwrap();

        let tx = Transaction::new(&Wallet::new(), "bar", 2).unwrap();
        let mut map = TransactionMap::new();
        map.insert(tx.id.clone(), tx);
        node.replace_pool(map.clone());

        assert_eq!(node.pool_map(), map);
    }

    #[test]
    fn known_addresses_and_stats_follow_the_chain() {
        let (node, _) = node();
        assert!(node.known_addresses().is_empty());
        assert_eq!(node.stats().last_interval_ms, None);

        node.submit_transaction("foo", 1).unwrap();
        node.mine_transactions().unwrap();
        node.mine_transactions().unwrap();

        let known = node.known_addresses();
        assert!(known.contains("foo"));
        assert!(known.contains(&node.wallet_info().address));

        let stats = node.stats();
        assert_eq!(stats.height, 3);
        assert_eq!(stats.pool_size, 0);
        assert!(stats.last_interval_ms.is_some());
    }
}
