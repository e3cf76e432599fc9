use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{INITIAL_DIFFICULTY, MINE_RATE_MS};
use crate::crypto::hash::digest_serialized;
use crate::crypto::hash_meets_difficulty;
use crate::transaction::Transaction;

/// A single block in the blockchain holding a list of transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub timestamp: i64, // Unix millis (UTC)
    pub last_hash: String,
    pub hash: String,
    pub nonce: u64,
    pub difficulty: u32,
    pub data: Vec<Transaction>,
}

impl Block {
    /// The genesis block, identical on every replica.
    pub fn genesis() -> Self {
        Self {
            timestamp: 1,
            last_hash: String::from("----"),
            hash: String::from("gen-hash"),
            nonce: 0,
            difficulty: INITIAL_DIFFICULTY,
            data: Vec::new(),
        }
    }

    /// Hash over the block fields (excluding `hash` itself).
    pub fn compute_hash(
        timestamp: i64,
        last_hash: &str,
        nonce: u64,
        difficulty: u32,
        data: &[Transaction],
    ) -> String {
        let data_json = json!(data).to_string();
        hash_fields(timestamp, last_hash, nonce, difficulty, &data_json)
    }

    /// Recompute this block's hash from its contents.
    pub fn recompute_hash(&self) -> String {
        Self::compute_hash(
            self.timestamp,
            &self.last_hash,
            self.nonce,
            self.difficulty,
            &self.data,
        )
    }

    /// Perform Proof-of-Work on top of `last_block` until a hash with
    /// `difficulty` leading zero bits is found. Unbounded.
    pub fn mine(last_block: &Block, data: Vec<Transaction>) -> Self {
        let mut search = NonceSearch::new(last_block, data);
        loop {
            if let Some(block) = search.attempt() {
                return block;
            }
        }
    }

    /// Same search as [`Block::mine`], but `should_abort` is polled before
    /// every attempt. Returns `None` once it reports true.
    pub fn mine_cancellable<F>(last_block: &Block, data: Vec<Transaction>, should_abort: F) -> Option<Self>
    where
        F: Fn() -> bool,
    {
        let mut search = NonceSearch::new(last_block, data);
        loop {
            if should_abort() {
                return None;
            }
            if let Some(block) = search.attempt() {
                return Some(block);
            }
        }
    }

    /// Retarget against the previous block: lower by one when the gap exceeds
    /// `MINE_RATE_MS`, raise by one otherwise. Never below 1.
    pub fn adjust_difficulty(prev_block: &Block, timestamp: i64) -> u32 {
        let difficulty = prev_block.difficulty;
        if difficulty < 1 {
            return 1;
        }
        if timestamp.saturating_sub(prev_block.timestamp) > MINE_RATE_MS {
            difficulty.saturating_sub(1).max(1)
        } else {
            difficulty.saturating_add(1)
        }
    }

    /// Hash integrity plus PoW. (Does NOT validate chain linkage.)
    pub fn is_valid(&self) -> bool {
        self.hash == self.recompute_hash() && hash_meets_difficulty(&self.hash, self.difficulty)
    }
}

fn hash_fields(timestamp: i64, last_hash: &str, nonce: u64, difficulty: u32, data_json: &str) -> String {
    let parts = vec![
        Value::from(timestamp).to_string(),
        Value::from(last_hash).to_string(),
        Value::from(nonce).to_string(),
        Value::from(difficulty).to_string(),
        data_json.to_string(),
    ];
    hex::encode(digest_serialized(parts))
}

/// Nonce search state. `data` is serialized once and reused for every attempt.
struct NonceSearch<'a> {
    last_block: &'a Block,
    data: Vec<Transaction>,
    data_json: String,
    nonce: u64,
}

impl<'a> NonceSearch<'a> {
    fn new(last_block: &'a Block, data: Vec<Transaction>) -> Self {
        let data_json = json!(data).to_string();
        Self {
            last_block,
            data,
            data_json,
            nonce: 0,
        }
    }

    fn attempt(&mut self) -> Option<Block> {
        self.nonce = self.nonce.wrapping_add(1);
        let timestamp = Utc::now().timestamp_millis();
        let difficulty = Block::adjust_difficulty(self.last_block, timestamp);
        let hash = hash_fields(
            timestamp,
            &self.last_block.hash,
            self.nonce,
            difficulty,
            &self.data_json,
        );

        if !hash_meets_difficulty(&hash, difficulty) {
            return None;
        }

        Some(Block {
            timestamp,
            last_hash: self.last_block.hash.clone(),
            hash,
            nonce: self.nonce,
            difficulty,
            data: std::mem::take(&mut self.data),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::crypto_hash;
    use crate::transaction::Transaction;
    use std::cell::Cell;
    use proptest::prelude::*;

    #[test]
    fn genesis_matches_fixed_data() {
        let b = Block::genesis();
        assert_eq!(b.timestamp, 1);
        assert_eq!(b.last_hash, "----");
        assert_eq!(b.hash, "gen-hash");
        assert_eq!(b.difficulty, INITIAL_DIFFICULTY);
        assert!(b.data.is_empty());
        assert_eq!(b, Block::genesis());
    }

    #[test]
    fn mined_block_links_to_last_block() {
        let last = Block::genesis();
        let mined = Block::mine(&last, vec![Transaction::reward("miner")]);
        assert_eq!(mined.last_hash, last.hash);
        assert_eq!(mined.data.len(), 1);
        assert!(mined.timestamp > 0);
    }

    #[test]
    fn mined_hash_meets_difficulty_and_matches_inputs() {
        let last = Block::genesis();
        let mined = Block::mine(&last, vec![Transaction::reward("miner")]);

        assert!(hash_meets_difficulty(&mined.hash, mined.difficulty));
        assert_eq!(
            mined.hash,
            crypto_hash(&[
                json!(mined.timestamp),
                json!(mined.last_hash),
                json!(mined.nonce),
                json!(mined.difficulty),
                json!(mined.data),
            ])
        );
        assert!(mined.is_valid());
    }

    #[test]
    fn mined_difficulty_moves_by_one() {
        let last = Block::genesis();
        let mined = Block::mine(&last, Vec::new());
        assert!([last.difficulty + 1, last.difficulty - 1].contains(&mined.difficulty));
    }

    #[test]
    fn raises_difficulty_of_quickly_mined_block() {
        let block = Block::genesis();
        let ts = block.timestamp + MINE_RATE_MS - 100;
        assert_eq!(Block::adjust_difficulty(&block, ts), block.difficulty + 1);
    }

    #[test]
    fn lowers_difficulty_of_slowly_mined_block() {
        let block = Block::genesis();
        let ts = block.timestamp + MINE_RATE_MS + 100;
        assert_eq!(Block::adjust_difficulty(&block, ts), block.difficulty - 1);
    }

    #[test]
    fn difficulty_never_drops_below_one() {
        let mut block = Block::genesis();
        let ts = block.timestamp + MINE_RATE_MS + 100;

        block.difficulty = 1;
        assert_eq!(Block::adjust_difficulty(&block, ts), 1);
        block.difficulty = 0;
        assert_eq!(Block::adjust_difficulty(&block, ts), 1);
    }

    #[test]
    fn extreme_timestamps_do_not_overflow() {
        let mut block = Block::genesis();
        block.timestamp = i64::MIN;
        assert_eq!(Block::adjust_difficulty(&block, i64::MAX), block.difficulty - 1);

        block.timestamp = i64::MAX;
        assert_eq!(Block::adjust_difficulty(&block, i64::MIN), block.difficulty + 1);
    }

    #[test]
    fn invalid_when_mutated() {
        let mut b = Block::mine(&Block::genesis(), vec![Transaction::reward("miner")]);
        assert!(b.is_valid());

        b.data.push(Transaction::reward("thief"));
        assert_ne!(b.hash, b.recompute_hash());
        assert!(!b.is_valid());
    }

    #[test]
    fn cancellable_search_stops_when_asked() {
        let polls = Cell::new(0u32);
        let mined = Block::mine_cancellable(&Block::genesis(), Vec::new(), || {
            polls.set(polls.get() + 1);
            true
        });
        assert!(mined.is_none());
        assert_eq!(polls.get(), 1);
    }

    #[test]
    fn cancellable_search_finishes_when_not_aborted() {
        let mined = Block::mine_cancellable(&Block::genesis(), Vec::new(), || false);
        assert!(mined.is_some_and(|b| b.is_valid()));
    }

    proptest! {
        #[test]
        fn adjusted_difficulty_is_positive_and_close(
            prev_timestamp in any::<i64>(),
            timestamp in any::<i64>(),
            difficulty in any::<u32>()
        ) {
            let mut prev = Block::genesis();
            prev.timestamp = prev_timestamp;
            prev.difficulty = difficulty;

            let next = Block::adjust_difficulty(&prev, timestamp);
            prop_assert!(next >= 1);
            if difficulty > 1 {
                prop_assert!(next.abs_diff(difficulty) <= 1);
            }
        }
    }
}
