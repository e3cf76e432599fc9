pub mod block;
pub mod model;

pub use block::Block;
pub use model::Blockchain;

/// Difficulty of the genesis block (leading zero bits).
pub const INITIAL_DIFFICULTY: u32 = 3;

/// Target milliseconds per block. Slower blocks lower difficulty, faster raise it.
pub const MINE_RATE_MS: i64 = 1000;

/// Balance every address starts with before any history.
pub const STARTING_BALANCE: u64 = 1000;

/// Fixed amount credited to a block's miner.
pub const MINING_REWARD: u64 = 50;
