use thiserror::Error;

/// Reasons a candidate chain's transaction data is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionDataFault {
    #[error("multiple miner rewards in block {block}")]
    MultipleRewards { block: usize },

    #[error("miner reward in block {block} has an invalid amount")]
    InvalidRewardAmount { block: usize },

    #[error("invalid transaction {id} in block {block}")]
    InvalidTransaction { block: usize, id: String },

    #[error("transaction {id} in block {block} asserts input {asserted}, history says {actual}")]
    StaleInputAmount {
        block: usize,
        id: String,
        asserted: u64,
        actual: u64,
    },

    #[error("duplicate transaction {id} in block {block}")]
    DuplicateTransaction { block: usize, id: String },
}

/// Rejections. None of these leave the ledger in a modified state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("amount {amount} exceeds balance {balance}")]
    InsufficientBalance { amount: u64, balance: u64 },

    #[error("invalid signature from {address}")]
    InvalidSignature { address: String },

    #[error("invalid transaction from {address}: outputs total {outputs}, input {input}")]
    InvalidTransactionTotal {
        address: String,
        outputs: u64,
        input: u64,
    },

    #[error("reward transactions cannot be verified on their own")]
    UnverifiableReward,

    #[error("the incoming chain must be longer ({incoming} <= {local})")]
    ChainTooShort { incoming: usize, local: usize },

    #[error("the incoming chain must be valid")]
    ChainStructurallyInvalid,

    #[error("incoming chain has invalid data: {0}")]
    ChainTransactionDataInvalid(#[from] TransactionDataFault),

    #[error("mined block no longer extends the chain tip")]
    StaleBlock,

    #[error("mining aborted: the chain changed during the search")]
    MiningAborted,
}
