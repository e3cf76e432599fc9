//! Single-process proof-of-work ledger: blocks, signed transfers, balances
//! derived from chain history, a local transaction pool and the
//! longest-valid-chain rule.

pub mod api;
pub mod blockchain;
pub mod config;
pub mod crypto;
pub mod error;
pub mod node;
pub mod transaction;
pub mod wallet;

pub use error::{LedgerError, TransactionDataFault};
