use serde::{Deserialize, Serialize};

use crate::blockchain::Block;
use crate::error::LedgerError;
use crate::node::Node;
use crate::transaction::Transaction;

/// Shared application state: the replica itself.
pub type AppState = Node;

/* ---------- Chain API Models ---------- */

#[derive(Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlockOrder {
    #[default]
    Newest,
    Oldest,
}

#[derive(Deserialize)]
pub struct BlocksQuery {
    #[serde(default)]
    pub order: BlockOrder,
}

#[derive(Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub length: usize,
    pub difficulty: u32,
}

#[derive(Serialize)]
pub struct MineResponse {
    pub mined_index: usize,
    pub block: Block,
}

/* ---------- TX API Models ---------- */

#[derive(Deserialize)]
pub struct TransactRequest {
    pub recipient: String,
    pub amount: u64,
}

#[derive(Serialize)]
pub struct TransactResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub transaction: Transaction,
}

/* ---------- Errors ---------- */

#[derive(Serialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: String,
}

impl From<&LedgerError> for ErrorResponse {
    fn from(e: &LedgerError) -> Self {
        Self {
            kind: "error",
            message: e.to_string(),
        }
    }
}

/* ---------- Peer API Models ---------- */

#[derive(Serialize)]
pub struct ReplaceResponse {
    pub replaced: bool,
    pub length: usize,
}
