use log::info;
use serde::Serialize;

use crate::blockchain::Block;
use crate::transaction::Transaction;

/// Outbound notifications meant for the replication gateway.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "channel", content = "message")]
pub enum NodeEvent {
    /// Full snapshot of the local chain after it changed.
    #[serde(rename = "BLOCKCHAIN")]
    ChainChanged(Vec<Block>),
    /// A single transaction admitted into the local pool.
    #[serde(rename = "TRANSACTION_POOL")]
    TransactionAdmitted(Transaction),
}

/// Delivery of [`NodeEvent`]s to peers. Loopback suppression belongs to the
/// implementation.
pub trait Broadcaster: Send + Sync {
    fn broadcast(&self, event: NodeEvent);
}

/// Broadcaster that only logs. Used when no transport is attached.
#[derive(Debug, Default)]
pub struct LogBroadcaster;

impl Broadcaster for LogBroadcaster {
    fn broadcast(&self, event: NodeEvent) {
        match &event {
            NodeEvent::ChainChanged(chain) => info!(
                "broadcast chain: {} blocks, tip {}",
                chain.len(),
                chain.last().map(|b| b.hash.as_str()).unwrap_or_default()
            ),
            NodeEvent::TransactionAdmitted(tx) => info!("broadcast transaction {}", tx.id),
        }
    }
}
