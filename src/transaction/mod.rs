pub mod model;
pub mod pool;

pub use model::{Input, OutputMap, Transaction, TxInput};
pub use pool::{TransactionMap, TransactionPool};
