use chrono::Utc;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::blockchain::MINING_REWARD;
use crate::crypto::verify_signature;
use crate::error::LedgerError;
use crate::wallet::Wallet;

/// Recipient address -> amount.
pub type OutputMap = BTreeMap<String, u64>;

/// Signed input of a regular transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub timestamp: i64,
    /// Whole balance the sender asserts, not the amount sent.
    pub amount: u64,
    pub address: String,
    /// Hex-encoded DER ECDSA signature over the output map.
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TxInput {
    Signed(Input),
    /// Miner reward. Has no signer and an implied amount of `MINING_REWARD`.
    Reward,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub output_map: OutputMap,
    pub input: TxInput,
}

impl Transaction {
    /// Send `amount` to `recipient` out of the sender wallet's current balance.
    pub fn new(sender: &Wallet, recipient: &str, amount: u64) -> Result<Self, LedgerError> {
        if amount > sender.balance {
            return Err(LedgerError::InsufficientBalance {
                amount,
                balance: sender.balance,
            });
        }

        let mut output_map = OutputMap::new();
        output_map.insert(recipient.to_string(), amount);
        output_map.insert(sender.address(), sender.balance - amount);

        let input = TxInput::Signed(Self::signed_input(sender, sender.balance, &output_map));
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            output_map,
            input,
        })
    }

    /// Reward transaction crediting `MINING_REWARD` to the miner.
    pub fn reward(miner_address: &str) -> Self {
        let mut output_map = OutputMap::new();
        output_map.insert(miner_address.to_string(), MINING_REWARD);
        Self {
            id: Uuid::new_v4().to_string(),
            output_map,
            input: TxInput::Reward,
        }
    }

    fn signed_input(sender: &Wallet, amount: u64, output_map: &OutputMap) -> Input {
        Input {
            timestamp: Utc::now().timestamp_millis(),
            amount,
            address: sender.address(),
            signature: sender.sign(&json!(output_map)),
        }
    }

    /// Add another payment to this transaction out of the sender's remaining
    /// change output, then re-sign from scratch. Nothing changes on error.
    pub fn update(&mut self, sender: &Wallet, recipient: &str, amount: u64) -> Result<(), LedgerError> {
        let sender_address = sender.address();
        let remaining = self.output_map.get(&sender_address).copied().unwrap_or(0);
        if amount > remaining {
            return Err(LedgerError::InsufficientBalance {
                amount,
                balance: remaining,
            });
        }

        *self.output_map.entry(recipient.to_string()).or_insert(0) += amount;
        if let Some(change) = self.output_map.get_mut(&sender_address) {
            *change -= amount;
        }

        let input_amount = self.input_amount();
        self.input = TxInput::Signed(Self::signed_input(sender, input_amount, &self.output_map));
        Ok(())
    }

    pub fn is_reward(&self) -> bool {
        matches!(self.input, TxInput::Reward)
    }

    /// Sender address, `None` for rewards.
    pub fn sender(&self) -> Option<&str> {
        match &self.input {
            TxInput::Signed(input) => Some(&input.address),
            TxInput::Reward => None,
        }
    }

    /// Amount the input accounts for.
    pub fn input_amount(&self) -> u64 {
        match &self.input {
            TxInput::Signed(input) => input.amount,
            TxInput::Reward => MINING_REWARD,
        }
    }

    /// Sum of all outputs, `None` on overflow.
    pub fn output_total(&self) -> Option<u64> {
        self.output_map
            .values()
            .try_fold(0u64, |acc, amount| acc.checked_add(*amount))
    }

    /// Checks totals and signature of a regular transaction.
    pub fn verify(&self) -> Result<(), LedgerError> {
        let TxInput::Signed(input) = &self.input else {
            return Err(LedgerError::UnverifiableReward);
        };

        let outputs = self.output_total();
        if outputs != Some(input.amount) {
            return Err(LedgerError::InvalidTransactionTotal {
                address: input.address.clone(),
                outputs: outputs.unwrap_or(u64::MAX),
                input: input.amount,
            });
        }

        if !verify_signature(&input.address, &json!(self.output_map), &input.signature) {
            return Err(LedgerError::InvalidSignature {
                address: input.address.clone(),
            });
        }

        Ok(())
    }

    /// Boolean form of [`Transaction::verify`]; logs why a transaction fails.
    pub fn validate(&self) -> bool {
        match self.verify() {
            Ok(()) => true,
            Err(e) => {
                warn!("transaction {} rejected: {}", self.id, e);
                false
            }
        }
    }
}
