use alloy::primitives::B256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a tracked write is doing, from the dashboard's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Approve,
    Deposit,
    Withdraw,
}

/// Lifecycle of a submitted transaction: `Submitted` until the receipt
/// watcher observes a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum TxState {
    Submitted,
    Confirmed,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub hash: B256,
    pub kind: TxKind,
    #[serde(flatten)]
    pub state: TxState,
    pub submitted_at: DateTime<Utc>,
}

impl PendingTransaction {
    pub fn submitted(hash: B256, kind: TxKind) -> Self {
        Self {
            hash,
            kind,
            state: TxState::Submitted,
            submitted_at: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self.state, TxState::Submitted)
    }
}
