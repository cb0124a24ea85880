use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::transaction::PendingTransaction;

/// A raw amount plus its derived rendering. The raw string is the integer
/// magnitude in base units; `formatted` and `usd` are display-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayAmount {
    pub raw: String,
    pub decimals: u8,
    pub formatted: String,
    pub usd: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancesView {
    pub eth: Option<DisplayAmount>,
    pub usdc: Option<DisplayAmount>,
    pub a_usdc: Option<DisplayAmount>,
}

/// Coarse label over the health factor, for at-a-glance rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Danger,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionView {
    pub total_collateral_usd: String,
    pub total_debt_usd: String,
    pub available_borrows_usd: String,
    pub ltv_pct: String,
    pub liquidation_threshold_pct: String,
    pub health_factor: String,
    pub health_status: Option<HealthStatus>,
    /// Set when the snapshot violates a protocol invariant; the figures
    /// are still shown, but marked untrustworthy.
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultView {
    pub shares: DisplayAmount,
    pub underlying: DisplayAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatesView {
    pub supply_apy_pct: String,
    pub variable_borrow_apy_pct: String,
}

/// The single display-ready state object. Owned and written exclusively by
/// the session; presentation consumers only ever read snapshots of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewState {
    pub session_id: Uuid,
    pub account: Option<Address>,
    pub connected: bool,
    pub balances: BalancesView,
    pub position: Option<PositionView>,
    pub vault: Option<VaultView>,
    pub rates: Option<RatesView>,
    /// Underlying-asset value of everything the account has supplied:
    /// direct aToken balance plus vault shares converted to assets.
    pub total_supplied: Option<DisplayAmount>,
    pub pending: Vec<PendingTransaction>,
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ViewState {
    pub fn disconnected(session_id: Uuid) -> Self {
        Self {
            session_id,
            account: None,
            connected: false,
            balances: BalancesView::default(),
            position: None,
            vault: None,
            rates: None,
            total_supplied: None,
            pending: Vec::new(),
            last_error: None,
            updated_at: Utc::now(),
        }
    }
}
