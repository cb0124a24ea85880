pub mod position;
pub mod transaction;
pub mod view_state;

use alloy::primitives::Address;

pub use position::{HealthFactor, PositionSnapshot, ReserveRates, VaultHoldings};
pub use transaction::{PendingTransaction, TxKind, TxState};
pub use view_state::{
    BalancesView, DisplayAmount, HealthStatus, PositionView, RatesView, VaultView, ViewState,
};

/// A token identifier: the chain's native asset or an ERC-20 contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Asset {
    Native,
    Erc20(Address),
}
