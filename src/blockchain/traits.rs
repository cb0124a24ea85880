use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;

use crate::error::AppError;

/// The six fields of one `getUserAccountData` call, untouched. Keeping the
/// raw words together guarantees every derived display figure descends
/// from a single atomic read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawAccountData {
    pub total_collateral_base: U256,
    pub total_debt_base: U256,
    pub available_borrows_base: U256,
    pub current_liquidation_threshold: U256,
    pub ltv: U256,
    pub health_factor: U256,
}

/// Reserve interest rates in ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawReserveRates {
    pub liquidity_rate: U256,
    pub variable_borrow_rate: U256,
}

/// Distilled transaction receipt: inclusion status plus an optional
/// provider-supplied revert reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptStatus {
    pub success: bool,
    pub reason: Option<String>,
}

/// Read-only view of chain state.
///
/// The live implementation is [`crate::blockchain::EthereumClient`]; tests
/// substitute in-memory fakes. Every method is a point-in-time read with no
/// caching; callers decide when a re-read is due.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn native_balance(&self, owner: Address) -> Result<U256, AppError>;

    async fn erc20_balance(&self, token: Address, owner: Address) -> Result<U256, AppError>;

    async fn erc20_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, AppError>;

    async fn account_data(&self, pool: Address, user: Address)
        -> Result<RawAccountData, AppError>;

    async fn reserve_rates(
        &self,
        data_provider: Address,
        asset: Address,
    ) -> Result<RawReserveRates, AppError>;

    async fn vault_shares(&self, vault: Address, owner: Address) -> Result<U256, AppError>;

    async fn vault_assets_for_shares(
        &self,
        vault: Address,
        shares: U256,
    ) -> Result<U256, AppError>;

    async fn vault_max_withdraw(&self, vault: Address, owner: Address) -> Result<U256, AppError>;

    /// Latest price from a Chainlink-style aggregator: (answer, decimals).
    async fn oracle_price(&self, feed: Address) -> Result<(U256, u8), AppError>;

    /// `Ok(None)` means "not mined yet" and is the only condition the
    /// receipt watcher retries silently.
    async fn transaction_receipt(&self, hash: B256) -> Result<Option<ReceiptStatus>, AppError>;
}
