use alloy::primitives::Address;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::amount::TokenAmount;
use crate::blockchain::ChainReader;
use crate::config::registry::{ContractAddresses, USDC_DECIMALS};
use crate::error::AppError;
use crate::models::{PositionSnapshot, ReserveRates, VaultHoldings};
use crate::units;

/// Reads the lending-protocol side of the account: aggregate position,
/// vault holdings, reserve rates and the ETH/USD reference price.
pub struct PositionReader {
    chain: Arc<dyn ChainReader>,
    contracts: ContractAddresses,
}

impl PositionReader {
    pub fn new(chain: Arc<dyn ChainReader>, contracts: ContractAddresses) -> Self {
        Self { chain, contracts }
    }

    /// One `getUserAccountData` call; all six snapshot fields originate
    /// from that single read.
    pub async fn account_data(
        &self,
        account: Option<Address>,
    ) -> Result<PositionSnapshot, AppError> {
        let user = account.ok_or(AppError::NotConnected)?;
        let raw = self.chain.account_data(self.contracts.pool, user).await?;
        let snapshot = PositionSnapshot::from(raw);
        if let Some(warning) = snapshot.consistency_warning() {
            tracing::warn!(user = %user, %warning, "provider returned an inconsistent snapshot");
        }
        Ok(snapshot)
    }

    /// Vault share balance and its underlying-asset value. `None` when no
    /// vault is configured for this deployment.
    pub async fn vault_holdings(
        &self,
        account: Option<Address>,
    ) -> Result<Option<VaultHoldings>, AppError> {
        let user = account.ok_or(AppError::NotConnected)?;
        let Some(vault) = self.contracts.vault else {
            return Ok(None);
        };
        let shares = self.chain.vault_shares(vault, user).await?;
        let underlying = self.chain.vault_assets_for_shares(vault, shares).await?;
        Ok(Some(VaultHoldings {
            shares: TokenAmount::new(shares, USDC_DECIMALS),
            underlying: TokenAmount::new(underlying, USDC_DECIMALS),
        }))
    }

    pub async fn reserve_rates(&self) -> Result<ReserveRates, AppError> {
        let raw = self
            .chain
            .reserve_rates(self.contracts.data_provider, self.contracts.usdc)
            .await?;
        Ok(ReserveRates::from(raw))
    }

    /// Latest ETH/USD price from the configured aggregator.
    pub async fn eth_usd_price(&self) -> Result<Decimal, AppError> {
        let (answer, decimals) = self.chain.oracle_price(self.contracts.eth_usd_feed).await?;
        units::u256_to_decimal(answer, u32::from(decimals)).ok_or_else(|| {
            AppError::ProviderUnavailable(format!(
                "price feed answer {answer} does not fit at {decimals} decimals"
            ))
        })
    }
}
