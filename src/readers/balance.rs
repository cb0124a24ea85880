use alloy::primitives::Address;
use std::sync::Arc;

use crate::amount::TokenAmount;
use crate::blockchain::ChainReader;
use crate::error::AppError;
use crate::models::Asset;

/// Point-in-time balance reads for the active account. No caching: the
/// session re-invokes this after every state-changing event.
pub struct BalanceReader {
    chain: Arc<dyn ChainReader>,
}

impl BalanceReader {
    pub fn new(chain: Arc<dyn ChainReader>) -> Self {
        Self { chain }
    }

    pub async fn read(
        &self,
        account: Option<Address>,
        asset: Asset,
        decimals: u8,
    ) -> Result<TokenAmount, AppError> {
        let owner = account.ok_or(AppError::NotConnected)?;
        let raw = match asset {
            Asset::Native => self.chain.native_balance(owner).await?,
            Asset::Erc20(token) => self.chain.erc20_balance(token, owner).await?,
        };
        Ok(TokenAmount::new(raw, decimals))
    }
}
