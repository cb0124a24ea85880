use alloy::{
    primitives::{Address, B256, U256},
    providers::{Provider, RootProvider},
};
use async_trait::async_trait;
use std::str::FromStr;
use std::time::Duration;

use crate::blockchain::contracts::{
    IAavePoolV3, IAaveProtocolDataProvider, IAggregatorV3, IAutopilotVault, IERC20,
};
use crate::blockchain::traits::{ChainReader, RawAccountData, RawReserveRates, ReceiptStatus};
use crate::error::AppError;

const RPC_TIMEOUT: Duration = Duration::from_secs(20);
const RPC_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Live chain-data provider over an alloy HTTP transport.
#[derive(Debug, Clone)]
pub struct EthereumClient {
    provider: RootProvider,
    rpc_url: String,
}

fn rpc_err(context: &str, err: impl std::fmt::Display) -> AppError {
    AppError::ProviderUnavailable(format!("{context}: {err}"))
}

impl EthereumClient {
    /// Create a client and verify the endpoint answers before handing it
    /// to any reader.
    pub async fn new(rpc_url: &str) -> Result<Self, AppError> {
        let provider = Self::build_provider(rpc_url)?;
        let client = Self {
            provider,
            rpc_url: rpc_url.to_string(),
        };
        client.test_connection().await?;
        Ok(client)
    }

    fn build_provider(rpc_url: &str) -> Result<RootProvider, AppError> {
        let url: reqwest::Url = rpc_url
            .parse()
            .map_err(|e| AppError::ConfigError(format!("invalid RPC URL {rpc_url}: {e}")))?;
        let http_client = reqwest::Client::builder()
            .timeout(RPC_TIMEOUT)
            .connect_timeout(RPC_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| AppError::ConfigError(format!("failed to build RPC HTTP client: {e}")))?;
        let transport = alloy::transports::http::Http::with_client(http_client, url);
        let rpc_client = alloy::rpc::client::RpcClient::new(transport, false);
        Ok(RootProvider::new(rpc_client))
    }

    pub async fn test_connection(&self) -> Result<(), AppError> {
        let block_number = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| rpc_err("failed to reach RPC endpoint", e))?;
        tracing::info!(
            rpc_url = %self.rpc_url,
            block_number,
            "RPC connection established"
        );
        Ok(())
    }

    /// The underlying provider, for contract instantiation elsewhere
    /// (e.g. the local wallet's broadcast path).
    pub fn provider(&self) -> &RootProvider {
        &self.provider
    }

    pub fn validate_address(address: &str) -> Result<Address, AppError> {
        Address::from_str(address)
            .map_err(|e| AppError::InvalidInput(format!("invalid address {address}: {e}")))
    }
}

#[async_trait]
impl ChainReader for EthereumClient {
    async fn native_balance(&self, owner: Address) -> Result<U256, AppError> {
        self.provider
            .get_balance(owner)
            .await
            .map_err(|e| rpc_err("native balance query failed", e))
    }

    async fn erc20_balance(&self, token: Address, owner: Address) -> Result<U256, AppError> {
        let contract = IERC20::new(token, &self.provider);
        contract
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| rpc_err("erc20 balanceOf failed", e))
    }

    async fn erc20_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, AppError> {
        let contract = IERC20::new(token, &self.provider);
        contract
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| rpc_err("erc20 allowance failed", e))
    }

    async fn account_data(
        &self,
        pool: Address,
        user: Address,
    ) -> Result<RawAccountData, AppError> {
        let contract = IAavePoolV3::new(pool, &self.provider);
        let data = contract
            .getUserAccountData(user)
            .call()
            .await
            .map_err(|e| rpc_err("getUserAccountData failed", e))?;
        Ok(RawAccountData {
            total_collateral_base: data.totalCollateralBase,
            total_debt_base: data.totalDebtBase,
            available_borrows_base: data.availableBorrowsBase,
            current_liquidation_threshold: data.currentLiquidationThreshold,
            ltv: data.ltv,
            health_factor: data.healthFactor,
        })
    }

    async fn reserve_rates(
        &self,
        data_provider: Address,
        asset: Address,
    ) -> Result<RawReserveRates, AppError> {
        let contract = IAaveProtocolDataProvider::new(data_provider, &self.provider);
        let data = contract
            .getReserveData(asset)
            .call()
            .await
            .map_err(|e| rpc_err("getReserveData failed", e))?;
        Ok(RawReserveRates {
            liquidity_rate: data.liquidityRate,
            variable_borrow_rate: data.variableBorrowRate,
        })
    }

    async fn vault_shares(&self, vault: Address, owner: Address) -> Result<U256, AppError> {
        let contract = IAutopilotVault::new(vault, &self.provider);
        contract
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| rpc_err("vault balanceOf failed", e))
    }

    async fn vault_assets_for_shares(
        &self,
        vault: Address,
        shares: U256,
    ) -> Result<U256, AppError> {
        let contract = IAutopilotVault::new(vault, &self.provider);
        contract
            .convertToAssets(shares)
            .call()
            .await
            .map_err(|e| rpc_err("vault convertToAssets failed", e))
    }

    async fn vault_max_withdraw(&self, vault: Address, owner: Address) -> Result<U256, AppError> {
        let contract = IAutopilotVault::new(vault, &self.provider);
        contract
            .maxWithdraw(owner)
            .call()
            .await
            .map_err(|e| rpc_err("vault maxWithdraw failed", e))
    }

    async fn oracle_price(&self, feed: Address) -> Result<(U256, u8), AppError> {
        let contract = IAggregatorV3::new(feed, &self.provider);
        let decimals = contract
            .decimals()
            .call()
            .await
            .map_err(|e| rpc_err("price feed decimals failed", e))?;
        let round = contract
            .latestRoundData()
            .call()
            .await
            .map_err(|e| rpc_err("latestRoundData failed", e))?;
        if round.answer.is_negative() {
            return Err(AppError::ProviderUnavailable(format!(
                "price feed {feed} returned a negative answer"
            )));
        }
        Ok((round.answer.into_raw(), decimals))
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<ReceiptStatus>, AppError> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| rpc_err("receipt lookup failed", e))?;
        Ok(receipt.map(|r| ReceiptStatus {
            success: r.status(),
            // eth_getTransactionReceipt carries no revert string.
            reason: None,
        }))
    }
}
