use alloy::primitives::Address;
use serde::Serialize;
use std::str::FromStr;

use crate::error::AppError;

/// The native asset has 18 decimals on every supported network.
pub const NATIVE_DECIMALS: u8 = 18;
/// USDC uses 6 decimals on both deployments we know about.
pub const USDC_DECIMALS: u8 = 6;

/// Static per-network contract registry.
///
/// The vault is a deployment-specific contract and is supplied through
/// configuration rather than baked in here; `None` disables the vault
/// deposit/withdraw route.
#[derive(Debug, Clone, Serialize)]
pub struct ContractAddresses {
    pub pool: Address,
    pub data_provider: Address,
    pub usdc: Address,
    pub a_usdc: Address,
    pub a_weth: Address,
    pub weth_gateway: Address,
    pub eth_usd_feed: Address,
    pub vault: Option<Address>,
}

fn addr(input: &str) -> Result<Address, AppError> {
    Address::from_str(input)
        .map_err(|e| AppError::ConfigError(format!("invalid registry address {input}: {e}")))
}

impl ContractAddresses {
    /// Look up the protocol addresses for a chain id. Unknown chains are a
    /// fatal configuration error at startup.
    pub fn for_chain(chain_id: u64) -> Result<Self, AppError> {
        match chain_id {
            // Ethereum mainnet
            1 => Ok(Self {
                pool: addr("0x87870Bce3F2c42a6C99f1b5b3c37eed3ECF86D0a")?,
                data_provider: addr("0x7B4EB56E7CD4b454BA8ff71E4518426369a138a3")?,
                usdc: addr("0xA0b86991c6218b36c1d19d4a2e9eb0ce3606eb48")?,
                a_usdc: addr("0x98C23E9d8f34FEFb1B7BD6a91B7FF122F4e16F5c")?,
                a_weth: addr("0x4d5F47FA6A74757f35C14fD3a6Ef8E3C9BC514E8")?,
                weth_gateway: addr("0xD322A49006FC828F9B5B37Ab215F99B4E5caB19C")?,
                eth_usd_feed: addr("0x5f4eC3Df9cbd43714FE2740f5E3616155c5b8419")?,
                vault: None,
            }),
            // Sepolia testnet
            11155111 => Ok(Self {
                pool: addr("0x6Ae43d3271ff6888e7Fc43Fd7321a503ff738951")?,
                data_provider: addr("0x3e9708d80f7B3e431180130bF846E7cC0aBcC163")?,
                usdc: addr("0x94a9D9AC8a22534E3FaCa9F4e7F2E2cf85d5E4C8")?,
                a_usdc: addr("0x16dA4541aD1807f4443d92D26044C1147406EB10")?,
                a_weth: addr("0x5b071b590a59395fE4025A0Ccc1FcC931AAc1830")?,
                weth_gateway: addr("0x387d311e47e80b498169e6fb51d3193167d89F7D")?,
                eth_usd_feed: addr("0x694AA1769357215DE4FAC081bf1f309aDC325306")?,
                vault: None,
            }),
            other => Err(AppError::ConfigError(format!(
                "no contract registry for chain {other}"
            ))),
        }
    }

    pub fn with_vault(mut self, vault: Option<Address>) -> Self {
        self.vault = vault;
        self
    }
}
