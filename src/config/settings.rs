use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use crate::error::AppError;

/// Process configuration, read once at startup. A missing required value
/// is a fatal startup error, never a retryable condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub api: ApiSettings,
    pub blockchain: BlockchainSettings,
    pub wallet: WalletSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockchainSettings {
    pub rpc_url: String,
    pub chain_id: u64,
    pub walletconnect_project_id: String,
    /// Deployment-specific vault contract; absent disables the vault route.
    pub vault_address: Option<Address>,
    pub receipt_poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSettings {
    /// Hex-encoded signing key. Absent means a read-only, disconnected
    /// session: reads render as "not connected", writes are refused.
    pub private_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

fn required(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::ConfigError(format!("{name} must be set")))
}

fn optional_parsed<T: FromStr>(name: &str, default: T) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|e| AppError::ConfigError(format!("invalid {name}: {e}"))),
        Err(_) => Ok(default),
    }
}

impl Settings {
    pub fn new() -> Result<Self, AppError> {
        let rpc_url = required("RPC_URL")?;
        url::Url::parse(&rpc_url)
            .map_err(|e| AppError::ConfigError(format!("invalid RPC_URL: {e}")))?;

        let chain_id = required("CHAIN_ID")?
            .parse::<u64>()
            .map_err(|e| AppError::ConfigError(format!("invalid CHAIN_ID: {e}")))?;

        let vault_address = match env::var("VAULT_ADDRESS") {
            Ok(value) => Some(
                Address::from_str(value.trim())
                    .map_err(|e| AppError::ConfigError(format!("invalid VAULT_ADDRESS: {e}")))?,
            ),
            Err(_) => None,
        };

        Ok(Settings {
            api: ApiSettings {
                host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: optional_parsed("API_PORT", 8080)?,
            },
            blockchain: BlockchainSettings {
                rpc_url,
                chain_id,
                walletconnect_project_id: required("WALLETCONNECT_PROJECT_ID")?,
                vault_address,
                receipt_poll_interval_ms: optional_parsed("RECEIPT_POLL_INTERVAL_MS", 2_000)?,
            },
            wallet: WalletSettings {
                private_key: env::var("WALLET_PRIVATE_KEY").ok(),
            },
            logging: LoggingSettings {
                level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            },
        })
    }
}
