pub mod local;

use alloy::primitives::{Address, B256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

use crate::error::AppError;

pub use local::LocalWallet;

/// The wallet boundary: account discovery plus sign-and-submit.
///
/// Connection and key custody are outside this crate's responsibility; a
/// browser deployment pairs this with a WalletConnect-backed transport,
/// the bundled [`LocalWallet`] signs with an in-process key.
#[async_trait]
pub trait WalletTransport: Send + Sync {
    fn active_account(&self) -> Option<Address>;

    /// Sign the request and broadcast it, returning the transaction hash.
    /// Fails with `UserRejected` when the signer declines,
    /// `InsufficientFunds`/`TransactionReverted` when pre-flight checks do,
    /// `ProviderUnavailable` on transport failure. Never retries.
    async fn sign_and_submit(&self, tx: TransactionRequest) -> Result<B256, AppError>;
}

/// Wallet stand-in for a session with no signer configured. All reads
/// render as disconnected; every write is refused.
pub struct Disconnected;

#[async_trait]
impl WalletTransport for Disconnected {
    fn active_account(&self) -> Option<Address> {
        None
    }

    async fn sign_and_submit(&self, _tx: TransactionRequest) -> Result<B256, AppError> {
        Err(AppError::NotConnected)
    }
}
