use alloy::{
    consensus::{SignableTransaction, TxEip1559, TxEnvelope, TxLegacy},
    primitives::{Address, TxKind, B256, U256},
    providers::{Provider, RootProvider},
    rpc::types::{BlockNumberOrTag, TransactionRequest},
    signers::{local::PrivateKeySigner, SignerSync},
};
use async_trait::async_trait;
use std::str::FromStr;

use crate::error::AppError;
use crate::wallet::WalletTransport;

/// In-process signing wallet: derives the account from a private key,
/// fills fees/nonce/gas, signs and broadcasts the raw transaction.
pub struct LocalWallet {
    signer: PrivateKeySigner,
    provider: RootProvider,
    chain_id: u64,
}

/// Fee policy when the chain supports EIP-1559:
/// priority = max(1.5 gwei, gas_price / 10), max = base_fee * 2 + priority.
pub fn compute_eip1559_fees(base_fee: u128, gas_price: u128) -> (u128, u128) {
    let min_priority: u128 = 1_500_000_000;
    let priority = std::cmp::max(min_priority, gas_price / 10);

    let mut max_fee = base_fee.saturating_mul(2).saturating_add(priority);
    let min_fee = base_fee.saturating_add(priority);
    if max_fee < min_fee {
        max_fee = min_fee;
    }
    (max_fee, priority)
}

fn classify_preflight_error(err: impl std::fmt::Display) -> AppError {
    let message = err.to_string();
    let lowered = message.to_lowercase();
    if lowered.contains("insufficient funds") {
        AppError::InsufficientFunds(message)
    } else if lowered.contains("revert") {
        AppError::TransactionReverted { reason: message }
    } else {
        AppError::ProviderUnavailable(message)
    }
}

fn broadcast_err_is_ok(message: &str) -> bool {
    let lowered = message.to_lowercase();
    lowered.contains("already known")
        || lowered.contains("known transaction")
        || lowered.contains("already in mempool")
}

impl LocalWallet {
    pub fn new(private_key: &str, provider: RootProvider, chain_id: u64) -> Result<Self, AppError> {
        let signer = PrivateKeySigner::from_str(private_key.trim())
            .map_err(|e| AppError::ConfigError(format!("invalid wallet private key: {e}")))?;
        tracing::info!(account = %signer.address(), chain_id, "local wallet ready");
        Ok(Self {
            signer,
            provider,
            chain_id,
        })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    fn build_and_sign(&self, tx: &TransactionRequest) -> Result<(TxEnvelope, B256), AppError> {
        let to = tx.to.unwrap_or(TxKind::Create);
        let value = tx.value.unwrap_or(U256::ZERO);
        let input = tx.input.clone().into_input().unwrap_or_default();
        let nonce = tx.nonce.unwrap_or(0);
        let gas_limit = tx.gas.unwrap_or(21_000);

        if tx.max_fee_per_gas.is_some() {
            let consensus_tx = TxEip1559 {
                chain_id: tx.chain_id.unwrap_or(self.chain_id),
                nonce,
                gas_limit,
                max_fee_per_gas: tx.max_fee_per_gas.unwrap_or(0),
                max_priority_fee_per_gas: tx.max_priority_fee_per_gas.unwrap_or(0),
                to,
                value,
                input,
                access_list: tx.access_list.clone().unwrap_or_default(),
            };
            let hash = consensus_tx.signature_hash();
            let signature = self
                .signer
                .sign_hash_sync(&hash)
                .map_err(|e| AppError::UserRejected(format!("signing failed: {e}")))?;
            let signed = consensus_tx.into_signed(signature);
            let tx_hash = *signed.hash();
            Ok((TxEnvelope::Eip1559(signed), tx_hash))
        } else {
            let consensus_tx = TxLegacy {
                chain_id: tx.chain_id,
                nonce,
                gas_price: tx.gas_price.unwrap_or(0),
                gas_limit,
                to,
                value,
                input,
            };
            let hash = consensus_tx.signature_hash();
            let signature = self
                .signer
                .sign_hash_sync(&hash)
                .map_err(|e| AppError::UserRejected(format!("signing failed: {e}")))?;
            let signed = consensus_tx.into_signed(signature);
            let tx_hash = *signed.hash();
            Ok((TxEnvelope::Legacy(signed), tx_hash))
        }
    }
}

#[async_trait]
impl WalletTransport for LocalWallet {
    fn active_account(&self) -> Option<Address> {
        Some(self.signer.address())
    }

    async fn sign_and_submit(&self, mut tx: TransactionRequest) -> Result<B256, AppError> {
        let from = self.signer.address();
        tx.chain_id = Some(self.chain_id);
        if tx.from.is_none() {
            tx.from = Some(from);
        }

        // Prefer EIP-1559 when the chain advertises a base fee.
        if tx.gas_price.is_none() && tx.max_fee_per_gas.is_none() {
            let base_fee = self
                .provider
                .get_block_by_number(BlockNumberOrTag::Pending)
                .await
                .ok()
                .flatten()
                .and_then(|block| block.header.base_fee_per_gas.map(u128::from));
            let gas_price = self
                .provider
                .get_gas_price()
                .await
                .map_err(|e| AppError::ProviderUnavailable(format!("gas price query: {e}")))?;
            if let Some(base_fee) = base_fee {
                let (max_fee, priority) = compute_eip1559_fees(base_fee, gas_price);
                tx.max_fee_per_gas = Some(max_fee);
                tx.max_priority_fee_per_gas = Some(priority);
            } else {
                tx.gas_price = Some(gas_price);
            }
        }

        if tx.nonce.is_none() {
            let nonce = self
                .provider
                .get_transaction_count(from)
                .pending()
                .await
                .map_err(|e| AppError::ProviderUnavailable(format!("nonce query: {e}")))?;
            tx.nonce = Some(nonce);
        }

        if tx.gas.is_none() {
            // Estimation doubles as a pre-flight simulation: a revert or an
            // unfundable transaction surfaces here, before anything is
            // signed or broadcast.
            let gas = self
                .provider
                .estimate_gas(tx.clone())
                .await
                .map_err(classify_preflight_error)?;
            tx.gas = Some(gas.saturating_mul(120) / 100);
        }

        let (envelope, tx_hash) = self.build_and_sign(&tx)?;
        let raw = alloy::eips::eip2718::Encodable2718::encoded_2718(&envelope);

        match self.provider.send_raw_transaction(&raw).await {
            Ok(_) => {}
            Err(e) => {
                let message = e.to_string();
                if !broadcast_err_is_ok(&message) {
                    return Err(AppError::ProviderUnavailable(format!(
                        "broadcast failed: {message}"
                    )));
                }
            }
        }

        tracing::info!(hash = %tx_hash, from = %from, "transaction broadcast");
        Ok(tx_hash)
    }
}
