//! In-memory chain and wallet fakes shared by the integration suites.
#![allow(dead_code)]

use aave_autopilot::blockchain::traits::{
    ChainReader, RawAccountData, RawReserveRates, ReceiptStatus,
};
use aave_autopilot::error::AppError;
use aave_autopilot::wallet::WalletTransport;
use alloy::primitives::{Address, TxKind, B256, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub fn user() -> Address {
    Address::repeat_byte(0xAA)
}

fn zero_account_data() -> RawAccountData {
    RawAccountData {
        total_collateral_base: U256::ZERO,
        total_debt_base: U256::ZERO,
        available_borrows_base: U256::ZERO,
        current_liquidation_threshold: U256::ZERO,
        ltv: U256::ZERO,
        health_factor: U256::ZERO,
    }
}

/// Scriptable chain state. Receipts absent from the map read as "not
/// mined yet".
#[derive(Default)]
pub struct MockChain {
    pub native_balances: Mutex<HashMap<Address, U256>>,
    pub erc20_balances: Mutex<HashMap<(Address, Address), U256>>,
    pub allowances: Mutex<HashMap<(Address, Address, Address), U256>>,
    pub account_data: Mutex<HashMap<Address, RawAccountData>>,
    pub vault_share_balances: Mutex<HashMap<(Address, Address), U256>>,
    pub max_withdrawals: Mutex<HashMap<(Address, Address), U256>>,
    pub receipts: Mutex<HashMap<B256, ReceiptStatus>>,
    pub account_data_calls: AtomicUsize,
    pub receipt_lookups: AtomicUsize,
}

impl MockChain {
    pub fn set_native_balance(&self, owner: Address, amount: U256) {
        self.native_balances.lock().unwrap().insert(owner, amount);
    }

    pub fn set_erc20_balance(&self, token: Address, owner: Address, amount: U256) {
        self.erc20_balances
            .lock()
            .unwrap()
            .insert((token, owner), amount);
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.allowances
            .lock()
            .unwrap()
            .insert((token, owner, spender), amount);
    }

    pub fn set_max_withdraw(&self, vault: Address, owner: Address, amount: U256) {
        self.max_withdrawals
            .lock()
            .unwrap()
            .insert((vault, owner), amount);
    }

    pub fn set_receipt(&self, hash: B256, success: bool) {
        self.receipts.lock().unwrap().insert(
            hash,
            ReceiptStatus {
                success,
                reason: None,
            },
        );
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn native_balance(&self, owner: Address) -> Result<U256, AppError> {
        Ok(*self
            .native_balances
            .lock()
            .unwrap()
            .get(&owner)
            .unwrap_or(&U256::ZERO))
    }

    async fn erc20_balance(&self, token: Address, owner: Address) -> Result<U256, AppError> {
        Ok(*self
            .erc20_balances
            .lock()
            .unwrap()
            .get(&(token, owner))
            .unwrap_or(&U256::ZERO))
    }

    async fn erc20_allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, AppError> {
        Ok(*self
            .allowances
            .lock()
            .unwrap()
            .get(&(token, owner, spender))
            .unwrap_or(&U256::ZERO))
    }

    async fn account_data(&self, _pool: Address, user: Address) -> Result<RawAccountData, AppError> {
        self.account_data_calls.fetch_add(1, Ordering::SeqCst);
        Ok(*self
            .account_data
            .lock()
            .unwrap()
            .get(&user)
            .unwrap_or(&zero_account_data()))
    }

    async fn reserve_rates(
        &self,
        _data_provider: Address,
        _asset: Address,
    ) -> Result<RawReserveRates, AppError> {
        Ok(RawReserveRates {
            liquidity_rate: U256::ZERO,
            variable_borrow_rate: U256::ZERO,
        })
    }

    async fn vault_shares(&self, vault: Address, owner: Address) -> Result<U256, AppError> {
        Ok(*self
            .vault_share_balances
            .lock()
            .unwrap()
            .get(&(vault, owner))
            .unwrap_or(&U256::ZERO))
    }

    async fn vault_assets_for_shares(
        &self,
        _vault: Address,
        shares: U256,
    ) -> Result<U256, AppError> {
        // 1:1 share price keeps fixtures easy to reason about.
        Ok(shares)
    }

    async fn vault_max_withdraw(&self, vault: Address, owner: Address) -> Result<U256, AppError> {
        Ok(*self
            .max_withdrawals
            .lock()
            .unwrap()
            .get(&(vault, owner))
            .unwrap_or(&U256::ZERO))
    }

    async fn oracle_price(&self, _feed: Address) -> Result<(U256, u8), AppError> {
        // $2000.00000000 at 8 decimals.
        Ok((U256::from(200_000_000_000u64), 8))
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<ReceiptStatus>, AppError> {
        self.receipt_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.receipts.lock().unwrap().get(&hash).cloned())
    }
}

/// Wallet fake: records every submitted request and hands out sequential
/// hashes. Flip `reject` to simulate a signer that declines.
pub struct MockWallet {
    pub account: Mutex<Option<Address>>,
    pub submitted: Mutex<Vec<TransactionRequest>>,
    pub reject: AtomicBool,
    next_hash: AtomicUsize,
}

impl MockWallet {
    pub fn connected(account: Address) -> Self {
        Self {
            account: Mutex::new(Some(account)),
            submitted: Mutex::new(Vec::new()),
            reject: AtomicBool::new(false),
            next_hash: AtomicUsize::new(1),
        }
    }

    pub fn submitted_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    pub fn submitted_at(&self, index: usize) -> TransactionRequest {
        self.submitted.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl WalletTransport for MockWallet {
    fn active_account(&self) -> Option<Address> {
        *self.account.lock().unwrap()
    }

    async fn sign_and_submit(&self, tx: TransactionRequest) -> Result<B256, AppError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(AppError::UserRejected("user declined in wallet".into()));
        }
        let n = self.next_hash.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(tx);
        Ok(B256::from(U256::from(n)))
    }
}

/// Destination address of a recorded transaction request.
pub fn tx_to(tx: &TransactionRequest) -> Address {
    match tx.to {
        Some(TxKind::Call(address)) => address,
        _ => panic!("transaction request has no call target"),
    }
}

/// Leading four bytes of the recorded calldata.
pub fn tx_selector(tx: &TransactionRequest) -> [u8; 4] {
    let input = tx
        .input
        .clone()
        .into_input()
        .expect("transaction request has no calldata");
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&input[..4]);
    selector
}

/// Poll `condition` until it holds or the timeout elapses.
pub async fn wait_for<F>(condition: F, timeout_ms: u64, label: &str)
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {label}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
