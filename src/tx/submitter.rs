use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::amount::TokenAmount;
use crate::blockchain::contracts::{IAavePoolV3, IAutopilotVault, IWrappedTokenGatewayV3, IERC20};
use crate::blockchain::ChainReader;
use crate::config::registry::ContractAddresses;
use crate::error::AppError;
use crate::models::{Asset, PendingTransaction, TxKind};
use crate::wallet::WalletTransport;

/// Whether a deposit/withdraw goes straight to the lending pool or through
/// the intermediary vault.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    #[default]
    Pool,
    Vault,
}

/// Result of a submit call. `ApprovalRequired` means a spending approval
/// was broadcast instead of the requested action; the caller must wait for
/// its confirmation before resubmitting the action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    ApprovalRequired(PendingTransaction),
    Submitted(PendingTransaction),
}

/// Builds and submits writes through the wallet transport.
///
/// Holds the in-flight approval guard: at most one approval per
/// (spender, token) pair may be outstanding, because a second approval
/// racing the first can silently overwrite the in-flight allowance.
pub struct TransactionSubmitter {
    chain: Arc<dyn ChainReader>,
    wallet: Arc<dyn WalletTransport>,
    contracts: ContractAddresses,
    approvals_in_flight: Mutex<HashSet<(Address, Address)>>,
}

impl TransactionSubmitter {
    pub fn new(
        chain: Arc<dyn ChainReader>,
        wallet: Arc<dyn WalletTransport>,
        contracts: ContractAddresses,
    ) -> Self {
        Self {
            chain,
            wallet,
            contracts,
            approvals_in_flight: Mutex::new(HashSet::new()),
        }
    }

    fn vault(&self) -> Result<Address, AppError> {
        self.contracts
            .vault
            .ok_or_else(|| AppError::InvalidInput("no vault configured for this deployment".into()))
    }

    fn a_token_for(&self, token: Address) -> Result<Address, AppError> {
        if token == self.contracts.usdc {
            Ok(self.contracts.a_usdc)
        } else {
            Err(AppError::InvalidInput(format!("unsupported asset {token}")))
        }
    }

    fn require_funds(
        &self,
        requested: TokenAmount,
        available_raw: alloy::primitives::U256,
    ) -> Result<(), AppError> {
        if requested.raw > available_raw {
            let available = TokenAmount::new(available_raw, requested.decimals);
            return Err(AppError::InsufficientFunds(format!(
                "requested {}, available {}",
                requested.format(),
                available.format()
            )));
        }
        Ok(())
    }

    fn begin_approval(&self, spender: Address, token: Address) -> Result<(), AppError> {
        let mut in_flight = self.approvals_in_flight.lock().unwrap();
        if !in_flight.insert((spender, token)) {
            return Err(AppError::InvalidInput(format!(
                "an approval for spender {spender} on token {token} is already pending"
            )));
        }
        Ok(())
    }

    /// Clears the approval guard for a pair. The session calls this when
    /// the approval's receipt reaches a terminal state.
    pub fn release_approval(&self, spender: Address, token: Address) {
        self.approvals_in_flight
            .lock()
            .unwrap()
            .remove(&(spender, token));
    }

    /// If the current allowance covers `amount`, returns `Ok(None)`.
    /// Otherwise broadcasts an approval and returns it; the caller must
    /// not submit the dependent write until the approval confirms.
    async fn ensure_allowance(
        &self,
        owner: Address,
        token: Address,
        spender: Address,
        amount: TokenAmount,
    ) -> Result<Option<PendingTransaction>, AppError> {
        let allowance = self.chain.erc20_allowance(token, owner, spender).await?;
        if allowance >= amount.raw {
            return Ok(None);
        }

        self.begin_approval(spender, token)?;
        let calldata = IERC20::approveCall {
            spender,
            value: amount.raw,
        }
        .abi_encode();
        let tx = TransactionRequest::default()
            .with_from(owner)
            .with_to(token)
            .with_input(Bytes::from(calldata));

        match self.wallet.sign_and_submit(tx).await {
            Ok(hash) => {
                tracing::info!(
                    owner = %owner,
                    token = %token,
                    spender = %spender,
                    hash = %hash,
                    "approval submitted"
                );
                Ok(Some(PendingTransaction::submitted(hash, TxKind::Approve)))
            }
            Err(e) => {
                self.release_approval(spender, token);
                Err(e)
            }
        }
    }

    pub async fn submit_deposit(
        &self,
        asset: Asset,
        amount: TokenAmount,
        route: Route,
    ) -> Result<SubmitOutcome, AppError> {
        let account = self.wallet.active_account().ok_or(AppError::NotConnected)?;
        if amount.is_zero() {
            return Err(AppError::InvalidInput("deposit amount must be positive".into()));
        }

        match asset {
            Asset::Native => {
                if route == Route::Vault {
                    return Err(AppError::InvalidInput(
                        "native deposits go through the gateway, not the vault".into(),
                    ));
                }
                let balance = self.chain.native_balance(account).await?;
                self.require_funds(amount, balance)?;

                let calldata = IWrappedTokenGatewayV3::depositETHCall {
                    pool: self.contracts.pool,
                    onBehalfOf: account,
                    referralCode: 0,
                }
                .abi_encode();
                let tx = TransactionRequest::default()
                    .with_from(account)
                    .with_to(self.contracts.weth_gateway)
                    .with_value(amount.raw)
                    .with_input(Bytes::from(calldata));
                let hash = self.wallet.sign_and_submit(tx).await?;
                tracing::info!(account = %account, hash = %hash, "native deposit submitted");
                Ok(SubmitOutcome::Submitted(PendingTransaction::submitted(
                    hash,
                    TxKind::Deposit,
                )))
            }
            Asset::Erc20(token) => {
                let balance = self.chain.erc20_balance(token, account).await?;
                self.require_funds(amount, balance)?;

                let spender = match route {
                    Route::Pool => self.contracts.pool,
                    Route::Vault => self.vault()?,
                };
                if let Some(approval) = self
                    .ensure_allowance(account, token, spender, amount)
                    .await?
                {
                    return Ok(SubmitOutcome::ApprovalRequired(approval));
                }

                let (to, calldata) = match route {
                    Route::Pool => (
                        self.contracts.pool,
                        IAavePoolV3::supplyCall {
                            asset: token,
                            amount: amount.raw,
                            onBehalfOf: account,
                            referralCode: 0,
                        }
                        .abi_encode(),
                    ),
                    Route::Vault => (
                        self.vault()?,
                        IAutopilotVault::depositCall {
                            assets: amount.raw,
                            receiver: account,
                        }
                        .abi_encode(),
                    ),
                };
                let tx = TransactionRequest::default()
                    .with_from(account)
                    .with_to(to)
                    .with_input(Bytes::from(calldata));
                let hash = self.wallet.sign_and_submit(tx).await?;
                tracing::info!(account = %account, hash = %hash, ?route, "deposit submitted");
                Ok(SubmitOutcome::Submitted(PendingTransaction::submitted(
                    hash,
                    TxKind::Deposit,
                )))
            }
        }
    }

    pub async fn submit_withdraw(
        &self,
        asset: Asset,
        amount: TokenAmount,
        route: Route,
    ) -> Result<SubmitOutcome, AppError> {
        let account = self.wallet.active_account().ok_or(AppError::NotConnected)?;
        if amount.is_zero() {
            return Err(AppError::InvalidInput("withdraw amount must be positive".into()));
        }

        let (to, calldata) = match asset {
            Asset::Native => {
                if route == Route::Vault {
                    return Err(AppError::InvalidInput(
                        "native withdrawals go through the gateway, not the vault".into(),
                    ));
                }
                let withdrawable = self
                    .chain
                    .erc20_balance(self.contracts.a_weth, account)
                    .await?;
                self.require_funds(amount, withdrawable)?;

                // The gateway burns the caller's aWETH, so it needs a
                // spending allowance just like an ERC-20 supply does.
                if let Some(approval) = self
                    .ensure_allowance(
                        account,
                        self.contracts.a_weth,
                        self.contracts.weth_gateway,
                        amount,
                    )
                    .await?
                {
                    return Ok(SubmitOutcome::ApprovalRequired(approval));
                }

                (
                    self.contracts.weth_gateway,
                    IWrappedTokenGatewayV3::withdrawETHCall {
                        pool: self.contracts.pool,
                        amount: amount.raw,
                        to: account,
                    }
                    .abi_encode(),
                )
            }
            Asset::Erc20(token) => match route {
                Route::Pool => {
                    let a_token = self.a_token_for(token)?;
                    let withdrawable = self.chain.erc20_balance(a_token, account).await?;
                    self.require_funds(amount, withdrawable)?;
                    (
                        self.contracts.pool,
                        IAavePoolV3::withdrawCall {
                            asset: token,
                            amount: amount.raw,
                            to: account,
                        }
                        .abi_encode(),
                    )
                }
                Route::Vault => {
                    let vault = self.vault()?;
                    let withdrawable = self.chain.vault_max_withdraw(vault, account).await?;
                    self.require_funds(amount, withdrawable)?;
                    (
                        vault,
                        IAutopilotVault::withdrawCall {
                            assets: amount.raw,
                            receiver: account,
                            owner: account,
                        }
                        .abi_encode(),
                    )
                }
            },
        };

        let tx = TransactionRequest::default()
            .with_from(account)
            .with_to(to)
            .with_input(Bytes::from(calldata));
        let hash = self.wallet.sign_and_submit(tx).await?;
        tracing::info!(account = %account, hash = %hash, ?route, "withdraw submitted");
        Ok(SubmitOutcome::Submitted(PendingTransaction::submitted(
            hash,
            TxKind::Withdraw,
        )))
    }
}
