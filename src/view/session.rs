use alloy::primitives::{Address, B256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch, RwLock};
use uuid::Uuid;

use crate::amount::TokenAmount;
use crate::blockchain::ChainReader;
use crate::config::registry::{ContractAddresses, NATIVE_DECIMALS, USDC_DECIMALS};
use crate::error::AppError;
use crate::models::{Asset, PendingTransaction, TxKind, TxState, ViewState};
use crate::readers::{BalanceReader, PositionReader};
use crate::tx::{ReceiptWatcher, Route, SubmitOutcome, TransactionSubmitter};
use crate::view::assembler::{assemble, ViewInputs};
use crate::wallet::WalletTransport;

/// Named invalidation events. Reads are re-issued in response to these,
/// never as a side effect of rendering.
#[derive(Debug)]
pub enum SessionEvent {
    AccountChanged(Option<Address>),
    Refresh,
    TxSubmitted(PendingTransaction),
    TxFinalized {
        tx: PendingTransaction,
        outcome: crate::tx::WatchOutcome,
    },
}

pub struct SessionConfig {
    pub chain: Arc<dyn ChainReader>,
    pub wallet: Arc<dyn WalletTransport>,
    pub contracts: ContractAddresses,
    pub receipt_poll_interval: Duration,
}

/// An action held back behind an in-flight approval, resubmitted once the
/// approval confirms.
#[derive(Debug, Clone, Copy)]
struct QueuedAction {
    kind: TxKind,
    asset: Asset,
    amount: TokenAmount,
    route: Route,
    spender: Address,
    token: Address,
}

/// Owns the one `ViewState` of an active dashboard session.
///
/// The event loop in [`AutopilotSession::run`] is the state's only writer;
/// HTTP handlers and any other consumer read cloned snapshots. Receipt
/// watchers run as child tasks carrying a cancellation signal so that
/// nothing keeps polling after teardown or an account switch.
pub struct AutopilotSession {
    id: Uuid,
    chain: Arc<dyn ChainReader>,
    wallet: Arc<dyn WalletTransport>,
    contracts: ContractAddresses,
    submitter: TransactionSubmitter,
    balance_reader: BalanceReader,
    position_reader: PositionReader,
    receipt_poll_interval: Duration,
    view: Arc<RwLock<ViewState>>,
    events_tx: mpsc::Sender<SessionEvent>,
    latest: Mutex<ViewInputs>,
    pending: Mutex<Vec<PendingTransaction>>,
    queued: Mutex<HashMap<B256, QueuedAction>>,
    last_error: Mutex<Option<String>>,
    watch_cancel: Mutex<watch::Sender<bool>>,
}

fn ok_or_note<T>(result: Result<T, AppError>, note: &mut Option<String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, "read failed");
            if note.is_none() {
                *note = Some(e.to_string());
            }
            None
        }
    }
}

impl AutopilotSession {
    pub fn new(config: SessionConfig) -> (Arc<Self>, mpsc::Receiver<SessionEvent>) {
        let id = Uuid::new_v4();
        let (events_tx, events_rx) = mpsc::channel(64);
        let (cancel_tx, _) = watch::channel(false);
        let submitter = TransactionSubmitter::new(
            config.chain.clone(),
            config.wallet.clone(),
            config.contracts.clone(),
        );
        let session = Arc::new(Self {
            id,
            chain: config.chain.clone(),
            wallet: config.wallet,
            contracts: config.contracts.clone(),
            submitter,
            balance_reader: BalanceReader::new(config.chain.clone()),
            position_reader: PositionReader::new(config.chain, config.contracts),
            receipt_poll_interval: config.receipt_poll_interval,
            view: Arc::new(RwLock::new(ViewState::disconnected(id))),
            events_tx,
            latest: Mutex::new(ViewInputs::default()),
            pending: Mutex::new(Vec::new()),
            queued: Mutex::new(HashMap::new()),
            last_error: Mutex::new(None),
            watch_cancel: Mutex::new(cancel_tx),
        });
        (session, events_rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn events(&self) -> mpsc::Sender<SessionEvent> {
        self.events_tx.clone()
    }

    /// A point-in-time copy of the assembled view.
    pub async fn snapshot(&self) -> ViewState {
        self.view.read().await.clone()
    }

    /// Stop all receipt watchers. Called on teardown and account changes.
    pub fn shutdown(&self) {
        self.cancel_watchers();
    }

    fn asset_decimals(&self, asset: Asset) -> u8 {
        match asset {
            Asset::Native => NATIVE_DECIMALS,
            Asset::Erc20(_) => USDC_DECIMALS,
        }
    }

    /// The (spender, token) pair an approval for this action covers, when
    /// one can be required at all.
    fn approval_pair(&self, kind: TxKind, asset: Asset, route: Route) -> Option<(Address, Address)> {
        match (kind, asset) {
            (TxKind::Deposit, Asset::Erc20(token)) => {
                let spender = match route {
                    Route::Pool => self.contracts.pool,
                    Route::Vault => self.contracts.vault?,
                };
                Some((spender, token))
            }
            (TxKind::Withdraw, Asset::Native) => {
                Some((self.contracts.weth_gateway, self.contracts.a_weth))
            }
            _ => None,
        }
    }

    pub async fn deposit(
        &self,
        asset: Asset,
        amount: &str,
        route: Route,
    ) -> Result<PendingTransaction, AppError> {
        let amount = TokenAmount::parse(amount, self.asset_decimals(asset))?;
        let outcome = self.submitter.submit_deposit(asset, amount, route).await?;
        self.accept(TxKind::Deposit, asset, amount, route, outcome).await
    }

    pub async fn withdraw(
        &self,
        asset: Asset,
        amount: &str,
        route: Route,
    ) -> Result<PendingTransaction, AppError> {
        let amount = TokenAmount::parse(amount, self.asset_decimals(asset))?;
        let outcome = self.submitter.submit_withdraw(asset, amount, route).await?;
        self.accept(TxKind::Withdraw, asset, amount, route, outcome).await
    }

    async fn accept(
        &self,
        kind: TxKind,
        asset: Asset,
        amount: TokenAmount,
        route: Route,
        outcome: SubmitOutcome,
    ) -> Result<PendingTransaction, AppError> {
        let tx = match outcome {
            SubmitOutcome::Submitted(tx) => tx,
            SubmitOutcome::ApprovalRequired(tx) => {
                if let Some((spender, token)) = self.approval_pair(kind, asset, route) {
                    self.queued.lock().unwrap().insert(
                        tx.hash,
                        QueuedAction {
                            kind,
                            asset,
                            amount,
                            route,
                            spender,
                            token,
                        },
                    );
                }
                tx
            }
        };
        let _ = self
            .events_tx
            .send(SessionEvent::TxSubmitted(tx.clone()))
            .await;
        Ok(tx)
    }

    /// The session event loop: sole writer of the view state.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<SessionEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::AccountChanged(account) => {
                    tracing::info!(session = %self.id, ?account, "account changed");
                    self.cancel_watchers();
                    self.pending.lock().unwrap().clear();
                    self.queued.lock().unwrap().clear();
                    *self.last_error.lock().unwrap() = None;
                    // Nothing captured under the previous account may
                    // survive until the fresh reads land.
                    *self.latest.lock().unwrap() = ViewInputs::default();
                    *self.view.write().await = ViewState::disconnected(self.id);
                    self.refresh().await;
                }
                SessionEvent::Refresh => self.refresh().await,
                SessionEvent::TxSubmitted(tx) => {
                    tracing::info!(session = %self.id, hash = %tx.hash, kind = ?tx.kind, "tracking transaction");
                    self.pending.lock().unwrap().push(tx.clone());
                    self.rebuild_view().await;
                    self.spawn_watcher(tx);
                }
                SessionEvent::TxFinalized { tx, outcome } => {
                    self.on_tx_finalized(tx, outcome).await;
                }
            }
        }
        tracing::debug!(session = %self.id, "event loop stopped");
    }

    fn spawn_watcher(self: &Arc<Self>, tx: PendingTransaction) {
        let session = Arc::clone(self);
        let cancel = self.watch_cancel.lock().unwrap().subscribe();
        tokio::spawn(async move {
            let watcher =
                ReceiptWatcher::new(session.chain.clone(), session.receipt_poll_interval);
            let outcome = watcher.watch(tx.hash, cancel).await;
            let _ = session
                .events_tx
                .send(SessionEvent::TxFinalized { tx, outcome })
                .await;
        });
    }

    async fn on_tx_finalized(&self, tx: PendingTransaction, outcome: crate::tx::WatchOutcome) {
        let queued = self.queued.lock().unwrap().remove(&tx.hash);
        if let Some(action) = &queued {
            self.submitter.release_approval(action.spender, action.token);
        }

        match outcome {
            crate::tx::WatchOutcome::Confirmed => {
                tracing::info!(session = %self.id, hash = %tx.hash, "transaction confirmed");
                // Confirmation observed: the entry is done once the
                // dependent reads have refreshed.
                self.remove_pending(tx.hash);
                self.refresh().await;
                if let Some(action) = queued {
                    self.resume(action).await;
                }
            }
            crate::tx::WatchOutcome::Failed(reason) => {
                tracing::warn!(session = %self.id, hash = %tx.hash, %reason, "transaction failed");
                self.mark_failed(tx.hash, &reason);
                *self.last_error.lock().unwrap() = Some(reason);
                // A failed write does not invalidate reads.
                self.rebuild_view().await;
            }
            crate::tx::WatchOutcome::Cancelled => {
                self.remove_pending(tx.hash);
                self.rebuild_view().await;
            }
        }
    }

    /// Resubmit an action whose approval just confirmed.
    async fn resume(&self, action: QueuedAction) {
        let result = match action.kind {
            TxKind::Deposit => {
                self.submitter
                    .submit_deposit(action.asset, action.amount, action.route)
                    .await
            }
            TxKind::Withdraw => {
                self.submitter
                    .submit_withdraw(action.asset, action.amount, action.route)
                    .await
            }
            TxKind::Approve => return,
        };
        match result {
            Ok(outcome) => {
                if let Err(e) = self
                    .accept(action.kind, action.asset, action.amount, action.route, outcome)
                    .await
                {
                    *self.last_error.lock().unwrap() = Some(e.to_string());
                    self.rebuild_view().await;
                }
            }
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "queued action failed after approval");
                *self.last_error.lock().unwrap() = Some(e.to_string());
                self.rebuild_view().await;
            }
        }
    }

    fn remove_pending(&self, hash: B256) {
        self.pending.lock().unwrap().retain(|p| p.hash != hash);
    }

    fn mark_failed(&self, hash: B256, reason: &str) {
        let mut pending = self.pending.lock().unwrap();
        if let Some(entry) = pending.iter_mut().find(|p| p.hash == hash) {
            entry.state = TxState::Failed {
                reason: reason.to_string(),
            };
        }
    }

    fn cancel_watchers(&self) {
        let mut guard = self.watch_cancel.lock().unwrap();
        let _ = guard.send(true);
        // Fresh channel for watchers spawned after this point.
        let (cancel_tx, _) = watch::channel(false);
        *guard = cancel_tx;
    }

    /// Re-read everything for the active account, concurrently, then
    /// reassemble the view.
    async fn refresh(&self) {
        let account = self.wallet.active_account();
        let mut inputs = ViewInputs {
            account,
            ..ViewInputs::default()
        };

        if account.is_some() {
            let mut read_error = None;

            let balance_reads = futures::future::join_all(vec![
                self.balance_reader
                    .read(account, Asset::Native, NATIVE_DECIMALS),
                self.balance_reader
                    .read(account, Asset::Erc20(self.contracts.usdc), USDC_DECIMALS),
                self.balance_reader
                    .read(account, Asset::Erc20(self.contracts.a_usdc), USDC_DECIMALS),
            ]);

            let (balances, snapshot, vault, rates, eth_usd) = tokio::join!(
                balance_reads,
                self.position_reader.account_data(account),
                self.position_reader.vault_holdings(account),
                self.position_reader.reserve_rates(),
                self.position_reader.eth_usd_price(),
            );

            let mut balances = balances.into_iter();
            inputs.eth_balance = balances
                .next()
                .and_then(|r| ok_or_note(r, &mut read_error));
            inputs.usdc_balance = balances
                .next()
                .and_then(|r| ok_or_note(r, &mut read_error));
            inputs.a_usdc_balance = balances
                .next()
                .and_then(|r| ok_or_note(r, &mut read_error));
            inputs.snapshot = ok_or_note(snapshot, &mut read_error);
            inputs.vault = ok_or_note(vault, &mut read_error).flatten();
            inputs.rates = ok_or_note(rates, &mut read_error);
            inputs.eth_usd = ok_or_note(eth_usd, &mut read_error);
            inputs.last_error = read_error;
        }

        *self.latest.lock().unwrap() = inputs;
        self.rebuild_view().await;
    }

    /// Reassemble from the latest reads without re-reading.
    async fn rebuild_view(&self) {
        let mut inputs = self.latest.lock().unwrap().clone();
        inputs.pending = self.pending.lock().unwrap().clone();
        if inputs.last_error.is_none() {
            inputs.last_error = self.last_error.lock().unwrap().clone();
        }
        let view = assemble(self.id, inputs);
        *self.view.write().await = view;
    }
}
