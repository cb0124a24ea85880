use alloy::primitives::B256;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::blockchain::ChainReader;

/// Terminal result of watching one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    Confirmed,
    Failed(String),
    Cancelled,
}

/// Polls for a transaction receipt at a fixed interval until the
/// transaction reaches a terminal state or the caller cancels.
///
/// "Not mined yet" is retried silently; a revert or any other read error
/// terminates as `Failed`. No backoff and no jitter: this is UI-facing
/// status tracking, not a system under load.
pub struct ReceiptWatcher {
    chain: Arc<dyn ChainReader>,
    poll_interval: Duration,
}

impl ReceiptWatcher {
    pub fn new(chain: Arc<dyn ChainReader>, poll_interval: Duration) -> Self {
        Self {
            chain,
            poll_interval,
        }
    }

    pub async fn watch(&self, hash: B256, mut cancel: watch::Receiver<bool>) -> WatchOutcome {
        loop {
            if *cancel.borrow() {
                tracing::debug!(hash = %hash, "receipt watch cancelled");
                return WatchOutcome::Cancelled;
            }

            match self.chain.transaction_receipt(hash).await {
                Ok(Some(receipt)) if receipt.success => {
                    tracing::info!(hash = %hash, "transaction confirmed");
                    return WatchOutcome::Confirmed;
                }
                Ok(Some(receipt)) => {
                    let reason = receipt
                        .reason
                        .unwrap_or_else(|| "transaction reverted".to_string());
                    tracing::warn!(hash = %hash, %reason, "transaction failed");
                    return WatchOutcome::Failed(reason);
                }
                Ok(None) => {
                    // Not mined yet; keep polling.
                }
                Err(e) => {
                    tracing::warn!(hash = %hash, error = %e, "receipt lookup failed");
                    return WatchOutcome::Failed(e.to_string());
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        tracing::debug!(hash = %hash, "receipt watch cancelled");
                        return WatchOutcome::Cancelled;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::traits::{ChainReader, RawAccountData, RawReserveRates, ReceiptStatus};
    use crate::error::AppError;
    use alloy::primitives::{Address, U256};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Receipt source that stays pending for `pending_polls` lookups, then
    /// reports the scripted terminal status.
    struct ScriptedReceipts {
        pending_polls: usize,
        terminal: Result<ReceiptStatus, AppError>,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl ChainReader for ScriptedReceipts {
        async fn native_balance(&self, _: Address) -> Result<U256, AppError> {
            unimplemented!("not exercised")
        }
        async fn erc20_balance(&self, _: Address, _: Address) -> Result<U256, AppError> {
            unimplemented!("not exercised")
        }
        async fn erc20_allowance(
            &self,
            _: Address,
            _: Address,
            _: Address,
        ) -> Result<U256, AppError> {
            unimplemented!("not exercised")
        }
        async fn account_data(&self, _: Address, _: Address) -> Result<RawAccountData, AppError> {
            unimplemented!("not exercised")
        }
        async fn reserve_rates(
            &self,
            _: Address,
            _: Address,
        ) -> Result<RawReserveRates, AppError> {
            unimplemented!("not exercised")
        }
        async fn vault_shares(&self, _: Address, _: Address) -> Result<U256, AppError> {
            unimplemented!("not exercised")
        }
        async fn vault_assets_for_shares(&self, _: Address, _: U256) -> Result<U256, AppError> {
            unimplemented!("not exercised")
        }
        async fn vault_max_withdraw(&self, _: Address, _: Address) -> Result<U256, AppError> {
            unimplemented!("not exercised")
        }
        async fn oracle_price(&self, _: Address) -> Result<(U256, u8), AppError> {
            unimplemented!("not exercised")
        }
        async fn transaction_receipt(
            &self,
            _: B256,
        ) -> Result<Option<ReceiptStatus>, AppError> {
            let n = self.lookups.fetch_add(1, Ordering::SeqCst);
            if n < self.pending_polls {
                Ok(None)
            } else {
                self.terminal.clone().map(Some)
            }
        }
    }

    fn watcher_over(script: ScriptedReceipts) -> (ReceiptWatcher, Arc<ScriptedReceipts>) {
        let chain = Arc::new(script);
        (
            ReceiptWatcher::new(chain.clone(), Duration::from_millis(5)),
            chain,
        )
    }

    #[test]
    fn pending_then_success_confirms() {
        let (watcher, chain) = watcher_over(ScriptedReceipts {
            pending_polls: 3,
            terminal: Ok(ReceiptStatus { success: true, reason: None }),
            lookups: AtomicUsize::new(0),
        });
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let outcome = tokio_test::block_on(watcher.watch(B256::repeat_byte(0x01), cancel_rx));
        assert_eq!(outcome, WatchOutcome::Confirmed);
        assert_eq!(chain.lookups.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn revert_fails() {
        let (watcher, _) = watcher_over(ScriptedReceipts {
            pending_polls: 0,
            terminal: Ok(ReceiptStatus { success: false, reason: None }),
            lookups: AtomicUsize::new(0),
        });
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let outcome = tokio_test::block_on(watcher.watch(B256::repeat_byte(0x02), cancel_rx));
        assert_eq!(outcome, WatchOutcome::Failed("transaction reverted".into()));
    }

    #[test]
    fn read_errors_other_than_not_found_fail() {
        let (watcher, chain) = watcher_over(ScriptedReceipts {
            pending_polls: 1,
            terminal: Err(AppError::ProviderUnavailable("boom".into())),
            lookups: AtomicUsize::new(0),
        });
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let outcome = tokio_test::block_on(watcher.watch(B256::repeat_byte(0x03), cancel_rx));
        assert!(matches!(outcome, WatchOutcome::Failed(_)));
        assert_eq!(chain.lookups.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn cancellation_stops_polling() {
        let chain = Arc::new(ScriptedReceipts {
            // Never resolves on its own.
            pending_polls: usize::MAX,
            terminal: Ok(ReceiptStatus { success: true, reason: None }),
            lookups: AtomicUsize::new(0),
        });
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let outcome = tokio_test::block_on(async {
            let watcher = ReceiptWatcher::new(chain.clone(), Duration::from_millis(5));
            let handle =
                tokio::spawn(async move { watcher.watch(B256::repeat_byte(0x04), cancel_rx).await });
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel_tx.send(true).unwrap();
            let outcome = handle.await.unwrap();
            let lookups_at_cancel = chain.lookups.load(Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            assert_eq!(
                chain.lookups.load(Ordering::SeqCst),
                lookups_at_cancel,
                "no lookups after cancellation"
            );
            outcome
        });
        assert_eq!(outcome, WatchOutcome::Cancelled);
    }
}
