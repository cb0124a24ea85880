mod common;

use aave_autopilot::blockchain::contracts::{IAavePoolV3, IERC20};
use aave_autopilot::config::registry::ContractAddresses;
use aave_autopilot::models::{Asset, TxKind, TxState, ViewState};
use aave_autopilot::tx::Route;
use aave_autopilot::view::session::{AutopilotSession, SessionConfig, SessionEvent};
use alloy::primitives::U256;
use alloy::sol_types::SolCall;
use common::{tx_selector, tx_to, user, wait_for, MockChain, MockWallet};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    chain: Arc<MockChain>,
    wallet: Arc<MockWallet>,
    session: Arc<AutopilotSession>,
    registry: ContractAddresses,
}

async fn wait_for_view<F>(session: &Arc<AutopilotSession>, condition: F, label: &str)
where
    F: Fn(&ViewState) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_millis(2_000);
    loop {
        let view = session.snapshot().await;
        if condition(&view) {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {label}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

async fn start_session() -> Harness {
    let registry = ContractAddresses::for_chain(11155111).unwrap();
    let chain = Arc::new(MockChain::default());
    let wallet = Arc::new(MockWallet::connected(user()));
    let (session, events_rx) = AutopilotSession::new(SessionConfig {
        chain: chain.clone(),
        wallet: wallet.clone(),
        contracts: registry.clone(),
        receipt_poll_interval: Duration::from_millis(10),
    });
    tokio::spawn(session.clone().run(events_rx));
    session
        .events()
        .send(SessionEvent::AccountChanged(Some(user())))
        .await
        .unwrap();
    wait_for_view(&session, |view| view.connected, "initial refresh").await;

    Harness {
        chain,
        wallet,
        session,
        registry,
    }
}

#[tokio::test]
async fn approval_confirms_before_the_supply_is_submitted() {
    let h = start_session().await;
    h.chain
        .set_erc20_balance(h.registry.usdc, user(), U256::from(10_000_000u64));

    let reads_before = h.chain.account_data_calls.load(Ordering::SeqCst);

    // Allowance is zero, so the deposit becomes an approval.
    let approval = h
        .session
        .deposit(Asset::Erc20(h.registry.usdc), "5", Route::Pool)
        .await
        .unwrap();
    assert_eq!(approval.kind, TxKind::Approve);

    // While the approval is unmined, the supply must not exist.
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(h.wallet.submitted_count(), 1, "only the approval so far");

    // The approval lands; the chain now reflects the new allowance.
    h.chain.set_allowance(
        h.registry.usdc,
        user(),
        h.registry.pool,
        U256::from(5_000_000u64),
    );
    h.chain.set_receipt(approval.hash, true);

    let wallet = h.wallet.clone();
    wait_for(
        move || wallet.submitted_count() == 2,
        2_000,
        "supply after approval confirmation",
    )
    .await;

    let supply = h.wallet.submitted_at(1);
    assert_eq!(tx_to(&supply), h.registry.pool);
    assert_eq!(tx_selector(&supply), IAavePoolV3::supplyCall::SELECTOR);
    assert_eq!(
        tx_selector(&h.wallet.submitted_at(0)),
        IERC20::approveCall::SELECTOR
    );

    // Confirm the supply too; its tracked entry clears after the refresh.
    wait_for_view(
        &h.session,
        |view| view.pending.iter().any(|p| p.kind == TxKind::Deposit),
        "supply tracked",
    )
    .await;
    let supply_hash = h
        .session
        .snapshot()
        .await
        .pending
        .iter()
        .find(|p| p.kind == TxKind::Deposit)
        .map(|p| p.hash)
        .unwrap();
    h.chain.set_receipt(supply_hash, true);
    wait_for_view(
        &h.session,
        |view| view.pending.is_empty(),
        "pending list cleared",
    )
    .await;

    // One refresh per confirmation: the approval's and the supply's.
    let reads_after = h.chain.account_data_calls.load(Ordering::SeqCst);
    assert_eq!(reads_after - reads_before, 2);

    // No further reads arrive once everything is terminal.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        h.chain.account_data_calls.load(Ordering::SeqCst),
        reads_after
    );
}

#[tokio::test]
async fn reverted_transaction_fails_and_does_not_refresh_reads() {
    let h = start_session().await;
    h.chain
        .set_erc20_balance(h.registry.usdc, user(), U256::from(10_000_000u64));
    h.chain.set_allowance(
        h.registry.usdc,
        user(),
        h.registry.pool,
        U256::from(5_000_000u64),
    );

    let deposit = h
        .session
        .deposit(Asset::Erc20(h.registry.usdc), "5", Route::Pool)
        .await
        .unwrap();
    assert_eq!(deposit.kind, TxKind::Deposit);

    let reads_before = h.chain.account_data_calls.load(Ordering::SeqCst);
    h.chain.set_receipt(deposit.hash, false);

    wait_for_view(
        &h.session,
        |view| {
            view.pending
                .iter()
                .any(|p| matches!(p.state, TxState::Failed { .. }))
        },
        "failure surfaced",
    )
    .await;

    let view = h.session.snapshot().await;
    assert!(view.last_error.as_deref().unwrap_or("").contains("revert"));

    // Failed writes must not trigger dependent reads.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        h.chain.account_data_calls.load(Ordering::SeqCst),
        reads_before
    );
}

#[tokio::test]
async fn account_change_cancels_outstanding_watchers() {
    let h = start_session().await;
    h.chain
        .set_erc20_balance(h.registry.usdc, user(), U256::from(10_000_000u64));
    h.chain.set_allowance(
        h.registry.usdc,
        user(),
        h.registry.pool,
        U256::from(5_000_000u64),
    );

    // Submit a deposit whose receipt never arrives.
    h.session
        .deposit(Asset::Erc20(h.registry.usdc), "5", Route::Pool)
        .await
        .unwrap();

    let chain = h.chain.clone();
    wait_for(
        move || chain.receipt_lookups.load(Ordering::SeqCst) > 0,
        2_000,
        "watcher polling",
    )
    .await;

    // Disconnect: polling must stop and the view must reset.
    *h.wallet.account.lock().unwrap() = None;
    h.session
        .events()
        .send(SessionEvent::AccountChanged(None))
        .await
        .unwrap();

    wait_for_view(&h.session, |view| !view.connected, "view reset").await;

    // Give in-flight polls a moment to drain, then require silence.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let lookups_after_cancel = h.chain.receipt_lookups.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        h.chain.receipt_lookups.load(Ordering::SeqCst),
        lookups_after_cancel,
        "no receipt polls after teardown"
    );

    let view = h.session.snapshot().await;
    assert!(view.pending.is_empty());
    assert!(view.position.is_none());
}

#[tokio::test]
async fn confirmed_withdraw_refreshes_reads_exactly_once() {
    let h = start_session().await;
    h.chain
        .set_erc20_balance(h.registry.a_usdc, user(), U256::from(5_000_000u64));

    let withdraw = h
        .session
        .withdraw(Asset::Erc20(h.registry.usdc), "2.5", Route::Pool)
        .await
        .unwrap();
    assert_eq!(withdraw.kind, TxKind::Withdraw);

    let reads_before = h.chain.account_data_calls.load(Ordering::SeqCst);
    h.chain.set_receipt(withdraw.hash, true);

    wait_for_view(
        &h.session,
        |view| view.pending.is_empty(),
        "withdraw confirmed and cleared",
    )
    .await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(
        h.chain.account_data_calls.load(Ordering::SeqCst) - reads_before,
        1,
        "exactly one dependent refresh"
    );
}

#[tokio::test]
async fn view_reflects_balances_and_position_after_refresh() {
    let h = start_session().await;
    h.chain
        .set_native_balance(user(), U256::from(2_500_000_000_000_000_000u128));
    h.chain
        .set_erc20_balance(h.registry.usdc, user(), U256::from(1_500_000u64));
    h.chain.account_data.lock().unwrap().insert(
        user(),
        aave_autopilot::blockchain::traits::RawAccountData {
            total_collateral_base: U256::from(100_000_000_000u128),
            total_debt_base: U256::from(40_000_000_000u128),
            available_borrows_base: U256::from(40_000_000_000u128),
            current_liquidation_threshold: U256::from(8250u64),
            ltv: U256::from(8000u64),
            health_factor: U256::from(1_790_000_000_000_000_000u128),
        },
    );

    h.session
        .events()
        .send(SessionEvent::Refresh)
        .await
        .unwrap();

    wait_for_view(
        &h.session,
        |view| view.position.is_some() && view.balances.eth.is_some(),
        "populated view",
    )
    .await;

    let view = h.session.snapshot().await;
    let eth = view.balances.eth.unwrap();
    assert_eq!(eth.formatted, "2.5");
    assert_eq!(eth.usd.as_deref(), Some("5000.00"), "2.5 ETH at $2000");
    let position = view.position.unwrap();
    assert_eq!(position.health_factor, "1.79");
    assert_eq!(position.ltv_pct, "80.00");
}
