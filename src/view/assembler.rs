use alloy::primitives::Address;
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::amount::TokenAmount;
use crate::models::{
    BalancesView, DisplayAmount, HealthFactor, HealthStatus, PendingTransaction, PositionSnapshot,
    PositionView, RatesView, ReserveRates, VaultHoldings, VaultView, ViewState,
};
use crate::units;

/// Everything the assembler combines. Each `Option` is `None` when the
/// corresponding read failed or was never issued; the assembler renders
/// the gap instead of inventing a value.
#[derive(Debug, Clone, Default)]
pub struct ViewInputs {
    pub account: Option<Address>,
    pub eth_balance: Option<TokenAmount>,
    pub usdc_balance: Option<TokenAmount>,
    pub a_usdc_balance: Option<TokenAmount>,
    pub snapshot: Option<PositionSnapshot>,
    pub vault: Option<VaultHoldings>,
    pub rates: Option<ReserveRates>,
    pub eth_usd: Option<Decimal>,
    pub pending: Vec<PendingTransaction>,
    pub last_error: Option<String>,
}

fn usd_string(value: Decimal) -> String {
    value.round_dp(2).to_string()
}

fn display_amount(amount: TokenAmount, unit_price_usd: Option<Decimal>) -> DisplayAmount {
    let usd = match (amount.to_decimal(), unit_price_usd) {
        (Some(qty), Some(price)) => qty.checked_mul(price).map(usd_string),
        _ => None,
    };
    DisplayAmount {
        raw: amount.raw.to_string(),
        decimals: amount.decimals,
        formatted: amount.format(),
        usd,
    }
}

fn health_status(health: &HealthFactor) -> Option<HealthStatus> {
    match health {
        HealthFactor::NotAvailable => None,
        HealthFactor::Unbounded => Some(HealthStatus::Healthy),
        HealthFactor::Ratio(ratio) => {
            let ratio = *ratio;
            Some(if ratio < Decimal::new(11, 1) {
                HealthStatus::Critical
            } else if ratio < Decimal::new(15, 1) {
                HealthStatus::Danger
            } else if ratio < Decimal::TWO {
                HealthStatus::Warning
            } else {
                HealthStatus::Healthy
            })
        }
    }
}

fn position_view(snapshot: &PositionSnapshot) -> PositionView {
    let health = snapshot.health();
    PositionView {
        total_collateral_usd: snapshot
            .total_collateral_usd()
            .map(usd_string)
            .unwrap_or_else(|| "-".into()),
        total_debt_usd: snapshot
            .total_debt_usd()
            .map(usd_string)
            .unwrap_or_else(|| "-".into()),
        available_borrows_usd: snapshot
            .available_borrows_usd()
            .map(usd_string)
            .unwrap_or_else(|| "-".into()),
        ltv_pct: snapshot
            .ltv_fraction()
            .map(units::fraction_to_percent_string)
            .unwrap_or_else(|| "-".into()),
        liquidation_threshold_pct: snapshot
            .liquidation_threshold_fraction()
            .map(units::fraction_to_percent_string)
            .unwrap_or_else(|| "-".into()),
        health_factor: health.display(),
        health_status: health_status(&health),
        warning: snapshot.consistency_warning(),
    }
}

/// Combine the latest reads into one display-ready state. Pure: no I/O, no
/// clock beyond the `updated_at` stamp, nothing cached between calls.
pub fn assemble(session_id: Uuid, inputs: ViewInputs) -> ViewState {
    let connected = inputs.account.is_some();

    let balances = BalancesView {
        eth: inputs
            .eth_balance
            .map(|b| display_amount(b, inputs.eth_usd)),
        // Stablecoin balances display 1:1 in USD.
        usdc: inputs
            .usdc_balance
            .map(|b| display_amount(b, Some(Decimal::ONE))),
        a_usdc: inputs
            .a_usdc_balance
            .map(|b| display_amount(b, Some(Decimal::ONE))),
    };

    let vault = inputs.vault.map(|holdings| VaultView {
        shares: display_amount(holdings.shares, None),
        underlying: display_amount(holdings.underlying, Some(Decimal::ONE)),
    });

    // "Total supplied" is the underlying-asset value of the account's
    // holdings: direct aToken balance plus vault shares converted to
    // assets.
    let total_supplied = match (inputs.a_usdc_balance, &inputs.vault) {
        (Some(direct), Some(holdings)) => direct
            .raw
            .checked_add(holdings.underlying.raw)
            .map(|sum| TokenAmount::new(sum, direct.decimals)),
        (Some(direct), None) => Some(direct),
        (None, Some(holdings)) => Some(holdings.underlying),
        (None, None) => None,
    }
    .map(|total| display_amount(total, Some(Decimal::ONE)));

    let rates = inputs.rates.and_then(|r| {
        let supply = r.supply_apy_fraction()?;
        let borrow = r.variable_borrow_apy_fraction()?;
        Some(RatesView {
            supply_apy_pct: units::fraction_to_percent_string(supply),
            variable_borrow_apy_pct: units::fraction_to_percent_string(borrow),
        })
    });

    ViewState {
        session_id,
        account: inputs.account,
        connected,
        balances,
        position: inputs.snapshot.as_ref().map(position_view),
        vault,
        rates,
        total_supplied,
        pending: inputs.pending,
        last_error: inputs.last_error,
        updated_at: Utc::now(),
    }
}
