use alloy::primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::amount::TokenAmount;
use crate::blockchain::traits::{RawAccountData, RawReserveRates};
use crate::units;

/// Aggregate account position, captured from one provider read.
///
/// Fields stay in the provider's raw representation; de-scaling happens in
/// the accessors so nothing downstream can mix scalings, and all six
/// values are guaranteed to come from the same block of the same call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub total_collateral_base: U256,
    pub total_debt_base: U256,
    pub available_borrows_base: U256,
    pub current_liquidation_threshold: U256,
    pub ltv: U256,
    pub health_factor: U256,
}

/// Health factor states the presentation layer must distinguish: the
/// provider reports 0 before any position exists, and the maximum word
/// when there is collateral but no debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthFactor {
    /// Raw 0: no position yet. Renders "N/A", never "0.00".
    NotAvailable,
    /// No debt; the factor is unbounded.
    Unbounded,
    Ratio(Decimal),
}

impl From<RawAccountData> for PositionSnapshot {
    fn from(raw: RawAccountData) -> Self {
        Self {
            total_collateral_base: raw.total_collateral_base,
            total_debt_base: raw.total_debt_base,
            available_borrows_base: raw.available_borrows_base,
            current_liquidation_threshold: raw.current_liquidation_threshold,
            ltv: raw.ltv,
            health_factor: raw.health_factor,
        }
    }
}

impl PositionSnapshot {
    pub fn is_empty(&self) -> bool {
        self.total_collateral_base.is_zero() && self.total_debt_base.is_zero()
    }

    pub fn total_collateral_usd(&self) -> Option<Decimal> {
        units::base_currency_to_decimal(self.total_collateral_base)
    }

    pub fn total_debt_usd(&self) -> Option<Decimal> {
        units::base_currency_to_decimal(self.total_debt_base)
    }

    pub fn available_borrows_usd(&self) -> Option<Decimal> {
        units::base_currency_to_decimal(self.available_borrows_base)
    }

    /// Loan-to-value as a fraction (8000 bps -> 0.8).
    pub fn ltv_fraction(&self) -> Option<Decimal> {
        units::bps_to_decimal(self.ltv)
    }

    pub fn liquidation_threshold_fraction(&self) -> Option<Decimal> {
        units::bps_to_decimal(self.current_liquidation_threshold)
    }

    pub fn health(&self) -> HealthFactor {
        if self.health_factor.is_zero() {
            return HealthFactor::NotAvailable;
        }
        match units::wad_to_decimal(self.health_factor) {
            Some(ratio) => HealthFactor::Ratio(ratio),
            // Larger than any representable ratio, including the provider's
            // "no debt" sentinel of U256::MAX.
            None => HealthFactor::Unbounded,
        }
    }

    /// The protocol guarantees LTV <= liquidation threshold. A snapshot
    /// violating that is corrupt input and must be flagged to the reader
    /// rather than rendered as if it were fine.
    pub fn consistency_warning(&self) -> Option<String> {
        if self.ltv > self.current_liquidation_threshold {
            return Some(format!(
                "inconsistent snapshot: ltv {} bps exceeds liquidation threshold {} bps",
                self.ltv, self.current_liquidation_threshold
            ));
        }
        None
    }
}

impl HealthFactor {
    pub fn display(&self) -> String {
        match self {
            HealthFactor::NotAvailable => "N/A".to_string(),
            HealthFactor::Unbounded => "∞".to_string(),
            HealthFactor::Ratio(ratio) => ratio.round_dp(2).to_string(),
        }
    }
}

/// The account's stake in the intermediary vault. "Total supplied" is
/// defined as the underlying asset value (`convertToAssets` of the share
/// balance), not the share count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultHoldings {
    pub shares: TokenAmount,
    pub underlying: TokenAmount,
}

/// Reserve interest rates, de-scaled from ray on access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReserveRates {
    pub liquidity_rate: U256,
    pub variable_borrow_rate: U256,
}

impl From<RawReserveRates> for ReserveRates {
    fn from(raw: RawReserveRates) -> Self {
        Self {
            liquidity_rate: raw.liquidity_rate,
            variable_borrow_rate: raw.variable_borrow_rate,
        }
    }
}

impl ReserveRates {
    pub fn supply_apy_fraction(&self) -> Option<Decimal> {
        units::ray_to_decimal(self.liquidity_rate)
    }

    pub fn variable_borrow_apy_fraction(&self) -> Option<Decimal> {
        units::ray_to_decimal(self.variable_borrow_rate)
    }
}
