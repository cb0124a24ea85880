//! Fixed-point de-scaling for the protocol's on-chain representations.
//!
//! Aave reports aggregate account values in an 8-decimal base currency,
//! percentage figures (LTV, liquidation threshold) as 4-decimal basis
//! points, interest rates in ray (27 decimals) and the health factor in
//! wad (18 decimals). Getting any of these exponents wrong silently
//! corrupts every displayed figure, so they live here and nowhere else.

use alloy::primitives::U256;
use rust_decimal::Decimal;

/// Health factor scaling (1e18).
pub const WAD_DECIMALS: u32 = 18;
/// Interest rate scaling (1e27).
pub const RAY_DECIMALS: u32 = 27;
/// Percentage scaling: 10_000 == 100%.
pub const BPS_DECIMALS: u32 = 4;
/// Base-currency (USD) scaling for account aggregates.
pub const BASE_CURRENCY_DECIMALS: u32 = 8;

/// Convert a raw on-chain integer to a `Decimal` with the given scale.
/// Returns `None` when the value does not fit, which callers treat as
/// "effectively unbounded" rather than an error.
pub fn u256_to_decimal(value: U256, scale: u32) -> Option<Decimal> {
    let v = u128::try_from(value).ok()?;
    let v = i128::try_from(v).ok()?;
    Decimal::try_from_i128_with_scale(v, scale).ok()
}

pub fn wad_to_decimal(value: U256) -> Option<Decimal> {
    u256_to_decimal(value, WAD_DECIMALS)
}

pub fn ray_to_decimal(value: U256) -> Option<Decimal> {
    u256_to_decimal(value, RAY_DECIMALS)
}

/// Basis points to a fraction: 8000 -> 0.8.
pub fn bps_to_decimal(value: U256) -> Option<Decimal> {
    u256_to_decimal(value, BPS_DECIMALS)
}

/// 8-decimal base-currency amount to a USD figure.
pub fn base_currency_to_decimal(value: U256) -> Option<Decimal> {
    u256_to_decimal(value, BASE_CURRENCY_DECIMALS)
}

/// Fraction to a percentage with two displayed decimals: 0.8 -> "80.00".
pub fn fraction_to_percent_string(fraction: Decimal) -> String {
    (fraction * Decimal::ONE_HUNDRED).round_dp(2).to_string()
}
