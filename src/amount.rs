use alloy::primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A token quantity as the chain sees it: a raw integer magnitude plus the
/// token's decimal-place count.
///
/// The raw integer is the source of truth. Formatted strings are derived
/// with pure integer arithmetic and parsing a formatted string recovers the
/// exact raw magnitude; no float ever touches a balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    pub raw: U256,
    pub decimals: u8,
}

impl TokenAmount {
    pub fn new(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    pub fn zero(decimals: u8) -> Self {
        Self { raw: U256::ZERO, decimals }
    }

    pub fn is_zero(&self) -> bool {
        self.raw.is_zero()
    }

    fn scale(decimals: u8) -> Result<U256, AppError> {
        U256::from(10u64)
            .checked_pow(U256::from(decimals))
            .ok_or_else(|| AppError::InvalidInput(format!("decimals too large: {decimals}")))
    }

    /// Parse a user-entered decimal string ("2.5") into raw units.
    pub fn parse(input: &str, decimals: u8) -> Result<Self, AppError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(AppError::InvalidInput("empty amount".into()));
        }
        if input.starts_with('-') {
            return Err(AppError::InvalidInput("amount must be non-negative".into()));
        }

        let (whole, frac) = match input.split_once('.') {
            Some((w, f)) => (w, f),
            None => (input, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(AppError::InvalidInput(format!("malformed amount: {input}")));
        }

        let whole_v = if whole.is_empty() {
            U256::ZERO
        } else {
            whole
                .parse::<U256>()
                .map_err(|e| AppError::InvalidInput(format!("malformed amount {input:?}: {e}")))?
        };

        if frac.len() > decimals as usize {
            return Err(AppError::InvalidInput(format!(
                "too many decimal places for token with {decimals} decimals: {input}"
            )));
        }
        let mut frac_padded = frac.to_owned();
        while frac_padded.len() < decimals as usize {
            frac_padded.push('0');
        }
        let frac_v = if frac_padded.is_empty() {
            U256::ZERO
        } else {
            frac_padded
                .parse::<U256>()
                .map_err(|e| AppError::InvalidInput(format!("malformed amount {input:?}: {e}")))?
        };

        let scale = Self::scale(decimals)?;
        let raw = whole_v
            .checked_mul(scale)
            .and_then(|v| v.checked_add(frac_v))
            .ok_or_else(|| AppError::InvalidInput(format!("amount overflows: {input}")))?;

        Ok(Self { raw, decimals })
    }

    /// Render the raw magnitude as a decimal string, trimming trailing
    /// fractional zeros. `1500000` at 6 decimals renders "1.5".
    pub fn format(&self) -> String {
        if self.decimals == 0 {
            return self.raw.to_string();
        }
        // Scale construction only fails above 10^77, which a u8 decimal
        // count reaches at 78+. Saturate to MAX so formatting stays total.
        let scale = Self::scale(self.decimals).unwrap_or(U256::MAX);
        let whole = self.raw / scale;
        let frac = self.raw % scale;
        if frac.is_zero() {
            return whole.to_string();
        }
        let mut frac_s = frac.to_string();
        while frac_s.len() < self.decimals as usize {
            frac_s.insert(0, '0');
        }
        while frac_s.ends_with('0') {
            frac_s.pop();
        }
        format!("{whole}.{frac_s}")
    }

    /// Lossy conversion for display math (USD equivalents). Returns `None`
    /// when the magnitude exceeds what a `Decimal` can carry.
    pub fn to_decimal(&self) -> Option<Decimal> {
        crate::units::u256_to_decimal(self.raw, u32::from(self.decimals))
    }
}
