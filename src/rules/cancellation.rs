use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use super::RuleViolation;

/// Fee owed and amount refunded when a registration is cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationQuote {
    pub rate_percent: u32,
    pub fee: Decimal,
    pub refund: Decimal,
}

/// Percentage of the base fee retained, non-increasing in time-to-start
pub fn fee_rate_percent(until_start: Duration) -> u32 {
    if until_start < Duration::hours(24) {
        50
    } else if until_start < Duration::hours(72) {
        20
    } else {
        0
    }
}

pub fn quote(base_fee: Decimal, starts_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<CancellationQuote, RuleViolation> {
    if now >= starts_at {
        return Err(RuleViolation::business(
            "Activity has already started and can no longer be cancelled",
        ));
    }

    let rate_percent = fee_rate_percent(starts_at - now);
    let fee = (base_fee * Decimal::from(rate_percent) / Decimal::from(100)).round_dp(2);

    Ok(CancellationQuote {
        rate_percent,
        fee,
        refund: base_fee - fee,
    })
}
