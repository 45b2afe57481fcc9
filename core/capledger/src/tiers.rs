//! Appreciation tier calculator.
//!
//! A pure, non-decreasing step function from a committed amount to the
//! yield multiplier stored on the investment. Evaluated once per write,
//! against the amount *after* the write.

/// Yield multiplier for a committed amount.
pub fn appreciation_rate(amount: i64) -> f64 {
    if amount <= 250_000 {
        1.25
    } else if amount <= 500_000 {
        1.5
    } else if amount <= 750_000 {
        1.75
    } else if amount <= 1_000_000 {
        2.0
    } else {
        2.5
    }
}

/// Monthly yield for reporting: `amount × rate / 12`, rounded to cents.
pub fn monthly_yield(amount: i64, rate: f64) -> f64 {
    round2(amount as f64 * (rate / 12.0))
}

/// Indicative platform-wide yield: 3% of total committed. A reporting
/// heuristic, not a per-investment rate.
pub fn platform_yield(total_invested: i64) -> f64 {
    round2(total_invested as f64 * 0.03)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
