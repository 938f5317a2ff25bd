use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single sanitized market data quote.
///
/// Quotes are immutable once constructed: a fresher fetch produces a new
/// `Quote` that supersedes the old one, the old value is never mutated in
/// place. Every numeric field defaults to zero when the vendor omitted or
/// mangled it; adapters are responsible for that coercion, so consumers
/// never see NaN, infinities or placeholder tokens.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Quote {
    /// Exchange symbol, e.g. "600000"
    pub symbol: String,

    /// Display name as reported by the vendor
    pub name: String,

    /// Last traded price
    pub price: Decimal,

    /// Absolute change versus previous close
    pub change: Decimal,

    /// Percent change versus previous close
    pub change_percent: Decimal,

    /// Opening price
    pub open: Decimal,

    /// Session high
    pub high: Decimal,

    /// Session low
    pub low: Decimal,

    /// Previous session close
    pub prev_close: Decimal,

    /// Traded volume (lots)
    pub volume: u64,

    /// Turnover amount
    pub amount: Decimal,

    /// Turnover rate, percent
    pub turnover_rate: Decimal,

    /// Price/earnings ratio when the vendor reports one
    pub pe_ratio: Decimal,

    /// Price/book ratio when the vendor reports one
    pub pb_ratio: Decimal,

    /// Total market capitalization
    pub market_cap: Decimal,

    /// Free-float market capitalization
    pub float_market_cap: Decimal,

    /// When this quote was captured
    pub fetched_at: DateTime<Utc>,

    /// Provider id the quote came from (EASTMONEY, SINA, ...)
    pub source: String,
}

impl Quote {
    /// Create a quote with only identity and price fields set.
    ///
    /// All other numeric fields start at zero; adapters fill in whatever
    /// their vendor actually reports.
    pub fn new(symbol: impl Into<String>, name: impl Into<String>, price: Decimal, source: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            price,
            change: Decimal::ZERO,
            change_percent: Decimal::ZERO,
            open: Decimal::ZERO,
            high: Decimal::ZERO,
            low: Decimal::ZERO,
            prev_close: Decimal::ZERO,
            volume: 0,
            amount: Decimal::ZERO,
            turnover_rate: Decimal::ZERO,
            pe_ratio: Decimal::ZERO,
            pb_ratio: Decimal::ZERO,
            market_cap: Decimal::ZERO,
            float_market_cap: Decimal::ZERO,
            fetched_at: Utc::now(),
            source: source.into(),
        }
    }

    /// Percent change of `price` versus `prev_close`.
    ///
    /// Defined as zero when the previous close is zero, so a missing
    /// reference price never produces a division error or a misleading
    /// swing.
    pub fn percent_change(price: Decimal, prev_close: Decimal) -> Decimal {
        if prev_close.is_zero() {
            Decimal::ZERO
        } else {
            (price - prev_close) / prev_close * Decimal::ONE_HUNDRED
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_quote_new_defaults() {
        let quote = Quote::new("600000", "PF Bank", dec!(10.20), "EASTMONEY");
        assert_eq!(quote.symbol, "600000");
        assert_eq!(quote.price, dec!(10.20));
        assert_eq!(quote.change, Decimal::ZERO);
        assert_eq!(quote.volume, 0);
        assert_eq!(quote.source, "EASTMONEY");
    }

    #[test]
    fn test_percent_change() {
        assert_eq!(
            Quote::percent_change(dec!(11), dec!(10)),
            dec!(10)
        );
        assert_eq!(
            Quote::percent_change(dec!(9), dec!(10)),
            dec!(-10)
        );
    }

    #[test]
    fn test_percent_change_zero_prev_close() {
        assert_eq!(Quote::percent_change(dec!(10), Decimal::ZERO), Decimal::ZERO);
    }
}
