//! Eastmoney quote provider (primary source).
//!
//! Fetches single-symbol quotes from the Eastmoney push2 endpoint. Prices
//! arrive as integers scaled by 100 and any field may be the `"-"`
//! placeholder, so every value goes through sanitization before it lands
//! in a [`Quote`].

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::time::Duration;

use crate::errors::MarketDataError;
use crate::models::{exchange, Quote};
use crate::provider::{MarketDataProvider, ProviderCapabilities, RateLimit};
use crate::sanitize::{decimal_field, u64_field};

/// Provider ID constant
const PROVIDER_ID: &str = "EASTMONEY";

const QUOTE_URL: &str = "https://push2.eastmoney.com/api/qt/stock/get";

/// Field list: price/OHLC/volume/valuation columns of the push2 quote API.
const QUOTE_FIELDS: &str =
    "f43,f44,f45,f46,f47,f48,f55,f57,f58,f60,f116,f117,f168,f169,f170";

/// Public access token used by the web terminal.
const UT_TOKEN: &str = "fa5fd1943c7b386f172d6893dbfba10b";

/// Default HTTP request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Eastmoney push2 single-quote provider.
pub struct EastmoneyProvider {
    client: Client,
}

impl EastmoneyProvider {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }

    /// Map a push2 `data` object onto the canonical quote shape.
    ///
    /// Monetary fields are scaled down by 100; volume, amount and market
    /// caps are reported unscaled.
    fn quote_from_fields(symbol: &str, data: &Map<String, Value>) -> Quote {
        let hundred = Decimal::ONE_HUNDRED;
        let scaled = |key: &str| decimal_field(data.get(key)) / hundred;

        let name = data
            .get("f58")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Quote {
            symbol: symbol.to_string(),
            name,
            price: scaled("f43"),
            change: scaled("f169"),
            change_percent: scaled("f170"),
            open: scaled("f46"),
            high: scaled("f44"),
            low: scaled("f45"),
            prev_close: scaled("f60"),
            volume: u64_field(data.get("f47")),
            amount: decimal_field(data.get("f48")),
            turnover_rate: scaled("f168"),
            pe_ratio: scaled("f55"),
            pb_ratio: Decimal::ZERO,
            market_cap: decimal_field(data.get("f116")),
            float_market_cap: decimal_field(data.get("f117")),
            fetched_at: Utc::now(),
            source: PROVIDER_ID.to_string(),
        }
    }
}

impl Default for EastmoneyProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for EastmoneyProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        1
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_quote: true,
            supports_snapshot: false,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 120,
            burst_capacity: 20.0,
        }
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let secid = exchange::secid(symbol);

        let response = self
            .client
            .get(QUOTE_URL)
            .query(&[
                ("secid", secid.as_str()),
                ("fields", QUOTE_FIELDS),
                ("ut", UT_TOKEN),
            ])
            .send()
            .await
            .map_err(|e| MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: e.to_string(),
            })?;

        if response.status().as_u16() == 429 {
            return Err(MarketDataError::RateLimited {
                provider: PROVIDER_ID.to_string(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| MarketDataError::MalformedPayload {
                provider: PROVIDER_ID.to_string(),
                message: e.to_string(),
            })?;

        match body.get("data").and_then(Value::as_object) {
            Some(data) if !data.is_empty() => Ok(Self::quote_from_fields(symbol, data)),
            _ => Err(MarketDataError::EmptyPayload {
                provider: PROVIDER_ID.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn sample_fields() -> Map<String, Value> {
        json!({
            "f43": 1020,
            "f44": 1035,
            "f45": 1001,
            "f46": 1010,
            "f47": 1234567,
            "f48": 1.5e9,
            "f55": 585,
            "f58": "PF Bank",
            "f60": 1000,
            "f116": 2.99e11,
            "f117": 2.95e11,
            "f168": 123,
            "f169": 20,
            "f170": 200
        })
        .as_object()
        .cloned()
        .unwrap_or_default()
    }

    #[test]
    fn test_quote_from_fields_scaling() {
        let quote = EastmoneyProvider::quote_from_fields("600000", &sample_fields());
        assert_eq!(quote.price, dec!(10.20));
        assert_eq!(quote.high, dec!(10.35));
        assert_eq!(quote.low, dec!(10.01));
        assert_eq!(quote.open, dec!(10.10));
        assert_eq!(quote.prev_close, dec!(10));
        assert_eq!(quote.change, dec!(0.20));
        assert_eq!(quote.change_percent, dec!(2));
        assert_eq!(quote.turnover_rate, dec!(1.23));
        assert_eq!(quote.pe_ratio, dec!(5.85));
        assert_eq!(quote.volume, 1_234_567);
        assert_eq!(quote.name, "PF Bank");
        assert_eq!(quote.source, "EASTMONEY");
    }

    #[test]
    fn test_quote_from_fields_placeholders() {
        let fields = json!({"f43": "-", "f58": "Halted Co", "f60": 950})
            .as_object()
            .cloned()
            .unwrap_or_default();
        let quote = EastmoneyProvider::quote_from_fields("000001", &fields);
        assert_eq!(quote.price, Decimal::ZERO);
        assert_eq!(quote.prev_close, dec!(9.50));
        assert_eq!(quote.volume, 0);
    }

    #[test]
    fn test_provider_metadata() {
        let provider = EastmoneyProvider::new();
        assert_eq!(provider.id(), "EASTMONEY");
        assert_eq!(provider.priority(), 1);
        assert!(provider.capabilities().supports_quote);
        assert!(!provider.capabilities().supports_snapshot);
    }
}
