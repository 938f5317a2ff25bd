//! Eastmoney full-market spot list provider (tertiary source).
//!
//! Pulls the entire A-share spot table from the push2 clist endpoint in
//! one request. This is the snapshot source for the market refresher and
//! the last-resort single-symbol source: a quote request filters the full
//! table down to the requested symbol.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::MarketDataError;
use crate::models::Quote;
use crate::provider::{MarketDataProvider, ProviderCapabilities, RateLimit};
use crate::sanitize::{decimal_field, u64_field};

/// Provider ID constant
const PROVIDER_ID: &str = "EASTMONEY_SPOT";

const LIST_URL: &str = "https://82.push2.eastmoney.com/api/qt/clist/get";

/// Market filter: Shenzhen main/ChiNext + Shanghai main/STAR boards.
const MARKET_FILTER: &str = "m:0 t:6,m:0 t:80,m:1 t:2,m:1 t:23";

/// Spot table columns (price, change, OHLC, volume, valuation, identity).
const LIST_FIELDS: &str =
    "f2,f3,f4,f5,f6,f8,f9,f12,f14,f15,f16,f17,f18,f20,f21,f23";

/// One page large enough to cover the whole market.
const PAGE_SIZE: &str = "10000";

/// Full-market pulls are slow; allow more headroom than single quotes.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Eastmoney clist full-market provider.
pub struct EastmoneySpotProvider {
    client: Client,
}

impl EastmoneySpotProvider {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }

    /// Map one spot table row onto the canonical quote shape.
    ///
    /// With `fltt=2` the endpoint reports real floats (or `"-"`), so no
    /// descaling is needed. Rows without a symbol are unusable.
    fn quote_from_row(row: &Map<String, Value>) -> Option<(String, Quote)> {
        let symbol = row.get("f12").and_then(Value::as_str)?.to_string();
        if symbol.is_empty() {
            return None;
        }

        let name = row
            .get("f14")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let quote = Quote {
            symbol: symbol.clone(),
            name,
            price: decimal_field(row.get("f2")),
            change: decimal_field(row.get("f4")),
            change_percent: decimal_field(row.get("f3")),
            open: decimal_field(row.get("f17")),
            high: decimal_field(row.get("f15")),
            low: decimal_field(row.get("f16")),
            prev_close: decimal_field(row.get("f18")),
            volume: u64_field(row.get("f5")),
            amount: decimal_field(row.get("f6")),
            turnover_rate: decimal_field(row.get("f8")),
            pe_ratio: decimal_field(row.get("f9")),
            pb_ratio: decimal_field(row.get("f23")),
            market_cap: decimal_field(row.get("f20")),
            float_market_cap: decimal_field(row.get("f21")),
            fetched_at: Utc::now(),
            source: PROVIDER_ID.to_string(),
        };

        Some((symbol, quote))
    }

    /// Parse the clist response body into a symbol-keyed map.
    fn parse_body(body: &Value) -> Result<HashMap<String, Quote>, MarketDataError> {
        let rows = body
            .get("data")
            .and_then(|d| d.get("diff"))
            .and_then(Value::as_array)
            .ok_or_else(|| MarketDataError::EmptyPayload {
                provider: PROVIDER_ID.to_string(),
            })?;

        let quotes: HashMap<String, Quote> = rows
            .iter()
            .filter_map(Value::as_object)
            .filter_map(Self::quote_from_row)
            .collect();

        if quotes.is_empty() {
            return Err(MarketDataError::EmptyPayload {
                provider: PROVIDER_ID.to_string(),
            });
        }

        Ok(quotes)
    }
}

impl Default for EastmoneySpotProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for EastmoneySpotProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        3
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_quote: true,
            supports_snapshot: true,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        // Full-table pulls are heavy on the vendor side; stay modest.
        RateLimit {
            requests_per_minute: 12,
            burst_capacity: 3.0,
        }
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let mut snapshot = self.get_market_snapshot().await?;
        snapshot
            .remove(symbol)
            .ok_or_else(|| MarketDataError::SymbolNotFound(symbol.to_string()))
    }

    async fn get_market_snapshot(&self) -> Result<HashMap<String, Quote>, MarketDataError> {
        let response = self
            .client
            .get(LIST_URL)
            .query(&[
                ("pn", "1"),
                ("pz", PAGE_SIZE),
                ("po", "1"),
                ("np", "1"),
                ("fltt", "2"),
                ("invt", "2"),
                ("fid", "f3"),
                ("fs", MARKET_FILTER),
                ("fields", LIST_FIELDS),
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

        Self::parse_body(&body)
    }
}
