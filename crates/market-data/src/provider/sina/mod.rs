//! Sina quote provider (secondary source).
//!
//! Fetches single-symbol quotes from the hq.sinajs.cn list endpoint. The
//! payload is a GBK-encoded javascript assignment whose string literal
//! holds comma-separated fields; the endpoint rejects requests without a
//! finance.sina.com.cn referer.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::time::Duration;

use crate::errors::MarketDataError;
use crate::models::{exchange::Exchange, Quote};
use crate::provider::{MarketDataProvider, ProviderCapabilities, RateLimit};
use crate::sanitize::decimal_from_str;

/// Provider ID constant
const PROVIDER_ID: &str = "SINA";

const LIST_URL: &str = "https://hq.sinajs.cn/list=";

const REFERER: &str = "https://finance.sina.com.cn";

/// A valid hq payload carries at least this many comma fields.
const MIN_FIELDS: usize = 32;

/// Default HTTP request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sina hq single-quote provider.
pub struct SinaProvider {
    client: Client,
}

impl SinaProvider {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }

    /// Parse the `var hq_str_shXXXXXX="...";` payload into a quote.
    ///
    /// Field layout: 0 name, 1 open, 2 previous close, 3 price, 4 high,
    /// 5 low, 8 volume, 9 amount. Change and percent change are derived
    /// locally since the wire format does not carry them.
    fn parse_payload(symbol: &str, body: &str) -> Result<Quote, MarketDataError> {
        let inner = body
            .split('"')
            .nth(1)
            .ok_or_else(|| MarketDataError::MalformedPayload {
                provider: PROVIDER_ID.to_string(),
                message: "no quoted section in payload".to_string(),
            })?;

        if inner.is_empty() {
            // Unknown symbols come back as an empty string literal.
            return Err(MarketDataError::SymbolNotFound(symbol.to_string()));
        }

        let parts: Vec<&str> = inner.split(',').collect();
        if parts.len() < MIN_FIELDS {
            return Err(MarketDataError::MalformedPayload {
                provider: PROVIDER_ID.to_string(),
                message: format!("expected >= {} fields, got {}", MIN_FIELDS, parts.len()),
            });
        }

        let price = decimal_from_str(parts[3]);
        let prev_close = decimal_from_str(parts[2]);

        let mut quote = Quote::new(symbol, parts[0], price, PROVIDER_ID);
        quote.open = decimal_from_str(parts[1]);
        quote.prev_close = prev_close;
        quote.high = decimal_from_str(parts[4]);
        quote.low = decimal_from_str(parts[5]);
        quote.volume = parts[8]
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|v| v as u64)
            .unwrap_or(0);
        quote.amount = decimal_from_str(parts[9]);
        quote.change = price - prev_close;
        quote.change_percent = Quote::percent_change(price, prev_close);
        quote.fetched_at = Utc::now();
        Ok(quote)
    }
}

impl Default for SinaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for SinaProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn priority(&self) -> u8 {
        2
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            supports_quote: true,
            supports_snapshot: false,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 60,
            burst_capacity: 10.0,
        }
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let url = format!("{}{}{}", LIST_URL, Exchange::of(symbol).prefix(), symbol);

        let response = self
            .client
            .get(&url)
            .header("Referer", REFERER)
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

        let body = response
            .text_with_charset("GBK")
            .await
            .map_err(|e| MarketDataError::MalformedPayload {
                provider: PROVIDER_ID.to_string(),
                message: e.to_string(),
            })?;

        Self::parse_payload(symbol, &body)
    }
}
