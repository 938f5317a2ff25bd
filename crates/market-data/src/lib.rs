//! Marketwatch Market Data Crate
//!
//! Provider-agnostic quote fetching for the marketwatch core.
//!
//! # Overview
//!
//! External quote vendors are unreliable, rate limited, and disagree on
//! field names and encodings. This crate hides all of that behind:
//!
//! - A canonical [`Quote`] shape; every adapter performs its own field
//!   mapping and numeric sanitization internally.
//! - The [`MarketDataProvider`] trait, implemented once per vendor.
//! - A [`ProviderRegistry`] that walks adapters in priority order,
//!   applying per-provider rate limits and falling through on failure.
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! | ProviderRegistry |  (ordered fallback + rate limiting)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |    Provider      |  (Eastmoney, Sina, Eastmoney spot list)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |     Quote        |  (sanitized canonical market data)
//! +------------------+
//! ```

pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;
pub mod sanitize;

pub use errors::MarketDataError;
pub use models::{exchange, Quote};
pub use provider::eastmoney::EastmoneyProvider;
pub use provider::eastmoney_spot::EastmoneySpotProvider;
pub use provider::sina::SinaProvider;
pub use provider::{MarketDataProvider, ProviderCapabilities, RateLimit};
pub use registry::{ProviderRegistry, RateLimiter};
