//! Provider capability and rate limit declarations.

/// Describes what a provider can serve.
///
/// The registry consults capabilities when choosing which adapter to send
/// an operation to; an adapter asked for an operation it does not declare
/// returns [`MarketDataError::NotSupported`](crate::errors::MarketDataError::NotSupported).
#[derive(Clone, Copy, Debug)]
pub struct ProviderCapabilities {
    /// Can fetch a single-symbol quote.
    pub supports_quote: bool,
    /// Can fetch the whole market in one call.
    pub supports_snapshot: bool,
}

/// Rate limiting configuration a provider declares for itself.
///
/// Vendor limits are undocumented; these values are conservative
/// observations, enforced client-side by the registry's token buckets.
#[derive(Clone, Copy, Debug)]
pub struct RateLimit {
    /// Sustained requests per minute.
    pub requests_per_minute: u32,
    /// Burst capacity before throttling kicks in.
    pub burst_capacity: f64,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            burst_capacity: 10.0,
        }
    }
}
