//! Error types for the market data crate.

use thiserror::Error;

/// Errors that can occur while talking to quote vendors.
///
/// Callers of the registry only ever observe [`AllProvidersFailed`]
/// (every adapter in the chain failed) or [`NoProvidersAvailable`];
/// per-adapter failures are logged and swallowed by the fallback loop.
///
/// [`AllProvidersFailed`]: MarketDataError::AllProvidersFailed
/// [`NoProvidersAvailable`]: MarketDataError::NoProvidersAvailable
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// The requested symbol was not found by the provider.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The provider answered but the payload carried no usable data.
    #[error("Empty payload from provider: {provider}")]
    EmptyPayload {
        /// The provider that returned the empty payload
        provider: String,
    },

    /// The provider answered with data this crate cannot parse.
    #[error("Malformed payload from {provider}: {message}")]
    MalformedPayload {
        /// The provider that returned the payload
        provider: String,
        /// What was wrong with it
        message: String,
    },

    /// The provider rate limited the request (HTTP 429).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// A provider-specific error occurred.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The operation is not supported by this provider.
    #[error("Operation '{operation}' not supported by provider: {provider}")]
    NotSupported {
        /// The unsupported operation
        operation: String,
        /// The provider it was requested from
        provider: String,
    },

    /// No providers are registered that can serve the request.
    #[error("No providers available")]
    NoProvidersAvailable,

    /// Every provider in the chain was tried and all failed.
    #[error("All providers failed")]
    AllProvidersFailed,

    /// A network error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}
