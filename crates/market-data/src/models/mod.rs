//! Canonical market data models.

pub mod exchange;
mod quote;

pub use quote::Quote;
