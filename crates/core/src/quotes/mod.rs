//! Layered per-symbol quote resolution.

mod service;

pub use service::{QuoteService, ResolveMode};
