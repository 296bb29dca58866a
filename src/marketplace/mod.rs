//! Marketplace API access: endpoint catalogue, request pacing and response
//! classification.

use thiserror::Error;

pub mod client;
pub mod endpoints;
pub mod rate_limiter;

pub use client::{FetchClient, FetchOutcome};
pub use endpoints::{ApiVersion, Endpoints};
pub use rate_limiter::{RateLimiter, RateLimiterStats, RequestGate};

/// Failures that prevent a response from being classified at all.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Structural credential check: three non-empty dot-separated segments.
pub fn is_valid_token_format(token: &str) -> bool {
    let segments: Vec<&str> = token.split('.').collect();
    segments.len() == 3 && segments.iter().all(|s| !s.is_empty())
}
