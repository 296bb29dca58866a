//! HTTP client for the marketplace API.
//!
//! Every request is gated by the shared [`RequestGate`], carries the seller
//! token verbatim in `Authorization`, and comes back classified as a
//! [`FetchOutcome`]. Retrying `RateLimited` outcomes is left to the caller.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use reqwest::RequestBuilder;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{FetchError, RequestGate};

/// Classified response of a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 200 with its raw body.
    Ok(String),
    /// 204: the paginated endpoint has nothing more.
    Empty,
    /// 429: the gate has already been told to back off.
    RateLimited,
    /// 404 with a human-readable reason.
    NotFound(String),
    /// Any other status.
    Fatal { status: u16, body: String },
}

/// Marketplace HTTP client sharing one request gate.
#[derive(Clone)]
pub struct FetchClient {
    http: reqwest::Client,
    gate: Arc<dyn RequestGate>,
}

impl FetchClient {
    pub fn new(gate: Arc<dyn RequestGate>, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("seller-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, gate })
    }

    /// GET `url` with the seller token.
    pub async fn fetch(&self, url: &Url, token: &str) -> Result<FetchOutcome, FetchError> {
        let request = self
            .http
            .get(url.clone())
            .header(CONTENT_TYPE, "application/json");
        self.send(request, "GET", url, token).await
    }

    /// POST a JSON body to `url` with the seller token. `json` sets the content type.
    pub async fn post_json(
        &self,
        url: &Url,
        token: &str,
        body: &Value,
    ) -> Result<FetchOutcome, FetchError> {
        self.send(self.http.post(url.clone()).json(body), "POST", url, token)
            .await
    }

    /// Ask an authenticated endpoint whether the token is accepted.
    ///
    /// Only 401 and 403 count as a rejection; anything else is treated as usable.
    pub async fn probe_credential(&self, url: &Url, token: &str) -> Result<bool, FetchError> {
        let accepted = !matches!(
            self.fetch(url, token).await?,
            FetchOutcome::Fatal {
                status: 401 | 403,
                ..
            }
        );
        debug!(accepted, "Credential probe completed");
        Ok(accepted)
    }

    #[instrument(skip(self, request, token), fields(url = %url))]
    async fn send(
        &self,
        request: RequestBuilder,
        method: &'static str,
        url: &Url,
        token: &str,
    ) -> Result<FetchOutcome, FetchError> {
        self.gate.acquire().await;

        let response = request
            .header(AUTHORIZATION, token)
            .send()
            .await
            .map_err(|err| {
                warn!(method, error = %err, "Marketplace request failed before a response");
                FetchError::Transport(err)
            })?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        self.gate.observe(status, retry_after.as_deref()).await;
        counter!("marketplace_requests_total", "status" => status.to_string()).increment(1);

        let body = response.text().await?;
        debug!(method, status, bytes = body.len(), "Marketplace responded");
        Ok(classify(status, body))
    }
}

/// Map a status code and body onto a [`FetchOutcome`].
pub fn classify(status: u16, body: String) -> FetchOutcome {
    match status {
        200 => FetchOutcome::Ok(body),
        204 => FetchOutcome::Empty,
        429 => FetchOutcome::RateLimited,
        404 => FetchOutcome::NotFound(not_found_detail(&body)),
        _ => FetchOutcome::Fatal { status, body },
    }
}

fn not_found_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            ["title", "detail", "message"].iter().find_map(|key| {
                json.get(*key)
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
            })
        })
        .or_else(|| Some(body.trim().to_string()).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| "not found".to_string())
}
