//! Page-by-page retrieval of report windows and the card catalogue.

use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::MarketplaceConfig;
use crate::marketplace::{Endpoints, FetchClient, FetchError, FetchOutcome};
use crate::planner::Window;

/// Records accumulated across the pages of one window or catalogue walk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSet {
    pub records: Vec<Value>,
    /// Non-empty pages received.
    pub pages: u32,
    /// True when the page ceiling stopped the walk before the upstream did.
    pub exhausted: bool,
}

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("{endpoint} not found: {detail}")]
    NotFound { endpoint: String, detail: String },

    #[error("{endpoint} answered with status {status}: {body}")]
    Fatal {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("still rate limited after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },

    #[error(transparent)]
    Transport(#[from] FetchError),

    #[error("malformed page from {endpoint}: {reason}")]
    MalformedPage { endpoint: String, reason: String },
}

impl PaginationError {
    /// Whether a later attempt of the same job might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            PaginationError::RateLimitExhausted { .. } => true,
            PaginationError::Transport(FetchError::Transport(_)) => true,
            PaginationError::Transport(FetchError::InvalidUrl(_))
            | PaginationError::NotFound { .. }
            | PaginationError::Fatal { .. }
            | PaginationError::MalformedPage { .. } => false,
        }
    }
}

#[derive(Clone, Copy)]
enum PageRequest<'a> {
    Get(&'a Url),
    Post(&'a Url, &'a Value),
}

impl PageRequest<'_> {
    fn url(&self) -> &Url {
        match self {
            PageRequest::Get(url) | PageRequest::Post(url, _) => url,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct CardPage {
    #[serde(default)]
    cards: Vec<Value>,
    #[serde(default)]
    cursor: CardCursor,
}

#[derive(Debug, Default, Deserialize)]
struct CardCursor {
    #[serde(rename = "updatedAt")]
    updated_at: Option<Value>,
    #[serde(rename = "nmID")]
    nm_id: Option<Value>,
    total: Option<u64>,
}

/// Walks paginated marketplace endpoints through a shared [`FetchClient`].
#[derive(Clone)]
pub struct Paginator {
    client: FetchClient,
    endpoints: Endpoints,
    config: MarketplaceConfig,
}

impl Paginator {
    pub fn new(client: FetchClient, endpoints: Endpoints, config: MarketplaceConfig) -> Self {
        Self {
            client,
            endpoints,
            config,
        }
    }

    pub fn client(&self) -> &FetchClient {
        &self.client
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Fetch every page of a report window, following the `rrd_id` cursor.
    #[instrument(skip(self, token), fields(from = %window.from, to = %window.to, api = %window.api))]
    pub async fn fetch_report_window(
        &self,
        token: &str,
        window: &Window,
    ) -> Result<PageSet, PaginationError> {
        let base = self.endpoints.report(window.api);
        let mut set = PageSet::default();
        let mut rrdid: i64 = 0;

        loop {
            if set.pages >= self.config.max_pages {
                warn!(
                    max_pages = self.config.max_pages,
                    records = set.records.len(),
                    "Report page limit reached; returning accumulated records"
                );
                set.exhausted = true;
                break;
            }
            if set.pages > 0 {
                sleep(self.config.page_pause()).await;
            }

            let url = report_page_url(base, window, rrdid, self.config.report_page_limit);
            let Some(body) = self.send_with_retry(token, PageRequest::Get(&url)).await? else {
                break;
            };
            let page = parse_array(&url, &body)?;
            if page.is_empty() {
                break;
            }

            set.pages += 1;
            let next = page.last().and_then(|last| last.get("rrd_id")).and_then(cursor_value);
            set.records.extend(page);
            debug!(
                page = set.pages,
                records = set.records.len(),
                next_rrdid = ?next,
                "Report page received"
            );

            match next {
                Some(cursor) => rrdid = cursor,
                None => break,
            }
        }

        Ok(set)
    }

    /// Fetch the whole card catalogue, following the compound `updatedAt`/`nmID` cursor.
    #[instrument(skip_all)]
    pub async fn fetch_cards(&self, token: &str) -> Result<PageSet, PaginationError> {
        let limit = self.config.card_page_limit;
        let mut set = PageSet::default();
        let mut cursor: Option<(Value, Value)> = None;

        loop {
            if set.pages >= self.config.max_pages {
                warn!(
                    max_pages = self.config.max_pages,
                    cards = set.records.len(),
                    "Card page limit reached; returning accumulated cards"
                );
                set.exhausted = true;
                break;
            }
            if set.pages > 0 {
                sleep(self.config.card_page_pause()).await;
            }

            let body = card_request_body(limit, cursor.as_ref());
            let url = &self.endpoints.cards;
            let Some(raw) = self
                .send_with_retry(token, PageRequest::Post(url, &body))
                .await?
            else {
                break;
            };
            let page: CardPage =
                serde_json::from_str(&raw).map_err(|err| PaginationError::MalformedPage {
                    endpoint: url.path().to_string(),
                    reason: err.to_string(),
                })?;

            let received = page.cards.len() as u64;
            if received > 0 {
                set.pages += 1;
            }
            set.records.extend(page.cards);
            debug!(
                page = set.pages,
                received,
                total = ?page.cursor.total,
                "Card page received"
            );

            if received < limit || page.cursor.total.unwrap_or(0) < limit {
                break;
            }
            match (page.cursor.updated_at, page.cursor.nm_id) {
                (Some(updated_at), Some(nm_id)) => cursor = Some((updated_at, nm_id)),
                _ => break,
            }
        }

        Ok(set)
    }

    /// Send one page request, retrying while the marketplace answers 429.
    ///
    /// `Ok(None)` means the endpoint signalled there is nothing more (204).
    async fn send_with_retry(
        &self,
        token: &str,
        request: PageRequest<'_>,
    ) -> Result<Option<String>, PaginationError> {
        let attempts = self.config.max_attempts.max(1);
        let endpoint = || request.url().path().to_string();

        for attempt in 1..=attempts {
            let outcome = match &request {
                PageRequest::Get(url) => self.client.fetch(url, token).await?,
                PageRequest::Post(url, body) => self.client.post_json(url, token, body).await?,
            };

            match outcome {
                FetchOutcome::Ok(body) => return Ok(Some(body)),
                FetchOutcome::Empty => return Ok(None),
                FetchOutcome::RateLimited => {
                    warn!(attempt, attempts, endpoint = %endpoint(), "Rate limited, retrying");
                }
                FetchOutcome::NotFound(detail) => {
                    return Err(PaginationError::NotFound {
                        endpoint: endpoint(),
                        detail,
                    });
                }
                FetchOutcome::Fatal { status, body } => {
                    return Err(PaginationError::Fatal {
                        endpoint: endpoint(),
                        status,
                        body,
                    });
                }
            }
        }

        Err(PaginationError::RateLimitExhausted { attempts })
    }
}

fn report_page_url(base: &Url, window: &Window, rrdid: i64, limit: u64) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut()
        .append_pair("dateFrom", &window.from.format("%Y-%m-%d").to_string())
        .append_pair("dateTo", &window.to.format("%Y-%m-%d").to_string())
        .append_pair("rrdid", &rrdid.to_string())
        .append_pair("limit", &limit.to_string());
    url
}

fn card_request_body(limit: u64, cursor: Option<&(Value, Value)>) -> Value {
    let mut page_cursor = json!({ "limit": limit });
    if let Some((updated_at, nm_id)) = cursor {
        page_cursor["updatedAt"] = updated_at.clone();
        page_cursor["nmID"] = nm_id.clone();
    }
    json!({
        "settings": {
            "cursor": page_cursor,
            "filter": { "withPhoto": -1 }
        }
    })
}

fn parse_array(url: &Url, body: &str) -> Result<Vec<Value>, PaginationError> {
    let malformed = |reason: String| PaginationError::MalformedPage {
        endpoint: url.path().to_string(),
        reason,
    };
    match serde_json::from_str::<Value>(body).map_err(|err| malformed(err.to_string()))? {
        Value::Array(items) => Ok(items),
        other => Err(malformed(format!(
            "expected a JSON array, got {}",
            crate::normalization::json_type_name(&other)
        ))),
    }
}

fn cursor_value(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
}
