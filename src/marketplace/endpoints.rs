//! Marketplace endpoint catalogue and report API versions.

use std::fmt;

use chrono::NaiveDate;
use url::Url;

use super::FetchError;
use crate::config::MarketplaceConfig;

/// Report format served for a window, chosen by the window's start date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiVersion {
    /// `v1` report, used before the cutover date.
    Legacy,
    /// `v5` report, used from the cutover date onwards.
    Current,
}

impl ApiVersion {
    pub fn for_start(start: NaiveDate, cutover: NaiveDate) -> Self {
        if start < cutover {
            ApiVersion::Legacy
        } else {
            ApiVersion::Current
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ApiVersion::Legacy => "old",
            ApiVersion::Current => "new",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed endpoint URLs.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub report_v1: Url,
    pub report_v5: Url,
    pub cards: Url,
    pub passes: Url,
}

impl Endpoints {
    pub fn from_config(config: &MarketplaceConfig) -> Result<Self, FetchError> {
        Ok(Self {
            report_v1: Url::parse(&config.report_v1_url)?,
            report_v5: Url::parse(&config.report_v5_url)?,
            cards: Url::parse(&config.cards_url)?,
            passes: Url::parse(&config.passes_url)?,
        })
    }

    pub fn report(&self, api: ApiVersion) -> &Url {
        match api {
            ApiVersion::Legacy => &self.report_v1,
            ApiVersion::Current => &self.report_v5,
        }
    }
}
