//! `reqwest`-backed fetcher

use reqwest::{Client, Url};
use tracing::debug;

use crate::assets::{FetchFuture, Fetcher};
use crate::error::FetchError;

/// Fetches assets and data over HTTP
///
/// Relative URLs such as `/mitm-proxy/admin-ui.json` resolve against the
/// base URL given at construction.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    base: Url,
}

impl HttpFetcher {
    pub fn new(base: &str) -> Result<Self, FetchError> {
        let base = Url::parse(base).map_err(|error| FetchError::Request {
            url: base.to_string(),
            reason: error.to_string(),
        })?;
        Ok(Self {
            client: Client::new(),
            base,
        })
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn resolve(&self, url: &str) -> Result<Url, FetchError> {
        self.base.join(url).map_err(|error| FetchError::Request {
            url: url.to_string(),
            reason: error.to_string(),
        })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_text<'a>(&'a self, url: &'a str) -> FetchFuture<'a, String> {
        Box::pin(async move {
            let target = self.resolve(url)?;
            debug!(url = %target, "GET");
            let request_error = |error: reqwest::Error| FetchError::Request {
                url: url.to_string(),
                reason: error.to_string(),
            };

            let response = self.client.get(target).send().await.map_err(request_error)?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    reason: status.canonical_reason().unwrap_or_default().to_string(),
                });
            }
            response.text().await.map_err(request_error)
        })
    }
}
