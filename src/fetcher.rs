//! Cursor-paginated retrieval of option snapshots.
//!
//! Pages are requested one at a time, only when the consumer asks for the
//! next one. Every request carries the credential twice: as the `apiKey`
//! query parameter and as a bearer token. Cursor URLs returned by the
//! provider are re-keyed before use, since some omit the credential.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Url;

use crate::config::{self, ClientConfig};
use crate::error::{Result, ScanError};
use crate::models::{DteWindow, OptionType, SnapshotPage, SnapshotRecord};

// ---------------------------------------------------------------------------
// Transport seam
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub url: Url,
    pub bearer: String,
}

#[derive(Debug, Clone)]
pub struct PageResponse {
    pub status: u16,
    pub body: String,
}

/// Issues a single page request. Network-level failures are returned as
/// errors; HTTP status handling is left to the fetcher.
pub trait PageTransport {
    fn send(&self, request: &PageRequest) -> Result<PageResponse>;
}

/// Blocking reqwest transport with a fixed per-request timeout.
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self { client })
    }
}

impl PageTransport for HttpTransport {
    fn send(&self, request: &PageRequest) -> Result<PageResponse> {
        let resp = self
            .client
            .get(request.url.clone())
            .bearer_auth(&request.bearer)
            .send()
            .map_err(strip_url)?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(strip_url)?;
        Ok(PageResponse { status, body })
    }
}

/// reqwest renders the request URL, credential included, into its errors.
fn strip_url(e: reqwest::Error) -> ScanError {
    ScanError::Http(e.without_url())
}

// ---------------------------------------------------------------------------
// ChainFetcher
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ChainFetcher<T: PageTransport = HttpTransport> {
    config: ClientConfig,
    transport: T,
}

impl ChainFetcher<HttpTransport> {
    /// Fetcher over HTTP using the config's timeout.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.timeout)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: PageTransport> ChainFetcher<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// First page URL, with the expiration window pushed to the provider.
    pub fn first_page_url(
        &self,
        ticker: &str,
        option_type: OptionType,
        window: &DteWindow,
    ) -> Result<Url> {
        let mut url = self.config.snapshot_url(ticker)?;
        url.query_pairs_mut()
            .append_pair("contract_type", option_type.as_str())
            .append_pair("expiration_date.gte", &window.first_date().to_string())
            .append_pair("expiration_date.lte", &window.last_date().to_string())
            .append_pair("limit", &self.config.page_limit.to_string())
            .append_pair(config::API_KEY_PARAM, &self.config.api_key);
        Ok(url)
    }

    /// Parse a cursor URL and set its credential parameter, replacing any
    /// existing one.
    pub fn with_credential(&self, cursor: &str) -> Result<Url> {
        let mut url = Url::parse(cursor).map_err(|e| ScanError::InvalidUrl(e.to_string()))?;
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != config::API_KEY_PARAM)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair(config::API_KEY_PARAM, &self.config.api_key);
        Ok(url)
    }

    /// Lazy page stream for one contract kind across `window`.
    pub fn pages(
        &self,
        ticker: &str,
        option_type: OptionType,
        window: &DteWindow,
    ) -> ChainPages<'_, T> {
        let (next, pending_error) = match self.first_page_url(ticker, option_type, window) {
            Ok(url) => (Some(url), None),
            Err(e) => (None, Some(e)),
        };
        ChainPages {
            fetcher: self,
            next,
            pending_error,
            seen: HashSet::new(),
            fetched: 0,
        }
    }

    /// Lazy record stream, flattening [`pages`](Self::pages).
    pub fn records(
        &self,
        ticker: &str,
        option_type: OptionType,
        window: &DteWindow,
    ) -> ChainRecords<'_, T> {
        ChainRecords {
            pages: self.pages(ticker, option_type, window),
            current: Vec::new().into_iter(),
        }
    }

    fn fetch_page(&self, url: &Url) -> Result<(Vec<Result<SnapshotRecord>>, Option<String>)> {
        let request = PageRequest {
            url: url.clone(),
            bearer: self.config.api_key.clone(),
        };
        let response = self.transport.send(&request)?;

        match response.status {
            401 | 403 => {
                let message: String = response.body.chars().take(200).collect();
                tracing::error!(
                    status = response.status,
                    "provider rejected the credential; check the key and plan"
                );
                return Err(ScanError::Auth {
                    status: response.status,
                    message,
                });
            }
            200..=299 => {}
            status => {
                return Err(ScanError::Status {
                    status,
                    url: redact(url),
                });
            }
        }

        let page: SnapshotPage = serde_json::from_str(&response.body)?;
        let records = page
            .results
            .into_iter()
            .map(|value| {
                serde_json::from_value::<SnapshotRecord>(value)
                    .map_err(|e| ScanError::Parse(format!("snapshot record: {}", e)))
            })
            .collect();
        Ok((records, page.next_url.filter(|u| !u.trim().is_empty())))
    }
}

/// URL with the credential parameter masked, for logs and errors.
pub fn redact(url: &Url) -> String {
    let mut masked = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            if k == config::API_KEY_PARAM {
                (k.into_owned(), "***".to_string())
            } else {
                (k.into_owned(), v.into_owned())
            }
        })
        .collect();
    if !pairs.is_empty() {
        masked.query_pairs_mut().clear().extend_pairs(pairs);
    }
    masked.to_string()
}

// ---------------------------------------------------------------------------
// ChainPages
// ---------------------------------------------------------------------------

/// One fetched page. `index` is 1-based.
#[derive(Debug)]
pub struct FetchedPage {
    pub index: usize,
    pub records: Vec<Result<SnapshotRecord>>,
}

/// Iterator over snapshot pages. A failed page ends the stream, since the
/// cursor to the following page is lost with it.
pub struct ChainPages<'a, T: PageTransport> {
    fetcher: &'a ChainFetcher<T>,
    next: Option<Url>,
    pending_error: Option<ScanError>,
    seen: HashSet<String>,
    fetched: usize,
}

impl<T: PageTransport> ChainPages<'_, T> {
    /// Number of page requests issued so far.
    pub fn requests_issued(&self) -> usize {
        self.fetched
    }
}

impl<T: PageTransport> Iterator for ChainPages<'_, T> {
    type Item = Result<FetchedPage>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(err) = self.pending_error.take() {
            return Some(Err(err));
        }
        let url = self.next.take()?;
        self.seen.insert(url.to_string());
        self.fetched += 1;
        let index = self.fetched;

        let (records, cursor) = match self.fetcher.fetch_page(&url) {
            Ok(page) => page,
            Err(e) => {
                tracing::debug!(page = index, error = %e, "snapshot page failed");
                return Some(Err(e));
            }
        };
        tracing::debug!(page = index, records = records.len(), "fetched snapshot page");

        if let Some(cursor) = cursor {
            match self.fetcher.with_credential(&cursor) {
                Ok(next) if self.seen.contains(next.as_str()) => {
                    tracing::warn!(page = index, "cursor repeats an earlier page; stopping");
                }
                Ok(next) => self.next = Some(next),
                Err(e) => self.pending_error = Some(e),
            }
        }

        Some(Ok(FetchedPage { index, records }))
    }
}

// ---------------------------------------------------------------------------
// ChainRecords
// ---------------------------------------------------------------------------

/// Record-by-record view over [`ChainPages`]. Page failures surface as a
/// single error item.
pub struct ChainRecords<'a, T: PageTransport> {
    pages: ChainPages<'a, T>,
    current: std::vec::IntoIter<Result<SnapshotRecord>>,
}

impl<T: PageTransport> Iterator for ChainRecords<'_, T> {
    type Item = Result<SnapshotRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.current.next() {
                return Some(item);
            }
            match self.pages.next()? {
                Ok(page) => self.current = page.records.into_iter(),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
