//! REST JSON database client storing assessments under `avaliacoes/<key>`.
//!
//! The database exposes every path as `<base>/<path>.json`: `GET` returns the
//! document or JSON `null`, `PUT` replaces it wholesale, and
//! `GET ...?shallow=true` on a parent returns `{child_key: true, ...}`.

use async_trait::async_trait;
use pntp_core::AssessmentRecord;
use pntp_store::{
    AssessmentStore, SaveReceipt, StoreError, check_key, decode_record, encode_record,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

/// Root path of all assessment records in the remote database.
pub const RECORDS_ROOT: &str = "avaliacoes";

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("invalid remote URL: {0}")]
    InvalidUrl(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<SyncError> for StoreError {
    fn from(err: SyncError) -> Self {
        StoreError::Remote(Box::new(err))
    }
}

/// Remote backend of [`AssessmentStore`].
pub struct RemoteStore {
    client: reqwest::Client,
    base_url: Url,
    auth: Option<String>,
}

impl RemoteStore {
    /// Create a store for the database at `base_url`, e.g.
    /// `https://example-project.firebaseio.com`. A trailing slash is ignored.
    ///
    /// `auth` is sent as the `auth` query parameter on every request.
    pub fn new(base_url: &str, auth: Option<String>) -> Result<Self, SyncError> {
        Self::with_client(reqwest::Client::new(), base_url, auth)
    }

    /// Like [`new`](Self::new) with a preconfigured HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        auth: Option<String>,
    ) -> Result<Self, SyncError> {
        let trimmed = base_url.trim_end_matches('/');
        let base_url =
            Url::parse(trimmed).map_err(|e| SyncError::InvalidUrl(format!("{trimmed}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(SyncError::InvalidUrl(trimmed.to_string()));
        }
        Ok(Self {
            client,
            base_url,
            auth: auth.filter(|t| !t.is_empty()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `<base>/avaliacoes/<key>.json`, key percent-encoded as one path segment.
    pub fn record_url(&self, key: &str) -> Result<Url, SyncError> {
        self.url_for(&[RECORDS_ROOT, &format!("{key}.json")])
    }

    fn index_url(&self) -> Result<Url, SyncError> {
        let mut url = self.url_for(&[&format!("{RECORDS_ROOT}.json")])?;
        url.query_pairs_mut().append_pair("shallow", "true");
        Ok(url)
    }

    fn url_for(&self, segments: &[&str]) -> Result<Url, SyncError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, mut url: Url) -> Url {
        if let Some(token) = &self.auth {
            url.query_pairs_mut().append_pair("auth", token);
        }
        url
    }

    /// Fetch a document body, treating 404 like an explicit `null`.
    async fn get_document(&self, url: Url) -> Result<Option<String>, SyncError> {
        let resp = self.client.get(self.authorized(url)).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = expect_success(resp).await?.text().await?;
        if body.trim() == "null" {
            return Ok(None);
        }
        Ok(Some(body))
    }

    async fn put_document(&self, url: Url, body: String) -> Result<(), SyncError> {
        let resp = self
            .client
            .put(self.authorized(url))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        expect_success(resp).await?;
        Ok(())
    }
}

async fn expect_success(resp: reqwest::Response) -> Result<reqwest::Response, SyncError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SyncError::Server {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

#[async_trait]
impl AssessmentStore for RemoteStore {
    async fn save(&self, record: &AssessmentRecord) -> Result<SaveReceipt, StoreError> {
        record.validate()?;
        let key = record.key();
        let url = self.record_url(&key)?;
        let body = encode_record(record)?;

        info!(key = %key, base = %self.base_url, "pushing assessment to remote store");
        self.put_document(url.clone(), body).await?;

        Ok(SaveReceipt {
            key,
            location: url.to_string(),
        })
    }

    async fn load_key(&self, key: &str) -> Result<Option<AssessmentRecord>, StoreError> {
        check_key(key)?;
        let url = self.record_url(key)?;
        debug!(key = %key, base = %self.base_url, "pulling assessment from remote store");
        match self.get_document(url).await? {
            Some(raw) => decode_record(key, &raw).map(Some),
            None => {
                debug!(key = %key, "no remote assessment");
                Ok(None)
            }
        }
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let url = self.index_url()?;
        let Some(raw) = self.get_document(url).await? else {
            return Ok(Vec::new());
        };
        let index: Map<String, Value> = serde_json::from_str(&raw).map_err(SyncError::from)?;
        let mut keys: Vec<String> = index.into_iter().map(|(k, _)| k).collect();
        keys.sort();
        info!(count = keys.len(), "listed remote assessments");
        Ok(keys)
    }
}
