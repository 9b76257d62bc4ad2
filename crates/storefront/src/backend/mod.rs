//! Hosted backend client.
//!
//! # Architecture
//!
//! - The backend is the source of truth: no local sync, direct REST calls
//! - Table reads and writes go to `{BACKEND_URL}/rest/v1/<table>` with
//!   `column=op.value` filters
//! - Sign-in goes through the auth API at `{BACKEND_URL}/auth/v1` (see [`auth`])
//! - Every request carries the publishable key as `apikey`; requests made on
//!   behalf of a signed-in user carry that user's access token as the bearer,
//!   so row-level security applies to them
//!
//! # Example
//!
//! ```rust,ignore
//! use herhouse_storefront::backend::{BackendClient, TableQuery};
//!
//! let client = BackendClient::new(&config.backend)?;
//! let orders: Vec<Order> = client
//!     .select(
//!         &TableQuery::new("orders").eq("customer_id", profile.id).newest_first(),
//!         Some(&access_token),
//!     )
//!     .await?;
//! ```

pub mod auth;
mod query;

pub use auth::{AuthClient, AuthError, AuthTokens, Pkce, generate_random_string};
pub use query::TableQuery;

use std::fmt::Display;
use std::sync::Arc;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use crate::config::BackendConfig;

/// `Accept` value asking for exactly one row instead of an array.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// Error code for "zero rows where exactly one was requested".
const NO_ROWS_CODE: &str = "PGRST116";

/// Error code for a unique constraint violation.
const UNIQUE_VIOLATION_CODE: &str = "23505";

/// Errors that can occur when talking to the hosted backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The requested row does not exist (or is hidden by row-level security).
    #[error("Not found: {0}")]
    NotFound(String),

    /// A write violated a uniqueness constraint.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The access token was rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other error reported by the backend.
    #[error("Backend error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },
}

impl BackendError {
    /// Whether this error means "no such row".
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether this error is a duplicate-key rejection.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Error body returned by the REST API.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

impl ApiErrorBody {
    fn describe(&self) -> String {
        [&self.message, &self.details, &self.hint]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .cloned()
            .collect::<Vec<_>>()
            .join(" - ")
    }
}

/// Classify a non-success response.
fn classify_error(status: reqwest::StatusCode, body: &str) -> BackendError {
    let parsed: ApiErrorBody = serde_json::from_str(body).unwrap_or_default();
    let mut message = parsed.describe();
    if message.is_empty() {
        message = body.chars().take(200).collect();
    }

    match (status.as_u16(), parsed.code.as_deref()) {
        (_, Some(NO_ROWS_CODE)) | (404 | 406, _) => BackendError::NotFound(message),
        (_, Some(UNIQUE_VIOLATION_CODE)) | (409, _) => BackendError::Conflict(message),
        (401 | 403, _) => BackendError::Unauthorized(message),
        (status, code) => BackendError::Api {
            status,
            code: code.map(str::to_string),
            message,
        },
    }
}

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the backend's table API.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    rest_url: Url,
    anon_key: String,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the REST base URL cannot be derived from the
    /// configured backend URL.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client: reqwest::Client::new(),
                rest_url: api_base(&config.url, "rest/v1/")?,
                anon_key: config.anon_key.expose_secret().to_string(),
            }),
        })
    }

    /// Headers every request carries. `token` is the signed-in user's access
    /// token; anonymous requests authenticate with the publishable key.
    fn headers(&self, token: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let bearer = token.unwrap_or(&self.inner.anon_key);
        if let Ok(value) = HeaderValue::from_str(&self.inner.anon_key) {
            headers.insert("apikey", value);
        }
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {bearer}")) {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    /// Send a request and decode the JSON body.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        // Read as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            let error = classify_error(status, &body);
            if !error.is_not_found() {
                tracing::warn!(
                    status = %status,
                    body = %body.chars().take(500).collect::<String>(),
                    "Backend returned non-success status"
                );
            }
            return Err(error);
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    /// Fetch every row matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the rows cannot be decoded.
    #[instrument(skip(self, query, token), fields(table = query.table()))]
    pub async fn select<T: DeserializeOwned>(
        &self,
        query: &TableQuery,
        token: Option<&str>,
    ) -> Result<Vec<T>, BackendError> {
        let url = query.url(&self.inner.rest_url)?;
        let request = self.inner.client.get(url).headers(self.headers(token));
        self.execute(request).await
    }

    /// Fetch exactly one row matching `query`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] when no row matches.
    #[instrument(skip(self, query, token), fields(table = query.table()))]
    pub async fn select_single<T: DeserializeOwned>(
        &self,
        query: &TableQuery,
        token: Option<&str>,
    ) -> Result<T, BackendError> {
        let url = query.url(&self.inner.rest_url)?;
        let request = self
            .inner
            .client
            .get(url)
            .headers(self.headers(token))
            .header(ACCEPT, SINGLE_OBJECT);
        self.execute(request).await
    }

    /// Insert one row and return it as persisted.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Conflict`] when the row violates a uniqueness
    /// constraint.
    #[instrument(skip(self, row, token))]
    pub async fn insert<T, B>(
        &self,
        table: &'static str,
        row: &B,
        token: Option<&str>,
    ) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let url = self.inner.rest_url.join(table)?;
        let request = self
            .inner
            .client
            .post(url)
            .headers(self.headers(token))
            .header(ACCEPT, SINGLE_OBJECT)
            .header("Prefer", "return=representation")
            .json(row);
        self.execute(request).await
    }

    /// Patch the row with `id` and return it as persisted.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] when no row with `id` is visible to
    /// the caller.
    #[instrument(skip(self, id, changes, token), fields(id = %id))]
    pub async fn update<T, B>(
        &self,
        table: &'static str,
        id: impl Display + Send,
        changes: &B,
        token: Option<&str>,
    ) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let url = TableQuery::new(table).eq("id", id).url(&self.inner.rest_url)?;
        let request = self
            .inner
            .client
            .patch(url)
            .headers(self.headers(token))
            .header(ACCEPT, SINGLE_OBJECT)
            .header("Prefer", "return=representation")
            .json(changes);
        self.execute(request).await
    }

    /// Cheap reachability probe used by the readiness check.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    pub async fn ping(&self) -> Result<(), BackendError> {
        let response = self
            .inner
            .client
            .get(self.inner.rest_url.clone())
            .headers(self.headers(None))
            .send()
            .await?;
        if response.status().is_server_error() {
            return Err(BackendError::Api {
                status: response.status().as_u16(),
                code: None,
                message: "backend unavailable".to_string(),
            });
        }
        Ok(())
    }
}

/// Join an API prefix onto the backend URL, tolerating a missing trailing
/// slash on the configured URL.
pub(crate) fn api_base(backend_url: &Url, prefix: &str) -> Result<Url, url::ParseError> {
    let mut base = backend_url.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(prefix)
}
