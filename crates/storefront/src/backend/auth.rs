//! Backend auth API client.
//!
//! Sign-in uses OAuth 2.0 with PKCE through the backend's auth API, which
//! fronts the configured provider (Google by default).
//!
//! # OAuth Flow
//!
//! 1. Generate a [`Pkce`] pair and keep the verifier in the session
//! 2. Redirect to [`AuthClient::authorize_url`]
//! 3. The provider signs the user in and the backend redirects back with `code`
//! 4. Exchange the code and verifier with [`AuthClient::exchange_code`]
//! 5. Use the access token for user-scoped table calls; refresh it with
//!    [`AuthClient::refresh`] once it expires

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use herhouse_core::{Email, Identity, IdentityId};
use rand::Rng;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::instrument;
use url::Url;

use super::api_base;
use crate::config::BackendConfig;

/// Seconds before expiry at which an access token is treated as expired.
const EXPIRY_LEEWAY_SECONDS: i64 = 60;

/// Length of a generated PKCE verifier (RFC 7636 allows 43 to 128).
const VERIFIER_LENGTH: usize = 64;

/// Errors that can occur during sign-in, refresh or sign-out.
#[derive(Debug, Error)]
pub enum AuthError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Auth endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// The auth API rejected the request.
    #[error("Auth API rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The callback did not match the sign-in this session started.
    #[error("Invalid sign-in state")]
    InvalidState,

    /// No PKCE verifier was stored for this session.
    #[error("Sign-in session expired")]
    MissingVerifier,
}

// =============================================================================
// PKCE
// =============================================================================

/// A PKCE verifier and its S256 challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pkce {
    pub verifier: String,
    pub challenge: String,
}

impl Pkce {
    /// Generate a fresh verifier.
    #[must_use]
    pub fn generate() -> Self {
        Self::from_verifier(generate_random_string(VERIFIER_LENGTH))
    }

    /// Derive the S256 challenge for an existing verifier.
    #[must_use]
    pub fn from_verifier(verifier: String) -> Self {
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
        }
    }
}

/// Generate a cryptographically secure random string.
#[must_use]
pub fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";
    let mut rng = rand::rng();
    (0..length)
        .filter_map(|_| CHARSET.get(rng.random_range(0..CHARSET.len())))
        .map(|&byte| char::from(byte))
        .collect()
}

// =============================================================================
// Tokens and users
// =============================================================================

/// Access and refresh tokens for a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Token lifetime in seconds.
    pub expires_in: Option<i64>,
    /// Unix timestamp when the token was obtained.
    pub obtained_at: i64,
}

impl AuthTokens {
    /// Check if the access token is expired (with 60s buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at().is_some_and(|expires_at| {
            chrono::Utc::now().timestamp() >= expires_at - EXPIRY_LEEWAY_SECONDS
        })
    }

    fn expires_at(&self) -> Option<i64> {
        self.expires_in.map(|expires_in| self.obtained_at + expires_in)
    }
}

/// A user as reported by the auth API.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: IdentityId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

/// Provider-supplied profile data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
}

impl From<AuthUser> for Identity {
    fn from(user: AuthUser) -> Self {
        // Unparseable addresses are dropped
        let email = user.email.as_deref().and_then(|raw| Email::parse(raw).ok());
        Self {
            id: user.id,
            email,
            display_name: user.user_metadata.full_name,
        }
    }
}

/// A completed sign-in or refresh.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub tokens: AuthTokens,
    pub identity: Identity,
}

/// Raw token response from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    user: AuthUser,
}

impl From<TokenResponse> for AuthSession {
    fn from(response: TokenResponse) -> Self {
        Self {
            tokens: AuthTokens {
                access_token: response.access_token,
                refresh_token: response.refresh_token,
                expires_in: response.expires_in,
                obtained_at: chrono::Utc::now().timestamp(),
            },
            identity: response.user.into(),
        }
    }
}

#[derive(Serialize)]
struct PkceGrant<'a> {
    auth_code: &'a str,
    code_verifier: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

// =============================================================================
// AuthClient
// =============================================================================

/// Client for the backend's auth API.
#[derive(Clone)]
pub struct AuthClient {
    inner: Arc<AuthClientInner>,
}

struct AuthClientInner {
    client: reqwest::Client,
    auth_url: Url,
    anon_key: String,
}

impl AuthClient {
    /// Create a new auth API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the auth base URL cannot be derived from the
    /// configured backend URL.
    pub fn new(config: &BackendConfig) -> Result<Self, AuthError> {
        Ok(Self {
            inner: Arc::new(AuthClientInner {
                client: reqwest::Client::new(),
                auth_url: api_base(&config.url, "auth/v1/")?,
                anon_key: config.anon_key.expose_secret().to_string(),
            }),
        })
    }

    fn headers(&self, token: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&self.inner.anon_key) {
            headers.insert("apikey", value);
        }
        if let Some(token) = token
            && let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}"))
        {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    /// Build the URL that starts sign-in with `provider`.
    ///
    /// # Errors
    ///
    /// Returns an error if the authorize endpoint URL cannot be built.
    pub fn authorize_url(
        &self,
        provider: &str,
        redirect_to: &str,
        pkce: &Pkce,
    ) -> Result<Url, AuthError> {
        let mut url = self.inner.auth_url.join("authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", &pkce.challenge)
            .append_pair("code_challenge_method", "s256");
        Ok(url)
    }

    async fn token_request<B: Serialize + Sync>(
        &self,
        grant_type: &str,
        body: &B,
    ) -> Result<AuthSession, AuthError> {
        let mut url = self.inner.auth_url.join("token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let response = self
            .inner
            .client
            .post(url)
            .headers(self.headers(None))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected { status, message });
        }

        let token: TokenResponse = response.json().await?;
        Ok(token.into())
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns an error if the code or verifier is rejected.
    #[instrument(skip_all)]
    pub async fn exchange_code(&self, code: &str, verifier: &str) -> Result<AuthSession, AuthError> {
        self.token_request(
            "pkce",
            &PkceGrant {
                auth_code: code,
                code_verifier: verifier,
            },
        )
        .await
    }

    /// Obtain fresh tokens with a refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh token is rejected.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        self.token_request("refresh_token", &RefreshGrant { refresh_token })
            .await
    }

    /// Revoke the session behind an access token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails. An already-expired token is
    /// not an error.
    #[instrument(skip_all)]
    pub async fn logout(&self, access_token: &str) -> Result<(), AuthError> {
        let url = self.inner.auth_url.join("logout")?;
        let response = self
            .inner
            .client
            .post(url)
            .headers(self.headers(Some(access_token)))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(AuthError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn client() -> AuthClient {
        AuthClient::new(&BackendConfig {
            url: Url::parse("https://abcd.backend.example").unwrap(),
            anon_key: SecretString::from("anon"),
        })
        .unwrap()
    }

    #[test]
    fn test_pkce_challenge_matches_rfc_7636_example() {
        // RFC 7636 appendix B
        let pkce = Pkce::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_string());
        assert_eq!(pkce.challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn test_generated_verifier_is_unreserved() {
        let pkce = Pkce::generate();
        assert_eq!(pkce.verifier.len(), VERIFIER_LENGTH);
        assert!(
            pkce.verifier
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "-._~".contains(c))
        );
        assert_ne!(Pkce::generate().verifier, pkce.verifier);
    }

    #[test]
    fn test_authorize_url() {
        let pkce = Pkce::from_verifier("verifier".to_string());
        let url = client()
            .authorize_url("google", "http://localhost:3000/auth/callback?state=abc", &pkce)
            .unwrap();

        assert_eq!(url.path(), "/auth/v1/authorize");
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["provider"], "google");
        assert_eq!(pairs["redirect_to"], "http://localhost:3000/auth/callback?state=abc");
        assert_eq!(pairs["code_challenge"], pkce.challenge);
        assert_eq!(pairs["code_challenge_method"], "s256");
    }

    #[test]
    fn test_token_expiry() {
        let now = chrono::Utc::now().timestamp();
        let fresh = AuthTokens {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_in: Some(3600),
            obtained_at: now,
        };
        assert!(!fresh.is_expired());

        let stale = AuthTokens {
            obtained_at: now - 3590,
            ..fresh.clone()
        };
        assert!(stale.is_expired());

        let unbounded = AuthTokens {
            expires_in: None,
            ..fresh
        };
        assert!(!unbounded.is_expired());
    }

    #[test]
    fn test_auth_user_into_identity() {
        let user: AuthUser = serde_json::from_value(serde_json::json!({
            "id": "7d1c1b52-6f6a-4d55-9d0e-1f0c3a1f9b11",
            "email": "ayesha@example.pk",
            "user_metadata": { "full_name": "Ayesha Khan", "avatar_url": "https://x/y.png" }
        }))
        .unwrap();
        let identity = Identity::from(user);
        assert_eq!(identity.email.unwrap().as_str(), "ayesha@example.pk");
        assert_eq!(identity.display_name.as_deref(), Some("Ayesha Khan"));

        let bare: AuthUser = serde_json::from_value(serde_json::json!({
            "id": "7d1c1b52-6f6a-4d55-9d0e-1f0c3a1f9b11",
            "email": ""
        }))
        .unwrap();
        let identity = Identity::from(bare);
        assert!(identity.email.is_none());
        assert_eq!(identity.default_full_name(), "");
    }
}
