//! Service-account credentials and OAuth2 access tokens for Cloud Storage.
//!
//! Tokens are obtained with the JWT-bearer grant and cached until shortly
//! before they expire, so a warm Lambda container reuses one token across
//! invocations.

use std::fmt;

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::error::UploadError;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
pub const STORAGE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The subset of a Google service-account key file this crate needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CredentialsError {
    #[error("credentials are not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("credentials are not a valid service account key: {0}")]
    Json(#[from] serde_json::Error),
}

impl ServiceAccountKey {
    /// Decodes a base64-encoded JSON key file, as supplied through the environment.
    pub fn from_base64(encoded: &str) -> Result<Self, CredentialsError> {
        let raw = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub(crate) fn new(key: &ServiceAccountKey, now: DateTime<Utc>) -> Self {
        let iat = now.timestamp();
        Self {
            iss: key.client_email.clone(),
            scope: STORAGE_SCOPE.to_string(),
            aud: key.token_uri.clone(),
            iat,
            exp: iat + TOKEN_LIFETIME_SECS,
        }
    }
}

/// Signs the JWT assertion exchanged for an access token.
pub(crate) fn sign_assertion(
    key: &ServiceAccountKey,
    now: DateTime<Utc>,
) -> Result<String, UploadError> {
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| UploadError::Credentials(format!("unusable private key: {e}")))?;
    encode(
        &Header::new(Algorithm::RS256),
        &Claims::new(key, now),
        &encoding_key,
    )
    .map_err(|e| UploadError::Credentials(format!("failed to sign assertion: {e}")))
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    TOKEN_LIFETIME_SECS
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Hands out bearer tokens for the configured service account.
pub struct TokenSource {
    client: reqwest::Client,
    key: ServiceAccountKey,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    pub fn new(client: reqwest::Client, key: ServiceAccountKey) -> Self {
        Self {
            client,
            key,
            cached: Mutex::new(None),
        }
    }

    pub async fn access_token(&self) -> Result<String, UploadError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();
        if let Some(token) = cached
            .as_ref()
            .filter(|t| t.expires_at > now + Duration::seconds(REFRESH_MARGIN_SECS))
        {
            debug!("[UPLOAD][AUTH] Reusing cached access token");
            return Ok(token.value.clone());
        }

        let fresh = self.request_token(now).await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn request_token(&self, now: DateTime<Utc>) -> Result<CachedToken, UploadError> {
        let assertion = sign_assertion(&self.key, now)?;
        info!(client_email = %self.key.client_email, "[UPLOAD][AUTH] Requesting storage access token");

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "[UPLOAD][AUTH] Token endpoint rejected assertion");
            return Err(UploadError::Credentials(format!(
                "token endpoint returned HTTP {status}: {body}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok(CachedToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}
