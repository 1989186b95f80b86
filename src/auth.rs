//! OAuth identity for the Google Calendar API.
//!
//! `CredentialManager` owns the client id/secret/redirect URI, the live
//! credential record, and the HTTP calls to Google's OAuth endpoints
//! (code exchange, refresh, revocation). Refreshed credentials are handed to
//! a `RefreshListener`, which by default writes them to the token store.

use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use chrono::Utc;
use gcalendar_core::{CredentialRecord, GcalError, GcalResult, Settings, TokenStore};
use serde::Deserialize;

pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/calendar.readonly",
    "https://www.googleapis.com/auth/calendar.events",
];

/// Remote endpoints used for OAuth and Calendar API calls.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub authorize: String,
    pub token: String,
    pub revoke: String,
    pub calendar_api: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authorize: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token: "https://oauth2.googleapis.com/token".to_string(),
            revoke: "https://oauth2.googleapis.com/revoke".to_string(),
            calendar_api: "https://www.googleapis.com/calendar/v3".to_string(),
        }
    }
}

impl Endpoints {
    /// All endpoints under one base URL (a mock server in tests).
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            authorize: format!("{}/o/oauth2/v2/auth", base),
            token: format!("{}/token", base),
            revoke: format!("{}/revoke", base),
            calendar_api: format!("{}/calendar/v3", base),
        }
    }
}

/// Google OAuth client credentials.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl From<&Settings> for OAuthClient {
    fn from(settings: &Settings) -> Self {
        Self {
            client_id: settings.client_id().to_string(),
            client_secret: settings.client_secret().to_string(),
            redirect_uri: settings.redirect_uri().to_string(),
        }
    }
}

/// Receives every credential record produced by a token refresh.
pub trait RefreshListener: Send + Sync {
    fn credentials_refreshed(&self, record: &CredentialRecord) -> GcalResult<PathBuf>;
}

impl RefreshListener for TokenStore {
    fn credentials_refreshed(&self, record: &CredentialRecord) -> GcalResult<PathBuf> {
        self.write(record)
    }
}

/// Token endpoint response (code exchange and refresh).
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

impl From<TokenResponse> for CredentialRecord {
    fn from(tokens: TokenResponse) -> Self {
        let expiry_date = tokens
            .expires_in
            .filter(|secs| *secs > 0)
            .map(|secs| Utc::now().timestamp_millis() + secs * 1000);

        CredentialRecord {
            access_token: Some(tokens.access_token),
            refresh_token: tokens.refresh_token.filter(|t| !t.is_empty()),
            expiry_date,
            token_type: tokens.token_type,
            scope: tokens.scope,
            id_token: tokens.id_token,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

pub struct CredentialManager {
    client: OAuthClient,
    endpoints: Endpoints,
    store: TokenStore,
    http: reqwest::Client,
    current: RwLock<Option<CredentialRecord>>,
    listener: Box<dyn RefreshListener>,
}

impl CredentialManager {
    pub fn new(client: OAuthClient, store: TokenStore) -> Self {
        Self {
            client,
            endpoints: Endpoints::default(),
            listener: Box::new(store.clone()),
            store,
            http: reqwest::Client::new(),
            current: RwLock::new(None),
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_refresh_listener(mut self, listener: Box<dyn RefreshListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// True iff the token store holds a record with a refresh token.
    /// Missing or unreadable files count as not authenticated.
    pub fn is_authenticated(&self) -> bool {
        match self.store.read() {
            Ok(record) => record.has_refresh_token(),
            Err(e) if e.is_unauthenticated() => {
                tracing::debug!("Not authenticated: {}", e);
                false
            }
            Err(e) => {
                tracing::warn!("Could not read stored tokens: {}", e);
                false
            }
        }
    }

    /// Consent URL asking for offline access with forced re-consent, so
    /// Google always issues a refresh token.
    pub fn authorization_url(&self) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("access_type", "offline")
            .append_pair("scope", &SCOPES.join(" "))
            .append_pair("prompt", "consent")
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client.client_id)
            .append_pair("redirect_uri", &self.client.redirect_uri)
            .finish();

        format!("{}?{}", self.endpoints.authorize, query)
    }

    pub fn credentials(&self) -> Option<CredentialRecord> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_credentials(&self, record: CredentialRecord) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(record);
    }

    pub fn clear_credentials(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Pick up whatever the token store currently holds.
    ///
    /// A missing or broken file leaves the in-memory credentials untouched;
    /// the next API call then fails with an auth error instead.
    pub fn load_stored(&self) {
        match self.store.read() {
            Ok(record) => self.set_credentials(record),
            Err(e) if e.is_unauthenticated() => {
                tracing::debug!("No stored credentials loaded: {}", e)
            }
            Err(e) => tracing::warn!("Could not read stored tokens: {}", e),
        }
    }

    /// Exchange a one-time authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> GcalResult<CredentialRecord> {
        let response = self
            .http
            .post(&self.endpoints.token)
            .form(&[
                ("code", code),
                ("client_id", self.client.client_id.as_str()),
                ("client_secret", self.client.client_secret.as_str()),
                ("redirect_uri", self.client.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| GcalError::Auth(format!("Failed to reach token endpoint: {}", e)))?;

        let record: CredentialRecord = parse_token_response(response).await?.into();
        self.set_credentials(record.clone());

        tracing::info!("Exchanged authorization code for tokens");
        Ok(record)
    }

    /// A usable access token, refreshing first if the current one expired.
    pub async fn access_token(&self) -> GcalResult<String> {
        let record = self.credentials().ok_or_else(|| {
            GcalError::Auth(
                "No credentials available. Use the auth_status tool to sign in.".to_string(),
            )
        })?;

        if !record.needs_refresh(Utc::now()) {
            if let Some(token) = record.access_token() {
                return Ok(token.to_string());
            }
        }

        let Some(refresh_token) = record.refresh_token.as_deref().filter(|t| !t.is_empty()) else {
            return Err(GcalError::Auth(
                "Access token expired and no refresh token is available. Use the reauth tool."
                    .to_string(),
            ));
        };

        let refreshed = self.refresh(refresh_token).await?;
        let merged = self.on_credential_refresh(refreshed);

        merged
            .access_token()
            .map(String::from)
            .ok_or_else(|| GcalError::Auth("Token refresh returned no access token".to_string()))
    }

    async fn refresh(&self, refresh_token: &str) -> GcalResult<CredentialRecord> {
        tracing::debug!("Access token expired, refreshing");

        let response = self
            .http
            .post(&self.endpoints.token)
            .form(&[
                ("refresh_token", refresh_token),
                ("client_id", self.client.client_id.as_str()),
                ("client_secret", self.client.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| GcalError::Auth(format!("Failed to reach token endpoint: {}", e)))?;

        Ok(parse_token_response(response).await?.into())
    }

    /// Merge a refreshed record into the live credentials and persist it.
    ///
    /// Persistence is best-effort: the refreshed credentials are already in
    /// memory, so the session keeps working if the write fails.
    pub fn on_credential_refresh(&self, refreshed: CredentialRecord) -> CredentialRecord {
        let merged = self
            .credentials()
            .unwrap_or_default()
            .merged_with(refreshed);

        self.set_credentials(merged.clone());

        match self.listener.credentials_refreshed(&merged) {
            Ok(path) => tracing::info!(path = %path.display(), "Tokens refreshed and saved"),
            Err(e) => tracing::warn!("Tokens refreshed but could not be saved: {}", e),
        }

        merged
    }

    /// Revoke the record's refresh token (or access token) with Google.
    ///
    /// The local token file and in-memory credentials are dropped whether
    /// or not Google accepts the revocation.
    pub async fn revoke(&self, record: &CredentialRecord) -> GcalResult<()> {
        let result = self.revoke_remote(record).await;
        self.forget();
        result
    }

    async fn revoke_remote(&self, record: &CredentialRecord) -> GcalResult<()> {
        let token = record
            .revocable_token()
            .ok_or_else(|| GcalError::Revoke("No token to revoke".to_string()))?;

        let response = self
            .http
            .post(&self.endpoints.revoke)
            .form(&[("token", token)])
            .send()
            .await
            .map_err(|e| GcalError::Revoke(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GcalError::Revoke(oauth_error_message(status, &body)));
        }

        tracing::info!("Revoked Google OAuth token");
        Ok(())
    }

    /// Delete the stored credentials and clear the in-memory copy.
    pub fn forget(&self) {
        self.clear_credentials();

        // An already-missing file is fine; anything else only means the
        // user has to delete it by hand, which must not block re-auth.
        if let Err(e) = self.store.delete() {
            tracing::warn!("Could not delete stored tokens: {}", e);
        }
    }
}

async fn parse_token_response(response: reqwest::Response) -> GcalResult<TokenResponse> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| GcalError::Auth(format!("Failed to read token response: {}", e)))?;

    if !status.is_success() {
        return Err(GcalError::Auth(oauth_error_message(status, &body)));
    }

    serde_json::from_str(&body)
        .map_err(|e| GcalError::Auth(format!("Failed to parse token response: {}", e)))
}

fn oauth_error_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<OAuthErrorBody>(body) {
        Ok(OAuthErrorBody {
            error,
            error_description: Some(description),
        }) => format!("{} ({})", error, description),
        Ok(OAuthErrorBody { error, .. }) => error,
        Err(_) if body.trim().is_empty() => format!("HTTP {}", status),
        Err(_) => format!("HTTP {}: {}", status, body.trim()),
    }
}
