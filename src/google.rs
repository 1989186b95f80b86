//! Google Calendar REST client.
//!
//! Tools describe each remote call as an [`ApiRequest`] and hand it to a
//! [`CalendarApi`]. The live implementation attaches a bearer token from the
//! credential manager; tests substitute a recording fake.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use gcalendar_core::GcalError;
use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::auth::CredentialManager;

/// One Calendar API call, relative to the API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Unencoded path segments, e.g. `["calendars", "primary", "events"]`.
    pub path: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: &[&str]) -> Self {
        Self {
            method,
            path: path.iter().map(|s| s.to_string()).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: &[&str]) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &[&str]) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: &[&str]) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: &[&str]) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: &[&str]) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Add a query parameter only when a value is present.
    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Absolute URL under `base`; path segments are percent-encoded.
    pub fn url(&self, base: &Url) -> Result<Url> {
        let mut url = base.clone();

        url.path_segments_mut()
            .map_err(|_| anyhow!("API base URL cannot have a path: {}", base))?
            .pop_if_empty()
            .extend(&self.path);

        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }

        Ok(url)
    }
}

#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// Perform the call and return the decoded JSON body (`Null` when the
    /// response has no body, as for deletes).
    async fn execute(&self, request: ApiRequest) -> Result<Value>;
}

pub struct GoogleCalendar {
    http: reqwest::Client,
    base: Url,
    credentials: Arc<CredentialManager>,
}

impl GoogleCalendar {
    pub fn new(credentials: Arc<CredentialManager>) -> Result<Self> {
        let base = Url::parse(&credentials.endpoints().calendar_api)
            .context("Invalid Calendar API base URL")?;

        Ok(Self {
            http: reqwest::Client::new(),
            base,
            credentials,
        })
    }
}

#[async_trait]
impl CalendarApi for GoogleCalendar {
    async fn execute(&self, request: ApiRequest) -> Result<Value> {
        let url = request.url(&self.base)?;
        let token = self.credentials.access_token().await?;

        tracing::debug!(method = %request.method, %url, "Calendar API request");

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .bearer_auth(token);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.context("Calendar API request failed")?;
        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read Calendar API response")?;

        if !status.is_success() {
            return Err(GcalError::Remote(remote_error_message(status, &text)).into());
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).context("Failed to parse Calendar API response")
    }
}

/// Google wraps API errors as `{"error": {"code": 404, "message": "Not Found"}}`.
fn remote_error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or_else(|| match body.trim() {
            "" => format!("HTTP {}", status),
            text => format!("HTTP {}: {}", status, text),
        })
}
