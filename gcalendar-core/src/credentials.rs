//! The OAuth credential record persisted between runs.
//!
//! Stored as JSON so the file stays compatible with other Google OAuth
//! tooling:
//!
//! ```json
//! {
//!   "access_token": "ya29...",
//!   "refresh_token": "1//0g...",
//!   "expiry_date": 1705312800000,
//!   "token_type": "Bearer"
//! }
//! ```

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Refresh this long before the access token actually expires.
const EXPIRY_MARGIN_MS: i64 = 60_000;

/// OAuth token material for one Google account.
///
/// A record without a refresh token still authenticates until `expiry_date`,
/// but cannot renew itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl CredentialRecord {
    /// Whether this record can renew itself.
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// The token to hand to the revocation endpoint: refresh token first,
    /// then the access token.
    pub fn revocable_token(&self) -> Option<&str> {
        self.refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| self.access_token())
    }

    /// True if there is no usable access token, or it expires within the
    /// refresh margin. A record without an expiry is assumed valid.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        if self.access_token().is_none() {
            return true;
        }

        match self.expiry_date {
            Some(expiry) => now.timestamp_millis() + EXPIRY_MARGIN_MS >= expiry,
            None => false,
        }
    }

    /// Apply a refreshed record on top of this one.
    ///
    /// Google usually omits the refresh token from refresh responses, so the
    /// previously known one is kept when the new record has none.
    pub fn merged_with(&self, refreshed: CredentialRecord) -> CredentialRecord {
        let mut merged = refreshed;

        if !merged.has_refresh_token() {
            merged.refresh_token = self.refresh_token.clone();
        }

        merged
    }

    /// Expiry formatted in local time, or `unknown`.
    pub fn expiry_display(&self) -> String {
        self.expiry_date
            .and_then(|ms| Local.timestamp_millis_opt(ms).single())
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}
