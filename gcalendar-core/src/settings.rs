//! Runtime configuration, read from the environment.
//!
//!   GOOGLE_CLIENT_ID           OAuth client id
//!   GOOGLE_CLIENT_SECRET       OAuth client secret
//!   GOOGLE_REDIRECT_URI        defaults to http://localhost:3000/oauth2callback
//!   GCALENDAR_MCP_TOKEN_PATH   explicit token file location
//!
//! Empty values are treated as unset.

use config::{Config, Environment};
use serde::Deserialize;

use crate::error::{GcalError, GcalResult};

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/oauth2callback";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    google_client_id: Option<String>,

    #[serde(default)]
    google_client_secret: Option<String>,

    #[serde(default)]
    google_redirect_uri: Option<String>,

    #[serde(default)]
    gcalendar_mcp_token_path: Option<String>,
}

impl Settings {
    /// Load from the process environment.
    pub fn load() -> GcalResult<Self> {
        Self::from_environment(Environment::default())
    }

    pub fn from_environment(environment: Environment) -> GcalResult<Self> {
        Config::builder()
            .add_source(environment)
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| GcalError::Config(e.to_string()))
    }

    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: Option<String>,
        token_path: Option<String>,
    ) -> Self {
        Self {
            google_client_id: Some(client_id.into()),
            google_client_secret: Some(client_secret.into()),
            google_redirect_uri: redirect_uri,
            gcalendar_mcp_token_path: token_path,
        }
    }

    pub fn client_id(&self) -> &str {
        non_empty(&self.google_client_id).unwrap_or_default()
    }

    pub fn client_secret(&self) -> &str {
        non_empty(&self.google_client_secret).unwrap_or_default()
    }

    pub fn redirect_uri(&self) -> &str {
        non_empty(&self.google_redirect_uri).unwrap_or(DEFAULT_REDIRECT_URI)
    }

    pub fn token_path(&self) -> Option<&str> {
        non_empty(&self.gcalendar_mcp_token_path)
    }

    /// Names of the client credentials that are not configured.
    pub fn missing_client_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();

        if self.client_id().is_empty() {
            missing.push("GOOGLE_CLIENT_ID");
        }
        if self.client_secret().is_empty() {
            missing.push("GOOGLE_CLIENT_SECRET");
        }

        missing
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_vars(vars: &[(&str, &str)]) -> Settings {
        let mut map = config::Map::new();
        for (key, value) in vars {
            map.insert(key.to_string(), value.to_string());
        }
        Settings::from_environment(Environment::default().source(Some(map))).unwrap()
    }

    #[test]
    fn test_reads_environment_variables() {
        let settings = from_vars(&[
            ("GOOGLE_CLIENT_ID", "id.apps.googleusercontent.com"),
            ("GOOGLE_CLIENT_SECRET", "secret"),
            ("GOOGLE_REDIRECT_URI", "http://localhost:4000/cb"),
            ("GCALENDAR_MCP_TOKEN_PATH", "/tmp/tokens.json"),
        ]);

        assert_eq!(settings.client_id(), "id.apps.googleusercontent.com");
        assert_eq!(settings.client_secret(), "secret");
        assert_eq!(settings.redirect_uri(), "http://localhost:4000/cb");
        assert_eq!(settings.token_path(), Some("/tmp/tokens.json"));
        assert!(settings.missing_client_fields().is_empty());
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = from_vars(&[]);

        assert_eq!(settings.redirect_uri(), DEFAULT_REDIRECT_URI);
        assert_eq!(settings.token_path(), None);
        assert_eq!(
            settings.missing_client_fields(),
            vec!["GOOGLE_CLIENT_ID", "GOOGLE_CLIENT_SECRET"]
        );
    }

    #[test]
    fn test_empty_values_count_as_missing() {
        let settings = Settings::new("", "secret", Some(String::new()), Some("  ".to_string()));

        assert_eq!(settings.missing_client_fields(), vec!["GOOGLE_CLIENT_ID"]);
        assert_eq!(settings.redirect_uri(), DEFAULT_REDIRECT_URI);
        assert_eq!(settings.token_path(), None);
    }
}
