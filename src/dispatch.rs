//! Routes a `tools/call` to its tool and folds every outcome into a
//! `ToolResponse`. Nothing propagates past this point.

use gcalendar_core::protocol::{ToolDescriptor, ToolResponse};
use serde_json::{Map, Value};

use crate::tools::{ToolArgs, ToolContext, ToolRegistry};

pub struct Dispatcher {
    registry: ToolRegistry,
    context: ToolContext,
}

impl Dispatcher {
    pub fn new(registry: ToolRegistry, context: ToolContext) -> Self {
        Self { registry, context }
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.registry.descriptors().cloned().collect()
    }

    pub async fn dispatch(&self, name: &str, arguments: Map<String, Value>) -> ToolResponse {
        // Tokens may have been written by another process (or a previous
        // handle_oauth_callback) since the last call.
        self.context.credentials.load_stored();

        let Some(tool) = self.registry.get(name) else {
            tracing::warn!(tool = name, "Unknown tool");
            return ToolResponse::success(format!("Unknown tool: {}", name));
        };

        let args = ToolArgs::new(arguments);

        match tool.run(&self.context, &args).await {
            Ok(text) => {
                tracing::debug!(tool = name, "Tool call succeeded");
                ToolResponse::success(text)
            }
            Err(e) => {
                tracing::warn!(tool = name, "Tool call failed: {:#}", e);
                ToolResponse::error(format!("{:#}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Endpoints, SCOPES};
    use crate::testing::{FakeCalendar, dispatcher_with, dispatcher_with_endpoints};
    use gcalendar_core::CredentialRecord;
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn signed_in_record() -> CredentialRecord {
        CredentialRecord {
            access_token: Some("ya29.token".to_string()),
            refresh_token: Some("1//refresh".to_string()),
            expiry_date: Some(1_705_312_800_000),
            token_type: Some("Bearer".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let calendar = Arc::new(FakeCalendar::default());
        let (dispatcher, _) = dispatcher_with(calendar.clone(), &dir.path().join("tokens.json"));

        let response = dispatcher.dispatch("launch_rockets", Map::new()).await;

        assert_eq!(response, ToolResponse::success("Unknown tool: launch_rockets"));
        assert!(calendar.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_list_events_without_items_is_empty_array() {
        let dir = TempDir::new().unwrap();
        let calendar = Arc::new(FakeCalendar::replying(json!({ "kind": "calendar#events" })));
        let (dispatcher, _) = dispatcher_with(calendar.clone(), &dir.path().join("tokens.json"));

        let response = dispatcher.dispatch("list_events", Map::new()).await;

        assert_eq!(response.text(), "[]");
        let requests = calendar.recorded();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].path, vec!["calendars", "primary", "events"]);
    }

    #[tokio::test]
    async fn test_create_event_requests_meet_link() {
        let dir = TempDir::new().unwrap();
        let calendar = Arc::new(FakeCalendar::replying(json!({ "id": "evt1" })));
        let (dispatcher, _) = dispatcher_with(calendar.clone(), &dir.path().join("tokens.json"));

        let response = dispatcher
            .dispatch(
                "create_event",
                args(json!({
                    "summary": "Sync",
                    "startDateTime": "2024-01-15T10:00:00Z",
                    "endDateTime": "2024-01-15T11:00:00Z",
                    "attendees": "a@x.com, b@x.com",
                })),
            )
            .await;

        assert_eq!(response.text(), "Created: {\n  \"id\": \"evt1\"\n}");

        let request = &calendar.recorded()[0];
        assert_eq!(request.method, Method::POST);
        let body = request.body.as_ref().unwrap();
        assert_eq!(body["attendees"], json!([{ "email": "a@x.com" }, { "email": "b@x.com" }]));
        assert_eq!(
            body["conferenceData"]["createRequest"]["conferenceSolutionKey"]["type"],
            "hangoutsMeet"
        );
    }

    #[tokio::test]
    async fn test_delete_event_confirms() {
        let dir = TempDir::new().unwrap();
        let calendar = Arc::new(FakeCalendar::default());
        let (dispatcher, _) = dispatcher_with(calendar.clone(), &dir.path().join("tokens.json"));

        let response = dispatcher
            .dispatch("delete_event", args(json!({ "eventId": "evt1" })))
            .await;

        assert_eq!(response, ToolResponse::success("Event deleted"));
        assert_eq!(calendar.recorded()[0].method, Method::DELETE);
    }

    #[tokio::test]
    async fn test_freebusy_returns_calendars_field() {
        let dir = TempDir::new().unwrap();
        let calendar = Arc::new(FakeCalendar::replying(json!({
            "kind": "calendar#freeBusy",
            "calendars": { "primary": { "busy": [] } },
        })));
        let (dispatcher, _) = dispatcher_with(calendar.clone(), &dir.path().join("tokens.json"));

        let response = dispatcher
            .dispatch(
                "query_freebusy",
                args(json!({
                    "timeMin": "2024-01-15T00:00:00Z",
                    "timeMax": "2024-01-16T00:00:00Z",
                    "calendars": "primary",
                })),
            )
            .await;

        let parsed: Value = serde_json::from_str(&response.text()).unwrap();
        assert_eq!(parsed, json!({ "primary": { "busy": [] } }));
    }

    #[tokio::test]
    async fn test_remote_failure_becomes_error_envelope() {
        let dir = TempDir::new().unwrap();
        let calendar = Arc::new(FakeCalendar::failing("Calendar API error: Not Found"));
        let (dispatcher, _) = dispatcher_with(calendar, &dir.path().join("tokens.json"));

        let response = dispatcher
            .dispatch("get_event", args(json!({ "eventId": "missing" })))
            .await;

        assert!(response.is_error());
        assert_eq!(response.text(), "Error: Calendar API error: Not Found");
    }

    #[tokio::test]
    async fn test_missing_argument_skips_remote_call() {
        let dir = TempDir::new().unwrap();
        let calendar = Arc::new(FakeCalendar::default());
        let (dispatcher, _) = dispatcher_with(calendar.clone(), &dir.path().join("tokens.json"));

        let response = dispatcher.dispatch("get_calendar", Map::new()).await;

        assert_eq!(response.text(), "Error: Missing required argument: calendarId");
        assert!(calendar.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_loads_stored_credentials() {
        let dir = TempDir::new().unwrap();
        let token_file = dir.path().join("tokens.json");
        let (dispatcher, credentials) = dispatcher_with(Arc::new(FakeCalendar::default()), &token_file);
        assert_eq!(credentials.credentials(), None);

        credentials.store().write(&signed_in_record()).unwrap();
        dispatcher.dispatch("get_colors", Map::new()).await;

        assert_eq!(credentials.credentials(), Some(signed_in_record()));
    }

    #[tokio::test]
    async fn test_auth_status_unauthenticated_offers_consent_url() {
        let dir = TempDir::new().unwrap();
        let token_file = dir.path().join("tokens.json");
        std::fs::write(&token_file, "{ broken").unwrap();
        let (dispatcher, _) = dispatcher_with(Arc::new(FakeCalendar::default()), &token_file);

        let response = dispatcher.dispatch("auth_status", Map::new()).await;
        let text = response.text();

        assert!(!response.is_error());
        let url = text.strip_prefix("Not authenticated. Visit:\n").unwrap();
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("calendar.readonly"));
        assert!(url.contains("calendar.events"));
    }

    #[tokio::test]
    async fn test_auth_status_authenticated_shows_expiry() {
        let dir = TempDir::new().unwrap();
        let token_file = dir.path().join("tokens.json");
        let (dispatcher, credentials) = dispatcher_with(Arc::new(FakeCalendar::default()), &token_file);
        credentials.store().write(&signed_in_record()).unwrap();

        let response = dispatcher.dispatch("auth_status", Map::new()).await;

        assert_eq!(
            response.text(),
            format!(
                "Authenticated. Token expires: {}",
                signed_in_record().expiry_display()
            )
        );
    }

    #[tokio::test]
    async fn test_reauth_deletes_tokens() {
        let dir = TempDir::new().unwrap();
        let token_file = dir.path().join("tokens.json");
        let (dispatcher, credentials) = dispatcher_with(Arc::new(FakeCalendar::default()), &token_file);
        credentials.store().write(&signed_in_record()).unwrap();

        let response = dispatcher.dispatch("reauth", Map::new()).await;

        let text = response.text();
        let url = text
            .strip_prefix("Tokens deleted. Visit to re-authenticate:\n")
            .unwrap();
        let url = url::Url::parse(url).unwrap();
        let scope = url
            .query_pairs()
            .find(|(key, _)| key == "scope")
            .map(|(_, value)| value.into_owned())
            .unwrap();
        for expected in SCOPES {
            assert!(scope.split(' ').any(|s| s == *expected), "missing scope {}", expected);
        }
        assert!(!token_file.exists());
        assert_eq!(credentials.credentials(), None);

        // Nothing left to delete is still fine
        let again = dispatcher.dispatch("reauth", Map::new()).await;
        assert!(!again.is_error());
    }

    #[tokio::test]
    async fn test_revoke_auth_without_tokens_still_succeeds() {
        let dir = TempDir::new().unwrap();
        let (dispatcher, _) = dispatcher_with(Arc::new(FakeCalendar::default()), &dir.path().join("tokens.json"));

        let response = dispatcher.dispatch("revoke_auth", Map::new()).await;

        assert!(
            response
                .text()
                .starts_with("Tokens revoked and deleted. Visit to re-authenticate:\n")
        );
    }

    #[tokio::test]
    async fn test_oauth_callback_requires_code() {
        let dir = TempDir::new().unwrap();
        let (dispatcher, _) = dispatcher_with(Arc::new(FakeCalendar::default()), &dir.path().join("tokens.json"));

        let response = dispatcher.dispatch("handle_oauth_callback", Map::new()).await;

        assert_eq!(response.text(), "Error: Missing required argument: code");
    }

    #[tokio::test]
    async fn test_revoke_auth_rejected_remotely_still_clears_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/revoke"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_token" })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let token_file = dir.path().join("tokens.json");
        let (dispatcher, credentials) = dispatcher_with_endpoints(
            Arc::new(FakeCalendar::default()),
            &token_file,
            Endpoints::with_base(&server.uri()),
        );
        credentials.store().write(&signed_in_record()).unwrap();

        let response = dispatcher.dispatch("revoke_auth", Map::new()).await;

        assert!(!response.is_error());
        assert!(
            response
                .text()
                .starts_with("Tokens revoked and deleted. Visit to re-authenticate:\n")
        );
        assert!(!token_file.exists());
        assert_eq!(credentials.credentials(), None);
    }

    #[tokio::test]
    async fn test_oauth_callback_exchanges_and_persists() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=4%2Fcallback"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.callback",
                "refresh_token": "1//callback",
                "expires_in": 3599,
                "token_type": "Bearer",
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let token_file = dir.path().join("tokens.json");
        let (dispatcher, credentials) = dispatcher_with_endpoints(
            Arc::new(FakeCalendar::default()),
            &token_file,
            Endpoints::with_base(&server.uri()),
        );

        let response = dispatcher
            .dispatch("handle_oauth_callback", args(json!({ "code": "4/callback" })))
            .await;

        assert_eq!(response, ToolResponse::success("Authentication complete!"));

        let stored = credentials.store().read().unwrap();
        assert_eq!(stored.access_token.as_deref(), Some("ya29.callback"));
        assert_eq!(stored.refresh_token.as_deref(), Some("1//callback"));
        assert_eq!(credentials.credentials(), Some(stored));
    }
}
