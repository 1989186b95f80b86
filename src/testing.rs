//! Fakes shared by unit tests.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Result, bail};
use async_trait::async_trait;
use gcalendar_core::TokenStore;
use serde_json::Value;

use crate::auth::{CredentialManager, Endpoints, OAuthClient};
use crate::dispatch::Dispatcher;
use crate::google::{ApiRequest, CalendarApi};
use crate::tools::{ToolContext, ToolRegistry};

/// Records every request and answers with a canned reply or error.
#[derive(Default)]
pub struct FakeCalendar {
    pub requests: Mutex<Vec<ApiRequest>>,
    reply: Mutex<Option<Value>>,
    failure: Mutex<Option<String>>,
}

impl FakeCalendar {
    pub fn replying(reply: Value) -> Self {
        let fake = Self::default();
        *fake.reply.lock().unwrap() = Some(reply);
        fake
    }

    pub fn failing(message: &str) -> Self {
        let fake = Self::default();
        *fake.failure.lock().unwrap() = Some(message.to_string());
        fake
    }

    pub fn recorded(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalendarApi for FakeCalendar {
    async fn execute(&self, request: ApiRequest) -> Result<Value> {
        self.requests.lock().unwrap().push(request);

        if let Some(message) = self.failure.lock().unwrap().clone() {
            bail!(message);
        }
        Ok(self.reply.lock().unwrap().clone().unwrap_or(Value::Null))
    }
}

pub fn oauth_client() -> OAuthClient {
    OAuthClient {
        client_id: "client-123.apps.googleusercontent.com".to_string(),
        client_secret: "secret".to_string(),
        redirect_uri: "http://localhost:3000/oauth2callback".to_string(),
    }
}

/// A dispatcher over `calendar` with tokens stored at `token_file`.
pub fn dispatcher_with(calendar: Arc<FakeCalendar>, token_file: &Path) -> (Dispatcher, Arc<CredentialManager>) {
    dispatcher_with_endpoints(calendar, token_file, Endpoints::default())
}

/// Like [`dispatcher_with`], with OAuth calls going to `endpoints`.
pub fn dispatcher_with_endpoints(
    calendar: Arc<FakeCalendar>,
    token_file: &Path,
    endpoints: Endpoints,
) -> (Dispatcher, Arc<CredentialManager>) {
    let credentials = Arc::new(
        CredentialManager::new(oauth_client(), TokenStore::at(token_file)).with_endpoints(endpoints),
    );
    let context = ToolContext {
        api: calendar,
        credentials: credentials.clone(),
    };
    (Dispatcher::new(ToolRegistry::builtin(), context), credentials)
}
