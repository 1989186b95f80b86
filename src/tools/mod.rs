//! The tool catalogue.
//!
//! Most tools are a single Calendar API call: a request builder plus a
//! [`Render`] describing how to turn the JSON reply into text. The auth
//! tools run locally against the credential manager.

mod acl;
mod args;
mod calendars;
mod events;
mod freebusy;
mod oauth;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::Result;
use gcalendar_core::protocol::ToolDescriptor;
use serde_json::Value;

use crate::auth::CredentialManager;
use crate::google::{ApiRequest, CalendarApi};

pub use args::{DEFAULT_CALENDAR_ID, ToolArgs};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type RequestBuilder = fn(&ToolArgs) -> Result<ApiRequest>;
pub type LocalHandler = for<'a> fn(&'a ToolContext, &'a ToolArgs) -> BoxFuture<'a, Result<String>>;

/// What a tool needs at call time.
#[derive(Clone)]
pub struct ToolContext {
    pub api: Arc<dyn CalendarApi>,
    pub credentials: Arc<CredentialManager>,
}

/// How a Calendar API reply becomes the tool's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Render {
    /// The `items` array, `[]` if absent.
    Items,
    /// The whole reply.
    Document,
    /// `Created: ` followed by the reply.
    Created,
    /// `Updated: ` followed by the reply.
    Updated,
    /// A fixed confirmation, the reply is discarded.
    Message(&'static str),
    /// One top-level field, `{}` if absent.
    Field(&'static str),
}

impl Render {
    pub fn render(self, reply: Value) -> Result<String> {
        let text = match self {
            Render::Items => pretty(reply.get("items").cloned().unwrap_or_else(|| Value::Array(Vec::new())))?,
            Render::Document => pretty(reply)?,
            Render::Created => format!("Created: {}", pretty(reply)?),
            Render::Updated => format!("Updated: {}", pretty(reply)?),
            Render::Message(message) => message.to_string(),
            Render::Field(field) => pretty(reply.get(field).cloned().unwrap_or_else(|| Value::Object(Default::default())))?,
        };
        Ok(text)
    }
}

fn pretty(value: Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(&value)?)
}

pub enum Handler {
    Remote { build: RequestBuilder, render: Render },
    Local(LocalHandler),
}

pub struct Tool {
    pub descriptor: ToolDescriptor,
    pub handler: Handler,
}

impl Tool {
    pub fn remote(
        name: &'static str,
        description: &'static str,
        input_schema: Value,
        build: RequestBuilder,
        render: Render,
    ) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name,
                description,
                input_schema,
            },
            handler: Handler::Remote { build, render },
        }
    }

    pub fn local(
        name: &'static str,
        description: &'static str,
        input_schema: Value,
        handler: LocalHandler,
    ) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name,
                description,
                input_schema,
            },
            handler: Handler::Local(handler),
        }
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    pub async fn run(&self, ctx: &ToolContext, args: &ToolArgs) -> Result<String> {
        match &self.handler {
            Handler::Remote { build, render } => {
                let request = build(args)?;
                let reply = ctx.api.execute(request).await?;
                render.render(reply)
            }
            Handler::Local(handler) => handler(ctx, args).await,
        }
    }
}

/// Fixed, ordered set of tools.
pub struct ToolRegistry {
    tools: Vec<Tool>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Tool>) -> Self {
        Self { tools }
    }

    /// Every Calendar and auth tool, in listing order.
    pub fn builtin() -> Self {
        let mut tools = Vec::new();
        tools.extend(events::tools());
        tools.extend(calendars::tools());
        tools.extend(acl::tools());
        tools.extend(freebusy::tools());
        tools.extend(oauth::tools());
        Self::new(tools)
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|tool| tool.name() == name)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter().map(|tool| &tool.descriptor)
    }
}

/// Object schema with the given properties and required keys.
pub(crate) fn object_schema(properties: Value, required: &[&str]) -> Value {
    let mut schema = serde_json::json!({
        "type": "object",
        "properties": properties,
    });
    if !required.is_empty() {
        schema["required"] = serde_json::json!(required);
    }
    schema
}
