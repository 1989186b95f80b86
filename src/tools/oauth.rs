//! Auth tools. These run locally against the credential manager and never
//! need a working Calendar API connection.

use anyhow::Result;
use serde_json::json;

use super::{BoxFuture, Tool, ToolArgs, ToolContext, object_schema};

pub(super) fn tools() -> Vec<Tool> {
    vec![
        Tool::local(
            "auth_status",
            "Check authentication status and get auth URL if needed.",
            object_schema(json!({}), &[]),
            auth_status,
        ),
        Tool::local(
            "reauth",
            "Delete stored tokens and generate new auth URL for re-authentication.",
            object_schema(json!({}), &[]),
            reauth,
        ),
        Tool::local(
            "revoke_auth",
            "Revoke tokens with Google and delete local tokens, then get new auth URL.",
            object_schema(json!({}), &[]),
            revoke_auth,
        ),
        Tool::local(
            "handle_oauth_callback",
            "Complete OAuth with authorization code.",
            object_schema(json!({ "code": { "type": "string" } }), &["code"]),
            handle_oauth_callback,
        ),
    ]
}

fn auth_status<'a>(ctx: &'a ToolContext, _args: &'a ToolArgs) -> BoxFuture<'a, Result<String>> {
    Box::pin(async move {
        let credentials = &ctx.credentials;

        if credentials.is_authenticated() {
            let expiry = credentials
                .store()
                .read()
                .map(|record| record.expiry_display())
                .unwrap_or_else(|_| "unknown".to_string());
            return Ok(format!("Authenticated. Token expires: {}", expiry));
        }

        Ok(format!("Not authenticated. Visit:\n{}", credentials.authorization_url()))
    })
}

fn reauth<'a>(ctx: &'a ToolContext, _args: &'a ToolArgs) -> BoxFuture<'a, Result<String>> {
    Box::pin(async move {
        ctx.credentials.forget();

        Ok(format!(
            "Tokens deleted. Visit to re-authenticate:\n{}",
            ctx.credentials.authorization_url()
        ))
    })
}

fn revoke_auth<'a>(ctx: &'a ToolContext, _args: &'a ToolArgs) -> BoxFuture<'a, Result<String>> {
    Box::pin(async move {
        let credentials = &ctx.credentials;

        match credentials.store().read() {
            Ok(record) => {
                // Google may already consider the token dead; local cleanup
                // happens either way.
                if let Err(e) = credentials.revoke(&record).await {
                    tracing::warn!("{}", e);
                }
            }
            Err(e) => {
                tracing::debug!("Nothing to revoke: {}", e);
                credentials.forget();
            }
        }

        Ok(format!(
            "Tokens revoked and deleted. Visit to re-authenticate:\n{}",
            credentials.authorization_url()
        ))
    })
}

fn handle_oauth_callback<'a>(ctx: &'a ToolContext, args: &'a ToolArgs) -> BoxFuture<'a, Result<String>> {
    Box::pin(async move {
        let code = args.required("code")?;

        let record = ctx.credentials.exchange_code(&code).await?;
        let path = ctx.credentials.store().write(&record)?;
        tracing::info!(path = %path.display(), "Saved tokens");

        Ok("Authentication complete!".to_string())
    })
}
