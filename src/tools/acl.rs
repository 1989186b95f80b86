//! Calendar sharing (access control list) tools.

use anyhow::Result;
use serde_json::json;

use super::{Render, Tool, ToolArgs, object_schema};
use crate::google::ApiRequest;

pub(super) fn tools() -> Vec<Tool> {
    let rule_schema = || {
        object_schema(
            json!({
                "calendarId": { "type": "string" },
                "ruleId": { "type": "string" },
            }),
            &["calendarId", "ruleId"],
        )
    };

    vec![
        Tool::remote(
            "list_acl",
            "List access control rules.",
            object_schema(json!({ "calendarId": { "type": "string" } }), &["calendarId"]),
            list_acl,
            Render::Items,
        ),
        Tool::remote(
            "get_acl_rule",
            "Get an ACL rule.",
            rule_schema(),
            get_acl_rule,
            Render::Document,
        ),
        Tool::remote(
            "create_acl_rule",
            "Share a calendar with someone.",
            object_schema(
                json!({
                    "calendarId": { "type": "string" },
                    "role": { "type": "string", "enum": ["reader", "writer", "owner"] },
                    "scopeType": { "type": "string", "enum": ["user", "group"] },
                    "scopeValue": { "type": "string", "description": "Email or domain" },
                }),
                &["calendarId", "role", "scopeType", "scopeValue"],
            ),
            create_acl_rule,
            Render::Created,
        ),
        Tool::remote(
            "delete_acl_rule",
            "Remove calendar sharing.",
            rule_schema(),
            delete_acl_rule,
            Render::Message("ACL rule deleted"),
        ),
    ]
}

fn list_acl(args: &ToolArgs) -> Result<ApiRequest> {
    let calendar_id = args.required("calendarId")?;
    Ok(ApiRequest::get(&["calendars", &calendar_id, "acl"]))
}

fn get_acl_rule(args: &ToolArgs) -> Result<ApiRequest> {
    let calendar_id = args.required("calendarId")?;
    let rule_id = args.required("ruleId")?;
    Ok(ApiRequest::get(&["calendars", &calendar_id, "acl", &rule_id]))
}

fn create_acl_rule(args: &ToolArgs) -> Result<ApiRequest> {
    let calendar_id = args.required("calendarId")?;
    let body = json!({
        "role": args.required("role")?,
        "scope": {
            "type": args.required("scopeType")?,
            "value": args.required("scopeValue")?,
        },
    });

    Ok(ApiRequest::post(&["calendars", &calendar_id, "acl"]).body(body))
}

fn delete_acl_rule(args: &ToolArgs) -> Result<ApiRequest> {
    let calendar_id = args.required("calendarId")?;
    let rule_id = args.required("ruleId")?;
    Ok(ApiRequest::delete(&["calendars", &calendar_id, "acl", &rule_id]))
}
