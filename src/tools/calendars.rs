use anyhow::Result;
use serde::Serialize;
use serde_json::json;

use super::{Render, Tool, ToolArgs, object_schema};
use crate::google::ApiRequest;

pub(super) fn tools() -> Vec<Tool> {
    let calendar_id_only = || {
        object_schema(
            json!({ "calendarId": { "type": "string" } }),
            &["calendarId"],
        )
    };

    vec![
        Tool::remote(
            "list_calendars",
            "List all accessible calendars.",
            object_schema(json!({}), &[]),
            list_calendars,
            Render::Items,
        ),
        Tool::remote(
            "get_calendar",
            "Get calendar metadata.",
            calendar_id_only(),
            get_calendar,
            Render::Document,
        ),
        Tool::remote(
            "create_calendar",
            "Create a new calendar.",
            object_schema(
                json!({
                    "summary": { "type": "string" },
                    "description": { "type": "string" },
                    "location": { "type": "string" },
                    "timeZone": { "type": "string", "description": "IANA time zone, e.g. Europe/Zurich" },
                }),
                &["summary"],
            ),
            create_calendar,
            Render::Created,
        ),
        Tool::remote(
            "update_calendar",
            "Update calendar metadata. Only the given fields change.",
            object_schema(
                json!({
                    "calendarId": { "type": "string" },
                    "summary": { "type": "string" },
                    "description": { "type": "string" },
                    "location": { "type": "string" },
                    "timeZone": { "type": "string" },
                }),
                &["calendarId"],
            ),
            update_calendar,
            Render::Updated,
        ),
        Tool::remote(
            "delete_calendar",
            "Delete a calendar.",
            calendar_id_only(),
            delete_calendar,
            Render::Message("Calendar deleted"),
        ),
        Tool::remote(
            "clear_calendar",
            "Delete all events from a calendar.",
            calendar_id_only(),
            clear_calendar,
            Render::Message("Calendar cleared"),
        ),
        Tool::remote(
            "get_colors",
            "Get available colors.",
            object_schema(json!({}), &[]),
            get_colors,
            Render::Document,
        ),
    ]
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CalendarBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time_zone: Option<String>,
}

impl CalendarBody {
    fn from_args(args: &ToolArgs) -> Self {
        Self {
            summary: args.str("summary"),
            description: args.str("description"),
            location: args.str("location"),
            time_zone: args.str("timeZone"),
        }
    }
}

fn list_calendars(_args: &ToolArgs) -> Result<ApiRequest> {
    Ok(ApiRequest::get(&["users", "me", "calendarList"]))
}

fn get_calendar(args: &ToolArgs) -> Result<ApiRequest> {
    let calendar_id = args.required("calendarId")?;
    Ok(ApiRequest::get(&["calendars", &calendar_id]))
}

fn create_calendar(args: &ToolArgs) -> Result<ApiRequest> {
    args.required("summary")?;
    let body = CalendarBody::from_args(args);
    Ok(ApiRequest::post(&["calendars"]).body(serde_json::to_value(body)?))
}

fn update_calendar(args: &ToolArgs) -> Result<ApiRequest> {
    let calendar_id = args.required("calendarId")?;
    let body = CalendarBody::from_args(args);
    Ok(ApiRequest::patch(&["calendars", &calendar_id]).body(serde_json::to_value(body)?))
}

fn delete_calendar(args: &ToolArgs) -> Result<ApiRequest> {
    let calendar_id = args.required("calendarId")?;
    Ok(ApiRequest::delete(&["calendars", &calendar_id]))
}

fn clear_calendar(args: &ToolArgs) -> Result<ApiRequest> {
    let calendar_id = args.required("calendarId")?;
    Ok(ApiRequest::post(&["calendars", &calendar_id, "clear"]))
}

fn get_colors(_args: &ToolArgs) -> Result<ApiRequest> {
    Ok(ApiRequest::get(&["colors"]))
}
