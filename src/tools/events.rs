//! Event tools: list, get, create, update, delete, quick add, and recurring
//! instances. All default to the primary calendar.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use super::{Render, Tool, ToolArgs, object_schema};
use crate::google::ApiRequest;

/// Page size used when the caller does not pass `maxResults`.
const DEFAULT_MAX_RESULTS: i64 = 100;

pub(super) fn tools() -> Vec<Tool> {
    vec![
        Tool::remote(
            "list_events",
            "List events on a calendar. Supports filtering by time range and search queries.",
            object_schema(
                json!({
                    "calendarId": { "type": "string", "default": "primary", "description": "Calendar ID" },
                    "timeMin": { "type": "string", "description": "Start time (ISO)" },
                    "timeMax": { "type": "string", "description": "End time (ISO)" },
                    "maxResults": { "type": "integer", "default": DEFAULT_MAX_RESULTS, "description": "Max events" },
                    "q": { "type": "string", "description": "Search query" },
                }),
                &[],
            ),
            list_events,
            Render::Items,
        ),
        Tool::remote(
            "get_event",
            "Get a single event by ID.",
            object_schema(
                json!({
                    "calendarId": { "type": "string", "default": "primary" },
                    "eventId": { "type": "string" },
                }),
                &["eventId"],
            ),
            get_event,
            Render::Document,
        ),
        Tool::remote(
            "create_event",
            "Create a new event. A Google Meet link is attached automatically.",
            object_schema(
                json!({
                    "calendarId": { "type": "string", "default": "primary" },
                    "summary": { "type": "string", "description": "Event title" },
                    "description": { "type": "string" },
                    "location": { "type": "string" },
                    "startDateTime": { "type": "string", "description": "Start (ISO)" },
                    "endDateTime": { "type": "string", "description": "End (ISO)" },
                    "attendees": { "type": "string", "description": "Comma-separated emails" },
                }),
                &[],
            ),
            create_event,
            Render::Created,
        ),
        Tool::remote(
            "update_event",
            "Update an event. Fields that are not given are cleared.",
            object_schema(
                json!({
                    "calendarId": { "type": "string", "default": "primary" },
                    "eventId": { "type": "string" },
                    "summary": { "type": "string" },
                    "description": { "type": "string" },
                    "location": { "type": "string" },
                    "startDateTime": { "type": "string" },
                    "endDateTime": { "type": "string" },
                }),
                &["eventId"],
            ),
            update_event,
            Render::Updated,
        ),
        Tool::remote(
            "delete_event",
            "Delete an event.",
            object_schema(
                json!({
                    "calendarId": { "type": "string", "default": "primary" },
                    "eventId": { "type": "string" },
                }),
                &["eventId"],
            ),
            delete_event,
            Render::Message("Event deleted"),
        ),
        Tool::remote(
            "quick_add",
            "Create event from natural language.",
            object_schema(
                json!({
                    "calendarId": { "type": "string", "default": "primary" },
                    "text": { "type": "string", "description": "Natural language (e.g., \"Meeting tomorrow at 3pm\")" },
                }),
                &["text"],
            ),
            quick_add,
            Render::Created,
        ),
        Tool::remote(
            "list_instances",
            "Get instances of a recurring event.",
            object_schema(
                json!({
                    "calendarId": { "type": "string", "default": "primary" },
                    "eventId": { "type": "string" },
                    "timeMin": { "type": "string" },
                    "timeMax": { "type": "string" },
                }),
                &["eventId"],
            ),
            list_instances,
            Render::Items,
        ),
    ]
}

/// Request body for event insert/update. Unset fields are omitted.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<EventTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<EventTime>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attendees: Vec<Attendee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    conference_data: Option<ConferenceData>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    date_time: String,
}

#[derive(Debug, Serialize)]
struct Attendee {
    email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConferenceData {
    create_request: ConferenceRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConferenceRequest {
    request_id: String,
    conference_solution_key: ConferenceSolutionKey,
}

#[derive(Debug, Serialize)]
struct ConferenceSolutionKey {
    #[serde(rename = "type")]
    kind: &'static str,
}

impl EventBody {
    fn from_args(args: &ToolArgs) -> Self {
        Self {
            summary: args.str("summary"),
            description: args.str("description"),
            location: args.str("location"),
            start: args.str("startDateTime").map(|date_time| EventTime { date_time }),
            end: args.str("endDateTime").map(|date_time| EventTime { date_time }),
            ..Default::default()
        }
    }
}

/// A fresh Meet conference request. The id only has to be unique per call.
fn meet_conference() -> ConferenceData {
    ConferenceData {
        create_request: ConferenceRequest {
            request_id: format!("meet-{}", Utc::now().timestamp_millis()),
            conference_solution_key: ConferenceSolutionKey { kind: "hangoutsMeet" },
        },
    }
}

fn list_events(args: &ToolArgs) -> Result<ApiRequest> {
    let calendar_id = args.calendar_id();
    let max_results = args.integer("maxResults").unwrap_or(DEFAULT_MAX_RESULTS);

    Ok(ApiRequest::get(&["calendars", &calendar_id, "events"])
        .query_opt("timeMin", args.str("timeMin"))
        .query_opt("timeMax", args.str("timeMax"))
        .query("maxResults", max_results)
        .query_opt("q", args.str("q")))
}

fn get_event(args: &ToolArgs) -> Result<ApiRequest> {
    let event_id = args.required("eventId")?;
    Ok(ApiRequest::get(&["calendars", &args.calendar_id(), "events", &event_id]))
}

fn create_event(args: &ToolArgs) -> Result<ApiRequest> {
    let body = EventBody {
        attendees: args
            .list("attendees")
            .into_iter()
            .map(|email| Attendee { email })
            .collect(),
        conference_data: Some(meet_conference()),
        ..EventBody::from_args(args)
    };

    Ok(ApiRequest::post(&["calendars", &args.calendar_id(), "events"])
        .query("conferenceDataVersion", 1)
        .body(serde_json::to_value(body)?))
}

// Full replacement: the event becomes exactly the supplied fields.
fn update_event(args: &ToolArgs) -> Result<ApiRequest> {
    let event_id = args.required("eventId")?;
    let body = EventBody::from_args(args);

    Ok(ApiRequest::put(&["calendars", &args.calendar_id(), "events", &event_id])
        .body(serde_json::to_value(body)?))
}

fn delete_event(args: &ToolArgs) -> Result<ApiRequest> {
    let event_id = args.required("eventId")?;
    Ok(ApiRequest::delete(&["calendars", &args.calendar_id(), "events", &event_id]))
}

fn quick_add(args: &ToolArgs) -> Result<ApiRequest> {
    let text = args.required("text")?;
    Ok(ApiRequest::post(&["calendars", &args.calendar_id(), "events", "quickAdd"]).query("text", text))
}

fn list_instances(args: &ToolArgs) -> Result<ApiRequest> {
    let event_id = args.required("eventId")?;

    Ok(
        ApiRequest::get(&["calendars", &args.calendar_id(), "events", &event_id, "instances"])
            .query_opt("timeMin", args.str("timeMin"))
            .query_opt("timeMax", args.str("timeMax")),
    )
}
