use anyhow::{Result, bail};
use serde_json::json;

use super::{Render, Tool, ToolArgs, object_schema};
use crate::google::ApiRequest;

pub(super) fn tools() -> Vec<Tool> {
    vec![Tool::remote(
        "query_freebusy",
        "Query free/busy information.",
        object_schema(
            json!({
                "timeMin": { "type": "string" },
                "timeMax": { "type": "string" },
                "calendars": { "type": "string", "description": "Comma-separated IDs" },
            }),
            &["timeMin", "timeMax", "calendars"],
        ),
        query_freebusy,
        Render::Field("calendars"),
    )]
}

fn query_freebusy(args: &ToolArgs) -> Result<ApiRequest> {
    let time_min = args.required("timeMin")?;
    let time_max = args.required("timeMax")?;

    let calendars = args.list("calendars");
    if calendars.is_empty() {
        bail!("Missing required argument: calendars");
    }

    let items: Vec<_> = calendars.iter().map(|id| json!({ "id": id })).collect();

    Ok(ApiRequest::post(&["freeBusy"]).body(json!({
        "timeMin": time_min,
        "timeMax": time_max,
        "items": items,
    })))
}
