use anyhow::{Result, bail};
use serde_json::{Map, Value};

pub const DEFAULT_CALENDAR_ID: &str = "primary";

/// Arguments of one `tools/call`.
///
/// Values are read leniently: empty strings and `null` count as absent, and
/// scalars are accepted where a string is expected.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    pub fn new(arguments: Map<String, Value>) -> Self {
        Self(arguments)
    }

    pub fn str(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn required(&self, key: &str) -> Result<String> {
        match self.str(key) {
            Some(value) => Ok(value),
            None => bail!("Missing required argument: {}", key),
        }
    }

    /// `calendarId`, defaulting to the user's primary calendar.
    pub fn calendar_id(&self) -> String {
        self.str("calendarId")
            .unwrap_or_else(|| DEFAULT_CALENDAR_ID.to_string())
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// A comma-separated string (or an array of strings) as trimmed,
    /// non-empty entries.
    pub fn list(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(String::from)
                .collect(),
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(String::from)
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl From<Value> for ToolArgs {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_string_is_absent() {
        let args = ToolArgs::from(json!({ "calendarId": "", "q": null }));
        assert_eq!(args.calendar_id(), "primary");
        assert_eq!(args.str("q"), None);
        assert!(args.required("calendarId").is_err());
    }

    #[test]
    fn test_scalars_read_as_strings() {
        let args = ToolArgs::from(json!({ "maxResults": 25, "ruleId": "user:a@b.c" }));
        assert_eq!(args.str("maxResults").as_deref(), Some("25"));
        assert_eq!(args.integer("maxResults"), Some(25));
        assert_eq!(args.required("ruleId").unwrap(), "user:a@b.c");
    }

    #[test]
    fn test_integer_from_string() {
        let args = ToolArgs::from(json!({ "maxResults": " 10 " }));
        assert_eq!(args.integer("maxResults"), Some(10));
    }

    #[test]
    fn test_list_splits_and_trims() {
        let args = ToolArgs::from(json!({
            "attendees": "a@x.com, b@x.com,,",
            "calendars": ["primary", " work "],
        }));
        assert_eq!(args.list("attendees"), vec!["a@x.com", "b@x.com"]);
        assert_eq!(args.list("calendars"), vec!["primary", "work"]);
        assert!(args.list("missing").is_empty());
    }

    #[test]
    fn test_required_error_names_argument() {
        let err = ToolArgs::default().required("eventId").unwrap_err();
        assert_eq!(err.to_string(), "Missing required argument: eventId");
    }
}
