use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A record from the remote list endpoint. Only the title-like field is used.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RemotePost {
    pub id: Option<i64>,
    pub title: Option<String>,
}

impl RemotePost {
    /// Reads `title`, falling back to `text`. Fields of any other shape are ignored.
    pub fn from_value(value: &Value) -> Self {
        let field = |name: &str| value.get(name).and_then(Value::as_str);

        RemotePost {
            id: value.get("id").and_then(Value::as_i64),
            title: field("title").or_else(|| field("text")).map(str::to_string),
        }
    }
}

/// Response body of a POST; the placeholder server echoes the payload back with an id.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PostResponse {
    #[serde(default)]
    pub id: Option<i64>,
}
