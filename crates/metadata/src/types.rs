use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `source` of a record produced by the merger.
pub const MERGED_SOURCE: &str = "merged";

/// Metadata one crawler produced for one video file.
///
/// `data` is deliberately loose: upstream sites disagree on what they expose, and
/// unknown keys must survive merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlResult {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// The merged record is a `CrawlResult` whose source is [`MERGED_SOURCE`].
pub type MergedRecord = CrawlResult;

impl CrawlResult {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    pub fn with_original_url(mut self, url: impl Into<String>) -> Self {
        self.original_url = Some(url.into());
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// String value of `key`, when present and non-empty.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn is_merged(&self) -> bool {
        self.source == MERGED_SOURCE
    }
}

/// `null`, `""`, `[]` and `{}` count as "no value" everywhere in merging.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_with_missing_optionals() {
        let result: CrawlResult =
            serde_json::from_value(json!({ "source": "dmm", "data": { "plot": "x" } })).unwrap();
        assert_eq!(result.source, "dmm");
        assert!(result.title.is_none());
        assert_eq!(result.get_str("plot"), Some("x"));
    }

    #[test]
    fn empty_values() {
        assert!(is_empty_value(&json!(null)));
        assert!(is_empty_value(&json!("")));
        assert!(is_empty_value(&json!([])));
        assert!(is_empty_value(&json!({})));
        assert!(!is_empty_value(&json!(" ")));
        assert!(!is_empty_value(&json!(0)));
        assert!(!is_empty_value(&json!(false)));
        assert!(!is_empty_value(&json!(["a"])));
    }

    #[test]
    fn optionals_are_skipped_when_serializing() {
        let value = serde_json::to_value(CrawlResult::new("javbus")).unwrap();
        assert_eq!(value, json!({ "source": "javbus", "data": {} }));
    }
}
