//! Data types that flow through a single recall request.
//!
//! Every value here is request scoped: produced by one stage, consumed by
//! the next, and dropped when the request finishes.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One retrieved evidence unit returned by a
/// [`ContextRetriever`](crate::collaborators::ContextRetriever).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextFragment {
    /// Relevance score; higher is more relevant. Missing scores read as `0.0`.
    #[serde(default)]
    pub score: f64,
    /// Free-form metadata attached to the fragment at indexing time.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl ContextFragment {
    pub fn new(score: f64, metadata: Map<String, Value>) -> Self {
        Self { score, metadata }
    }

    /// Returns the grouping key stored under `field`, if present.
    ///
    /// Strings are used as-is; any other value (including `null`) is keyed
    /// by its compact JSON text, so `7` groups as `"7"`.
    pub fn item_key(&self, field: &str) -> Option<Cow<'_, str>> {
        match self.metadata.get(field)? {
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            other => Some(Cow::Owned(other.to_string())),
        }
    }
}

/// Fragments that share one grouping-key value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateGroup {
    pub item_key: String,
    /// Number of fragments carrying this key.
    pub count: usize,
    /// Highest fragment score within the group.
    pub max_score: f64,
    /// Position of the group's first fragment in the retrieved sequence.
    pub first_index: usize,
}

/// Outcome of a successful majority vote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    /// The winning grouping-key value.
    pub item_key: String,
    /// Maximum score among the winning group's fragments.
    pub confidence: f64,
    /// Fragment count of the winning group.
    pub group_size: usize,
    /// Fragments that carried any grouping key.
    pub keyed: usize,
    /// All fragments considered, keyed or not.
    pub seen: usize,
}

/// A structured record from the metadata store.
///
/// Records are immutable; [`with_field`](MetadataRecord::with_field)
/// returns a modified copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataRecord(Map<String, Value>);

impl MetadataRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }

    /// Returns a copy of this record with `field` set to `value`.
    pub fn with_field(&self, field: &str, value: impl Into<Value>) -> Self {
        let mut fields = self.0.clone();
        fields.insert(field.to_string(), value.into());
        Self(fields)
    }
}

impl From<Map<String, Value>> for MetadataRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// The terminal artifact of `resolve_memory`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    /// The record as returned to the caller, summary rewritten when enabled.
    pub record: MetadataRecord,
    /// The vote that selected this record.
    pub selection: Selection,
    /// The query actually sent to the retriever.
    pub query: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fragment_missing_score_defaults_to_zero() {
        let frag: ContextFragment =
            serde_json::from_value(json!({ "metadata": { "gif_path": "a.gif" } })).unwrap();
        assert_eq!(frag.score, 0.0);
        assert_eq!(frag.item_key("gif_path").as_deref(), Some("a.gif"));
    }

    #[test]
    fn test_item_key_keeps_non_string_values() {
        let numeric: ContextFragment =
            serde_json::from_value(json!({ "score": 0.5, "metadata": { "gif_path": 7 } }))
                .unwrap();
        assert_eq!(numeric.item_key("gif_path").as_deref(), Some("7"));

        let null: ContextFragment =
            serde_json::from_value(json!({ "score": 0.5, "metadata": { "gif_path": null } }))
                .unwrap();
        assert_eq!(null.item_key("gif_path").as_deref(), Some("null"));

        let absent: ContextFragment =
            serde_json::from_value(json!({ "score": 0.5, "metadata": {} })).unwrap();
        assert_eq!(absent.item_key("gif_path"), None);
    }

    #[test]
    fn test_with_field_leaves_original_untouched() {
        let original: MetadataRecord =
            serde_json::from_value(json!({ "file_path": "a.gif", "summary": "old" })).unwrap();
        let updated = original.with_field("summary", "new");
        assert_eq!(original.get_str("summary"), Some("old"));
        assert_eq!(updated.get_str("summary"), Some("new"));
        assert_eq!(updated.get_str("file_path"), Some("a.gif"));
    }

    #[test]
    fn test_record_serializes_as_plain_object() {
        let record = MetadataRecord::default().with_field("file_path", "a.gif");
        assert_eq!(serde_json::to_value(&record).unwrap(), json!({ "file_path": "a.gif" }));
    }
}
