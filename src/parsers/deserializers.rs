use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{Error, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::models::Content;
use crate::models::raw::RawNode;

/// Custom deserializer for optional timestamps given as float seconds since the
/// epoch (sub-second precision kept) or as RFC3339 strings
pub fn deserialize_epoch_seconds<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => {
            let secs = n.as_f64().ok_or_else(|| Error::custom("invalid timestamp"))?;
            let whole = secs.floor();
            let nanos = (((secs - whole) * 1e9).round() as u32).min(999_999_999);
            DateTime::from_timestamp(whole as i64, nanos)
                .map(Some)
                .ok_or_else(|| Error::custom("timestamp out of range"))
        }
        Value::String(s) => s
            .parse::<DateTime<Utc>>()
            .map(Some)
            .map_err(|e| Error::custom(format!("invalid RFC3339 timestamp: {}", e))),
        _ => Err(Error::custom("timestamp must be a number, string or null")),
    }
}

/// Deserializes the `mapping` object into `(key, node)` pairs, keeping document
/// order so sibling order survives ingestion
pub fn deserialize_ordered_mapping<'de, D>(deserializer: D) -> Result<Vec<(String, RawNode)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OrderedMapping;

    impl<'de> Visitor<'de> for OrderedMapping {
        type Value = Vec<(String, RawNode)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of node id to node, or null")
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, RawNode>()? {
                entries.push(entry);
            }
            Ok(entries)
        }

        fn visit_unit<E: Error>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }
    }

    deserializer.deserialize_any(OrderedMapping)
}

/// Maps a message `content` object onto the closed [`Content`] enum. Unknown
/// content types become [`Content::Unrecognized`] instead of failing.
pub fn deserialize_content<'de, D>(deserializer: D) -> Result<Option<Content>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(|v| content_from_value(&v)))
}

fn content_from_value(value: &Value) -> Content {
    let field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);
    let tag = value.get("content_type").and_then(Value::as_str).unwrap_or("unknown");

    match tag {
        "text" => Content::Text { parts: string_parts(value) },
        "multimodal_text" => {
            let image_refs = value
                .get("parts")
                .and_then(Value::as_array)
                .map(|parts| {
                    parts
                        .iter()
                        .filter_map(|p| p.get("asset_pointer").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            Content::MultimodalText { parts: string_parts(value), image_refs }
        }
        "code" => Content::Code {
            language: field("language"),
            text: field("text").unwrap_or_default(),
        },
        "execution_output" => Content::ExecutionOutput { text: field("text").unwrap_or_default() },
        "tether_browsing_display" => {
            Content::BrowsingDisplay { result: field("result").unwrap_or_default() }
        }
        "tether_quote" => Content::Quote {
            url: field("url"),
            title: field("title"),
            text: field("text").unwrap_or_default(),
        },
        "system_error" => Content::SystemError {
            name: field("name").unwrap_or_else(|| "error".to_string()),
            text: field("text").unwrap_or_default(),
        },
        other => Content::Unrecognized { content_type: other.to_string() },
    }
}

/// String entries of `parts`; non-string parts (image pointers) are skipped
fn string_parts(value: &Value) -> Vec<String> {
    value
        .get("parts")
        .and_then(Value::as_array)
        .map(|parts| parts.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use serde::Deserialize;

    use crate::models::raw::RawConversation;
    use crate::models::{Content, ContentType};

    #[derive(Deserialize)]
    struct Stamp {
        #[serde(default, deserialize_with = "super::deserialize_epoch_seconds")]
        at: Option<DateTime<chrono::Utc>>,
    }

    #[derive(Deserialize)]
    struct Payload {
        #[serde(default, deserialize_with = "super::deserialize_content")]
        content: Option<Content>,
    }

    fn content(json: &str) -> Content {
        serde_json::from_str::<Payload>(json).unwrap().content.unwrap()
    }

    #[test]
    fn test_epoch_seconds_float() {
        let stamp: Stamp = serde_json::from_str(r#"{"at": 1700000000.25}"#).unwrap();
        assert_eq!(stamp.at.unwrap().timestamp_millis(), 1_700_000_000_250);
    }

    #[test]
    fn test_epoch_seconds_integer_and_null() {
        let stamp: Stamp = serde_json::from_str(r#"{"at": 1700000000}"#).unwrap();
        assert_eq!(stamp.at.unwrap().timestamp(), 1_700_000_000);

        let stamp: Stamp = serde_json::from_str(r#"{"at": null}"#).unwrap();
        assert!(stamp.at.is_none());

        let stamp: Stamp = serde_json::from_str(r#"{}"#).unwrap();
        assert!(stamp.at.is_none());
    }

    #[test]
    fn test_epoch_seconds_rfc3339() {
        let stamp: Stamp = serde_json::from_str(r#"{"at": "2024-01-15T10:30:00Z"}"#).unwrap();
        assert_eq!(stamp.at.unwrap().to_rfc3339(), "2024-01-15T10:30:00+00:00");
    }

    #[test]
    fn test_epoch_seconds_rejects_bool() {
        assert!(serde_json::from_str::<Stamp>(r#"{"at": true}"#).is_err());
    }

    #[test]
    fn test_mapping_keeps_document_order() {
        let json = r#"{
            "id": "c",
            "mapping": {
                "zeta": {"message": null, "parent": null},
                "alpha": {"message": null, "parent": "zeta"},
                "mid": {"message": null, "parent": "zeta"}
            }
        }"#;
        let raw: RawConversation = serde_json::from_str(json).unwrap();
        let keys: Vec<&str> = raw.mapping.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_null_mapping_is_empty() {
        let raw: RawConversation = serde_json::from_str(r#"{"id": "c", "mapping": null}"#).unwrap();
        assert!(raw.mapping.is_empty());
    }

    #[test]
    fn test_content_variants() {
        assert_eq!(
            content(r#"{"content": {"content_type": "code", "language": "python", "text": "1+1"}}"#),
            Content::Code { language: Some("python".into()), text: "1+1".into() }
        );
        assert_eq!(
            content(r#"{"content": {"content_type": "execution_output", "text": "2"}}"#),
            Content::ExecutionOutput { text: "2".into() }
        );
        assert_eq!(
            content(
                r#"{"content": {"content_type": "tether_quote", "url": "u", "title": "t", "text": "q"}}"#
            ),
            Content::Quote { url: Some("u".into()), title: Some("t".into()), text: "q".into() }
        );
    }

    #[test]
    fn test_multimodal_parts_split() {
        let parsed = content(
            r#"{"content": {"content_type": "multimodal_text", "parts": [
                {"content_type": "image_asset_pointer", "asset_pointer": "file-service://abc"},
                "What is this?"
            ]}}"#,
        );
        assert_eq!(
            parsed,
            Content::MultimodalText {
                parts: vec!["What is this?".into()],
                image_refs: vec!["file-service://abc".into()],
            }
        );
    }

    #[test]
    fn test_unknown_content_type_is_unrecognized() {
        let parsed = content(r#"{"content": {"content_type": "hologram", "beams": 3}}"#);
        assert_eq!(parsed.content_type(), ContentType::Unrecognized("hologram".into()));
    }

    #[test]
    fn test_null_content_is_none() {
        let payload: Payload = serde_json::from_str(r#"{"content": null}"#).unwrap();
        assert!(payload.content.is_none());
    }
}
