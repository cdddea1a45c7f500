//! YAML and JSON text forms of configuration trees.
//!
//! Markers stay textual: a missing value serialises as `"???"` and an
//! interpolation as its raw `${...}` expression, so writing a tree out and
//! parsing it back reproduces an equivalent tree, markers included.

use std::fmt;

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::node::{ConfigNode, MappingNode, Scalar, MISSING_TOKEN};
use crate::result_ext::MainspringResultExt;
use crate::MainspringResult;

/// Supported text formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextFormat {
    /// YAML 1.2.
    Yaml,
    /// Pretty-printed JSON.
    Json,
}

impl Serialize for ConfigNode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Mapping(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (key, value) in m {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Self::Sequence(items) => serializer.collect_seq(items),
            Self::Scalar(Scalar::Null) => serializer.serialize_unit(),
            Self::Scalar(Scalar::Bool(b)) => serializer.serialize_bool(*b),
            Self::Scalar(Scalar::Int(i)) => serializer.serialize_i64(*i),
            Self::Scalar(Scalar::Float(f)) => serializer.serialize_f64(*f),
            Self::Scalar(Scalar::Str(s)) => serializer.serialize_str(s),
            Self::Missing => serializer.serialize_str(MISSING_TOKEN),
            Self::Interpolation(expr) => serializer.serialize_str(expr),
        }
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = ConfigNode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a configuration value")
    }

    fn visit_bool<E: serde::de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(ConfigNode::from(v))
    }

    fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(ConfigNode::from(v))
    }

    fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
        i64::try_from(v)
            .map(ConfigNode::from)
            .map_err(|_| E::custom(format!("integer `{v}` is out of range")))
    }

    fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(ConfigNode::from(v))
    }

    fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(ConfigNode::from_text(v))
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(ConfigNode::null())
    }

    fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(ConfigNode::null())
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        deserializer.deserialize_any(Self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(ConfigNode::Sequence(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut node = MappingNode::new();
        while let Some((key, value)) = map.next_entry::<String, ConfigNode>()? {
            node.insert(key, value);
        }
        Ok(ConfigNode::Mapping(node))
    }
}

impl<'de> Deserialize<'de> for ConfigNode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(NodeVisitor)
    }
}

/// Render `node` in the requested text format.
///
/// # Errors
///
/// Returns a serialisation error wrapped in [`crate::MainspringError`].
pub fn to_text(node: &ConfigNode, format: TextFormat) -> MainspringResult<String> {
    match format {
        TextFormat::Yaml => to_yaml(node),
        TextFormat::Json => to_json(node),
    }
}

/// Render `node` as YAML.
///
/// # Errors
///
/// Returns [`crate::MainspringError::Yaml`] on serialisation failure.
pub fn to_yaml(node: &ConfigNode) -> MainspringResult<String> {
    serde_yaml::to_string(node).into_mainspring()
}

/// Render `node` as pretty-printed JSON.
///
/// # Errors
///
/// Returns [`crate::MainspringError::Json`] on serialisation failure.
pub fn to_json(node: &ConfigNode) -> MainspringResult<String> {
    serde_json::to_string_pretty(node).into_mainspring()
}

/// Parse a YAML document into a tree, preserving key order and recognising
/// markers.
///
/// # Errors
///
/// Returns [`crate::MainspringError::Yaml`] on parse failure.
pub fn from_yaml(text: &str) -> MainspringResult<ConfigNode> {
    serde_yaml::from_str(text).into_mainspring()
}

/// Parse a JSON document into a tree, preserving key order and recognising
/// markers.
///
/// # Errors
///
/// Returns [`crate::MainspringError::Json`] on parse failure.
pub fn from_json(text: &str) -> MainspringResult<ConfigNode> {
    serde_json::from_str(text).into_mainspring()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::node::from_value;

    #[test]
    fn yaml_round_trip_preserves_markers() {
        let node = from_value(json!({
            "data": {"path": "???"},
            "name": "${data.path}",
            "bs": 32,
        }))
        .expect("tree");
        let rendered = to_yaml(&node).expect("yaml");
        let reparsed = from_yaml(&rendered).expect("parse");
        assert_eq!(reparsed, node);
        assert!(reparsed.select("data.path").expect("leaf").is_missing());
        assert!(reparsed.select("name").expect("leaf").is_interpolation());
    }

    #[test]
    fn json_round_trip_preserves_values() {
        let node = from_value(json!({"a": [1, 2.5, true, null], "b": "x"})).expect("tree");
        let rendered = to_json(&node).expect("json");
        let reparsed = from_json(&rendered).expect("parse");
        assert_eq!(reparsed, node);
    }

    #[test]
    fn yaml_preserves_key_order() {
        let node = from_yaml("zulu: 1\nalpha: 2\nmike: 3\n").expect("parse");
        let keys: Vec<&str> = node
            .as_mapping()
            .expect("mapping")
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["zulu", "alpha", "mike"]);
    }

    #[test]
    fn parse_failure_is_reported() {
        assert!(from_yaml("a: [unclosed").is_err());
        assert!(from_json("{").is_err());
    }
}
