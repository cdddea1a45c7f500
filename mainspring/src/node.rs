//! Canonical in-memory representation of a configuration tree.
//!
//! A tree is built from [`ConfigNode`] values: ordered mappings, sequences,
//! scalar leaves, missing-value markers and unresolved interpolation
//! markers. Mappings may carry a bound [`Schema`] so the merge engine can
//! make type-aware decisions; equality deliberately ignores the binding and
//! compares plain structure only.

use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use crate::error::MainspringError;
use crate::schema::Schema;
use crate::MainspringResult;

/// Textual sentinel for a required-but-unsupplied value, as understood by
/// [`from_value`] and emitted by the text forms.
pub const MISSING_TOKEN: &str = "???";

/// Pattern matching a `${...}` interpolation expression.
#[allow(clippy::unwrap_used, reason = "pattern is a compile-time constant")]
pub(crate) static INTERPOLATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^${}]+)\}").unwrap());

/// Returns true when `text` contains at least one interpolation expression.
#[must_use]
pub fn is_interpolation_text(text: &str) -> bool {
    INTERPOLATION_PATTERN.is_match(text)
}

/// Returns true when `text` is exactly one interpolation expression.
#[must_use]
pub fn is_full_interpolation(text: &str) -> bool {
    INTERPOLATION_PATTERN
        .find(text)
        .is_some_and(|m| m.start() == 0 && m.end() == text.len())
}

/// A primitive leaf value.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    /// Absent / null value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// String.
    Str(String),
}

impl Scalar {
    /// Render the scalar as it would appear spliced into a string.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => "null".to_owned(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Str(s) => s.clone(),
        }
    }
}

/// Ordered collection of unique keys, optionally bound to a [`Schema`].
#[derive(Clone, Debug, Default)]
pub struct MappingNode {
    entries: IndexMap<String, ConfigNode>,
    schema: Option<Arc<Schema>>,
}

impl MappingNode {
    /// Create an empty, unbound mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty mapping bound to `schema`.
    #[must_use]
    pub fn with_schema(schema: Arc<Schema>) -> Self {
        Self {
            entries: IndexMap::new(),
            schema: Some(schema),
        }
    }

    /// The schema bound to this mapping, if any.
    #[must_use]
    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.schema.as_ref()
    }

    /// Bind `schema` to this mapping.
    pub fn bind_schema(&mut self, schema: Arc<Schema>) {
        self.schema = Some(schema);
    }

    /// Insert or replace the value at `key`, preserving insertion order for
    /// keys that already exist.
    pub fn insert(&mut self, key: impl Into<String>, value: ConfigNode) {
        self.entries.insert(key.into(), value);
    }

    /// Look up the value at `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ConfigNode> {
        self.entries.get(key)
    }

    /// Mutable lookup at `key`.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut ConfigNode> {
        self.entries.get_mut(key)
    }

    /// Remove `key`, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<ConfigNode> {
        self.entries.shift_remove(key)
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterate over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, ConfigNode> {
        self.entries.iter()
    }

    /// Iterate mutably over `(key, value)` pairs in insertion order.
    pub fn iter_mut(&mut self) -> indexmap::map::IterMut<'_, String, ConfigNode> {
        self.entries.iter_mut()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the mapping has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// Key order is stable for traversal and printing but carries no meaning, so
// equality ignores it, along with any schema binding.
impl PartialEq for MappingNode {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.entries.get(k) == Some(v))
    }
}

impl<'a> IntoIterator for &'a MappingNode {
    type Item = (&'a String, &'a ConfigNode);
    type IntoIter = indexmap::map::Iter<'a, String, ConfigNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl IntoIterator for MappingNode {
    type Item = (String, ConfigNode);
    type IntoIter = indexmap::map::IntoIter<String, ConfigNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, ConfigNode)> for MappingNode {
    fn from_iter<I: IntoIterator<Item = (String, ConfigNode)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            schema: None,
        }
    }
}

/// One element of a configuration tree.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigNode {
    /// Ordered key/value collection.
    Mapping(MappingNode),
    /// Ordered list of nodes.
    Sequence(Vec<ConfigNode>),
    /// Primitive leaf.
    Scalar(Scalar),
    /// Required value not yet supplied.
    Missing,
    /// Unresolved `${...}` placeholder expression.
    Interpolation(String),
}

impl ConfigNode {
    /// An empty mapping node.
    #[must_use]
    pub fn mapping() -> Self {
        Self::Mapping(MappingNode::new())
    }

    /// The null scalar.
    #[must_use]
    pub const fn null() -> Self {
        Self::Scalar(Scalar::Null)
    }

    /// Build a node from a string, recognising the missing token and
    /// interpolation expressions.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        if text == MISSING_TOKEN {
            Self::Missing
        } else if is_interpolation_text(text) {
            Self::Interpolation(text.to_owned())
        } else {
            Self::Scalar(Scalar::Str(text.to_owned()))
        }
    }

    /// Short name of the node kind, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Mapping(_) => "mapping",
            Self::Sequence(_) => "sequence",
            Self::Scalar(_) => "scalar",
            Self::Missing => "missing",
            Self::Interpolation(_) => "interpolation",
        }
    }

    /// Borrow as a mapping, if this node is one.
    #[must_use]
    pub const fn as_mapping(&self) -> Option<&MappingNode> {
        match self {
            Self::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Mutable borrow as a mapping.
    pub const fn as_mapping_mut(&mut self) -> Option<&mut MappingNode> {
        match self {
            Self::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Borrow as a sequence, if this node is one.
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[ConfigNode]> {
        match self {
            Self::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as a scalar, if this node is one.
    #[must_use]
    pub const fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this node is a container (mapping or sequence).
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self, Self::Mapping(_) | Self::Sequence(_))
    }

    /// Whether this node is the missing marker.
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Whether this node is an unresolved interpolation.
    #[must_use]
    pub const fn is_interpolation(&self) -> bool {
        matches!(self, Self::Interpolation(_))
    }

    /// Select a descendant by dotted path (`a.b[2].c`). Returns `None` when
    /// any step does not exist or the path cannot be parsed.
    #[must_use]
    pub fn select(&self, path: &str) -> Option<&ConfigNode> {
        let segs = parse_path(path).ok()?;
        let mut current = self;
        for seg in &segs {
            current = match (seg, current) {
                (PathSeg::Key(k), Self::Mapping(m)) => m.get(k)?,
                (PathSeg::Index(i), Self::Sequence(s)) => s.get(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Mutable variant of [`ConfigNode::select`] over pre-parsed segments.
    pub(crate) fn select_segs_mut(&mut self, segs: &[PathSeg]) -> Option<&mut ConfigNode> {
        let mut current = self;
        for seg in segs {
            current = match (seg, current) {
                (PathSeg::Key(k), Self::Mapping(m)) => m.get_mut(k)?,
                (PathSeg::Index(i), Self::Sequence(s)) => s.get_mut(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Immutable lookup over pre-parsed segments.
    pub(crate) fn select_segs(&self, segs: &[PathSeg]) -> Option<&ConfigNode> {
        let mut current = self;
        for seg in segs {
            current = match (seg, current) {
                (PathSeg::Key(k), Self::Mapping(m)) => m.get(k)?,
                (PathSeg::Index(i), Self::Sequence(s)) => s.get(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl From<bool> for ConfigNode {
    fn from(v: bool) -> Self {
        Self::Scalar(Scalar::Bool(v))
    }
}

impl From<i64> for ConfigNode {
    fn from(v: i64) -> Self {
        Self::Scalar(Scalar::Int(v))
    }
}

impl From<f64> for ConfigNode {
    fn from(v: f64) -> Self {
        Self::Scalar(Scalar::Float(v))
    }
}

impl From<&str> for ConfigNode {
    fn from(v: &str) -> Self {
        Self::from_text(v)
    }
}

/// One step of a dotted path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum PathSeg {
    Key(String),
    Index(usize),
}

/// Parse `a.b[2].c` into path segments.
pub(crate) fn parse_path(path: &str) -> MainspringResult<Vec<PathSeg>> {
    let mut segs = Vec::new();
    let mut rest = path;
    let bad = |msg: &str| Arc::new(MainspringError::invalid_input(format!("bad path `{path}`: {msg}")));

    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix('[') {
            let close = stripped.find(']').ok_or_else(|| bad("unterminated index"))?;
            let idx: usize = stripped[..close]
                .parse()
                .map_err(|_| bad("index is not an integer"))?;
            segs.push(PathSeg::Index(idx));
            rest = &stripped[close + 1..];
            rest = rest.strip_prefix('.').unwrap_or(rest);
        } else {
            let end = rest.find(['.', '[']).unwrap_or(rest.len());
            if end == 0 {
                return Err(bad("empty key segment"));
            }
            segs.push(PathSeg::Key(rest[..end].to_owned()));
            match rest.as_bytes().get(end) {
                Some(b'.') => rest = &rest[end + 1..],
                _ => rest = &rest[end..],
            }
        }
    }
    if segs.is_empty() {
        return Err(bad("empty path"));
    }
    Ok(segs)
}

/// Join a mapping key onto a dotted path.
pub(crate) fn join_key(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_owned()
    } else {
        format!("{base}.{key}")
    }
}

/// Join a sequence index onto a dotted path.
pub(crate) fn join_index(base: &str, index: usize) -> String {
    format!("{base}[{index}]")
}

/// Convert a plain JSON-style value into the corresponding node.
///
/// Strings equal to [`MISSING_TOKEN`] become missing markers and strings
/// containing `${...}` become interpolation markers, so text round-trips
/// reproduce an equivalent tree.
///
/// # Errors
///
/// Returns [`MainspringError::InvalidInput`] for numbers outside the
/// supported range.
pub fn from_value(value: Value) -> MainspringResult<ConfigNode> {
    Ok(match value {
        Value::Null => ConfigNode::null(),
        Value::Bool(b) => ConfigNode::Scalar(Scalar::Bool(b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                ConfigNode::Scalar(Scalar::Int(i))
            } else if let Some(f) = n.as_f64() {
                ConfigNode::Scalar(Scalar::Float(f))
            } else {
                return Err(Arc::new(MainspringError::invalid_input(format!(
                    "unsupported number `{n}`"
                ))));
            }
        }
        Value::String(s) => ConfigNode::from_text(&s),
        Value::Array(items) => ConfigNode::Sequence(
            items
                .into_iter()
                .map(from_value)
                .collect::<MainspringResult<Vec<_>>>()?,
        ),
        Value::Object(map) => {
            let mut node = MappingNode::new();
            for (k, v) in map {
                node.insert(k, from_value(v)?);
            }
            ConfigNode::Mapping(node)
        }
    })
}

/// Strip node wrappers down to a plain JSON-style value.
///
/// # Errors
///
/// Returns [`MainspringError::MissingValue`] or
/// [`MainspringError::UnresolvedInterpolation`] when a marker is still
/// present, carrying the dotted path of the offending leaf.
pub fn to_plain(node: &ConfigNode) -> MainspringResult<Value> {
    to_plain_at(node, "")
}

fn to_plain_at(node: &ConfigNode, path: &str) -> MainspringResult<Value> {
    match node {
        ConfigNode::Mapping(m) => {
            let mut out = serde_json::Map::with_capacity(m.len());
            for (k, v) in m {
                out.insert(k.clone(), to_plain_at(v, &join_key(path, k))?);
            }
            Ok(Value::Object(out))
        }
        ConfigNode::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(to_plain_at(item, &join_index(path, i))?);
            }
            Ok(Value::Array(out))
        }
        ConfigNode::Scalar(s) => scalar_to_value(s, path),
        ConfigNode::Missing => Err(Arc::new(MainspringError::MissingValue {
            path: path.to_owned(),
        })),
        ConfigNode::Interpolation(expr) => Err(Arc::new(MainspringError::unresolved(
            path,
            format!("`{expr}` still present when converting to a plain value"),
        ))),
    }
}

fn scalar_to_value(scalar: &Scalar, path: &str) -> MainspringResult<Value> {
    Ok(match scalar {
        Scalar::Null => Value::Null,
        Scalar::Bool(b) => Value::Bool(*b),
        Scalar::Int(i) => Value::Number((*i).into()),
        Scalar::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .ok_or_else(|| {
                Arc::new(MainspringError::invalid_input(format!(
                    "non-finite float at `{path}`"
                )))
            })?,
        Scalar::Str(s) => Value::String(s.clone()),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn from_value_detects_markers() {
        let node = from_value(json!({"a": "???", "b": "${a}", "c": "plain"}))
            .expect("conversion succeeds");
        let m = node.as_mapping().expect("mapping");
        assert!(m.get("a").expect("a").is_missing());
        assert!(m.get("b").expect("b").is_interpolation());
        assert_eq!(
            m.get("c"),
            Some(&ConfigNode::Scalar(Scalar::Str("plain".into())))
        );
    }

    #[test]
    fn from_value_preserves_declaration_order() {
        let node = from_value(json!({"zulu": 1, "mike": 2, "alpha": 3}))
            .expect("conversion succeeds");
        let keys: Vec<&str> = node
            .as_mapping()
            .expect("mapping")
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["zulu", "mike", "alpha"]);
    }

    #[test]
    fn round_trip_preserves_structure() {
        let value = json!({"a": 1, "b": [true, 2.5, "x"], "c": {"d": null}});
        let node = from_value(value.clone()).expect("conversion succeeds");
        assert_eq!(to_plain(&node).expect("plain"), value);
        assert_eq!(from_value(value).expect("again"), node);
    }

    #[test]
    fn to_plain_reports_marker_path() {
        let node = from_value(json!({"a": {"b": "???"}})).expect("conversion succeeds");
        let err = to_plain(&node).expect_err("missing marker");
        assert!(matches!(
            &*err,
            MainspringError::MissingValue { path } if path == "a.b"
        ));
    }

    #[test]
    fn select_follows_keys_and_indices() {
        let node = from_value(json!({"a": {"b": [10, {"c": 20}]}})).expect("conversion succeeds");
        assert_eq!(node.select("a.b[0]"), Some(&ConfigNode::from(10i64)));
        assert_eq!(node.select("a.b[1].c"), Some(&ConfigNode::from(20i64)));
        assert_eq!(node.select("a.x"), None);
    }

    #[test]
    fn mapping_equality_ignores_key_order() {
        let left = from_value(json!({"a": 1, "b": 2})).expect("left");
        let right = from_value(json!({"b": 2, "a": 1})).expect("right");
        assert_eq!(left, right);
    }

    #[test]
    fn parse_path_rejects_garbage() {
        assert!(parse_path("").is_err());
        assert!(parse_path("a..b").is_err());
        assert!(parse_path("a[x]").is_err());
    }

    #[test]
    fn full_interpolation_detection() {
        assert!(is_full_interpolation("${a.b}"));
        assert!(!is_full_interpolation("x${a.b}"));
        assert!(is_interpolation_text("x${a.b}"));
        assert!(!is_interpolation_text("plain"));
    }
}
