//! Loader for CLI-style `path.to.key=value` override strings.
//!
//! The flat override list becomes a configuration tree suitable for
//! merging; later options win over earlier ones, consistent with the merge
//! engine's left-to-right precedence. Values are parsed as YAML scalars, so
//! `port=8080` yields an integer, `debug=true` a boolean and
//! `name="8080"` a string.

use std::sync::Arc;

use crate::error::MainspringError;
use crate::node::{parse_path, ConfigNode, MappingNode, PathSeg};
use crate::MainspringResult;

/// Build a tree from dotted `key=value` override strings.
///
/// # Errors
///
/// Returns [`MainspringError::InvalidInput`] for options without `=`, with
/// an unparsable path, or using sequence indices (partial list edits go
/// through [`crate::edit_list`]).
pub fn from_dotlist<I, S>(options: I) -> MainspringResult<ConfigNode>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut root = MappingNode::new();
    for option in options {
        let option = option.as_ref();
        let (path, raw) = option.split_once('=').ok_or_else(|| {
            Arc::new(MainspringError::invalid_input(format!(
                "override `{option}` is not of the form `path.to.key=value`"
            )))
        })?;
        let segs = parse_path(path.trim())?;
        let value = parse_value(raw)?;
        set_path(&mut root, &segs, value, option)?;
    }
    Ok(ConfigNode::Mapping(root))
}

fn parse_value(raw: &str) -> MainspringResult<ConfigNode> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(ConfigNode::null());
    }
    let node: ConfigNode = serde_yaml::from_str(trimmed)
        .map_err(|e| Arc::new(MainspringError::from(e)))?;
    Ok(node)
}

fn set_path(
    root: &mut MappingNode,
    segs: &[PathSeg],
    value: ConfigNode,
    option: &str,
) -> MainspringResult<()> {
    let mut current = root;
    for (i, seg) in segs.iter().enumerate() {
        let PathSeg::Key(key) = seg else {
            return Err(Arc::new(MainspringError::invalid_input(format!(
                "override `{option}` uses a sequence index; use edit_list for partial list edits"
            ))));
        };
        let last = i == segs.len() - 1;
        if last {
            current.insert(key.clone(), value);
            return Ok(());
        }
        // Intermediate steps force a mapping; the last writer wins over any
        // earlier scalar at the same path.
        if !matches!(current.get(key), Some(ConfigNode::Mapping(_))) {
            current.insert(key.clone(), ConfigNode::mapping());
        }
        let Some(ConfigNode::Mapping(next)) = current.get_mut(key) else {
            unreachable!("intermediate step was just forced to a mapping");
        };
        current = next;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::node::from_value;

    #[test]
    fn builds_nested_tree_with_typed_values() {
        let node = from_dotlist(["data.path=/train", "data.batch_size=32", "debug=true"])
            .expect("dotlist");
        let expected = from_value(json!({
            "data": {"path": "/train", "batch_size": 32},
            "debug": true,
        }))
        .expect("expected");
        assert_eq!(node, expected);
    }

    #[test]
    fn later_options_win() {
        let node = from_dotlist(["x=1", "x=2"]).expect("dotlist");
        assert_eq!(node.select("x"), Some(&ConfigNode::from(2)));
    }

    #[test]
    fn missing_and_interpolation_values_become_markers() {
        let node = from_dotlist(["a=???", "b=${a}"]).expect("dotlist");
        assert!(node.select("a").expect("a").is_missing());
        assert!(node.select("b").expect("b").is_interpolation());
    }

    #[test]
    fn rejects_malformed_option() {
        assert!(from_dotlist(["no-equals-sign"]).is_err());
        assert!(from_dotlist(["a[0]=1"]).is_err());
    }
}
