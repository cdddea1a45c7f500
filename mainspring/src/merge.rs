//! The merge engine: combines layered configuration trees under defined
//! precedence.
//!
//! The rightmost override always wins on direct conflicts, with one
//! reconciliation rule applied ahead of the generic structural merge:
//! type-mismatch pre-seeding. Where an override introduces a mapping at a
//! path the accumulator still holds as missing or scalar, and the schema
//! declares a record type there, the record's defaults are materialised
//! first so the structural merge never has to combine a mapping with a
//! non-mapping.
//!
//! The generic merge then replaces scalars rightmost-wins, merges mappings
//! key-by-key, and replaces sequences wholesale. An override whose value is
//! a raw `${...}` expression replaces the accumulator value outright;
//! "this field is now a reference" never deep-merges with whatever lived
//! there before. Operands are never mutated; the accumulator starts as a
//! deep copy of the first tree.

use std::sync::Arc;

use tracing::debug;

use crate::error::MainspringError;
use crate::node::{join_key, ConfigNode, MappingNode};
use crate::resolve::{self, ResolveOptions, ResolverRegistry};
use crate::schema::{declared_type, from_schema};
use crate::validate::{self, ErrorMode};
use crate::MainspringResult;

/// Optional post-passes applied after all overrides are folded in.
#[derive(Default)]
pub struct MergeOptions<'a> {
    /// When set, run the interpolation resolver over the merged tree.
    pub resolvers: Option<&'a ResolverRegistry>,
    /// When true, fail the merge if missing or unresolved values remain.
    pub validate: bool,
    /// How validation reports failures.
    pub error_mode: ErrorMode,
    /// Bounds for the resolution fixpoint.
    pub resolve_options: ResolveOptions,
}

/// Merge `configs` left to right; the rightmost tree wins on conflicts.
///
/// With no arguments an empty mapping is returned.
///
/// # Errors
///
/// Returns [`MainspringError::StructuralMerge`] when two trees cannot be
/// reconciled at a path, or [`MainspringError::SchemaViolation`] when an
/// override supplies a key a closed schema does not declare.
pub fn merge(configs: &[ConfigNode]) -> MainspringResult<ConfigNode> {
    merge_with(configs, &MergeOptions::default())
}

/// [`merge`] with resolution and validation post-passes.
///
/// # Errors
///
/// As [`merge`], plus resolution and validation failures when the
/// corresponding options are set.
pub fn merge_with(
    configs: &[ConfigNode],
    options: &MergeOptions<'_>,
) -> MainspringResult<ConfigNode> {
    let mut merged = match configs.split_first() {
        None => ConfigNode::mapping(),
        Some((first, overrides)) => {
            let mut acc = first.clone();
            for over in overrides {
                fold(&mut acc, over)?;
            }
            acc
        }
    };

    if let Some(resolvers) = options.resolvers {
        resolve::resolve_with(&mut merged, resolvers, &options.resolve_options)?;
    }
    if options.validate {
        validate::check(&merged, options.error_mode)?;
    }
    Ok(merged)
}

fn fold(acc: &mut ConfigNode, over: &ConfigNode) -> MainspringResult<()> {
    let work = over.clone();
    if let (ConfigNode::Mapping(acc_map), ConfigNode::Mapping(work_map)) = (&mut *acc, &work) {
        seed_declared_nodes(acc_map, work_map, "")?;
    }
    merge_node(acc, work, "")
}

/// The pre-seeding rule: walk the override and materialise declared record
/// types wherever the override brings a mapping the accumulator has not
/// realised yet.
fn seed_declared_nodes(
    acc: &mut MappingNode,
    over: &MappingNode,
    path: &str,
) -> MainspringResult<()> {
    for (key, over_value) in over {
        let ConfigNode::Mapping(over_child) = over_value else {
            continue;
        };
        let child_path = join_key(path, key);

        let acc_has_mapping = matches!(acc.get(key), Some(ConfigNode::Mapping(_)));
        if !acc_has_mapping {
            let seedable = matches!(
                acc.get(key),
                None | Some(ConfigNode::Missing | ConfigNode::Scalar(_))
            );
            if seedable {
                if let Some(record) = declared_type(acc, key).and_then(|t| t.record()) {
                    debug!(path = %child_path, schema = record.name(), "seeding declared record");
                    acc.insert(key.clone(), from_schema(&record));
                }
            }
        }

        if let Some(ConfigNode::Mapping(acc_child)) = acc.get_mut(key) {
            seed_declared_nodes(acc_child, over_child, &child_path)?;
        }
    }
    Ok(())
}

/// The generic structural merge.
fn merge_node(acc: &mut ConfigNode, over: ConfigNode, path: &str) -> MainspringResult<()> {
    match over {
        // A missing override never erases a value already present.
        ConfigNode::Missing => Ok(()),
        // "This field is now a reference": replaces outright, even over a
        // mapping.
        over @ ConfigNode::Interpolation(_) => {
            *acc = over;
            Ok(())
        }
        over @ ConfigNode::Scalar(_) => {
            *acc = over;
            Ok(())
        }
        ConfigNode::Sequence(items) => {
            if matches!(acc, ConfigNode::Mapping(_)) {
                return Err(Arc::new(MainspringError::structural(
                    path, "mapping", "sequence",
                )));
            }
            // Last writer wins on the whole list; partial edits go through
            // `edit_list`.
            *acc = ConfigNode::Sequence(items);
            Ok(())
        }
        ConfigNode::Mapping(over_map) => match acc {
            ConfigNode::Mapping(acc_map) => merge_mapping(acc_map, over_map, path),
            ConfigNode::Sequence(_) => Err(Arc::new(MainspringError::structural(
                path, "sequence", "mapping",
            ))),
            // No schema escape hatch fired, so the mapping replaces the
            // scalar or marker wholesale.
            _ => {
                *acc = ConfigNode::Mapping(over_map);
                Ok(())
            }
        },
    }
}

fn merge_mapping(acc: &mut MappingNode, over: MappingNode, path: &str) -> MainspringResult<()> {
    if let Some(schema) = acc.schema() {
        if !schema.is_open() {
            for key in over.keys() {
                if schema.field(key).is_none() {
                    return Err(Arc::new(MainspringError::SchemaViolation {
                        schema: schema.name().to_owned(),
                        key: key.clone(),
                        path: path.to_owned(),
                    }));
                }
            }
        }
    }

    for (key, value) in over {
        let child_path = join_key(path, &key);
        match acc.get_mut(&key) {
            Some(existing) => merge_node(existing, value, &child_path)?,
            None => acc.insert(key, value),
        }
    }
    Ok(())
}

/// Targeted by-index replacement within a sequence, for callers that need
/// partial list edits rather than the merge engine's whole-list semantics.
///
/// Editor keys are parsed as integer indices.
///
/// # Errors
///
/// Returns [`MainspringError::InvalidInput`] if `seq` is not a sequence or a
/// key is not an integer, and [`MainspringError::IndexOutOfRange`] for an
/// index past the end of the sequence.
pub fn edit_list(seq: &ConfigNode, edits: &MappingNode) -> MainspringResult<ConfigNode> {
    let ConfigNode::Sequence(items) = seq else {
        return Err(Arc::new(MainspringError::invalid_input(format!(
            "edit_list expects a sequence, got {}",
            seq.kind()
        ))));
    };
    let mut out = items.clone();
    let len = out.len();
    for (key, value) in edits {
        let index: usize = key.parse().map_err(|_| {
            Arc::new(MainspringError::invalid_input(format!(
                "list edit key `{key}` is not an integer index"
            )))
        })?;
        let slot = out
            .get_mut(index)
            .ok_or_else(|| Arc::new(MainspringError::IndexOutOfRange { index, len }))?;
        *slot = value.clone();
    }
    Ok(ConfigNode::Sequence(out))
}
