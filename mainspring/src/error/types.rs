//! Primary error enum for configuration merging and resolution flows.

use thiserror::Error;

use super::aggregate::AggregatedErrors;

/// Errors that can occur while building, merging, resolving or validating
/// configuration trees.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MainspringError {
    /// A value could not be converted into a configuration tree, or an
    /// operation was handed an argument of the wrong node kind.
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Human-readable explanation of what was rejected.
        message: String,
    },

    /// A key was supplied that the bound schema does not declare.
    #[error("schema `{schema}` does not declare key `{key}` at `{path}`")]
    SchemaViolation {
        /// Name of the schema that rejected the key.
        schema: String,
        /// The undeclared key.
        key: String,
        /// Dotted path of the mapping that was being merged into.
        path: String,
    },

    /// Two trees could not be reconciled at a given path.
    #[error("cannot merge {incoming} into {existing} at `{path}`")]
    StructuralMerge {
        /// Dotted path at which the mismatch occurred.
        path: String,
        /// Node kind already present in the accumulator.
        existing: &'static str,
        /// Node kind the override tried to merge in.
        incoming: &'static str,
    },

    /// Validation found a required value that was never supplied.
    #[error("missing value for `{path}`")]
    MissingValue {
        /// Dotted path of the missing leaf.
        path: String,
    },

    /// An interpolation's target could not be found or its resolver
    /// function failed.
    #[error("interpolation for `{path}` not resolved: {message}")]
    UnresolvedInterpolation {
        /// Dotted path of the unresolved leaf.
        path: String,
        /// Why the expression could not be resolved.
        message: String,
    },

    /// Interpolation references form a cycle.
    #[error("cyclic interpolation detected after {passes} resolution passes")]
    CyclicInterpolation {
        /// Number of resolution passes completed before giving up.
        passes: usize,
    },

    /// Out-of-range index during list editing.
    #[error("list edit index {index} out of range for sequence of length {len}")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Length of the sequence being edited.
        len: usize,
    },

    /// JSON serialisation or deserialisation failure.
    #[error("JSON error: {0}")]
    Json(#[from] Box<serde_json::Error>),

    /// YAML serialisation or deserialisation failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] Box<serde_yaml::Error>),

    /// Multiple errors occurred during a single validation or merge.
    #[error("multiple configuration errors:\n{0}")]
    Aggregate(Box<AggregatedErrors>),
}
