//! Structured configuration trees with layered merging, interpolation, and
//! schema-backed validation.
//!
//! A configuration is a tree of [`ConfigNode`] values: ordered mappings,
//! sequences, scalars, and two markers. `"???"` marks a value that must be
//! supplied before use, and `${...}` marks a reference resolved against the
//! rest of the tree or a registered resolver function. Trees come from YAML or
//! JSON text, from [`serde_json::Value`], from declared [`Schema`]s, or from
//! `key=value` option lists, and any number of them can be merged left to
//! right with the rightmost value winning.
//!
//! The usual pipeline is build, merge, resolve, validate:
//!
//! ```
//! use mainspring::{from_yaml, merge, validate, ResolverRegistry};
//!
//! # fn run() -> mainspring::MainspringResult<()> {
//! let base = from_yaml("data:\n  path: '???'\nname: run-${data.path}\n")?;
//! let overrides = from_yaml("data:\n  path: /train\n")?;
//! let merged = merge(&[base, overrides])?;
//! let ready = validate(&merged, &ResolverRegistry::with_builtins())?;
//! assert_eq!(ready.select("name").and_then(|n| n.as_scalar()).map(|s| s.to_text()),
//!            Some("run-/train".to_owned()));
//! # Ok(())
//! # }
//! # run().unwrap();
//! ```

mod error;
mod result_ext;

pub mod deferred;
pub mod fragments;
pub mod merge;
pub mod node;
pub mod options;
pub mod resolve;
pub mod schema;
pub mod text;
pub mod traverse;
pub mod validate;

pub use deferred::{CallArgs, Callable, CallableResolver, Deferred, DeferredArg, TARGET_KEY};
pub use error::{AggregatedErrors, MainspringError};
pub use fragments::FragmentRegistry;
pub use merge::{edit_list, merge, merge_with, MergeOptions};
pub use node::{
    from_value, to_plain, ConfigNode, MappingNode, Scalar, MISSING_TOKEN,
};
pub use options::from_dotlist;
pub use resolve::{resolve, resolve_with, ResolveOptions, ResolverFn, ResolverRegistry};
pub use result_ext::MainspringResultExt;
pub use schema::{
    declared_type, from_schema, FieldSpec, FieldType, Schema, SchemaBuilder, SchemaRegistry,
};
pub use text::{from_json, from_yaml, to_json, to_text, to_yaml, TextFormat};
pub use traverse::{leaves, traverse, Key, ParamSpec, Traverse, TraverseOptions};
pub use validate::{check, validate, validate_with, ErrorMode};

/// Shared result type used throughout the crate.
///
/// Errors are wrapped in [`std::sync::Arc`] so a single failure can be carried
/// both on its own and inside an [`AggregatedErrors`] collection without
/// cloning the underlying error.
pub type MainspringResult<T> = Result<T, std::sync::Arc<MainspringError>>;
