//! Validation: confirms a merged tree is fully specified.
//!
//! A tree passes when no leaf reachable by traversal is a missing marker or
//! an unresolved interpolation. Interactive callers usually want every
//! problem reported at once; library callers usually want the first.

use std::sync::Arc;

use tracing::warn;

use crate::error::MainspringError;
use crate::node::ConfigNode;
use crate::resolve::{self, ResolveOptions, ResolverRegistry};
use crate::traverse::leaves;
use crate::MainspringResult;

/// How validation failures are reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorMode {
    /// Stop at the first problem.
    FailFast,
    /// Collect every problem and report them together.
    #[default]
    Accumulate,
}

/// Walk every leaf of `node` and fail if any is a missing marker or an
/// unresolved interpolation. Performs no resolution of its own.
///
/// # Errors
///
/// Returns [`MainspringError::MissingValue`] or
/// [`MainspringError::UnresolvedInterpolation`] for the first offending
/// leaf in fail-fast mode, or an [`MainspringError::Aggregate`] naming
/// every offending leaf in accumulate mode.
pub fn check(node: &ConfigNode, mode: ErrorMode) -> MainspringResult<()> {
    let mut errors: Vec<Arc<MainspringError>> = Vec::new();
    for spec in leaves(node) {
        let error = if spec.is_missing() {
            warn!(path = %spec.path, "missing value");
            Some(MainspringError::missing_arc(spec.path.as_str()))
        } else if let ConfigNode::Interpolation(expr) = spec.value {
            warn!(path = %spec.path, expression = %expr, "unresolved interpolation");
            Some(Arc::new(MainspringError::unresolved(
                spec.path.as_str(),
                format!("`{expr}` could not be resolved"),
            )))
        } else {
            None
        };
        if let Some(error) = error {
            match mode {
                ErrorMode::FailFast => return Err(error),
                ErrorMode::Accumulate => errors.push(error),
            }
        }
    }
    MainspringError::try_aggregate(errors).map_or(Ok(()), |err| Err(Arc::new(err)))
}

/// Resolve a deep copy of `node` and confirm it is fully specified,
/// returning the resolved copy. The input is never mutated.
///
/// # Errors
///
/// Returns resolution failures (including
/// [`MainspringError::CyclicInterpolation`]) and the accumulated
/// validation failures described on [`check`].
pub fn validate(node: &ConfigNode, resolvers: &ResolverRegistry) -> MainspringResult<ConfigNode> {
    validate_with(node, resolvers, ErrorMode::Accumulate, &ResolveOptions::default())
}

/// As [`validate`], with an explicit reporting mode and resolution bounds.
///
/// # Errors
///
/// As [`validate`].
pub fn validate_with(
    node: &ConfigNode,
    resolvers: &ResolverRegistry,
    mode: ErrorMode,
    options: &ResolveOptions,
) -> MainspringResult<ConfigNode> {
    let mut resolved = node.clone();
    resolve::resolve_with(&mut resolved, resolvers, options)?;
    check(&resolved, mode)?;
    Ok(resolved)
}
