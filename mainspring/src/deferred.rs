//! Deferred construction of objects described by configuration.
//!
//! A mapping gains construction semantics when it carries a `_target_` key
//! naming a callable. The remaining entries become keyword arguments, and any
//! nested mapping with its own `_target_` becomes a nested call that is forced
//! first. Resolution of the target name to an actual callable is delegated to
//! a [`CallableResolver`], so the library stays agnostic about where callables
//! come from.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::MainspringError;
use crate::node::ConfigNode;
use crate::MainspringResult;

/// Key that marks a mapping as a deferred call.
pub const TARGET_KEY: &str = "_target_";

/// Arguments handed to a callable when a deferred call is invoked.
#[derive(Debug, Default)]
pub struct CallArgs {
    /// Positional arguments, in declaration order.
    pub positional: Vec<ConfigNode>,
    /// Keyword arguments, in declaration order.
    pub keyword: IndexMap<String, ConfigNode>,
}

/// A callable that a [`CallableResolver`] hands back for a target name.
pub type Callable = Box<dyn Fn(CallArgs) -> MainspringResult<ConfigNode> + Send + Sync>;

/// Maps target names to callables.
pub trait CallableResolver {
    /// Look up the callable registered under `target`.
    ///
    /// # Errors
    ///
    /// Returns an error when no callable is known under that name.
    fn resolve_callable(&self, target: &str) -> MainspringResult<Callable>;
}

/// One argument of a deferred call.
#[derive(Debug, Clone, PartialEq)]
pub enum DeferredArg {
    /// A plain configuration value, passed through as-is.
    Value(ConfigNode),
    /// A nested call, forced before the enclosing call runs.
    Call(Box<Deferred>),
}

/// A call description, either built programmatically or recovered from a
/// `_target_` mapping (which carries keyword arguments only).
#[derive(Debug, Clone, PartialEq)]
pub struct Deferred {
    target: String,
    args: Vec<DeferredArg>,
    kwargs: IndexMap<String, DeferredArg>,
}

impl Deferred {
    /// Start an empty call description for `target`.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            args: Vec::new(),
            kwargs: IndexMap::new(),
        }
    }

    /// Append a positional argument.
    #[must_use]
    pub fn with_arg(mut self, arg: DeferredArg) -> Self {
        self.args.push(arg);
        self
    }

    /// Set a keyword argument, preserving insertion order.
    #[must_use]
    pub fn with_kwarg(mut self, key: impl Into<String>, arg: DeferredArg) -> Self {
        self.kwargs.insert(key.into(), arg);
        self
    }

    /// Name of the callable this call targets.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Positional arguments in declaration order.
    #[must_use]
    pub fn args(&self) -> &[DeferredArg] {
        &self.args
    }

    /// Keyword arguments in declaration order.
    pub fn kwargs(&self) -> impl Iterator<Item = (&String, &DeferredArg)> {
        self.kwargs.iter()
    }

    /// Interpret `node` as a deferred call.
    ///
    /// The node must be a mapping whose `_target_` entry is a string. Marker
    /// values among the arguments are rejected: the tree should be resolved
    /// and validated before construction.
    ///
    /// # Errors
    ///
    /// Returns [`MainspringError::InvalidInput`] when the node is not a
    /// well-formed call description, and [`MainspringError::MissingValue`] or
    /// [`MainspringError::UnresolvedInterpolation`] when an argument still
    /// carries a marker.
    pub fn from_node(node: &ConfigNode) -> MainspringResult<Self> {
        let mapping = node.as_mapping().ok_or_else(|| {
            Arc::new(MainspringError::invalid_input(
                "a deferred call must be described by a mapping",
            ))
        })?;
        let target = match mapping.get(TARGET_KEY) {
            Some(ConfigNode::Scalar(crate::node::Scalar::Str(name))) => name.clone(),
            Some(_) => {
                return Err(Arc::new(MainspringError::invalid_input(format!(
                    "`{TARGET_KEY}` must be a string naming a callable"
                ))))
            }
            None => {
                return Err(Arc::new(MainspringError::invalid_input(format!(
                    "mapping has no `{TARGET_KEY}` entry"
                ))))
            }
        };
        let mut call = Self::new(target);
        for (key, value) in mapping {
            if key == TARGET_KEY {
                continue;
            }
            call = call.with_kwarg(key.clone(), Self::arg_from_node(key, value)?);
        }
        Ok(call)
    }

    fn arg_from_node(key: &str, node: &ConfigNode) -> MainspringResult<DeferredArg> {
        match node {
            ConfigNode::Missing => Err(MainspringError::missing_arc(key)),
            ConfigNode::Interpolation(expr) => Err(Arc::new(MainspringError::unresolved(
                key,
                format!("argument still carries interpolation `{expr}`"),
            ))),
            ConfigNode::Mapping(m) if m.get(TARGET_KEY).is_some() => {
                Ok(DeferredArg::Call(Box::new(Self::from_node(node)?)))
            }
            other => Ok(DeferredArg::Value(other.clone())),
        }
    }

    /// Run the call, forcing nested calls first.
    ///
    /// # Errors
    ///
    /// Propagates resolver and callable errors.
    pub fn invoke(&self, resolver: &dyn CallableResolver) -> MainspringResult<ConfigNode> {
        let callable = resolver.resolve_callable(&self.target)?;
        let mut call = CallArgs::default();
        for arg in &self.args {
            call.positional.push(Self::force(arg, resolver)?);
        }
        for (key, arg) in &self.kwargs {
            call.keyword.insert(key.clone(), Self::force(arg, resolver)?);
        }
        callable(call)
    }

    fn force(arg: &DeferredArg, resolver: &dyn CallableResolver) -> MainspringResult<ConfigNode> {
        match arg {
            DeferredArg::Value(node) => Ok(node.clone()),
            DeferredArg::Call(nested) => nested.invoke(resolver),
        }
    }
}

/// Interpret `node` as a deferred call and run it in one step.
///
/// # Errors
///
/// Propagates [`Deferred::from_node`] and [`Deferred::invoke`] errors.
pub fn invoke(node: &ConfigNode, resolver: &dyn CallableResolver) -> MainspringResult<ConfigNode> {
    Deferred::from_node(node)?.invoke(resolver)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::node::from_value;

    type Factory = Arc<dyn Fn(CallArgs) -> MainspringResult<ConfigNode> + Send + Sync>;

    struct TableResolver {
        table: HashMap<String, Factory>,
    }

    impl TableResolver {
        fn new() -> Self {
            let mut table: HashMap<String, Factory> = HashMap::new();
            table.insert(
                "greeting".into(),
                Arc::new(|args: CallArgs| {
                    let name = match args.keyword.get("name") {
                        Some(ConfigNode::Scalar(crate::node::Scalar::Str(s))) => s.clone(),
                        _ => {
                            return Err(Arc::new(MainspringError::invalid_input("name required")))
                        }
                    };
                    Ok(ConfigNode::from(format!("hello, {name}").as_str()))
                }),
            );
            table.insert(
                "list".into(),
                Arc::new(|args: CallArgs| Ok(ConfigNode::Sequence(args.positional))),
            );
            table.insert(
                "wrap".into(),
                Arc::new(|args: CallArgs| {
                    Ok(ConfigNode::Sequence(args.keyword.into_iter().map(|(_, v)| v).collect()))
                }),
            );
            Self { table }
        }
    }

    impl CallableResolver for TableResolver {
        fn resolve_callable(&self, target: &str) -> MainspringResult<Callable> {
            let factory = self.table.get(target).cloned().ok_or_else(|| {
                Arc::new(MainspringError::invalid_input(format!(
                    "unknown callable `{target}`"
                )))
            })?;
            Ok(Box::new(move |args| factory(args)))
        }
    }

    #[test]
    fn invokes_a_simple_call() {
        let node = from_value(json!({"_target_": "greeting", "name": "ada"})).expect("tree");
        let out = invoke(&node, &TableResolver::new()).expect("invoke");
        assert_eq!(out, ConfigNode::from("hello, ada"));
    }

    #[test]
    fn nested_calls_are_forced_first() {
        let node = from_value(json!({
            "_target_": "wrap",
            "inner": {"_target_": "greeting", "name": "ada"},
            "extra": 3,
        }))
        .expect("tree");
        let out = invoke(&node, &TableResolver::new()).expect("invoke");
        assert_eq!(
            out,
            ConfigNode::Sequence(vec![ConfigNode::from("hello, ada"), ConfigNode::from(3)])
        );
    }

    #[test]
    fn builder_calls_pass_positional_arguments() {
        let call = Deferred::new("list")
            .with_arg(DeferredArg::Value(ConfigNode::from(1)))
            .with_arg(DeferredArg::Call(Box::new(
                Deferred::new("greeting")
                    .with_kwarg("name", DeferredArg::Value(ConfigNode::from("ada"))),
            )));
        let out = call.invoke(&TableResolver::new()).expect("invoke");
        assert_eq!(
            out,
            ConfigNode::Sequence(vec![ConfigNode::from(1), ConfigNode::from("hello, ada")])
        );
    }

    #[test]
    fn rejects_markers_among_arguments() {
        let missing = from_value(json!({"_target_": "greeting", "name": "???"})).expect("tree");
        assert!(matches!(
            &*Deferred::from_node(&missing).expect_err("missing"),
            MainspringError::MissingValue { .. }
        ));
        let dangling =
            from_value(json!({"_target_": "greeting", "name": "${who}"})).expect("tree");
        assert!(matches!(
            &*Deferred::from_node(&dangling).expect_err("interpolation"),
            MainspringError::UnresolvedInterpolation { .. }
        ));
    }

    #[test]
    fn rejects_non_string_target() {
        let node = from_value(json!({"_target_": 5})).expect("tree");
        assert!(Deferred::from_node(&node).is_err());
    }

    #[test]
    fn unknown_target_surfaces_resolver_error() {
        let node = from_value(json!({"_target_": "nope"})).expect("tree");
        assert!(invoke(&node, &TableResolver::new()).is_err());
    }
}
