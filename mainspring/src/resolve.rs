//! Interpolation resolution: replaces `${...}` markers with the values
//! they reference.
//!
//! Two forms are understood: path references (`${a.b.c}`, resolved against
//! the tree root) and function references (`${name:arg1,arg2}`, dispatched
//! to a registered resolver function). A string containing interpolations
//! alongside other text has each occurrence spliced in.
//!
//! Resolution runs as a fixpoint: each pass substitutes every interpolation
//! whose target is already concrete, so chains resolve over successive
//! passes. A pass that makes no progress while references still wait on one
//! another is a cycle and terminates with
//! [`MainspringError::CyclicInterpolation`]; references to nonexistent
//! targets or failing resolver functions are left in place for validation
//! to report per path.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::MainspringError;
use crate::fragments::FragmentRegistry;
use crate::node::{
    is_full_interpolation, join_index, join_key, parse_path, ConfigNode, PathSeg, Scalar,
    INTERPOLATION_PATTERN,
};
use crate::MainspringResult;

/// Bounds for the resolution fixpoint.
#[derive(Clone, Copy, Debug)]
pub struct ResolveOptions {
    /// Maximum number of substitution passes before a reference chain is
    /// declared cyclic. Chains longer than this are nearly always cycles;
    /// raise the bound for configurations with extremely deep reference
    /// chains.
    pub max_passes: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self { max_passes: 32 }
    }
}

/// A named function invocable from an interpolation expression.
pub type ResolverFn = Box<dyn Fn(&[String]) -> MainspringResult<ConfigNode> + Send + Sync>;

/// Registry of named resolver functions.
///
/// Explicit and process-scoped: created once at startup, read-mostly
/// thereafter. Tests construct fresh instances.
pub struct ResolverRegistry {
    entries: HashMap<String, ResolverFn>,
}

impl ResolverRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Create a registry carrying the built-in functions: `fullpath`,
    /// `env`, `timestamp` and `sanitize`.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.install_builtins();
        registry
    }

    /// As [`ResolverRegistry::with_builtins`], plus a `ref` function that
    /// recalls named fragments from `fragments`, optionally applying
    /// `path.to.key=value` overrides through the merge engine.
    #[must_use]
    pub fn with_fragments(fragments: Arc<FragmentRegistry>) -> Self {
        let mut registry = Self::with_builtins();
        let install = registry.register("ref", move |args: &[String]| {
            let Some((name, overrides)) = args.split_first() else {
                return Err(Arc::new(MainspringError::invalid_input(
                    "ref expects a fragment name",
                )));
            };
            let node = fragments.lookup(name).ok_or_else(|| {
                Arc::new(MainspringError::invalid_input(format!(
                    "no fragment named `{name}`"
                )))
            })?;
            if overrides.is_empty() {
                Ok(node)
            } else {
                let override_tree = crate::options::from_dotlist(overrides)?;
                crate::merge::merge(&[node, override_tree])
            }
        });
        debug_assert!(install.is_ok(), "ref is not a builtin name");
        registry
    }

    fn install_builtins(&mut self) {
        // Names are fresh in an empty registry, so these cannot collide.
        let _ = self.register("fullpath", |args: &[String]| {
            let path = single_arg("fullpath", args)?;
            Ok(ConfigNode::Scalar(Scalar::Str(fullpath(&path)?)))
        });
        let _ = self.register("env", |args: &[String]| {
            let name = single_arg("env", args)?;
            // Unset variables resolve to the empty string.
            Ok(ConfigNode::Scalar(Scalar::Str(
                std::env::var(&name).unwrap_or_default(),
            )))
        });
        let _ = self.register("timestamp", |args: &[String]| {
            let fmt = args.first().map_or("%Y-%m-%d_%H-%M-%S", String::as_str);
            Ok(ConfigNode::Scalar(Scalar::Str(
                chrono::Utc::now().format(fmt).to_string(),
            )))
        });
        let _ = self.register("sanitize", |args: &[String]| {
            let name = single_arg("sanitize", args)?;
            Ok(ConfigNode::Scalar(Scalar::Str(sanitize(&name))))
        });
    }

    /// Register `function` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`MainspringError::InvalidInput`] if the name is taken.
    pub fn register<F>(&mut self, name: impl Into<String>, function: F) -> MainspringResult<()>
    where
        F: Fn(&[String]) -> MainspringResult<ConfigNode> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(Arc::new(MainspringError::invalid_input(format!(
                "resolver `{name}` is already registered"
            ))));
        }
        self.entries.insert(name, Box::new(function));
        Ok(())
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Invoke the resolver function `name` with `args`.
    ///
    /// # Errors
    ///
    /// Returns [`MainspringError::InvalidInput`] for an unknown name, or
    /// whatever the function itself fails with.
    pub fn call(&self, name: &str, args: &[String]) -> MainspringResult<ConfigNode> {
        let function = self.entries.get(name).ok_or_else(|| {
            Arc::new(MainspringError::invalid_input(format!(
                "no resolver named `{name}`"
            )))
        })?;
        function(args)
    }

    /// Names of all registered resolver functions, unordered.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }
}

fn single_arg(name: &str, args: &[String]) -> MainspringResult<String> {
    match args {
        [only] => Ok(only.clone()),
        _ => Err(Arc::new(MainspringError::invalid_input(format!(
            "{name} expects exactly one argument, got {}",
            args.len()
        )))),
    }
}

/// Resolve implicit and relative path components to an absolute path,
/// expanding a leading `~`.
fn fullpath(path: &str) -> MainspringResult<String> {
    let expanded = if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| std::path::PathBuf::from(path))
    } else {
        std::path::PathBuf::from(path)
    };
    let absolute = std::path::absolute(&expanded).map_err(|e| {
        Arc::new(MainspringError::invalid_input(format!(
            "cannot make `{path}` absolute: {e}"
        )))
    })?;
    Ok(absolute.display().to_string())
}

/// Replace characters unsafe in filenames with underscores.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Resolve every interpolation in `root` in place, with default bounds.
///
/// # Errors
///
/// Returns [`MainspringError::CyclicInterpolation`] when references form a
/// cycle. Unresolvable references (nonexistent targets, failing resolver
/// functions) are left in place for validation to report.
pub fn resolve(root: &mut ConfigNode, resolvers: &ResolverRegistry) -> MainspringResult<()> {
    resolve_with(root, resolvers, &ResolveOptions::default())
}

/// As [`resolve`], with explicit bounds.
///
/// # Errors
///
/// As [`resolve`].
pub fn resolve_with(
    root: &mut ConfigNode,
    resolvers: &ResolverRegistry,
    options: &ResolveOptions,
) -> MainspringResult<()> {
    for pass in 0..options.max_passes {
        let pending = collect_pending(root);
        if pending.is_empty() {
            return Ok(());
        }
        let mut progressed = false;
        for item in &pending {
            // An earlier substitution this pass may have replaced a whole
            // subtree; skip slots that no longer hold this expression.
            let unchanged = matches!(
                root.select_segs(&item.segs),
                Some(ConfigNode::Interpolation(expr)) if *expr == item.expr
            );
            if !unchanged {
                continue;
            }
            if let Outcome::Value(value) = eval_expression(root, &item.expr, resolvers) {
                if let Some(slot) = root.select_segs_mut(&item.segs) {
                    debug!(path = %item.path, "resolved interpolation");
                    *slot = value;
                    progressed = true;
                }
            }
        }
        if !progressed {
            return classify_stall(root, &pending, pass);
        }
    }
    Err(Arc::new(MainspringError::CyclicInterpolation {
        passes: options.max_passes,
    }))
}

struct Pending {
    segs: Vec<PathSeg>,
    path: String,
    expr: String,
}

fn collect_pending(root: &ConfigNode) -> Vec<Pending> {
    let mut out = Vec::new();
    collect_into(root, &mut Vec::new(), "", &mut out);
    out
}

fn collect_into(node: &ConfigNode, segs: &mut Vec<PathSeg>, path: &str, out: &mut Vec<Pending>) {
    match node {
        ConfigNode::Interpolation(expr) => out.push(Pending {
            segs: segs.clone(),
            path: path.to_owned(),
            expr: expr.clone(),
        }),
        ConfigNode::Mapping(m) => {
            for (key, value) in m {
                segs.push(PathSeg::Key(key.clone()));
                collect_into(value, segs, &join_key(path, key), out);
                segs.pop();
            }
        }
        ConfigNode::Sequence(items) => {
            for (i, value) in items.iter().enumerate() {
                segs.push(PathSeg::Index(i));
                collect_into(value, segs, &join_index(path, i), out);
                segs.pop();
            }
        }
        _ => {}
    }
}

enum Outcome {
    /// The expression resolved to this value.
    Value(ConfigNode),
    /// The expression waits on another interpolation; try again next pass.
    Defer,
    /// The expression can never resolve; leave it for validation.
    Fail,
}

fn eval_expression(root: &ConfigNode, expr: &str, resolvers: &ResolverRegistry) -> Outcome {
    if is_full_interpolation(expr) {
        let inner = &expr[2..expr.len() - 1];
        return eval_reference(root, inner, resolvers);
    }

    // Embedded form: splice each occurrence into the surrounding text.
    let mut out = String::new();
    let mut last = 0;
    for m in INTERPOLATION_PATTERN.find_iter(expr) {
        out.push_str(&expr[last..m.start()]);
        let inner = &expr[m.start() + 2..m.end() - 1];
        match eval_reference(root, inner, resolvers) {
            Outcome::Value(ConfigNode::Scalar(s)) => out.push_str(&s.to_text()),
            Outcome::Value(_) => return Outcome::Fail,
            Outcome::Defer => return Outcome::Defer,
            Outcome::Fail => return Outcome::Fail,
        }
        last = m.end();
    }
    out.push_str(&expr[last..]);
    Outcome::Value(ConfigNode::Scalar(Scalar::Str(out)))
}

enum Reference {
    Path(Vec<PathSeg>),
    Function { name: String, args: Vec<String> },
}

fn parse_reference(inner: &str) -> Option<Reference> {
    let inner = inner.trim();
    if let Some((name, arg_text)) = inner.split_once(':') {
        let args = if arg_text.trim().is_empty() {
            Vec::new()
        } else {
            arg_text
                .split(',')
                .map(|a| unquote(a.trim()).to_owned())
                .collect()
        };
        Some(Reference::Function {
            name: name.trim().to_owned(),
            args,
        })
    } else {
        parse_path(inner).ok().map(Reference::Path)
    }
}

fn unquote(text: &str) -> &str {
    let stripped = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .or_else(|| text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')));
    stripped.unwrap_or(text)
}

fn eval_reference(root: &ConfigNode, inner: &str, resolvers: &ResolverRegistry) -> Outcome {
    match parse_reference(inner) {
        None => Outcome::Fail,
        Some(Reference::Path(segs)) => match root.select_segs(&segs) {
            None | Some(ConfigNode::Missing) => Outcome::Fail,
            Some(ConfigNode::Interpolation(_)) => Outcome::Defer,
            Some(target) if has_interpolation(target) => Outcome::Defer,
            Some(target) if has_missing(target) => Outcome::Fail,
            Some(target) => Outcome::Value(target.clone()),
        },
        Some(Reference::Function { name, args }) => match resolvers.call(&name, &args) {
            Ok(value) => Outcome::Value(value),
            Err(error) => {
                debug!(resolver = %name, %error, "resolver function failed");
                Outcome::Fail
            }
        },
    }
}

fn has_interpolation(node: &ConfigNode) -> bool {
    match node {
        ConfigNode::Interpolation(_) => true,
        ConfigNode::Mapping(m) => m.iter().any(|(_, v)| has_interpolation(v)),
        ConfigNode::Sequence(items) => items.iter().any(has_interpolation),
        _ => false,
    }
}

fn has_missing(node: &ConfigNode) -> bool {
    match node {
        ConfigNode::Missing => true,
        ConfigNode::Mapping(m) => m.iter().any(|(_, v)| has_missing(v)),
        ConfigNode::Sequence(items) => items.iter().any(has_missing),
        _ => false,
    }
}

/// Outcome of walking `segs` from `root` without evaluating anything.
enum Lookup<'a> {
    /// The full path leads to this node.
    Found(&'a ConfigNode),
    /// The walk stopped at an interpolation occupying this prefix path.
    Blocked(String),
    /// A step has no counterpart in the tree.
    Absent,
}

fn locate<'a>(root: &'a ConfigNode, segs: &[PathSeg]) -> Lookup<'a> {
    let mut current = root;
    let mut path = String::new();
    for seg in segs {
        if current.is_interpolation() {
            return Lookup::Blocked(path);
        }
        let next = match (current, seg) {
            (ConfigNode::Mapping(m), PathSeg::Key(key)) => m.get(key),
            (ConfigNode::Sequence(items), PathSeg::Index(i)) => items.get(*i),
            _ => None,
        };
        let Some(next) = next else {
            return Lookup::Absent;
        };
        path = match seg {
            PathSeg::Key(key) => join_key(&path, key),
            PathSeg::Index(i) => join_index(&path, *i),
        };
        current = next;
    }
    Lookup::Found(current)
}

/// The fixpoint made no progress. Decide whether the outstanding
/// interpolations merely failed (left for validation) or wait on one
/// another, which is a cycle.
fn classify_stall(root: &ConfigNode, pending: &[Pending], passes: usize) -> MainspringResult<()> {
    let mut failed = vec![false; pending.len()];
    let mut blockers: Vec<Vec<usize>> = vec![Vec::new(); pending.len()];

    for (i, item) in pending.iter().enumerate() {
        for inner in expression_refs(&item.expr) {
            match parse_reference(&inner) {
                // At a stall a function reference (or unparsable
                // expression) has already failed.
                None | Some(Reference::Function { .. }) => failed[i] = true,
                Some(Reference::Path(segs)) => match locate(root, &segs) {
                    Lookup::Absent => failed[i] = true,
                    // The lookup cannot proceed until the interpolation at
                    // `step` settles: wait on every pending leaf there.
                    Lookup::Blocked(step) => {
                        blockers[i].extend(
                            pending
                                .iter()
                                .enumerate()
                                .filter_map(|(j, p)| within(&p.path, &step).then_some(j)),
                        );
                    }
                    Lookup::Found(target) if has_interpolation(target) => {
                        let target_path = inner.trim().to_owned();
                        blockers[i].extend(pending.iter().enumerate().filter_map(|(j, p)| {
                            within(&p.path, &target_path).then_some(j)
                        }));
                    }
                    Lookup::Found(target) if has_missing(target) => failed[i] = true,
                    // A concrete target cannot be the reason for the stall.
                    Lookup::Found(_) => {}
                },
            }
        }
    }

    // A leaf blocked on a failed leaf can never resolve either.
    loop {
        let mut changed = false;
        for i in 0..pending.len() {
            if !failed[i] && blockers[i].iter().any(|&j| failed[j]) {
                failed[i] = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let cyclic = (0..pending.len()).any(|i| !failed[i] && !blockers[i].is_empty());
    if cyclic {
        Err(Arc::new(MainspringError::CyclicInterpolation { passes }))
    } else {
        // Everything outstanding is a plain failure; validation reports
        // each path.
        Ok(())
    }
}

/// Whether `path` equals `target` or lies inside the subtree rooted there.
fn within(path: &str, target: &str) -> bool {
    path == target
        || path
            .strip_prefix(target)
            .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
}

fn expression_refs(expr: &str) -> Vec<String> {
    INTERPOLATION_PATTERN
        .captures_iter(expr)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_owned()))
        .collect()
}
