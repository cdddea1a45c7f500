//! Depth-first traversal of configuration trees.
//!
//! [`traverse`] produces a lazy, restartable sequence of [`ParamSpec`]
//! views. Mapping children are visited in key-insertion order and sequence
//! children in index order; paths use dotted keys and bracketed indices
//! (`a.b[2].c`). Missing markers and interpolations are yielded as-is;
//! interpolations are never resolved mid-traversal, so the merge engine and
//! the resolver both see raw placeholders.

use crate::node::{join_index, join_key, ConfigNode};

/// Key of a node within its parent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Key {
    /// Mapping key.
    Name(String),
    /// Sequence index.
    Index(usize),
}

/// A path-annotated view of one node in a tree. Produced fresh on every
/// traversal; never stored long-term.
#[derive(Debug)]
pub struct ParamSpec<'a> {
    /// Key within the parent, or `None` for the root.
    pub key: Option<Key>,
    /// Dotted path from the root (`""` for the root itself).
    pub path: String,
    /// The node at this position.
    pub value: &'a ConfigNode,
    /// Owning parent node, or `None` for the root.
    pub parent: Option<&'a ConfigNode>,
}

impl ParamSpec<'_> {
    /// Whether this position holds the missing marker.
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        self.value.is_missing()
    }

    /// Whether this position holds an unresolved interpolation.
    #[must_use]
    pub const fn is_interpolation(&self) -> bool {
        self.value.is_interpolation()
    }

    /// Whether this position holds a container node.
    #[must_use]
    pub const fn is_node(&self) -> bool {
        self.value.is_container()
    }
}

/// What a traversal yields.
#[derive(Clone, Copy, Debug)]
pub struct TraverseOptions {
    /// Yield container nodes themselves.
    pub include_nodes: bool,
    /// Yield leaves (scalars and markers).
    pub include_leaves: bool,
    /// Yield the root node first, with an empty path.
    pub include_root: bool,
}

impl Default for TraverseOptions {
    fn default() -> Self {
        Self {
            include_nodes: false,
            include_leaves: true,
            include_root: false,
        }
    }
}

struct Frame<'a> {
    node: &'a ConfigNode,
    key: Option<Key>,
    path: String,
    parent: Option<&'a ConfigNode>,
}

/// Depth-first, pre-order iterator over a tree.
pub struct Traverse<'a> {
    stack: Vec<Frame<'a>>,
    options: TraverseOptions,
}

/// Traverse `node` depth-first with the given options.
#[must_use]
pub fn traverse(node: &ConfigNode, options: TraverseOptions) -> Traverse<'_> {
    Traverse {
        stack: vec![Frame {
            node,
            key: None,
            path: String::new(),
            parent: None,
        }],
        options,
    }
}

/// Traverse yielding only leaves, the most common mode.
#[must_use]
pub fn leaves(node: &ConfigNode) -> Traverse<'_> {
    traverse(node, TraverseOptions::default())
}

impl<'a> Iterator for Traverse<'a> {
    type Item = ParamSpec<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.pop()?;
            self.push_children(&frame);

            let is_root = frame.parent.is_none();
            let wanted = if is_root {
                self.options.include_root
            } else if frame.node.is_container() {
                self.options.include_nodes
            } else {
                self.options.include_leaves
            };
            if wanted {
                return Some(ParamSpec {
                    key: frame.key,
                    path: frame.path,
                    value: frame.node,
                    parent: frame.parent,
                });
            }
        }
    }
}

impl<'a> Traverse<'a> {
    fn push_children(&mut self, frame: &Frame<'a>) {
        match frame.node {
            ConfigNode::Mapping(m) => {
                let mut children: Vec<Frame<'a>> = m
                    .iter()
                    .map(|(k, v)| Frame {
                        node: v,
                        key: Some(Key::Name(k.clone())),
                        path: join_key(&frame.path, k),
                        parent: Some(frame.node),
                    })
                    .collect();
                children.reverse();
                self.stack.extend(children);
            }
            ConfigNode::Sequence(items) => {
                let mut children: Vec<Frame<'a>> = items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| Frame {
                        node: v,
                        key: Some(Key::Index(i)),
                        path: join_index(&frame.path, i),
                        parent: Some(frame.node),
                    })
                    .collect();
                children.reverse();
                self.stack.extend(children);
            }
            _ => {}
        }
    }
}
