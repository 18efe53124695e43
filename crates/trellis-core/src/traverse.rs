//! Pre-order traversal with repeater rows expanded in place.

use std::sync::Arc;

use tracing::trace;

use crate::context::SessionContext;
use crate::error::{Error, Result};
use crate::holder::{self, push_context};
use crate::node::{ComponentTree, NodeRef};
use crate::NodeId;

/// What the walk does after [`TreeVisitor::enter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    SkipChildren,
    Stop,
}

/// Callbacks for [`walk`]. Both run with the node's row context active, so
/// model reads and writes resolve the way they would for that row.
pub trait TreeVisitor {
    fn enter(&mut self, node: NodeRef<'_>) -> Result<Visit>;

    /// Runs after the node's subtree, including when children were skipped.
    fn leave(&mut self, node: NodeRef<'_>) -> Result<()> {
        let _ = node;
        Ok(())
    }
}

/// Walks the subtree at `start` in pre-order. The children of a repeater are
/// visited once per row, in row order, with that row's context pushed.
/// Returns `false` if the visitor stopped the walk.
pub fn walk(tree: &ComponentTree, start: NodeId, visitor: &mut dyn TreeVisitor) -> Result<bool> {
    if holder::current().is_none() {
        return Err(Error::NoActiveContext { node: start });
    }
    visit(tree, start, visitor)
}

fn visit(tree: &ComponentTree, node: NodeId, visitor: &mut dyn TreeVisitor) -> Result<bool> {
    let handle = tree.node(node)?;
    trace!(node, kind = handle.kind(), "visit");
    match visitor.enter(handle)? {
        Visit::Stop => return Ok(false),
        Visit::SkipChildren => {
            visitor.leave(handle)?;
            return Ok(true);
        }
        Visit::Continue => {}
    }

    if handle.component().as_repeater().is_some() {
        for row in tree.repeater(node)?.row_contexts()? {
            let _guard = push_context(row);
            if !visit_children(tree, node, visitor)? {
                return Ok(false);
            }
        }
    } else if !visit_children(tree, node, visitor)? {
        return Ok(false);
    }

    visitor.leave(handle)?;
    Ok(true)
}

fn visit_children(tree: &ComponentTree, node: NodeId, visitor: &mut dyn TreeVisitor) -> Result<bool> {
    for &child in tree.children(node) {
        if !visit(tree, child, visitor)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// A node located by id, with the context it resolves in.
#[derive(Debug, Clone)]
pub struct Located {
    pub node: NodeId,
    pub context: Arc<SessionContext>,
}

impl ComponentTree {
    /// Finds the node whose id, as seen from the active context, is `id`.
    /// Repeated nodes are found in the row context their id names.
    pub fn find_by_id(&self, id: &str) -> Result<Option<Located>> {
        struct Finder<'i> {
            id: &'i str,
            found: Option<Located>,
        }

        impl TreeVisitor for Finder<'_> {
            fn enter(&mut self, node: NodeRef<'_>) -> Result<Visit> {
                if node.component_id()? != self.id {
                    return Ok(Visit::Continue);
                }
                let context = holder::current().ok_or(Error::NoActiveContext { node: node.id() })?;
                self.found = Some(Located {
                    node: node.id(),
                    context,
                });
                Ok(Visit::Stop)
            }
        }

        let mut finder = Finder { id, found: None };
        walk(self, self.root(), &mut finder)?;
        Ok(finder.found)
    }
}
