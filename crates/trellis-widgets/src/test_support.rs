use trellis_core::{Component, ComponentTree, NodeId, Pipeline, SessionContext};

use crate::Container;

/// One-level form under an unnamed root container.
pub(crate) struct Form {
    tree: ComponentTree,
}

impl Form {
    pub(crate) fn new() -> Self {
        Self {
            tree: ComponentTree::new(Container::new()),
        }
    }

    pub(crate) fn add(&mut self, name: &str, component: impl Component) -> NodeId {
        self.add_under(0, name, component)
    }

    pub(crate) fn add_under(
        &mut self,
        parent: NodeId,
        name: &str,
        component: impl Component,
    ) -> NodeId {
        self.tree.add_named_child(parent, name, component).unwrap()
    }

    pub(crate) fn lock(self) -> LockedForm {
        self.tree.lock();
        LockedForm {
            tree: self.tree,
            pipeline: Pipeline::default(),
        }
    }
}

pub(crate) struct LockedForm {
    tree: ComponentTree,
    pipeline: Pipeline,
}

impl LockedForm {
    /// Runs `block` with a fresh session context active.
    pub(crate) fn session<R>(&self, block: impl FnOnce(&ComponentTree, &Pipeline) -> R) -> R {
        trellis_core::with_context(SessionContext::new("test"), || {
            block(&self.tree, &self.pipeline)
        })
    }
}
