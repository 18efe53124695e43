use std::sync::Arc;

use trellis_core::{
    with_context, ComponentTree, Diagnostics, MapRequest, NodeId, Pipeline, Request,
    RequestOutcome, Result, SessionContext, Value,
};

/// Drives one session through request/validate cycles against a shared
/// tree. Every call activates the harness's context for its duration only,
/// so several harnesses can share a tree on one thread.
pub struct SessionHarness {
    tree: Arc<ComponentTree>,
    pipeline: Pipeline,
    context: Arc<SessionContext>,
}

impl SessionHarness {
    pub fn new(tree: impl Into<Arc<ComponentTree>>) -> Self {
        Self::with_pipeline(tree, Pipeline::default())
    }

    pub fn with_pipeline(tree: impl Into<Arc<ComponentTree>>, pipeline: Pipeline) -> Self {
        let tree = tree.into();
        let context = SessionContext::new("harness");
        Self {
            tree,
            pipeline,
            context,
        }
    }

    pub fn tree(&self) -> &ComponentTree {
        &self.tree
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.context
    }

    /// Runs `block` with this session active.
    pub fn with_active<R>(&self, block: impl FnOnce(&ComponentTree) -> R) -> R {
        with_context(Arc::clone(&self.context), || block(&self.tree))
    }

    /// Submits single-valued parameters keyed by component id.
    pub fn submit(&self, params: &[(&str, &str)]) -> Result<RequestOutcome> {
        let request = params
            .iter()
            .fold(MapRequest::new(), |request, (id, value)| request.with(*id, *value));
        self.submit_request(&request)
    }

    pub fn submit_request(&self, request: &dyn Request) -> Result<RequestOutcome> {
        self.with_active(|tree| self.pipeline.handle_request(tree, request))
    }

    pub fn validate(&self) -> Result<Diagnostics> {
        self.with_active(|tree| self.pipeline.validate(tree))
    }

    pub fn prepare_paint(&self) -> Result<usize> {
        self.with_active(|tree| self.pipeline.prepare_paint(tree))
    }

    /// Value of `node` as this session sees it outside any row.
    pub fn value(&self, node: NodeId) -> Result<Value> {
        self.with_active(|tree| tree.node(node)?.value())
    }

    /// Value of `node` in each row of `repeater`, in row order.
    pub fn row_values(&self, repeater: NodeId, node: NodeId) -> Result<Vec<Value>> {
        let rows = self.with_active(|tree| tree.repeater(repeater)?.row_contexts())?;
        rows.into_iter()
            .map(|row| with_context(row, || self.tree.node(node)?.value()))
            .collect()
    }

    pub fn bind_rows(&self, repeater: NodeId, beans: Vec<serde_json::Value>) -> Result<()> {
        self.with_active(|tree| tree.repeater(repeater)?.set_bean_list(beans))
    }

    /// Drops every overlay and row context of the session.
    pub fn reset(&self) {
        self.context.reset();
    }
}

impl Drop for SessionHarness {
    fn drop(&mut self) {
        self.context.dispose();
    }
}
