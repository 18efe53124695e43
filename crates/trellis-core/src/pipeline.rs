//! Request handling and validation over a session's view of the tree.
//!
//! Every pass is a [`walk`] from the root with a session context already
//! active. Disabled, read-only and hidden state is inherited down the tree:
//! a disabled container disables everything inside it.

use std::sync::Arc;

use tracing::{debug, debug_span, trace};

use crate::config::FrameworkConfig;
use crate::context::{ContextId, SessionContext};
use crate::diagnostics::{Diagnostic, Diagnostics, Severity};
use crate::error::{Error, Result};
use crate::holder;
use crate::node::{ComponentTree, NodeRef};
use crate::request::Request;
use crate::traverse::{walk, TreeVisitor, Visit};
use crate::NodeId;

/// A node whose value changed while handling a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedNode {
    pub node: NodeId,
    pub context: ContextId,
    pub component_id: String,
}

/// Nodes changed by one request, in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOutcome {
    pub changed: Vec<ChangedNode>,
}

impl RequestOutcome {
    /// Whether `node` changed in any context.
    pub fn is_changed(&self, node: NodeId) -> bool {
        self.changed.iter().any(|entry| entry.node == node)
    }

    pub fn len(&self) -> usize {
        self.changed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    pub fn component_ids(&self) -> Vec<&str> {
        self.changed
            .iter()
            .map(|entry| entry.component_id.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Gate {
    hidden: bool,
    disabled: bool,
    read_only: bool,
}

impl Gate {
    fn inherit(self, node: &NodeRef<'_>) -> Result<Self> {
        node.with_model(|model| Gate {
            hidden: self.hidden || !model.visible,
            disabled: self.disabled || model.disabled,
            read_only: self.read_only || model.read_only,
        })
    }

    fn accepts_input(self) -> bool {
        !(self.hidden || self.disabled || self.read_only)
    }

    fn validates(self) -> bool {
        !(self.hidden || self.read_only)
    }
}

/// Stack of inherited gates kept in step with the walk.
#[derive(Debug, Default)]
struct Gates(Vec<Gate>);

impl Gates {
    fn enter(&mut self, node: &NodeRef<'_>) -> Result<Gate> {
        let parent = self.0.last().copied().unwrap_or_default();
        let gate = parent.inherit(node)?;
        self.0.push(gate);
        Ok(gate)
    }

    fn leave(&mut self) {
        self.0.pop();
    }
}

fn active_context(tree: &ComponentTree) -> Result<Arc<SessionContext>> {
    holder::current().ok_or(Error::NoActiveContext { node: tree.root() })
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: FrameworkConfig,
}

impl Pipeline {
    pub fn new(config: FrameworkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    /// Applies `request` to every input node that accepts input, recording
    /// which values changed. Absent parameters keep the current value. Runs
    /// the active context's deferred invocations once the walk is done.
    pub fn handle_request(
        &self,
        tree: &ComponentTree,
        request: &dyn Request,
    ) -> Result<RequestOutcome> {
        let context = active_context(tree)?;
        let span = debug_span!("handle_request", context = context.id());
        let _enter = span.enter();
        context.touch();

        let mut handler = RequestHandler {
            request,
            gates: Gates::default(),
            outcome: RequestOutcome::default(),
        };
        walk(tree, tree.root(), &mut handler)?;
        let ran = context.run_invocations();
        debug!(
            changed = handler.outcome.len(),
            invocations = ran,
            "request handled"
        );
        Ok(handler.outcome)
    }

    /// Validates every visible, non read-only input node. Diagnostics come
    /// back in traversal order with repeater rows expanded.
    pub fn validate(&self, tree: &ComponentTree) -> Result<Diagnostics> {
        let context = active_context(tree)?;
        let span = debug_span!("validate", context = context.id());
        let _enter = span.enter();

        let mut validator = Validator {
            pipeline: self,
            gates: Gates::default(),
            diagnostics: Diagnostics::new(),
        };
        walk(tree, tree.root(), &mut validator)?;
        debug!(diagnostics = validator.diagnostics.len(), "validation done");
        Ok(validator.diagnostics)
    }

    /// Reconciles every repeater against its current data and rebuilds the
    /// session's id registry, so rendering sees one consistent row set.
    /// Returns the number of ids registered.
    pub fn prepare_paint(&self, tree: &ComponentTree) -> Result<usize> {
        let context = active_context(tree)?;
        let span = debug_span!("prepare_paint", context = context.id());
        let _enter = span.enter();

        context.clear_names();
        let mut painter = PaintPreparer { registered: 0 };
        walk(tree, tree.root(), &mut painter)?;
        debug!(ids = painter.registered, "paint prepared");
        Ok(painter.registered)
    }
}

struct RequestHandler<'r> {
    request: &'r dyn Request,
    gates: Gates,
    outcome: RequestOutcome,
}

impl TreeVisitor for RequestHandler<'_> {
    fn enter(&mut self, node: NodeRef<'_>) -> Result<Visit> {
        let gate = self.gates.enter(&node)?;
        let component = node.component();
        if !component.is_input() {
            return Ok(Visit::Continue);
        }

        // Only touch the flag where it is set, so untouched nodes never
        // materialise an overlay.
        if node.is_changed()? {
            node.update_model(|model| model.changed = false)?;
        }
        if !gate.accepts_input() {
            trace!(node = node.id(), "input gated");
            return Ok(Visit::Continue);
        }

        let Some(candidate) = component.read_request(&node, self.request)? else {
            return Ok(Visit::Continue);
        };
        let current = node.value()?;
        // All empty values mean "no value"; `""` and `Null` are the same.
        if candidate == current || (candidate.is_empty() && current.is_empty()) {
            return Ok(Visit::Continue);
        }
        node.update_model(|model| {
            model.data = Some(candidate);
            model.changed = true;
        })?;
        let context = holder::current().ok_or(Error::NoActiveContext { node: node.id() })?;
        let component_id = node.component_id()?;
        trace!(node = node.id(), id = %component_id, "value changed");
        self.outcome.changed.push(ChangedNode {
            node: node.id(),
            context: context.id(),
            component_id,
        });
        Ok(Visit::Continue)
    }

    fn leave(&mut self, _node: NodeRef<'_>) -> Result<()> {
        self.gates.leave();
        Ok(())
    }
}

struct Validator<'p> {
    pipeline: &'p Pipeline,
    gates: Gates,
    diagnostics: Diagnostics,
}

impl Validator<'_> {
    fn check(&mut self, node: &NodeRef<'_>) -> Result<()> {
        let config = &self.pipeline.config.validation;
        let value = node.value()?;
        let label = node.display_label()?;

        if value.is_empty() {
            let (mandatory, message) =
                node.with_model(|model| (model.mandatory, model.mandatory_message.clone()))?;
            if mandatory {
                let message = message.unwrap_or_else(|| config.mandatory_message.clone());
                self.diagnostics.push(Diagnostic::for_node(
                    node,
                    Severity::Error,
                    message,
                    vec![label],
                )?);
                return Ok(());
            }
        } else {
            for validator in node.validators()? {
                if !validator.check(&value) {
                    self.diagnostics.push(Diagnostic::for_node(
                        node,
                        validator.severity(),
                        validator.message(),
                        vec![label.clone()],
                    )?);
                }
            }
        }

        node.component()
            .validate_component(node, &value, &mut self.diagnostics, config)
    }
}

impl TreeVisitor for Validator<'_> {
    fn enter(&mut self, node: NodeRef<'_>) -> Result<Visit> {
        let gate = self.gates.enter(&node)?;
        if node.component().is_input() && gate.validates() {
            self.check(&node)?;
        }
        Ok(Visit::Continue)
    }

    fn leave(&mut self, _node: NodeRef<'_>) -> Result<()> {
        self.gates.leave();
        Ok(())
    }
}

struct PaintPreparer {
    registered: usize,
}

impl TreeVisitor for PaintPreparer {
    fn enter(&mut self, node: NodeRef<'_>) -> Result<Visit> {
        let context = holder::current().ok_or(Error::NoActiveContext { node: node.id() })?;
        context.register_name(node.component_id()?, node.id());
        self.registered += 1;
        Ok(Visit::Continue)
    }
}
