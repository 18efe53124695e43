//! Behaviour seam between the tree and concrete widgets.

use crate::config::ValidationConfig;
use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::model::{ComponentModel, Value};
use crate::node::NodeRef;
use crate::repeater::Repeater;
use crate::request::Request;

/// Stateless behaviour of a node. All state lives in the node's
/// [`ComponentModel`], reached through the active session context.
pub trait Component: Send + Sync + 'static {
    fn kind(&self) -> &'static str;

    /// Factory for the node's default model.
    fn create_model(&self) -> ComponentModel {
        ComponentModel::default()
    }

    /// Input components take part in request extraction and validation.
    fn is_input(&self) -> bool {
        false
    }

    /// Naming contexts prefix their descendants' ids with their own.
    /// Repeaters always are one.
    fn is_naming_context(&self) -> bool {
        false
    }

    /// Candidate value carried by `request` for this node. `Ok(None)` means
    /// the request says nothing and the current value is kept. Malformed
    /// input is the component's to interpret; it is never an error.
    fn read_request(&self, node: &NodeRef<'_>, request: &dyn Request) -> Result<Option<Value>> {
        let _ = (node, request);
        Ok(None)
    }

    /// Widget-specific checks, run after the mandatory check and attached
    /// validators.
    fn validate_component(
        &self,
        node: &NodeRef<'_>,
        value: &Value,
        diagnostics: &mut Diagnostics,
        config: &ValidationConfig,
    ) -> Result<()> {
        let _ = (node, value, diagnostics, config);
        Ok(())
    }

    fn as_repeater(&self) -> Option<&Repeater> {
        None
    }
}
