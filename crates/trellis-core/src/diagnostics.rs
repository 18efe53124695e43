//! Validation results and the rules that produce them.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::context::ContextId;
use crate::error::Result;
use crate::holder;
use crate::model::Value;
use crate::node::NodeRef;
use crate::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

/// One validation finding, tied to the node and row context it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub node: NodeId,
    /// Context the node was validated in; a row context for repeated fields.
    pub context: Option<ContextId>,
    pub component_id: String,
    /// Message template; `{n}` refers to `args[n]`.
    pub message: String,
    pub args: Vec<String>,
}

impl Diagnostic {
    /// A diagnostic for `node` as seen from the active context.
    pub fn for_node(
        node: &NodeRef<'_>,
        severity: Severity,
        message: impl Into<String>,
        args: Vec<String>,
    ) -> Result<Self> {
        Ok(Self {
            severity,
            node: node.id(),
            context: holder::current().map(|context| context.id()),
            component_id: node.component_id()?,
            message: message.into(),
            args,
        })
    }

    /// The message with its arguments substituted.
    pub fn formatted(&self) -> String {
        let mut text = self.message.clone();
        for (index, arg) in self.args.iter().enumerate() {
            text = text.replace(&format!("{{{index}}}"), arg);
        }
        text
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.component_id, self.formatted())
    }
}

/// Ordered, append-only list of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.entries.push(diagnostic);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.entries.iter()
    }

    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|entry| entry.severity == Severity::Error)
    }

    /// Formatted messages in report order.
    pub fn messages(&self) -> Vec<String> {
        self.entries.iter().map(Diagnostic::formatted).collect()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A check applied to a non-empty field value. Emptiness is the mandatory
/// check's business, so rules never see empty values.
pub trait ValidationRule: Send + Sync + 'static {
    fn check(&self, value: &Value) -> bool;

    /// Template used when the validator has no custom message. `{0}` is the
    /// field label.
    fn default_message(&self) -> String;

    fn severity(&self) -> Severity {
        Severity::Error
    }
}

/// A rule attached to a component, with an optional custom message.
#[derive(Clone)]
pub struct FieldValidator {
    rule: Arc<dyn ValidationRule>,
    message: Option<String>,
}

impl FieldValidator {
    pub fn new(rule: impl ValidationRule) -> Self {
        Self {
            rule: Arc::new(rule),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn check(&self, value: &Value) -> bool {
        self.rule.check(value)
    }

    pub fn severity(&self) -> Severity {
        self.rule.severity()
    }

    pub fn message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| self.rule.default_message())
    }
}

impl fmt::Debug for FieldValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldValidator")
            .field("message", &self.message())
            .finish()
    }
}
