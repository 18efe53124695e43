//! Shared component trees with per-session state.
//!
//! A [`ComponentTree`] is built once, locked, and then shared by every
//! session. Reads resolve through the active [`SessionContext`] (see
//! [`holder`]): a session sees its own overlay of a node's model if it has
//! written one, and the shared default otherwise. [`Repeater`] nodes nest a
//! row context per data row so repeated subtrees keep independent state.
//! [`Pipeline`] drives request handling and validation over that view.

pub mod collections;
pub mod component;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod holder;
pub mod model;
pub mod node;
pub mod pipeline;
pub mod registry;
pub mod repeater;
pub mod request;
pub mod session;
pub mod traverse;

mod sync;

#[cfg(test)]
mod tests;

pub use component::Component;
pub use config::{FrameworkConfig, IdConfig, SessionConfig, ValidationConfig};
pub use context::{ContextId, FocusTarget, NamedNode, SessionContext};
pub use diagnostics::{Diagnostic, Diagnostics, FieldValidator, Severity, ValidationRule};
pub use error::{Error, Result};
pub use holder::{push_context, with_context, ContextGuard};
pub use model::{ComponentModel, Value};
pub use node::{ComponentTree, NodeId, NodeRef};
pub use pipeline::{ChangedNode, Pipeline, RequestOutcome};
pub use registry::TreeRegistry;
pub use repeater::{DataSource, Repeater, RepeaterRef, RowIdentity, RowInfo, RowKey};
pub use request::{MapRequest, Parameter, Request};
pub use session::SessionStore;
pub use traverse::{walk, Located, TreeVisitor, Visit};
