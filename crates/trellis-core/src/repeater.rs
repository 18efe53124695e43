//! Row repetition.
//!
//! A [`Repeater`] node renders its children once per row of its data source.
//! Each row gets a row context nested under the context that owns the
//! repeater, keyed by [`RowKey`]. Reconciliation keeps row contexts whose key
//! survives a rebind (and with them any edits made in the row), creates
//! contexts for new keys and disposes contexts whose key disappeared.

use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use crate::collections::map::HashSet;
use crate::collections::OrderedMap;
use crate::component::Component;
use crate::context::SessionContext;
use crate::error::{Error, Result};
use crate::holder;
use crate::node::{bean_property, ComponentTree};
use crate::sync::{read, write};
use crate::NodeId;

/// Ordered sequence of row beans.
pub trait DataSource: Send + Sync + 'static {
    fn len(&self) -> usize;

    fn row(&self, index: usize) -> Option<serde_json::Value>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DataSource for Vec<serde_json::Value> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn row(&self, index: usize) -> Option<serde_json::Value> {
        self.get(index).cloned()
    }
}

/// How rows are matched across rebinds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RowIdentity {
    /// Row `n` is the same row whatever bean sits there.
    #[default]
    Position,
    /// Rows are matched by the value of a bean property, so edits follow a
    /// bean when the list is reordered.
    Property(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RowKey {
    Position(usize),
    Identity(String),
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Position(index) => write!(f, "#{index}"),
            RowKey::Identity(identity) => f.write_str(identity),
        }
    }
}

pub(crate) type RowSet = OrderedMap<RowKey, Arc<SessionContext>>;

#[derive(Debug)]
struct RowState {
    index: usize,
    bean: serde_json::Value,
}

/// Identifies a row context: its repeater, key and current bean.
#[derive(Debug)]
pub struct RowInfo {
    repeater: NodeId,
    key: RowKey,
    segment: String,
    state: RwLock<RowState>,
}

impl RowInfo {
    fn new(repeater: NodeId, key: RowKey, segment: String, index: usize, bean: serde_json::Value) -> Self {
        Self {
            repeater,
            key,
            segment,
            state: RwLock::new(RowState { index, bean }),
        }
    }

    pub fn repeater(&self) -> NodeId {
        self.repeater
    }

    pub fn key(&self) -> &RowKey {
        &self.key
    }

    /// Id segment inserted between the repeater's id and the row's nodes.
    pub fn segment(&self) -> &str {
        &self.segment
    }

    /// Position of the row as of the last reconciliation.
    pub fn index(&self) -> usize {
        read(&self.state).index
    }

    /// Bean of the row as of the last reconciliation.
    pub fn bean(&self) -> serde_json::Value {
        read(&self.state).bean.clone()
    }

    fn refresh(&self, index: usize, bean: serde_json::Value) {
        let mut state = write(&self.state);
        state.index = index;
        state.bean = bean;
    }
}

#[derive(Debug, Clone, Default)]
pub struct Repeater {
    identity: RowIdentity,
}

impl Repeater {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches rows by the bean property `property`.
    pub fn keyed_by(property: impl Into<String>) -> Self {
        Self {
            identity: RowIdentity::Property(property.into()),
        }
    }

    pub fn identity(&self) -> &RowIdentity {
        &self.identity
    }

    fn row_key(&self, repeater: NodeId, index: usize, bean: &serde_json::Value) -> Result<RowKey> {
        match &self.identity {
            RowIdentity::Position => Ok(RowKey::Position(index)),
            RowIdentity::Property(property) => {
                let identity = match bean_property(bean, property) {
                    None | Some(serde_json::Value::Null) => {
                        return Err(Error::MissingRowIdentity {
                            repeater,
                            index,
                            property: property.clone(),
                        })
                    }
                    Some(serde_json::Value::String(text)) => text.clone(),
                    Some(other) => other.to_string(),
                };
                Ok(RowKey::Identity(identity))
            }
        }
    }
}

impl Component for Repeater {
    fn kind(&self) -> &'static str {
        "repeater"
    }

    fn as_repeater(&self) -> Option<&Repeater> {
        Some(self)
    }
}

fn row_segment(prefix: &str, key: &RowKey) -> String {
    match key {
        RowKey::Position(index) => format!("{prefix}{index}"),
        RowKey::Identity(identity) => {
            let cleaned: String = identity
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
                .collect();
            format!("{prefix}{cleaned}")
        }
    }
}

impl ComponentTree {
    pub fn repeater(&self, node: NodeId) -> Result<RepeaterRef<'_>> {
        let repeater = self
            .component(node)?
            .as_repeater()
            .ok_or(Error::TypeMismatch {
                id: node,
                expected: "repeater",
            })?;
        Ok(RepeaterRef {
            tree: self,
            node,
            repeater,
        })
    }
}

/// Handle for binding a repeater and reaching its row contexts. Requires an
/// active session context.
#[derive(Clone, Copy)]
pub struct RepeaterRef<'a> {
    tree: &'a ComponentTree,
    node: NodeId,
    repeater: &'a Repeater,
}

impl fmt::Debug for RepeaterRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepeaterRef")
            .field("node", &self.node)
            .field("identity", self.repeater.identity())
            .finish()
    }
}

impl<'a> RepeaterRef<'a> {
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Binds the rows to `beans` and reconciles immediately.
    pub fn set_bean_list(&self, beans: Vec<serde_json::Value>) -> Result<()> {
        self.set_data_source(Arc::new(beans))
    }

    /// Rebinds the rows. A source with duplicate or missing identities is
    /// rejected and the previous binding stays in place.
    pub fn set_data_source(&self, source: Arc<dyn DataSource>) -> Result<()> {
        let previous = self
            .tree
            .update_model(self.node, |model| model.data_source.replace(source))?;
        if let Err(err) = self.reconcile() {
            self.tree
                .update_model(self.node, |model| model.data_source = previous)?;
            return Err(err);
        }
        Ok(())
    }

    /// Unbinds the repeater, discarding every row context.
    pub fn clear(&self) -> Result<()> {
        self.tree
            .update_model(self.node, |model| model.data_source = None)?;
        self.reconcile().map(|_| ())
    }

    pub fn is_bound(&self) -> Result<bool> {
        self.tree
            .with_model(self.node, |model| model.data_source.is_some())
    }

    /// Live row contexts in row order, reconciled against the current data.
    pub fn row_contexts(&self) -> Result<Vec<Arc<SessionContext>>> {
        self.reconcile()
    }

    pub fn row_count(&self) -> Result<usize> {
        Ok(self.reconcile()?.len())
    }

    /// The current bean behind `context`, re-read from the data source.
    pub fn row_bean_for_subcontext(&self, context: &SessionContext) -> Result<serde_json::Value> {
        let unknown = Error::UnknownRowContext {
            repeater: self.node,
            context: context.id(),
        };
        let Some(row) = context.row().filter(|row| row.repeater() == self.node) else {
            return Err(unknown);
        };
        let live = self.reconcile()?;
        if !live.iter().any(|candidate| candidate.id() == context.id()) {
            warn!(
                repeater = self.node,
                context = context.id(),
                "row context is no longer live"
            );
            return Err(unknown);
        }
        Ok(row.bean())
    }

    fn load_rows(&self) -> Result<Vec<serde_json::Value>> {
        let source = self
            .tree
            .with_model(self.node, |model| model.data_source.clone())?;
        let Some(source) = source else {
            return Ok(Vec::new());
        };
        (0..source.len())
            .map(|index| {
                source.row(index).ok_or(Error::MissingRow {
                    repeater: self.node,
                    index,
                })
            })
            .collect()
    }

    fn reconcile(&self) -> Result<Vec<Arc<SessionContext>>> {
        let active = holder::current().ok_or(Error::NoActiveContext { node: self.node })?;
        let owner = self.tree.owner_context(self.node, &active)?;
        let beans = self.load_rows()?;

        let mut keys = Vec::with_capacity(beans.len());
        let mut seen = HashSet::default();
        for (index, bean) in beans.iter().enumerate() {
            let key = self.repeater.row_key(self.node, index, bean)?;
            if !seen.insert(key.clone()) {
                return Err(Error::DuplicateRowKey {
                    repeater: self.node,
                    key: key.to_string(),
                });
            }
            keys.push(key);
        }

        let prefix = &self.tree.ids().row_prefix;
        let mut rows = owner.rows_mut();
        let mut previous = rows.remove(&self.node).unwrap_or_default();
        let mut next = RowSet::default();
        let (mut kept, mut added) = (0usize, 0usize);
        for (index, (key, bean)) in keys.into_iter().zip(beans).enumerate() {
            let context = match previous.swap_remove(&key) {
                Some(context) => {
                    if let Some(row) = context.row() {
                        row.refresh(index, bean);
                    }
                    kept += 1;
                    context
                }
                None => {
                    added += 1;
                    let segment = row_segment(prefix, &key);
                    let row = RowInfo::new(self.node, key.clone(), segment, index, bean);
                    SessionContext::new_row(&owner, row)
                }
            };
            next.insert(key, context);
        }
        let removed = previous.len();
        let live: Vec<Arc<SessionContext>> = next.values().cloned().collect();
        if !next.is_empty() {
            rows.insert(self.node, next);
        }
        drop(rows);

        for (_, stale) in previous {
            stale.dispose();
        }
        if added > 0 || removed > 0 {
            debug!(
                repeater = self.node,
                context = owner.id(),
                kept,
                added,
                removed,
                "repeater rows reconciled"
            );
        }
        Ok(live)
    }
}
