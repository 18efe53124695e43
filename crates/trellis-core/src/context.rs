//! Per-session overlay store.
//!
//! A [`SessionContext`] maps locked nodes to the session's private copy of
//! their model. Repeaters multiply a subtree by nesting row contexts under a
//! parent context; a row context only overlays nodes inside its repeater's
//! repeated subtree and defers everything else to its parent.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::collections::map::HashMap;
use crate::model::ComponentModel;
use crate::repeater::{RowInfo, RowSet};
use crate::sync::{lock, read, write};
use crate::NodeId;

pub type ContextId = u64;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_context_id() -> ContextId {
    NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed)
}

pub(crate) type OverlayMap = HashMap<NodeId, ComponentModel>;

type Invocation = Box<dyn FnOnce() + Send + 'static>;

/// The component that should receive focus when the session is next painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusTarget {
    pub node: NodeId,
    /// Row context the node was focused in, if any.
    pub context: ContextId,
}

/// A component id resolved during the last traversal.
#[derive(Clone)]
pub struct NamedNode {
    pub node: NodeId,
    context: Weak<SessionContext>,
}

impl NamedNode {
    /// The context the id was generated in, while it is still alive.
    pub fn context(&self) -> Option<Arc<SessionContext>> {
        self.context.upgrade()
    }
}

impl fmt::Debug for NamedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedNode")
            .field("node", &self.node)
            .field("live", &(self.context.strong_count() > 0))
            .finish()
    }
}

pub struct SessionContext {
    id: ContextId,
    token: String,
    created_at: DateTime<Utc>,
    last_access: RwLock<DateTime<Utc>>,
    parent: Option<Weak<SessionContext>>,
    row: Option<RowInfo>,
    disposed: AtomicBool,
    overlays: RwLock<OverlayMap>,
    rows: RwLock<HashMap<NodeId, RowSet>>,
    focus: RwLock<Option<FocusTarget>>,
    invocations: Mutex<VecDeque<Invocation>>,
    names: RwLock<HashMap<String, NamedNode>>,
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("id", &self.id)
            .field("token", &self.token)
            .field("row", &self.row)
            .field("overlays", &self.overlay_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl SessionContext {
    fn build(token: String, parent: Option<Weak<SessionContext>>, row: Option<RowInfo>) -> Self {
        let now = Utc::now();
        Self {
            id: next_context_id(),
            token,
            created_at: now,
            last_access: RwLock::new(now),
            parent,
            row,
            disposed: AtomicBool::new(false),
            overlays: RwLock::new(OverlayMap::default()),
            rows: RwLock::new(HashMap::default()),
            focus: RwLock::new(None),
            invocations: Mutex::new(VecDeque::new()),
            names: RwLock::new(HashMap::default()),
        }
    }

    /// Creates the root context for one user session.
    pub fn new(token: impl Into<String>) -> Arc<Self> {
        let context = Arc::new(Self::build(token.into(), None, None));
        debug!(context = context.id, token = %context.token, "session context created");
        context
    }

    pub(crate) fn new_row(parent: &Arc<SessionContext>, row: RowInfo) -> Arc<Self> {
        let token = format!("{}/{}", parent.token, row.segment());
        Arc::new(Self::build(token, Some(Arc::downgrade(parent)), Some(row)))
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_access(&self) -> DateTime<Utc> {
        *read(&self.last_access)
    }

    pub fn touch(&self) {
        self.touch_at(Utc::now());
    }

    pub fn touch_at(&self, when: DateTime<Utc>) {
        *write(&self.last_access) = when;
    }

    pub fn parent(&self) -> Option<Arc<SessionContext>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Row data when this is a repeater row context.
    pub fn row(&self) -> Option<&RowInfo> {
        self.row.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The session-level context above any row contexts. A row context whose
    /// parent is gone is its own root.
    pub fn root(self: &Arc<Self>) -> Arc<SessionContext> {
        let mut current = Arc::clone(self);
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    // ── overlays ────────────────────────────────────────────────────────

    pub(crate) fn overlays(&self) -> RwLockReadGuard<'_, OverlayMap> {
        read(&self.overlays)
    }

    pub(crate) fn overlays_mut(&self) -> RwLockWriteGuard<'_, OverlayMap> {
        write(&self.overlays)
    }

    pub fn has_overlay(&self, node: NodeId) -> bool {
        self.overlays().contains_key(&node)
    }

    /// Overlays held directly by this context, not counting row contexts.
    pub fn overlay_count(&self) -> usize {
        self.overlays().len()
    }

    /// Drops this context's overlay for `node`, returning whether one existed.
    pub fn remove_overlay(&self, node: NodeId) -> bool {
        self.overlays_mut().remove(&node).is_some()
    }

    // ── repeater rows ───────────────────────────────────────────────────

    pub(crate) fn rows_mut(&self) -> RwLockWriteGuard<'_, HashMap<NodeId, RowSet>> {
        write(&self.rows)
    }

    /// Live row contexts of `repeater` in row order, without reconciling.
    pub fn row_contexts_of(&self, repeater: NodeId) -> Vec<Arc<SessionContext>> {
        read(&self.rows)
            .get(&repeater)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn remove_rows(&self, repeater: NodeId) -> usize {
        let removed = self.rows_mut().remove(&repeater);
        match removed {
            Some(rows) => {
                let count = rows.len();
                for row in rows.values() {
                    row.dispose();
                }
                count
            }
            None => 0,
        }
    }

    // ── focus ───────────────────────────────────────────────────────────

    /// Records `node`, as seen from this context, as the session focus.
    pub fn set_focus(self: &Arc<Self>, node: NodeId) {
        let target = FocusTarget {
            node,
            context: self.id,
        };
        *write(&self.root().focus) = Some(target);
    }

    pub fn focus(self: &Arc<Self>) -> Option<FocusTarget> {
        *read(&self.root().focus)
    }

    pub fn clear_focus(self: &Arc<Self>) {
        write(&self.root().focus).take();
    }

    // ── deferred invocations ────────────────────────────────────────────

    /// Queues `task` to run after the current request has been handled.
    pub fn invoke_later(&self, task: impl FnOnce() + Send + 'static) {
        lock(&self.invocations).push_back(Box::new(task));
    }

    pub fn pending_invocations(&self) -> usize {
        lock(&self.invocations).len()
    }

    /// Runs queued tasks, including any they queue in turn, and returns how
    /// many ran. The queue lock is not held while a task runs.
    pub fn run_invocations(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = lock(&self.invocations).pop_front();
            let Some(task) = next else {
                break;
            };
            task();
            ran += 1;
        }
        ran
    }

    // ── naming registry ─────────────────────────────────────────────────

    /// Registers `id` in the session-wide registry at the root context.
    pub fn register_name(self: &Arc<Self>, id: String, node: NodeId) {
        let entry = NamedNode {
            node,
            context: Arc::downgrade(self),
        };
        write(&self.root().names).insert(id, entry);
    }

    pub fn lookup_name(self: &Arc<Self>, id: &str) -> Option<NamedNode> {
        read(&self.root().names).get(id).cloned()
    }

    pub fn clear_names(self: &Arc<Self>) {
        write(&self.root().names).clear();
    }

    // ── lifecycle ───────────────────────────────────────────────────────

    /// Forgets every overlay, row context, focus target, queued invocation
    /// and registered name. Nodes read through this context afterwards see
    /// their defaults again.
    pub fn reset(&self) {
        self.overlays_mut().clear();
        let rows: Vec<RowSet> = self.rows_mut().drain().map(|(_, rows)| rows).collect();
        for row in rows.iter().flat_map(|set| set.values()) {
            row.dispose();
        }
        write(&self.focus).take();
        lock(&self.invocations).clear();
        write(&self.names).clear();
        debug!(context = self.id, "session context reset");
    }

    /// Idempotent teardown. Returns `true` for the call that disposed it.
    pub fn dispose(&self) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.reset();
        if self.is_root() {
            info!(context = self.id, token = %self.token, "session context disposed");
        }
        true
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}
