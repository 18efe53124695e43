//! The shared component tree.
//!
//! Nodes live in an arena owned by [`ComponentTree`] and are addressed by
//! [`NodeId`]. Each node carries a default [`ComponentModel`]. While a node is
//! unlocked that default is written directly; once locked it is read-only and
//! every write lands in the active session context's overlay instead.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::component::Component;
use crate::config::{FrameworkConfig, IdConfig};
use crate::context::SessionContext;
use crate::diagnostics::FieldValidator;
use crate::error::{Error, Result};
use crate::holder;
use crate::model::{ComponentModel, Value};
use crate::sync::{read, write};

pub type NodeId = usize;

struct NodeData {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    name: Option<String>,
    naming_context: bool,
    component: Arc<dyn Component>,
    default: RwLock<ComponentModel>,
    locked: AtomicBool,
}

pub struct ComponentTree {
    nodes: Vec<NodeData>,
    ids: IdConfig,
}

impl fmt::Debug for ComponentTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentTree")
            .field("nodes", &self.nodes.len())
            .field("locked", &self.is_locked(self.root()))
            .finish()
    }
}

impl ComponentTree {
    pub fn new(root: impl Component) -> Self {
        Self::with_config(root, &FrameworkConfig::default())
    }

    pub fn with_config(root: impl Component, config: &FrameworkConfig) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            ids: config.ids.clone(),
        };
        tree.push_node(None, None, Arc::new(root));
        tree
    }

    fn push_node(
        &mut self,
        parent: Option<NodeId>,
        name: Option<String>,
        component: Arc<dyn Component>,
    ) -> NodeId {
        let id = self.nodes.len();
        let default = component.create_model();
        let naming_context = component.is_naming_context() || component.as_repeater().is_some();
        self.nodes.push(NodeData {
            parent,
            children: Vec::new(),
            name,
            naming_context,
            component,
            default: RwLock::new(default),
            locked: AtomicBool::new(false),
        });
        if let Some(parent) = parent {
            self.nodes[parent].children.push(id);
        }
        id
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> &IdConfig {
        &self.ids
    }

    fn data(&self, id: NodeId) -> Result<&NodeData> {
        self.nodes.get(id).ok_or(Error::MissingNode { id })
    }

    fn data_mut(&mut self, id: NodeId) -> Result<&mut NodeData> {
        let data = self.nodes.get_mut(id).ok_or(Error::MissingNode { id })?;
        if data.locked.load(Ordering::Acquire) {
            return Err(Error::TreeLocked { node: id });
        }
        Ok(data)
    }

    // ── construction ────────────────────────────────────────────────────

    pub fn add_child(&mut self, parent: NodeId, component: impl Component) -> Result<NodeId> {
        self.data_mut(parent)?;
        Ok(self.push_node(Some(parent), None, Arc::new(component)))
    }

    /// Adds a child whose id segment is `name` instead of a sequence number.
    pub fn add_named_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        component: impl Component,
    ) -> Result<NodeId> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::invalid_argument("name", "must not be empty"));
        }
        if name.contains(self.ids.separator.as_str()) {
            return Err(Error::invalid_argument(
                "name",
                format!("'{name}' contains the id separator"),
            ));
        }
        self.data_mut(parent)?;
        Ok(self.push_node(Some(parent), Some(name), Arc::new(component)))
    }

    /// Naming contexts prefix the ids of their descendants with their own.
    pub fn set_naming_context(&mut self, node: NodeId, naming_context: bool) -> Result<()> {
        let is_repeater = self.data(node)?.component.as_repeater().is_some();
        if is_repeater && !naming_context {
            return Err(Error::invalid_argument(
                "naming_context",
                "repeaters are always naming contexts",
            ));
        }
        self.data_mut(node)?.naming_context = naming_context;
        Ok(())
    }

    /// Configures the default model of an unlocked node.
    pub fn update_default<R>(
        &mut self,
        node: NodeId,
        f: impl FnOnce(&mut ComponentModel) -> R,
    ) -> Result<R> {
        let data = self.data_mut(node)?;
        let model = data
            .default
            .get_mut()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(f(model))
    }

    /// Locks every node. Returns `false` if the tree was already locked.
    pub fn lock(&self) -> bool {
        let mut transitioned = false;
        for data in &self.nodes {
            transitioned |= !data.locked.swap(true, Ordering::AcqRel);
        }
        if transitioned {
            info!(nodes = self.nodes.len(), "component tree locked");
        }
        transitioned
    }

    pub fn is_locked(&self, node: NodeId) -> bool {
        self.nodes
            .get(node)
            .map(|data| data.locked.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    // ── structure ───────────────────────────────────────────────────────

    pub fn node(&self, id: NodeId) -> Result<NodeRef<'_>> {
        self.data(id)?;
        Ok(NodeRef { tree: self, id })
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node).and_then(|data| data.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node)
            .map(|data| data.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn component(&self, node: NodeId) -> Result<&dyn Component> {
        Ok(self.data(node)?.component.as_ref())
    }

    pub fn name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node).and_then(|data| data.name.as_deref())
    }

    pub fn is_naming_context(&self, node: NodeId) -> bool {
        self.nodes
            .get(node)
            .map(|data| data.naming_context)
            .unwrap_or(false)
    }

    /// Whether `node` sits strictly below `ancestor`.
    pub fn is_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = self.parent(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Nodes of the subtree rooted at `node`, in pre-order.
    pub fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut pending = vec![node];
        while let Some(current) = pending.pop() {
            if current >= self.nodes.len() {
                continue;
            }
            order.push(current);
            pending.extend(self.children(current).iter().rev().copied());
        }
        order
    }

    // ── overlay resolution ──────────────────────────────────────────────

    /// The context that owns `node`'s overlay when `context` is active. Row
    /// contexts only own nodes inside their repeater; anything else belongs
    /// to an outer context.
    pub(crate) fn owner_context(
        &self,
        node: NodeId,
        context: &Arc<SessionContext>,
    ) -> Result<Arc<SessionContext>> {
        let mut owner = Arc::clone(context);
        loop {
            let repeater = match owner.row() {
                Some(row) => row.repeater(),
                None => return Ok(owner),
            };
            if self.is_descendant(node, repeater) {
                return Ok(owner);
            }
            owner = owner
                .parent()
                .ok_or(Error::DetachedContext { context: owner.id() })?;
        }
    }

    /// Reads `node`'s model: the active context's overlay when present,
    /// otherwise the shared default.
    pub fn with_model<R>(&self, node: NodeId, f: impl FnOnce(&ComponentModel) -> R) -> Result<R> {
        let data = self.data(node)?;
        if let Some(context) = holder::current() {
            let owner = self.owner_context(node, &context)?;
            let overlays = owner.overlays();
            if let Some(model) = overlays.get(&node) {
                return Ok(f(model));
            }
        }
        let model = read(&data.default);
        Ok(f(&model))
    }

    /// Mutates `node`'s model. Unlocked nodes are written in place; locked
    /// nodes get an overlay in the active context, cloned from the default on
    /// first write. A locked node with no active context is an error.
    ///
    /// `f` runs on a copy with no lock held, so it may read other nodes (or
    /// this one, seeing the value before the update). The copy is stored
    /// once `f` returns.
    pub fn update_model<R>(
        &self,
        node: NodeId,
        f: impl FnOnce(&mut ComponentModel) -> R,
    ) -> Result<R> {
        let data = self.data(node)?;
        if !data.locked.load(Ordering::Acquire) {
            let mut model = read(&data.default).clone();
            let result = f(&mut model);
            *write(&data.default) = model;
            return Ok(result);
        }
        let context = holder::current().ok_or(Error::LockedWithoutContext { node })?;
        let owner = self.owner_context(node, &context)?;
        let existing = owner.overlays().get(&node).cloned();
        let mut model = match existing {
            Some(model) => model,
            None => {
                debug!(node, context = owner.id(), "overlay materialised");
                read(&data.default).clone()
            }
        };
        let result = f(&mut model);
        owner.overlays_mut().insert(node, model);
        Ok(result)
    }

    /// Whether the active context holds an overlay for `node`.
    pub fn has_overlay(&self, node: NodeId) -> Result<bool> {
        self.data(node)?;
        match holder::current() {
            Some(context) => Ok(self.owner_context(node, &context)?.has_overlay(node)),
            None => Ok(false),
        }
    }

    /// Drops the active context's state for the subtree at `node`, including
    /// the row contexts of repeaters inside it. A repeated node reset from
    /// outside its rows is reset in every live row.
    pub fn reset(&self, node: NodeId) -> Result<()> {
        self.data(node)?;
        let Some(context) = holder::current() else {
            if self.is_locked(node) {
                return Err(Error::LockedWithoutContext { node });
            }
            return Ok(());
        };
        self.reset_in(node, &context)
    }

    fn reset_in(&self, node: NodeId, context: &Arc<SessionContext>) -> Result<()> {
        if let Some(repeater) = self.outermost_inactive_repeater(node, context) {
            let owner = self.owner_context(repeater, context)?;
            for row in owner.row_contexts_of(repeater) {
                self.reset_in(node, &row)?;
            }
            return Ok(());
        }
        let mut pending = vec![node];
        while let Some(current) = pending.pop() {
            let owner = self.owner_context(current, context)?;
            owner.remove_overlay(current);
            if self.component(current)?.as_repeater().is_some() {
                // Row state goes with the row contexts.
                owner.remove_rows(current);
                continue;
            }
            pending.extend(self.children(current).iter().copied());
        }
        Ok(())
    }

    /// The outermost repeater above `node` with no row in `context`'s chain.
    fn outermost_inactive_repeater(
        &self,
        node: NodeId,
        context: &Arc<SessionContext>,
    ) -> Option<NodeId> {
        let mut outermost = None;
        let mut cursor = self.parent(node);
        while let Some(ancestor) = cursor {
            let is_repeater = self
                .nodes
                .get(ancestor)
                .is_some_and(|data| data.component.as_repeater().is_some());
            if is_repeater && !Self::has_row_of(context, ancestor) {
                outermost = Some(ancestor);
            }
            cursor = self.parent(ancestor);
        }
        outermost
    }

    fn has_row_of(context: &Arc<SessionContext>, repeater: NodeId) -> bool {
        let mut cursor = Some(Arc::clone(context));
        while let Some(current) = cursor {
            if current.row().is_some_and(|row| row.repeater() == repeater) {
                return true;
            }
            cursor = current.parent();
        }
        false
    }

    // ── ids ─────────────────────────────────────────────────────────────

    fn segment(&self, node: NodeId) -> String {
        match self.name(node) {
            Some(name) => name.to_string(),
            None => format!("{}{}", self.ids.auto_prefix, node),
        }
    }

    /// Row segment for `repeater` taken from the active context chain.
    fn row_segment(&self, repeater: NodeId) -> Option<String> {
        let mut cursor = holder::current();
        while let Some(context) = cursor {
            if let Some(row) = context.row() {
                if row.repeater() == repeater {
                    return Some(row.segment().to_string());
                }
            }
            cursor = context.parent();
        }
        None
    }

    /// The id of `node` as seen from the active context: naming-context
    /// segments, row segments below repeaters, then the node's own segment.
    pub fn component_id(&self, node: NodeId) -> Result<String> {
        self.data(node)?;
        let mut segments = vec![self.segment(node)];
        let mut cursor = node;
        while let Some(parent) = self.parent(cursor) {
            if self.component(parent)?.as_repeater().is_some() {
                if let Some(row) = self.row_segment(parent) {
                    segments.push(row);
                }
            }
            if self.is_naming_context(parent) {
                segments.push(self.segment(parent));
            }
            cursor = parent;
        }
        segments.reverse();
        Ok(segments.join(&self.ids.separator))
    }
}

/// Typed accessors over one node; every call resolves through the active
/// session context.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a ComponentTree,
    id: NodeId,
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .finish()
    }
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'a ComponentTree {
        self.tree
    }

    pub fn kind(&self) -> &'static str {
        self.component().kind()
    }

    pub fn component(&self) -> &'a dyn Component {
        // NodeRef is only handed out for nodes that exist.
        self.tree.nodes[self.id].component.as_ref()
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.tree.parent(self.id).map(|id| NodeRef {
            tree: self.tree,
            id,
        })
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        tree.children(self.id)
            .iter()
            .map(move |&id| NodeRef { tree, id })
    }

    pub fn component_id(&self) -> Result<String> {
        self.tree.component_id(self.id)
    }

    pub fn with_model<R>(&self, f: impl FnOnce(&ComponentModel) -> R) -> Result<R> {
        self.tree.with_model(self.id, f)
    }

    pub fn update_model<R>(&self, f: impl FnOnce(&mut ComponentModel) -> R) -> Result<R> {
        self.tree.update_model(self.id, f)
    }

    pub fn has_overlay(&self) -> Result<bool> {
        self.tree.has_overlay(self.id)
    }

    pub fn reset(&self) -> Result<()> {
        self.tree.reset(self.id)
    }

    /// The current value: an explicitly written value wins, otherwise the
    /// bound bean property (own bean, or the enclosing row's bean).
    pub fn value(&self) -> Result<Value> {
        let (data, bean, property) = self.with_model(|model| {
            (
                model.data.clone(),
                model.bean.clone(),
                model.bean_property.clone(),
            )
        })?;
        if let Some(value) = data {
            return Ok(value);
        }
        let Some(property) = property else {
            return Ok(Value::Null);
        };
        let bean = match bean {
            Some(bean) => Some(bean),
            None => self.row_bean()?,
        };
        Ok(bean
            .as_ref()
            .and_then(|bean| bean_property(bean, &property))
            .map(Value::from_json)
            .unwrap_or_default())
    }

    pub fn set_value(&self, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        self.update_model(|model| model.data = Some(value))
    }

    /// Bean of the innermost row context enclosing this node.
    pub fn row_bean(&self) -> Result<Option<serde_json::Value>> {
        let mut cursor = holder::current();
        while let Some(context) = cursor {
            if let Some(row) = context.row() {
                if self.tree.is_descendant(self.id, row.repeater()) {
                    return Ok(Some(row.bean()));
                }
            }
            cursor = context.parent();
        }
        Ok(None)
    }

    pub fn set_bean(&self, bean: Option<serde_json::Value>) -> Result<()> {
        self.update_model(|model| model.bean = bean)
    }

    pub fn set_bean_property(&self, property: impl Into<String>) -> Result<()> {
        let property = property.into();
        self.update_model(|model| model.bean_property = Some(property))
    }

    pub fn is_visible(&self) -> Result<bool> {
        self.with_model(|model| model.visible)
    }

    pub fn set_visible(&self, visible: bool) -> Result<()> {
        self.update_model(|model| model.visible = visible)
    }

    pub fn is_disabled(&self) -> Result<bool> {
        self.with_model(|model| model.disabled)
    }

    pub fn set_disabled(&self, disabled: bool) -> Result<()> {
        self.update_model(|model| model.disabled = disabled)
    }

    pub fn is_read_only(&self) -> Result<bool> {
        self.with_model(|model| model.read_only)
    }

    pub fn set_read_only(&self, read_only: bool) -> Result<()> {
        self.update_model(|model| model.read_only = read_only)
    }

    pub fn is_mandatory(&self) -> Result<bool> {
        self.with_model(|model| model.mandatory)
    }

    pub fn set_mandatory(&self, mandatory: bool, message: Option<String>) -> Result<()> {
        self.update_model(|model| {
            model.mandatory = mandatory;
            model.mandatory_message = message;
        })
    }

    pub fn label(&self) -> Result<Option<String>> {
        self.with_model(|model| model.label().map(str::to_string))
    }

    /// The label, or the component id when none is set.
    pub fn display_label(&self) -> Result<String> {
        match self.label()? {
            Some(label) => Ok(label),
            None => self.component_id(),
        }
    }

    pub fn set_label(&self, label: impl Into<String>) -> Result<()> {
        let label = label.into();
        self.update_model(|model| model.set_label(Some(label)))
    }

    pub fn add_validator(&self, validator: FieldValidator) -> Result<()> {
        self.update_model(|model| model.validators.push(validator))
    }

    pub fn validators(&self) -> Result<Vec<FieldValidator>> {
        self.with_model(|model| model.validators.clone())
    }

    pub fn margin(&self) -> Result<u32> {
        self.with_model(ComponentModel::margin)
    }

    pub fn set_margin(&self, margin: i32) -> Result<()> {
        self.update_model(|model| model.set_margin(margin))
    }

    pub fn width_percent(&self) -> Result<Option<u8>> {
        self.with_model(ComponentModel::width_percent)
    }

    pub fn set_width_percent(&self, width: Option<u8>) -> Result<()> {
        // A rejected width must not materialise an overlay.
        ComponentModel::default().set_width_percent(width)?;
        self.update_model(|model| model.set_width_percent(width))?
    }

    pub fn attribute(&self, key: &str) -> Result<Option<Value>> {
        self.with_model(|model| model.attributes.get(key).cloned())
    }

    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let (key, value) = (key.into(), value.into());
        self.update_model(|model| {
            model.attributes.insert(key, value);
        })
    }

    /// Whether the last handled request changed this node's value.
    pub fn is_changed(&self) -> Result<bool> {
        self.with_model(|model| model.changed)
    }

    pub fn set_focus(&self) -> Result<()> {
        let context = holder::current().ok_or(Error::NoActiveContext { node: self.id })?;
        context.set_focus(self.id);
        Ok(())
    }
}

/// Looks up a dotted property path; `"."` is the bean itself.
pub(crate) fn bean_property<'b>(
    bean: &'b serde_json::Value,
    property: &str,
) -> Option<&'b serde_json::Value> {
    if property == "." {
        return Some(bean);
    }
    property.split('.').try_fold(bean, |current, segment| match current {
        serde_json::Value::Object(map) => map.get(segment),
        serde_json::Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get(index)),
        _ => None,
    })
}
