//! Process-wide registry of locked trees.
//!
//! Trees are built once per key, locked, and then shared read-only by every
//! session. Lookups take a read lock only; builds are serialised behind a
//! single mutation lock so a key is never built twice.

use std::sync::{Arc, Mutex, RwLock};

use once_cell::sync::Lazy;
use tracing::info;

use crate::collections::map::HashMap;
use crate::error::Result;
use crate::node::ComponentTree;
use crate::sync::{lock, read, write};

static GLOBAL_REGISTRY: Lazy<TreeRegistry> = Lazy::new(TreeRegistry::new);

#[derive(Default)]
pub struct TreeRegistry {
    trees: RwLock<HashMap<String, Arc<ComponentTree>>>,
    build: Mutex<()>,
}

impl std::fmt::Debug for TreeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeRegistry")
            .field("trees", &self.len())
            .finish()
    }
}

impl TreeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> &'static TreeRegistry {
        &GLOBAL_REGISTRY
    }

    /// Returns the tree registered under `key`, building and locking it
    /// first if needed. A failed build registers nothing.
    pub fn get_or_register<F>(&self, key: &str, build: F) -> Result<Arc<ComponentTree>>
    where
        F: FnOnce() -> Result<ComponentTree>,
    {
        if let Some(tree) = self.get(key) {
            return Ok(tree);
        }
        let _build = lock(&self.build);
        if let Some(tree) = self.get(key) {
            return Ok(tree);
        }
        let tree = build()?;
        tree.lock();
        let tree = Arc::new(tree);
        write(&self.trees).insert(key.to_string(), Arc::clone(&tree));
        info!(key, nodes = tree.len(), "tree registered");
        Ok(tree)
    }

    pub fn get(&self, key: &str) -> Option<Arc<ComponentTree>> {
        read(&self.trees).get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        read(&self.trees).contains_key(key)
    }

    pub fn len(&self) -> usize {
        read(&self.trees).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
