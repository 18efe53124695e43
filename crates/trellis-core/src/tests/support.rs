use crate::component::Component;
use crate::error::Result;
use crate::model::Value;
use crate::node::{ComponentTree, NodeRef};
use crate::request::Request;

/// Minimal component for core tests: a plain container, or a text input
/// that reads the parameter named by its id.
pub(crate) struct Field {
    input: bool,
}

impl Field {
    pub(crate) fn container() -> Self {
        Self { input: false }
    }

    pub(crate) fn input() -> Self {
        Self { input: true }
    }
}

impl Component for Field {
    fn kind(&self) -> &'static str {
        if self.input {
            "field"
        } else {
            "group"
        }
    }

    fn is_input(&self) -> bool {
        self.input
    }

    fn read_request(&self, node: &NodeRef<'_>, request: &dyn Request) -> Result<Option<Value>> {
        let Some(parameter) = request.parameter(&node.component_id()?) else {
            return Ok(None);
        };
        Ok(Some(match parameter.first() {
            "" => Value::Null,
            text => Value::text(text),
        }))
    }
}

pub(crate) fn locked_tree(tree: ComponentTree) -> ComponentTree {
    tree.lock();
    tree
}
