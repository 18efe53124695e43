use std::sync::Arc;

use proptest::prelude::*;

use super::support::{locked_tree, Field};
use crate::context::SessionContext;
use crate::holder::with_context;
use crate::model::Value;
use crate::node::ComponentTree;

const FIELDS: usize = 4;
const SESSIONS: usize = 3;

fn tree() -> ComponentTree {
    let mut tree = ComponentTree::new(Field::container());
    for index in 0..FIELDS {
        let node = tree
            .add_named_child(0, format!("f{index}"), Field::input())
            .unwrap();
        tree.update_default(node, |model| model.data = Some(Value::text("default")))
            .unwrap();
    }
    locked_tree(tree)
}

fn read(tree: &ComponentTree, node: usize) -> Value {
    tree.node(node).unwrap().value().unwrap()
}

proptest! {
    #[test]
    fn writes_stay_in_their_session(
        writes in prop::collection::vec((0..SESSIONS, 1..=FIELDS, "[a-z]{1,6}"), 0..24)
    ) {
        let tree = tree();
        let sessions: Vec<_> = (0..SESSIONS)
            .map(|index| SessionContext::new(format!("s{index}")))
            .collect();
        let mut expected = vec![vec![Value::text("default"); FIELDS + 1]; SESSIONS];

        for (session, node, text) in &writes {
            with_context(Arc::clone(&sessions[*session]), || {
                tree.node(*node).unwrap().set_value(text.as_str()).unwrap();
            });
            expected[*session][*node] = Value::text(text.as_str());
        }

        for (index, session) in sessions.iter().enumerate() {
            for node in 1..=FIELDS {
                let seen = with_context(Arc::clone(session), || read(&tree, node));
                prop_assert_eq!(&seen, &expected[index][node]);
            }
        }
        for node in 1..=FIELDS {
            prop_assert_eq!(read(&tree, node), Value::text("default"));
        }
    }

    #[test]
    fn reset_matches_the_default_view(
        writes in prop::collection::vec((1..=FIELDS, any::<bool>(), "[a-z]{0,4}"), 0..16)
    ) {
        let tree = tree();
        let session = SessionContext::new("s");
        with_context(Arc::clone(&session), || {
            for (node, disable, text) in &writes {
                let handle = tree.node(*node).unwrap();
                handle.set_value(text.as_str()).unwrap();
                handle.set_disabled(*disable).unwrap();
            }
            tree.reset(tree.root()).unwrap();
        });

        prop_assert_eq!(session.overlay_count(), 0);
        for node in 1..=FIELDS {
            let (value, disabled) = with_context(Arc::clone(&session), || {
                let handle = tree.node(node).unwrap();
                (handle.value().unwrap(), handle.is_disabled().unwrap())
            });
            prop_assert_eq!(value, read(&tree, node));
            prop_assert!(!disabled);
        }
    }
}
