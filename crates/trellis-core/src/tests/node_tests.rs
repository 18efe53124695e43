use std::sync::Arc;

use serde_json::json;

use super::support::{locked_tree, Field};
use crate::context::SessionContext;
use crate::error::Error;
use crate::holder::{push_context, with_context};
use crate::model::Value;
use crate::node::ComponentTree;
use crate::repeater::Repeater;

fn form() -> (ComponentTree, usize) {
    let mut tree = ComponentTree::new(Field::container());
    let name = tree.add_named_child(0, "name", Field::input()).unwrap();
    tree.update_default(name, |model| model.data = Some(Value::text("default")))
        .unwrap();
    (tree, name)
}

#[test]
fn overlays_are_isolated_between_sessions() {
    let (tree, name) = form();
    let tree = locked_tree(tree);
    let a = SessionContext::new("a");
    let b = SessionContext::new("b");

    with_context(Arc::clone(&a), || tree.node(name).unwrap().set_value("from a").unwrap());

    let seen_by_b = with_context(Arc::clone(&b), || tree.node(name).unwrap().value().unwrap());
    let seen_by_a = with_context(Arc::clone(&a), || tree.node(name).unwrap().value().unwrap());
    assert_eq!(seen_by_a, Value::text("from a"));
    assert_eq!(seen_by_b, Value::text("default"));
    assert_eq!(tree.node(name).unwrap().value().unwrap(), Value::text("default"));
    assert!(a.has_overlay(name));
    assert!(!b.has_overlay(name));
}

#[test]
fn reads_never_materialise_overlays() {
    let (tree, name) = form();
    let tree = locked_tree(tree);
    let session = SessionContext::new("s");
    with_context(Arc::clone(&session), || {
        let node = tree.node(name).unwrap();
        node.value().unwrap();
        node.is_visible().unwrap();
        assert!(!node.has_overlay().unwrap());
    });
    assert_eq!(session.overlay_count(), 0);
}

#[test]
fn reset_restores_the_default() {
    let (tree, name) = form();
    let tree = locked_tree(tree);
    let session = SessionContext::new("s");
    let _guard = push_context(Arc::clone(&session));
    let node = tree.node(name).unwrap();
    node.set_value("edited").unwrap();
    node.set_disabled(true).unwrap();

    tree.reset(tree.root()).unwrap();
    assert_eq!(node.value().unwrap(), Value::text("default"));
    assert!(!node.is_disabled().unwrap());
    assert_eq!(session.overlay_count(), 0);
}

#[test]
fn unlocked_nodes_write_the_default() {
    let (tree, name) = form();
    let a = SessionContext::new("a");
    with_context(Arc::clone(&a), || tree.node(name).unwrap().set_value("shared").unwrap());
    assert_eq!(a.overlay_count(), 0);
    let seen = with_context(SessionContext::new("b"), || tree.node(name).unwrap().value().unwrap());
    assert_eq!(seen, Value::text("shared"));
    assert_eq!(tree.node(name).unwrap().value().unwrap(), Value::text("shared"));
}

#[test]
fn locked_writes_need_a_context() {
    let (tree, name) = form();
    let tree = locked_tree(tree);
    let err = tree.node(name).unwrap().set_value("nope").unwrap_err();
    assert!(matches!(err, Error::LockedWithoutContext { node } if node == name));
    assert!(err.is_illegal_state());
    assert!(tree.reset(name).is_err());
}

#[test]
fn locked_trees_reject_structural_changes() {
    let (mut tree, name) = form();
    assert!(tree.lock());
    assert!(!tree.lock());
    assert!(matches!(
        tree.add_child(0, Field::input()),
        Err(Error::TreeLocked { .. })
    ));
    assert!(matches!(
        tree.update_default(name, |model| model.mandatory = true),
        Err(Error::TreeLocked { .. })
    ));
}

#[test]
fn ids_follow_naming_contexts() {
    let mut tree = ComponentTree::new(Field::container());
    let group = tree.add_named_child(0, "address", Field::container()).unwrap();
    let street = tree.add_named_child(group, "street", Field::input()).unwrap();
    let anonymous = tree.add_child(group, Field::input()).unwrap();
    assert_eq!(tree.component_id(street).unwrap(), "street");

    tree.set_naming_context(group, true).unwrap();
    assert_eq!(tree.component_id(street).unwrap(), "address-street");
    assert_eq!(
        tree.component_id(anonymous).unwrap(),
        format!("address-c{anonymous}")
    );

    let rows = tree.add_named_child(0, "rows", Repeater::new()).unwrap();
    assert!(tree.is_naming_context(rows));
    assert!(tree.set_naming_context(rows, false).is_err());
    assert!(tree.add_named_child(0, "a-b", Field::input()).is_err());
    assert!(tree.add_named_child(0, "", Field::input()).is_err());
}

#[test]
fn rejected_width_leaves_no_overlay() {
    let (tree, name) = form();
    let tree = locked_tree(tree);
    let session = SessionContext::new("s");
    let _guard = push_context(Arc::clone(&session));
    let node = tree.node(name).unwrap();
    assert!(matches!(
        node.set_width_percent(Some(101)),
        Err(Error::InvalidArgument { .. })
    ));
    assert_eq!(session.overlay_count(), 0);
    node.set_width_percent(Some(50)).unwrap();
    assert_eq!(node.width_percent().unwrap(), Some(50));
    node.set_margin(-4).unwrap();
    assert_eq!(node.margin().unwrap(), 0);
}

#[test]
fn bean_binding_and_explicit_value() {
    let mut tree = ComponentTree::new(Field::container());
    let city = tree.add_named_child(0, "city", Field::input()).unwrap();
    tree.update_default(city, |model| {
        model.bean = Some(json!({"address": {"city": "Oslo"}}));
        model.bean_property = Some("address.city".into());
    })
    .unwrap();
    let tree = locked_tree(tree);
    let _guard = push_context(SessionContext::new("s"));
    let node = tree.node(city).unwrap();
    assert_eq!(node.value().unwrap(), Value::text("Oslo"));
    node.set_value("Bergen").unwrap();
    assert_eq!(node.value().unwrap(), Value::text("Bergen"));
}

#[test]
fn nodes_outside_a_repeater_resolve_in_the_parent_context() {
    let mut tree = ComponentTree::new(Field::container());
    let title = tree.add_named_child(0, "title", Field::input()).unwrap();
    let rows = tree.add_named_child(0, "rows", Repeater::new()).unwrap();
    tree.add_named_child(rows, "cell", Field::input()).unwrap();
    let tree = locked_tree(tree);

    let session = SessionContext::new("s");
    let _guard = push_context(Arc::clone(&session));
    let row = tree
        .repeater(rows)
        .unwrap()
        .set_bean_list(vec![json!(1)])
        .and_then(|_| tree.repeater(rows).unwrap().row_contexts())
        .unwrap()
        .remove(0);

    with_context(Arc::clone(&row), || tree.node(title).unwrap().set_value("shared").unwrap());
    assert!(session.has_overlay(title));
    assert!(!row.has_overlay(title));
    assert_eq!(tree.node(title).unwrap().value().unwrap(), Value::text("shared"));
}

#[test]
fn focus_is_recorded_at_the_root() {
    let (tree, name) = form();
    let tree = locked_tree(tree);
    let session = SessionContext::new("s");
    with_context(Arc::clone(&session), || tree.node(name).unwrap().set_focus().unwrap());
    let focus = session.focus().unwrap();
    assert_eq!(focus.node, name);
    assert_eq!(focus.context, session.id());
    assert!(matches!(
        tree.node(name).unwrap().set_focus(),
        Err(Error::NoActiveContext { .. })
    ));
}

#[test]
fn reset_from_the_session_reaches_row_edits() {
    let mut tree = ComponentTree::new(Field::container());
    let rows = tree.add_named_child(0, "rows", Repeater::new()).unwrap();
    let cell = tree.add_named_child(rows, "cell", Field::input()).unwrap();
    tree.update_default(cell, |model| model.bean_property = Some(".".into()))
        .unwrap();
    let tree = locked_tree(tree);

    let session = SessionContext::new("s");
    let _guard = push_context(Arc::clone(&session));
    let repeater = tree.repeater(rows).unwrap();
    repeater.set_bean_list(vec![json!("a"), json!("b")]).unwrap();
    let before = repeater.row_contexts().unwrap();
    for row in &before {
        with_context(Arc::clone(row), || tree.node(cell).unwrap().set_value("edited").unwrap());
    }

    tree.reset(cell).unwrap();
    let after = repeater.row_contexts().unwrap();
    assert_eq!(after[0].id(), before[0].id());
    let values: Vec<Value> = after
        .iter()
        .map(|row| with_context(Arc::clone(row), || tree.node(cell).unwrap().value().unwrap()))
        .collect();
    assert_eq!(values, vec![Value::text("a"), Value::text("b")]);
    assert!(after.iter().all(|row| !row.has_overlay(cell)));
}

#[test]
fn reset_walks_nested_rows() {
    let mut tree = ComponentTree::new(Field::container());
    let groups = tree.add_named_child(0, "groups", Repeater::new()).unwrap();
    let items = tree.add_named_child(groups, "items", Repeater::new()).unwrap();
    let item = tree.add_named_child(items, "item", Field::input()).unwrap();
    let tree = locked_tree(tree);

    let session = SessionContext::new("s");
    let _guard = push_context(Arc::clone(&session));
    tree.repeater(groups)
        .unwrap()
        .set_bean_list(vec![json!(1), json!(2)])
        .unwrap();
    let mut inner_rows = Vec::new();
    for outer in tree.repeater(groups).unwrap().row_contexts().unwrap() {
        with_context(outer, || {
            let repeater = tree.repeater(items).unwrap();
            repeater.set_bean_list(vec![json!("x")]).unwrap();
            for inner in repeater.row_contexts().unwrap() {
                with_context(Arc::clone(&inner), || {
                    tree.node(item).unwrap().set_value("edited").unwrap()
                });
                inner_rows.push(inner);
            }
        });
    }

    tree.reset(item).unwrap();
    assert_eq!(inner_rows.len(), 2);
    for inner in &inner_rows {
        assert!(!inner.is_disposed());
        assert!(!inner.has_overlay(item));
    }
}

#[test]
fn update_closures_may_read_nodes() {
    let (mut tree, name) = form();
    let other = tree.add_named_child(0, "other", Field::input()).unwrap();
    tree.update_model(other, |model| {
        model.data = Some(tree.node(name).unwrap().value().unwrap());
    })
    .unwrap();
    assert_eq!(tree.node(other).unwrap().value().unwrap(), Value::text("default"));

    let tree = locked_tree(tree);
    let _guard = push_context(SessionContext::new("s"));
    tree.node(other).unwrap().set_value("copied").unwrap();
    tree.update_model(name, |model| {
        let own = tree.node(name).unwrap().value().unwrap();
        let copied = tree.node(other).unwrap().value().unwrap();
        model.data = Some(Value::text(format!("{own}+{copied}")));
    })
    .unwrap();
    assert_eq!(
        tree.node(name).unwrap().value().unwrap(),
        Value::text("default+copied")
    );
}
