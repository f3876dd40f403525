//! Path-addressable trees and staged cells, exercised through the public API.

use lark::{
    tree_path, Buffered, BufferedPathSubjects, Error, Json, Scalar, Signal, Step, Tree,
    MAX_ARRAY_PADDING,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

fn arb_json() -> impl Strategy<Value = Json> {
    let leaf = prop_oneof![
        any::<bool>().prop_map(Json::from),
        any::<i64>().prop_map(Json::from),
        "[a-z]{0,4}".prop_map(Json::from),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Json::Array),
            prop::collection::hash_map("[abc]", inner, 0..4).prop_map(Json::Dictionary),
        ]
    })
}

fn arb_step() -> impl Strategy<Value = Step<String>> {
    prop_oneof![
        (0usize..4).prop_map(Step::Index),
        "[abc]".prop_map(Step::Key),
    ]
}

proptest! {
    #[test]
    fn prop_write_then_read(
        tree in arb_json(),
        path in prop::collection::vec(arb_step(), 0..5),
        value in arb_json(),
    ) {
        let mut tree = tree;
        tree.set(&path, Some(value.clone()));
        prop_assert_eq!(tree.get(&path), Some(&value));
    }

    #[test]
    fn prop_empty_path_replaces(tree in arb_json(), value in arb_json()) {
        let mut t = tree;
        t.set(&[], Some(value.clone()));
        prop_assert_eq!(t, value);
    }

    #[test]
    fn prop_leaf_absorbs_any_path(
        n in any::<i64>(),
        path in prop::collection::vec(arb_step(), 0..5),
    ) {
        let leaf = Json::from(n);
        prop_assert_eq!(leaf.get(&path), Some(&leaf));
    }

    #[test]
    fn prop_json_roundtrip(tree in arb_json()) {
        let value = serde_json::Value::from(&tree);
        prop_assert_eq!(Json::from(&value), tree);
    }
}

#[test]
fn test_absent_vs_empty() {
    let tree = Json::from(json!({"empty": {}, "list": []}));
    assert_eq!(tree.get(&[Step::key("empty")]), Some(&Json::empty()));
    assert_eq!(tree.get(&[Step::key("list"), Step::Index(0)]), None);
    assert_eq!(tree.get(&[Step::key("nope")]), None);
    assert!(!tree.contains(&[Step::key("nope")]));
}

#[test]
fn test_get_or_default() {
    let tree = Json::from(json!({"a": 1}));
    assert_eq!(tree.get_or(&[Step::key("b")], Json::from(0)), Json::from(0));
    assert_eq!(tree.get_or(&[Step::key("a")], Json::from(0)), Json::from(1));
}

#[test]
fn test_builder_style_construction() {
    let tree = Json::empty()
        .with(&[Step::key("user"), Step::key("name")], "ada")
        .with(&[Step::key("user"), Step::key("tags"), Step::Index(1)], "b");
    assert_eq!(
        tree,
        Json::from(json!({"user": {"name": "ada", "tags": [{}, "b"]}}))
    );
}

#[test]
fn test_serde_uses_plain_json() {
    let tree = Json::from(json!({"a": [1, true]}));
    let text = serde_json::to_string(&tree).unwrap();
    let back: Json = serde_json::from_str(&text).unwrap();
    assert_eq!(back, tree);
    assert_eq!(tree.to_string(), text);
}

#[test]
fn test_tree_as_signal() {
    assert_eq!(Json::from(true).scalar(), Some(Scalar::Bool(true)));
    assert_eq!(Json::empty().scalar(), None);
    assert_eq!(<Json as Signal>::from_scalar(Scalar::Int(2)), Json::from(2));
    // null has no truth reading, so the default comes back
    assert!(Json::from(Scalar::Null).cast_or(true));
}

#[test]
fn test_unreachable_index_leaves_tree_alone() {
    let mut tree = Json::from(json!({"list": [1, 2]}));
    let before = tree.clone();

    for index in [usize::MAX, 2 + MAX_ARRAY_PADDING + 1] {
        let path = [Step::key("list"), Step::Index(index)];
        let result = tree.try_set(&path, Some(Json::from(0)));
        assert!(matches!(result, Err(Error::IndexOutOfRange { len: 2, .. })));
        tree.set(&path, Some(Json::from(0)));
        assert_eq!(tree, before);
    }

    tree.try_set(&[Step::key("list"), Step::Index(4)], Some(Json::from(5))).unwrap();
    assert_eq!(tree, Json::from(json!({"list": [1, 2, {}, {}, 5]})));
}

#[test]
fn test_generic_keys() {
    let mut tree: Tree<u32, Scalar> = Tree::empty();
    tree.set(&[Step::Key(7), Step::Index(0)], Some(Tree::Leaf(Scalar::Int(1))));
    assert_eq!(tree.get(&[Step::Key(7), Step::Index(0)]), Some(&Tree::Leaf(Scalar::Int(1))));
    assert_eq!(tree.get(&[Step::Key(8)]), None);
}

#[test]
fn test_buffered_tree_and_subjects_together() {
    let name = tree_path([Step::key("name")]);
    let score = tree_path([Step::key("score")]);

    let mut subjects = BufferedPathSubjects::new(Json::from(json!({"name": "ada", "score": 1})));
    let name_rx = subjects.subscribe(&name);
    let score_rx = subjects.subscribe(&score);

    subjects.set(&score, Some(Json::from(2)));
    assert_eq!(subjects.get(&score), Some(Json::from(1)));
    assert!(subjects.value().is_dirty());
    assert_eq!(
        subjects.value().committed_view(),
        Buffered::new(Json::from(json!({"name": "ada", "score": 2})))
    );

    assert!(subjects.commit());
    assert_eq!(*score_rx.borrow(), Some(Json::from(2)));
    assert!(score_rx.has_changed().unwrap());
    assert!(!name_rx.has_changed().unwrap());
    assert!(!subjects.commit());
}
