//! Tests for layered merge precedence and schema interaction.

use mainspring::{
    edit_list, from_dotlist, from_value, from_yaml, merge, ConfigNode, FieldType, MainspringError,
    Schema,
};
use rstest::rstest;
use serde_json::json;

fn tree(v: serde_json::Value) -> ConfigNode {
    from_value(v).expect("tree")
}

#[test]
fn rightmost_layer_wins_on_scalars() {
    let merged = merge(&[
        tree(json!({"data": {"path": "???"}, "name": "default"})),
        tree(json!({"data": {"path": "/train"}})),
    ])
    .expect("merge");
    assert_eq!(merged, tree(json!({"data": {"path": "/train"}, "name": "default"})));
}

#[rstest]
#[case(&["a=1", "a=2", "a=3"], json!({"a": 3}))]
#[case(&["a.b=x", "a.c=y"], json!({"a": {"b": "x", "c": "y"}}))]
#[case(&["flag=true", "port=8080"], json!({"flag": true, "port": 8080}))]
fn dotlist_overrides_fold_left_to_right(
    #[case] options: &[&str],
    #[case] expected: serde_json::Value,
) {
    let node = from_dotlist(options).expect("dotlist");
    assert_eq!(node, tree(expected));
}

#[test]
fn mappings_merge_key_by_key() {
    let merged = merge(&[
        tree(json!({"m": {"a": 1, "b": 2}})),
        tree(json!({"m": {"b": 20, "c": 30}})),
    ])
    .expect("merge");
    assert_eq!(merged, tree(json!({"m": {"a": 1, "b": 20, "c": 30}})));
}

#[test]
fn sequences_are_replaced_wholesale() {
    let merged = merge(&[
        tree(json!({"xs": [1, 2, 3]})),
        tree(json!({"xs": [9]})),
    ])
    .expect("merge");
    assert_eq!(merged, tree(json!({"xs": [9]})));
}

#[test]
fn interpolation_override_replaces_rather_than_merges() {
    let merged = merge(&[
        tree(json!({"db": {"host": "localhost", "port": 5432}})),
        tree(json!({"db": "${defaults.db}"})),
    ])
    .expect("merge");
    assert!(merged.select("db").expect("db").is_interpolation());
}

#[test]
fn mapping_and_sequence_cannot_be_reconciled() {
    let err = merge(&[tree(json!({"x": {"a": 1}})), tree(json!({"x": [1]}))])
        .expect_err("clash");
    assert!(matches!(&*err, MainspringError::StructuralMerge { path, .. } if path == "x"));
}

#[test]
fn operands_are_never_mutated() {
    let base = tree(json!({"a": {"b": 1}}));
    let over = tree(json!({"a": {"b": 2}}));
    let before = (base.clone(), over.clone());
    merge(&[base.clone(), over.clone()]).expect("merge");
    assert_eq!((base, over), before);
}

#[test]
fn merge_of_nothing_is_an_empty_mapping() {
    let merged = merge(&[]).expect("merge");
    assert_eq!(merged, ConfigNode::mapping());
}

#[test]
fn closed_schema_rejects_undeclared_keys() {
    let schema = Schema::builder("server")
        .field("host", FieldType::Str)
        .field("port", FieldType::Int)
        .build();
    let mut base = tree(json!({"host": "localhost", "port": 80}));
    base.as_mapping_mut().expect("mapping").bind_schema(schema);
    let err = merge(&[base, tree(json!({"hots": "oops"}))]).expect_err("typo");
    assert!(matches!(
        &*err,
        MainspringError::SchemaViolation { key, .. } if key == "hots"
    ));
}

#[test]
fn open_schema_accepts_extra_keys() {
    let schema = Schema::builder("bag").field("known", FieldType::Int).open().build();
    let mut base = tree(json!({"known": 1}));
    base.as_mapping_mut().expect("mapping").bind_schema(schema);
    let merged = merge(&[base, tree(json!({"extra": "fine"}))]).expect("merge");
    assert_eq!(
        merged.select("extra"),
        Some(&ConfigNode::from("fine"))
    );
}

#[test]
fn declared_record_is_seeded_before_the_structural_merge() {
    let inner = Schema::builder("optim")
        .field_with_default("lr", FieldType::Float, ConfigNode::from(0.001))
        .field_with_default("momentum", FieldType::Float, ConfigNode::from(0.9))
        .build();
    let outer = Schema::builder("train")
        .field("optim", FieldType::Record(inner))
        .build();
    let mut base = tree(json!({"optim": "???"}));
    base.as_mapping_mut().expect("mapping").bind_schema(outer);
    let merged = merge(&[base, tree(json!({"optim": {"lr": 0.01}}))]).expect("merge");
    assert_eq!(merged.select("optim.lr"), Some(&ConfigNode::from(0.01)));
    assert_eq!(merged.select("optim.momentum"), Some(&ConfigNode::from(0.9)));
}

#[test]
fn edit_list_patches_individual_elements() {
    let seq = tree(json!(["a", "b", "c"]));
    let edits = from_dotlist(["1=B"]).expect("edits");
    let patched = edit_list(&seq, edits.as_mapping().expect("mapping")).expect("patch");
    assert_eq!(patched, tree(json!(["a", "B", "c"])));
}

#[test]
fn edit_list_rejects_out_of_range_indices() {
    let seq = tree(json!(["a"]));
    let edits = from_dotlist(["5=x"]).expect("edits");
    let err = edit_list(&seq, edits.as_mapping().expect("mapping")).expect_err("range");
    assert!(matches!(&*err, MainspringError::IndexOutOfRange { index: 5, len: 1 }));
}

#[test]
fn yaml_layers_merge_like_value_layers() {
    let base = from_yaml("app:\n  name: demo\n  level: info\n").expect("base");
    let site = from_yaml("app:\n  level: debug\n").expect("site");
    let merged = merge(&[base, site]).expect("merge");
    assert_eq!(merged, tree(json!({"app": {"name": "demo", "level": "debug"}})));
}
