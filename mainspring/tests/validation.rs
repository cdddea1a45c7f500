//! Tests for validation reporting and the merge post-passes.

use mainspring::{
    check, from_value, merge_with, validate, ConfigNode, ErrorMode, MainspringError, MergeOptions,
    ResolverRegistry,
};
use rstest::rstest;
use serde_json::json;

fn tree(v: serde_json::Value) -> ConfigNode {
    from_value(v).expect("tree")
}

#[test]
fn accumulate_mode_names_every_offending_path() {
    let node = tree(json!({
        "data": {"path": "???"},
        "run": {"name": "${data.path}", "seed": "???"},
    }));
    let err = check(&node, ErrorMode::Accumulate).expect_err("invalid");
    let MainspringError::Aggregate(agg) = &*err else {
        panic!("expected Aggregate, got {err}");
    };
    let rendered = agg.iter().map(ToString::to_string).collect::<Vec<_>>();
    assert_eq!(agg.len(), 3);
    assert!(rendered.iter().any(|m| m.contains("data.path")));
    assert!(rendered.iter().any(|m| m.contains("run.name")));
    assert!(rendered.iter().any(|m| m.contains("run.seed")));
}

#[rstest]
#[case(json!({"a": "???"}), "a")]
#[case(json!({"outer": {"inner": "???"}}), "outer.inner")]
#[case(json!({"xs": [1, "???"]}), "xs[1]")]
fn fail_fast_reports_the_first_path(#[case] v: serde_json::Value, #[case] expected: &str) {
    let err = check(&tree(v), ErrorMode::FailFast).expect_err("invalid");
    assert!(matches!(
        &*err,
        MainspringError::MissingValue { path } if path == expected
    ));
}

#[test]
fn validate_returns_a_resolved_copy_and_leaves_the_input_alone() {
    let node = tree(json!({"a": 1, "b": "${a}"}));
    let resolved = validate(&node, &ResolverRegistry::new()).expect("valid");
    assert_eq!(resolved.select("b"), Some(&ConfigNode::from(1)));
    assert!(node.select("b").expect("b").is_interpolation());
}

#[test]
fn validate_rejects_a_tree_with_missing_values() {
    let node = tree(json!({"a": "???"}));
    assert!(validate(&node, &ResolverRegistry::new()).is_err());
}

#[test]
fn merge_with_post_passes_resolves_and_validates() {
    let registry = ResolverRegistry::new();
    let options = MergeOptions {
        resolvers: Some(&registry),
        validate: true,
        ..MergeOptions::default()
    };
    let merged = merge_with(
        &[
            tree(json!({"data": {"path": "???"}, "name": "run-${data.path}"})),
            tree(json!({"data": {"path": "/train"}})),
        ],
        &options,
    )
    .expect("merge");
    assert_eq!(merged.select("name"), Some(&ConfigNode::from("run-/train")));
}

#[test]
fn merge_with_validation_fails_while_values_are_still_missing() {
    let registry = ResolverRegistry::new();
    let options = MergeOptions {
        resolvers: Some(&registry),
        validate: true,
        ..MergeOptions::default()
    };
    let err = merge_with(&[tree(json!({"data": {"path": "???"}}))], &options)
        .expect_err("incomplete");
    assert!(matches!(&*err, MainspringError::MissingValue { path } if path == "data.path"));
}
