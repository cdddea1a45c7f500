//! Unit tests for error classification and aggregation behaviour.

use std::sync::Arc;

use super::MainspringError;

#[test]
fn try_aggregate_none_on_empty() {
    assert!(MainspringError::try_aggregate(Vec::<Arc<MainspringError>>::new()).is_none());
}

#[test]
fn aggregate_panics_on_empty() {
    let empty: Vec<Arc<MainspringError>> = vec![];
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        MainspringError::aggregate(empty)
    }));
    assert!(result.is_err());
}

#[test]
fn single_owned_error_unwraps() {
    let err = Arc::new(MainspringError::MissingValue { path: "a.b".into() });
    let outcome = MainspringError::aggregate(vec![err]);
    assert!(matches!(outcome, MainspringError::MissingValue { .. }));
}

#[test]
fn single_shared_error_stays_aggregated() {
    let shared = MainspringError::missing_arc("a.b");
    let _keep_alive = Arc::clone(&shared);
    match MainspringError::aggregate(vec![shared]) {
        MainspringError::Aggregate(agg) => assert_eq!(agg.len(), 1),
        other => panic!("expected Aggregate, got {other:?}"),
    }
}

#[test]
fn multi_entry_aggregate_lists_every_error() {
    let first = MainspringError::missing_arc("data.path");
    let second = Arc::new(MainspringError::unresolved("name", "no such key"));
    match MainspringError::aggregate(vec![first, second]) {
        MainspringError::Aggregate(agg) => {
            assert_eq!(agg.len(), 2);
            let display = agg.to_string();
            assert!(display.starts_with("1:"));
            assert!(display.contains("\n2:"));
            let owned: Vec<_> = agg.into_iter().collect();
            assert_eq!(owned.len(), 2);
        }
        other => panic!("expected Aggregate, got {other:?}"),
    }
}

#[test]
fn structural_error_carries_path() {
    let err = MainspringError::structural("trainer.devices", "sequence", "mapping");
    assert!(err.to_string().contains("`trainer.devices`"));
}
