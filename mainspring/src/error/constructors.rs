//! Constructors and aggregation helpers for `MainspringError`.

use std::sync::Arc;

use super::{AggregatedErrors, MainspringError};

impl MainspringError {
    /// Tries to build a [`MainspringError`] from an iterator of errors.
    ///
    /// The iterator is consumed eagerly. It returns:
    /// * `None` when no errors are supplied;
    /// * the inner error when a single [`Arc`] is uniquely owned;
    /// * [`Self::Aggregate`] containing that single [`Arc`] when the error is
    ///   already shared; and
    /// * [`Self::Aggregate`] combining every error for two or more inputs.
    #[must_use]
    pub fn try_aggregate<I, E>(errors: I) -> Option<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<Arc<Self>>,
    {
        let mut arcs: Vec<Arc<Self>> = errors.into_iter().map(Into::into).collect();
        if arcs.is_empty() {
            return None;
        }
        Some(if arcs.len() == 1 {
            let last = arcs.pop()?;
            match Arc::try_unwrap(last) {
                Ok(err) => err,
                Err(shared) => Self::Aggregate(Box::new(AggregatedErrors::new(vec![shared]))),
            }
        } else {
            Self::Aggregate(Box::new(AggregatedErrors::new(arcs)))
        })
    }

    /// Build a [`MainspringError`] from at least one error, each of which can
    /// be a `MainspringError` or an `Arc<MainspringError>`.
    ///
    /// # Panics
    ///
    /// Panics if `errors` is empty. Use [`MainspringError::try_aggregate`] to
    /// avoid panicking when the error list may be empty.
    #[must_use]
    #[track_caller]
    pub fn aggregate<I, E>(errors: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Arc<Self>>,
    {
        Self::try_aggregate(errors).map_or_else(
            || panic!("aggregate requires at least one error"),
            |err| err,
        )
    }

    /// Construct an invalid-input error from a message.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Construct a structural-merge error carrying the dotted path and the
    /// two node kinds that clashed.
    #[must_use]
    pub fn structural(path: impl Into<String>, existing: &'static str, incoming: &'static str) -> Self {
        Self::StructuralMerge {
            path: path.into(),
            existing,
            incoming,
        }
    }

    /// Construct an unresolved-interpolation error for a leaf path.
    #[must_use]
    pub fn unresolved(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnresolvedInterpolation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Construct a missing-value error wrapped in an [`Arc`].
    ///
    /// This helper reduces repetition in call sites that accumulate errors
    /// for aggregation.
    #[must_use]
    pub fn missing_arc(path: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::MissingValue { path: path.into() })
    }
}
