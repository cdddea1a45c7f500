//! Aggregation container and iteration support for multiple
//! `MainspringError` values.

use std::{error::Error, fmt, sync::Arc};

use super::MainspringError;

/// Collection of [`MainspringError`]s produced during a single validation or
/// merge attempt.
///
/// # Examples
///
/// ```
/// use mainspring::MainspringError;
/// let e = MainspringError::aggregate(vec![
///     MainspringError::MissingValue { path: "data.path".into() },
///     MainspringError::MissingValue { path: "name".into() },
/// ]);
/// if let MainspringError::Aggregate(agg) = e {
///     assert_eq!(agg.len(), 2);
/// }
/// ```
#[derive(Debug, Default)]
pub struct AggregatedErrors(Vec<Arc<MainspringError>>);

impl AggregatedErrors {
    /// Create a new aggregation from a vector of errors.
    #[must_use]
    pub const fn new(errors: Vec<Arc<MainspringError>>) -> Self {
        Self(errors)
    }

    /// Iterate over the contained errors.
    #[must_use = "iterators should be consumed to inspect errors"]
    pub fn iter(&self) -> impl Iterator<Item = &MainspringError> {
        self.0.iter().map(Arc::as_ref)
    }

    /// Number of errors in the aggregation.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the aggregation is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AggregatedErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}: {e}", i + 1)?;
        }
        Ok(())
    }
}

impl Error for AggregatedErrors {}

impl<'a> IntoIterator for &'a AggregatedErrors {
    type Item = &'a MainspringError;
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, Arc<MainspringError>>,
        fn(&'a Arc<MainspringError>) -> &'a MainspringError,
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter().map(Arc::as_ref)
    }
}

impl IntoIterator for AggregatedErrors {
    type Item = Arc<MainspringError>;
    type IntoIter = std::vec::IntoIter<Arc<MainspringError>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
