//! Extension for mapping errors to `MainspringResult` concisely.
//!
//! Reduces repetitive `.map_err(|e| Arc::new(e.into()))` patterns when
//! converting external error types into the crate's `MainspringResult<T>`
//! alias (`Result<T, Arc<MainspringError>>`).

use std::sync::Arc;

use crate::{MainspringError, MainspringResult};

/// Generic extension for mapping any `Result<T, E>` with
/// `E: Into<MainspringError>` into a `MainspringResult<T>`.
pub trait MainspringResultExt<T, E> {
    /// Convert `Result<T, E>` into `MainspringResult<T>` using
    /// `Into<MainspringError>`.
    ///
    /// # Errors
    ///
    /// Propagates the original error after conversion into
    /// `Arc<MainspringError>`.
    fn into_mainspring(self) -> MainspringResult<T>;
}

impl<T, E> MainspringResultExt<T, E> for Result<T, E>
where
    E: Into<MainspringError>,
{
    fn into_mainspring(self) -> MainspringResult<T> {
        self.map_err(|e| Arc::new(e.into()))
    }
}
