//! Trait-based conversions between external error types and
//! `MainspringError`.

use super::MainspringError;

impl From<serde_json::Error> for MainspringError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(Box::new(e))
    }
}

impl From<serde_yaml::Error> for MainspringError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Yaml(Box::new(e))
    }
}
