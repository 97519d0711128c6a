use std::fmt;

use crate::store::StoreError;
use crate::validate::ValidationError;

/// Composite failure surface of `save`: the validation pre-check or the
/// store write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveError {
    Validation(ValidationError),
    Store(StoreError),
}

impl fmt::Display for SaveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SaveError::Validation(error) => write!(f, "save aborted: {}", error),
            SaveError::Store(error) => write!(f, "save failed: {}", error),
        }
    }
}

impl std::error::Error for SaveError {}
