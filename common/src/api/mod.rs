pub mod daemon;

use serde::{Deserialize, Serialize};

// Closed error taxonomy exposed to adapters.
// Every error the core produces maps onto exactly one of these kinds;
// the human readable message travels next to it, never instead of it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    StateConflict,
    InsufficientFunds,
    NotFound,
    Duplicate,
    AuthorizationFailure,
    BackingStoreUnavailable,
    PolicyRejection,
}

// Machine readable error as served to adapters
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}
