// SYNOID Quantum Errors
// Copyright (c) 2026 Xing_The_Creator | SYNOID
//
// Every failure the state engine can produce. Nothing here is fatal:
// callers inspect the error, adjust parameters and retry.

use serde::Serialize;
use thiserror::Error;

/// Coarse classification of a [`StateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    DuplicateEntity,
    NotFound,
    InsufficientResource,
    CapacityExceeded,
    InvalidParameter,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("entity '{0}' already exists")]
    DuplicateEntity(String),

    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    #[error("entity '{entity}' has no attribute '{attribute}'")]
    UnknownAttribute { entity: String, attribute: String },

    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("unknown preset '{0}'")]
    UnknownPreset(String),

    #[error("insufficient {attribute} on '{entity}': requested {requested}, available {available}")]
    InsufficientResource {
        entity: String,
        attribute: String,
        requested: f64,
        available: f64,
    },

    #[error("{attribute} on '{entity}' would reach {attempted}, above capacity {capacity}")]
    CapacityExceeded {
        entity: String,
        attribute: String,
        attempted: f64,
        capacity: f64,
    },

    #[error("store is full ({capacity} entities)")]
    StoreFull { capacity: usize },

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },
}

impl StateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StateError::DuplicateEntity(_) => ErrorKind::DuplicateEntity,
            StateError::UnknownEntity(_)
            | StateError::UnknownAttribute { .. }
            | StateError::UnknownOperation(_)
            | StateError::UnknownPreset(_) => ErrorKind::NotFound,
            StateError::InsufficientResource { .. } => ErrorKind::InsufficientResource,
            StateError::CapacityExceeded { .. } | StateError::StoreFull { .. } => {
                ErrorKind::CapacityExceeded
            }
            StateError::InvalidParameter { .. } => ErrorKind::InvalidParameter,
        }
    }

    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        StateError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type StateResult<T> = Result<T, StateError>;
