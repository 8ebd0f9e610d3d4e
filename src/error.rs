use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ResourceKind;
use crate::mutation::Operation;

/// One rejected form field, as reported locally or by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failures reported by a remote resource gateway.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    #[error("service unavailable: {0}")]
    Transport(String),

    #[error("session is no longer valid: {0}")]
    Auth(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {}", join_fields(.0))]
    Validation(Vec<FieldError>),
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

/// How a screen presents a failure to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// Show the error with a manual retry affordance.
    Retry,
    /// Hand control back to the caller so it can re-authenticate.
    Reauthenticate,
    /// Inline, dismissible message.
    Inline,
    /// Per-field messages on a form that stays editable.
    Fields,
}

impl GatewayError {
    pub fn surface(&self) -> Surface {
        match self {
            GatewayError::Transport(_) => Surface::Retry,
            GatewayError::Auth(_) => Surface::Reauthenticate,
            GatewayError::NotFound(_) | GatewayError::Conflict(_) => Surface::Inline,
            GatewayError::Validation(_) => Surface::Fields,
        }
    }
}

/// Failures of a confirmation-gated mutation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MutationError {
    #[error("another action is still executing")]
    Busy,

    #[error("{operation} is not available for {kind}")]
    Unsupported {
        operation: Operation,
        kind: ResourceKind,
    },

    #[error("{kind} #{id} is not part of the current view")]
    UnknownTarget { kind: ResourceKind, id: u64 },

    #[error("no action is awaiting confirmation")]
    NothingToConfirm,

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("service returned an inconsistent record: {0}")]
    InvalidRecord(String),
}

impl MutationError {
    pub fn surface(&self) -> Surface {
        match self {
            MutationError::Gateway(e) => e.surface(),
            _ => Surface::Inline,
        }
    }
}

/// Failures of a create/edit form submission.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    #[error("form has invalid fields: {}", join_fields(.0))]
    Invalid(Vec<FieldError>),

    #[error(transparent)]
    Gateway(GatewayError),

    #[error("service saved an inconsistent record: {0}")]
    InvalidRecord(String),
}

impl From<GatewayError> for FormError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Validation(fields) => FormError::Invalid(fields),
            other => FormError::Gateway(other),
        }
    }
}

impl FormError {
    pub fn surface(&self) -> Surface {
        match self {
            FormError::Invalid(_) => Surface::Fields,
            FormError::Gateway(e) => e.surface(),
            FormError::InvalidRecord(_) => Surface::Inline,
        }
    }

    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            FormError::Invalid(fields) => fields,
            FormError::Gateway(_) | FormError::InvalidRecord(_) => &[],
        }
    }
}
