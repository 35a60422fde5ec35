//! Error taxonomy of the hook engine.
//!
//! None of these escape a dispatch. Registration and discovery errors are
//! logged and the offending member is skipped; invocation errors are logged
//! and count as a permit.

use labext_core::error::{AppError, ErrorKind};
use thiserror::Error;

/// Why a handler could not be registered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// No override, single event parameter, or catalog entry applied.
    #[error("could not resolve an event type for '{callable}'")]
    UnresolvedEventType {
        /// The callable.
        callable: String,
    },
    /// A parameter has no matching property on the event type.
    #[error("parameter '{parameter}' of '{callable}' matches no property of event '{event}'")]
    UnmatchedParameter {
        /// The callable.
        callable: String,
        /// The parameter name.
        parameter: String,
        /// The event type name.
        event: String,
    },
    /// The declared return type has no runner.
    #[error("'{callable}' returns unsupported type '{returns}'")]
    UnsupportedReturn {
        /// The callable.
        callable: String,
        /// The declared return type.
        returns: String,
    },
    /// The same callable is already registered for the same instance.
    #[error("'{callable}' is already registered for this instance")]
    Duplicate {
        /// The callable.
        callable: String,
    },
    /// An instance callable was registered without an owner.
    #[error("'{callable}' requires an owning instance")]
    MissingInstance {
        /// The callable.
        callable: String,
    },
    /// The owning instance was already disposed.
    #[error("owner of '{callable}' has been disposed")]
    DeadInstance {
        /// The callable.
        callable: String,
    },
}

/// Failure while binding or invoking a single handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvocationError {
    /// A bound property could not be read from the event.
    #[error("property '{property}' could not be read from event '{event}'")]
    UnreadableProperty {
        /// The property name.
        property: String,
        /// The event type name.
        event: String,
    },
    /// The arguments handed to the body do not fit its signature.
    #[error("argument mismatch: expected {expected}")]
    ArgumentMismatch {
        /// What the body expected.
        expected: String,
    },
    /// The body returned a value its runner cannot interpret.
    #[error("runner for {runner} received {received}")]
    UnexpectedReturn {
        /// The runner name.
        runner: &'static str,
        /// The value kind received.
        received: &'static str,
    },
    /// A handler that writes to the event ran on a read-only dispatch.
    #[error("event '{event}' was dispatched read-only")]
    ReadOnlyEvent {
        /// The event type name.
        event: String,
    },
    /// The handler body reported an error.
    #[error("handler failed: {0}")]
    Failed(String),
    /// The handler body panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

/// Problem found while scanning a module.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    /// The module could not describe its types.
    #[error("module '{module}' could not declare its types: {reason}")]
    Declaration {
        /// The module id.
        module: String,
        /// Why declaration failed.
        reason: String,
    },
    /// A delegate field has no backing field to invoke.
    #[error("delegate '{type_name}.{field}' has no backing field")]
    MissingBackingField {
        /// The declaring type.
        type_name: String,
        /// The field name.
        field: String,
    },
    /// A delegate field has a signature that cannot be subscribed.
    #[error("delegate '{type_name}.{field}' has unsupported signature '{signature}'")]
    UnsupportedDelegate {
        /// The declaring type.
        type_name: String,
        /// The field name.
        field: String,
        /// The declared signature.
        signature: String,
    },
    /// A no-argument delegate has neither an override nor a catalog entry.
    #[error("delegate '{type_name}.{field}' has no resolvable event type")]
    UnresolvedDelegate {
        /// The declaring type.
        type_name: String,
        /// The field name.
        field: String,
    },
}

impl From<RegistrationError> for AppError {
    fn from(err: RegistrationError) -> Self {
        let kind = match err {
            RegistrationError::Duplicate { .. } => ErrorKind::Conflict,
            _ => ErrorKind::Registration,
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}

impl From<InvocationError> for AppError {
    fn from(err: InvocationError) -> Self {
        AppError::with_source(ErrorKind::Invocation, err.to_string(), err)
    }
}

impl From<DiscoveryError> for AppError {
    fn from(err: DiscoveryError) -> Self {
        AppError::with_source(ErrorKind::Discovery, err.to_string(), err)
    }
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
