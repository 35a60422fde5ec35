//! Runners: invoke a bound handler and normalize its return value.

use tracing::debug;

use crate::coroutine::{CoroutineHandle, TickScheduler};
use crate::error::{InvocationError, RegistrationError};

use super::callable::{Arguments, Callable, HookReturn, ReturnKind};

/// Normalized result of one handler invocation.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The handler lets the action proceed.
    Permit,
    /// The handler denies the action.
    Deny(Option<String>),
    /// The handler continues on the tick scheduler; counts as a permit.
    Scheduled(CoroutineHandle),
}

/// Invocation strategy, selected by declared return shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runner {
    /// `()`, `bool`, or [`Cancellation`](super::callable::Cancellation).
    Simple,
    /// [`Routine`](crate::coroutine::Routine), handed to the scheduler.
    Coroutine,
}

impl Runner {
    /// Selects the runner for `callable`.
    pub fn select(callable: &Callable) -> Result<Self, RegistrationError> {
        match callable.returns() {
            ReturnKind::Unit | ReturnKind::Bool | ReturnKind::Cancellation => Ok(Self::Simple),
            ReturnKind::Coroutine => Ok(Self::Coroutine),
            ReturnKind::Unsupported(returns) => Err(RegistrationError::UnsupportedReturn {
                callable: callable.id().to_string(),
                returns: returns.to_string(),
            }),
        }
    }

    /// Invokes `callable` with bound `args`.
    pub fn run(
        &self,
        callable: &Callable,
        args: Arguments<'_>,
        scheduler: &TickScheduler,
    ) -> Result<Outcome, InvocationError> {
        let returned = callable.call(args)?;

        match (self, returned) {
            (Self::Simple, HookReturn::Unit) => Ok(Outcome::Permit),
            (Self::Simple, HookReturn::Bool(true)) => Ok(Outcome::Permit),
            (Self::Simple, HookReturn::Bool(false)) => Ok(Outcome::Deny(None)),
            (Self::Simple, HookReturn::Cancellation(cancellation)) => {
                if cancellation.is_allowed() {
                    Ok(Outcome::Permit)
                } else {
                    Ok(Outcome::Deny(cancellation.reason().map(str::to_string)))
                }
            }
            (Self::Coroutine, HookReturn::Coroutine(routine)) => {
                let handle = scheduler.spawn(callable.id().to_string(), routine);
                debug!(callable = %callable.id(), coroutine = handle.id(), "Handler continues as coroutine");
                Ok(Outcome::Scheduled(handle))
            }
            (runner, other) => Err(InvocationError::UnexpectedReturn {
                runner: runner.name(),
                received: other.kind_name(),
            }),
        }
    }

    /// Short name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Coroutine => "coroutine",
        }
    }
}
