//! Callables: a handler body plus the signature the registry inspects.
//!
//! A [`Callable`] carries its identity, declared parameters, declared return
//! shape, and receiver kind. Those are what registration resolves the event
//! type, binder, and runner from; the body itself is only run at dispatch.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use labext_core::{Event, EventArgs, EventType};
use serde_json::Value;

use crate::coroutine::Routine;
use crate::error::InvocationError;

/// Qualified name identifying a callable (e.g. `"scp_tweaks::Lunge::on_lunging"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallableId(Cow<'static, str>);

impl CallableId {
    /// Creates an identifier.
    ///
    /// # Panics
    /// Panics if `name` is empty.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "callable id must not be empty");
        Self(name)
    }

    /// Returns the name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declared type of one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// The parameter is a whole event-argument value.
    Event(EventType),
    /// The parameter is a whole event-argument value the handler may modify.
    EventMut(EventType),
    /// The parameter is a plain value, named by its type for diagnostics.
    Value(&'static str),
}

/// One declared parameter.
#[derive(Debug, Clone)]
pub struct Parameter {
    /// Parameter name, matched case-insensitively against event properties.
    pub name: Cow<'static, str>,
    /// Declared type.
    pub ty: ParamType,
}

impl Parameter {
    /// A parameter receiving the whole event `E`.
    pub fn event<E: Event>(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ty: ParamType::Event(EventType::of::<E>()),
        }
    }

    /// A parameter receiving the whole event `E` mutably.
    pub fn event_mut<E: Event>(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ty: ParamType::EventMut(EventType::of::<E>()),
        }
    }

    /// A plain value parameter.
    pub fn value(name: impl Into<Cow<'static, str>>, type_name: &'static str) -> Self {
        Self {
            name: name.into(),
            ty: ParamType::Value(type_name),
        }
    }

    /// Returns the event type when this parameter receives a whole event.
    pub fn event_type(&self) -> Option<EventType> {
        match self.ty {
            ParamType::Event(event) | ParamType::EventMut(event) => Some(event),
            ParamType::Value(_) => None,
        }
    }

    /// Returns whether this parameter writes to the event.
    pub fn is_mut(&self) -> bool {
        matches!(self.ty, ParamType::EventMut(_))
    }
}

/// Declared return shape of a callable. Selects the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    /// Returns nothing. Always permits.
    Unit,
    /// Returns `false` to deny.
    Bool,
    /// Returns a [`Cancellation`].
    Cancellation,
    /// Returns a [`Routine`] driven by the tick scheduler.
    Coroutine,
    /// Any other type; no runner exists for it.
    Unsupported(&'static str),
}

impl fmt::Display for ReturnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("()"),
            Self::Bool => f.write_str("bool"),
            Self::Cancellation => f.write_str("Cancellation"),
            Self::Coroutine => f.write_str("Routine"),
            Self::Unsupported(name) => f.write_str(name),
        }
    }
}

/// Whether a callable needs an owning instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    /// Free function.
    Static,
    /// Method on an object whose liveness is tracked by an instance token.
    Instance,
}

/// Arguments produced by a binder for one invocation.
#[derive(Debug)]
pub enum Arguments<'a> {
    /// No arguments.
    None,
    /// The event object itself.
    Event(&'a dyn EventArgs),
    /// The event object itself, writable.
    EventMut(&'a mut dyn EventArgs),
    /// Property values in parameter order.
    Values(Vec<Value>),
}

/// Allow/deny result for handlers that explain their decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancellation {
    allowed: bool,
    reason: Option<String>,
}

impl Cancellation {
    /// Lets the action proceed.
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    /// Denies the action.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }

    /// Returns whether the action may proceed.
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Returns the denial reason, if any.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

/// Normalized value produced by a handler body.
pub enum HookReturn {
    /// Nothing.
    Unit,
    /// A boolean permit (`true`) or deny (`false`).
    Bool(bool),
    /// An explicit allow/deny.
    Cancellation(Cancellation),
    /// Work to continue on the tick scheduler.
    Coroutine(Routine),
}

impl HookReturn {
    /// Short name used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Bool(_) => "bool",
            Self::Cancellation(_) => "cancellation",
            Self::Coroutine(_) => "coroutine",
        }
    }
}

impl fmt::Debug for HookReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("Unit"),
            Self::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            Self::Cancellation(value) => f.debug_tuple("Cancellation").field(value).finish(),
            Self::Coroutine(_) => f.write_str("Coroutine(..)"),
        }
    }
}

/// Conversion from a handler's Rust return type into a [`HookReturn`].
pub trait IntoHookReturn {
    /// Return shape declared to the registry.
    const KIND: ReturnKind;

    /// Converts the value.
    fn into_hook_return(self) -> Result<HookReturn, InvocationError>;
}

impl IntoHookReturn for () {
    const KIND: ReturnKind = ReturnKind::Unit;

    fn into_hook_return(self) -> Result<HookReturn, InvocationError> {
        Ok(HookReturn::Unit)
    }
}

impl IntoHookReturn for bool {
    const KIND: ReturnKind = ReturnKind::Bool;

    fn into_hook_return(self) -> Result<HookReturn, InvocationError> {
        Ok(HookReturn::Bool(self))
    }
}

impl IntoHookReturn for Cancellation {
    const KIND: ReturnKind = ReturnKind::Cancellation;

    fn into_hook_return(self) -> Result<HookReturn, InvocationError> {
        Ok(HookReturn::Cancellation(self))
    }
}

impl IntoHookReturn for Routine {
    const KIND: ReturnKind = ReturnKind::Coroutine;

    fn into_hook_return(self) -> Result<HookReturn, InvocationError> {
        Ok(HookReturn::Coroutine(self))
    }
}

impl<R, E> IntoHookReturn for Result<R, E>
where
    R: IntoHookReturn,
    E: fmt::Display,
{
    const KIND: ReturnKind = R::KIND;

    fn into_hook_return(self) -> Result<HookReturn, InvocationError> {
        match self {
            Ok(value) => value.into_hook_return(),
            Err(e) => Err(InvocationError::Failed(e.to_string())),
        }
    }
}

type Body = Arc<dyn Fn(Arguments<'_>) -> Result<HookReturn, InvocationError> + Send + Sync>;

/// A handler body with its declared signature.
#[derive(Clone)]
pub struct Callable {
    id: CallableId,
    params: Arc<[Parameter]>,
    returns: ReturnKind,
    receiver: Receiver,
    body: Body,
}

impl Callable {
    /// A handler taking no parameters.
    pub fn nullary<R, F>(id: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        R: IntoHookReturn,
        F: Fn() -> R + Send + Sync + 'static,
    {
        Self::raw(id, Vec::new(), R::KIND, move |_args: Arguments<'_>| {
            f().into_hook_return()
        })
    }

    /// A handler taking the whole event `E`.
    pub fn for_event<E, R, F>(id: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        E: Event,
        R: IntoHookReturn,
        F: Fn(&E) -> R + Send + Sync + 'static,
    {
        let params = vec![Parameter::event::<E>("ev")];
        Self::raw(id, params, R::KIND, move |args: Arguments<'_>| {
            let event = match &args {
                Arguments::Event(event) => event.as_any().downcast_ref::<E>(),
                Arguments::EventMut(event) => event.as_any().downcast_ref::<E>(),
                _ => None,
            };
            match event {
                Some(event) => f(event).into_hook_return(),
                None => Err(InvocationError::ArgumentMismatch {
                    expected: E::NAME.to_string(),
                }),
            }
        })
    }

    /// A handler taking the whole event `E` mutably.
    ///
    /// Runs only when the event is dispatched mutably; see
    /// [`HookDispatcher::fire_mut`](super::dispatcher::HookDispatcher::fire_mut).
    pub fn for_event_mut<E, R, F>(id: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        E: Event,
        R: IntoHookReturn,
        F: Fn(&mut E) -> R + Send + Sync + 'static,
    {
        let params = vec![Parameter::event_mut::<E>("ev")];
        Self::raw(id, params, R::KIND, move |args: Arguments<'_>| {
            let event = match args {
                Arguments::EventMut(event) => event.as_any_mut().downcast_mut::<E>(),
                _ => None,
            };
            match event {
                Some(event) => f(event).into_hook_return(),
                None => Err(InvocationError::ArgumentMismatch {
                    expected: format!("mutable {}", E::NAME),
                }),
            }
        })
    }

    /// A handler whose parameters are bound to event properties by name.
    ///
    /// The body receives the property values in the order of `names`.
    pub fn from_properties<R, F>(
        id: impl Into<Cow<'static, str>>,
        names: &[&'static str],
        f: F,
    ) -> Self
    where
        R: IntoHookReturn,
        F: Fn(&[Value]) -> R + Send + Sync + 'static,
    {
        let expected = names.len();
        let params = names
            .iter()
            .map(|name| Parameter::value(*name, "json"))
            .collect();
        Self::raw(id, params, R::KIND, move |args: Arguments<'_>| match args {
            Arguments::Values(values) if values.len() == expected => f(&values).into_hook_return(),
            _ => Err(InvocationError::ArgumentMismatch {
                expected: format!("{expected} property values"),
            }),
        })
    }

    /// A callable with a fully manual signature.
    pub fn raw<F>(
        id: impl Into<Cow<'static, str>>,
        params: Vec<Parameter>,
        returns: ReturnKind,
        body: F,
    ) -> Self
    where
        F: Fn(Arguments<'_>) -> Result<HookReturn, InvocationError> + Send + Sync + 'static,
    {
        Self {
            id: CallableId::new(id),
            params: params.into(),
            returns,
            receiver: Receiver::Static,
            body: Arc::new(body),
        }
    }

    /// Marks this callable as a method that needs an owning instance.
    pub fn on_instance(mut self) -> Self {
        self.receiver = Receiver::Instance;
        self
    }

    /// Returns a copy of this callable under a different identity.
    pub fn renamed(mut self, id: impl Into<Cow<'static, str>>) -> Self {
        self.id = CallableId::new(id);
        self
    }

    /// Returns the identity.
    pub fn id(&self) -> &CallableId {
        &self.id
    }

    /// Returns the declared parameters.
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Returns the declared return shape.
    pub fn returns(&self) -> ReturnKind {
        self.returns
    }

    /// Returns the receiver kind.
    pub fn receiver(&self) -> Receiver {
        self.receiver
    }

    /// Runs the body with already-bound arguments.
    pub fn call(&self, args: Arguments<'_>) -> Result<HookReturn, InvocationError> {
        (self.body)(args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("id", &self.id)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .field("receiver", &self.receiver)
            .field("body", &"<closure>")
            .finish()
    }
}
