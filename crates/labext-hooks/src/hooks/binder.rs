//! Argument binders: map an event value onto a handler's parameter list.
//!
//! The binder is chosen once at registration. Property lookups are resolved
//! then too, so steady-state dispatch reads properties by cached index.

use std::borrow::Cow;

use labext_core::{EventArgs, EventType};

use crate::error::{InvocationError, RegistrationError};

use super::callable::{Arguments, Callable};

/// One parameter bound to one event property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyBinding {
    /// Parameter name as declared by the handler.
    pub parameter: Cow<'static, str>,
    /// Matched property name on the event type.
    pub property: &'static str,
    /// Property index on the event type.
    pub index: usize,
}

/// The event value handed to one dispatch.
#[derive(Debug)]
pub enum EventRef<'a> {
    /// Handlers may only read the value.
    Shared(&'a dyn EventArgs),
    /// Handlers taking `&mut E` may write to the value.
    Exclusive(&'a mut dyn EventArgs),
}

impl EventRef<'_> {
    /// Returns a read-only view.
    pub fn get(&self) -> &dyn EventArgs {
        match self {
            Self::Shared(args) => *args,
            Self::Exclusive(args) => &**args,
        }
    }

    /// Borrows the value again for one handler.
    pub fn reborrow(&mut self) -> EventRef<'_> {
        match self {
            Self::Shared(args) => EventRef::Shared(*args),
            Self::Exclusive(args) => EventRef::Exclusive(&mut **args),
        }
    }

    /// Returns whether handlers may write to the value.
    pub fn is_exclusive(&self) -> bool {
        matches!(self, Self::Exclusive(_))
    }
}

/// Argument-binding strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binder {
    /// The handler takes no parameters.
    Empty,
    /// The handler takes the event object itself.
    Direct,
    /// The handler takes the event object mutably.
    DirectMut,
    /// Each parameter is read from the event property of the same name.
    Property(Vec<PropertyBinding>),
}

impl Binder {
    /// Selects the binder for `callable` subscribing to `event`.
    pub fn select(callable: &Callable, event: EventType) -> Result<Self, RegistrationError> {
        let params = callable.params();

        if params.is_empty() {
            return Ok(Self::Empty);
        }

        if let [param] = params {
            if param.event_type() == Some(event) {
                return Ok(if param.is_mut() {
                    Self::DirectMut
                } else {
                    Self::Direct
                });
            }
        }

        let mut bindings = Vec::with_capacity(params.len());
        for param in params {
            let Some(index) = event.find_property(&param.name) else {
                return Err(RegistrationError::UnmatchedParameter {
                    callable: callable.id().to_string(),
                    parameter: param.name.to_string(),
                    event: event.name().to_string(),
                });
            };

            bindings.push(PropertyBinding {
                parameter: param.name.clone(),
                property: event.properties()[index],
                index,
            });
        }

        Ok(Self::Property(bindings))
    }

    /// Produces the arguments for one invocation.
    ///
    /// With `dynamic_lookup`, property indices are looked up by name on the
    /// value instead of using the cached index.
    pub fn bind<'a>(
        &self,
        args: EventRef<'a>,
        dynamic_lookup: bool,
    ) -> Result<Arguments<'a>, InvocationError> {
        match self {
            Self::Empty => Ok(Arguments::None),
            Self::Direct => match args {
                EventRef::Shared(args) => Ok(Arguments::Event(args)),
                EventRef::Exclusive(args) => Ok(Arguments::Event(args)),
            },
            Self::DirectMut => match args {
                EventRef::Exclusive(args) => Ok(Arguments::EventMut(args)),
                EventRef::Shared(args) => Err(InvocationError::ReadOnlyEvent {
                    event: args.event_type().name().to_string(),
                }),
            },
            Self::Property(bindings) => {
                let args = args.get();
                let mut values = Vec::with_capacity(bindings.len());
                for binding in bindings {
                    let index = if dynamic_lookup {
                        args.property_names()
                            .iter()
                            .position(|name| name.eq_ignore_ascii_case(binding.property))
                    } else {
                        Some(binding.index)
                    };

                    let value = index.and_then(|index| args.read_property(index)).ok_or_else(
                        || InvocationError::UnreadableProperty {
                            property: binding.property.to_string(),
                            event: args.event_type().name().to_string(),
                        },
                    )?;
                    values.push(value);
                }
                Ok(Arguments::Values(values))
            }
        }
    }

    /// Short name used in diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Direct => "direct",
            Self::DirectMut => "direct_mut",
            Self::Property(_) => "property",
        }
    }
}
