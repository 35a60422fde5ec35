//! Event-argument contract.
//!
//! Handlers never see reflection metadata. Instead every event-argument
//! type describes its readable properties up front: [`Event::PROPERTIES`]
//! lists them in declaration order and [`EventArgs::read_property`] reads one
//! by index. The [`event_args!`](crate::event_args) macro generates both.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde_json::Value;

/// Object-safe view of an event-argument value.
pub trait EventArgs: Any + Send + Sync + fmt::Debug {
    /// Readable property names, in declaration order.
    fn property_names(&self) -> &'static [&'static str];

    /// Reads the property at `index` as a JSON value.
    ///
    /// Returns `None` when the index is out of range or the value could not
    /// be serialized.
    fn read_property(&self, index: usize) -> Option<Value>;

    /// Returns `self` as `Any` for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Returns `self` as mutable `Any`, so handlers can write results back.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Returns the logical event type of this value.
    fn event_type(&self) -> EventType;
}

/// Static description of a concrete event-argument type.
pub trait Event: EventArgs + Sized {
    /// Catalog name of the event (e.g. `"player_joined"`).
    const NAME: &'static str;
    /// Readable property names, in declaration order.
    const PROPERTIES: &'static [&'static str];
}

/// Logical identifier for a category of event.
///
/// Two `EventType`s are equal when they describe the same Rust type.
#[derive(Clone, Copy)]
pub struct EventType {
    id: TypeId,
    name: &'static str,
    properties: &'static [&'static str],
}

impl EventType {
    /// Returns the event type describing `E`.
    pub fn of<E: Event>() -> Self {
        Self {
            id: TypeId::of::<E>(),
            name: E::NAME,
            properties: E::PROPERTIES,
        }
    }

    /// Returns the underlying type id.
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Returns the catalog name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the readable property names.
    pub fn properties(&self) -> &'static [&'static str] {
        self.properties
    }

    /// Finds a property by case-insensitive name.
    pub fn find_property(&self, name: &str) -> Option<usize> {
        self.properties
            .iter()
            .position(|property| property.eq_ignore_ascii_case(name))
    }

    /// Returns whether `args` is a value of this event type.
    pub fn describes(&self, args: &dyn EventArgs) -> bool {
        args.event_type().id == self.id
    }
}

impl PartialEq for EventType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventType {}

impl Hash for EventType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventType")
            .field("name", &self.name)
            .field("properties", &self.properties)
            .finish()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
