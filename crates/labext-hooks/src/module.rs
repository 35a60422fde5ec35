//! Hook modules and the type declarations discovery reads from them.

use std::fmt;

use async_trait::async_trait;
use labext_core::{Event, EventType};
use serde::{Deserialize, Serialize};

use crate::delegate::Delegate;
use crate::error::DiscoveryError;
use crate::hooks::callable::Callable;
use crate::hooks::marker::HookMarker;
use crate::instance::InstanceToken;

/// Module metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// Unique module identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Version string.
    pub version: String,
    /// Author.
    pub author: String,
    /// Description.
    pub description: String,
}

/// A unit of hooks loaded and unloaded together.
#[async_trait]
pub trait HookModule: Send + Sync + fmt::Debug {
    /// Returns module metadata.
    fn info(&self) -> ModuleInfo;

    /// Describes the types whose members should be scanned for hooks.
    ///
    /// Called on load and again on unload, so it must describe the same
    /// members both times.
    fn declare(&self) -> Result<Vec<TypeDecl>, DiscoveryError>;

    /// Called before the module's hooks are registered.
    async fn on_load(&self) -> Result<(), String> {
        Ok(())
    }

    /// Called after the module's hooks are removed.
    async fn on_unload(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Members of one type, with the instance that owns them.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub(crate) name: String,
    pub(crate) instance: Option<InstanceToken>,
    pub(crate) methods: Vec<MethodDecl>,
    pub(crate) events: Vec<EventDecl>,
}

impl TypeDecl {
    /// Declares the static members of type `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instance: None,
            methods: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Declares members of an instance of `name` owned by `instance`.
    pub fn instance(name: impl Into<String>, instance: InstanceToken) -> Self {
        Self {
            instance: Some(instance),
            ..Self::new(name)
        }
    }

    /// Adds a method.
    pub fn method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    /// Adds a delegate field.
    pub fn event(mut self, event: EventDecl) -> Self {
        self.events.push(event);
        self
    }

    /// Returns the type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the owning instance.
    pub fn owner(&self) -> Option<&InstanceToken> {
        self.instance.as_ref()
    }
}

/// A method member.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub(crate) callable: Callable,
    pub(crate) marker: Option<HookMarker>,
    pub(crate) catalog_event: Option<String>,
}

impl MethodDecl {
    /// An unmarked method. Discovery ignores it until it is marked or tied to
    /// a catalog event.
    pub fn new(callable: Callable) -> Self {
        Self {
            callable,
            marker: None,
            catalog_event: None,
        }
    }

    /// A method marked with `marker`.
    pub fn hook(callable: Callable, marker: HookMarker) -> Self {
        Self::new(callable).marked(marker)
    }

    /// Sets the marker.
    pub fn marked(mut self, marker: HookMarker) -> Self {
        self.marker = Some(marker);
        self
    }

    /// Subscribes this method to the catalog event `name`.
    pub fn on(mut self, name: impl Into<String>) -> Self {
        self.catalog_event = Some(name.into());
        self
    }
}

/// Parameter shape of a delegate field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegateShape {
    /// Takes no arguments.
    Unit,
    /// Takes one event value.
    Event(EventType),
    /// Any other signature.
    Unsupported(&'static str),
}

/// A delegate field member.
#[derive(Debug, Clone)]
pub struct EventDecl {
    pub(crate) field: String,
    pub(crate) shape: DelegateShape,
    pub(crate) backing: Option<Callable>,
    pub(crate) marker: Option<HookMarker>,
    pub(crate) catalog_event: Option<String>,
}

impl EventDecl {
    /// A no-argument delegate field.
    pub fn action(field: impl Into<String>, delegate: &Delegate<()>) -> Self {
        let field = field.into();
        let delegate = delegate.clone();
        let backing = Callable::nullary(field.clone(), move || delegate.invoke(&()));
        Self::with_backing(field, DelegateShape::Unit, backing)
    }

    /// A delegate field taking event `E`.
    pub fn of<E: Event>(field: impl Into<String>, delegate: &Delegate<E>) -> Self {
        let field = field.into();
        let delegate = delegate.clone();
        let backing =
            Callable::for_event::<E, _, _>(field.clone(), move |ev: &E| delegate.invoke(ev));
        Self::with_backing(field, DelegateShape::Event(EventType::of::<E>()), backing)
    }

    /// A field with the given shape and no backing delegate.
    pub fn unbacked(field: impl Into<String>, shape: DelegateShape) -> Self {
        Self {
            field: field.into(),
            shape,
            backing: None,
            marker: None,
            catalog_event: None,
        }
    }

    /// Sets the marker.
    pub fn marked(mut self, marker: HookMarker) -> Self {
        self.marker = Some(marker);
        self
    }

    /// Subscribes this field to the catalog event `name`.
    pub fn on(mut self, name: impl Into<String>) -> Self {
        self.catalog_event = Some(name.into());
        self
    }

    fn with_backing(field: String, shape: DelegateShape, backing: Callable) -> Self {
        Self {
            backing: Some(backing),
            ..Self::unbacked(field, shape)
        }
    }
}
