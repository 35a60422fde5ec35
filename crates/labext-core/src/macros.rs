//! Declaration macros for event-argument types.

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}

/// Declares an event-argument struct and implements [`EventArgs`] and
/// [`Event`] for it.
///
/// Every field becomes a readable property, in declaration order. Field
/// types must implement `serde::Serialize`.
///
/// # Example
/// ```rust,ignore
/// event_args! {
///     /// A player is about to spawn.
///     pub struct PlayerSpawningArgs as "player_spawning" {
///         pub player_id: u32,
///         pub role: String,
///     }
/// }
/// ```
///
/// [`EventArgs`]: crate::traits::event::EventArgs
/// [`Event`]: crate::traits::event::Event
#[macro_export]
macro_rules! event_args {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident as $event_name:literal {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::traits::event::EventArgs for $name {
            fn property_names(&self) -> &'static [&'static str] {
                <Self as $crate::traits::event::Event>::PROPERTIES
            }

            #[allow(unused_assignments, unused_mut, unused_variables)]
            fn read_property(&self, index: usize) -> Option<$crate::macros::__private::serde_json::Value> {
                let mut position = 0usize;
                $(
                    if position == index {
                        return $crate::macros::__private::serde_json::to_value(&self.$field).ok();
                    }
                    position += 1;
                )*
                None
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            fn event_type(&self) -> $crate::traits::event::EventType {
                $crate::traits::event::EventType::of::<Self>()
            }
        }

        impl $crate::traits::event::Event for $name {
            const NAME: &'static str = $event_name;
            const PROPERTIES: &'static [&'static str] = &[$(stringify!($field)),*];
        }
    };
}
