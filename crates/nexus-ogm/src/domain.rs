//! Typed domain classes over hydrated entities
//!
//! A domain class is a thin newtype over an [`EntityRef`] bound to a
//! registered class name. Declare them with [`domain_class!`](crate::domain_class):
//!
//! ```
//! use nexus_ogm::{domain_class, DomainClass};
//!
//! domain_class! {
//!     /// A cineasts user
//!     pub struct User => "cineasts::User";
//!     pub struct Movie => "cineasts::Movie";
//! }
//!
//! assert_eq!(User::CLASS, "cineasts::User");
//! ```

use crate::coerce::{FromMapped, MappedValue};
use crate::error::{OgmError, Result};
use crate::graph::EntityRef;

/// A registered class with a typed handle
pub trait DomainClass: Sized {
    /// Fully-qualified registered class name
    const CLASS: &'static str;

    /// Wrap a handle; the caller guarantees the class matches
    fn from_entity(entity: EntityRef) -> Self;

    /// Underlying handle
    fn entity(&self) -> &EntityRef;

    /// Store identity
    fn id(&self) -> u64 {
        self.entity().id()
    }

    /// Property converted into a requested type
    fn property<T: FromMapped>(&self, name: &str) -> Result<T> {
        self.entity().property_as(name)
    }

    /// Typed elements of a relationship field. `None` when the field was not
    /// populated by the result; elements of other classes are skipped.
    fn related<T: DomainClass>(&self, field: &str) -> Option<Vec<T>> {
        self.entity().related(field).map(|items| {
            items
                .into_iter()
                .filter(|e| e.is_instance_of(T::CLASS))
                .map(T::from_entity)
                .collect()
        })
    }

    /// Start node of a relationship entity
    fn start<T: DomainClass>(&self) -> Option<T> {
        self.entity()
            .start()
            .filter(|e| e.is_instance_of(T::CLASS))
            .map(T::from_entity)
    }

    /// End node of a relationship entity
    fn end<T: DomainClass>(&self) -> Option<T> {
        self.entity()
            .end()
            .filter(|e| e.is_instance_of(T::CLASS))
            .map(T::from_entity)
    }
}

/// Conversion used by [`domain_class!`](crate::domain_class) generated types
#[doc(hidden)]
pub fn entity_from_mapped(value: MappedValue, class: &'static str) -> Result<EntityRef> {
    match value {
        MappedValue::Entity(entity) if entity.is_instance_of(class) => Ok(entity),
        other => Err(OgmError::type_mismatch(other.type_name(), class)),
    }
}

/// Declare domain class newtypes
#[macro_export]
macro_rules! domain_class {
    ($($(#[$meta:meta])* $vis:vis struct $name:ident => $class:literal;)+) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, PartialEq, Eq)]
            $vis struct $name($crate::EntityRef);

            impl $crate::DomainClass for $name {
                const CLASS: &'static str = $class;

                fn from_entity(entity: $crate::EntityRef) -> Self {
                    Self(entity)
                }

                fn entity(&self) -> &$crate::EntityRef {
                    &self.0
                }
            }

            impl $crate::FromMapped for $name {
                fn type_name() -> ::std::borrow::Cow<'static, str> {
                    ::std::borrow::Cow::Borrowed($class)
                }

                fn target() -> $crate::Target {
                    $crate::Target::Entity($class)
                }

                fn from_mapped(value: $crate::MappedValue) -> $crate::Result<Self> {
                    $crate::domain::entity_from_mapped(value, $class).map(Self)
                }
            }
        )+
    };
}
