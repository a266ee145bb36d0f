//! Injection targets.
//!
//! A [Destination] lists its fields together with a [Directive] telling the
//! injector what to do with each of them. It is usually derived:
//!
//! ```ignore
//! use provider_di::Inject;
//!
//! #[derive(Inject, Default)]
//! struct App {
//!     config: Config,
//!     #[di(group)]
//!     repos: Repos,
//!     #[di(ignore)]
//!     started: bool,
//! }
//! ```

use std::any::{type_name, Any};

use crate::{
    errors::DowncastError,
    types::{Injectable, Instance, TypeInfo},
};

/// What the injector does with a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Resolve the field's type and assign it
    Default,
    /// Treat the field as a nested destination
    Group,
    /// Leave the field untouched
    Ignore,
}

/// Writes a resolved instance into a type erased field
pub type AssignFn = fn(&mut dyn Any, &Instance) -> Result<(), DowncastError>;

/// Description of a single destination field
#[derive(Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub directive: Directive,
    /// Only set for [Directive::Default] fields
    pub type_info: Option<TypeInfo>,
    pub assign: Option<AssignFn>,
}

impl FieldSpec {
    /// A field resolved from the registry
    pub fn value<T: Injectable>(name: &'static str) -> Self {
        FieldSpec {
            name,
            directive: Directive::Default,
            type_info: Some(TypeInfo::of::<T>()),
            assign: Some(assign_value::<T>),
        }
    }

    /// A nested destination, filled field by field
    pub fn group(name: &'static str) -> Self {
        FieldSpec {
            name,
            directive: Directive::Group,
            type_info: None,
            assign: None,
        }
    }

    /// A field the injector skips
    pub fn ignore(name: &'static str) -> Self {
        FieldSpec {
            name,
            directive: Directive::Ignore,
            type_info: None,
            assign: None,
        }
    }
}

impl std::fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("directive", &self.directive)
            .field("type_info", &self.type_info)
            .finish_non_exhaustive()
    }
}

fn assign_value<T: Injectable>(slot: &mut dyn Any, instance: &Instance) -> Result<(), DowncastError> {
    let slot = slot.downcast_mut::<T>().ok_or(DowncastError {
        required: type_name::<T>(),
        actual: "<field of another type>",
    })?;
    *slot = instance.get::<T>()?;
    Ok(())
}

/// Mutable access to a field
pub enum FieldMut<'a> {
    Value(&'a mut dyn Any),
    Group(&'a mut dyn Destination),
}

/// A struct-like value the injector can fill
///
/// `field_mut` is called with the index of an entry returned by `fields`.
/// Ignored fields are never requested.
pub trait Destination {
    fn fields(&self) -> Vec<FieldSpec>;

    fn field_mut(&mut self, index: usize) -> Option<FieldMut<'_>>;
}

impl<D: Destination + ?Sized> Destination for Box<D> {
    fn fields(&self) -> Vec<FieldSpec> {
        (**self).fields()
    }

    fn field_mut(&mut self, index: usize) -> Option<FieldMut<'_>> {
        (**self).field_mut(index)
    }
}
