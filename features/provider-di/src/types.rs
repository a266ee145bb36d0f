use std::{
    any::{Any, TypeId},
    sync::Arc,
};

use crate::errors::DowncastError;

/// Boxed error returned by fallible providers
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Anything the registry produces or injects.
///
/// Values are cloned out of the resolution cache on injection, so types that
/// should be shared by identity are best produced behind an `Arc`.
pub trait Injectable: Clone + Send + Sync + 'static {}
impl<T: Clone + Send + Sync + 'static> Injectable for T {}

/// A resolved value, type erased
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    pub instance: Arc<dyn Any + Send + Sync + 'static>,
}

impl Instance {
    pub fn new<T: Injectable>(instance: T) -> Self {
        Instance {
            info: TypeInfo::of::<T>(),
            instance: Arc::new(instance),
        }
    }

    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, DowncastError> {
        Arc::downcast::<T>(self.instance.clone()).map_err(|_| DowncastError {
            required: std::any::type_name::<T>(),
            actual: self.info.type_name,
        })
    }

    /// Clones the inner value out
    pub fn get<T: Injectable>(&self) -> Result<T, DowncastError> {
        self.downcast::<T>().map(|value| T::clone(&value))
    }

    /// True if both instances point at the same allocation
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Instance").field(&self.info.type_name).finish()
    }
}

/// Type Name and Type Id
///
/// This is the key every provider is registered under.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}
