use std::{any::type_name, fmt::Debug, slice};

use crate::{
    errors::DowncastError,
    types::{DynError, Injectable, Instance, TypeInfo},
};

/// Type erased provider call
///
/// Receives the resolved dependencies in declared order.
pub type InvokeFn = Box<dyn Fn(&[Instance]) -> Result<Instance, DynError> + Send + Sync>;

/// One output of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputInfo {
    /// The produced value
    Value(TypeInfo),
    /// A failure indicator paired with the value
    Failure(TypeInfo),
}

/// A unit of construction logic, not yet validated
///
/// Usually created from a function with [ProviderDeclaration::from_fn] or
/// [ProviderDeclaration::from_try_fn]. [ProviderDeclaration::new] allows
/// describing providers by hand, in which case the shape is checked when the
/// registry is built.
pub struct ProviderDeclaration {
    pub(crate) name: String,
    pub(crate) inputs: Vec<TypeInfo>,
    pub(crate) outputs: Vec<OutputInfo>,
    pub(crate) invoke: InvokeFn,
}

impl ProviderDeclaration {
    pub fn new(
        name: impl Into<String>,
        inputs: Vec<TypeInfo>,
        outputs: Vec<OutputInfo>,
        invoke: impl Fn(&[Instance]) -> Result<Instance, DynError> + Send + Sync + 'static,
    ) -> Self {
        ProviderDeclaration {
            name: name.into(),
            inputs,
            outputs,
            invoke: Box::new(invoke),
        }
    }

    /// Declares an infallible provider, `Fn(A, B, ..) -> T`
    pub fn from_fn<Args, F: ProviderFn<Args>>(provider: F) -> Self {
        ProviderDeclaration {
            name: provider_name::<F>(),
            inputs: F::dependencies(),
            outputs: vec![OutputInfo::Value(TypeInfo::of::<F::Provides>())],
            invoke: Box::new(move |args| provider.call_with(args).map(Instance::new)),
        }
    }

    /// Declares a fallible provider, `Fn(A, B, ..) -> Result<T, E>`
    pub fn from_try_fn<Args, F: TryProviderFn<Args>>(provider: F) -> Self {
        ProviderDeclaration {
            name: provider_name::<F>(),
            inputs: F::dependencies(),
            outputs: vec![
                OutputInfo::Value(TypeInfo::of::<F::Provides>()),
                OutputInfo::Failure(TypeInfo::of::<F::Error>()),
            ],
            invoke: Box::new(move |args| provider.call_with(args).map(Instance::new)),
        }
    }

    /// Declares a provider handing out clones of an existing value
    pub fn instance<T: Injectable>(value: T) -> Self {
        ProviderDeclaration {
            name: format!("instance<{}>", short_name(type_name::<T>())),
            inputs: Vec::new(),
            outputs: vec![OutputInfo::Value(TypeInfo::of::<T>())],
            invoke: Box::new(move |_| Ok(Instance::new(value.clone()))),
        }
    }

    /// Overrides the name used in diagnostics
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[TypeInfo] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputInfo] {
        &self.outputs
    }
}

impl Debug for ProviderDeclaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderDeclaration")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}

/// A function usable as an infallible provider
///
/// Implemented for any `Fn` taking up to eight [Injectable] arguments and
/// returning an [Injectable].
pub trait ProviderFn<Args>: Send + Sync + 'static {
    type Provides: Injectable;

    /// Argument types, in call order
    fn dependencies() -> Vec<TypeInfo>;

    /// Downcasts the arguments and calls the function
    fn call_with(&self, args: &[Instance]) -> Result<Self::Provides, DynError>;
}

/// A function usable as a fallible provider
///
/// Implemented for any `Fn` taking up to eight [Injectable] arguments and
/// returning `Result<T, E>` where `E` converts into a [DynError].
pub trait TryProviderFn<Args>: Send + Sync + 'static {
    type Provides: Injectable;
    type Error: 'static;

    /// Argument types, in call order
    fn dependencies() -> Vec<TypeInfo>;

    /// Downcasts the arguments and calls the function
    fn call_with(&self, args: &[Instance]) -> Result<Self::Provides, DynError>;
}

macro_rules! impl_provider_fn {
    ($($arg:ident),*) => {
        impl<Func, Out, $($arg,)*> ProviderFn<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Out + Send + Sync + 'static,
            Out: Injectable,
            $($arg: Injectable,)*
        {
            type Provides = Out;

            fn dependencies() -> Vec<TypeInfo> {
                vec![$(TypeInfo::of::<$arg>()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn call_with(&self, args: &[Instance]) -> Result<Out, DynError> {
                let mut args = args.iter();
                $(let $arg = next_arg::<$arg>(&mut args)?;)*
                Ok((self)($($arg),*))
            }
        }

        impl<Func, Out, Err, $($arg,)*> TryProviderFn<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Result<Out, Err> + Send + Sync + 'static,
            Out: Injectable,
            Err: Into<DynError> + 'static,
            $($arg: Injectable,)*
        {
            type Provides = Out;
            type Error = Err;

            fn dependencies() -> Vec<TypeInfo> {
                vec![$(TypeInfo::of::<$arg>()),*]
            }

            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn call_with(&self, args: &[Instance]) -> Result<Out, DynError> {
                let mut args = args.iter();
                $(let $arg = next_arg::<$arg>(&mut args)?;)*
                (self)($($arg),*).map_err(Into::into)
            }
        }
    };
}

impl_provider_fn!();
impl_provider_fn!(A1);
impl_provider_fn!(A1, A2);
impl_provider_fn!(A1, A2, A3);
impl_provider_fn!(A1, A2, A3, A4);
impl_provider_fn!(A1, A2, A3, A4, A5);
impl_provider_fn!(A1, A2, A3, A4, A5, A6);
impl_provider_fn!(A1, A2, A3, A4, A5, A6, A7);
impl_provider_fn!(A1, A2, A3, A4, A5, A6, A7, A8);

fn next_arg<T: Injectable>(args: &mut slice::Iter<'_, Instance>) -> Result<T, DynError> {
    let instance = args.next().ok_or(DowncastError {
        required: type_name::<T>(),
        actual: "<missing argument>",
    })?;
    Ok(instance.get::<T>()?)
}

fn provider_name<F>() -> String {
    short_name(type_name::<F>())
}

/// Strips the module path from a type name
///
/// Closures keep the name of the function they are defined in:
/// `app::setup::{{closure}}` becomes `setup::{closure}`. Function pointers
/// keep their signature with every path shortened.
pub(crate) fn short_name(full: &str) -> String {
    if ["fn(", "unsafe ", "extern ", "for<"]
        .iter()
        .any(|prefix| full.starts_with(prefix))
    {
        return strip_paths(full);
    }

    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let bytes = full.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' => depth += 1,
            b'>' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                segments.push(&full[start..i]);
                i += 2;
                start = i;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    segments.push(&full[start..]);

    let closures = segments
        .iter()
        .rev()
        .take_while(|segment| **segment == "{{closure}}")
        .count();
    let named = segments.len() - closures;
    let name = match named {
        0 => full,
        n => segments[n - 1],
    };

    if closures > 0 {
        format!("{name}::{{closure}}")
    } else {
        name.to_string()
    }
}

/// Removes the leading module segments of every path in `full`
fn strip_paths(full: &str) -> String {
    let mut stripped = String::with_capacity(full.len());
    let mut segment_start = 0;
    let mut chars = full.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            stripped.truncate(segment_start);
            continue;
        }
        if !(c.is_alphanumeric() || c == '_') {
            segment_start = stripped.len() + c.len_utf8();
        }
        stripped.push(c);
    }
    stripped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_greeting() -> String {
        "hello".to_string()
    }

    #[test]
    fn short_name_strips_paths() {
        assert_eq!(short_name("app::services::make_db"), "make_db");
        assert_eq!(short_name("app::setup::{{closure}}"), "setup::{closure}");
        assert_eq!(
            short_name("app::generic<alloc::string::String>"),
            "generic<alloc::string::String>"
        );
        assert_eq!(short_name("plain"), "plain");
    }

    #[test]
    fn fn_pointers_keep_their_signature() {
        assert_eq!(short_name("fn() -> alloc::string::String"), "fn() -> String");
        assert_eq!(
            short_name("fn(&str, core::option::Option<app::Config>) -> u32"),
            "fn(&str, Option<Config>) -> u32"
        );

        let pointer: fn() -> String = make_greeting;
        let declaration = ProviderDeclaration::from_fn(pointer);
        assert_eq!(declaration.name(), "fn() -> String");
    }

    #[test]
    fn fn_items_are_named_after_the_function() {
        let declaration = ProviderDeclaration::from_fn(make_greeting);
        assert_eq!(declaration.name(), "make_greeting");
        assert!(declaration.inputs().is_empty());
        assert_eq!(
            declaration.outputs(),
            &[OutputInfo::Value(TypeInfo::of::<String>())]
        );
    }

    #[test]
    fn closures_are_named_after_the_enclosing_function() {
        let declaration = ProviderDeclaration::from_fn(|| 1_u8);
        assert_eq!(
            declaration.name(),
            "closures_are_named_after_the_enclosing_function::{closure}"
        );
    }

    #[test]
    fn invoke_passes_arguments_in_order() {
        let declaration =
            ProviderDeclaration::from_fn(|a: String, b: u32| format!("{a}-{b}"));
        assert_eq!(
            declaration.inputs(),
            &[TypeInfo::of::<String>(), TypeInfo::of::<u32>()]
        );

        let args = [Instance::new("x".to_string()), Instance::new(7_u32)];
        let produced = (declaration.invoke)(&args).unwrap();
        assert_eq!(produced.get::<String>().unwrap(), "x-7");
    }

    #[test]
    fn invoke_rejects_wrong_argument_types() {
        let declaration = ProviderDeclaration::from_fn(|a: u32| a + 1);
        let err = (declaration.invoke)(&[Instance::new(1_i64)]).unwrap_err();
        let downcast = err.downcast_ref::<DowncastError>().unwrap();
        assert_eq!(downcast.required, "u32");
        assert_eq!(downcast.actual, "i64");

        assert!((declaration.invoke)(&[]).is_err());
    }

    #[test]
    fn try_fn_declares_a_failure_output() {
        let declaration = ProviderDeclaration::from_try_fn(|flag: bool| {
            if flag {
                Ok(1_i32)
            } else {
                Err("flag not set")
            }
        });
        assert_eq!(
            declaration.outputs(),
            &[
                OutputInfo::Value(TypeInfo::of::<i32>()),
                OutputInfo::Failure(TypeInfo::of::<&'static str>()),
            ]
        );

        assert!((declaration.invoke)(&[Instance::new(true)]).is_ok());
        let err = (declaration.invoke)(&[Instance::new(false)]).unwrap_err();
        assert_eq!(err.to_string(), "flag not set");
    }

    #[test]
    fn instances_hand_out_clones() {
        let declaration = ProviderDeclaration::instance(vec![1, 2, 3]);
        assert_eq!(declaration.name(), "instance<Vec<i32>>");
        let produced = (declaration.invoke)(&[]).unwrap();
        assert_eq!(produced.get::<Vec<i32>>().unwrap(), vec![1, 2, 3]);
    }
}
