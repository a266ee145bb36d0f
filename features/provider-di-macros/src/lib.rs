//! Derive macro for provider-di destinations.
//!
//! `#[derive(Inject)]` implements `provider_di::destination::Destination` for
//! a struct with named fields. The generated code references
//! `::provider_di`, so the macro is meant to be used through the re-export
//! in that crate.

use proc_macro::TokenStream;

mod inject;

/// Derive macro for injection destinations.
///
/// Every field is resolved from the registry by its type, unless annotated:
///
/// - `#[di(group)]` treats the field as a nested destination. Its type must
///   implement `Destination` itself, usually by deriving `Inject` too.
/// - `#[di(ignore)]` skips the field, it keeps whatever value it had.
///
/// # Example
///
/// ```ignore
/// use provider_di::Inject;
///
/// #[derive(Inject, Default)]
/// struct Repos {
///     users: Arc<UserRepo>,
///     posts: Arc<PostRepo>,
/// }
///
/// #[derive(Inject, Default)]
/// struct App {
///     #[di(group)]
///     repos: Repos,
///     service: Arc<UserService>,
///     #[di(ignore)]
///     request_count: u64,
/// }
///
/// // Generated implementation:
/// // impl Destination for App {
/// //     fn fields(&self) -> Vec<FieldSpec> {
/// //         vec![
/// //             FieldSpec::group("repos"),
/// //             FieldSpec::value::<Arc<UserService>>("service"),
/// //             FieldSpec::ignore("request_count"),
/// //         ]
/// //     }
/// //     fn field_mut(&mut self, index: usize) -> Option<FieldMut<'_>> {
/// //         match index {
/// //             0 => Some(FieldMut::Group(&mut self.repos)),
/// //             1 => Some(FieldMut::Value(&mut self.service)),
/// //             _ => None,
/// //         }
/// //     }
/// // }
/// ```
#[proc_macro_derive(Inject, attributes(di))]
pub fn derive_inject(input: TokenStream) -> TokenStream {
    inject::derive_inject_impl(input)
}
