//! Implementation of #[derive(Inject)] proc-macro.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{ext::IdentExt, parse_macro_input, Data, DeriveInput, Field, Fields};

enum FieldDirective {
    Default,
    Group,
    Ignore,
}

pub fn derive_inject_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(error) => error.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Inject can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Inject can only be derived for structs",
            ));
        }
    };

    let mut specs = Vec::with_capacity(fields.len());
    let mut arms = Vec::with_capacity(fields.len());

    for (index, field) in fields.iter().enumerate() {
        let Some(ident) = field.ident.as_ref() else {
            return Err(syn::Error::new_spanned(field, "expected a named field"));
        };
        let field_name = ident.unraw().to_string();
        let field_type = &field.ty;

        match parse_directive(field)? {
            FieldDirective::Default => {
                specs.push(quote! {
                    ::provider_di::destination::FieldSpec::value::<#field_type>(#field_name)
                });
                arms.push(quote! {
                    #index => ::core::option::Option::Some(
                        ::provider_di::destination::FieldMut::Value(&mut self.#ident)
                    ),
                });
            }
            FieldDirective::Group => {
                specs.push(quote! {
                    ::provider_di::destination::FieldSpec::group(#field_name)
                });
                arms.push(quote! {
                    #index => ::core::option::Option::Some(
                        ::provider_di::destination::FieldMut::Group(&mut self.#ident)
                    ),
                });
            }
            FieldDirective::Ignore => {
                specs.push(quote! {
                    ::provider_di::destination::FieldSpec::ignore(#field_name)
                });
            }
        }
    }

    Ok(quote! {
        impl #impl_generics ::provider_di::destination::Destination for #name #ty_generics #where_clause {
            fn fields(&self) -> ::std::vec::Vec<::provider_di::destination::FieldSpec> {
                ::std::vec![#(#specs),*]
            }

            fn field_mut(
                &mut self,
                index: usize,
            ) -> ::core::option::Option<::provider_di::destination::FieldMut<'_>> {
                match index {
                    #(#arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    })
}

/// Parses `#[di(group)]` or `#[di(ignore)]`, at most one per field
fn parse_directive(field: &Field) -> syn::Result<FieldDirective> {
    let mut directive = None;

    for attr in &field.attrs {
        if !attr.path().is_ident("di") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            let parsed = if meta.path.is_ident("group") {
                FieldDirective::Group
            } else if meta.path.is_ident("ignore") {
                FieldDirective::Ignore
            } else {
                return Err(meta.error("unknown di directive, expected `group` or `ignore`"));
            };

            if directive.replace(parsed).is_some() {
                return Err(meta.error("a field can only have one di directive"));
            }
            Ok(())
        })?;
    }

    Ok(directive.unwrap_or(FieldDirective::Default))
}

#[cfg(test)]
mod tests {
    use quote::ToTokens;
    use syn::parse_quote;

    use super::*;

    fn expand_err(input: DeriveInput) -> String {
        match expand(&input) {
            Ok(_) => panic!("expected {} to be rejected", input.ident),
            Err(error) => error.to_string(),
        }
    }

    #[test]
    fn expands_named_structs() {
        let input: DeriveInput = parse_quote! {
            struct App {
                #[di(group)]
                repos: Repos,
                service: Arc<Service>,
                #[di(ignore)]
                requests: u64,
            }
        };

        let expanded = expand(&input).unwrap();
        let item: syn::ItemImpl = syn::parse2(expanded).unwrap();
        assert_eq!(item.items.len(), 2);

        let code = item.to_token_stream().to_string();
        assert!(code.contains("FieldSpec :: group"));
        assert!(code.contains("FieldSpec :: ignore"));
        assert!(code.contains("FieldMut :: Group"));
        assert!(code.contains("FieldMut :: Value"));
        assert!(!code.contains("self . requests"));
    }

    #[test]
    fn rejects_enums_and_unions() {
        let expected = "Inject can only be derived for structs";

        assert_eq!(
            expand_err(parse_quote! {
                enum Mode { Fast, Slow }
            }),
            expected
        );
        assert_eq!(
            expand_err(parse_quote! {
                union Bits { int: u32, float: f32 }
            }),
            expected
        );
    }

    #[test]
    fn rejects_structs_without_named_fields() {
        let expected = "Inject can only be derived for structs with named fields";

        assert_eq!(
            expand_err(parse_quote! {
                struct Pair(String, usize);
            }),
            expected
        );
        assert_eq!(
            expand_err(parse_quote! {
                struct Marker;
            }),
            expected
        );
    }

    #[test]
    fn rejects_unknown_directives() {
        let message = expand_err(parse_quote! {
            struct App {
                #[di(lazy)]
                service: Service,
            }
        });

        assert_eq!(message, "unknown di directive, expected `group` or `ignore`");
    }

    #[test]
    fn rejects_multiple_directives() {
        let expected = "a field can only have one di directive";

        assert_eq!(
            expand_err(parse_quote! {
                struct App {
                    #[di(group, ignore)]
                    repos: Repos,
                }
            }),
            expected
        );
        assert_eq!(
            expand_err(parse_quote! {
                struct App {
                    #[di(ignore)]
                    #[di(ignore)]
                    requests: u64,
                }
            }),
            expected
        );
    }

    #[test]
    fn other_attributes_are_left_alone() {
        let input: DeriveInput = parse_quote! {
            struct App {
                #[serde(default)]
                /// Documented
                service: Service,
            }
        };

        assert!(expand(&input).is_ok());
    }
}
