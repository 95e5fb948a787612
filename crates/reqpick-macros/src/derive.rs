//! Code generation for `#[derive(Pick)]`.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{DeriveInput, Ident};

use crate::parse::{PickField, PickStruct};

/// Expands the derive input into a `Pick` implementation.
pub fn expand_derive(input: TokenStream) -> syn::Result<TokenStream> {
    let input: DeriveInput = syn::parse2(input)?;
    let record = PickStruct::parse(&input)?;
    Ok(generate_impl(&record))
}

fn generate_impl(record: &PickStruct) -> TokenStream {
    let ident = &record.ident;
    let name = &record.name;
    let fields = record.fields.iter().map(|field| generate_field(ident, field));

    quote! {
        #[automatically_derived]
        impl ::reqpick::Pick for #ident {
            fn descriptor() -> &'static ::reqpick::Descriptor<Self> {
                static DESCRIPTOR: ::std::sync::OnceLock<::reqpick::Descriptor<#ident>> =
                    ::std::sync::OnceLock::new();
                DESCRIPTOR.get_or_init(|| {
                    ::reqpick::Descriptor::<#ident>::builder()
                        .name(#name)
                        #(.field(#fields))*
                        .build()
                        .unwrap_or_else(|err| ::std::panic!("{}", err))
                })
            }
        }
    }
}

/// Builds the `reqpick::Field` expression for one field.
fn generate_field(record: &Ident, field: &PickField) -> TokenStream {
    let PickField {
        member,
        name,
        ty,
        restricted,
        attrs,
    } = field;

    let mut expr = quote! {
        ::reqpick::Field::<#record>::new::<#ty>(#name, |__record| &mut __record.#member)
    };

    if let Some((source, key)) = &attrs.source {
        let variant = format_ident!("{}", source.variant());
        expr = quote! { #expr.source(::reqpick::Source::#variant, #key) };
    }

    if *restricted {
        expr = quote! { #expr.restricted() };
    }

    if let Some(setter) = &attrs.setter {
        expr = quote! {
            #expr.setter(|__record, __raw| {
                ::reqpick::SetterOutput::into_setter_result(#record::#setter(__record, __raw))
            })
        };
    }

    for (rule, literal) in &attrs.rules {
        let method = format_ident!("{}", rule.method());
        expr = quote! { #expr.#method(#literal) };
    }

    expr
}
