//! Derive macros for Composable Signpost
//!
//! This crate provides `#[derive(Describe)]`, which generates the structural
//! description that signposts use to render actions. The generated code refers
//! to `::composable_signpost_core`, so that crate must be a direct dependency.
//!
//! # Mapping
//!
//! - Enum variant without fields → payload-free variant
//! - Enum variant with one unnamed field → variant carrying that value
//! - Enum variant with several or named fields → variant carrying a tuple
//! - Struct with named fields → labeled tuple
//! - Tuple struct → unlabeled tuple
//! - Unit struct → opaque leaf
//!
//! # Example
//!
//! ```ignore
//! use composable_signpost_macros::Describe;
//!
//! #[derive(Describe)]
//! #[describe(rename_all = "camelCase")]
//! enum SearchAction {
//!     QueryChanged(String),
//!     Response(Result<u32, SearchError>),
//!     Select { id: u32, #[describe(skip)] token: String },
//! }
//!
//! // format_action(&SearchAction::Select { id: 3, token }) == ".select(id: 3, token:)"
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{
    Attribute, Data, DataEnum, DataStruct, DeriveInput, Fields, LitStr, parse_macro_input,
    parse_quote,
};

/// Derive macro for structural descriptions
///
/// Implements `composable_signpost_core::describe::Describe`.
///
/// # Attributes
///
/// Container:
/// - `#[describe(rename_all = "camelCase" | "snake_case" | "lowercase")]` - Rename
///   variant labels (enums) or field labels (structs)
/// - `#[describe(opaque)]` - Describe the whole type as an opaque leaf
///
/// Variant or field:
/// - `#[describe(rename = "...")]` - Use the given label
///
/// Field:
/// - `#[describe(skip)]` - Never render this field's value
///
/// Every type parameter gets a `Describe` bound.
///
/// # Errors
///
/// Produces a compile error if applied to a union or if an attribute is
/// malformed.
#[proc_macro_derive(Describe, attributes(describe))]
pub fn derive_describe(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_describe(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_describe(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let container = ContainerAttrs::parse(&input.attrs)?;

    let body = if container.opaque {
        quote! { ::composable_signpost_core::describe::Shape::Opaque }
    } else {
        match &input.data {
            Data::Enum(data) => describe_enum(name, data, &container)?,
            Data::Struct(data) => describe_struct(data, &container)?,
            Data::Union(_) => {
                return Err(syn::Error::new_spanned(
                    input,
                    "#[derive(Describe)] can only be used on enums and structs",
                ));
            },
        }
    };

    let mut generics = input.generics.clone();
    for param in generics.type_params_mut() {
        param
            .bounds
            .push(parse_quote!(::composable_signpost_core::describe::Describe));
    }
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::composable_signpost_core::describe::Describe
            for #name #ty_generics #where_clause
        {
            fn describe(&self) -> ::composable_signpost_core::describe::Shape<'_> {
                #body
            }
        }
    })
}

fn describe_enum(
    name: &syn::Ident,
    data: &DataEnum,
    container: &ContainerAttrs,
) -> syn::Result<TokenStream2> {
    if data.variants.is_empty() {
        return Ok(quote! { match *self {} });
    }

    let type_name = name.unraw().to_string();
    let mut arms = Vec::with_capacity(data.variants.len());

    for variant in &data.variants {
        let ident = &variant.ident;
        let attrs = ItemAttrs::parse(&variant.attrs)?;
        if attrs.skip {
            return Err(syn::Error::new_spanned(
                variant,
                "#[describe(skip)] applies to fields, not variants",
            ));
        }
        let label = attrs
            .rename
            .unwrap_or_else(|| container.rename(&ident.unraw().to_string()));

        let arm = match &variant.fields {
            Fields::Unit => quote! {
                Self::#ident => ::composable_signpost_core::describe::Shape::unit(#type_name, #label),
            },
            fields if fields.is_empty() => quote! {
                Self::#ident { .. } => ::composable_signpost_core::describe::Shape::unit(#type_name, #label),
            },
            Fields::Unnamed(unnamed) => {
                let mut patterns = Vec::new();
                let mut values = Vec::new();
                for (idx, field) in unnamed.unnamed.iter().enumerate() {
                    let field_attrs = ItemAttrs::parse(&field.attrs)?;
                    if field_attrs.rename.is_some() {
                        return Err(syn::Error::new_spanned(
                            field,
                            "#[describe(rename)] needs a named field",
                        ));
                    }
                    if field_attrs.skip {
                        patterns.push(quote! { _ });
                        values.push(opaque_value());
                    } else {
                        let binding = format_ident!("__field{}", idx);
                        patterns.push(quote! { #binding });
                        values.push(quote! { #binding });
                    }
                }

                if values.len() == 1 {
                    let value = &values[0];
                    quote! {
                        Self::#ident(#(#patterns),*) =>
                            ::composable_signpost_core::describe::Shape::case(#label, #value),
                    }
                } else {
                    quote! {
                        Self::#ident(#(#patterns),*) =>
                            ::composable_signpost_core::describe::Shape::case_fields(
                                #label,
                                [#(::composable_signpost_core::describe::Field::unlabeled(#values)),*],
                            ),
                    }
                }
            },
            Fields::Named(named) => {
                let mut patterns = Vec::new();
                let mut fields = Vec::new();
                for field in &named.named {
                    let field_ident = field
                        .ident
                        .as_ref()
                        .ok_or_else(|| syn::Error::new_spanned(field, "named field without ident"))?;
                    let field_attrs = ItemAttrs::parse(&field.attrs)?;
                    let field_label = field_attrs
                        .rename
                        .unwrap_or_else(|| field_ident.unraw().to_string());
                    let value = if field_attrs.skip {
                        patterns.push(quote! { #field_ident: _ });
                        opaque_value()
                    } else {
                        patterns.push(quote! { #field_ident });
                        quote! { #field_ident }
                    };
                    fields.push(quote! {
                        ::composable_signpost_core::describe::Field::labeled(#field_label, #value)
                    });
                }
                quote! {
                    Self::#ident { #(#patterns),* } =>
                        ::composable_signpost_core::describe::Shape::case_fields(
                            #label,
                            [#(#fields),*],
                        ),
                }
            },
        };
        arms.push(arm);
    }

    Ok(quote! {
        match self {
            #(#arms)*
        }
    })
}

fn describe_struct(data: &DataStruct, container: &ContainerAttrs) -> syn::Result<TokenStream2> {
    if data.fields.is_empty() {
        return Ok(quote! { ::composable_signpost_core::describe::Shape::Opaque });
    }

    let mut fields = Vec::with_capacity(data.fields.len());
    for (idx, field) in data.fields.iter().enumerate() {
        let attrs = ItemAttrs::parse(&field.attrs)?;
        let value = if attrs.skip {
            opaque_value()
        } else if let Some(ident) = &field.ident {
            quote! { &self.#ident }
        } else {
            let index = syn::Index::from(idx);
            quote! { &self.#index }
        };

        let field = match (&field.ident, attrs.rename) {
            (Some(_), Some(label)) => quote! {
                ::composable_signpost_core::describe::Field::labeled(#label, #value)
            },
            (Some(ident), None) => {
                let label = container.rename(&ident.unraw().to_string());
                quote! {
                    ::composable_signpost_core::describe::Field::labeled(#label, #value)
                }
            },
            (None, Some(_)) => {
                return Err(syn::Error::new_spanned(
                    field,
                    "#[describe(rename)] needs a named field",
                ));
            },
            (None, None) => quote! {
                ::composable_signpost_core::describe::Field::unlabeled(#value)
            },
        };
        fields.push(field);
    }

    Ok(quote! {
        ::composable_signpost_core::describe::Shape::tuple([#(#fields),*])
    })
}

fn opaque_value() -> TokenStream2 {
    quote! { &::composable_signpost_core::describe::Opaque }
}

/// Label casing applied by `rename_all`
#[derive(Clone, Copy)]
enum RenameRule {
    CamelCase,
    SnakeCase,
    LowerCase,
}

impl RenameRule {
    fn from_lit(lit: &LitStr) -> syn::Result<Self> {
        match lit.value().as_str() {
            "camelCase" => Ok(Self::CamelCase),
            "snake_case" => Ok(Self::SnakeCase),
            "lowercase" => Ok(Self::LowerCase),
            _ => Err(syn::Error::new_spanned(
                lit,
                "expected one of \"camelCase\", \"snake_case\", \"lowercase\"",
            )),
        }
    }

    fn apply(self, ident: &str) -> String {
        match self {
            Self::CamelCase => {
                let mut out = String::with_capacity(ident.len());
                let mut upper_next = false;
                for (idx, ch) in ident.chars().enumerate() {
                    if ch == '_' {
                        upper_next = idx > 0;
                    } else if idx == 0 {
                        out.extend(ch.to_lowercase());
                    } else if upper_next {
                        out.extend(ch.to_uppercase());
                        upper_next = false;
                    } else {
                        out.push(ch);
                    }
                }
                out
            },
            Self::SnakeCase => {
                let mut out = String::with_capacity(ident.len() + 4);
                for (idx, ch) in ident.chars().enumerate() {
                    if ch.is_uppercase() {
                        if idx > 0 && !out.ends_with('_') {
                            out.push('_');
                        }
                        out.extend(ch.to_lowercase());
                    } else {
                        out.push(ch);
                    }
                }
                out
            },
            Self::LowerCase => ident.to_lowercase(),
        }
    }
}

#[derive(Default)]
struct ContainerAttrs {
    rename_all: Option<RenameRule>,
    opaque: bool,
}

impl ContainerAttrs {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for attr in attrs.iter().filter(|attr| attr.path().is_ident("describe")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename_all") {
                    let lit: LitStr = meta.value()?.parse()?;
                    parsed.rename_all = Some(RenameRule::from_lit(&lit)?);
                    Ok(())
                } else if meta.path.is_ident("opaque") {
                    parsed.opaque = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `rename_all` or `opaque`"))
                }
            })?;
        }
        Ok(parsed)
    }

    fn rename(&self, ident: &str) -> String {
        self.rename_all
            .map_or_else(|| ident.to_string(), |rule| rule.apply(ident))
    }
}

#[derive(Default)]
struct ItemAttrs {
    rename: Option<String>,
    skip: bool,
}

impl ItemAttrs {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for attr in attrs.iter().filter(|attr| attr.path().is_ident("describe")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let lit: LitStr = meta.value()?.parse()?;
                    parsed.rename = Some(lit.value());
                    Ok(())
                } else if meta.path.is_ident("skip") {
                    parsed.skip = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `rename` or `skip`"))
                }
            })?;
        }
        Ok(parsed)
    }
}
