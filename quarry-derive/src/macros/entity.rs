//! Derive macro for `Entity`
//!
//! Emits, for a struct with named fields:
//! - `info()`: a static `EntityInfo` with properties in declaration order,
//!   navigations, and the erased materializer
//! - `get` / `set`: property access keyed by property name
//! - `reference_key` / `attach`: navigation access keyed by navigation name

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Ident, Type, Visibility};

use crate::attributes::{parse_entity_attributes, parse_field_attributes, NavigationKind};
use crate::utils::pascal_case;

struct Property {
    ident: Ident,
    ty: Type,
    name: String,
    readable: bool,
    writable: bool,
}

struct Navigation {
    ident: Ident,
    ty: Type,
    name: String,
    kind: NavigationKind,
}

pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic structs",
        ));
    }
    let fields = match &input.data {
        Data::Struct(syn::DataStruct {
            fields: Fields::Named(fields),
            ..
        }) => &fields.named,
        _ => {
            return Err(syn::Error::new_spanned(
                struct_name,
                "Entity can only be derived for structs with named fields",
            ))
        }
    };

    let entity_name = parse_entity_attributes(&input.attrs)?
        .name
        .unwrap_or_else(|| struct_name.to_string());

    let mut properties = Vec::new();
    let mut navigations = Vec::new();
    for field in fields {
        let attrs = parse_field_attributes(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let name = attrs
            .name
            .unwrap_or_else(|| pascal_case(&ident.to_string()));
        match attrs.navigation {
            Some(kind) => navigations.push(Navigation {
                ident,
                ty: field.ty.clone(),
                name,
                kind,
            }),
            None => {
                let public = matches!(field.vis, Visibility::Public(_));
                properties.push(Property {
                    ident,
                    ty: field.ty.clone(),
                    name,
                    readable: public,
                    writable: public && !attrs.read_only,
                });
            }
        }
    }

    let property_infos = properties.iter().map(|p| {
        let (name, ty, readable, writable) = (&p.name, &p.ty, p.readable, p.writable);
        quote! {
            ::quarry::PropertyInfo {
                name: #name,
                field_type: <#ty as ::quarry::ValueType>::FIELD_TYPE,
                nullable: <#ty as ::quarry::ValueType>::NULLABLE,
                readable: #readable,
                writable: #writable,
            }
        }
    });

    let navigation_infos = navigations.iter().map(|n| {
        let (name, ty) = (&n.name, &n.ty);
        let cardinality = match n.kind {
            NavigationKind::Reference => quote!(::quarry::entity::Cardinality::Reference),
            NavigationKind::Collection => quote!(::quarry::entity::Cardinality::Collection),
        };
        quote! {
            ::quarry::NavigationInfo {
                name: #name,
                target: <<#ty as ::quarry::entity::Navigation>::Target as ::quarry::Entity>::info,
                cardinality: #cardinality,
            }
        }
    });

    let get_arms = properties.iter().filter(|p| p.readable).map(|p| {
        let (name, ident) = (&p.name, &p.ident);
        quote! {
            #name => ::core::option::Option::Some(
                ::quarry::ValueType::into_value(::core::clone::Clone::clone(&self.#ident)),
            ),
        }
    });

    let set_arms = properties.iter().filter(|p| p.writable).map(|p| {
        let (name, ident, ty) = (&p.name, &p.ident, &p.ty);
        quote! {
            #name => match <#ty as ::quarry::TryGetable>::try_get(::core::clone::Clone::clone(&value)) {
                ::core::result::Result::Ok(v) => {
                    self.#ident = v;
                    ::core::result::Result::Ok(())
                }
                ::core::result::Result::Err(source) => {
                    ::core::result::Result::Err(::quarry::MapError::Conversion {
                        entity: #entity_name.to_string(),
                        property: property.to_string(),
                        value,
                        source,
                    })
                }
            },
        }
    });

    let reference_arms = navigations
        .iter()
        .filter(|n| n.kind == NavigationKind::Reference)
        .map(|n| {
            let (name, ident) = (&n.name, &n.ident);
            quote! {
                #name => ::quarry::entity::Navigation::referenced(&self.#ident)
                    .and_then(|related| ::quarry::Entity::get(related, property)),
            }
        });

    let attach_arms = navigations.iter().map(|n| {
        let (name, ident) = (&n.name, &n.ident);
        quote! {
            #name => ::quarry::entity::attach_related(&mut self.#ident, #entity_name, navigation, related),
        }
    });

    Ok(quote! {
        impl ::quarry::Entity for #struct_name {
            fn info() -> &'static ::quarry::EntityInfo {
                static PROPERTIES: &[::quarry::PropertyInfo] = &[#(#property_infos),*];
                static NAVIGATIONS: &[::quarry::NavigationInfo] = &[#(#navigation_infos),*];
                static INFO: ::quarry::EntityInfo = ::quarry::EntityInfo {
                    name: #entity_name,
                    properties: PROPERTIES,
                    navigations: NAVIGATIONS,
                    materialize: ::quarry::mapper::materialize_erased::<#struct_name>,
                };
                &INFO
            }

            #[allow(unused_variables)]
            fn get(&self, property: &str) -> ::core::option::Option<::quarry::sea_query::Value> {
                match property {
                    #(#get_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            #[allow(unused_variables)]
            fn set(
                &mut self,
                property: &str,
                value: ::quarry::sea_query::Value,
            ) -> ::core::result::Result<(), ::quarry::MapError> {
                match property {
                    #(#set_arms)*
                    _ => ::core::result::Result::Err(::quarry::MapError::MissingProperty {
                        entity: #entity_name.to_string(),
                        property: property.to_string(),
                    }),
                }
            }

            #[allow(unused_variables)]
            fn reference_key(
                &self,
                navigation: &str,
                property: &str,
            ) -> ::core::option::Option<::quarry::sea_query::Value> {
                match navigation {
                    #(#reference_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            #[allow(unused_variables)]
            fn attach(
                &mut self,
                navigation: &str,
                related: ::std::boxed::Box<dyn ::core::any::Any>,
            ) -> ::core::result::Result<(), ::quarry::MapError> {
                match navigation {
                    #(#attach_arms)*
                    _ => ::core::result::Result::Err(::quarry::MapError::NavigationMismatch {
                        entity: #entity_name.to_string(),
                        navigation: navigation.to_string(),
                    }),
                }
            }
        }
    })
}
