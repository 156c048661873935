//! Derive macros for construct
//!
//! `#[derive(Constructible)]` writes the constructor description that
//! `ContainerBuilder::autowire` needs, so a struct can be auto-wired without
//! a hand-written `Constructible` impl.
//!
//! # Example
//!
//! ```rust,ignore
//! use construct::{Constructible, ContainerBuilder};
//! use std::sync::Arc;
//!
//! struct Database;
//! struct Cache;
//!
//! #[derive(Constructible)]
//! struct UserService {
//!     #[inject]
//!     db: Arc<Database>,
//!     #[inject]
//!     cache: Arc<Cache>,
//!     // Non-injected fields use Default
//!     request_count: u64,
//! }
//!
//! let mut builder = ContainerBuilder::new();
//! builder.register(|| Database).single_instance();
//! builder.register(|| Cache).single_instance();
//! builder.autowire::<UserService>()?;
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Type, parse_macro_input, parse_quote};

/// Derive `construct::Constructible`.
///
/// Generates a single constructor whose parameters are the fields marked
/// `#[inject]`, in field order.
///
/// # Attributes
///
/// - `#[inject]` - Resolve this field from the container. The field type must
///   be `Arc<T>`; `T` may be a trait object (`Arc<dyn Trait>`).
///
/// Fields without `#[inject]` are initialised with `Default::default()`.
/// Named, tuple and unit structs are supported. Type parameters gain
/// `Send + Sync + 'static` bounds; lifetime parameters are rejected.
///
/// # Generated Code
///
/// ```rust,ignore
/// #[derive(Constructible)]
/// struct Service {
///     #[inject]
///     db: Arc<Database>,
///     hits: u64,
/// }
///
/// // impl Constructible for Service {
/// //     fn constructors() -> Vec<Constructor<Self>> {
/// //         vec![Constructor::from_parts(
/// //             vec![TypeKey::of::<Database>()],
/// //             |args| Ok(Self { db: args.next::<Database>()?, hits: Default::default() }),
/// //         )]
/// //     }
/// // }
/// ```
#[proc_macro_derive(Constructible, attributes(inject))]
pub fn derive_constructible(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_constructible(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_constructible(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    if let Some(lifetime) = input.generics.lifetimes().next() {
        return Err(syn::Error::new_spanned(
            lifetime,
            "Constructible cannot be derived for structs with lifetime parameters",
        ));
    }

    // Services are shared across threads and stored as 'static
    let mut generics = input.generics.clone();
    let type_params: Vec<syn::Ident> = generics.type_params().map(|p| p.ident.clone()).collect();
    let predicates = &mut generics.make_where_clause().predicates;
    for ident in &type_params {
        predicates.push(parse_quote! {
            #ident: ::std::marker::Send + ::std::marker::Sync + 'static
        });
    }
    predicates.push(parse_quote! { Self: ::construct::Injectable });
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Constructible can only be derived for structs",
            ));
        }
    };

    let mut parameters: Vec<&Type> = Vec::new();
    let mut inits: Vec<proc_macro2::TokenStream> = Vec::new();

    for field in fields.iter() {
        let init = if has_inject_attr(&field.attrs)? {
            let inner = extract_arc_inner_type(&field.ty).ok_or_else(|| {
                syn::Error::new_spanned(&field.ty, "Fields marked with #[inject] must have type Arc<T>")
            })?;
            parameters.push(inner);
            quote! { args.next::<#inner>()? }
        } else {
            quote! { ::std::default::Default::default() }
        };

        inits.push(match &field.ident {
            Some(ident) => quote! { #ident: #init },
            None => init,
        });
    }

    let construction = match fields {
        Fields::Named(_) => quote! { Self { #(#inits),* } },
        Fields::Unnamed(_) => quote! { Self ( #(#inits),* ) },
        Fields::Unit => quote! { Self },
    };

    let silence_unused = if parameters.is_empty() {
        quote! { let _ = &args; }
    } else {
        quote! {}
    };

    Ok(quote! {
        impl #impl_generics ::construct::Constructible for #name #ty_generics #where_clause {
            fn constructors() -> ::std::vec::Vec<::construct::Constructor<Self>> {
                ::std::vec![::construct::Constructor::from_parts(
                    ::std::vec![#(::construct::TypeKey::of::<#parameters>()),*],
                    |args: &mut ::construct::Arguments| {
                        #silence_unused
                        ::std::result::Result::Ok(#construction)
                    },
                )]
            }
        }
    })
}

/// Whether the field carries `#[inject]`; arguments are rejected.
fn has_inject_attr(attrs: &[Attribute]) -> syn::Result<bool> {
    for attr in attrs {
        if attr.path().is_ident("inject") {
            attr.meta.require_path_only()?;
            return Ok(true);
        }
    }
    Ok(false)
}

/// Extract T from Arc<T>
fn extract_arc_inner_type(ty: &Type) -> Option<&Type> {
    if let Type::Path(type_path) = ty {
        let segment = type_path.path.segments.last()?;
        if segment.ident == "Arc" {
            if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
                    return Some(inner);
                }
            }
        }
    }
    None
}
