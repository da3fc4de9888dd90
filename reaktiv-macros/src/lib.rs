//! Procedural macros for reaktiv.

use darling::{FromDeriveInput, FromVariant};
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

/// Container-level attributes for #[derive(Action)]
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(action), supports(enum_any))]
struct ActionOpts {
    ident: syn::Ident,
    data: darling::ast::Data<ActionVariant, ()>,

    /// Module tag shared by every variant, unless overridden per-variant.
    #[darling(default)]
    module: Option<String>,
}

/// Variant-level attributes
#[derive(Debug, FromVariant)]
#[darling(attributes(action))]
struct ActionVariant {
    ident: syn::Ident,
    fields: darling::ast::Fields<()>,

    /// Override the container-level module tag for this variant.
    #[darling(default)]
    module: Option<String>,

    /// `"high"` or `"normal"` (default).
    #[darling(default)]
    priority: Option<String>,
}

/// Derive macro for the `Action` trait.
///
/// Generates `name()` (the variant's identifier as a static string),
/// `module_tag()` from `#[action(module = "...")]` (container-level,
/// optionally overridden per variant), and `priority()` from
/// `#[action(priority = "high")]` (variant-level, defaults to normal).
///
/// # Example
/// ```ignore
/// #[derive(Action, Clone, Debug)]
/// #[action(module = "Counter")]
/// enum CounterAction {
///     Increment,
///     #[action(priority = "high")]
///     Reset,
/// }
///
/// let action = CounterAction::Reset;
/// assert_eq!(action.name(), "Reset");
/// assert_eq!(action.module_tag(), "Counter");
/// assert!(action.is_high_priority());
/// ```
#[proc_macro_derive(Action, attributes(action))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let opts = match ActionOpts::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    let name = &opts.ident;

    let variants = match &opts.data {
        darling::ast::Data::Enum(variants) => variants,
        _ => {
            return syn::Error::new_spanned(&input, "Action can only be derived for enums")
                .to_compile_error()
                .into();
        }
    };

    let name_arms = variants.iter().map(|v| {
        let variant_name = &v.ident;
        let variant_str = variant_name.to_string();

        match &v.fields.style {
            darling::ast::Style::Unit => quote! {
                #name::#variant_name => #variant_str
            },
            darling::ast::Style::Tuple => quote! {
                #name::#variant_name(..) => #variant_str
            },
            darling::ast::Style::Struct => quote! {
                #name::#variant_name { .. } => #variant_str
            },
        }
    });

    let module_tag_arms: Vec<_> = variants
        .iter()
        .map(|v| {
            let variant_name = &v.ident;
            let tag = match v.module.clone().or_else(|| opts.module.clone()) {
                Some(tag) => tag,
                None => {
                    return syn::Error::new_spanned(
                        &input,
                        format!(
                            "variant `{}` has no module tag: add #[action(module = \"...\")] \
                             on the enum or on this variant",
                            variant_name
                        ),
                    )
                    .to_compile_error();
                }
            };
            match &v.fields.style {
                darling::ast::Style::Unit => quote! {
                    #name::#variant_name => #tag
                },
                darling::ast::Style::Tuple => quote! {
                    #name::#variant_name(..) => #tag
                },
                darling::ast::Style::Struct => quote! {
                    #name::#variant_name { .. } => #tag
                },
            }
        })
        .collect();

    let priority_arms: Vec<_> = variants
        .iter()
        .map(|v| {
            let variant_name = &v.ident;
            let is_high = matches!(v.priority.as_deref(), Some("high"));
            let priority_expr = if is_high {
                quote! { reaktiv_core::Priority::High }
            } else {
                quote! { reaktiv_core::Priority::Normal }
            };
            match &v.fields.style {
                darling::ast::Style::Unit => quote! {
                    #name::#variant_name => #priority_expr
                },
                darling::ast::Style::Tuple => quote! {
                    #name::#variant_name(..) => #priority_expr
                },
                darling::ast::Style::Struct => quote! {
                    #name::#variant_name { .. } => #priority_expr
                },
            }
        })
        .collect();

    let expanded = quote! {
        impl reaktiv_core::Action for #name {
            fn name(&self) -> &'static str {
                match self {
                    #(#name_arms),*
                }
            }

            fn module_tag(&self) -> &'static str {
                match self {
                    #(#module_tag_arms),*
                }
            }

            fn priority(&self) -> reaktiv_core::Priority {
                match self {
                    #(#priority_arms),*
                }
            }
        }
    };

    TokenStream::from(expanded)
}
