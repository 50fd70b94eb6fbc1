//! `#[derive(RequiredFields)]` for `cloudfn`.
//!
//! Use it through the `cloudfn` re-export rather than depending on this crate
//! directly.
//!
//! ```ignore
//! #[derive(Deserialize, RequiredFields)]
//! struct CreateCampaignReq {
//!     #[cloudfn(required)]
//!     campaign: Option<Campaign>,
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod rename;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::meta::ParseNestedMeta;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, LitStr};

use crate::rename::RenameRule;

/// Implement `cloudfn::RequiredFields` for a struct with named fields.
///
/// Fields marked `#[cloudfn(required)]` are checked in declaration order.
/// Each is reported under its serde name: `#[serde(rename = "...")]` if
/// present, else the field name under the container's
/// `#[serde(rename_all = "...")]` rule.
#[proc_macro_derive(RequiredFields, attributes(cloudfn))]
pub fn derive_required_fields(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "RequiredFields can only be derived for structs",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "RequiredFields requires a struct with named fields",
        ));
    };

    let rule = match serde_name(&input.attrs, "rename_all")? {
        Some(lit) => RenameRule::parse(&lit.value())
            .ok_or_else(|| syn::Error::new_spanned(&lit, "unknown rename_all rule"))?,
        None => RenameRule::None,
    };

    let mut descriptors = Vec::new();
    for field in &fields.named {
        if !is_required(&field.attrs)? {
            continue;
        }
        let Some(ident) = &field.ident else {
            continue;
        };
        let name = match serde_name(&field.attrs, "rename")? {
            Some(lit) => lit.value(),
            None => rule.apply(&ident.unraw().to_string()),
        };
        descriptors.push(quote! {
            ::cloudfn::RequiredField::new(#name, |value: &Self| {
                ::cloudfn::IsZero::is_zero(&value.#ident)
            })
        });
    }

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::cloudfn::RequiredFields for #ident #ty_generics #where_clause {
            fn required_fields() -> ::std::vec::Vec<::cloudfn::RequiredField<Self>> {
                ::std::vec![#(#descriptors),*]
            }
        }
    })
}

fn is_required(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut required = false;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("cloudfn")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("required") {
                required = true;
                Ok(())
            } else {
                Err(meta.error("unsupported cloudfn attribute; expected `required`"))
            }
        })?;
    }
    Ok(required)
}

/// Find `key = "..."` (or the `deserialize` half of `key(...)`) in `#[serde]`
/// attributes. Other serde options are skipped.
fn serde_name(attrs: &[Attribute], key: &str) -> syn::Result<Option<LitStr>> {
    let mut found = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        attr.parse_nested_meta(|meta| {
            if !meta.path.is_ident(key) {
                return skip(&meta);
            }
            if meta.input.peek(syn::Token![=]) {
                found = Some(meta.value()?.parse::<LitStr>()?);
                return Ok(());
            }
            meta.parse_nested_meta(|inner| {
                let value = inner.value()?.parse::<LitStr>()?;
                if inner.path.is_ident("deserialize") {
                    found = Some(value);
                }
                Ok(())
            })
        })?;
    }
    Ok(found)
}

fn skip(meta: &ParseNestedMeta<'_>) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        meta.value()?.parse::<syn::Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        let _content;
        syn::parenthesized!(_content in meta.input);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use syn::parse_quote;

    fn expanded(input: &DeriveInput) -> String {
        expand(input).expect("expansion should succeed").to_string()
    }

    fn names(input: &DeriveInput) -> Vec<String> {
        let code = expanded(input);
        code.split("RequiredField :: new (")
            .skip(1)
            .map(|chunk| chunk.split('"').nth(1).unwrap().to_string())
            .collect()
    }

    #[test]
    fn generates_valid_impl() {
        let input: DeriveInput = parse_quote! {
            struct CreateCampaignReq {
                #[cloudfn(required)]
                campaign: Option<Campaign>,
            }
        };
        let code = expand(&input).unwrap();
        let item: syn::ItemImpl = syn::parse2(code).expect("generated code should be an impl");
        assert!(item.trait_.is_some());
    }

    #[test]
    fn only_marked_fields_in_order() {
        let input: DeriveInput = parse_quote! {
            struct Req {
                #[cloudfn(required)]
                b: String,
                skipped: String,
                #[cloudfn(required)]
                a: u32,
            }
        };
        assert_eq!(names(&input), ["b", "a"]);
    }

    #[test]
    fn serde_rename_wins() {
        let input: DeriveInput = parse_quote! {
            #[serde(rename_all = "camelCase", deny_unknown_fields)]
            struct Req {
                #[serde(rename = "campaign", default)]
                #[cloudfn(required)]
                the_campaign: Option<Campaign>,
                #[serde(skip_serializing_if = "String::is_empty")]
                #[cloudfn(required)]
                owner_id: String,
            }
        };
        assert_eq!(names(&input), ["campaign", "ownerId"]);
    }

    #[test]
    fn rename_deserialize_half() {
        let input: DeriveInput = parse_quote! {
            struct Req {
                #[serde(rename(serialize = "out", deserialize = "in"))]
                #[cloudfn(required)]
                field: String,
            }
        };
        assert_eq!(names(&input), ["in"]);
    }

    #[test]
    fn raw_identifiers_are_unrawed() {
        let input: DeriveInput = parse_quote! {
            struct Req {
                #[cloudfn(required)]
                r#type: String,
            }
        };
        assert_eq!(names(&input), ["type"]);
    }

    #[test]
    fn no_required_fields_gives_empty_vec() {
        let input: DeriveInput = parse_quote! {
            struct Req {
                a: String,
            }
        };
        assert!(names(&input).is_empty());
        assert!(expanded(&input).contains("vec ! []"));
    }

    #[test]
    fn generics_are_carried() {
        let input: DeriveInput = parse_quote! {
            struct Page<T: Clone> {
                #[cloudfn(required)]
                items: Vec<T>,
            }
        };
        let code = expanded(&input);
        assert!(code.contains("impl < T : Clone >"), "{code}");
        assert!(code.contains("for Page < T >"), "{code}");
    }

    #[test]
    fn rejects_enums() {
        let input: DeriveInput = parse_quote! {
            enum Req { A }
        };
        let err = expand(&input).unwrap_err();
        assert!(err.to_string().contains("structs"), "{err}");
    }

    #[test]
    fn rejects_tuple_structs() {
        let input: DeriveInput = parse_quote! {
            struct Req(String);
        };
        assert!(expand(&input).is_err());
    }

    #[test]
    fn rejects_unknown_cloudfn_option() {
        let input: DeriveInput = parse_quote! {
            struct Req {
                #[cloudfn(optional)]
                a: String,
            }
        };
        let err = expand(&input).unwrap_err();
        assert!(err.to_string().contains("expected `required`"), "{err}");
    }

    #[test]
    fn rejects_unknown_rename_rule() {
        let input: DeriveInput = parse_quote! {
            #[serde(rename_all = "sPoNgEcAsE")]
            struct Req {
                a: String,
            }
        };
        assert!(expand(&input).is_err());
    }
}
