//! Procedural macros for the vaultdoc project.
//!
//! `#[derive(Record)]` generates the per-type adapter the mapper works through:
//!
//! - the identity field is the field named `id`, or the one marked `#[record(id)]`, and must
//!   be a `bson::oid::ObjectId`
//! - fields marked `#[record(sensitive)]` are encrypted at rest
//! - hooks are opted into on the struct, e.g. `#[record(validate, before_save)]`, and the type
//!   must implement the matching hook traits. Implementing a hook trait without listing it
//!   here leaves the hook unregistered and the mapper never calls it.
//!
//! Serialized names follow serde: container `#[serde(rename_all = "...")]` applies to every
//! field and field-level `#[serde(rename = "...")]` overrides it. The identity and sensitive
//! fields must have a single name in both directions, so the split
//! `rename(serialize = "...", deserialize = "...")` form is rejected on them, as is a split
//! `rename_all`. Sensitive fields must always be serialized and cannot be skipped or
//! flattened.
//!
//! ```ignore
//! #[derive(Debug, Serialize, Deserialize, Record)]
//! #[serde(rename_all = "camelCase")]
//! #[record(validate, before_save)]
//! pub struct CreditCard {
//!     pub id: ObjectId,
//!     pub holder_name: String,
//!     #[record(sensitive)]
//!     pub card_number: String,
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as vaultdoc_macros;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    Attribute, Data, DeriveInput, Error, Expr, ExprLit, Fields, Ident, Lit, LitStr, Meta, Token,
    ext::IdentExt, parse_macro_input, punctuated::Punctuated,
};

const HOOKS: [&str; 5] = ["validate", "before_create", "before_update", "before_save", "after_find"];
const OMITTING: [&str; 4] = ["skip", "skip_serializing", "skip_serializing_if", "flatten"];

#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand_record(input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

struct IdentityField {
    ident: Ident,
    key: String,
    explicit: bool,
}

fn expand_record(input: DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => return Err(Error::new_spanned(name, "Record requires a struct with named fields")),
        },
        _ => return Err(Error::new_spanned(name, "Record can only be derived for structs")),
    };

    let hooks = container_hooks(&input.attrs)?;
    let rename_all = container_rename_all(&input.attrs)?;
    let mut identity: Option<IdentityField> = None;
    let mut sensitive = Vec::new();

    for field in fields {
        let Some(ident) = &field.ident else { continue };
        let flags = record_flags(&field.attrs)?;
        let is_id = flags.iter().any(|flag| flag == "id");
        let is_sensitive = flags.iter().any(|flag| flag == "sensitive");

        let rename = serde_rename(&field.attrs)?;
        if let Some(Rename::Split(meta)) = &rename {
            if is_id || is_sensitive || ident == "id" {
                return Err(Error::new_spanned(
                    meta,
                    "identity and sensitive fields need a single name, use `rename = \"...\"`",
                ));
            }
        }
        let key = match rename {
            Some(Rename::Name(key)) => key,
            _ => {
                let field_name = ident.unraw().to_string();
                rename_all.map_or(field_name.clone(), |rule| rule.apply(&field_name))
            }
        };

        if is_id {
            if identity.as_ref().is_some_and(|id| id.explicit) {
                return Err(Error::new_spanned(ident, "only one field can be marked #[record(id)]"));
            }
            identity = Some(IdentityField { ident: ident.clone(), key: key.clone(), explicit: true });
        } else if ident == "id" && identity.is_none() {
            identity = Some(IdentityField { ident: ident.clone(), key: key.clone(), explicit: false });
        }

        if is_sensitive {
            if let Some(meta) = serde_omission(&field.attrs)? {
                return Err(Error::new_spanned(meta, "sensitive fields must always be serialized"));
            }
            sensitive.push((ident.clone(), key));
        }
    }

    let Some(identity) = identity else {
        return Err(Error::new_spanned(
            name,
            "Record requires an `id` field or a field marked #[record(id)]",
        ));
    };
    if let Some((ident, _)) = sensitive.iter().find(|(ident, _)| *ident == identity.ident) {
        return Err(Error::new_spanned(ident, "the identity field cannot be sensitive"));
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let id_ident = &identity.ident;
    let id_key = &identity.key;
    let type_name = name.to_string();
    let sensitive_keys = sensitive.iter().map(|(_, key)| key);
    let hook_methods = hooks.iter().map(|hook| format_ident!("with_{}", hook));

    Ok(quote! {
        impl #impl_generics ::vaultdoc::record::Record for #name #ty_generics #where_clause {
            const ID_FIELD: &'static str = #id_key;

            fn id(&self) -> ::vaultdoc::bson::oid::ObjectId {
                self.#id_ident
            }

            fn set_id(&mut self, id: ::vaultdoc::bson::oid::ObjectId) {
                self.#id_ident = id;
            }

            fn type_name() -> &'static str {
                #type_name
            }

            fn sensitive_fields() -> &'static [&'static str] {
                &[#(#sensitive_keys),*]
            }

            fn capabilities() -> ::vaultdoc::record::Capabilities<Self> {
                ::vaultdoc::record::Capabilities::none()
                    #(.#hook_methods())*
            }
        }
    })
}

/// Case conversions accepted by serde's `rename_all`, applied to snake_case field names.
#[derive(Debug, Clone, Copy, PartialEq)]
enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    const RULES: [(&'static str, Self); 8] = [
        ("lowercase", Self::Lower),
        ("UPPERCASE", Self::Upper),
        ("PascalCase", Self::Pascal),
        ("camelCase", Self::Camel),
        ("snake_case", Self::Snake),
        ("SCREAMING_SNAKE_CASE", Self::ScreamingSnake),
        ("kebab-case", Self::Kebab),
        ("SCREAMING-KEBAB-CASE", Self::ScreamingKebab),
    ];

    fn parse(lit: &LitStr) -> syn::Result<Self> {
        let value = lit.value();

        Self::RULES
            .iter()
            .find(|(name, _)| *name == value)
            .map(|(_, rule)| *rule)
            .ok_or_else(|| Error::new_spanned(lit, format!("unknown rename rule `{value}`")))
    }

    fn apply(self, field: &str) -> String {
        match self {
            Self::Lower | Self::Snake => field.to_string(),
            Self::Upper | Self::ScreamingSnake => field.to_ascii_uppercase(),
            Self::Pascal => {
                let mut pascal = String::with_capacity(field.len());
                let mut capitalize = true;
                for ch in field.chars() {
                    if ch == '_' {
                        capitalize = true;
                    } else if capitalize {
                        pascal.push(ch.to_ascii_uppercase());
                        capitalize = false;
                    } else {
                        pascal.push(ch);
                    }
                }
                pascal
            }
            Self::Camel => {
                let pascal = Self::Pascal.apply(field);
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                    None => pascal,
                }
            }
            Self::Kebab => field.replace('_', "-"),
            Self::ScreamingKebab => field.to_ascii_uppercase().replace('_', "-"),
        }
    }
}

/// How a field's serialized name is declared with `#[serde(rename ...)]`.
enum Rename {
    Name(String),
    /// `rename(serialize = "...", deserialize = "...")`
    Split(Meta),
}

/// Hook names listed in struct-level `#[record(...)]` attributes, in declaration order.
fn container_hooks(attrs: &[Attribute]) -> syn::Result<Vec<String>> {
    let mut hooks = Vec::new();

    for meta in metas(attrs, "record")? {
        let Meta::Path(path) = &meta else {
            return Err(Error::new_spanned(meta, "expected a hook name"));
        };
        let hook = path
            .get_ident()
            .map(Ident::to_string)
            .filter(|hook| HOOKS.contains(&hook.as_str()))
            .ok_or_else(|| {
                Error::new_spanned(path, format!("unknown hook, expected one of: {}", HOOKS.join(", ")))
            })?;

        if !hooks.contains(&hook) {
            hooks.push(hook);
        }
    }

    Ok(hooks)
}

/// The rule of a struct-level `#[serde(rename_all = "...")]`, if present.
fn container_rename_all(attrs: &[Attribute]) -> syn::Result<Option<RenameRule>> {
    for meta in metas(attrs, "serde")? {
        if !meta.path().is_ident("rename_all") {
            continue;
        }

        return match &meta {
            Meta::NameValue(pair) => match &pair.value {
                Expr::Lit(ExprLit { lit: Lit::Str(value), .. }) => RenameRule::parse(value).map(Some),
                other => Err(Error::new_spanned(other, "expected a string literal")),
            },
            _ => Err(Error::new_spanned(
                meta,
                "Record needs a single rename rule, use `rename_all = \"...\"`",
            )),
        };
    }

    Ok(None)
}

/// Flags listed in field-level `#[record(...)]` attributes.
fn record_flags(attrs: &[Attribute]) -> syn::Result<Vec<String>> {
    metas(attrs, "record")?
        .into_iter()
        .map(|meta| match &meta {
            Meta::Path(path) if path.is_ident("id") || path.is_ident("sensitive") => {
                Ok(path.get_ident().map(Ident::to_string).unwrap_or_default())
            }
            _ => Err(Error::new_spanned(meta, "expected `id` or `sensitive`")),
        })
        .collect()
}

/// The field-level `#[serde(rename ...)]`, if present.
fn serde_rename(attrs: &[Attribute]) -> syn::Result<Option<Rename>> {
    for meta in metas(attrs, "serde")? {
        if !meta.path().is_ident("rename") {
            continue;
        }

        match meta {
            Meta::NameValue(pair) => {
                if let Expr::Lit(ExprLit { lit: Lit::Str(value), .. }) = pair.value {
                    return Ok(Some(Rename::Name(value.value())));
                }
            }
            split => return Ok(Some(Rename::Split(split))),
        }
    }

    Ok(None)
}

/// The first serde option that can keep the field out of the serialized document.
fn serde_omission(attrs: &[Attribute]) -> syn::Result<Option<Meta>> {
    Ok(metas(attrs, "serde")?
        .into_iter()
        .find(|meta| OMITTING.iter().any(|option| meta.path().is_ident(option))))
}

fn metas(attrs: &[Attribute], name: &str) -> syn::Result<Vec<Meta>> {
    let mut metas = Vec::new();

    for attr in attrs.iter().filter(|attr| attr.path().is_ident(name)) {
        metas.extend(attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?);
    }

    Ok(metas)
}
