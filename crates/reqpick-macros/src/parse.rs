//! Parsing of `#[pick(...)]` attributes.
//!
//! Literal bounds are checked here so that a malformed `min_length` or
//! `minimum` is a compile error rather than a panic on first use.

use proc_macro2::Span;
use syn::{
    ext::IdentExt,
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    spanned::Spanned,
    Attribute, Data, DeriveInput, Expr, ExprLit, ExprUnary, Fields, Ident, Lit, Meta, Token, Type,
    UnOp, Visibility,
};

/// Request part a field is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Path,
    Query,
    Header,
    Form,
}

impl SourceKind {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "form" => Some(Self::Form),
            _ => None,
        }
    }

    /// Variant name of `reqpick::Source`.
    pub fn variant(self) -> &'static str {
        match self {
            Self::Path => "Path",
            Self::Query => "Query",
            Self::Header => "Header",
            Self::Form => "Form",
        }
    }
}

/// Validation rule declared on a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    MinLength,
    MaxLength,
    Minimum,
    Maximum,
}

impl RuleKind {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            "min_length" | "minLength" => Some(Self::MinLength),
            "max_length" | "maxLength" => Some(Self::MaxLength),
            "minimum" => Some(Self::Minimum),
            "maximum" => Some(Self::Maximum),
            _ => None,
        }
    }

    /// Builder method on `reqpick::Field`.
    pub fn method(self) -> &'static str {
        match self {
            Self::MinLength => "min_length",
            Self::MaxLength => "max_length",
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
        }
    }

    fn check(self, literal: &str) -> Result<(), &'static str> {
        let valid = match self {
            Self::MinLength | Self::MaxLength => literal.parse::<usize>().is_ok(),
            Self::Minimum | Self::Maximum => literal.parse::<f64>().is_ok_and(f64::is_finite),
        };
        if valid {
            Ok(())
        } else if matches!(self, Self::MinLength | Self::MaxLength) {
            Err("expected a non-negative integer")
        } else {
            Err("expected a finite number")
        }
    }
}

/// Field-level `#[pick(...)]` settings.
#[derive(Debug, Default)]
pub struct FieldAttrs {
    /// Source tag and lookup key.
    pub source: Option<(SourceKind, String)>,
    /// Companion setter method.
    pub setter: Option<Ident>,
    /// Validation rules with their literal bounds.
    pub rules: Vec<(RuleKind, String)>,
}

impl FieldAttrs {
    fn from_metas(metas: impl IntoIterator<Item = Meta>) -> syn::Result<Self> {
        let mut attrs = Self::default();

        for meta in metas {
            let nv = match meta {
                Meta::NameValue(nv) => nv,
                other => return Err(syn::Error::new(other.span(), "expected name = value")),
            };
            let key = nv
                .path
                .get_ident()
                .ok_or_else(|| syn::Error::new(nv.path.span(), "expected identifier"))?
                .to_string();

            if let Some(kind) = SourceKind::from_key(&key) {
                if attrs.source.is_some() {
                    return Err(syn::Error::new(
                        nv.path.span(),
                        "multiple source tags; declare exactly one of path, query, header, form",
                    ));
                }
                let value = string_value(&nv.value)?;
                if value.is_empty() {
                    return Err(syn::Error::new(nv.value.span(), "source key must not be empty"));
                }
                attrs.source = Some((kind, value));
            } else if let Some(rule) = RuleKind::from_key(&key) {
                if attrs.rules.iter().any(|(r, _)| *r == rule) {
                    return Err(syn::Error::new(
                        nv.path.span(),
                        format!("duplicate `{}` rule", rule.method()),
                    ));
                }
                let literal = literal_value(&nv.value)?;
                rule.check(&literal)
                    .map_err(|reason| syn::Error::new(nv.value.span(), reason))?;
                attrs.rules.push((rule, literal));
            } else if key == "setter" {
                if attrs.setter.is_some() {
                    return Err(syn::Error::new(nv.path.span(), "duplicate `setter`"));
                }
                let name = string_value(&nv.value)?;
                let ident = syn::parse_str::<Ident>(&name).map_err(|_| {
                    syn::Error::new(nv.value.span(), "setter must name a method")
                })?;
                attrs.setter = Some(Ident::new(&ident.to_string(), nv.value.span()));
            } else {
                return Err(syn::Error::new(
                    nv.path.span(),
                    format!("unknown attribute: {key}"),
                ));
            }
        }

        if attrs.source.is_none() && !attrs.rules.is_empty() {
            return Err(syn::Error::new(
                Span::call_site(),
                "validation rules need a source tag",
            ));
        }

        Ok(attrs)
    }
}

impl Parse for FieldAttrs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let metas: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;
        Self::from_metas(metas)
    }
}

/// A parsed record field.
#[derive(Debug)]
pub struct PickField {
    /// Field identifier as written.
    pub member: Ident,
    /// Field name without a raw prefix.
    pub name: String,
    /// Declared type.
    pub ty: Type,
    /// True when the field is not `pub`.
    pub restricted: bool,
    /// `#[pick(...)]` settings.
    pub attrs: FieldAttrs,
}

/// A parsed record.
#[derive(Debug)]
pub struct PickStruct {
    /// Type identifier.
    pub ident: Ident,
    /// Record name used in error messages.
    pub name: String,
    /// Fields in declaration order.
    pub fields: Vec<PickField>,
}

impl PickStruct {
    /// Parses a derive input.
    pub fn parse(input: &DeriveInput) -> syn::Result<Self> {
        if !input.generics.params.is_empty() {
            return Err(syn::Error::new(
                input.generics.span(),
                "Pick cannot be derived for generic types",
            ));
        }

        let Data::Struct(data) = &input.data else {
            return Err(syn::Error::new(
                input.ident.span(),
                "Pick can only be derived for structs",
            ));
        };
        let Fields::Named(named) = &data.fields else {
            return Err(syn::Error::new(
                input.ident.span(),
                "Pick requires a struct with named fields",
            ));
        };

        let name = record_name(&input.attrs)?.unwrap_or_else(|| input.ident.unraw().to_string());

        let fields = named
            .named
            .iter()
            .map(|field| {
                let member = field
                    .ident
                    .clone()
                    .ok_or_else(|| syn::Error::new(field.span(), "expected named field"))?;
                let metas = pick_metas(&field.attrs)?;
                Ok(PickField {
                    name: member.unraw().to_string(),
                    member,
                    ty: field.ty.clone(),
                    restricted: matches!(field.vis, Visibility::Inherited),
                    attrs: FieldAttrs::from_metas(metas)?,
                })
            })
            .collect::<syn::Result<Vec<_>>>()?;

        Ok(Self {
            ident: input.ident.clone(),
            name,
            fields,
        })
    }
}

/// Collects the items of every `#[pick(...)]` attribute.
fn pick_metas(attrs: &[Attribute]) -> syn::Result<Vec<Meta>> {
    let mut metas = Vec::new();
    for attr in attrs.iter().filter(|a| a.path().is_ident("pick")) {
        let list = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
        metas.extend(list);
    }
    Ok(metas)
}

/// Reads `#[pick(name = "...")]` on the struct.
fn record_name(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut name = None;
    for meta in pick_metas(attrs)? {
        match meta {
            Meta::NameValue(nv) if nv.path.is_ident("name") => {
                if name.is_some() {
                    return Err(syn::Error::new(nv.path.span(), "duplicate `name`"));
                }
                name = Some(string_value(&nv.value)?);
            }
            other => {
                return Err(syn::Error::new(
                    other.span(),
                    "expected `name = \"...\"` on the struct",
                ))
            }
        }
    }
    Ok(name)
}

fn string_value(expr: &Expr) -> syn::Result<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s.value()),
        _ => Err(syn::Error::new(expr.span(), "expected string literal")),
    }
}

/// Bound literals may be written as strings or as (possibly negated) numbers.
fn literal_value(expr: &Expr) -> syn::Result<String> {
    match expr {
        Expr::Lit(ExprLit { lit, .. }) => match lit {
            Lit::Str(s) => Ok(s.value()),
            Lit::Int(i) => Ok(i.base10_digits().to_owned()),
            Lit::Float(f) => Ok(f.base10_digits().to_owned()),
            _ => Err(syn::Error::new(lit.span(), "expected number")),
        },
        Expr::Unary(ExprUnary {
            op: UnOp::Neg(_),
            expr,
            ..
        }) => match &**expr {
            Expr::Lit(ExprLit {
                lit: Lit::Int(i), ..
            }) => Ok(format!("-{}", i.base10_digits())),
            Expr::Lit(ExprLit {
                lit: Lit::Float(f), ..
            }) => Ok(format!("-{}", f.base10_digits())),
            other => Err(syn::Error::new(other.span(), "expected number")),
        },
        _ => Err(syn::Error::new(expr.span(), "expected number")),
    }
}
