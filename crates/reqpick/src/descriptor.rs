//! Record descriptors.
//!
//! A [`Descriptor`] lists the fields of a record in declaration order, each
//! with an accessor, its declared type, its source tag, an optional
//! companion setter and its validation rules. Descriptors are usually
//! generated by `#[derive(Pick)]` but can be built by hand:
//!
//! ```rust
//! use reqpick::{Descriptor, Field};
//!
//! #[derive(Default)]
//! struct Search {
//!     query: String,
//!     limit: u32,
//! }
//!
//! let descriptor = Descriptor::<Search>::builder()
//!     .field(Field::new("query", |s: &mut Search| &mut s.query).query("q").min_length(1))
//!     .field(Field::new("limit", |s: &mut Search| &mut s.limit).query("limit").maximum(100))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(descriptor.name(), "Search");
//! assert_eq!(descriptor.fields().len(), 2);
//! ```

use std::any::{type_name, Any, TypeId};
use std::fmt;

use tracing::trace;

use crate::coerce::{self, Kind};
use crate::error::DescriptorError;
use crate::setter::SetterFn;
use crate::validate::{Rule, RuleKind, ValidationError};
use crate::{Locator, Source};

/// A record that can be picked from a request.
///
/// Usually implemented with `#[derive(Pick)]`.
pub trait Pick: Sized + 'static {
    /// Returns the record's descriptor, built once per type.
    fn descriptor() -> &'static Descriptor<Self>;
}

trait Access<T>: Send + Sync {
    fn get<'a>(&self, target: &'a mut T) -> &'a mut dyn Any;
}

struct FieldAccess<T, V> {
    access: fn(&mut T) -> &mut V,
}

impl<T: 'static, V: Any> Access<T> for FieldAccess<T, V> {
    fn get<'a>(&self, target: &'a mut T) -> &'a mut dyn Any {
        (self.access)(target)
    }
}

/// A field declaration, as handed to [`DescriptorBuilder::field`].
pub struct Field<T> {
    name: &'static str,
    access: Box<dyn Access<T>>,
    type_id: TypeId,
    type_name: &'static str,
    restricted: bool,
    sources: Vec<(Source, String)>,
    setter: Option<SetterFn<T>>,
    bounds: Vec<(RuleKind, String)>,
}

impl<T: 'static> Field<T> {
    /// Declares a field named `name` of type `V`, reached through `access`.
    pub fn new<V: Any>(name: &'static str, access: fn(&mut T) -> &mut V) -> Self {
        Self {
            name,
            access: Box::new(FieldAccess { access }),
            type_id: TypeId::of::<V>(),
            type_name: type_name::<V>(),
            restricted: false,
            sources: Vec::new(),
            setter: None,
            bounds: Vec::new(),
        }
    }

    /// Reads the field from a source.
    pub fn source(mut self, source: Source, key: impl Into<String>) -> Self {
        self.sources.push((source, key.into()));
        self
    }

    /// Reads the field from a path parameter.
    pub fn path(self, key: impl Into<String>) -> Self {
        self.source(Source::Path, key)
    }

    /// Reads the field from the query string.
    pub fn query(self, key: impl Into<String>) -> Self {
        self.source(Source::Query, key)
    }

    /// Reads the field from a header.
    pub fn header(self, key: impl Into<String>) -> Self {
        self.source(Source::Header, key)
    }

    /// Reads the field from a form field, falling back to the query string.
    pub fn form(self, key: impl Into<String>) -> Self {
        self.source(Source::Form, key)
    }

    /// Marks the field as not directly assignable from outside the record.
    ///
    /// A restricted field with a source must have a companion setter.
    pub fn restricted(mut self) -> Self {
        self.restricted = true;
        self
    }

    /// Sets the companion setter, which takes over assignment of the field.
    pub fn setter(mut self, setter: SetterFn<T>) -> Self {
        self.setter = Some(setter);
        self
    }

    /// Requires at least `bound` characters.
    pub fn min_length(self, bound: impl ToString) -> Self {
        self.rule(RuleKind::MinLength, bound)
    }

    /// Allows at most `bound` characters.
    pub fn max_length(self, bound: impl ToString) -> Self {
        self.rule(RuleKind::MaxLength, bound)
    }

    /// Requires the value to be at least `bound`.
    pub fn minimum(self, bound: impl ToString) -> Self {
        self.rule(RuleKind::Minimum, bound)
    }

    /// Requires the value to be at most `bound`.
    pub fn maximum(self, bound: impl ToString) -> Self {
        self.rule(RuleKind::Maximum, bound)
    }

    /// Adds a validation rule with its bound as text.
    pub fn rule(mut self, kind: RuleKind, bound: impl ToString) -> Self {
        self.bounds.push((kind, bound.to_string()));
        self
    }
}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("restricted", &self.restricted)
            .field("sources", &self.sources)
            .field("setter", &self.setter.is_some())
            .field("bounds", &self.bounds)
            .finish()
    }
}

/// A validated field of a [`Descriptor`].
pub struct FieldDescriptor<T> {
    name: &'static str,
    dest: String,
    access: Box<dyn Access<T>>,
    type_id: TypeId,
    type_name: &'static str,
    kind: Kind,
    restricted: bool,
    source: Option<(Source, String)>,
    setter: Option<SetterFn<T>>,
    rules: Vec<Rule>,
}

impl<T> FieldDescriptor<T> {
    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `Record.field`, as used in error messages.
    #[must_use]
    pub fn dest(&self) -> &str {
        &self.dest
    }

    /// Returns the declared type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the [`TypeId`] of the declared type.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the kind of the declared type.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Returns true for restricted fields.
    #[must_use]
    pub fn is_restricted(&self) -> bool {
        self.restricted
    }

    /// Returns the source and key, or `None` for untagged fields.
    #[must_use]
    pub fn source(&self) -> Option<(Source, &str)> {
        self.source.as_ref().map(|(source, key)| (*source, key.as_str()))
    }

    /// Returns the locator for error messages, or `None` for untagged fields.
    #[must_use]
    pub fn locator(&self) -> Option<Locator> {
        self.source().map(|(source, key)| Locator::field(source, key))
    }

    /// Returns the companion setter.
    #[must_use]
    pub fn setter(&self) -> Option<SetterFn<T>> {
        self.setter
    }

    /// Returns the validation rules, in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns the field's storage within `target`.
    pub fn slot<'a>(&self, target: &'a mut T) -> &'a mut dyn Any {
        self.access.get(target)
    }

    /// Runs the validation rules against the assigned field.
    pub fn check(&self, target: &mut T, raw: &str) -> Result<(), ValidationError> {
        if self.rules.is_empty() {
            return Ok(());
        }
        let value = coerce::lookup(self.type_id).and_then(|entry| entry.widen(self.slot(target)));
        self.rules.iter().try_for_each(|rule| rule.check(raw, value))
    }
}

impl<T> fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("kind", &self.kind)
            .field("restricted", &self.restricted)
            .field("source", &self.source)
            .field("setter", &self.setter.is_some())
            .field("rules", &self.rules)
            .finish()
    }
}

/// The fields of a record, in declaration order.
pub struct Descriptor<T> {
    name: String,
    fields: Vec<FieldDescriptor<T>>,
}

impl<T: 'static> Descriptor<T> {
    /// Creates a builder for a descriptor of `T`.
    #[must_use]
    pub fn builder() -> DescriptorBuilder<T> {
        DescriptorBuilder::new()
    }
}

impl<T> Descriptor<T> {
    /// Returns the record name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }

    /// Returns a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor<T>> {
        self.fields.iter().find(|field| field.name == name)
    }
}

impl<T> fmt::Debug for Descriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Builder for a [`Descriptor`].
pub struct DescriptorBuilder<T> {
    name: String,
    fields: Vec<Field<T>>,
}

impl<T: 'static> DescriptorBuilder<T> {
    /// Creates a builder named after the type `T`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: short_type_name(type_name::<T>()).to_owned(),
            fields: Vec::new(),
        }
    }

    /// Sets the record name used in error messages.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Appends a field.
    pub fn field(mut self, field: Field<T>) -> Self {
        self.fields.push(field);
        self
    }

    /// Validates the declarations and builds the descriptor.
    pub fn build(self) -> Result<Descriptor<T>, DescriptorError> {
        let mut fields: Vec<FieldDescriptor<T>> = Vec::with_capacity(self.fields.len());
        for field in self.fields {
            let dest = format!("{}.{}", self.name, field.name);
            if fields.iter().any(|f| f.name == field.name) {
                return Err(DescriptorError::DuplicateField { dest });
            }
            let built = build_field(field, dest)?;
            trace!(
                field = %built.dest,
                type_name = built.type_name,
                source = ?built.source,
                rules = built.rules.len(),
                "field declared"
            );
            fields.push(built);
        }
        Ok(Descriptor {
            name: self.name,
            fields,
        })
    }
}

impl<T: 'static> Default for DescriptorBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for DescriptorBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorBuilder")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish()
    }
}

fn build_field<T>(field: Field<T>, dest: String) -> Result<FieldDescriptor<T>, DescriptorError> {
    let Field {
        name,
        access,
        type_id,
        type_name,
        restricted,
        mut sources,
        setter,
        bounds,
    } = field;

    if sources.len() > 1 {
        let sources = sources
            .iter()
            .map(|(source, _)| source.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(DescriptorError::MultipleSources { dest, sources });
    }
    let source = sources.pop();

    if source.is_none() && !bounds.is_empty() {
        return Err(DescriptorError::RulesWithoutSource { dest });
    }
    if source.is_some() && restricted && setter.is_none() {
        return Err(DescriptorError::MissingSetter {
            dest,
            setter: format!("set_{}", name.trim_start_matches("r#")),
        });
    }

    let kind = Kind::from_type_id(type_id);
    let mut rules: Vec<Rule> = Vec::with_capacity(bounds.len());
    for (rule, literal) in bounds {
        if rules.iter().any(|r| r.kind() == rule) {
            return Err(DescriptorError::DuplicateRule { dest, rule });
        }
        if !rule.applies_to(kind) {
            return Err(DescriptorError::RuleNotApplicable {
                dest,
                rule,
                type_name,
                kind,
            });
        }
        match Rule::parse(rule, &literal) {
            Some(parsed) => rules.push(parsed),
            None => {
                return Err(DescriptorError::MalformedBound {
                    dest,
                    rule,
                    literal,
                })
            }
        }
    }
    rules.sort_by_key(Rule::kind);

    Ok(FieldDescriptor {
        name,
        dest,
        access,
        type_id,
        type_name,
        kind,
        restricted,
        source,
        setter,
        rules,
    })
}

/// `my_crate::api::Person<u8>` becomes `Person`.
fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
