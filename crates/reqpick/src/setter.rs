//! Setters.
//!
//! A companion setter is a method on the record that assigns one field from
//! its raw text. A setter override is registered on the
//! [`Picker`](crate::Picker) for a whole type and applies to every field
//! declared with that type.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::BoxError;

/// Result adapter for companion setter methods.
///
/// Setters may return `()` when they cannot fail, or any `Result` whose
/// error converts into a [`BoxError`].
pub trait SetterOutput {
    /// Converts the setter's return value.
    fn into_setter_result(self) -> Result<(), BoxError>;
}

impl SetterOutput for () {
    fn into_setter_result(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<R, E> SetterOutput for Result<R, E>
where
    E: Into<BoxError>,
{
    fn into_setter_result(self) -> Result<(), BoxError> {
        self.map(|_| ()).map_err(Into::into)
    }
}

/// A companion setter: assigns one field of `T` from raw text.
pub type SetterFn<T> = fn(&mut T, &str) -> Result<(), BoxError>;

type OverrideFn = Box<dyn Fn(&mut dyn Any, &str) -> Result<(), BoxError> + Send + Sync>;

/// Setter overrides keyed by the fully qualified name of the field type.
#[derive(Default)]
pub(crate) struct SetterRegistry {
    overrides: HashMap<&'static str, OverrideFn>,
}

impl SetterRegistry {
    /// Registers `setter` for fields of type `V`.
    ///
    /// # Panics
    ///
    /// Panics if an override for `V` is already registered.
    pub(crate) fn insert<V, F>(&mut self, setter: F)
    where
        V: Any,
        F: Fn(&mut V, &str) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        let name = type_name::<V>();
        assert!(
            !self.overrides.contains_key(name),
            "use_setter({name:?}): already exists"
        );
        let erased: OverrideFn = Box::new(move |slot: &mut dyn Any, raw: &str| {
            let slot = slot
                .downcast_mut::<V>()
                .ok_or_else(|| format!("set {name}: field slot does not hold the declared type"))?;
            setter(slot, raw)
        });
        self.overrides.insert(name, erased);
    }

    /// Registers the type's [`FromStr`] implementation as its override.
    pub(crate) fn insert_from_str<V>(&mut self)
    where
        V: FromStr + Any,
        V::Err: Into<BoxError>,
    {
        self.insert::<V, _>(|slot, raw| {
            *slot = raw.parse::<V>().map_err(Into::<BoxError>::into)?;
            Ok(())
        });
    }

    pub(crate) fn get(&self, type_name: &str) -> Option<&OverrideFn> {
        self.overrides.get(type_name)
    }

    pub(crate) fn contains(&self, type_name: &str) -> bool {
        self.overrides.contains_key(type_name)
    }
}

impl fmt::Debug for SetterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.overrides.keys().collect();
        names.sort();
        f.debug_struct("SetterRegistry")
            .field("overrides", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Celsius(f64);

    impl FromStr for Celsius {
        type Err = std::num::ParseFloatError;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            s.trim_end_matches('C').parse().map(Celsius)
        }
    }

    #[test]
    fn test_setter_output() {
        assert!(().into_setter_result().is_ok());
        assert!(Ok::<u8, String>(1).into_setter_result().is_ok());
        let err = Err::<(), _>("bad token").into_setter_result().unwrap_err();
        assert_eq!(err.to_string(), "bad token");
    }

    #[test]
    fn test_override_assigns() {
        let mut registry = SetterRegistry::default();
        registry.insert::<Celsius, _>(|slot, raw| {
            slot.0 = raw.parse::<f64>()? * 2.0;
            Ok(())
        });

        let mut value = Celsius::default();
        let setter = registry.get(type_name::<Celsius>()).unwrap();
        setter(&mut value, "2.5").unwrap();
        assert_eq!(value, Celsius(5.0));
        assert!(setter(&mut value, "warm").is_err());
    }

    #[test]
    fn test_from_str_override() {
        let mut registry = SetterRegistry::default();
        registry.insert_from_str::<Celsius>();
        assert!(registry.contains(type_name::<Celsius>()));

        let mut value = Celsius::default();
        (registry.get(type_name::<Celsius>()).unwrap())(&mut value, "21.5C").unwrap();
        assert_eq!(value, Celsius(21.5));
    }

    #[test]
    fn test_override_slot_mismatch() {
        let mut registry = SetterRegistry::default();
        registry.insert_from_str::<Celsius>();
        let mut wrong = 0u8;
        let err = (registry.get(type_name::<Celsius>()).unwrap())(&mut wrong, "1").unwrap_err();
        assert!(err.to_string().contains("does not hold the declared type"));
    }

    #[test]
    #[should_panic(expected = "already exists")]
    fn test_duplicate_override_panics() {
        let mut registry = SetterRegistry::default();
        registry.insert_from_str::<Celsius>();
        registry.insert_from_str::<Celsius>();
    }
}
