//! Type coercion table.
//!
//! Maps the declared type of a field to a parse-and-assign function. Only
//! primitive kinds have an entry; every other type needs a companion setter
//! or an override registered on the [`Picker`](crate::Picker).

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;
use std::sync::OnceLock;

use num_complex::{Complex, Complex32, Complex64};
use thiserror::Error;

/// Kind of a field's declared type, as seen by the coercion table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// `bool`
    Bool,
    /// `i8`
    I8,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `isize`
    Isize,
    /// `u8`
    U8,
    /// `u16`
    U16,
    /// `u32`
    U32,
    /// `u64`
    U64,
    /// `usize`
    Usize,
    /// `f32`
    F32,
    /// `f64`
    F64,
    /// `Complex<f32>`
    Complex32,
    /// `Complex<f64>`
    Complex64,
    /// `String`
    String,
    /// Any type without an entry in the table.
    Other,
}

impl Kind {
    /// Returns the kind of `V`.
    #[must_use]
    pub fn of<V: Any>() -> Self {
        Self::from_type_id(TypeId::of::<V>())
    }

    pub(crate) fn from_type_id(type_id: TypeId) -> Self {
        lookup(type_id).map_or(Self::Other, Coercion::kind)
    }

    /// Returns true for integer and floating point kinds.
    ///
    /// Complex kinds are not numeric in this sense: they cannot be widened
    /// to a float and therefore cannot carry `minimum`/`maximum` rules.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::I8
                | Self::I16
                | Self::I32
                | Self::I64
                | Self::Isize
                | Self::U8
                | Self::U16
                | Self::U32
                | Self::U64
                | Self::Usize
                | Self::F32
                | Self::F64
        )
    }

    /// Returns the name of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::Isize => "isize",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::Usize => "usize",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Complex32 => "Complex32",
            Self::Complex64 => "Complex64",
            Self::String => "String",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised while coercing a raw value into a field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoerceError {
    /// The raw value is not a valid literal for the kind.
    #[error("parse {kind}: parsing {value:?}: invalid syntax")]
    InvalidSyntax {
        /// Target kind.
        kind: Kind,
        /// Raw value that failed to parse.
        value: String,
    },

    /// The raw value is well formed but does not fit the kind's width.
    #[error("parse {kind}: parsing {value:?}: value out of range")]
    OutOfRange {
        /// Target kind.
        kind: Kind,
        /// Raw value that failed to parse.
        value: String,
    },

    /// The declared type has no coercion rule and no setter capability.
    #[error("set {type_name}: unsupported")]
    Unsupported {
        /// Declared type of the field.
        type_name: &'static str,
    },

    /// The field accessor returned a slot of a different type.
    #[error("set {type_name}: field slot does not hold the declared type")]
    SlotMismatch {
        /// Type the slot was expected to hold.
        type_name: &'static str,
    },
}

impl CoerceError {
    fn invalid_syntax(kind: Kind, value: &str) -> Self {
        Self::InvalidSyntax {
            kind,
            value: value.to_owned(),
        }
    }

    fn out_of_range(kind: Kind, value: &str) -> Self {
        Self::OutOfRange {
            kind,
            value: value.to_owned(),
        }
    }
}

/// An entry of the coercion table.
#[derive(Clone, Copy)]
pub struct Coercion {
    kind: Kind,
    assign: fn(&mut dyn Any, &str) -> Result<(), CoerceError>,
    widen: fn(&dyn Any) -> Option<f64>,
}

impl Coercion {
    /// Returns the kind this entry coerces to.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// Parses `raw` and stores the result in `slot`.
    ///
    /// `slot` is left untouched when parsing fails.
    pub fn assign(&self, slot: &mut dyn Any, raw: &str) -> Result<(), CoerceError> {
        (self.assign)(slot, raw)
    }

    /// Returns the value held by `slot` widened to `f64`, for numeric kinds.
    #[must_use]
    pub fn widen(&self, slot: &dyn Any) -> Option<f64> {
        (self.widen)(slot)
    }
}

impl fmt::Debug for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coercion").field("kind", &self.kind).finish()
    }
}

/// Returns the coercion table entry for a declared type.
#[must_use]
pub fn lookup(type_id: TypeId) -> Option<&'static Coercion> {
    table().get(&type_id)
}

fn table() -> &'static HashMap<TypeId, Coercion> {
    static TABLE: OnceLock<HashMap<TypeId, Coercion>> = OnceLock::new();
    TABLE.get_or_init(|| {
        [
            entry::<bool>(),
            entry::<i8>(),
            entry::<i16>(),
            entry::<i32>(),
            entry::<i64>(),
            entry::<isize>(),
            entry::<u8>(),
            entry::<u16>(),
            entry::<u32>(),
            entry::<u64>(),
            entry::<usize>(),
            entry::<f32>(),
            entry::<f64>(),
            entry::<Complex32>(),
            entry::<Complex64>(),
            entry::<String>(),
        ]
        .into_iter()
        .collect()
    })
}

fn entry<V: Primitive>() -> (TypeId, Coercion) {
    (
        TypeId::of::<V>(),
        Coercion {
            kind: V::KIND,
            assign: assign::<V>,
            widen: widen::<V>,
        },
    )
}

fn assign<V: Primitive>(slot: &mut dyn Any, raw: &str) -> Result<(), CoerceError> {
    let value = V::parse(raw)?;
    let slot = slot
        .downcast_mut::<V>()
        .ok_or(CoerceError::SlotMismatch {
            type_name: type_name::<V>(),
        })?;
    *slot = value;
    Ok(())
}

fn widen<V: Primitive>(slot: &dyn Any) -> Option<f64> {
    slot.downcast_ref::<V>().and_then(Primitive::widen)
}

/// A type with an entry in the coercion table.
trait Primitive: Any + Sized {
    const KIND: Kind;

    fn parse(raw: &str) -> Result<Self, CoerceError>;

    fn widen(&self) -> Option<f64> {
        None
    }
}

impl Primitive for bool {
    const KIND: Kind = Kind::Bool;

    fn parse(raw: &str) -> Result<Self, CoerceError> {
        match raw {
            "1" | "t" | "T" | "TRUE" | "true" | "True" => Ok(true),
            "0" | "f" | "F" | "FALSE" | "false" | "False" => Ok(false),
            _ => Err(CoerceError::invalid_syntax(Self::KIND, raw)),
        }
    }
}

impl Primitive for String {
    const KIND: Kind = Kind::String;

    fn parse(raw: &str) -> Result<Self, CoerceError> {
        Ok(raw.to_owned())
    }
}

macro_rules! integer {
    ($($ty:ty => $kind:ident),* $(,)?) => ($(
        impl Primitive for $ty {
            const KIND: Kind = Kind::$kind;

            fn parse(raw: &str) -> Result<Self, CoerceError> {
                // unsigned kinds take no sign at all
                if <$ty>::MIN == 0 && raw.starts_with('+') {
                    return Err(CoerceError::invalid_syntax(Self::KIND, raw));
                }
                raw.parse::<$ty>().map_err(|err| match err.kind() {
                    IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                        CoerceError::out_of_range(Self::KIND, raw)
                    }
                    _ => CoerceError::invalid_syntax(Self::KIND, raw),
                })
            }

            #[allow(clippy::cast_lossless, clippy::cast_possible_truncation)]
            fn widen(&self) -> Option<f64> {
                Some(*self as f64)
            }
        }
    )*)
}

integer! {
    i8 => I8, i16 => I16, i32 => I32, i64 => I64, isize => Isize,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64, usize => Usize,
}

macro_rules! float {
    ($($ty:ty => $kind:ident),* $(,)?) => ($(
        impl Primitive for $ty {
            const KIND: Kind = Kind::$kind;

            fn parse(raw: &str) -> Result<Self, CoerceError> {
                let value = raw
                    .parse::<$ty>()
                    .map_err(|_| CoerceError::invalid_syntax(Self::KIND, raw))?;
                if value.is_infinite() && !names_infinity(raw) {
                    return Err(CoerceError::out_of_range(Self::KIND, raw));
                }
                Ok(value)
            }

            fn widen(&self) -> Option<f64> {
                Some(f64::from(*self))
            }
        }
    )*)
}

float! { f32 => F32, f64 => F64 }

macro_rules! complex {
    ($($part:ty => $kind:ident),* $(,)?) => ($(
        impl Primitive for Complex<$part> {
            const KIND: Kind = Kind::$kind;

            fn parse(raw: &str) -> Result<Self, CoerceError> {
                let value = Complex::<$part>::from_str(raw)
                    .map_err(|_| CoerceError::invalid_syntax(Self::KIND, raw))?;
                if (value.re.is_infinite() || value.im.is_infinite()) && !names_infinity(raw) {
                    return Err(CoerceError::out_of_range(Self::KIND, raw));
                }
                Ok(value)
            }
        }
    )*)
}

complex! { f32 => Complex32, f64 => Complex64 }

/// True when the literal spells out an infinity rather than overflowing.
fn names_infinity(raw: &str) -> bool {
    raw.to_ascii_lowercase().contains("inf")
}
