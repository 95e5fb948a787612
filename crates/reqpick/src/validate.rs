//! Validation rules.
//!
//! Rules run after a field has been assigned. Length rules count the
//! characters of the raw text; range rules compare the assigned value,
//! widened to `f64`. All bounds are inclusive.

use std::fmt;

use thiserror::Error;

use crate::coerce::Kind;

/// The kind of a validation rule, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleKind {
    /// Minimum number of characters.
    MinLength,
    /// Maximum number of characters.
    MaxLength,
    /// Inclusive lower bound.
    Minimum,
    /// Inclusive upper bound.
    Maximum,
}

impl RuleKind {
    /// Returns the tag name of the rule.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MinLength => "minLength",
            Self::MaxLength => "maxLength",
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
        }
    }

    /// Returns true when the rule can be checked against a field of `kind`.
    #[must_use]
    pub fn applies_to(self, kind: Kind) -> bool {
        match self {
            Self::MinLength | Self::MaxLength => kind == Kind::String,
            Self::Minimum | Self::Maximum => kind.is_numeric(),
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validation rule with its parsed bound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    /// Raw text must have at least this many characters.
    MinLength(usize),
    /// Raw text must have at most this many characters.
    MaxLength(usize),
    /// Value must be greater than or equal to the bound.
    Minimum(f64),
    /// Value must be less than or equal to the bound.
    Maximum(f64),
}

impl Rule {
    /// Parses a bound literal for the given rule kind.
    ///
    /// Length bounds must be non-negative integers; range bounds must be
    /// finite decimal numbers. Returns `None` for anything else.
    #[must_use]
    pub fn parse(kind: RuleKind, literal: &str) -> Option<Self> {
        match kind {
            RuleKind::MinLength => literal.parse().ok().map(Self::MinLength),
            RuleKind::MaxLength => literal.parse().ok().map(Self::MaxLength),
            RuleKind::Minimum => parse_finite(literal).map(Self::Minimum),
            RuleKind::Maximum => parse_finite(literal).map(Self::Maximum),
        }
    }

    /// Returns the kind of this rule.
    #[must_use]
    pub fn kind(&self) -> RuleKind {
        match self {
            Self::MinLength(_) => RuleKind::MinLength,
            Self::MaxLength(_) => RuleKind::MaxLength,
            Self::Minimum(_) => RuleKind::Minimum,
            Self::Maximum(_) => RuleKind::Maximum,
        }
    }

    /// Checks the rule.
    ///
    /// `raw` is the text the field was assigned from, `value` the assigned
    /// value widened to `f64` when the field is numeric.
    pub fn check(&self, raw: &str, value: Option<f64>) -> Result<(), ValidationError> {
        match *self {
            Self::MinLength(min) => {
                let actual = raw.chars().count();
                if actual < min {
                    return Err(ValidationError::MinLength { min, actual });
                }
            }
            Self::MaxLength(max) => {
                let actual = raw.chars().count();
                if actual > max {
                    return Err(ValidationError::MaxLength { max, actual });
                }
            }
            Self::Minimum(bound) => {
                if let Some(actual) = value.filter(|v| *v < bound) {
                    return Err(ValidationError::Minimum { bound, actual });
                }
            }
            Self::Maximum(bound) => {
                if let Some(actual) = value.filter(|v| *v > bound) {
                    return Err(ValidationError::Maximum { bound, actual });
                }
            }
        }
        Ok(())
    }
}

fn parse_finite(literal: &str) -> Option<f64> {
    literal.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A violated validation rule.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Fewer characters than `minLength`.
    #[error("minLength exceeded")]
    MinLength {
        /// The bound.
        min: usize,
        /// Characters in the raw value.
        actual: usize,
    },
    /// More characters than `maxLength`.
    #[error("maxLength exceeded")]
    MaxLength {
        /// The bound.
        max: usize,
        /// Characters in the raw value.
        actual: usize,
    },
    /// Value below `minimum`.
    #[error("minimum exceeded")]
    Minimum {
        /// The bound.
        bound: f64,
        /// The assigned value.
        actual: f64,
    },
    /// Value above `maximum`.
    #[error("maximum exceeded")]
    Maximum {
        /// The bound.
        bound: f64,
        /// The assigned value.
        actual: f64,
    },
}

impl ValidationError {
    /// Returns the kind of the violated rule.
    #[must_use]
    pub fn rule(&self) -> RuleKind {
        match self {
            Self::MinLength { .. } => RuleKind::MinLength,
            Self::MaxLength { .. } => RuleKind::MaxLength,
            Self::Minimum { .. } => RuleKind::Minimum,
            Self::Maximum { .. } => RuleKind::Maximum,
        }
    }
}
