//! Physical units for option strings.
//!
//! All lengths are converted to micrometers, the single canonical length unit
//! of the kernel. Angles are kept in degrees; a `rad` suffix is converted.

use serde::{Deserialize, Serialize};

use crate::error::ParameterError;

/// What a parsed number measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    Dimensionless,
    Length,
    Angle,
}

/// A number in canonical units (micrometers for lengths, degrees for angles).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub dimension: Dimension,
}

impl Quantity {
    pub fn new(value: f64, dimension: Dimension) -> Self {
        Self { value, dimension }
    }

    pub fn length(value: f64) -> Self {
        Self::new(value, Dimension::Length)
    }

    pub fn angle(value: f64) -> Self {
        Self::new(value, Dimension::Angle)
    }

    pub fn dimensionless(value: f64) -> Self {
        Self::new(value, Dimension::Dimensionless)
    }
}

/// A recognized unit suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Nanometer,
    Micrometer,
    Millimeter,
    Centimeter,
    Meter,
    Degree,
    Radian,
}

/// The unit every length is stored in after parsing.
pub const CANONICAL_LENGTH_UNIT: Unit = Unit::Micrometer;

impl Unit {
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "nm" => Some(Unit::Nanometer),
            "um" | "µm" | "μm" => Some(Unit::Micrometer),
            "mm" => Some(Unit::Millimeter),
            "cm" => Some(Unit::Centimeter),
            "m" => Some(Unit::Meter),
            "deg" => Some(Unit::Degree),
            "rad" => Some(Unit::Radian),
            _ => None,
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Unit::Nanometer => "nm",
            Unit::Micrometer => "um",
            Unit::Millimeter => "mm",
            Unit::Centimeter => "cm",
            Unit::Meter => "m",
            Unit::Degree => "deg",
            Unit::Radian => "rad",
        }
    }

    pub fn dimension(&self) -> Dimension {
        match self {
            Unit::Degree | Unit::Radian => Dimension::Angle,
            _ => Dimension::Length,
        }
    }

    /// Convert a value expressed in this unit to canonical units.
    pub fn to_canonical(&self, value: f64) -> f64 {
        match self {
            Unit::Nanometer => value / 1e3,
            Unit::Micrometer => value,
            Unit::Millimeter => value * 1e3,
            Unit::Centimeter => value * 1e4,
            Unit::Meter => value * 1e6,
            Unit::Degree => value,
            Unit::Radian => value.to_degrees(),
        }
    }
}

/// True when `raw` starts the way a number does (digit, sign or decimal point).
pub fn looks_numeric(raw: &str) -> bool {
    matches!(
        raw.trim_start().chars().next(),
        Some(c) if c.is_ascii_digit() || c == '+' || c == '-' || c == '.'
    )
}

/// Split `raw` into its leading float literal and the remaining suffix.
fn split_number(raw: &str) -> (&str, &str) {
    let bytes = raw.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    // Exponent only when digits follow, so "1em" is not swallowed.
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    raw.split_at(i)
}

/// Parse `<float><unit>?` into a canonical [`Quantity`].
///
/// `option` only names the value in errors.
pub fn parse_quantity(option: &str, raw: &str) -> Result<Quantity, ParameterError> {
    let trimmed = raw.trim();
    let (number, suffix) = split_number(trimmed);
    let value: f64 = number.parse().map_err(|_| ParameterError::InvalidNumber {
        option: option.to_string(),
        value: raw.to_string(),
    })?;

    let suffix = suffix.trim();
    let quantity = if suffix.is_empty() {
        Quantity::dimensionless(value)
    } else {
        let unit = Unit::from_suffix(suffix).ok_or_else(|| ParameterError::UnknownUnit {
            option: option.to_string(),
            value: raw.to_string(),
            unit: suffix.to_string(),
        })?;
        Quantity::new(unit.to_canonical(value), unit.dimension())
    };

    // Overflow during parsing or conversion.
    if !quantity.value.is_finite() {
        return Err(ParameterError::InvalidNumber {
            option: option.to_string(),
            value: raw.to_string(),
        });
    }
    Ok(quantity)
}

/// Render a quantity back as an option string in canonical units.
pub fn format_canonical(quantity: &Quantity) -> String {
    match quantity.dimension {
        Dimension::Length => format!("{}{}", quantity.value, CANONICAL_LENGTH_UNIT.suffix()),
        Dimension::Angle => format!("{}{}", quantity.value, Unit::Degree.suffix()),
        Dimension::Dimensionless => format!("{}", quantity.value),
    }
}
