//! Component options: default templates, overrides and the parsed view.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ParameterError;
use crate::units::{self, Dimension, Quantity};

/// Raw option strings keyed by option name, in declaration order.
pub type Options = IndexMap<String, String>;

/// The default options declared by a component type.
///
/// A template is built fresh from a static table every time it is requested,
/// so every component instance owns its copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionTemplate {
    entries: Options,
}

impl OptionTemplate {
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            entries: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy the defaults and apply `overrides` on top.
    ///
    /// Every override key must already exist in the template.
    pub fn merged(&self, overrides: Option<&Options>) -> Result<Options, ParameterError> {
        let mut options = self.entries.clone();
        if let Some(overrides) = overrides {
            for (key, value) in overrides {
                match options.get_mut(key) {
                    Some(slot) => *slot = value.clone(),
                    None => return Err(ParameterError::UnknownOption(key.clone())),
                }
            }
        }
        Ok(options)
    }
}

/// A single resolved option value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Quantity(Quantity),
    Bool(bool),
    Text(String),
}

impl ParamValue {
    fn describe(&self) -> String {
        match self {
            ParamValue::Quantity(q) => match q.dimension {
                Dimension::Length => format!("length {}", units::format_canonical(q)),
                Dimension::Angle => format!("angle {}", units::format_canonical(q)),
                Dimension::Dimensionless => format!("number {}", q.value),
            },
            ParamValue::Bool(b) => format!("boolean {b}"),
            ParamValue::Text(s) => format!("text '{s}'"),
        }
    }
}

/// Read-only typed view over resolved options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedParameters {
    values: IndexMap<String, ParamValue>,
}

impl ParsedParameters {
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.values.get(key)
    }

    pub fn value(&self, key: &str) -> Result<&ParamValue, ParameterError> {
        self.values
            .get(key)
            .ok_or_else(|| ParameterError::Missing(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn quantity(&self, key: &str, expected: &'static str) -> Result<Quantity, ParameterError> {
        match self.value(key)? {
            ParamValue::Quantity(q) => Ok(*q),
            other => Err(wrong_type(key, expected, other)),
        }
    }

    /// Any numeric value, whatever its dimension.
    pub fn number(&self, key: &str) -> Result<f64, ParameterError> {
        Ok(self.quantity(key, "a number")?.value)
    }

    /// A length in micrometers. Bare numbers are taken as micrometers.
    pub fn length(&self, key: &str) -> Result<f64, ParameterError> {
        let q = self.quantity(key, "a length")?;
        match q.dimension {
            Dimension::Length | Dimension::Dimensionless => Ok(q.value),
            Dimension::Angle => Err(wrong_type(key, "a length", &ParamValue::Quantity(q))),
        }
    }

    /// An angle in degrees. Bare numbers are taken as degrees.
    pub fn angle(&self, key: &str) -> Result<f64, ParameterError> {
        let q = self.quantity(key, "an angle")?;
        match q.dimension {
            Dimension::Angle | Dimension::Dimensionless => Ok(q.value),
            Dimension::Length => Err(wrong_type(key, "an angle", &ParamValue::Quantity(q))),
        }
    }

    /// A non-negative whole number, such as a layer index.
    pub fn unsigned(&self, key: &str) -> Result<u32, ParameterError> {
        let q = self.quantity(key, "a whole number")?;
        let v = q.value;
        if q.dimension != Dimension::Dimensionless
            || v.fract() != 0.0
            || v < 0.0
            || v > u32::MAX as f64
        {
            return Err(wrong_type(key, "a whole number", &ParamValue::Quantity(q)));
        }
        Ok(v as u32)
    }

    pub fn flag(&self, key: &str) -> Result<bool, ParameterError> {
        match self.value(key)? {
            ParamValue::Bool(b) => Ok(*b),
            other => Err(wrong_type(key, "True or False", other)),
        }
    }

    pub fn text(&self, key: &str) -> Result<&str, ParameterError> {
        match self.value(key)? {
            ParamValue::Text(s) => Ok(s),
            other => Err(wrong_type(key, "text", other)),
        }
    }
}

fn wrong_type(key: &str, expected: &'static str, found: &ParamValue) -> ParameterError {
    ParameterError::WrongType {
        option: key.to_string(),
        expected,
        found: found.describe(),
    }
}

/// Resolve one raw option string.
///
/// `True`/`False` become booleans, numeric-looking strings become quantities,
/// names of design variables are substituted, anything else stays text.
pub fn parse_value(
    option: &str,
    raw: &str,
    variables: Option<&Options>,
) -> Result<ParamValue, ParameterError> {
    let mut chain = Vec::new();
    resolve_value(option, raw, variables, &mut chain)
}

fn resolve_value(
    option: &str,
    raw: &str,
    variables: Option<&Options>,
    chain: &mut Vec<String>,
) -> Result<ParamValue, ParameterError> {
    let trimmed = raw.trim();
    match trimmed {
        "True" | "true" => return Ok(ParamValue::Bool(true)),
        "False" | "false" => return Ok(ParamValue::Bool(false)),
        _ => {}
    }

    if units::looks_numeric(trimmed) {
        return units::parse_quantity(option, trimmed).map(ParamValue::Quantity);
    }

    if let Some(target) = variables.and_then(|vars| vars.get(trimmed)) {
        if chain.iter().any(|seen| seen == trimmed) {
            chain.push(trimmed.to_string());
            return Err(ParameterError::CircularVariable {
                option: option.to_string(),
                chain: chain.clone(),
            });
        }
        chain.push(trimmed.to_string());
        return resolve_value(option, target, variables, chain);
    }

    Ok(ParamValue::Text(trimmed.to_string()))
}

/// Parse an already merged option set.
pub fn resolve(
    options: &Options,
    variables: Option<&Options>,
) -> Result<ParsedParameters, ParameterError> {
    let mut values = IndexMap::with_capacity(options.len());
    for (key, raw) in options {
        values.insert(key.clone(), parse_value(key, raw, variables)?);
    }
    Ok(ParsedParameters { values })
}

/// Merge `overrides` onto `template` and parse the result.
pub fn parse_options(
    template: &OptionTemplate,
    overrides: Option<&Options>,
    variables: Option<&Options>,
) -> Result<ParsedParameters, ParameterError> {
    let merged = template.merged(overrides)?;
    resolve(&merged, variables)
}
