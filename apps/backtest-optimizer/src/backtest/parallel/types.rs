//! Parameter values and parameter sets.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// A single strategy tunable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Integer parameter.
    Int(i64),
    /// Floating-point parameter.
    Float(f64),
    /// Boolean parameter.
    Bool(bool),
}

impl ParamValue {
    /// Get as integer. Floats qualify only when they hold a whole number.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Self::Int(v) => Some(v),
            Self::Float(v) if v.is_finite() && v.fract() == 0.0 => Some(v as i64),
            _ => None,
        }
    }

    /// Get as float.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_float(&self) -> Option<f64> {
        match *self {
            Self::Int(v) => Some(v as f64),
            Self::Float(v) => Some(v),
            Self::Bool(_) => None,
        }
    }

    /// Get as boolean.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match *self {
            Self::Bool(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// One concrete assignment of strategy tunables, in declaration order.
///
/// Immutable once built; it identifies exactly one simulation run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterSet {
    entries: Vec<(String, ParamValue)>,
}

impl ParameterSet {
    /// Create a parameter set from ordered `(name, value)` pairs.
    #[must_use]
    pub const fn new(entries: Vec<(String, ParamValue)>) -> Self {
        Self { entries }
    }

    /// Look up a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    /// Numeric parameter as `f64`.
    #[must_use]
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|v| v.as_float())
    }

    /// Non-negative whole-number parameter as `usize`.
    #[must_use]
    pub fn get_usize(&self, name: &str) -> Option<usize> {
        self.get(name)
            .and_then(|v| v.as_int())
            .and_then(|v| usize::try_from(v).ok())
    }

    /// Boolean parameter.
    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(|v| v.as_bool())
    }

    /// Iterate `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ParamValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), *v))
    }

    /// Parameter names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no parameters are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, ParamValue)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, ParamValue)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

impl Serialize for ParameterSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_value_conversions() {
        let int_val = ParamValue::Int(42);
        assert_eq!(int_val.as_int(), Some(42));
        assert_eq!(int_val.as_float(), Some(42.0));
        assert_eq!(int_val.as_bool(), None);

        let float_val = ParamValue::Float(3.5);
        assert_eq!(float_val.as_int(), None);
        assert_eq!(ParamValue::Float(14.0).as_int(), Some(14));
        assert_eq!(float_val.as_float(), Some(3.5));

        let bool_val = ParamValue::Bool(true);
        assert_eq!(bool_val.as_bool(), Some(true));
        assert_eq!(bool_val.as_float(), None);
    }

    #[test]
    fn test_param_value_untagged_yaml() {
        let values: Vec<ParamValue> = serde_yaml_bw::from_str("[5, 2.5, true]").unwrap();
        assert_eq!(
            values,
            vec![
                ParamValue::Int(5),
                ParamValue::Float(2.5),
                ParamValue::Bool(true)
            ]
        );
    }

    #[test]
    fn test_parameter_set_lookup_and_display() {
        let set: ParameterSet = [("x", ParamValue::Int(5)), ("y", ParamValue::Bool(false))]
            .into_iter()
            .collect();

        assert_eq!(set.get("x"), Some(ParamValue::Int(5)));
        assert_eq!(set.get("z"), None);
        assert_eq!(set.get_usize("x"), Some(5));
        assert_eq!(set.get_f64("x"), Some(5.0));
        assert_eq!(set.get_bool("y"), Some(false));
        assert_eq!(set.get_bool("x"), None);
        assert_eq!(set.to_string(), "x=5, y=false");
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["x", "y"]);
    }

    #[test]
    fn test_parameter_set_serializes_in_order() {
        let set: ParameterSet = [("zeta", ParamValue::Int(1)), ("alpha", ParamValue::Float(0.5))]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"{"zeta":1,"alpha":0.5}"#);
    }
}
