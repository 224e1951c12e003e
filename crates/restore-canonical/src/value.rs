//! Canonical value model.
//!
//! Every structure that is hashed or compared across services is first
//! converted into a [`CanonicalValue`]. The conversion is explicit (see
//! [`ToCanonical`]) so hashing never depends on how an upstream type happens
//! to be laid out in memory.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::canonicalizer::CanonicalizationError;

/// Largest integer magnitude every consumer can represent exactly (`2^53 - 1`).
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// A number admitted into the canonical model.
///
/// Integers are restricted to the interoperable range `±(2^53 - 1)`; floats
/// must be finite, and floats with an exact integral value in that range are
/// stored as [`CanonicalNumber::Int`] so `1` and `1.0` render identically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanonicalNumber {
    /// Integer in the safe range.
    Int(i64),
    /// Finite, non-integral binary float.
    Float(f64),
}

impl CanonicalNumber {
    /// Admits an integer.
    pub fn int(value: i64) -> Result<Self, CanonicalizationError> {
        if !(-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&value) {
            return Err(CanonicalizationError::unsupported(format!(
                "integer {value} is outside the safe range"
            )));
        }
        Ok(Self::Int(value))
    }

    /// Admits an unsigned integer.
    pub fn uint(value: u64) -> Result<Self, CanonicalizationError> {
        let signed = i64::try_from(value).map_err(|_| {
            CanonicalizationError::unsupported(format!("integer {value} is outside the safe range"))
        })?;
        Self::int(signed)
    }

    /// Admits a float, collapsing exact integers.
    pub fn float(value: f64) -> Result<Self, CanonicalizationError> {
        if !value.is_finite() {
            return Err(CanonicalizationError::unsupported(format!(
                "non-finite number {value}"
            )));
        }
        if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER as f64 {
            // -0.0 collapses to 0 here, matching ECMAScript rendering.
            return Ok(Self::Int(value as i64));
        }
        Ok(Self::Float(value))
    }
}

/// Recursive canonical value.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalValue {
    /// Explicit JSON `null`. Distinct from an absent field.
    Null,
    /// Boolean.
    Bool(bool),
    /// Number restricted per [`CanonicalNumber`].
    Number(CanonicalNumber),
    /// UTF-8 string.
    String(String),
    /// Ordered array; order is significant and never changed.
    Array(Vec<CanonicalValue>),
    /// Object whose entries iterate in byte-wise key order.
    Object(BTreeMap<String, CanonicalValue>),
}

impl CanonicalValue {
    /// Shorthand for a string value.
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Shorthand for a `u64` value.
    pub fn uint(value: u64) -> Result<Self, CanonicalizationError> {
        CanonicalNumber::uint(value).map(Self::Number)
    }

    /// Shorthand for an `i64` value.
    pub fn int(value: i64) -> Result<Self, CanonicalizationError> {
        CanonicalNumber::int(value).map(Self::Number)
    }

    /// Converts each element and wraps them in an array.
    pub fn array<T: ToCanonical>(items: &[T]) -> Result<Self, CanonicalizationError> {
        items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                item.to_canonical()
                    .map_err(|err| err.within(idx))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self::Array)
    }

    /// Returns the object map if this is an object.
    pub fn as_object(&self) -> Option<&BTreeMap<String, CanonicalValue>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }
}

impl From<bool> for CanonicalValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for CanonicalValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for CanonicalValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<CanonicalObject> for CanonicalValue {
    fn from(value: CanonicalObject) -> Self {
        Self::Object(value.entries)
    }
}

/// Builder for canonical objects that keeps absence and `null` apart.
///
/// `insert_opt(key, None)` leaves the key out entirely; an explicit
/// `CanonicalValue::Null` is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalObject {
    entries: BTreeMap<String, CanonicalValue>,
}

impl CanonicalObject {
    /// Creates an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a present value.
    pub fn insert(mut self, key: &str, value: impl Into<CanonicalValue>) -> Self {
        self.entries.insert(key.to_string(), value.into());
        self
    }

    /// Inserts the value only when it is present.
    pub fn insert_opt(mut self, key: &str, value: Option<impl Into<CanonicalValue>>) -> Self {
        if let Some(value) = value {
            self.entries.insert(key.to_string(), value.into());
        }
        self
    }

    /// Converts a nested structure and inserts it, tagging errors with `key`.
    pub fn insert_with<T: ToCanonical + ?Sized>(
        self,
        key: &str,
        value: &T,
    ) -> Result<Self, CanonicalizationError> {
        let converted = value.to_canonical().map_err(|err| err.within(key))?;
        Ok(self.insert(key, converted))
    }

    /// Like [`insert_with`](Self::insert_with) for optional nested structures.
    pub fn insert_opt_with<T: ToCanonical>(
        self,
        key: &str,
        value: Option<&T>,
    ) -> Result<Self, CanonicalizationError> {
        match value {
            Some(value) => self.insert_with(key, value),
            None => Ok(self),
        }
    }

    /// Finishes the object.
    pub fn build(self) -> CanonicalValue {
        CanonicalValue::Object(self.entries)
    }
}

/// Explicit conversion into the canonical model.
pub trait ToCanonical {
    /// Produces the canonical value, failing on anything outside the model.
    fn to_canonical(&self) -> Result<CanonicalValue, CanonicalizationError>;
}

impl ToCanonical for CanonicalValue {
    fn to_canonical(&self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(self.clone())
    }
}

impl ToCanonical for str {
    fn to_canonical(&self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalValue::string(self))
    }
}

impl ToCanonical for String {
    fn to_canonical(&self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalValue::string(self.as_str()))
    }
}

impl ToCanonical for u64 {
    fn to_canonical(&self) -> Result<CanonicalValue, CanonicalizationError> {
        CanonicalValue::uint(*self)
    }
}

impl ToCanonical for i64 {
    fn to_canonical(&self) -> Result<CanonicalValue, CanonicalizationError> {
        CanonicalValue::int(*self)
    }
}

impl ToCanonical for bool {
    fn to_canonical(&self) -> Result<CanonicalValue, CanonicalizationError> {
        Ok(CanonicalValue::Bool(*self))
    }
}

impl<T: ToCanonical> ToCanonical for Vec<T> {
    fn to_canonical(&self) -> Result<CanonicalValue, CanonicalizationError> {
        CanonicalValue::array(self)
    }
}

impl ToCanonical for Value {
    fn to_canonical(&self) -> Result<CanonicalValue, CanonicalizationError> {
        CanonicalValue::try_from(self)
    }
}

impl TryFrom<&Value> for CanonicalValue {
    type Error = CanonicalizationError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::Number(num) => {
                let number = if let Some(i) = num.as_i64() {
                    CanonicalNumber::int(i)?
                } else if let Some(u) = num.as_u64() {
                    CanonicalNumber::uint(u)?
                } else {
                    let f = num.as_f64().ok_or_else(|| {
                        CanonicalizationError::unsupported(format!("unrepresentable number {num}"))
                    })?;
                    CanonicalNumber::float(f)?
                };
                Ok(Self::Number(number))
            }
            Value::String(s) => Ok(Self::String(s.clone())),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(idx, item)| {
                    Self::try_from(item).map_err(|err| err.within(idx))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Array),
            Value::Object(map) => {
                let mut entries = BTreeMap::new();
                for (key, child) in map {
                    let converted = Self::try_from(child).map_err(|err| err.within(key.as_str()))?;
                    entries.insert(key.clone(), converted);
                }
                Ok(Self::Object(entries))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_is_dropped_but_null_is_kept() {
        let value = CanonicalObject::new()
            .insert("a", CanonicalValue::Null)
            .insert_opt("b", None::<String>)
            .insert_opt("c", Some("x"))
            .build();
        let map = value.as_object().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a"), Some(&CanonicalValue::Null));
        assert!(!map.contains_key("b"));
    }

    #[test]
    fn integral_floats_collapse_to_int() {
        assert_eq!(CanonicalNumber::float(1.0).unwrap(), CanonicalNumber::Int(1));
        assert_eq!(CanonicalNumber::float(-0.0).unwrap(), CanonicalNumber::Int(0));
        assert_eq!(
            CanonicalNumber::float(0.5).unwrap(),
            CanonicalNumber::Float(0.5)
        );
    }

    #[test]
    fn unsafe_integers_are_rejected() {
        assert!(CanonicalNumber::int(MAX_SAFE_INTEGER).is_ok());
        assert!(CanonicalNumber::int(MAX_SAFE_INTEGER + 1).is_err());
        assert!(CanonicalNumber::uint(u64::MAX).is_err());
        assert!(CanonicalNumber::float(f64::NAN).is_err());
        assert!(CanonicalNumber::float(f64::INFINITY).is_err());
    }

    #[test]
    fn conversion_error_reports_path() {
        let value = json!({"rows": [{"size": 1}, {"size": u64::MAX}]});
        let err = CanonicalValue::try_from(&value).unwrap_err();
        assert!(err.to_string().contains("rows.[1].size"), "{err}");
    }
}
