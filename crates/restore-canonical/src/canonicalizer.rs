use serde_json::Value;
use std::fmt;
use std::fmt::Write as _;

use crate::value::{CanonicalNumber, CanonicalValue};

/// Identifier of the canonical text encoding emitted by [`Canonicalizer`].
pub const CANONICAL_PROFILE_ID: &str = "restore-canonical-json.v1";

/// Error returned when canonicalization fails.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CanonicalizationError {
    /// The input contains something outside the canonical value model.
    #[error("unsupported value at {path}: {reason}")]
    UnsupportedValue {
        /// Location of the offending value.
        path: ValuePath,
        /// What was wrong with it.
        reason: String,
    },
    /// A number could not be rendered in canonical form.
    #[error("number rendering failed at {path}: {reason}")]
    NumberFormat {
        /// Location of the offending number.
        path: ValuePath,
        /// Renderer message.
        reason: String,
    },
    /// Canonical text could not be parsed back as JSON.
    #[error("canonical text is not valid JSON: {0}")]
    InvalidText(String),
}

impl CanonicalizationError {
    /// Unsupported value at the root; enclosing converters add their
    /// segment with [`within`](Self::within).
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::UnsupportedValue {
            path: ValuePath::root(),
            reason: reason.into(),
        }
    }

    /// Re-roots the error location under an enclosing field or index.
    pub fn within(self, segment: impl Into<PathSegment>) -> Self {
        let segment = segment.into();
        match self {
            Self::UnsupportedValue { path, reason } => Self::UnsupportedValue {
                path: path.under(segment),
                reason,
            },
            Self::NumberFormat { path, reason } => Self::NumberFormat {
                path: path.under(segment),
                reason,
            },
            other => other,
        }
    }
}

/// One step into a canonical value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object member.
    Field(String),
    /// Array element.
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(field: &str) -> Self {
        Self::Field(field.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(field) => f.write_str(field),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Location inside a canonical value, e.g. `rows.[3].size_bytes`.
///
/// Walkers extend it downwards with [`child`](Self::child); errors raised
/// deep inside a conversion are re-rooted upwards with
/// [`under`](Self::under).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValuePath(Vec<PathSegment>);

impl ValuePath {
    /// The root location.
    pub fn root() -> Self {
        Self::default()
    }

    /// Path one step below `self`.
    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// `self` re-rooted beneath `parent`.
    pub fn under(mut self, parent: impl Into<PathSegment>) -> Self {
        self.0.insert(0, parent.into());
        self
    }
}

impl fmt::Display for ValuePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("root");
        }
        for (idx, segment) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// Result of canonicalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalizationResult {
    /// Canonical text.
    pub text: String,
    /// Profile that produced the text.
    pub profile_id: &'static str,
}

impl CanonicalizationResult {
    /// Canonical UTF-8 bytes, the exact input to hashing.
    pub fn bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }
}

/// Canonicalizer that emits deterministic text.
///
/// Output has no insignificant whitespace, object keys in byte-wise order,
/// arrays in input order, strings escaped as JSON, integers in plain decimal
/// and non-integral floats in ECMAScript shortest form.
#[derive(Debug, Clone, Copy)]
pub struct Canonicalizer {
    profile: &'static str,
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Canonicalizer {
    /// Creates a canonicalizer for the current profile.
    pub fn new() -> Self {
        Self {
            profile: CANONICAL_PROFILE_ID,
        }
    }

    /// Produces canonical text for a canonical value.
    pub fn canonicalize(
        &self,
        value: &CanonicalValue,
    ) -> Result<CanonicalizationResult, CanonicalizationError> {
        let mut text = String::new();
        self.write_value(value, &ValuePath::root(), &mut text)?;
        Ok(CanonicalizationResult {
            text,
            profile_id: self.profile,
        })
    }

    /// Converts arbitrary JSON into the model, then canonicalizes it.
    pub fn canonicalize_json(
        &self,
        value: &Value,
    ) -> Result<CanonicalizationResult, CanonicalizationError> {
        let value = CanonicalValue::try_from(value)?;
        self.canonicalize(&value)
    }

    /// Parses `text` and reports whether it is already in canonical form.
    pub fn is_canonical_text(&self, text: &str) -> Result<bool, CanonicalizationError> {
        let parsed: Value = serde_json::from_str(text)
            .map_err(|err| CanonicalizationError::InvalidText(err.to_string()))?;
        let result = self.canonicalize_json(&parsed)?;
        Ok(result.text == text)
    }

    fn write_value(
        &self,
        value: &CanonicalValue,
        path: &ValuePath,
        out: &mut String,
    ) -> Result<(), CanonicalizationError> {
        match value {
            CanonicalValue::Null => out.push_str("null"),
            CanonicalValue::Bool(true) => out.push_str("true"),
            CanonicalValue::Bool(false) => out.push_str("false"),
            CanonicalValue::Number(num) => write_number(*num, path, out)?,
            CanonicalValue::String(s) => write_string(s, path, out)?,
            CanonicalValue::Array(items) => {
                out.push('[');
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        out.push(',');
                    }
                    self.write_value(item, &path.child(idx), out)?;
                }
                out.push(']');
            }
            CanonicalValue::Object(map) => {
                // BTreeMap<String, _> iterates in byte-wise key order.
                out.push('{');
                for (idx, (key, child)) in map.iter().enumerate() {
                    if idx > 0 {
                        out.push(',');
                    }
                    let child_path = path.child(key.as_str());
                    write_string(key, &child_path, out)?;
                    out.push(':');
                    self.write_value(child, &child_path, out)?;
                }
                out.push('}');
            }
        }
        Ok(())
    }
}

fn write_number(
    num: CanonicalNumber,
    path: &ValuePath,
    out: &mut String,
) -> Result<(), CanonicalizationError> {
    match num {
        CanonicalNumber::Int(i) => {
            let _ = write!(out, "{}", i);
        }
        CanonicalNumber::Float(f) => {
            let number = serde_json::Number::from_f64(f).ok_or_else(|| {
                CanonicalizationError::UnsupportedValue {
                    path: path.clone(),
                    reason: format!("non-finite number {f}"),
                }
            })?;
            // RFC 8785 number serialization (ECMAScript Number::toString).
            let rendered = canonical_json::to_string(&Value::Number(number)).map_err(|err| {
                CanonicalizationError::NumberFormat {
                    path: path.clone(),
                    reason: err.to_string(),
                }
            })?;
            out.push_str(&rendered);
        }
    }
    Ok(())
}

fn write_string(s: &str, path: &ValuePath, out: &mut String) -> Result<(), CanonicalizationError> {
    let escaped =
        serde_json::to_string(s).map_err(|err| CanonicalizationError::UnsupportedValue {
            path: path.clone(),
            reason: err.to_string(),
        })?;
    out.push_str(&escaped);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CanonicalObject;
    use serde_json::json;

    #[test]
    fn nested_keys_are_sorted_and_arrays_kept() {
        let value = json!({"z": {"b": 2, "a": 1}, "a": [3, 1, 2], "m": null});
        let result = Canonicalizer::new().canonicalize_json(&value).unwrap();
        assert_eq!(result.text, r#"{"a":[3,1,2],"m":null,"z":{"a":1,"b":2}}"#);
    }

    #[test]
    fn absent_keys_are_omitted() {
        let value = CanonicalObject::new()
            .insert("a", CanonicalValue::uint(1).unwrap())
            .insert_opt("b", None::<CanonicalValue>)
            .insert("c", "x")
            .build();
        let result = Canonicalizer::new().canonicalize(&value).unwrap();
        assert_eq!(result.text, r#"{"a":1,"c":"x"}"#);
    }

    #[test]
    fn keys_sort_by_bytes_not_locale() {
        let value = json!({"b": 1, "B": 2, "a": 3, "é": 4, "Z": 5});
        let result = Canonicalizer::new().canonicalize_json(&value).unwrap();
        assert_eq!(result.text, r#"{"B":2,"Z":5,"a":3,"b":1,"é":4}"#);
    }

    #[test]
    fn strings_are_json_escaped() {
        let value = json!({"s": "line\n\"quoted\"\u{0001}"});
        let result = Canonicalizer::new().canonicalize_json(&value).unwrap();
        assert_eq!(result.text, r#"{"s":"line\n\"quoted\"\u0001"}"#);
    }

    #[test]
    fn float_one_renders_as_integer() {
        let value = json!({"x": 1.0, "y": 1});
        let result = Canonicalizer::new().canonicalize_json(&value).unwrap();
        assert_eq!(result.text, r#"{"x":1,"y":1}"#);
    }

    #[test]
    fn canonical_text_detection() {
        let canonicalizer = Canonicalizer::new();
        assert!(canonicalizer.is_canonical_text(r#"{"a":1,"b":[2]}"#).unwrap());
        assert!(!canonicalizer.is_canonical_text(r#"{"b":[2],"a":1}"#).unwrap());
        assert!(!canonicalizer.is_canonical_text(r#"{"a": 1}"#).unwrap());
        assert!(canonicalizer.is_canonical_text("{not json").is_err());
    }

    #[test]
    fn paths_render_the_same_built_down_or_up() {
        let down = ValuePath::root().child("rows").child(3).child("size_bytes");
        let up = ValuePath::root().under("size_bytes").under(3).under("rows");
        assert_eq!(down, up);
        assert_eq!(down.to_string(), "rows.[3].size_bytes");
        assert_eq!(ValuePath::root().to_string(), "root");
    }
}
