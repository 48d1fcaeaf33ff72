//! # Instance Typing and Equality
//!
//! Semantic typing of instance values for the `type` keyword, and the
//! strict (type-and-value) deep equality used by `enum` and `uniqueItems`.

use std::fmt;

use serde_json::{Number, Value};

/// Semantic type of an instance value.
///
/// `NotANumber` and `UnknownNumber` are diagnostic categories for
/// non-finite numerics; they never satisfy a `type` constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceType {
    Array,
    Boolean,
    Integer,
    Number,
    Null,
    Object,
    String,
    NotANumber,
    UnknownNumber,
}

/// The seven primitive type names a schema `type` keyword may use.
pub const PRIMITIVE_TYPES: [&str; 7] = [
    "array", "boolean", "integer", "number", "null", "object", "string",
];

impl InstanceType {
    /// Classify an instance value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Boolean,
            Value::Number(n) => Self::of_number(n),
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Array,
            Value::Object(_) => Self::Object,
        }
    }

    /// Classify a number. Integral floats (e.g. `5.0`) count as integers.
    pub fn of_number(n: &Number) -> Self {
        if n.is_i64() || n.is_u64() {
            return Self::Integer;
        }
        match n.as_f64() {
            Some(f) => Self::of_f64(f),
            None => Self::UnknownNumber,
        }
    }

    /// Classify a raw float.
    pub fn of_f64(f: f64) -> Self {
        if f.is_nan() {
            Self::NotANumber
        } else if !f.is_finite() {
            Self::UnknownNumber
        } else if f.fract() == 0.0 {
            Self::Integer
        } else {
            Self::Number
        }
    }

    /// The type name as used in schemas and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::Array => "array",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Null => "null",
            Self::Object => "object",
            Self::String => "string",
            Self::NotANumber => "not-a-number",
            Self::UnknownNumber => "unknown-number",
        }
    }

    /// Whether an instance of this type satisfies the schema type `expected`.
    /// An integer also satisfies `number`; the reverse does not hold.
    pub fn satisfies(self, expected: &str) -> bool {
        self.name() == expected || (self == Self::Integer && expected == "number")
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric equality across integer and float representations.
pub fn numbers_equal(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Deep type-and-value equality. Object key order is irrelevant.
pub fn strict_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| strict_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| strict_equal(x, y)))
        }
        _ => false,
    }
}

/// True iff no two elements are strictly equal.
pub fn all_unique(items: &[Value]) -> bool {
    for (i, a) in items.iter().enumerate() {
        if items[i + 1..].iter().any(|b| strict_equal(a, b)) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integral_number_is_integer() {
        assert_eq!(InstanceType::of(&json!(5)), InstanceType::Integer);
        assert_eq!(InstanceType::of(&json!(5.0)), InstanceType::Integer);
        assert_eq!(InstanceType::of(&json!(5.5)), InstanceType::Number);
        assert_eq!(InstanceType::of(&json!(-3)), InstanceType::Integer);
    }

    #[test]
    fn test_non_finite_categories() {
        assert_eq!(InstanceType::of_f64(f64::NAN), InstanceType::NotANumber);
        assert_eq!(InstanceType::of_f64(f64::INFINITY), InstanceType::UnknownNumber);
        assert!(!InstanceType::NotANumber.satisfies("number"));
    }

    #[test]
    fn test_integer_satisfies_number_not_reverse() {
        assert!(InstanceType::Integer.satisfies("number"));
        assert!(InstanceType::Integer.satisfies("integer"));
        assert!(!InstanceType::Number.satisfies("integer"));
    }

    #[test]
    fn test_strict_equal_distinguishes_types() {
        assert!(!strict_equal(&json!(1), &json!("1")));
        assert!(!strict_equal(&json!(null), &json!(false)));
        assert!(strict_equal(&json!(1), &json!(1.0)));
    }

    #[test]
    fn test_strict_equal_objects_ignore_key_order() {
        let a = json!({"a": 1, "b": [1, {"c": null}]});
        let b = json!({"b": [1, {"c": null}], "a": 1});
        assert!(strict_equal(&a, &b));
        assert!(!strict_equal(&a, &json!({"a": 1})));
    }

    #[test]
    fn test_all_unique() {
        assert!(all_unique(&[json!(1), json!("1"), json!([1])]));
        assert!(!all_unique(&[json!({"a": 1}), json!(2), json!({"a": 1})]));
        assert!(all_unique(&[]));
    }
}
