//! # Error Types
//!
//! Two tiers of failure exist in jsref:
//!
//! - **Recoverable** errors are [`ErrorKind`] entries recorded in a
//!   [`Report`](crate::Report). They never abort a compile or validate
//!   run; every independent branch is still attempted.
//! - **Fatal** conditions are [`SchemaError`] values returned through
//!   `Result`. They signal that a resolution-graph invariant was violated
//!   and no meaningful report can be produced.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Hard limit on reference hops, shared by the validate-time `$ref`
/// chain walk and the compile-time nesting of remote documents.
pub const MAX_REFERENCE_HOPS: usize = 99;

/// Fatal, unrecoverable engine error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A `$ref` chain followed at validate time exceeded the hop limit.
    /// This means a cycle escaped compile-time detection.
    #[error("reference chain starting at '{reference}' exceeded {limit} hops (circular $ref)")]
    ReferenceChainExceeded {
        /// The `$ref` value where the chain started.
        reference: String,
        /// The hop limit that was exceeded.
        limit: usize,
    },

    /// Remote documents nested deeper than the hop limit during compilation.
    #[error("compilation of '{uri}' nested more than {limit} remote documents")]
    CompileDepthExceeded {
        /// The remote document whose compilation overflowed.
        uri: String,
        /// The depth limit that was exceeded.
        limit: usize,
    },

    /// Validation re-entered a schema for the same instance value while
    /// that check was still running, through composition keywords or
    /// schema-form dependencies.
    #[error("schema at '{path}' re-entered itself for the same instance (recursive composition)")]
    RecursiveSchema {
        /// Instance path at which the cycle was detected.
        path: String,
    },
}

/// Closed catalog of recoverable error kinds.
///
/// Serialized as the SCREAMING_SNAKE_CASE code (e.g. `"INVALID_TYPE"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    InvalidType,
    InvalidFormat,
    EnumMismatch,
    AnyOfMissing,
    OneOfMissing,
    OneOfMultiple,
    NotPassed,

    ArrayLengthShort,
    ArrayLengthLong,
    ArrayUnique,
    ArrayAdditionalItems,

    MultipleOf,
    Minimum,
    MinimumExclusive,
    Maximum,
    MaximumExclusive,

    ObjectPropertiesMinimum,
    ObjectPropertiesMaximum,
    ObjectMissingRequiredProperty,
    ObjectAdditionalProperties,
    ObjectDependencyKey,

    MinLength,
    MaxLength,
    Pattern,

    KeywordTypeExpected,
    KeywordUndefinedStrict,
    KeywordUnexpected,
    KeywordMustBe,
    KeywordDependency,
    KeywordPattern,
    KeywordValueType,
    UnknownFormat,

    RefUnresolved,
    UnresolvableReference,
    SchemaNotReachable,
    SchemaTypeExpected,
    SchemaNotAnObject,
    ParentSchemaValidationFailed,
    RemoteNotValid,
}

impl ErrorKind {
    /// The stable error code, identical to the serialized form.
    pub fn code(self) -> &'static str {
        match self {
            Self::InvalidType => "INVALID_TYPE",
            Self::InvalidFormat => "INVALID_FORMAT",
            Self::EnumMismatch => "ENUM_MISMATCH",
            Self::AnyOfMissing => "ANY_OF_MISSING",
            Self::OneOfMissing => "ONE_OF_MISSING",
            Self::OneOfMultiple => "ONE_OF_MULTIPLE",
            Self::NotPassed => "NOT_PASSED",
            Self::ArrayLengthShort => "ARRAY_LENGTH_SHORT",
            Self::ArrayLengthLong => "ARRAY_LENGTH_LONG",
            Self::ArrayUnique => "ARRAY_UNIQUE",
            Self::ArrayAdditionalItems => "ARRAY_ADDITIONAL_ITEMS",
            Self::MultipleOf => "MULTIPLE_OF",
            Self::Minimum => "MINIMUM",
            Self::MinimumExclusive => "MINIMUM_EXCLUSIVE",
            Self::Maximum => "MAXIMUM",
            Self::MaximumExclusive => "MAXIMUM_EXCLUSIVE",
            Self::ObjectPropertiesMinimum => "OBJECT_PROPERTIES_MINIMUM",
            Self::ObjectPropertiesMaximum => "OBJECT_PROPERTIES_MAXIMUM",
            Self::ObjectMissingRequiredProperty => "OBJECT_MISSING_REQUIRED_PROPERTY",
            Self::ObjectAdditionalProperties => "OBJECT_ADDITIONAL_PROPERTIES",
            Self::ObjectDependencyKey => "OBJECT_DEPENDENCY_KEY",
            Self::MinLength => "MIN_LENGTH",
            Self::MaxLength => "MAX_LENGTH",
            Self::Pattern => "PATTERN",
            Self::KeywordTypeExpected => "KEYWORD_TYPE_EXPECTED",
            Self::KeywordUndefinedStrict => "KEYWORD_UNDEFINED_STRICT",
            Self::KeywordUnexpected => "KEYWORD_UNEXPECTED",
            Self::KeywordMustBe => "KEYWORD_MUST_BE",
            Self::KeywordDependency => "KEYWORD_DEPENDENCY",
            Self::KeywordPattern => "KEYWORD_PATTERN",
            Self::KeywordValueType => "KEYWORD_VALUE_TYPE",
            Self::UnknownFormat => "UNKNOWN_FORMAT",
            Self::RefUnresolved => "REF_UNRESOLVED",
            Self::UnresolvableReference => "UNRESOLVABLE_REFERENCE",
            Self::SchemaNotReachable => "SCHEMA_NOT_REACHABLE",
            Self::SchemaTypeExpected => "SCHEMA_TYPE_EXPECTED",
            Self::SchemaNotAnObject => "SCHEMA_NOT_AN_OBJECT",
            Self::ParentSchemaValidationFailed => "PARENT_SCHEMA_VALIDATION_FAILED",
            Self::RemoteNotValid => "REMOTE_NOT_VALID",
        }
    }

    /// Message template. `{0}`, `{1}` are replaced by positional parameters.
    pub fn template(self) -> &'static str {
        match self {
            Self::InvalidType => "Expected type {0} but found type {1}",
            Self::InvalidFormat => "Object didn't pass validation for format {0}: {1}",
            Self::EnumMismatch => "No enum match for: {0}",
            Self::AnyOfMissing => "Data does not match any schemas from 'anyOf'",
            Self::OneOfMissing => "Data does not match any schemas from 'oneOf'",
            Self::OneOfMultiple => "Data is valid against more than one schema from 'oneOf'",
            Self::NotPassed => "Data matches schema from 'not'",
            Self::ArrayLengthShort => "Array is too short ({0}), minimum {1}",
            Self::ArrayLengthLong => "Array is too long ({0}), maximum {1}",
            Self::ArrayUnique => "Array items are not unique (duplicates {0})",
            Self::ArrayAdditionalItems => "Additional items not allowed",
            Self::MultipleOf => "Value {0} is not a multiple of {1}",
            Self::Minimum => "Value {0} is less than minimum {1}",
            Self::MinimumExclusive => "Value {0} is equal or less than exclusive minimum {1}",
            Self::Maximum => "Value {0} is greater than maximum {1}",
            Self::MaximumExclusive => "Value {0} is equal or greater than exclusive maximum {1}",
            Self::ObjectPropertiesMinimum => "Too few properties defined ({0}), minimum {1}",
            Self::ObjectPropertiesMaximum => "Too many properties defined ({0}), maximum {1}",
            Self::ObjectMissingRequiredProperty => "Missing required property: {0}",
            Self::ObjectAdditionalProperties => "Additional properties not allowed: {0}",
            Self::ObjectDependencyKey => "Dependency failed - key must exist: {0} (due to key: {1})",
            Self::MinLength => "String is too short ({0} chars), minimum {1}",
            Self::MaxLength => "String is too long ({0} chars), maximum {1}",
            Self::Pattern => "String does not match pattern {0}: {1}",
            Self::KeywordTypeExpected => "Keyword '{0}' is expected to be of type '{1}'",
            Self::KeywordUndefinedStrict => "Keyword '{0}' must be defined in strict mode",
            Self::KeywordUnexpected => "Keyword '{0}' is not expected to appear in the schema",
            Self::KeywordMustBe => "Keyword '{0}' must be {1}",
            Self::KeywordDependency => "Keyword '{0}' requires keyword '{1}'",
            Self::KeywordPattern => "Keyword '{0}' is not a valid RegExp pattern: {1}",
            Self::KeywordValueType => "Each element of keyword '{0}' array must be a '{1}'",
            Self::UnknownFormat => "There is no validation function for format '{0}'",
            Self::RefUnresolved => "Reference has not been resolved during compilation: {0}",
            Self::UnresolvableReference => "Reference could not be resolved: {0}",
            Self::SchemaNotReachable => "Validator was not able to read schema with uri: {0}",
            Self::SchemaTypeExpected => "Schema is expected to be of type 'object'",
            Self::SchemaNotAnObject => "Schema is not an object: {0}",
            Self::ParentSchemaValidationFailed => {
                "Schema failed to validate against its parent schema, see inner errors for details."
            }
            Self::RemoteNotValid => "Remote reference didn't compile successfully: {0}",
        }
    }

    /// Render the message for this kind with the given parameters.
    ///
    /// String parameters are inserted verbatim; every other value uses its
    /// compact JSON form. Placeholders without a parameter are left empty.
    pub fn format(self, params: &[Value]) -> String {
        let template = self.template();
        let mut out = String::with_capacity(template.len() + 16);
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}').and_then(|close| {
                after[..close].parse::<usize>().ok().map(|index| (index, close))
            }) {
                Some((index, close)) => {
                    if let Some(param) = params.get(index) {
                        out.push_str(&display_param(param));
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

fn display_param(param: &Value) -> String {
    match param {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_positional_params() {
        let msg = ErrorKind::InvalidType.format(&[json!("integer"), json!("string")]);
        assert_eq!(msg, "Expected type integer but found type string");
    }

    #[test]
    fn test_format_numeric_params_use_json_form() {
        let msg = ErrorKind::ArrayLengthShort.format(&[json!(1), json!(2)]);
        assert_eq!(msg, "Array is too short (1), minimum 2");
    }

    #[test]
    fn test_format_missing_param_left_empty() {
        let msg = ErrorKind::UnresolvableReference.format(&[]);
        assert_eq!(msg, "Reference could not be resolved: ");
    }

    #[test]
    fn test_code_matches_serde() {
        for kind in [
            ErrorKind::ObjectAdditionalProperties,
            ErrorKind::RefUnresolved,
            ErrorKind::ParentSchemaValidationFailed,
        ] {
            let serialized = serde_json::to_value(kind).unwrap();
            assert_eq!(serialized, json!(kind.code()));
        }
    }

    #[test]
    fn test_fatal_error_display() {
        let err = SchemaError::ReferenceChainExceeded {
            reference: "#/a".into(),
            limit: MAX_REFERENCE_HOPS,
        };
        assert!(err.to_string().contains("99 hops"));
    }

    #[test]
    fn test_recursive_schema_display() {
        let err = SchemaError::RecursiveSchema { path: "#/a".into() };
        assert!(err.to_string().contains("'#/a'"));
    }
}
