//! # Meta-Schema Validation
//!
//! Checks that a schema is itself well formed: each recognized keyword is
//! tested against a fixed rule list, sub-schemas are checked recursively,
//! and a schema declaring `$schema` is validated as an instance of that
//! parent schema.
//!
//! A schema that passes is memoized and not re-checked.

use regex::Regex;
use serde_json::json;

use jsref_core::instance::all_unique;
use jsref_core::{ErrorKind, InstanceType, Report, SchemaError, PRIMITIVE_TYPES};

use crate::arena::{NodeId, SchemaNode};
use crate::context::{RefKeyword, SchemaContext};
use crate::engine::InstanceValidator;
use crate::keyword::Keyword;

/// A single well-formedness rule for a keyword value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    String,
    Number,
    Integer,
    Boolean,
    GreaterThanZero,
    NonNegative,
    /// The sibling keyword must be present.
    Requires(&'static str),
    ValidRegex,
    SchemaOrBoolean,
    Items,
    SchemaMap,
    PatternSchemaMap,
    StringSet,
    Dependencies,
    EnumValues,
    Type,
    SchemaArray,
    Schema,
}

fn rules(keyword: Keyword) -> &'static [Rule] {
    use Keyword as K;
    match keyword {
        K::Ref | K::Schema | K::Id | K::Title | K::Description | K::Format => &[Rule::String],
        K::MultipleOf => &[Rule::Number, Rule::GreaterThanZero],
        K::Maximum | K::Minimum => &[Rule::Number],
        K::ExclusiveMaximum => &[Rule::Boolean, Rule::Requires("maximum")],
        K::ExclusiveMinimum => &[Rule::Boolean, Rule::Requires("minimum")],
        K::MaxLength
        | K::MinLength
        | K::MaxItems
        | K::MinItems
        | K::MaxProperties
        | K::MinProperties => &[Rule::Integer, Rule::NonNegative],
        K::Pattern => &[Rule::String, Rule::ValidRegex],
        K::AdditionalItems | K::AdditionalProperties => &[Rule::SchemaOrBoolean],
        K::Items => &[Rule::Items],
        K::UniqueItems => &[Rule::Boolean],
        K::Properties | K::Definitions => &[Rule::SchemaMap],
        K::PatternProperties => &[Rule::PatternSchemaMap],
        K::Required => &[Rule::StringSet],
        K::Dependencies => &[Rule::Dependencies],
        K::Enum => &[Rule::EnumValues],
        K::Type => &[Rule::Type],
        K::AllOf | K::AnyOf | K::OneOf => &[Rule::SchemaArray],
        K::Not => &[Rule::Schema],
        K::Default => &[],
    }
}

/// Meta-validate `schema`, or every member when it is an array.
pub fn validate_schema(
    ctx: &mut SchemaContext,
    report: &mut Report,
    schema: NodeId,
) -> Result<bool, SchemaError> {
    if let Some(members) = ctx.arena.items(schema) {
        let members = members.to_vec();
        let before = report.error_count();
        for (index, member) in members.into_iter().enumerate() {
            report.with_segment(index, |r| validate_schema(ctx, r, member))?;
        }
        return Ok(report.error_count() == before);
    }

    if ctx.annotations.is_meta_validated(schema) {
        return Ok(true);
    }
    if !ctx.arena.is_object(schema) {
        report.add_error(ErrorKind::SchemaTypeExpected, vec![]);
        return Ok(false);
    }

    let before = report.error_count();
    check_parent_schema(ctx, report, schema)?;

    let entries: Vec<(Keyword, NodeId)> = ctx
        .arena
        .entries(schema)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|(name, &value)| Keyword::from_name(name).map(|k| (k, value)))
                .collect()
        })
        .unwrap_or_default();

    for (keyword, value) in entries {
        report.with_segment(keyword.name(), |r| {
            for &rule in rules(keyword) {
                apply_rule(ctx, r, schema, keyword, value, rule)?;
            }
            Ok::<(), SchemaError>(())
        })?;
    }

    let valid = report.error_count() == before;
    if valid {
        ctx.annotations.mark_meta_validated(schema);
    }
    Ok(valid)
}

/// Validate a schema that declares `$schema` against that parent.
fn check_parent_schema(
    ctx: &SchemaContext,
    report: &mut Report,
    schema: NodeId,
) -> Result<(), SchemaError> {
    let Some(parent_uri) = ctx.arena.get_str(schema, "$schema") else {
        return Ok(());
    };
    // A meta-schema naming itself.
    if ctx.arena.id_of(schema) == Some(parent_uri) {
        return Ok(());
    }

    match ctx.annotations.target(schema, RefKeyword::Schema) {
        Some(parent) if parent == schema => {}
        Some(parent) => {
            let instance = ctx.arena.to_value(schema);
            let mut sub = report.child();
            let valid = InstanceValidator::new(ctx).validate(&mut sub, parent, &instance)?;
            if !valid {
                report.add_nested_error(
                    ErrorKind::ParentSchemaValidationFailed,
                    vec![],
                    [sub],
                    None,
                );
            }
        }
        None if ctx.options.ignore_unresolvable_references => {}
        None => report.add_error(ErrorKind::RefUnresolved, vec![json!(parent_uri)]),
    }
    Ok(())
}

fn apply_rule(
    ctx: &mut SchemaContext,
    report: &mut Report,
    schema: NodeId,
    keyword: Keyword,
    value: NodeId,
    rule: Rule,
) -> Result<(), SchemaError> {
    let name = keyword.name();
    let arena = &ctx.arena;
    let type_expected = |report: &mut Report, expected: &str| {
        report.add_error(ErrorKind::KeywordTypeExpected, vec![json!(name), json!(expected)]);
    };

    match rule {
        Rule::String => {
            if arena.str_of(value).is_none() {
                type_expected(report, "string");
            }
        }
        Rule::Number => {
            if arena.number_of(value).is_none() {
                type_expected(report, "number");
            }
        }
        Rule::Integer => {
            let integral = arena
                .number_of(value)
                .is_some_and(|n| InstanceType::of_number(n) == InstanceType::Integer);
            if !integral {
                type_expected(report, "integer");
            }
        }
        Rule::Boolean => {
            if arena.bool_of(value).is_none() {
                type_expected(report, "boolean");
            }
        }
        Rule::GreaterThanZero => {
            if arena.f64_of(value).is_some_and(|n| n <= 0.0) {
                report.add_error(
                    ErrorKind::KeywordMustBe,
                    vec![json!(name), json!("strictly greater than 0")],
                );
            }
        }
        Rule::NonNegative => {
            if arena.f64_of(value).is_some_and(|n| n < 0.0) {
                report.add_error(
                    ErrorKind::KeywordMustBe,
                    vec![json!(name), json!("greater than, or equal to 0")],
                );
            }
        }
        Rule::Requires(sibling) => {
            if !arena.has(schema, sibling) {
                report.add_error(ErrorKind::KeywordDependency, vec![json!(name), json!(sibling)]);
            }
        }
        Rule::ValidRegex => {
            if let Some(pattern) = arena.str_of(value) {
                check_regex(report, name, pattern);
            }
        }
        Rule::SchemaOrBoolean => match arena.node(value) {
            SchemaNode::Bool(_) => {}
            SchemaNode::Object(_) => validate_schema(ctx, report, value).map(drop)?,
            _ => type_expected(report, "boolean or object"),
        },
        Rule::Items => match arena.node(value) {
            SchemaNode::Object(_) => validate_schema(ctx, report, value).map(drop)?,
            SchemaNode::Array(items) => {
                let items = items.clone();
                validate_schema_list(ctx, report, name, &items)?;
            }
            _ => type_expected(report, "array or object"),
        },
        Rule::SchemaMap | Rule::PatternSchemaMap => {
            let Some(entries) = arena.entries(value) else {
                type_expected(report, "object");
                return Ok(());
            };
            let entries: Vec<(String, NodeId)> =
                entries.iter().map(|(k, &v)| (k.clone(), v)).collect();
            for (key, member) in entries {
                if rule == Rule::PatternSchemaMap {
                    check_regex(report, name, &key);
                }
                if ctx.arena.is_object(member) {
                    report.with_segment(key, |r| validate_schema(ctx, r, member))?;
                } else {
                    report.add_error(ErrorKind::KeywordValueType, vec![json!(name), json!("object")]);
                }
            }
        }
        Rule::StringSet => check_string_set(report, ctx, name, value),
        Rule::Dependencies => {
            let Some(entries) = arena.entries(value) else {
                type_expected(report, "object");
                return Ok(());
            };
            let entries: Vec<(String, NodeId)> =
                entries.iter().map(|(k, &v)| (k.clone(), v)).collect();
            for (key, dependency) in entries {
                match ctx.arena.node(dependency) {
                    SchemaNode::Object(_) => {
                        report.with_segment(key, |r| validate_schema(ctx, r, dependency))?;
                    }
                    SchemaNode::Array(_) => check_string_set(report, ctx, name, dependency),
                    _ => report.add_error(
                        ErrorKind::KeywordValueType,
                        vec![json!(name), json!("object or array")],
                    ),
                }
            }
        }
        Rule::EnumValues => {
            let Some(items) = arena.items(value) else {
                type_expected(report, "array");
                return Ok(());
            };
            if items.is_empty() {
                report.add_error(
                    ErrorKind::KeywordMustBe,
                    vec![json!(name), json!("an array with at least one element")],
                );
            }
            let values: Vec<_> = items.iter().map(|&n| arena.to_value(n)).collect();
            if !all_unique(&values) {
                report.add_error(
                    ErrorKind::KeywordMustBe,
                    vec![json!(name), json!("an array with unique elements")],
                );
            }
        }
        Rule::Type => check_type_keyword(report, ctx, name, value),
        Rule::SchemaArray => {
            let Some(items) = arena.items(value) else {
                type_expected(report, "array");
                return Ok(());
            };
            if items.is_empty() {
                report.add_error(
                    ErrorKind::KeywordMustBe,
                    vec![json!(name), json!("an array with at least one element")],
                );
            }
            let items = items.to_vec();
            validate_schema_list(ctx, report, name, &items)?;
        }
        Rule::Schema => {
            if arena.is_object(value) {
                validate_schema(ctx, report, value)?;
            } else {
                type_expected(report, "object");
            }
        }
    }
    Ok(())
}

/// Each element must be an object schema; objects are checked recursively.
fn validate_schema_list(
    ctx: &mut SchemaContext,
    report: &mut Report,
    name: &str,
    items: &[NodeId],
) -> Result<(), SchemaError> {
    for (index, &item) in items.iter().enumerate() {
        if ctx.arena.is_object(item) {
            report.with_segment(index, |r| validate_schema(ctx, r, item))?;
        } else {
            report.add_error(ErrorKind::KeywordValueType, vec![json!(name), json!("object")]);
        }
    }
    Ok(())
}

/// A non-empty array of unique strings.
fn check_string_set(report: &mut Report, ctx: &SchemaContext, name: &str, value: NodeId) {
    let arena = &ctx.arena;
    let Some(items) = arena.items(value) else {
        report.add_error(ErrorKind::KeywordTypeExpected, vec![json!(name), json!("array")]);
        return;
    };
    if items.is_empty() {
        report.add_error(
            ErrorKind::KeywordMustBe,
            vec![json!(name), json!("an array with at least one element")],
        );
    }
    if items.iter().any(|&n| arena.str_of(n).is_none()) {
        report.add_error(ErrorKind::KeywordValueType, vec![json!(name), json!("string")]);
    }
    let values: Vec<_> = items.iter().map(|&n| arena.to_value(n)).collect();
    if !all_unique(&values) {
        report.add_error(
            ErrorKind::KeywordMustBe,
            vec![json!(name), json!("an array with unique items")],
        );
    }
}

fn check_type_keyword(report: &mut Report, ctx: &SchemaContext, name: &str, value: NodeId) {
    let arena = &ctx.arena;
    let primitives = PRIMITIVE_TYPES.join(",");
    match arena.node(value) {
        SchemaNode::String(type_name) => {
            if !PRIMITIVE_TYPES.contains(&type_name.as_str()) {
                report.add_error(ErrorKind::KeywordTypeExpected, vec![json!(name), json!(primitives)]);
            }
        }
        SchemaNode::Array(items) => {
            let names: Vec<Option<&str>> = items.iter().map(|&n| arena.str_of(n)).collect();
            if names
                .iter()
                .any(|n| !n.is_some_and(|n| PRIMITIVE_TYPES.contains(&n)))
            {
                report.add_error(ErrorKind::KeywordValueType, vec![json!(name), json!(primitives)]);
            }
            let values: Vec<_> = items.iter().map(|&n| arena.to_value(n)).collect();
            if !all_unique(&values) {
                report.add_error(
                    ErrorKind::KeywordMustBe,
                    vec![json!(name), json!("an array with unique items")],
                );
            }
        }
        _ => report.add_error(
            ErrorKind::KeywordTypeExpected,
            vec![json!(name), json!("string or array")],
        ),
    }
}

fn check_regex(report: &mut Report, name: &str, pattern: &str) {
    if let Err(e) = Regex::new(pattern) {
        tracing::debug!(pattern, error = %e, "invalid pattern in schema");
        report.add_error(ErrorKind::KeywordPattern, vec![json!(name), json!(pattern)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler;
    use jsref_core::Options;
    use serde_json::Value;

    fn meta_check(schema: Value) -> Report {
        let mut ctx = SchemaContext::new(Options::default());
        let root = ctx.arena.import(&schema);
        let mut report = Report::new(Options::default());
        compiler::compile(&mut ctx, &mut report, root).unwrap();
        validate_schema(&mut ctx, &mut report, root).unwrap();
        report
    }

    fn kinds(report: &Report) -> Vec<ErrorKind> {
        report.errors().iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_well_formed_schema_passes() {
        let report = meta_check(json!({
            "type": ["object", "null"],
            "properties": {"a": {"type": "string", "maxLength": 3}},
            "patternProperties": {"^x-": {}},
            "required": ["a"],
            "dependencies": {"a": ["b"], "b": {"minProperties": 1}},
            "enum": [{"a": "x"}, null],
            "anyOf": [{"minProperties": 0}],
            "not": {"required": ["z"]},
            "exclusiveMinimum": true,
            "minimum": 1
        }));
        assert!(report.is_valid(), "{:?}", report.errors());
    }

    #[test]
    fn test_negative_length_rejected() {
        let report = meta_check(json!({"minLength": -1}));
        assert_eq!(kinds(&report), [ErrorKind::KeywordMustBe]);
        assert_eq!(report.errors()[0].path.to_string(), "#/minLength");
    }

    #[test]
    fn test_fractional_count_rejected() {
        assert_eq!(kinds(&meta_check(json!({"maxItems": 1.5}))), [ErrorKind::KeywordTypeExpected]);
        assert!(meta_check(json!({"maxItems": 2.0})).is_valid());
    }

    #[test]
    fn test_exclusive_bound_requires_bound() {
        let report = meta_check(json!({"exclusiveMaximum": true}));
        assert_eq!(kinds(&report), [ErrorKind::KeywordDependency]);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert_eq!(kinds(&meta_check(json!({"pattern": "(unclosed"}))), [ErrorKind::KeywordPattern]);
        assert_eq!(
            kinds(&meta_check(json!({"patternProperties": {"[z-a]": {}}}))),
            [ErrorKind::KeywordPattern]
        );
    }

    #[test]
    fn test_required_must_be_unique_strings() {
        let report = meta_check(json!({"required": ["a", "a", 3]}));
        assert_eq!(kinds(&report), [ErrorKind::KeywordValueType, ErrorKind::KeywordMustBe]);
        assert_eq!(kinds(&meta_check(json!({"required": []}))), [ErrorKind::KeywordMustBe]);
    }

    #[test]
    fn test_unknown_type_name_rejected() {
        assert_eq!(kinds(&meta_check(json!({"type": "float"}))), [ErrorKind::KeywordTypeExpected]);
        assert_eq!(
            kinds(&meta_check(json!({"type": ["string", "float"]}))),
            [ErrorKind::KeywordValueType]
        );
    }

    #[test]
    fn test_nested_schema_errors_have_paths() {
        let report = meta_check(json!({"properties": {"a": {"items": [{"minimum": "zero"}]}}}));
        assert_eq!(kinds(&report), [ErrorKind::KeywordTypeExpected]);
        assert_eq!(report.errors()[0].path.to_string(), "#/properties/a/items/0/minimum");
    }

    #[test]
    fn test_composition_needs_members() {
        assert_eq!(kinds(&meta_check(json!({"allOf": []}))), [ErrorKind::KeywordMustBe]);
        assert_eq!(kinds(&meta_check(json!({"oneOf": [1]}))), [ErrorKind::KeywordValueType]);
    }

    #[test]
    fn test_unresolved_parent_schema() {
        let mut ctx = SchemaContext::new(Options::default());
        let root = ctx.arena.import(&json!({"$schema": "http://x.org/meta#"}));
        let mut report = Report::new(Options::default());
        validate_schema(&mut ctx, &mut report, root).unwrap();
        assert_eq!(kinds(&report), [ErrorKind::RefUnresolved]);
    }

    #[test]
    fn test_parent_schema_is_applied() {
        let mut ctx = SchemaContext::new(Options::default());
        ctx.register_document(
            "http://x.org/meta",
            &json!({"id": "http://x.org/meta#", "required": ["title"]}),
        );
        let root = ctx.arena.import(&json!({"$schema": "http://x.org/meta#", "type": "string"}));
        let mut report = Report::new(Options::default());
        assert!(compiler::compile(&mut ctx, &mut report, root).unwrap());
        assert!(!validate_schema(&mut ctx, &mut report, root).unwrap());
        let error = &report.errors()[0];
        assert_eq!(error.kind, ErrorKind::ParentSchemaValidationFailed);
        assert_eq!(error.inner[0].kind, ErrorKind::ObjectMissingRequiredProperty);
    }

    #[test]
    fn test_passing_schema_is_memoized() {
        let mut ctx = SchemaContext::new(Options::default());
        let root = ctx.arena.import(&json!({"type": "string"}));
        let mut report = Report::new(Options::default());
        assert!(validate_schema(&mut ctx, &mut report, root).unwrap());
        assert!(ctx.annotations.is_meta_validated(root));
    }
}
