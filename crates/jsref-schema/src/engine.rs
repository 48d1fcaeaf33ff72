//! # Instance Validation Engine
//!
//! Validates a JSON instance against a compiled schema node. Every
//! independent constraint is checked and recorded; the engine never stops
//! at the first failure except inside `allOf`, which stops at the first
//! failing member.
//!
//! Order of checks for one schema:
//!
//! 1. Non-object schemas are reported as `SCHEMA_NOT_AN_OBJECT`.
//! 2. The empty schema accepts everything.
//! 3. `$ref` chains are followed through compile-time annotations.
//! 4. `type` is checked.
//! 5. The remaining keywords run in the schema's own key order.
//! 6. Array items and object properties are validated recursively.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use serde_json::{json, Map, Number, Value};

use jsref_core::instance::all_unique;
use jsref_core::{ErrorKind, InstanceType, Report, SchemaError, MAX_REFERENCE_HOPS};

use crate::arena::{NodeId, SchemaArena, SchemaNode};
use crate::context::{RefKeyword, SchemaContext};
use crate::keyword::Keyword;

/// Relative tolerance for non-integer `multipleOf` checks.
const MULTIPLE_OF_TOLERANCE: f64 = 1e-9;

/// Validates instances against schemas held in a [`SchemaContext`].
///
/// Compiled regular expressions are cached for the validator's lifetime.
#[derive(Debug)]
pub struct InstanceValidator<'a> {
    ctx: &'a SchemaContext,
    patterns: HashMap<String, Option<Regex>>,
    /// Schema nodes currently being applied, keyed with the address of the
    /// instance value they are applied to.
    active: HashSet<(NodeId, usize)>,
}

impl<'a> InstanceValidator<'a> {
    pub fn new(ctx: &'a SchemaContext) -> Self {
        Self {
            ctx,
            patterns: HashMap::new(),
            active: HashSet::new(),
        }
    }

    fn arena(&self) -> &'a SchemaArena {
        let ctx: &'a SchemaContext = self.ctx;
        &ctx.arena
    }

    /// Validate `instance` against `schema`, recording errors in `report`.
    ///
    /// Returns whether this call added no errors.
    pub fn validate(
        &mut self,
        report: &mut Report,
        schema: NodeId,
        instance: &Value,
    ) -> Result<bool, SchemaError> {
        let before = report.error_count();
        let arena = self.arena();

        if !arena.is_object(schema) {
            report.add_error(
                ErrorKind::SchemaNotAnObject,
                vec![json!(arena.type_name(schema))],
            );
            return Ok(false);
        }
        if arena.is_empty_object(schema) {
            return Ok(true);
        }

        let schema = self.follow_references(report, schema)?;

        // Applying a schema to the same value it is already being applied
        // to can only recurse forever.
        let key = (schema, instance as *const Value as usize);
        if !self.active.insert(key) {
            let path = report.current_path().to_string();
            tracing::warn!(%path, "recursive schema composition");
            return Err(SchemaError::RecursiveSchema { path });
        }
        let result = self.apply(report, schema, instance);
        self.active.remove(&key);
        result?;

        Ok(report.error_count() == before)
    }

    fn apply(
        &mut self,
        report: &mut Report,
        schema: NodeId,
        instance: &Value,
    ) -> Result<(), SchemaError> {
        self.check_type(report, schema, instance);
        self.check_keywords(report, schema, instance)?;

        match instance {
            Value::Array(items) => self.validate_items(report, schema, items),
            Value::Object(map) => self.validate_properties(report, schema, map),
            _ => Ok(()),
        }
    }

    /// Walk a `$ref` chain to the schema that actually applies.
    fn follow_references(&self, report: &mut Report, schema: NodeId) -> Result<NodeId, SchemaError> {
        let arena = self.arena();
        let mut current = schema;
        let mut hops = 0;

        while let Some(reference) = arena.get_str(current, "$ref") {
            if hops >= MAX_REFERENCE_HOPS {
                let start = arena.get_str(schema, "$ref").unwrap_or(reference).to_string();
                tracing::warn!(reference = %start, hops, "circular $ref chain");
                return Err(SchemaError::ReferenceChainExceeded {
                    reference: start,
                    limit: MAX_REFERENCE_HOPS,
                });
            }
            match self.ctx.annotations.target(current, RefKeyword::Ref) {
                None => {
                    report.add_error_described(
                        ErrorKind::RefUnresolved,
                        vec![json!(reference)],
                        arena.description_of(current),
                    );
                    break;
                }
                Some(target) if target == current => break,
                Some(target) => current = target,
            }
            hops += 1;
        }
        Ok(current)
    }

    fn check_type(&self, report: &mut Report, schema: NodeId, instance: &Value) {
        let arena = self.arena();
        let Some(type_node) = arena.get(schema, "type") else {
            return;
        };
        let actual = InstanceType::of(instance);
        let expected: Vec<&str> = match arena.node(type_node) {
            SchemaNode::String(name) => vec![name.as_str()],
            SchemaNode::Array(items) => items.iter().filter_map(|&n| arena.str_of(n)).collect(),
            _ => return,
        };
        if !expected.iter().any(|name| actual.satisfies(name)) {
            report.add_error_described(
                ErrorKind::InvalidType,
                vec![json!(expected.join(",")), json!(actual.name())],
                arena.description_of(schema),
            );
        }
    }

    fn check_keywords(
        &mut self,
        report: &mut Report,
        schema: NodeId,
        instance: &Value,
    ) -> Result<(), SchemaError> {
        let arena = self.arena();
        let Some(entries) = arena.entries(schema) else {
            return Ok(());
        };

        let mut properties_checked = false;
        for (name, &value) in entries {
            let Some(keyword) = Keyword::from_name(name) else {
                continue;
            };
            match keyword {
                Keyword::MultipleOf => self.check_multiple_of(report, schema, value, instance),
                Keyword::Maximum => self.check_maximum(report, schema, value, instance),
                Keyword::Minimum => self.check_minimum(report, schema, value, instance),
                Keyword::MaxLength | Keyword::MinLength => {
                    self.check_length(report, schema, keyword, value, instance)
                }
                Keyword::Pattern => self.check_pattern(report, schema, value, instance),
                Keyword::AdditionalItems => {
                    self.check_additional_items(report, schema, value, instance)
                }
                Keyword::MaxItems | Keyword::MinItems => {
                    self.check_item_count(report, schema, keyword, value, instance)
                }
                Keyword::UniqueItems => self.check_unique_items(report, schema, value, instance),
                Keyword::MaxProperties | Keyword::MinProperties => {
                    self.check_property_count(report, schema, keyword, value, instance)
                }
                Keyword::Required => self.check_required(report, schema, value, instance),
                Keyword::Properties
                | Keyword::PatternProperties
                | Keyword::AdditionalProperties => {
                    if !properties_checked {
                        properties_checked = true;
                        self.check_additional_properties(report, schema, instance);
                    }
                }
                Keyword::Dependencies => self.check_dependencies(report, schema, value, instance)?,
                Keyword::Enum => self.check_enum(report, schema, value, instance),
                Keyword::AllOf => self.check_all_of(report, value, instance)?,
                Keyword::AnyOf => self.check_any_of(report, schema, value, instance)?,
                Keyword::OneOf => self.check_one_of(report, schema, value, instance)?,
                Keyword::Not => self.check_not(report, schema, value, instance)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn check_multiple_of(&self, report: &mut Report, schema: NodeId, value: NodeId, instance: &Value) {
        let arena = self.arena();
        let (Value::Number(n), Some(divisor)) = (instance, arena.number_of(value)) else {
            return;
        };
        if !is_multiple_of(n, divisor) {
            report.add_error_described(
                ErrorKind::MultipleOf,
                vec![instance.clone(), arena.to_value(value)],
                arena.description_of(schema),
            );
        }
    }

    fn check_maximum(&self, report: &mut Report, schema: NodeId, value: NodeId, instance: &Value) {
        let arena = self.arena();
        let (Some(x), Some(max)) = (instance.as_f64(), arena.f64_of(value)) else {
            return;
        };
        let exclusive = arena.get_bool(schema, "exclusiveMaximum").unwrap_or(false);
        let kind = if exclusive && x >= max {
            ErrorKind::MaximumExclusive
        } else if !exclusive && x > max {
            ErrorKind::Maximum
        } else {
            return;
        };
        report.add_error_described(
            kind,
            vec![instance.clone(), arena.to_value(value)],
            arena.description_of(schema),
        );
    }

    fn check_minimum(&self, report: &mut Report, schema: NodeId, value: NodeId, instance: &Value) {
        let arena = self.arena();
        let (Some(x), Some(min)) = (instance.as_f64(), arena.f64_of(value)) else {
            return;
        };
        let exclusive = arena.get_bool(schema, "exclusiveMinimum").unwrap_or(false);
        let kind = if exclusive && x <= min {
            ErrorKind::MinimumExclusive
        } else if !exclusive && x < min {
            ErrorKind::Minimum
        } else {
            return;
        };
        report.add_error_described(
            kind,
            vec![instance.clone(), arena.to_value(value)],
            arena.description_of(schema),
        );
    }

    fn check_length(
        &self,
        report: &mut Report,
        schema: NodeId,
        keyword: Keyword,
        value: NodeId,
        instance: &Value,
    ) {
        let arena = self.arena();
        let (Value::String(s), Some(limit)) = (instance, arena.f64_of(value)) else {
            return;
        };
        let length = s.chars().count();
        let kind = match keyword {
            Keyword::MaxLength if length as f64 > limit => ErrorKind::MaxLength,
            Keyword::MinLength if (length as f64) < limit => ErrorKind::MinLength,
            _ => return,
        };
        report.add_error_described(
            kind,
            vec![json!(length), arena.to_value(value)],
            arena.description_of(schema),
        );
    }

    fn check_pattern(&mut self, report: &mut Report, schema: NodeId, value: NodeId, instance: &Value) {
        let arena = self.arena();
        let (Value::String(s), Some(pattern)) = (instance, arena.str_of(value)) else {
            return;
        };
        // Uncompilable patterns are reported by meta-schema validation.
        if self.regex(pattern).is_some_and(|re| !re.is_match(s)) {
            report.add_error_described(
                ErrorKind::Pattern,
                vec![json!(pattern), json!(s)],
                arena.description_of(schema),
            );
        }
    }

    fn check_additional_items(
        &self,
        report: &mut Report,
        schema: NodeId,
        value: NodeId,
        instance: &Value,
    ) {
        let arena = self.arena();
        let Value::Array(items) = instance else {
            return;
        };
        if arena.bool_of(value) != Some(false) {
            return;
        }
        let tuple_len = arena
            .get(schema, "items")
            .and_then(|items| arena.items(items))
            .map(<[NodeId]>::len);
        if tuple_len.is_some_and(|len| items.len() > len) {
            report.add_error_described(
                ErrorKind::ArrayAdditionalItems,
                vec![],
                arena.description_of(schema),
            );
        }
    }

    fn check_item_count(
        &self,
        report: &mut Report,
        schema: NodeId,
        keyword: Keyword,
        value: NodeId,
        instance: &Value,
    ) {
        let arena = self.arena();
        let (Value::Array(items), Some(limit)) = (instance, arena.f64_of(value)) else {
            return;
        };
        let count = items.len();
        let kind = match keyword {
            Keyword::MaxItems if count as f64 > limit => ErrorKind::ArrayLengthLong,
            Keyword::MinItems if (count as f64) < limit => ErrorKind::ArrayLengthShort,
            _ => return,
        };
        report.add_error_described(
            kind,
            vec![json!(count), arena.to_value(value)],
            arena.description_of(schema),
        );
    }

    fn check_unique_items(
        &self,
        report: &mut Report,
        schema: NodeId,
        value: NodeId,
        instance: &Value,
    ) {
        let arena = self.arena();
        let Value::Array(items) = instance else {
            return;
        };
        if arena.bool_of(value) == Some(true) && !all_unique(items) {
            report.add_error_described(
                ErrorKind::ArrayUnique,
                vec![json!(instance.to_string())],
                arena.description_of(schema),
            );
        }
    }

    fn check_property_count(
        &self,
        report: &mut Report,
        schema: NodeId,
        keyword: Keyword,
        value: NodeId,
        instance: &Value,
    ) {
        let arena = self.arena();
        let (Value::Object(map), Some(limit)) = (instance, arena.f64_of(value)) else {
            return;
        };
        let count = map.len();
        let kind = match keyword {
            Keyword::MaxProperties if count as f64 > limit => ErrorKind::ObjectPropertiesMaximum,
            Keyword::MinProperties if (count as f64) < limit => ErrorKind::ObjectPropertiesMinimum,
            _ => return,
        };
        report.add_error_described(
            kind,
            vec![json!(count), arena.to_value(value)],
            arena.description_of(schema),
        );
    }

    fn check_required(&self, report: &mut Report, schema: NodeId, value: NodeId, instance: &Value) {
        let arena = self.arena();
        let (Value::Object(map), Some(required)) = (instance, arena.items(value)) else {
            return;
        };
        for name in required.iter().filter_map(|&n| arena.str_of(n)) {
            if !map.contains_key(name) {
                report.add_error_described(
                    ErrorKind::ObjectMissingRequiredProperty,
                    vec![json!(name)],
                    arena.description_of(schema),
                );
            }
        }
    }

    /// `additionalProperties: false` against `properties` and `patternProperties`.
    fn check_additional_properties(&mut self, report: &mut Report, schema: NodeId, instance: &Value) {
        let arena = self.arena();
        let Value::Object(map) = instance else {
            return;
        };
        if arena.get_bool(schema, "additionalProperties") != Some(false) {
            return;
        }
        let properties = arena.get(schema, "properties").and_then(|n| arena.entries(n));
        let patterns: Vec<&str> = arena
            .get(schema, "patternProperties")
            .and_then(|n| arena.entries(n))
            .map(|entries| entries.keys().map(String::as_str).collect())
            .unwrap_or_default();

        let mut extra = Vec::new();
        for name in map.keys() {
            if properties.is_some_and(|p| p.contains_key(name)) {
                continue;
            }
            if patterns.iter().any(|pattern| self.pattern_matches(pattern, name)) {
                continue;
            }
            extra.push(name.as_str());
        }
        if !extra.is_empty() {
            report.add_error_described(
                ErrorKind::ObjectAdditionalProperties,
                vec![json!(extra.join(","))],
                arena.description_of(schema),
            );
        }
    }

    fn check_dependencies(
        &mut self,
        report: &mut Report,
        schema: NodeId,
        value: NodeId,
        instance: &Value,
    ) -> Result<(), SchemaError> {
        let arena = self.arena();
        let (Value::Object(map), Some(dependencies)) = (instance, arena.entries(value)) else {
            return Ok(());
        };
        for (name, &dependency) in dependencies {
            if !map.contains_key(name) {
                continue;
            }
            if arena.is_object(dependency) {
                let mut sub = report.child();
                if !self.validate(&mut sub, dependency, instance)? {
                    report.merge(sub);
                }
            } else if let Some(required) = arena.items(dependency) {
                for key in required.iter().filter_map(|&n| arena.str_of(n)) {
                    if !map.contains_key(key) {
                        report.add_error_described(
                            ErrorKind::ObjectDependencyKey,
                            vec![json!(key), json!(name)],
                            arena.description_of(schema),
                        );
                    }
                }
            }
        }
        Ok(())
    }

    fn check_enum(&self, report: &mut Report, schema: NodeId, value: NodeId, instance: &Value) {
        let arena = self.arena();
        let Some(members) = arena.items(value) else {
            return;
        };
        if !members.iter().any(|&m| arena.equals_value(m, instance)) {
            report.add_error_described(
                ErrorKind::EnumMismatch,
                vec![instance.clone()],
                arena.description_of(schema),
            );
        }
    }

    fn check_all_of(
        &mut self,
        report: &mut Report,
        value: NodeId,
        instance: &Value,
    ) -> Result<(), SchemaError> {
        let Some(members) = self.arena().items(value) else {
            return Ok(());
        };
        for &member in members {
            if !self.validate(report, member, instance)? {
                break;
            }
        }
        Ok(())
    }

    fn check_any_of(
        &mut self,
        report: &mut Report,
        schema: NodeId,
        value: NodeId,
        instance: &Value,
    ) -> Result<(), SchemaError> {
        let arena = self.arena();
        let Some(members) = arena.items(value) else {
            return Ok(());
        };
        let mut sub_reports = Vec::with_capacity(members.len());
        for &member in members {
            let mut sub = report.child();
            if self.validate(&mut sub, member, instance)? {
                return Ok(());
            }
            sub_reports.push(sub);
        }
        report.add_nested_error(
            ErrorKind::AnyOfMissing,
            vec![],
            sub_reports,
            arena.description_of(schema),
        );
        Ok(())
    }

    fn check_one_of(
        &mut self,
        report: &mut Report,
        schema: NodeId,
        value: NodeId,
        instance: &Value,
    ) -> Result<(), SchemaError> {
        let arena = self.arena();
        let Some(members) = arena.items(value) else {
            return Ok(());
        };
        let mut passed = 0;
        let mut sub_reports = Vec::with_capacity(members.len());
        for &member in members {
            let mut sub = report.child();
            if self.validate(&mut sub, member, instance)? {
                passed += 1;
            }
            sub_reports.push(sub);
        }
        match passed {
            0 => report.add_nested_error(
                ErrorKind::OneOfMissing,
                vec![],
                sub_reports,
                arena.description_of(schema),
            ),
            1 => {}
            _ => report.add_error_described(
                ErrorKind::OneOfMultiple,
                vec![],
                arena.description_of(schema),
            ),
        }
        Ok(())
    }

    fn check_not(
        &mut self,
        report: &mut Report,
        schema: NodeId,
        value: NodeId,
        instance: &Value,
    ) -> Result<(), SchemaError> {
        let mut sub = report.child();
        if self.validate(&mut sub, value, instance)? {
            report.add_error_described(
                ErrorKind::NotPassed,
                vec![],
                self.arena().description_of(schema),
            );
        }
        Ok(())
    }

    /// Recurse into array items through `items` / `additionalItems`.
    fn validate_items(
        &mut self,
        report: &mut Report,
        schema: NodeId,
        items: &[Value],
    ) -> Result<(), SchemaError> {
        let arena = self.arena();
        let Some(items_schema) = arena.get(schema, "items") else {
            return Ok(());
        };

        if let Some(tuple) = arena.items(items_schema) {
            let additional = arena
                .get(schema, "additionalItems")
                .filter(|&n| arena.is_object(n));
            for (index, item) in items.iter().enumerate() {
                if let Some(target) = tuple.get(index).copied().or(additional) {
                    report.with_segment(index, |r| self.validate(r, target, item))?;
                }
            }
        } else if arena.is_object(items_schema) {
            for (index, item) in items.iter().enumerate() {
                report.with_segment(index, |r| self.validate(r, items_schema, item))?;
            }
        }
        Ok(())
    }

    /// Recurse into object members through `properties`,
    /// `patternProperties` and `additionalProperties`.
    fn validate_properties(
        &mut self,
        report: &mut Report,
        schema: NodeId,
        map: &Map<String, Value>,
    ) -> Result<(), SchemaError> {
        let arena = self.arena();
        let properties = arena.get(schema, "properties").and_then(|n| arena.entries(n));
        let patterns: Vec<(&str, NodeId)> = arena
            .get(schema, "patternProperties")
            .and_then(|n| arena.entries(n))
            .map(|entries| entries.iter().map(|(k, &v)| (k.as_str(), v)).collect())
            .unwrap_or_default();
        let additional = arena
            .get(schema, "additionalProperties")
            .filter(|&n| arena.is_object(n));

        for (name, member) in map {
            let mut targets = Vec::new();
            if let Some(&target) = properties.and_then(|p| p.get(name)) {
                targets.push(target);
            }
            for &(pattern, target) in &patterns {
                if self.pattern_matches(pattern, name) {
                    targets.push(target);
                }
            }
            if targets.is_empty() {
                targets.extend(additional);
            }
            for target in targets {
                report.with_segment(name.as_str(), |r| self.validate(r, target, member))?;
            }
        }
        Ok(())
    }

    fn regex(&mut self, pattern: &str) -> Option<&Regex> {
        self.patterns
            .entry(pattern.to_string())
            .or_insert_with(|| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::debug!(pattern, error = %e, "pattern does not compile");
                    None
                }
            })
            .as_ref()
    }

    fn pattern_matches(&mut self, pattern: &str, candidate: &str) -> bool {
        self.regex(pattern).is_some_and(|re| re.is_match(candidate))
    }
}

/// Exact for integers; tolerant for floats.
fn is_multiple_of(n: &Number, divisor: &Number) -> bool {
    if let (Some(a), Some(b)) = (n.as_i64(), divisor.as_i64()) {
        if let Some(remainder) = a.checked_rem(b) {
            return remainder == 0;
        }
    }
    let (Some(a), Some(b)) = (n.as_f64(), divisor.as_f64()) else {
        return true;
    };
    if b == 0.0 {
        return true;
    }
    let quotient = a / b;
    (quotient - quotient.round()).abs() <= MULTIPLE_OF_TOLERANCE * quotient.abs().max(1.0)
}
