//! Property tests for instance validation through the public facade.

use jsref_schema::{ErrorKind, Options, SchemaValidator};
use proptest::prelude::*;
use serde_json::json;

fn passes(schema: &serde_json::Value, instance: &serde_json::Value) -> bool {
    let mut validator = SchemaValidator::new(Options::default());
    validator.validate(instance, schema).unwrap()
}

proptest! {
    /// allOf, anyOf, oneOf and not agree with their boolean definitions.
    #[test]
    fn composition_laws(lower in -20i64..20, upper in -20i64..20, value in -30i64..30) {
        let a = json!({"minimum": lower});
        let b = json!({"maximum": upper});
        let instance = json!(value);
        let pa = passes(&a, &instance);
        let pb = passes(&b, &instance);

        prop_assert_eq!(passes(&json!({"allOf": [a.clone(), b.clone()]}), &instance), pa && pb);
        prop_assert_eq!(passes(&json!({"anyOf": [a.clone(), b.clone()]}), &instance), pa || pb);
        prop_assert_eq!(passes(&json!({"oneOf": [a.clone(), b.clone()]}), &instance), pa != pb);
        prop_assert_eq!(passes(&json!({"not": a}), &instance), !pa);
    }

    /// Integral floats satisfy "integer"; fractional ones do not.
    #[test]
    fn integer_type_accepts_integral_floats(whole in -1_000_000i64..1_000_000, frac in 1u32..1000) {
        let schema = json!({"type": "integer"});
        prop_assert!(passes(&schema, &json!(whole as f64)));
        let fractional = whole as f64 + f64::from(frac) / 1000.0;
        prop_assert!(!passes(&schema, &json!(fractional)));
        let number_accepts_whole = passes(&json!({"type": "number"}), &json!(whole));
        prop_assert!(number_accepts_whole);
    }

    /// Errors deep in an instance carry the pointer to the offending value.
    #[test]
    fn error_path_addresses_offending_item(key in "[a-z]{1,8}", len in 1usize..6, bad in 0usize..6) {
        let bad = bad % len;
        let items: Vec<_> = (0..len).map(|i| if i == bad { json!(i) } else { json!("ok") }).collect();
        let schema = json!({"properties": {key.clone(): {"items": {"type": "string"}}}});
        let mut validator = SchemaValidator::new(Options::default());
        let valid = validator.validate(&json!({key.clone(): items}), &schema).unwrap();
        prop_assert!(!valid);
        prop_assert_eq!(validator.errors().len(), 1);
        prop_assert_eq!(validator.errors()[0].path.to_string(), format!("#/{key}/{bad}"));
    }

    /// With additionalProperties false, unmatched members yield exactly one error.
    #[test]
    fn additional_properties_single_error(extra in prop::collection::btree_set("[a-z]{3,6}", 1..5)) {
        let schema = json!({
            "properties": {"id": {}},
            "patternProperties": {"^x_": {}},
            "additionalProperties": false
        });
        let mut instance = serde_json::Map::new();
        instance.insert("id".into(), json!(1));
        instance.insert("x_meta".into(), json!(true));
        for name in &extra {
            instance.insert(name.clone(), json!(null));
        }
        let mut validator = SchemaValidator::new(Options::default());
        let valid = validator.validate(&serde_json::Value::Object(instance), &schema).unwrap();
        prop_assert!(!valid);
        prop_assert_eq!(validator.errors().len(), 1);
        prop_assert_eq!(validator.errors()[0].kind, ErrorKind::ObjectAdditionalProperties);
        let joined: Vec<&str> = extra.iter().map(String::as_str).collect();
        let expected = joined.join(",");
        prop_assert_eq!(validator.errors()[0].params[0].as_str(), Some(expected.as_str()));
    }
}
