//! Closed set of draft-04 keywords the engine understands.
//!
//! Unknown keys in a schema are ignored by both validators.

/// A recognized schema keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Ref,
    Schema,
    Id,
    Title,
    Description,
    Default,
    Definitions,
    Format,
    Type,
    Enum,
    MultipleOf,
    Maximum,
    ExclusiveMaximum,
    Minimum,
    ExclusiveMinimum,
    MaxLength,
    MinLength,
    Pattern,
    Items,
    AdditionalItems,
    MaxItems,
    MinItems,
    UniqueItems,
    Properties,
    PatternProperties,
    AdditionalProperties,
    MaxProperties,
    MinProperties,
    Required,
    Dependencies,
    AllOf,
    AnyOf,
    OneOf,
    Not,
}

impl Keyword {
    pub fn from_name(name: &str) -> Option<Self> {
        let keyword = match name {
            "$ref" => Self::Ref,
            "$schema" => Self::Schema,
            "id" => Self::Id,
            "title" => Self::Title,
            "description" => Self::Description,
            "default" => Self::Default,
            "definitions" => Self::Definitions,
            "format" => Self::Format,
            "type" => Self::Type,
            "enum" => Self::Enum,
            "multipleOf" => Self::MultipleOf,
            "maximum" => Self::Maximum,
            "exclusiveMaximum" => Self::ExclusiveMaximum,
            "minimum" => Self::Minimum,
            "exclusiveMinimum" => Self::ExclusiveMinimum,
            "maxLength" => Self::MaxLength,
            "minLength" => Self::MinLength,
            "pattern" => Self::Pattern,
            "items" => Self::Items,
            "additionalItems" => Self::AdditionalItems,
            "maxItems" => Self::MaxItems,
            "minItems" => Self::MinItems,
            "uniqueItems" => Self::UniqueItems,
            "properties" => Self::Properties,
            "patternProperties" => Self::PatternProperties,
            "additionalProperties" => Self::AdditionalProperties,
            "maxProperties" => Self::MaxProperties,
            "minProperties" => Self::MinProperties,
            "required" => Self::Required,
            "dependencies" => Self::Dependencies,
            "allOf" => Self::AllOf,
            "anyOf" => Self::AnyOf,
            "oneOf" => Self::OneOf,
            "not" => Self::Not,
            _ => return None,
        };
        Some(keyword)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ref => "$ref",
            Self::Schema => "$schema",
            Self::Id => "id",
            Self::Title => "title",
            Self::Description => "description",
            Self::Default => "default",
            Self::Definitions => "definitions",
            Self::Format => "format",
            Self::Type => "type",
            Self::Enum => "enum",
            Self::MultipleOf => "multipleOf",
            Self::Maximum => "maximum",
            Self::ExclusiveMaximum => "exclusiveMaximum",
            Self::Minimum => "minimum",
            Self::ExclusiveMinimum => "exclusiveMinimum",
            Self::MaxLength => "maxLength",
            Self::MinLength => "minLength",
            Self::Pattern => "pattern",
            Self::Items => "items",
            Self::AdditionalItems => "additionalItems",
            Self::MaxItems => "maxItems",
            Self::MinItems => "minItems",
            Self::UniqueItems => "uniqueItems",
            Self::Properties => "properties",
            Self::PatternProperties => "patternProperties",
            Self::AdditionalProperties => "additionalProperties",
            Self::MaxProperties => "maxProperties",
            Self::MinProperties => "minProperties",
            Self::Required => "required",
            Self::Dependencies => "dependencies",
            Self::AllOf => "allOf",
            Self::AnyOf => "anyOf",
            Self::OneOf => "oneOf",
            Self::Not => "not",
        }
    }
}
