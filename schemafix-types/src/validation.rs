use serde::{Deserialize, Serialize};

/// One oracle-reported violation.
///
/// Produced fresh on every validation call and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub keyword: String,
    pub instance_path: String,
    pub schema_path: String,

    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
}

impl ValidationError {
    pub fn new(
        keyword: impl Into<String>,
        instance_path: impl Into<String>,
        schema_path: impl Into<String>,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            instance_path: instance_path.into(),
            schema_path: schema_path.into(),
            params: serde_json::Map::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: serde_json::Value) -> Self {
        self.params.insert(key.to_string(), value);
        self
    }

    pub fn kind(&self) -> Keyword {
        Keyword::parse(&self.keyword)
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|v| v.as_str())
    }

    pub fn param_f64(&self, key: &str) -> Option<f64> {
        self.params.get(key).and_then(|v| v.as_f64())
    }

    /// `(keyword, instancePath, schemaPath)`; used to compare error sets across drafts.
    pub fn signature(&self) -> ErrorSignature {
        ErrorSignature {
            keyword: self.keyword.clone(),
            instance_path: self.instance_path.clone(),
            schema_path: self.schema_path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ErrorSignature {
    pub keyword: String,
    pub instance_path: String,
    pub schema_path: String,
}

/// Closed set of keywords the dispatcher knows how to route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Keyword {
    Type,
    Enum,
    Const,
    Required,
    MinLength,
    MaxLength,
    UniqueItems,
    MinItems,
    MaxItems,
    Minimum,
    Maximum,
    ExclusiveMinimum,
    ExclusiveMaximum,
    Contains,
    MinContains,
    MaxContains,
    Pattern,
    MultipleOf,
    PropertyNames,
    AdditionalProperties,
    UnevaluatedProperties,
    DependentRequired,
    DependentSchemas,
    OneOf,
    Other,
}

impl Keyword {
    pub fn parse(s: &str) -> Self {
        match s {
            "type" => Keyword::Type,
            "enum" => Keyword::Enum,
            "const" => Keyword::Const,
            "required" => Keyword::Required,
            "minLength" => Keyword::MinLength,
            "maxLength" => Keyword::MaxLength,
            "uniqueItems" => Keyword::UniqueItems,
            "minItems" => Keyword::MinItems,
            "maxItems" => Keyword::MaxItems,
            "minimum" => Keyword::Minimum,
            "maximum" => Keyword::Maximum,
            "exclusiveMinimum" => Keyword::ExclusiveMinimum,
            "exclusiveMaximum" => Keyword::ExclusiveMaximum,
            "contains" => Keyword::Contains,
            "minContains" => Keyword::MinContains,
            "maxContains" => Keyword::MaxContains,
            "pattern" => Keyword::Pattern,
            "multipleOf" => Keyword::MultipleOf,
            "propertyNames" => Keyword::PropertyNames,
            "additionalProperties" => Keyword::AdditionalProperties,
            "unevaluatedProperties" => Keyword::UnevaluatedProperties,
            "dependentRequired" | "dependencies" => Keyword::DependentRequired,
            "dependentSchemas" => Keyword::DependentSchemas,
            "oneOf" => Keyword::OneOf,
            _ => Keyword::Other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Type => "type",
            Keyword::Enum => "enum",
            Keyword::Const => "const",
            Keyword::Required => "required",
            Keyword::MinLength => "minLength",
            Keyword::MaxLength => "maxLength",
            Keyword::UniqueItems => "uniqueItems",
            Keyword::MinItems => "minItems",
            Keyword::MaxItems => "maxItems",
            Keyword::Minimum => "minimum",
            Keyword::Maximum => "maximum",
            Keyword::ExclusiveMinimum => "exclusiveMinimum",
            Keyword::ExclusiveMaximum => "exclusiveMaximum",
            Keyword::Contains => "contains",
            Keyword::MinContains => "minContains",
            Keyword::MaxContains => "maxContains",
            Keyword::Pattern => "pattern",
            Keyword::MultipleOf => "multipleOf",
            Keyword::PropertyNames => "propertyNames",
            Keyword::AdditionalProperties => "additionalProperties",
            Keyword::UnevaluatedProperties => "unevaluatedProperties",
            Keyword::DependentRequired => "dependentRequired",
            Keyword::DependentSchemas => "dependentSchemas",
            Keyword::OneOf => "oneOf",
            Keyword::Other => "other",
        }
    }

    /// Keywords whose failures count as dependent-constraint regressions.
    pub fn is_dependent(self) -> bool {
        matches!(
            self,
            Keyword::Required | Keyword::DependentRequired | Keyword::DependentSchemas
        )
    }
}
