//! Parameter schemas as tagged variants, validated by the dispatcher before a
//! handler ever runs.

use serde_json::{json, Map, Value};

use crate::error::DispatchError;

/// Semantic type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    /// Non-negative integer. Numeric strings are accepted and normalized.
    Integer,
    /// One of a fixed set of strings.
    Enum(&'static [&'static str]),
    /// May be absent or `null`; otherwise must match the inner kind.
    Optional(&'static ParamKind),
}

impl ParamKind {
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional(_))
    }

    /// Human-readable expectation, used in `BadArgument`.
    pub fn describe(&self) -> String {
        match self {
            Self::String => "string".into(),
            Self::Integer => "non-negative integer".into(),
            Self::Enum(values) => format!("one of {}", values.join(", ")),
            Self::Optional(inner) => format!("optional {}", inner.describe()),
        }
    }

    fn json_schema(&self, description: &str) -> Value {
        match self {
            Self::String => json!({ "type": "string", "description": description }),
            Self::Integer => json!({ "type": "integer", "minimum": 0, "description": description }),
            Self::Enum(values) => {
                json!({ "type": "string", "enum": values, "description": description })
            }
            Self::Optional(inner) => inner.json_schema(description),
        }
    }

    /// Check `value` and return its normalized form.
    fn check(&self, value: &Value) -> Option<Value> {
        match self {
            Self::String => value.as_str().map(|s| Value::String(s.to_string())),
            Self::Integer => match value {
                Value::Number(n) => n.as_u64().map(Value::from),
                Value::String(s) => s.trim().parse::<u64>().ok().map(Value::from),
                _ => None,
            },
            Self::Enum(values) => value
                .as_str()
                .filter(|s| values.contains(s))
                .map(|s| Value::String(s.to_string())),
            Self::Optional(inner) => inner.check(value),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn new(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
        }
    }
}

/// Validated argument bag handed to a handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Required string parameters are guaranteed present after validation.
    pub fn str(&self, name: &str) -> &str {
        self.get_str(name).unwrap_or_default()
    }

    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.0.get(name).and_then(Value::as_u64)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for ToolArgs {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Validate `params` against `specs`: unknown names, missing required values
/// and type mismatches all fail with `BadArgument`.
pub fn validate(specs: &[ParamSpec], params: &Map<String, Value>) -> Result<ToolArgs, DispatchError> {
    if let Some(unknown) = params.keys().find(|k| !specs.iter().any(|s| s.name == k.as_str())) {
        return Err(DispatchError::bad_argument(unknown.clone(), "no such parameter"));
    }

    let mut args = Map::new();
    for spec in specs {
        match params.get(spec.name) {
            None | Some(Value::Null) if spec.kind.is_optional() => {}
            None | Some(Value::Null) => {
                return Err(DispatchError::bad_argument(spec.name, spec.kind.describe()));
            }
            Some(value) => {
                let normalized = spec
                    .kind
                    .check(value)
                    .ok_or_else(|| DispatchError::bad_argument(spec.name, spec.kind.describe()))?;
                args.insert(spec.name.to_string(), normalized);
            }
        }
    }
    Ok(ToolArgs(args))
}

/// JSON Schema object advertised for a tool's parameters.
pub fn input_schema(specs: &[ParamSpec]) -> Map<String, Value> {
    let properties: Map<String, Value> = specs
        .iter()
        .map(|s| (s.name.to_string(), s.kind.json_schema(s.description)))
        .collect();
    let required: Vec<&str> = specs
        .iter()
        .filter(|s| !s.kind.is_optional())
        .map(|s| s.name)
        .collect();

    let mut schema = Map::new();
    schema.insert("type".into(), "object".into());
    schema.insert("properties".into(), Value::Object(properties));
    schema.insert("required".into(), json!(required));
    schema.insert("additionalProperties".into(), false.into());
    schema
}
