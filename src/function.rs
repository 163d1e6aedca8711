//! Remote function identities and query arguments.

use crate::error::QueryError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Kind of remote procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionKind {
    Query,
    Mutation,
    Action,
}

impl FunctionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FunctionKind::Query => "query",
            FunctionKind::Mutation => "mutation",
            FunctionKind::Action => "action",
        }
    }
}

/// Identifies a remote procedure by module path, name and kind.
///
/// Equality is by identity (module path, name, kind), never by argument content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionReference {
    pub module_path: String,
    pub name: String,
    pub kind: FunctionKind,
}

impl FunctionReference {
    pub fn new(
        module_path: impl Into<String>,
        name: impl Into<String>,
        kind: FunctionKind,
    ) -> Result<Self, QueryError> {
        let module_path = module_path.into();
        let name = name.into();
        if module_path.trim().is_empty() {
            return Err(QueryError::Configuration(
                "function module path cannot be empty".to_string(),
            ));
        }
        if name.trim().is_empty() || name.contains(':') {
            return Err(QueryError::Configuration(format!(
                "invalid function name '{}'",
                name
            )));
        }
        Ok(Self {
            module_path,
            name,
            kind,
        })
    }

    pub fn query(module_path: &str, name: &str) -> Result<Self, QueryError> {
        Self::new(module_path, name, FunctionKind::Query)
    }

    pub fn mutation(module_path: &str, name: &str) -> Result<Self, QueryError> {
        Self::new(module_path, name, FunctionKind::Mutation)
    }

    pub fn action(module_path: &str, name: &str) -> Result<Self, QueryError> {
        Self::new(module_path, name, FunctionKind::Action)
    }

    /// Parse `dir/module:name`. A missing `:name` part means the `default` export.
    pub fn parse(identifier: &str, kind: FunctionKind) -> Result<Self, QueryError> {
        let identifier = identifier.trim();
        match identifier.split_once(':') {
            Some((module_path, name)) => Self::new(module_path, name, kind),
            None => Self::new(identifier, "default", kind),
        }
    }

    /// Wire path used by both transports.
    pub fn path(&self) -> String {
        format!("{}:{}", self.module_path, self.name)
    }
}

impl fmt::Display for FunctionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.as_str(), self.path())
    }
}

/// Arguments for a query, or the `Skip` sentinel meaning "do not execute".
#[derive(Debug, Clone, PartialEq)]
pub enum QueryArgs {
    Skip,
    Args(Map<String, Value>),
}

impl QueryArgs {
    pub fn empty() -> Self {
        QueryArgs::Args(Map::new())
    }

    /// Serialize any value into an argument mapping; non-object values are rejected.
    pub fn from_serialize<T: Serialize>(args: &T) -> Result<Self, QueryError> {
        match serde_json::to_value(args)? {
            Value::Object(map) => Ok(QueryArgs::Args(map)),
            Value::Null => Ok(QueryArgs::empty()),
            other => Err(QueryError::Serialization(format!(
                "query arguments must be an object, got {}",
                value_kind(&other)
            ))),
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, QueryArgs::Skip)
    }

    pub fn as_map(&self) -> Option<&Map<String, Value>> {
        match self {
            QueryArgs::Skip => None,
            QueryArgs::Args(map) => Some(map),
        }
    }
}

impl From<Map<String, Value>> for QueryArgs {
    fn from(map: Map<String, Value>) -> Self {
        QueryArgs::Args(map)
    }
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
