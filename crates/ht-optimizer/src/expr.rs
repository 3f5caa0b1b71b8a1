//! Search-space expression trees.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Reserved mapping key that turns a mapping into a capability call.
pub const CAPABILITY_KEY: &str = "name";

/// Parameters of a capability call, each itself an expression.
pub type Params = BTreeMap<String, Expr>;

/// A node of a search-space description.
///
/// Mappings iterate in key order, which fixes the order in which a shared
/// random state is consumed during evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Expr {
    /// Absent value.
    Null,
    /// Bool, number or string leaf.
    Scalar(Value),
    Seq(Vec<Expr>),
    Map(BTreeMap<String, Expr>),
    /// A mapping whose reserved `name` key names a sampling capability.
    Call { name: String, params: Params },
}

impl Expr {
    pub fn scalar(value: impl Into<Value>) -> Self {
        Self::from_json(value.into())
    }

    pub fn seq(items: impl IntoIterator<Item = Expr>) -> Self {
        Self::Seq(items.into_iter().collect())
    }

    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Expr)>) -> Self {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn call<K: Into<String>>(
        name: impl Into<String>,
        params: impl IntoIterator<Item = (K, Expr)>,
    ) -> Self {
        Self::Call {
            name: name.into(),
            params: params.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Convert arbitrary JSON into an expression tree.
    ///
    /// Any object with a string `name` field becomes a [`Expr::Call`];
    /// whether it is dispatched is decided at evaluation time.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Array(items) => Self::Seq(items.into_iter().map(Self::from_json).collect()),
            Value::Object(mut object) => {
                let name = match object.get(CAPABILITY_KEY) {
                    Some(Value::String(name)) => Some(name.clone()),
                    _ => None,
                };
                match name {
                    Some(name) => {
                        object.remove(CAPABILITY_KEY);
                        Self::Call {
                            name,
                            params: object
                                .into_iter()
                                .map(|(k, v)| (k, Self::from_json(v)))
                                .collect(),
                        }
                    }
                    None => Self::Map(
                        object
                            .into_iter()
                            .map(|(k, v)| (k, Self::from_json(v)))
                            .collect(),
                    ),
                }
            }
            scalar => Self::Scalar(scalar),
        }
    }

    /// Render the tree back to JSON without evaluating anything.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Scalar(value) => value.clone(),
            Self::Seq(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Call { name, params } => {
                let mut object: serde_json::Map<String, Value> = params
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect();
                object.insert(CAPABILITY_KEY.to_string(), Value::String(name.clone()));
                Value::Object(object)
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Self::from_json(value)
    }
}

impl From<Expr> for Value {
    fn from(expr: Expr) -> Self {
        expr.to_json()
    }
}
