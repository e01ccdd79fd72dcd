//! Partition key extraction and the point-read route.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use super::SelectExpr;
use crate::query_planner::logical_expr::SqlExpr;

/// Runtime parameter values, keyed by parameter name (no `@`).
pub type ParameterValues = HashMap<String, Value>;

/// A document property, by its JSON name.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize, Deserialize)]
pub struct PropertyRef {
    pub name: String,
}

impl PropertyRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// `value` was found compared for equality against partition key `property`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct PartitionKeyBinding {
    pub value: SqlExpr,
    pub property: PropertyRef,
}

#[derive(Debug, PartialEq, Clone)]
pub enum PartitionKey {
    /// No binding was recorded; the query fans out.
    None,
    /// One component per binding, in binding order. A component is `null`
    /// when its expression could not be resolved.
    Composite(Vec<Value>),
}

impl PartitionKey {
    pub fn is_none(&self) -> bool {
        matches!(self, PartitionKey::None)
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionKey::None => f.write_str("(none)"),
            PartitionKey::Composite(values) => {
                let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

/// Route for a query that resolves to a single document read by id and
/// partition key, bypassing the query engine.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ReadItemInfo {
    pub entity_type: String,
    /// Key property -> parameter carrying its value.
    pub property_parameters: Vec<(PropertyRef, String)>,
}

impl ReadItemInfo {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            property_parameters: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: PropertyRef, parameter: impl Into<String>) -> Self {
        self.property_parameters.push((property, parameter.into()));
        self
    }

    /// Key values for the read, or `None` if any parameter has no value.
    pub fn resolve<'a>(&'a self, values: &'a ParameterValues) -> Option<Vec<(&'a PropertyRef, &'a Value)>> {
        self.property_parameters
            .iter()
            .map(|(property, parameter)| values.get(parameter).map(|v| (property, v)))
            .collect()
    }
}

impl SelectExpr {
    pub fn add_partition_key(&mut self, property: PropertyRef, value: SqlExpr) {
        log::debug!("Recorded partition key binding for '{}'", property.name);
        self.partition_key_bindings.push(PartitionKeyBinding { value, property });
    }

    pub fn partition_key_bindings(&self) -> &[PartitionKeyBinding] {
        &self.partition_key_bindings
    }

    pub fn partition_key_value(&self, parameters: &ParameterValues) -> PartitionKey {
        if self.partition_key_bindings.is_empty() {
            return PartitionKey::None;
        }

        let values = self
            .partition_key_bindings
            .iter()
            .map(|binding| match &binding.value {
                SqlExpr::Constant(constant) => constant.value.clone(),
                SqlExpr::Parameter(parameter) => parameters
                    .get(&parameter.name)
                    .cloned()
                    .unwrap_or(Value::Null),
                _ => Value::Null,
            })
            .collect();

        PartitionKey::Composite(values)
    }
}
