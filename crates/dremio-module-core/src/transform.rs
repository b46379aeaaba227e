// crates/dremio-module-core/src/transform.rs
// ============================================================================
// Module: Column Transformations
// Description: Policy-driven column restrictions and projection query builder.
// Purpose: Turn governance actions into the SQL behind a virtual dataset.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! Governance actions reach the module as a JSON array of named actions, each
//! carrying the columns it applies to under a key equal to its own name:
//! `[{"name": "RedactAction", "RedactAction": {"columns": ["c1"]}}]`.
//! A [`TransformPlan`] merges every action into one restricted column set and
//! [`projection_query`] builds the `SELECT` that exposes only the remaining
//! columns.
//! Invariants:
//! - Unknown action names fail closed with [`TransformError::UnknownAction`].
//! - Restricted columns never appear in a projection query.
//! - Identifiers are always double-quoted with embedded quotes doubled.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde_json::Value;
use thiserror::Error;

use crate::dataset::CatalogPath;
use crate::policy::PolicyOutcome;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while decoding governance actions.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// Action payload is not valid JSON.
    #[error("transformations are not valid json: {0}")]
    InvalidJson(String),
    /// Action payload has an unexpected shape.
    #[error("malformed transformation: {0}")]
    Malformed(String),
    /// Action name is not supported by this module.
    #[error("unsupported transformation action: {0}")]
    UnknownAction(String),
}

// ============================================================================
// SECTION: Transformation Model
// ============================================================================

/// Kind of column restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    /// Column values must be hidden.
    Redact,
    /// Column must be dropped.
    Remove,
}

impl TransformKind {
    /// Maps a governance action name onto a transformation kind.
    ///
    /// # Errors
    ///
    /// Returns [`TransformError::UnknownAction`] for unsupported names.
    pub fn from_action_name(name: &str) -> Result<Self, TransformError> {
        match name {
            "RedactAction" | "RedactColumn" => Ok(Self::Redact),
            "RemoveAction" | "RemoveColumn" => Ok(Self::Remove),
            other => Err(TransformError::UnknownAction(other.to_string())),
        }
    }

    /// Returns a stable label for the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Redact => "redact",
            Self::Remove => "remove",
        }
    }
}

/// A single governance action over a set of columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTransformation {
    /// Restriction kind.
    pub kind: TransformKind,
    /// Action name as received.
    pub action_name: String,
    /// Columns the action applies to.
    pub columns: Vec<String>,
}

impl From<&PolicyOutcome> for ColumnTransformation {
    fn from(outcome: &PolicyOutcome) -> Self {
        Self {
            kind: TransformKind::Redact,
            action_name: outcome.action.name.clone(),
            columns: outcome.columns().to_vec(),
        }
    }
}

/// Decodes the governance action array.
///
/// # Errors
///
/// Returns [`TransformError`] when the payload is not an array of named
/// actions or names an unsupported action.
pub fn decode_actions(bytes: &[u8]) -> Result<Vec<ColumnTransformation>, TransformError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|err| TransformError::InvalidJson(err.to_string()))?;
    let Value::Array(actions) = value else {
        return Err(TransformError::Malformed("expected an array of actions".to_string()));
    };
    actions.iter().enumerate().map(|(idx, action)| decode_action(idx, action)).collect()
}

/// Decodes one named action.
fn decode_action(idx: usize, action: &Value) -> Result<ColumnTransformation, TransformError> {
    let Value::Object(map) = action else {
        return Err(TransformError::Malformed(format!("action[{idx}] must be an object")));
    };
    let Some(Value::String(name)) = map.get("name") else {
        return Err(TransformError::Malformed(format!("action[{idx}] requires a string name")));
    };
    let kind = TransformKind::from_action_name(name)?;
    let columns = match map.get(name.as_str()).and_then(|args| args.get("columns")) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    TransformError::Malformed(format!("action[{idx}] columns must be strings"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(TransformError::Malformed(format!(
                "action[{idx}] columns must be an array"
            )));
        }
    };
    Ok(ColumnTransformation {
        kind,
        action_name: name.clone(),
        columns,
    })
}

// ============================================================================
// SECTION: Plan
// ============================================================================

/// Merged set of column restrictions for one dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformPlan {
    /// Transformations in the order they were received.
    transformations: Vec<ColumnTransformation>,
}

impl TransformPlan {
    /// Builds a plan from decoded transformations.
    #[must_use]
    pub const fn new(transformations: Vec<ColumnTransformation>) -> Self {
        Self {
            transformations,
        }
    }

    /// Adds a transformation to the plan.
    pub fn push(&mut self, transformation: ColumnTransformation) {
        self.transformations.push(transformation);
    }

    /// Returns the transformations in the plan.
    #[must_use]
    pub fn transformations(&self) -> &[ColumnTransformation] {
        &self.transformations
    }

    /// Returns true when the plan restricts nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transformations.iter().all(|t| t.columns.is_empty())
    }

    /// Returns every restricted column once, in first-seen order.
    #[must_use]
    pub fn restricted_columns(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.transformations
            .iter()
            .flat_map(|t| t.columns.iter())
            .filter(|column| seen.insert(column.as_str()))
            .cloned()
            .collect()
    }

    /// Returns true when the column is restricted by any transformation.
    #[must_use]
    pub fn is_restricted(&self, column: &str) -> bool {
        self.transformations.iter().any(|t| t.columns.iter().any(|c| c == column))
    }
}

// ============================================================================
// SECTION: Projection
// ============================================================================

/// Returns the table columns left visible by the plan, in table order.
#[must_use]
pub fn visible_columns(table_columns: &[String], plan: &TransformPlan) -> Vec<String> {
    table_columns.iter().filter(|column| !plan.is_restricted(column)).cloned().collect()
}

/// Builds the projection query for a virtual dataset.
///
/// Returns `None` when every column is restricted.
#[must_use]
pub fn projection_query(
    table: &CatalogPath,
    table_columns: &[String],
    plan: &TransformPlan,
) -> Option<String> {
    let visible = visible_columns(table_columns, plan);
    if visible.is_empty() {
        return None;
    }
    let select_list =
        visible.iter().map(|column| quote_identifier(column)).collect::<Vec<_>>().join(", ");
    Some(format!("SELECT {select_list} FROM {}", table.sql_reference()))
}

/// Double-quotes a SQL identifier.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests;
