// crates/dremio-module-core/src/policy.rs
// ============================================================================
// Module: Sample Finance Policy
// Description: Fixed evaluator for the bundled finance/PII sample rule.
// Purpose: Decide which columns to redact when finance data is read.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The module ships a single sample authorization rule: a `read` action on a
//! resource tagged `finance` yields a redaction action listing every column
//! tagged `PII`. This is a hand-written evaluator for that one rule, not a
//! general policy engine.
//! Invariants:
//! - The rule fires only for `actionType == "read"`, a truthy `finance` tag,
//!   and at least one truthy `PII` column tag.
//! - When it fires, the outcome lists exactly the PII-tagged column names,
//!   in document order, without duplicates.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Action type the sample rule applies to.
pub const READ_ACTION: &str = "read";
/// Resource tag that marks finance data.
pub const FINANCE_TAG: &str = "finance";
/// Column tag that marks personally identifiable information.
pub const PII_TAG: &str = "PII";
/// Action name emitted when the rule fires.
pub const REDACT_ACTION_NAME: &str = "RedactAction";
/// Human-readable description attached to rule outcomes.
pub const SAMPLE_RULE_DESCRIPTION: &str = "Redact PII columns when reading finance data";

// ============================================================================
// SECTION: Input Model
// ============================================================================

/// Tag map attached to resources and columns.
pub type Tags = BTreeMap<String, Value>;

/// Authorization input document evaluated by the sample rule.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PolicyInput {
    /// Requested action.
    #[serde(default)]
    pub action: Action,
    /// Resource being accessed.
    #[serde(default)]
    pub resource: Resource,
}

/// Requested action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Action {
    /// Action type label (for example `read` or `write`).
    #[serde(rename = "actionType", default)]
    pub action_type: String,
}

/// Resource being accessed.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Resource {
    /// Catalog metadata for the resource.
    #[serde(default)]
    pub metadata: ResourceMetadata,
}

/// Catalog metadata describing a resource.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ResourceMetadata {
    /// Resource-level tags.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Tags,
    /// Column descriptors.
    #[serde(default, deserialize_with = "null_as_default")]
    pub columns: Vec<ColumnMetadata>,
}

/// Column descriptor with tags.
///
/// Catalog entries may omit the name or send `null` tags; a nameless column
/// is never listed in an outcome.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ColumnMetadata {
    /// Column name; empty when the catalog entry has none.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Column-level tags.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Tags,
}

/// Reads an optional field, mapping JSON `null` to the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// SECTION: Outcome Model
// ============================================================================

/// Result emitted when the sample rule fires.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PolicyOutcome {
    /// Action to enforce.
    pub action: RedactColumns,
    /// Description of the rule that produced the outcome.
    pub policy: String,
}

/// Redaction action over a set of columns.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RedactColumns {
    /// Action name.
    pub name: String,
    /// Columns to redact.
    pub columns: Vec<String>,
}

impl PolicyOutcome {
    /// Returns the columns the outcome restricts.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.action.columns
    }
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates the sample finance/PII rule.
///
/// Returns `None` when the rule does not fire.
#[must_use]
pub fn evaluate_sample_rule(input: &PolicyInput) -> Option<PolicyOutcome> {
    if input.action.action_type != READ_ACTION {
        return None;
    }
    let metadata = &input.resource.metadata;
    if !tag_is_truthy(&metadata.tags, FINANCE_TAG) {
        return None;
    }
    let mut seen = BTreeSet::new();
    let columns: Vec<String> = metadata
        .columns
        .iter()
        .filter(|column| !column.name.is_empty())
        .filter(|column| tag_is_truthy(&column.tags, PII_TAG))
        .filter(|column| seen.insert(column.name.as_str()))
        .map(|column| column.name.clone())
        .collect();
    if columns.is_empty() {
        return None;
    }
    Some(PolicyOutcome {
        action: RedactColumns {
            name: REDACT_ACTION_NAME.to_string(),
            columns,
        },
        policy: SAMPLE_RULE_DESCRIPTION.to_string(),
    })
}

/// Returns true when the named tag is present and truthy.
fn tag_is_truthy(tags: &Tags, name: &str) -> bool {
    tags.get(name).is_some_and(is_truthy)
}

/// Applies catalog truthiness: tags arrive as booleans or as strings.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => {
            !text.is_empty() && !text.eq_ignore_ascii_case("false") && text != "0"
        }
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
