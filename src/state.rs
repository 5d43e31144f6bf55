//! Opaque per-feature gate state.
//!
//! [`GateValues`] is the unit that read operations return and reconciliation
//! compares. Gate payloads are arbitrary JSON owned by the flag data model;
//! this crate copies and compares them, never interprets them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Gate key → opaque value for one feature.
///
/// # Example
///
/// ```
/// use flagstore::GateValues;
/// use serde_json::json;
///
/// let mut state = GateValues::new();
/// state.set("boolean", json!(true));
/// state.set("groups", json!(["admins"]));
///
/// assert_eq!(state.gate("boolean"), Some(&json!(true)));
/// assert_eq!(state.len(), 2);
/// assert!(state.gate("actors").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GateValues {
    gates: BTreeMap<String, Value>,
}

impl GateValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a gate's value, replacing any previous value for that gate.
    pub fn set(&mut self, gate: impl Into<String>, value: Value) {
        self.gates.insert(gate.into(), value);
    }

    /// Retract a gate entirely, returning its previous value.
    pub fn unset(&mut self, gate: &str) -> Option<Value> {
        self.gates.remove(gate)
    }

    /// The value currently stored for a gate.
    #[must_use]
    pub fn gate(&self, gate: &str) -> Option<&Value> {
        self.gates.get(gate)
    }

    /// Number of gates with a stored value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    /// Iterate gates in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.gates.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Drop every gate value.
    pub fn reset(&mut self) {
        self.gates.clear();
    }
}

impl FromIterator<(String, Value)> for GateValues {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            gates: iter.into_iter().collect(),
        }
    }
}
