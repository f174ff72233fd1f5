//! Action spec: one `(name, parameters)` slot in a rule's action list.

use serde::{Deserialize, Serialize};

/// A reference to a registered action plus the parameters to run it with.
///
/// The name is resolved against the action registry only when a job runs,
/// so rules can be stored before every action they mention exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpec {
    /// Registered action name, e.g. `"notify"` or `"create_bill"`.
    pub name: String,
    /// Action-specific parameters, validated by the action's typed contract.
    #[serde(default)]
    pub params: serde_json::Value,
}

impl ActionSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

impl std::fmt::Display for ActionSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_params_to_null() {
        let spec: ActionSpec = serde_json::from_value(serde_json::json!({"name": "notify"})).unwrap();
        assert_eq!(spec.name, "notify");
        assert!(spec.params.is_null());
    }

    #[test]
    fn should_display_action_name() {
        let spec = ActionSpec::new("mark_overdue_bills", serde_json::json!({}));
        assert_eq!(spec.to_string(), "mark_overdue_bills");
    }
}
