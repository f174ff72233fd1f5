//! Rule: event types → ordered list of actions, owned by a household.
//!
//! Rules are written by the household's administrative surface and are
//! read-only to the engine. A rule matches a [`DomainEvent`] when it is
//! enabled, belongs to the same household, and lists the event's type among
//! its triggers (exact string membership, no patterns).

mod action_spec;

pub use action_spec::ActionSpec;

use serde::{Deserialize, Serialize};

use crate::error::{HearthError, ValidationError};
use crate::event::DomainEvent;
use crate::id::{HouseholdId, RuleId};
use crate::time::{Timestamp, now};

/// A stored mapping from event types to the actions they schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub household_id: HouseholdId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub enabled: bool,
    /// Event types that activate the rule; ordered, without duplicates.
    pub triggers: Vec<String>,
    /// Actions scheduled for each matching event, in order.
    pub actions: Vec<ActionSpec>,
    pub created_at: Timestamp,
}

impl Rule {
    /// Create a builder for constructing a [`Rule`].
    #[must_use]
    pub fn builder() -> RuleBuilder {
        RuleBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - `actions` is empty ([`ValidationError::NoActions`])
    /// - an action has an empty name ([`ValidationError::EmptyActionName`])
    /// - a trigger is blank ([`ValidationError::EmptyTrigger`])
    /// - the rule is enabled without triggers ([`ValidationError::NoTriggers`])
    pub fn validate(&self) -> Result<(), HearthError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if self.actions.is_empty() {
            return Err(ValidationError::NoActions.into());
        }
        if self.actions.iter().any(|a| a.name.trim().is_empty()) {
            return Err(ValidationError::EmptyActionName.into());
        }
        if self.triggers.iter().any(|t| t.trim().is_empty()) {
            return Err(ValidationError::EmptyTrigger.into());
        }
        if self.enabled && self.triggers.is_empty() {
            return Err(ValidationError::NoTriggers.into());
        }
        Ok(())
    }

    /// Whether this rule schedules work for `event`.
    #[must_use]
    pub fn matches(&self, event: &DomainEvent) -> bool {
        self.enabled
            && self.household_id == event.household_id
            && self.triggers.iter().any(|t| *t == event.event_type)
    }
}

/// Step-by-step builder for [`Rule`].
#[derive(Debug, Default)]
pub struct RuleBuilder {
    id: Option<RuleId>,
    household_id: Option<HouseholdId>,
    name: Option<String>,
    description: Option<String>,
    enabled: Option<bool>,
    triggers: Vec<String>,
    actions: Vec<ActionSpec>,
    created_at: Option<Timestamp>,
}

impl RuleBuilder {
    #[must_use]
    pub fn id(mut self, id: RuleId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn household_id(mut self, household_id: HouseholdId) -> Self {
        self.household_id = Some(household_id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Add a trigger event type. Repeated types are kept once.
    #[must_use]
    pub fn trigger(mut self, event_type: impl Into<String>) -> Self {
        let event_type = event_type.into();
        if !self.triggers.contains(&event_type) {
            self.triggers.push(event_type);
        }
        self
    }

    #[must_use]
    pub fn action(mut self, name: impl Into<String>, params: serde_json::Value) -> Self {
        self.actions.push(ActionSpec::new(name, params));
        self
    }

    #[must_use]
    pub fn action_spec(mut self, spec: ActionSpec) -> Self {
        self.actions.push(spec);
        self
    }

    #[must_use]
    pub fn created_at(mut self, ts: Timestamp) -> Self {
        self.created_at = Some(ts);
        self
    }

    /// Consume the builder, validate, and return a [`Rule`].
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if required fields are missing or empty.
    pub fn build(self) -> Result<Rule, HearthError> {
        let rule = Rule {
            id: self.id.unwrap_or_default(),
            household_id: self.household_id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            description: self.description,
            enabled: self.enabled.unwrap_or(true),
            triggers: self.triggers,
            actions: self.actions,
            created_at: self.created_at.unwrap_or_else(now),
        };
        rule.validate()?;
        Ok(rule)
    }
}
