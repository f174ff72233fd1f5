//! Rule repository port: the rule store the dispatcher reads from.

use std::future::Future;
use std::sync::Arc;

use hearth_domain::error::HearthError;
use hearth_domain::id::{HouseholdId, RuleId};
use hearth_domain::rule::Rule;

/// Repository for persisting and querying [`Rule`]s.
///
/// The engine only calls [`find_enabled_for_event`](Self::find_enabled_for_event);
/// the remaining methods serve the administrative surface.
pub trait RuleRepository {
    /// Enabled rules of `household_id` that list `event_type` as a trigger,
    /// ordered by creation time (oldest first, ties in insertion order).
    fn find_enabled_for_event(
        &self,
        household_id: HouseholdId,
        event_type: &str,
    ) -> impl Future<Output = Result<Vec<Rule>, HearthError>> + Send;

    /// Create a new rule in storage.
    fn create(&self, rule: Rule) -> impl Future<Output = Result<Rule, HearthError>> + Send;

    /// Get a rule by its unique identifier.
    fn get_by_id(
        &self,
        id: RuleId,
    ) -> impl Future<Output = Result<Option<Rule>, HearthError>> + Send;

    /// All rules of a household, in creation order.
    fn list_for_household(
        &self,
        household_id: HouseholdId,
    ) -> impl Future<Output = Result<Vec<Rule>, HearthError>> + Send;

    /// Update an existing rule.
    fn update(&self, rule: Rule) -> impl Future<Output = Result<Rule, HearthError>> + Send;

    /// Delete a rule by its unique identifier.
    fn delete(&self, id: RuleId) -> impl Future<Output = Result<(), HearthError>> + Send;
}

impl<T: RuleRepository + Send + Sync> RuleRepository for Arc<T> {
    fn find_enabled_for_event(
        &self,
        household_id: HouseholdId,
        event_type: &str,
    ) -> impl Future<Output = Result<Vec<Rule>, HearthError>> + Send {
        (**self).find_enabled_for_event(household_id, event_type)
    }

    fn create(&self, rule: Rule) -> impl Future<Output = Result<Rule, HearthError>> + Send {
        (**self).create(rule)
    }

    fn get_by_id(
        &self,
        id: RuleId,
    ) -> impl Future<Output = Result<Option<Rule>, HearthError>> + Send {
        (**self).get_by_id(id)
    }

    fn list_for_household(
        &self,
        household_id: HouseholdId,
    ) -> impl Future<Output = Result<Vec<Rule>, HearthError>> + Send {
        (**self).list_for_household(household_id)
    }

    fn update(&self, rule: Rule) -> impl Future<Output = Result<Rule, HearthError>> + Send {
        (**self).update(rule)
    }

    fn delete(&self, id: RuleId) -> impl Future<Output = Result<(), HearthError>> + Send {
        (**self).delete(id)
    }
}
