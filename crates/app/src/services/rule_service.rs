//! Rule service: use-cases for managing household rules.

use std::sync::Arc;

use hearth_domain::error::{HearthError, NotFoundError};
use hearth_domain::id::{HouseholdId, RuleId};
use hearth_domain::rule::Rule;

use crate::actions::ActionRegistry;
use crate::ports::RuleRepository;

/// Application service for rule CRUD operations.
///
/// Besides the rule's own invariants, every action a rule lists must be
/// registered and its params must satisfy the action's typed contract, so a
/// misconfigured rule is rejected here instead of failing every job later.
pub struct RuleService<R> {
    repo: R,
    registry: Arc<ActionRegistry>,
}

impl<R: RuleRepository> RuleService<R> {
    /// Create a new service backed by the given repository.
    pub fn new(repo: R, registry: Arc<ActionRegistry>) -> Self {
        Self { repo, registry }
    }

    /// Create a new rule after validating it.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if invariants fail or an action is
    /// unknown or misconfigured, or a storage error from the repository.
    #[tracing::instrument(skip(self, rule), fields(rule_name = %rule.name, household_id = %rule.household_id))]
    pub async fn create_rule(&self, rule: Rule) -> Result<Rule, HearthError> {
        self.check(&rule)?;
        self.repo.create(rule).await
    }

    /// Look up a rule by id, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::NotFound`] when no rule with `id` exists,
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn get_rule(&self, id: RuleId) -> Result<Rule, HearthError> {
        self.repo.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Rule",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// List the rules of a household.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_rules(&self, household_id: HouseholdId) -> Result<Vec<Rule>, HearthError> {
        self.repo.list_for_household(household_id).await
    }

    /// Replace an existing rule's definition.
    ///
    /// Ownership and creation time are kept from the stored rule.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::NotFound`] for unknown ids,
    /// [`HearthError::Validation`] as for [`create_rule`](Self::create_rule),
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self, rule), fields(rule_id = %rule.id))]
    pub async fn update_rule(&self, mut rule: Rule) -> Result<Rule, HearthError> {
        let current = self.get_rule(rule.id).await?;
        rule.household_id = current.household_id;
        rule.created_at = current.created_at;
        self.check(&rule)?;
        self.repo.update(rule).await
    }

    /// Enable or disable a rule. Disabled rules stop producing jobs; jobs
    /// already enqueued are unaffected.
    ///
    /// # Errors
    ///
    /// Same as [`update_rule`](Self::update_rule).
    #[tracing::instrument(skip(self))]
    pub async fn set_enabled(&self, id: RuleId, enabled: bool) -> Result<Rule, HearthError> {
        let mut rule = self.get_rule(id).await?;
        rule.enabled = enabled;
        self.update_rule(rule).await
    }

    /// Delete a rule by id.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::NotFound`] for unknown ids, or a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn delete_rule(&self, id: RuleId) -> Result<(), HearthError> {
        self.repo.delete(id).await
    }

    fn check(&self, rule: &Rule) -> Result<(), HearthError> {
        rule.validate()?;
        for action in &rule.actions {
            self.registry
                .validate_params(&action.name, &action.params)
                .map_err(|err| err.into_validation(&action.name))?;
        }
        Ok(())
    }
}
