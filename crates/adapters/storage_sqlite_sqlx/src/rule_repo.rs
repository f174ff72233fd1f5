//! `SQLite` implementation of [`RuleRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use hearth_app::ports::RuleRepository;
use hearth_domain::error::{HearthError, NotFoundError};
use hearth_domain::id::{HouseholdId, RuleId};
use hearth_domain::rule::{ActionSpec, Rule};

use crate::codec;
use crate::error::StorageError;

struct Wrapper(Rule);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Rule> {
        value.map(|w| w.0)
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: uuid::Uuid = row.try_get("id")?;
        let household_id: uuid::Uuid = row.try_get("household_id")?;
        let triggers: String = row.try_get("triggers")?;
        let actions: String = row.try_get("actions")?;
        let created_at: String = row.try_get("created_at")?;

        let triggers: Vec<String> = codec::parse_json(&triggers)?;
        let actions: Vec<ActionSpec> = codec::parse_json(&actions)?;

        Ok(Self(Rule {
            id: RuleId::from_uuid(id),
            household_id: HouseholdId::from_uuid(household_id),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            enabled: row.try_get("enabled")?,
            triggers,
            actions,
            created_at: codec::parse_timestamp(&created_at)?,
        }))
    }
}

const INSERT: &str = r"
    INSERT INTO rules (id, household_id, name, description, enabled, triggers, actions, created_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
";

const UPDATE: &str = r"
    UPDATE rules
    SET name = ?, description = ?, enabled = ?, triggers = ?, actions = ?
    WHERE id = ?
";

const SELECT_MATCHING: &str = r"
    SELECT * FROM rules
    WHERE household_id = ?
      AND enabled = 1
      AND EXISTS (SELECT 1 FROM json_each(rules.triggers) WHERE json_each.value = ?)
    ORDER BY created_at, rowid
";

const SELECT_BY_ID: &str = "SELECT * FROM rules WHERE id = ?";
const SELECT_BY_HOUSEHOLD: &str =
    "SELECT * FROM rules WHERE household_id = ? ORDER BY created_at, rowid";
const DELETE: &str = "DELETE FROM rules WHERE id = ?";

/// `SQLite`-backed rule store.
pub struct SqliteRuleRepository {
    pool: SqlitePool,
}

impl SqliteRuleRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn not_found(id: RuleId) -> HearthError {
    NotFoundError {
        entity: "Rule",
        id: id.to_string(),
    }
    .into()
}

impl RuleRepository for SqliteRuleRepository {
    async fn find_enabled_for_event(
        &self,
        household_id: HouseholdId,
        event_type: &str,
    ) -> Result<Vec<Rule>, HearthError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_MATCHING)
            .bind(household_id.as_uuid())
            .bind(event_type)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn create(&self, rule: Rule) -> Result<Rule, HearthError> {
        let triggers = serde_json::to_string(&rule.triggers).map_err(StorageError::from)?;
        let actions = serde_json::to_string(&rule.actions).map_err(StorageError::from)?;

        sqlx::query(INSERT)
            .bind(rule.id.as_uuid())
            .bind(rule.household_id.as_uuid())
            .bind(&rule.name)
            .bind(&rule.description)
            .bind(rule.enabled)
            .bind(&triggers)
            .bind(&actions)
            .bind(codec::timestamp(rule.created_at))
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rule)
    }

    async fn get_by_id(&self, id: RuleId) -> Result<Option<Rule>, HearthError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BY_ID)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Wrapper::maybe(row))
    }

    async fn list_for_household(&self, household_id: HouseholdId) -> Result<Vec<Rule>, HearthError> {
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_BY_HOUSEHOLD)
            .bind(household_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn update(&self, rule: Rule) -> Result<Rule, HearthError> {
        let triggers = serde_json::to_string(&rule.triggers).map_err(StorageError::from)?;
        let actions = serde_json::to_string(&rule.actions).map_err(StorageError::from)?;

        let result = sqlx::query(UPDATE)
            .bind(&rule.name)
            .bind(&rule.description)
            .bind(rule.enabled)
            .bind(&triggers)
            .bind(&actions)
            .bind(rule.id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            return Err(not_found(rule.id));
        }
        Ok(rule)
    }

    async fn delete(&self, id: RuleId) -> Result<(), HearthError> {
        let result = sqlx::query(DELETE)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use hearth_domain::time::now;
    use serde_json::json;

    use super::*;
    use crate::pool::memory_pool;

    async fn setup() -> SqliteRuleRepository {
        SqliteRuleRepository::new(memory_pool().await)
    }

    fn rule(household_id: HouseholdId, name: &str, triggers: &[&str]) -> Rule {
        let mut builder = Rule::builder()
            .household_id(household_id)
            .name(name)
            .action("notify", json!({"title": name}));
        for trigger in triggers {
            builder = builder.trigger(*trigger);
        }
        builder.build().unwrap()
    }

    #[tokio::test]
    async fn should_create_and_retrieve_rule() {
        let repo = setup().await;
        let mut r = rule(HouseholdId::new(), "Bills", &["bill.due_soon", "bill.created"]);
        r.description = Some("Tell everyone".into());
        let id = r.id;

        repo.create(r.clone()).await.unwrap();
        let fetched = repo.get_by_id(id).await.unwrap().unwrap();

        assert_eq!(fetched, r);
    }

    #[tokio::test]
    async fn should_return_none_when_rule_not_found() {
        let repo = setup().await;
        assert!(repo.get_by_id(RuleId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_find_enabled_rules_by_exact_trigger_in_creation_order() {
        let repo = setup().await;
        let hh = HouseholdId::new();
        let start = now();
        let mut second = rule(hh, "second", &["bill.due_soon"]);
        second.created_at = start + TimeDelta::seconds(1);
        let mut first = rule(hh, "first", &["bill.created", "bill.due_soon"]);
        first.created_at = start;
        let mut disabled = rule(hh, "disabled", &["bill.due_soon"]);
        disabled.enabled = false;
        repo.create(second).await.unwrap();
        repo.create(first).await.unwrap();
        repo.create(disabled).await.unwrap();
        repo.create(rule(hh, "prefix", &["bill.due"])).await.unwrap();
        repo.create(rule(HouseholdId::new(), "foreign", &["bill.due_soon"]))
            .await
            .unwrap();

        let found = repo.find_enabled_for_event(hh, "bill.due_soon").await.unwrap();

        let names: Vec<&str> = found.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn should_update_rule() {
        let repo = setup().await;
        let r = rule(HouseholdId::new(), "Bills", &["bill.due_soon"]);
        repo.create(r.clone()).await.unwrap();

        let mut changed = r.clone();
        changed.enabled = false;
        changed.triggers = vec!["bill.paid".into()];
        repo.update(changed).await.unwrap();

        let fetched = repo.get_by_id(r.id).await.unwrap().unwrap();
        assert!(!fetched.enabled);
        assert_eq!(fetched.triggers, vec!["bill.paid".to_string()]);
        assert!(
            repo.find_enabled_for_event(r.household_id, "bill.paid")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn should_return_not_found_when_updating_missing_rule() {
        let repo = setup().await;
        let err = repo
            .update(rule(HouseholdId::new(), "ghost", &["x"]))
            .await
            .unwrap_err();
        assert!(matches!(err, HearthError::NotFound(_)));
    }

    #[tokio::test]
    async fn should_delete_rule() {
        let repo = setup().await;
        let r = rule(HouseholdId::new(), "Bills", &["bill.due_soon"]);
        repo.create(r.clone()).await.unwrap();

        repo.delete(r.id).await.unwrap();

        assert!(repo.get_by_id(r.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(r.id).await,
            Err(HearthError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn should_list_household_rules() {
        let repo = setup().await;
        let hh = HouseholdId::new();
        repo.create(rule(hh, "a", &["x"])).await.unwrap();
        repo.create(rule(hh, "b", &["y"])).await.unwrap();
        repo.create(rule(HouseholdId::new(), "c", &["x"])).await.unwrap();

        assert_eq!(repo.list_for_household(hh).await.unwrap().len(), 2);
    }
}
