use chrono::Utc;

use super::models::DbPolicy;
use super::sqlite::GrcStorage;
use crate::error::NexusError;
use crate::types::policy::{CreatePolicy, PolicyStatus, TransitionEffect, UpdatePolicy};

const POLICY_COLUMNS: &str = "id, organization_id, title, category, content, status, version, \
     owner_id, review_date, approved_at, created_at, updated_at";

impl GrcStorage {
    pub async fn create_policy(&self, org: i64, input: CreatePolicy) -> Result<DbPolicy, NexusError> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO policies (organization_id, title, category, content, status, version, \
             owner_id, review_date, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, 1, ?, ?, ?, ?) RETURNING {POLICY_COLUMNS}"
        );
        let policy = sqlx::query_as::<_, DbPolicy>(&sql)
            .bind(org)
            .bind(input.title.trim())
            .bind(input.category)
            .bind(input.content)
            .bind(PolicyStatus::Draft)
            .bind(input.owner_id)
            .bind(input.review_date)
            .bind(now)
            .bind(now)
            .fetch_one(self.pool())
            .await?;
        Ok(policy)
    }

    pub async fn list_policies(
        &self,
        org: i64,
        status: Option<PolicyStatus>,
    ) -> Result<Vec<DbPolicy>, NexusError> {
        let sql = format!(
            "SELECT {POLICY_COLUMNS} FROM policies \
             WHERE organization_id = ? AND (? IS NULL OR status = ?) ORDER BY id"
        );
        let rows = sqlx::query_as::<_, DbPolicy>(&sql)
            .bind(org)
            .bind(status)
            .bind(status)
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    pub async fn get_policy(&self, org: i64, id: i64) -> Result<DbPolicy, NexusError> {
        let sql =
            format!("SELECT {POLICY_COLUMNS} FROM policies WHERE id = ? AND organization_id = ?");
        sqlx::query_as::<_, DbPolicy>(&sql)
            .bind(id)
            .bind(org)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| NexusError::not_found("policy", id))
    }

    pub async fn update_policy(
        &self,
        org: i64,
        id: i64,
        changes: UpdatePolicy,
    ) -> Result<DbPolicy, NexusError> {
        let mut policy = self.get_policy(org, id).await?;
        if let Some(content) = changes.content {
            if !policy.status.content_editable() && content != policy.content {
                return Err(NexusError::conflict(format!(
                    "policy {id} is {}; move it back to draft before editing content",
                    policy.status.as_str()
                )));
            }
            policy.content = content;
        }
        if let Some(title) = changes.title {
            policy.title = title.trim().to_string();
        }
        if changes.category.is_some() {
            policy.category = changes.category;
        }
        if changes.owner_id.is_some() {
            policy.owner_id = changes.owner_id;
        }
        if changes.review_date.is_some() {
            policy.review_date = changes.review_date;
        }
        policy.updated_at = Utc::now();
        self.save_policy(&policy).await?;
        Ok(policy)
    }

    /// Apply a lifecycle transition; see [`PolicyStatus::transition`].
    pub async fn transition_policy(
        &self,
        org: i64,
        id: i64,
        to: PolicyStatus,
    ) -> Result<DbPolicy, NexusError> {
        let mut policy = self.get_policy(org, id).await?;
        let now = Utc::now();
        match policy.status.transition(to)? {
            TransitionEffect::None => {}
            TransitionEffect::Approve => policy.approved_at = Some(now),
            TransitionEffect::NewRevision => {
                policy.version += 1;
                policy.approved_at = None;
            }
        }
        policy.status = to;
        policy.updated_at = now;
        self.save_policy(&policy).await?;
        Ok(policy)
    }

    pub async fn delete_policy(&self, org: i64, id: i64) -> Result<(), NexusError> {
        let res = sqlx::query("DELETE FROM policies WHERE id = ? AND organization_id = ?")
            .bind(id)
            .bind(org)
            .execute(self.pool())
            .await?;
        if res.rows_affected() == 0 {
            return Err(NexusError::not_found("policy", id));
        }
        Ok(())
    }

    async fn save_policy(&self, policy: &DbPolicy) -> Result<(), NexusError> {
        sqlx::query(
            r#"UPDATE policies SET
                title = ?,
                category = ?,
                content = ?,
                status = ?,
                version = ?,
                owner_id = ?,
                review_date = ?,
                approved_at = ?,
                updated_at = ?
              WHERE id = ? AND organization_id = ?"#,
        )
        .bind(&policy.title)
        .bind(&policy.category)
        .bind(&policy.content)
        .bind(policy.status)
        .bind(policy.version)
        .bind(policy.owner_id)
        .bind(policy.review_date)
        .bind(policy.approved_at)
        .bind(policy.updated_at)
        .bind(policy.id)
        .bind(policy.organization_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
