use chrono::Utc;

use super::models::{DbOrganization, DbUser};
use super::sqlite::GrcStorage;
use crate::error::NexusError;
use crate::types::organization::{CreateOrganization, CreateUser, UpdateOrganization, UserRole};

impl GrcStorage {
    pub async fn create_organization(
        &self,
        input: CreateOrganization,
        default_appetite: i64,
    ) -> Result<DbOrganization, NexusError> {
        let org = sqlx::query_as::<_, DbOrganization>(
            r#"INSERT INTO organizations (name, industry, risk_appetite, created_at)
               VALUES (?, ?, ?, ?)
               RETURNING id, name, industry, risk_appetite, created_at"#,
        )
        .bind(input.name.trim())
        .bind(input.industry)
        .bind(input.risk_appetite.unwrap_or(default_appetite))
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;
        Ok(org)
    }

    pub async fn list_organizations(&self) -> Result<Vec<DbOrganization>, NexusError> {
        let rows = sqlx::query_as::<_, DbOrganization>(
            "SELECT id, name, industry, risk_appetite, created_at FROM organizations ORDER BY id",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn get_organization(&self, id: i64) -> Result<DbOrganization, NexusError> {
        sqlx::query_as::<_, DbOrganization>(
            "SELECT id, name, industry, risk_appetite, created_at FROM organizations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| NexusError::not_found("organization", id))
    }

    pub async fn update_organization(
        &self,
        id: i64,
        changes: UpdateOrganization,
    ) -> Result<DbOrganization, NexusError> {
        let mut org = self.get_organization(id).await?;
        if let Some(name) = changes.name {
            org.name = name.trim().to_string();
        }
        if changes.industry.is_some() {
            org.industry = changes.industry;
        }
        if let Some(appetite) = changes.risk_appetite {
            org.risk_appetite = appetite;
        }
        sqlx::query("UPDATE organizations SET name = ?, industry = ?, risk_appetite = ? WHERE id = ?")
            .bind(&org.name)
            .bind(&org.industry)
            .bind(org.risk_appetite)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(org)
    }

    pub async fn create_user(&self, org: i64, input: CreateUser) -> Result<DbUser, NexusError> {
        let user = sqlx::query_as::<_, DbUser>(
            r#"INSERT INTO users (organization_id, email, name, role, created_at)
               VALUES (?, ?, ?, ?, ?)
               RETURNING id, organization_id, email, name, role, created_at"#,
        )
        .bind(org)
        .bind(input.email.trim().to_ascii_lowercase())
        .bind(input.name.trim())
        .bind(input.role.unwrap_or(UserRole::Contributor))
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;
        Ok(user)
    }

    pub async fn list_users(&self, org: i64) -> Result<Vec<DbUser>, NexusError> {
        let rows = sqlx::query_as::<_, DbUser>(
            r#"SELECT id, organization_id, email, name, role, created_at
               FROM users WHERE organization_id = ? ORDER BY id"#,
        )
        .bind(org)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn delete_user(&self, org: i64, id: i64) -> Result<(), NexusError> {
        let res = sqlx::query("DELETE FROM users WHERE id = ? AND organization_id = ?")
            .bind(id)
            .bind(org)
            .execute(self.pool())
            .await?;
        if res.rows_affected() == 0 {
            return Err(NexusError::not_found("user", id));
        }
        Ok(())
    }

    /// Owners must be members of the organisation that owns the record.
    pub async fn ensure_user(&self, org: i64, user_id: Option<i64>) -> Result<(), NexusError> {
        let Some(user_id) = user_id else {
            return Ok(());
        };
        let found: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM users WHERE id = ? AND organization_id = ?")
                .bind(user_id)
                .bind(org)
                .fetch_optional(self.pool())
                .await?;
        match found {
            Some(_) => Ok(()),
            None => Err(NexusError::validation(format!(
                "owner {user_id} is not a member of this organization"
            ))),
        }
    }
}
