use chrono::Utc;

use super::models::{DbControl, DbRisk, DbUniverseEntry};
use super::sqlite::GrcStorage;
use crate::error::NexusError;
use crate::types::risk::{CreateRisk, CreateUniverseEntry, RiskStatus, UpdateRisk};

const RISK_COLUMNS: &str = "id, organization_id, universe_id, title, description, category, \
     likelihood, impact, residual_likelihood, residual_impact, status, treatment, owner_id, \
     created_at, updated_at";

impl GrcStorage {
    pub async fn create_universe_entry(
        &self,
        org: i64,
        input: CreateUniverseEntry,
    ) -> Result<DbUniverseEntry, NexusError> {
        let row = sqlx::query_as::<_, DbUniverseEntry>(
            r#"INSERT INTO risk_universe (organization_id, category, name, description)
               VALUES (?, ?, ?, ?)
               RETURNING id, organization_id, category, name, description"#,
        )
        .bind(org)
        .bind(input.category.trim())
        .bind(input.name.trim())
        .bind(input.description)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn list_universe(&self, org: i64) -> Result<Vec<DbUniverseEntry>, NexusError> {
        let rows = sqlx::query_as::<_, DbUniverseEntry>(
            r#"SELECT id, organization_id, category, name, description
               FROM risk_universe WHERE organization_id = ? ORDER BY category, name"#,
        )
        .bind(org)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    async fn get_universe_entry(&self, org: i64, id: i64) -> Result<DbUniverseEntry, NexusError> {
        sqlx::query_as::<_, DbUniverseEntry>(
            r#"SELECT id, organization_id, category, name, description
               FROM risk_universe WHERE id = ? AND organization_id = ?"#,
        )
        .bind(id)
        .bind(org)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| NexusError::not_found("risk universe entry", id))
    }

    /// A risk created from a universe entry inherits its category unless
    /// one is given explicitly.
    pub async fn create_risk(&self, org: i64, input: CreateRisk) -> Result<DbRisk, NexusError> {
        let mut category = input.category;
        if let Some(universe_id) = input.universe_id {
            let entry = self.get_universe_entry(org, universe_id).await?;
            category.get_or_insert(entry.category);
        }

        let now = Utc::now();
        let sql = format!(
            "INSERT INTO risks (organization_id, universe_id, title, description, category, \
             likelihood, impact, residual_likelihood, residual_impact, status, treatment, owner_id, \
             created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {RISK_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DbRisk>(&sql)
            .bind(org)
            .bind(input.universe_id)
            .bind(input.title.trim())
            .bind(input.description)
            .bind(category)
            .bind(input.likelihood)
            .bind(input.impact)
            .bind(input.residual_likelihood)
            .bind(input.residual_impact)
            .bind(input.status.unwrap_or(RiskStatus::Identified))
            .bind(input.treatment)
            .bind(input.owner_id)
            .bind(now)
            .bind(now)
            .fetch_one(self.pool())
            .await?;
        Ok(row)
    }

    pub async fn list_risks(
        &self,
        org: i64,
        status: Option<RiskStatus>,
    ) -> Result<Vec<DbRisk>, NexusError> {
        let sql = format!(
            "SELECT {RISK_COLUMNS} FROM risks \
             WHERE organization_id = ? AND (? IS NULL OR status = ?) \
             ORDER BY likelihood * impact DESC, id"
        );
        let rows = sqlx::query_as::<_, DbRisk>(&sql)
            .bind(org)
            .bind(status)
            .bind(status)
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    pub async fn get_risk(&self, org: i64, id: i64) -> Result<DbRisk, NexusError> {
        let sql = format!("SELECT {RISK_COLUMNS} FROM risks WHERE id = ? AND organization_id = ?");
        sqlx::query_as::<_, DbRisk>(&sql)
            .bind(id)
            .bind(org)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| NexusError::not_found("risk", id))
    }

    pub async fn update_risk(
        &self,
        org: i64,
        id: i64,
        changes: UpdateRisk,
    ) -> Result<DbRisk, NexusError> {
        let mut risk = self.get_risk(org, id).await?;
        if let Some(title) = changes.title {
            risk.title = title.trim().to_string();
        }
        if changes.description.is_some() {
            risk.description = changes.description;
        }
        if changes.category.is_some() {
            risk.category = changes.category;
        }
        if let Some(v) = changes.likelihood {
            risk.likelihood = v;
        }
        if let Some(v) = changes.impact {
            risk.impact = v;
        }
        if changes.residual_likelihood.is_some() {
            risk.residual_likelihood = changes.residual_likelihood;
        }
        if changes.residual_impact.is_some() {
            risk.residual_impact = changes.residual_impact;
        }
        if let Some(status) = changes.status {
            risk.status = status;
        }
        if changes.treatment.is_some() {
            risk.treatment = changes.treatment;
        }
        if changes.owner_id.is_some() {
            risk.owner_id = changes.owner_id;
        }
        risk.updated_at = Utc::now();

        sqlx::query(
            r#"UPDATE risks SET
                title = ?,
                description = ?,
                category = ?,
                likelihood = ?,
                impact = ?,
                residual_likelihood = ?,
                residual_impact = ?,
                status = ?,
                treatment = ?,
                owner_id = ?,
                updated_at = ?
              WHERE id = ? AND organization_id = ?"#,
        )
        .bind(&risk.title)
        .bind(&risk.description)
        .bind(&risk.category)
        .bind(risk.likelihood)
        .bind(risk.impact)
        .bind(risk.residual_likelihood)
        .bind(risk.residual_impact)
        .bind(risk.status)
        .bind(risk.treatment)
        .bind(risk.owner_id)
        .bind(risk.updated_at)
        .bind(id)
        .bind(org)
        .execute(self.pool())
        .await?;
        Ok(risk)
    }

    pub async fn delete_risk(&self, org: i64, id: i64) -> Result<(), NexusError> {
        let res = sqlx::query("DELETE FROM risks WHERE id = ? AND organization_id = ?")
            .bind(id)
            .bind(org)
            .execute(self.pool())
            .await?;
        if res.rows_affected() == 0 {
            return Err(NexusError::not_found("risk", id));
        }
        Ok(())
    }

    /// Idempotent: linking twice leaves one link.
    pub async fn link_risk_control(
        &self,
        org: i64,
        risk_id: i64,
        control_id: i64,
    ) -> Result<(), NexusError> {
        self.get_risk(org, risk_id).await?;
        self.get_control(org, control_id).await?;
        sqlx::query("INSERT OR IGNORE INTO risk_controls (risk_id, control_id) VALUES (?, ?)")
            .bind(risk_id)
            .bind(control_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn unlink_risk_control(
        &self,
        org: i64,
        risk_id: i64,
        control_id: i64,
    ) -> Result<(), NexusError> {
        self.get_risk(org, risk_id).await?;
        let res = sqlx::query("DELETE FROM risk_controls WHERE risk_id = ? AND control_id = ?")
            .bind(risk_id)
            .bind(control_id)
            .execute(self.pool())
            .await?;
        if res.rows_affected() == 0 {
            return Err(NexusError::not_found("risk control link", control_id));
        }
        Ok(())
    }

    pub async fn list_risk_controls(&self, risk_id: i64) -> Result<Vec<DbControl>, NexusError> {
        let rows = sqlx::query_as::<_, DbControl>(
            r#"SELECT c.id, c.domain_id, c.code, c.title, c.description,
                      c.implementation_status, c.owner_id
               FROM controls c JOIN risk_controls rc ON rc.control_id = c.id
               WHERE rc.risk_id = ? ORDER BY c.code"#,
        )
        .bind(risk_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}
