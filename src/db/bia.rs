use chrono::Utc;

use super::models::{DbAsset, DbDependency, DbProcess};
use super::sqlite::GrcStorage;
use crate::error::NexusError;
use crate::service::bia_analysis::DependencyGraph;
use crate::types::bia::{CreateAsset, CreateDependency, CreateProcess, UpdateProcess};

const PROCESS_COLUMNS: &str = "id, organization_id, name, description, owner_id, criticality, \
     rto_hours, rpo_hours, mtpd_hours, hourly_downtime_cost, created_at";
const ASSET_COLUMNS: &str =
    "id, organization_id, name, asset_type, rto_hours, rpo_hours, hourly_cost, created_at";

impl GrcStorage {
    pub async fn create_process(
        &self,
        org: i64,
        input: CreateProcess,
    ) -> Result<DbProcess, NexusError> {
        let sql = format!(
            "INSERT INTO business_processes (organization_id, name, description, owner_id, \
             criticality, rto_hours, rpo_hours, mtpd_hours, hourly_downtime_cost, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {PROCESS_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DbProcess>(&sql)
            .bind(org)
            .bind(input.name.trim())
            .bind(input.description)
            .bind(input.owner_id)
            .bind(input.criticality)
            .bind(input.rto_hours)
            .bind(input.rpo_hours)
            .bind(input.mtpd_hours)
            .bind(input.hourly_downtime_cost)
            .bind(Utc::now())
            .fetch_one(self.pool())
            .await?;
        Ok(row)
    }

    pub async fn list_processes(&self, org: i64) -> Result<Vec<DbProcess>, NexusError> {
        let sql = format!(
            "SELECT {PROCESS_COLUMNS} FROM business_processes WHERE organization_id = ? ORDER BY id"
        );
        let rows = sqlx::query_as::<_, DbProcess>(&sql)
            .bind(org)
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    pub async fn get_process(&self, org: i64, id: i64) -> Result<DbProcess, NexusError> {
        let sql = format!(
            "SELECT {PROCESS_COLUMNS} FROM business_processes WHERE id = ? AND organization_id = ?"
        );
        sqlx::query_as::<_, DbProcess>(&sql)
            .bind(id)
            .bind(org)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| NexusError::not_found("business process", id))
    }

    pub async fn update_process(
        &self,
        org: i64,
        id: i64,
        changes: UpdateProcess,
    ) -> Result<DbProcess, NexusError> {
        let mut process = self.get_process(org, id).await?;
        if let Some(name) = changes.name {
            process.name = name.trim().to_string();
        }
        if changes.description.is_some() {
            process.description = changes.description;
        }
        if changes.owner_id.is_some() {
            process.owner_id = changes.owner_id;
        }
        if let Some(criticality) = changes.criticality {
            process.criticality = criticality;
        }
        if let Some(rto) = changes.rto_hours {
            process.rto_hours = rto;
        }
        if let Some(rpo) = changes.rpo_hours {
            process.rpo_hours = rpo;
        }
        if changes.mtpd_hours.is_some() {
            process.mtpd_hours = changes.mtpd_hours;
        }
        if let Some(cost) = changes.hourly_downtime_cost {
            process.hourly_downtime_cost = cost;
        }

        sqlx::query(
            r#"UPDATE business_processes SET
                name = ?,
                description = ?,
                owner_id = ?,
                criticality = ?,
                rto_hours = ?,
                rpo_hours = ?,
                mtpd_hours = ?,
                hourly_downtime_cost = ?
              WHERE id = ? AND organization_id = ?"#,
        )
        .bind(&process.name)
        .bind(&process.description)
        .bind(process.owner_id)
        .bind(process.criticality)
        .bind(process.rto_hours)
        .bind(process.rpo_hours)
        .bind(process.mtpd_hours)
        .bind(process.hourly_downtime_cost)
        .bind(id)
        .bind(org)
        .execute(self.pool())
        .await?;
        Ok(process)
    }

    pub async fn delete_process(&self, org: i64, id: i64) -> Result<(), NexusError> {
        let res =
            sqlx::query("DELETE FROM business_processes WHERE id = ? AND organization_id = ?")
                .bind(id)
                .bind(org)
                .execute(self.pool())
                .await?;
        if res.rows_affected() == 0 {
            return Err(NexusError::not_found("business process", id));
        }
        Ok(())
    }

    pub async fn create_asset(&self, org: i64, input: CreateAsset) -> Result<DbAsset, NexusError> {
        let sql = format!(
            "INSERT INTO assets (organization_id, name, asset_type, rto_hours, rpo_hours, \
             hourly_cost, created_at) VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {ASSET_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DbAsset>(&sql)
            .bind(org)
            .bind(input.name.trim())
            .bind(input.asset_type)
            .bind(input.rto_hours)
            .bind(input.rpo_hours)
            .bind(input.hourly_cost)
            .bind(Utc::now())
            .fetch_one(self.pool())
            .await?;
        Ok(row)
    }

    pub async fn list_assets(&self, org: i64) -> Result<Vec<DbAsset>, NexusError> {
        let sql =
            format!("SELECT {ASSET_COLUMNS} FROM assets WHERE organization_id = ? ORDER BY id");
        let rows = sqlx::query_as::<_, DbAsset>(&sql)
            .bind(org)
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    async fn get_asset(&self, org: i64, id: i64) -> Result<DbAsset, NexusError> {
        let sql =
            format!("SELECT {ASSET_COLUMNS} FROM assets WHERE id = ? AND organization_id = ?");
        sqlx::query_as::<_, DbAsset>(&sql)
            .bind(id)
            .bind(org)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| NexusError::not_found("asset", id))
    }

    pub async fn delete_asset(&self, org: i64, id: i64) -> Result<(), NexusError> {
        let res = sqlx::query("DELETE FROM assets WHERE id = ? AND organization_id = ?")
            .bind(id)
            .bind(org)
            .execute(self.pool())
            .await?;
        if res.rows_affected() == 0 {
            return Err(NexusError::not_found("asset", id));
        }
        Ok(())
    }

    /// Both ends must belong to `org`; duplicates are rejected by the
    /// partial unique indexes and surface as a conflict.
    pub async fn create_dependency(
        &self,
        org: i64,
        process_id: i64,
        input: CreateDependency,
    ) -> Result<DbDependency, NexusError> {
        input.validate(process_id)?;
        self.get_process(org, process_id).await?;
        if let Some(upstream) = input.process_id {
            self.get_process(org, upstream).await?;
        }
        if let Some(asset) = input.asset_id {
            self.get_asset(org, asset).await?;
        }
        let row = sqlx::query_as::<_, DbDependency>(
            r#"INSERT INTO process_dependencies
                   (process_id, depends_on_process_id, depends_on_asset_id, notes)
               VALUES (?, ?, ?, ?)
               RETURNING id, process_id, depends_on_process_id, depends_on_asset_id, notes"#,
        )
        .bind(process_id)
        .bind(input.process_id)
        .bind(input.asset_id)
        .bind(input.notes)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn list_dependencies(
        &self,
        org: i64,
        process_id: i64,
    ) -> Result<Vec<DbDependency>, NexusError> {
        self.get_process(org, process_id).await?;
        let rows = sqlx::query_as::<_, DbDependency>(
            r#"SELECT id, process_id, depends_on_process_id, depends_on_asset_id, notes
               FROM process_dependencies WHERE process_id = ? ORDER BY id"#,
        )
        .bind(process_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn delete_dependency(&self, org: i64, id: i64) -> Result<(), NexusError> {
        let res = sqlx::query(
            r#"DELETE FROM process_dependencies
               WHERE id = ? AND process_id IN
                   (SELECT id FROM business_processes WHERE organization_id = ?)"#,
        )
        .bind(id)
        .bind(org)
        .execute(self.pool())
        .await?;
        if res.rows_affected() == 0 {
            return Err(NexusError::not_found("dependency", id));
        }
        Ok(())
    }

    /// Load the organisation's processes, assets and dependency edges.
    pub async fn load_dependency_graph(&self, org: i64) -> Result<DependencyGraph, NexusError> {
        let (processes, assets, edges) = futures::try_join!(
            self.list_processes(org),
            self.list_assets(org),
            self.list_org_dependencies(org),
        )?;

        let mut graph = DependencyGraph::new();
        for process in processes {
            graph.add_process(process.into());
        }
        for asset in assets {
            graph.add_asset(asset.into());
        }
        for edge in edges {
            if let Some(target) = edge.target() {
                graph.add_dependency(edge.process_id, target);
            }
        }
        Ok(graph)
    }

    async fn list_org_dependencies(&self, org: i64) -> Result<Vec<DbDependency>, NexusError> {
        let rows = sqlx::query_as::<_, DbDependency>(
            r#"SELECT d.id, d.process_id, d.depends_on_process_id, d.depends_on_asset_id, d.notes
               FROM process_dependencies d
               JOIN business_processes p ON p.id = d.process_id
               WHERE p.organization_id = ? ORDER BY d.id"#,
        )
        .bind(org)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }
}
