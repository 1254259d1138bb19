use std::collections::HashSet;

use chrono::Utc;
use sqlx::{Sqlite, Transaction};

use super::models::{DbRunbook, DbRunbookStep};
use super::sqlite::GrcStorage;
use crate::error::NexusError;
use crate::types::runbook::{CreateRunbook, CreateStep, RunbookStatus, UpdateRunbook, UpdateStep};

const RUNBOOK_COLUMNS: &str =
    "id, organization_id, process_id, title, description, status, created_at, updated_at";
const STEP_COLUMNS: &str =
    "id, runbook_id, position, title, description, owner_role, estimated_minutes";

impl GrcStorage {
    pub async fn create_runbook(
        &self,
        org: i64,
        input: CreateRunbook,
    ) -> Result<DbRunbook, NexusError> {
        if let Some(process_id) = input.process_id {
            self.get_process(org, process_id).await?;
        }
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO runbooks (organization_id, process_id, title, description, status, \
             created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {RUNBOOK_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DbRunbook>(&sql)
            .bind(org)
            .bind(input.process_id)
            .bind(input.title.trim())
            .bind(input.description)
            .bind(input.status.unwrap_or(RunbookStatus::Draft))
            .bind(now)
            .bind(now)
            .fetch_one(self.pool())
            .await?;
        Ok(row)
    }

    pub async fn list_runbooks(&self, org: i64) -> Result<Vec<DbRunbook>, NexusError> {
        let sql =
            format!("SELECT {RUNBOOK_COLUMNS} FROM runbooks WHERE organization_id = ? ORDER BY id");
        let rows = sqlx::query_as::<_, DbRunbook>(&sql)
            .bind(org)
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    pub async fn get_runbook(&self, org: i64, id: i64) -> Result<DbRunbook, NexusError> {
        let sql =
            format!("SELECT {RUNBOOK_COLUMNS} FROM runbooks WHERE id = ? AND organization_id = ?");
        sqlx::query_as::<_, DbRunbook>(&sql)
            .bind(id)
            .bind(org)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| NexusError::not_found("runbook", id))
    }

    pub async fn update_runbook(
        &self,
        org: i64,
        id: i64,
        changes: UpdateRunbook,
    ) -> Result<DbRunbook, NexusError> {
        let mut runbook = self.get_runbook(org, id).await?;
        if let Some(process_id) = changes.process_id {
            self.get_process(org, process_id).await?;
            runbook.process_id = Some(process_id);
        }
        if let Some(title) = changes.title {
            runbook.title = title.trim().to_string();
        }
        if changes.description.is_some() {
            runbook.description = changes.description;
        }
        if let Some(status) = changes.status {
            runbook.status = status;
        }
        runbook.updated_at = Utc::now();

        sqlx::query(
            r#"UPDATE runbooks SET
                process_id = ?,
                title = ?,
                description = ?,
                status = ?,
                updated_at = ?
              WHERE id = ? AND organization_id = ?"#,
        )
        .bind(runbook.process_id)
        .bind(&runbook.title)
        .bind(&runbook.description)
        .bind(runbook.status)
        .bind(runbook.updated_at)
        .bind(id)
        .bind(org)
        .execute(self.pool())
        .await?;
        Ok(runbook)
    }

    pub async fn delete_runbook(&self, org: i64, id: i64) -> Result<(), NexusError> {
        let res = sqlx::query("DELETE FROM runbooks WHERE id = ? AND organization_id = ?")
            .bind(id)
            .bind(org)
            .execute(self.pool())
            .await?;
        if res.rows_affected() == 0 {
            return Err(NexusError::not_found("runbook", id));
        }
        Ok(())
    }

    pub async fn list_steps(
        &self,
        org: i64,
        runbook_id: i64,
    ) -> Result<Vec<DbRunbookStep>, NexusError> {
        self.get_runbook(org, runbook_id).await?;
        let sql = format!(
            "SELECT {STEP_COLUMNS} FROM runbook_steps WHERE runbook_id = ? ORDER BY position"
        );
        let rows = sqlx::query_as::<_, DbRunbookStep>(&sql)
            .bind(runbook_id)
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    /// Append steps after the current last position, all or nothing.
    pub async fn append_steps(
        &self,
        org: i64,
        runbook_id: i64,
        steps: Vec<CreateStep>,
    ) -> Result<Vec<DbRunbookStep>, NexusError> {
        self.get_runbook(org, runbook_id).await?;
        let mut tx = self.begin_write().await?;
        let (last,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(MAX(position), 0) FROM runbook_steps WHERE runbook_id = ?",
        )
        .bind(runbook_id)
        .fetch_one(&mut *tx)
        .await?;

        let sql = format!(
            "INSERT INTO runbook_steps (runbook_id, position, title, description, owner_role, \
             estimated_minutes) VALUES (?, ?, ?, ?, ?, ?) RETURNING {STEP_COLUMNS}"
        );
        let mut created = Vec::with_capacity(steps.len());
        for (offset, step) in steps.into_iter().enumerate() {
            let row = sqlx::query_as::<_, DbRunbookStep>(&sql)
                .bind(runbook_id)
                .bind(last + offset as i64 + 1)
                .bind(step.title.trim())
                .bind(step.description)
                .bind(step.owner_role)
                .bind(step.estimated_minutes)
                .fetch_one(&mut *tx)
                .await?;
            created.push(row);
        }
        touch_runbook(&mut tx, runbook_id).await?;
        tx.commit().await?;
        Ok(created)
    }

    pub async fn add_step(
        &self,
        org: i64,
        runbook_id: i64,
        step: CreateStep,
    ) -> Result<DbRunbookStep, NexusError> {
        self.append_steps(org, runbook_id, vec![step])
            .await?
            .pop()
            .ok_or_else(|| NexusError::not_found("runbook", runbook_id))
    }

    async fn get_step(&self, org: i64, id: i64) -> Result<DbRunbookStep, NexusError> {
        sqlx::query_as::<_, DbRunbookStep>(
            r#"SELECT s.id, s.runbook_id, s.position, s.title, s.description, s.owner_role,
                      s.estimated_minutes
               FROM runbook_steps s JOIN runbooks r ON r.id = s.runbook_id
               WHERE s.id = ? AND r.organization_id = ?"#,
        )
        .bind(id)
        .bind(org)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| NexusError::not_found("runbook step", id))
    }

    pub async fn update_step(
        &self,
        org: i64,
        id: i64,
        changes: UpdateStep,
    ) -> Result<DbRunbookStep, NexusError> {
        let mut step = self.get_step(org, id).await?;
        if let Some(title) = changes.title {
            step.title = title.trim().to_string();
        }
        if changes.description.is_some() {
            step.description = changes.description;
        }
        if changes.owner_role.is_some() {
            step.owner_role = changes.owner_role;
        }
        if let Some(minutes) = changes.estimated_minutes {
            step.estimated_minutes = minutes;
        }
        sqlx::query(
            r#"UPDATE runbook_steps SET title = ?, description = ?, owner_role = ?, estimated_minutes = ?
               WHERE id = ?"#,
        )
        .bind(&step.title)
        .bind(&step.description)
        .bind(&step.owner_role)
        .bind(step.estimated_minutes)
        .bind(id)
        .execute(self.pool())
        .await?;
        Ok(step)
    }

    /// Remove a step and close the gap so positions stay `1..=n`.
    pub async fn delete_step(&self, org: i64, id: i64) -> Result<(), NexusError> {
        let step = self.get_step(org, id).await?;
        let mut tx = self.begin_write().await?;
        sqlx::query("DELETE FROM runbook_steps WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let remaining: Vec<(i64,)> = sqlx::query_as(
            "SELECT id FROM runbook_steps WHERE runbook_id = ? ORDER BY position",
        )
        .bind(step.runbook_id)
        .fetch_all(&mut *tx)
        .await?;
        let order: Vec<i64> = remaining.into_iter().map(|(id,)| id).collect();
        renumber(&mut tx, step.runbook_id, &order).await?;
        touch_runbook(&mut tx, step.runbook_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// `step_ids` must list every step of the runbook exactly once.
    pub async fn reorder_runbook_steps(
        &self,
        org: i64,
        runbook_id: i64,
        step_ids: &[i64],
    ) -> Result<Vec<DbRunbookStep>, NexusError> {
        self.get_runbook(org, runbook_id).await?;
        let mut tx = self.begin_write().await?;
        let current: Vec<(i64,)> =
            sqlx::query_as("SELECT id FROM runbook_steps WHERE runbook_id = ?")
                .bind(runbook_id)
                .fetch_all(&mut *tx)
                .await?;
        let existing: HashSet<i64> = current.into_iter().map(|(id,)| id).collect();
        let requested: HashSet<i64> = step_ids.iter().copied().collect();
        if requested.len() != step_ids.len() || requested != existing {
            return Err(NexusError::validation(format!(
                "`step_ids` must list each of the runbook's {} steps exactly once",
                existing.len()
            )));
        }

        renumber(&mut tx, runbook_id, step_ids).await?;
        touch_runbook(&mut tx, runbook_id).await?;
        tx.commit().await?;
        self.list_steps(org, runbook_id).await
    }
}

/// Assign positions `1..=n` following `order`. Rows are first lifted past
/// the highest live position so the `(runbook_id, position)` unique index
/// never sees a duplicate midway.
async fn renumber(
    tx: &mut Transaction<'_, Sqlite>,
    runbook_id: i64,
    order: &[i64],
) -> Result<(), NexusError> {
    let (max,): (i64,) = sqlx::query_as(
        "SELECT COALESCE(MAX(position), 0) FROM runbook_steps WHERE runbook_id = ?",
    )
    .bind(runbook_id)
    .fetch_one(&mut **tx)
    .await?;
    sqlx::query("UPDATE runbook_steps SET position = position + ? WHERE runbook_id = ?")
        .bind(max)
        .bind(runbook_id)
        .execute(&mut **tx)
        .await?;
    for (index, step_id) in order.iter().enumerate() {
        sqlx::query("UPDATE runbook_steps SET position = ? WHERE id = ? AND runbook_id = ?")
            .bind(index as i64 + 1)
            .bind(step_id)
            .bind(runbook_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

async fn touch_runbook(
    tx: &mut Transaction<'_, Sqlite>,
    runbook_id: i64,
) -> Result<(), NexusError> {
    sqlx::query("UPDATE runbooks SET updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(runbook_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
