use chrono::Utc;
use serde::Serialize;
use sqlx::{Executor, Sqlite};
use std::collections::HashMap;

use super::models::{
    DbAssessment, DbAssessmentResult, DbControl, DbDomain, DbFramework,
};
use super::sqlite::GrcStorage;
use crate::error::NexusError;
use crate::types::compliance::{
    AssessmentStatus, ControlStatus, CreateAssessment, CreateControl, CreateDomain,
    CreateFramework, RecordResult, UpdateControl,
};

const CONTROL_COLUMNS: &str =
    "c.id, c.domain_id, c.code, c.title, c.description, c.implementation_status, c.owner_id";
const ASSESSMENT_COLUMNS: &str =
    "id, organization_id, framework_id, name, status, score, started_at, completed_at";

/// A framework with its domains and their controls.
#[derive(Debug, Clone, Serialize)]
pub struct FrameworkTree {
    #[serde(flatten)]
    pub framework: DbFramework,
    pub domains: Vec<DomainTree>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DomainTree {
    #[serde(flatten)]
    pub domain: DbDomain,
    pub controls: Vec<DbControl>,
}

impl GrcStorage {
    pub async fn create_framework(
        &self,
        org: i64,
        input: CreateFramework,
    ) -> Result<DbFramework, NexusError> {
        let row = sqlx::query_as::<_, DbFramework>(
            r#"INSERT INTO frameworks (organization_id, name, version, description, created_at)
               VALUES (?, ?, ?, ?, ?)
               RETURNING id, organization_id, name, version, description, created_at"#,
        )
        .bind(org)
        .bind(input.name.trim())
        .bind(input.version)
        .bind(input.description)
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn list_frameworks(&self, org: i64) -> Result<Vec<DbFramework>, NexusError> {
        let rows = sqlx::query_as::<_, DbFramework>(
            r#"SELECT id, organization_id, name, version, description, created_at
               FROM frameworks WHERE organization_id = ? ORDER BY id"#,
        )
        .bind(org)
        .fetch_all(self.pool())
        .await?;
        Ok(rows)
    }

    pub async fn get_framework(&self, org: i64, id: i64) -> Result<DbFramework, NexusError> {
        sqlx::query_as::<_, DbFramework>(
            r#"SELECT id, organization_id, name, version, description, created_at
               FROM frameworks WHERE id = ? AND organization_id = ?"#,
        )
        .bind(id)
        .bind(org)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| NexusError::not_found("framework", id))
    }

    pub async fn framework_tree(&self, org: i64, id: i64) -> Result<FrameworkTree, NexusError> {
        let framework = self.get_framework(org, id).await?;
        let domains = sqlx::query_as::<_, DbDomain>(
            r#"SELECT id, framework_id, code, name, description
               FROM framework_domains WHERE framework_id = ? ORDER BY code"#,
        )
        .bind(id)
        .fetch_all(self.pool())
        .await?;
        let mut by_domain: HashMap<i64, Vec<DbControl>> = HashMap::new();
        for control in self.list_framework_controls(id).await? {
            by_domain.entry(control.domain_id).or_default().push(control);
        }
        let domains = domains
            .into_iter()
            .map(|domain| DomainTree {
                controls: by_domain.remove(&domain.id).unwrap_or_default(),
                domain,
            })
            .collect();
        Ok(FrameworkTree { framework, domains })
    }

    pub async fn delete_framework(&self, org: i64, id: i64) -> Result<(), NexusError> {
        let res = sqlx::query("DELETE FROM frameworks WHERE id = ? AND organization_id = ?")
            .bind(id)
            .bind(org)
            .execute(self.pool())
            .await?;
        if res.rows_affected() == 0 {
            return Err(NexusError::not_found("framework", id));
        }
        Ok(())
    }

    pub async fn create_domain(
        &self,
        org: i64,
        framework_id: i64,
        input: CreateDomain,
    ) -> Result<DbDomain, NexusError> {
        self.get_framework(org, framework_id).await?;
        let row = sqlx::query_as::<_, DbDomain>(
            r#"INSERT INTO framework_domains (framework_id, code, name, description)
               VALUES (?, ?, ?, ?)
               RETURNING id, framework_id, code, name, description"#,
        )
        .bind(framework_id)
        .bind(input.code.trim())
        .bind(input.name.trim())
        .bind(input.description)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    async fn get_domain(&self, org: i64, id: i64) -> Result<DbDomain, NexusError> {
        sqlx::query_as::<_, DbDomain>(
            r#"SELECT d.id, d.framework_id, d.code, d.name, d.description
               FROM framework_domains d JOIN frameworks f ON f.id = d.framework_id
               WHERE d.id = ? AND f.organization_id = ?"#,
        )
        .bind(id)
        .bind(org)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| NexusError::not_found("domain", id))
    }

    pub async fn create_control(
        &self,
        org: i64,
        domain_id: i64,
        input: CreateControl,
    ) -> Result<DbControl, NexusError> {
        self.get_domain(org, domain_id).await?;
        let row = sqlx::query_as::<_, DbControl>(
            r#"INSERT INTO controls (domain_id, code, title, description, implementation_status, owner_id)
               VALUES (?, ?, ?, ?, ?, ?)
               RETURNING id, domain_id, code, title, description, implementation_status, owner_id"#,
        )
        .bind(domain_id)
        .bind(input.code.trim())
        .bind(input.title.trim())
        .bind(input.description)
        .bind(
            input
                .implementation_status
                .unwrap_or(ControlStatus::NotImplemented),
        )
        .bind(input.owner_id)
        .fetch_one(self.pool())
        .await?;
        Ok(row)
    }

    pub async fn get_control(&self, org: i64, id: i64) -> Result<DbControl, NexusError> {
        let sql = format!(
            "SELECT {CONTROL_COLUMNS} FROM controls c \
             JOIN framework_domains d ON d.id = c.domain_id \
             JOIN frameworks f ON f.id = d.framework_id \
             WHERE c.id = ? AND f.organization_id = ?"
        );
        sqlx::query_as::<_, DbControl>(&sql)
            .bind(id)
            .bind(org)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| NexusError::not_found("control", id))
    }

    pub async fn update_control(
        &self,
        org: i64,
        id: i64,
        changes: UpdateControl,
    ) -> Result<DbControl, NexusError> {
        let mut control = self.get_control(org, id).await?;
        if let Some(title) = changes.title {
            control.title = title.trim().to_string();
        }
        if changes.description.is_some() {
            control.description = changes.description;
        }
        if let Some(status) = changes.implementation_status {
            control.implementation_status = status;
        }
        if changes.owner_id.is_some() {
            control.owner_id = changes.owner_id;
        }
        sqlx::query(
            "UPDATE controls SET title = ?, description = ?, implementation_status = ?, owner_id = ? WHERE id = ?",
        )
        .bind(&control.title)
        .bind(&control.description)
        .bind(control.implementation_status)
        .bind(control.owner_id)
        .bind(id)
        .execute(self.pool())
        .await?;
        Ok(control)
    }

    pub async fn list_framework_controls(
        &self,
        framework_id: i64,
    ) -> Result<Vec<DbControl>, NexusError> {
        framework_controls(self.pool(), framework_id).await
    }

    /// Highest inherent score (likelihood × impact) among open risks linked
    /// to each control of the framework. Controls without open risks are
    /// absent from the map.
    pub async fn control_risk_scores(
        &self,
        framework_id: i64,
    ) -> Result<HashMap<i64, u8>, NexusError> {
        control_risk_scores(self.pool(), framework_id).await
    }

    pub async fn create_assessment(
        &self,
        org: i64,
        input: CreateAssessment,
    ) -> Result<DbAssessment, NexusError> {
        self.get_framework(org, input.framework_id).await?;
        let sql = format!(
            "INSERT INTO assessments (organization_id, framework_id, name, status, started_at) \
             VALUES (?, ?, ?, ?, ?) RETURNING {ASSESSMENT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, DbAssessment>(&sql)
            .bind(org)
            .bind(input.framework_id)
            .bind(input.name.trim())
            .bind(AssessmentStatus::InProgress)
            .bind(Utc::now())
            .fetch_one(self.pool())
            .await?;
        Ok(row)
    }

    pub async fn list_assessments(&self, org: i64) -> Result<Vec<DbAssessment>, NexusError> {
        let sql = format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE organization_id = ? ORDER BY id"
        );
        let rows = sqlx::query_as::<_, DbAssessment>(&sql)
            .bind(org)
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    pub async fn get_assessment(&self, org: i64, id: i64) -> Result<DbAssessment, NexusError> {
        assessment_in_org(self.pool(), org, id).await
    }

    pub async fn list_assessment_results(
        &self,
        assessment_id: i64,
    ) -> Result<Vec<DbAssessmentResult>, NexusError> {
        assessment_results(self.pool(), assessment_id).await
    }

    /// Upsert the finding for one control. The control must belong to the
    /// assessed framework and the assessment must still be open.
    pub async fn record_result(
        &self,
        org: i64,
        assessment_id: i64,
        control_id: i64,
        input: RecordResult,
    ) -> Result<DbAssessmentResult, NexusError> {
        let mut tx = self.begin_write().await?;
        let assessment = assessment_in_org(&mut *tx, org, assessment_id).await?;
        if assessment.status == AssessmentStatus::Completed {
            return Err(NexusError::conflict(format!(
                "assessment {assessment_id} is completed"
            )));
        }
        let in_framework: Option<(i64,)> = sqlx::query_as(
            r#"SELECT c.id FROM controls c
               JOIN framework_domains d ON d.id = c.domain_id
               WHERE c.id = ? AND d.framework_id = ?"#,
        )
        .bind(control_id)
        .bind(assessment.framework_id)
        .fetch_optional(&mut *tx)
        .await?;
        if in_framework.is_none() {
            return Err(NexusError::not_found("control", control_id));
        }

        let row = sqlx::query_as::<_, DbAssessmentResult>(
            r#"INSERT INTO assessment_results
                   (assessment_id, control_id, status, notes, evidence, assessed_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(assessment_id, control_id) DO UPDATE SET
                   status = excluded.status,
                   notes = excluded.notes,
                   evidence = excluded.evidence,
                   assessed_at = excluded.assessed_at
               RETURNING id, assessment_id, control_id, status, notes, evidence, assessed_at"#,
        )
        .bind(assessment_id)
        .bind(control_id)
        .bind(input.status)
        .bind(input.notes)
        .bind(input.evidence)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Close an open assessment. `score` sees the controls, findings and
    /// risk weights as of the write lock and returns the stored score with
    /// whatever breakdown the caller wants back.
    pub async fn complete_assessment<F, B>(
        &self,
        org: i64,
        id: i64,
        score: F,
    ) -> Result<(DbAssessment, B), NexusError>
    where
        F: FnOnce(&[DbControl], &[DbAssessmentResult], &HashMap<i64, u8>) -> (f64, B),
    {
        let mut tx = self.begin_write().await?;
        let assessment = assessment_in_org(&mut *tx, org, id).await?;
        if assessment.status == AssessmentStatus::Completed {
            return Err(NexusError::conflict(format!(
                "assessment {id} is already completed"
            )));
        }
        let controls = framework_controls(&mut *tx, assessment.framework_id).await?;
        let results = assessment_results(&mut *tx, id).await?;
        let weights = control_risk_scores(&mut *tx, assessment.framework_id).await?;
        let (value, breakdown) = score(&controls, &results, &weights);

        let sql = format!(
            "UPDATE assessments SET status = ?, score = ?, completed_at = ? \
             WHERE id = ? AND organization_id = ? RETURNING {ASSESSMENT_COLUMNS}"
        );
        let completed = sqlx::query_as::<_, DbAssessment>(&sql)
            .bind(AssessmentStatus::Completed)
            .bind(value)
            .bind(Utc::now())
            .bind(id)
            .bind(org)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok((completed, breakdown))
    }
}

async fn assessment_in_org<'e, E>(
    executor: E,
    org: i64,
    id: i64,
) -> Result<DbAssessment, NexusError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE id = ? AND organization_id = ?"
    );
    sqlx::query_as::<_, DbAssessment>(&sql)
        .bind(id)
        .bind(org)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| NexusError::not_found("assessment", id))
}

async fn framework_controls<'e, E>(
    executor: E,
    framework_id: i64,
) -> Result<Vec<DbControl>, NexusError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {CONTROL_COLUMNS} FROM controls c \
         JOIN framework_domains d ON d.id = c.domain_id \
         WHERE d.framework_id = ? ORDER BY d.code, c.code"
    );
    let rows = sqlx::query_as::<_, DbControl>(&sql)
        .bind(framework_id)
        .fetch_all(executor)
        .await?;
    Ok(rows)
}

async fn assessment_results<'e, E>(
    executor: E,
    assessment_id: i64,
) -> Result<Vec<DbAssessmentResult>, NexusError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, DbAssessmentResult>(
        r#"SELECT id, assessment_id, control_id, status, notes, evidence, assessed_at
           FROM assessment_results WHERE assessment_id = ? ORDER BY control_id"#,
    )
    .bind(assessment_id)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

/// Closed risks carry no weight.
async fn control_risk_scores<'e, E>(
    executor: E,
    framework_id: i64,
) -> Result<HashMap<i64, u8>, NexusError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        r#"SELECT rc.control_id, MAX(r.likelihood * r.impact)
           FROM risk_controls rc
           JOIN risks r ON r.id = rc.risk_id
           JOIN controls c ON c.id = rc.control_id
           JOIN framework_domains d ON d.id = c.domain_id
           WHERE d.framework_id = ? AND r.status <> 'closed'
           GROUP BY rc.control_id"#,
    )
    .bind(framework_id)
    .fetch_all(executor)
    .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(control, score)| u8::try_from(score).ok().map(|s| (control, s)))
        .collect())
}
