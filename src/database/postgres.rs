use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::store::{CandidateStore, UserStore};
use crate::error::{Error, Result};
use crate::models::candidate::{
    AdmissionCommit, CandidatePatch, CandidateRecord, CandidateStatus, InterviewResult,
    NewCandidate, ACTION_INTERVIEWED,
};
use crate::models::user::{DashboardUser, NewUser, UserPatch, UserRole};

#[derive(Debug, FromRow)]
struct CandidateRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    token: Option<String>,
    management_token: Option<String>,
    appointment_time: Option<DateTime<Utc>>,
    status: String,
    call_attempts: i32,
    interview_completed: bool,
    action: Option<String>,
    call_started_at: Option<DateTime<Utc>>,
    overall_score: Option<i32>,
    communication: Option<i32>,
    enthusiasm: Option<i32>,
    professionalism: Option<i32>,
    recommendation: Option<String>,
    summary: Option<String>,
    analysis: Option<String>,
    transcript: Option<String>,
    interview_length_seconds: Option<i32>,
    availability: Option<String>,
    next_action: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CandidateRow> for CandidateRecord {
    fn from(row: CandidateRow) -> Self {
        CandidateRecord {
            id: row.id.to_string(),
            name: row.name,
            email: row.email,
            phone: row.phone,
            token: row.token,
            management_token: row.management_token,
            appointment_time: row.appointment_time,
            status: CandidateStatus::parse(&row.status),
            call_attempts: row.call_attempts,
            interview_completed: row.interview_completed,
            action: row.action,
            call_started_at: row.call_started_at,
            result: InterviewResult {
                overall_score: row.overall_score,
                communication: row.communication,
                enthusiasm: row.enthusiasm,
                professionalism: row.professionalism,
                recommendation: row.recommendation,
                summary: row.summary,
                analysis: row.analysis,
                transcript: row.transcript,
                interview_length_seconds: row.interview_length_seconds,
                availability: row.availability,
                next_action: row.next_action,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Ids that are not UUIDs cannot exist in this table.
fn parse_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id).ok()
}

#[derive(Clone)]
pub struct PgCandidateStore {
    pool: PgPool,
}

impl PgCandidateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_where(&self, column: &str, value: &str) -> Result<Option<CandidateRecord>> {
        let sql = format!("SELECT * FROM candidates WHERE {} = $1", column);
        let row = sqlx::query_as::<_, CandidateRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(CandidateRecord::from))
    }
}

#[async_trait]
impl CandidateStore for PgCandidateStore {
    async fn find_by_token(&self, token: &str) -> Result<Option<CandidateRecord>> {
        self.fetch_where("token", token).await
    }

    async fn find_by_management_token(&self, token: &str) -> Result<Option<CandidateRecord>> {
        self.fetch_where("management_token", token).await
    }

    async fn get(&self, id: &str) -> Result<Option<CandidateRecord>> {
        let Some(id) = parse_id(id) else { return Ok(None) };
        let row = sqlx::query_as::<_, CandidateRow>(r#"SELECT * FROM candidates WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(CandidateRecord::from))
    }

    async fn list(&self) -> Result<Vec<CandidateRecord>> {
        let rows = sqlx::query_as::<_, CandidateRow>(
            r#"SELECT * FROM candidates ORDER BY appointment_time DESC NULLS LAST, created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(CandidateRecord::from).collect())
    }

    async fn create(&self, candidate: NewCandidate) -> Result<CandidateRecord> {
        let row = sqlx::query_as::<_, CandidateRow>(
            r#"
            INSERT INTO candidates (id, name, email, phone, status)
            VALUES ($1, $2, $3, $4, 'pending')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(candidate.name)
        .bind(candidate.email)
        .bind(candidate.phone)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update(&self, id: &str, patch: CandidatePatch) -> Result<CandidateRecord> {
        let uuid = parse_id(id).ok_or_else(|| Error::NotFound("Candidate not found".into()))?;
        let result = patch.result.unwrap_or_default();
        let row = sqlx::query_as::<_, CandidateRow>(
            r#"
            UPDATE candidates SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                token = COALESCE($5, token),
                management_token = COALESCE($6, management_token),
                appointment_time = COALESCE($7, appointment_time),
                status = COALESCE($8, status),
                interview_completed = COALESCE($9, interview_completed),
                action = COALESCE($10, action),
                call_attempts = COALESCE($11, call_attempts),
                call_started_at = COALESCE($12, call_started_at),
                overall_score = COALESCE($13, overall_score),
                communication = COALESCE($14, communication),
                enthusiasm = COALESCE($15, enthusiasm),
                professionalism = COALESCE($16, professionalism),
                recommendation = COALESCE($17, recommendation),
                summary = COALESCE($18, summary),
                analysis = COALESCE($19, analysis),
                transcript = COALESCE($20, transcript),
                interview_length_seconds = COALESCE($21, interview_length_seconds),
                availability = COALESCE($22, availability),
                next_action = COALESCE($23, next_action),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(uuid)
        .bind(patch.name)
        .bind(patch.email)
        .bind(patch.phone)
        .bind(patch.token)
        .bind(patch.management_token)
        .bind(patch.appointment_time)
        .bind(patch.status.map(String::from))
        .bind(patch.interview_completed)
        .bind(patch.action)
        .bind(patch.call_attempts)
        .bind(patch.call_started_at)
        .bind(result.overall_score)
        .bind(result.communication)
        .bind(result.enthusiasm)
        .bind(result.professionalism)
        .bind(result.recommendation)
        .bind(result.summary)
        .bind(result.analysis)
        .bind(result.transcript)
        .bind(result.interview_length_seconds)
        .bind(result.availability)
        .bind(result.next_action)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CandidateRecord::from)
            .ok_or_else(|| Error::NotFound("Candidate not found".into()))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let Some(id) = parse_id(id) else { return Ok(false) };
        let res = sqlx::query(r#"DELETE FROM candidates WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn commit_admission(&self, token: &str, now: DateTime<Utc>) -> Result<AdmissionCommit> {
        let committed = sqlx::query_as::<_, CandidateRow>(
            r#"
            UPDATE candidates SET
                action = $2,
                interview_completed = TRUE,
                status = $3,
                call_attempts = call_attempts + 1,
                call_started_at = $4,
                updated_at = $4
            WHERE token = $1
              AND interview_completed = FALSE
              AND COALESCE(action, '') <> $2
              AND call_attempts = 0
              AND status <> $5
            RETURNING *
            "#,
        )
        .bind(token)
        .bind(ACTION_INTERVIEWED)
        .bind(CandidateStatus::Pending.as_store_value())
        .bind(now)
        .bind(CandidateStatus::Cancelled.as_store_value())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = committed {
            return Ok(AdmissionCommit::Committed(row.into()));
        }

        match self.find_by_token(token).await? {
            Some(current) if !current.interview_started() && current.is_cancelled() => {
                Ok(AdmissionCommit::Cancelled(current))
            }
            Some(current) => Ok(AdmissionCommit::AlreadyStarted(current)),
            None => Ok(AdmissionCommit::NotFound),
        }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    role: String,
    password_hash: Option<String>,
    reset_token: Option<String>,
    reset_token_expiry: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl From<UserRow> for DashboardUser {
    fn from(row: UserRow) -> Self {
        DashboardUser {
            id: row.id.to_string(),
            email: row.email,
            name: row.name,
            role: UserRole::parse(&row.role),
            password_hash: row.password_hash,
            reset_token: row.reset_token,
            reset_token_expiry: row.reset_token_expiry,
            created_at: Some(row.created_at),
            last_login: row.last_login,
        }
    }
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<DashboardUser>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"SELECT * FROM dashboard_users WHERE LOWER(email) = LOWER($1)"#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(DashboardUser::from))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<DashboardUser>> {
        let Some(id) = parse_id(id) else { return Ok(None) };
        let row = sqlx::query_as::<_, UserRow>(r#"SELECT * FROM dashboard_users WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(DashboardUser::from))
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<DashboardUser>> {
        let row =
            sqlx::query_as::<_, UserRow>(r#"SELECT * FROM dashboard_users WHERE reset_token = $1"#)
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(DashboardUser::from))
    }

    async fn list(&self) -> Result<Vec<DashboardUser>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"SELECT * FROM dashboard_users ORDER BY created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(DashboardUser::from).collect())
    }

    async fn create(&self, user: NewUser) -> Result<DashboardUser> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO dashboard_users (id, email, name, role, password_hash)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.email)
        .bind(user.name)
        .bind(user.role.as_str())
        .bind(user.password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn update(&self, id: &str, patch: UserPatch) -> Result<DashboardUser> {
        let uuid = parse_id(id).ok_or_else(|| Error::NotFound("User not found".into()))?;
        let (set_reset, reset_token) = match patch.reset_token {
            Some(v) => (true, v),
            None => (false, None),
        };
        let (set_expiry, reset_expiry) = match patch.reset_token_expiry {
            Some(v) => (true, v),
            None => (false, None),
        };
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE dashboard_users SET
                email = COALESCE($2, email),
                name = COALESCE($3, name),
                role = COALESCE($4, role),
                password_hash = COALESCE($5, password_hash),
                reset_token = CASE WHEN $6 THEN $7 ELSE reset_token END,
                reset_token_expiry = CASE WHEN $8 THEN $9 ELSE reset_token_expiry END,
                last_login = COALESCE($10, last_login)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(uuid)
        .bind(patch.email)
        .bind(patch.name)
        .bind(patch.role.map(|r| r.as_str()))
        .bind(patch.password_hash)
        .bind(set_reset)
        .bind(reset_token)
        .bind(set_expiry)
        .bind(reset_expiry)
        .bind(patch.last_login)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DashboardUser::from)
            .ok_or_else(|| Error::NotFound("User not found".into()))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let Some(id) = parse_id(id) else { return Ok(false) };
        let res = sqlx::query(r#"DELETE FROM dashboard_users WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
