//! Airtable REST backend.
//!
//! Airtable offers no conditional update, so the admission commit is a
//! read-then-write serialised per token through [`KeyedLocks`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use url::Url;

use crate::database::store::{CandidateStore, UserStore};
use crate::error::{Error, Result};
use crate::models::candidate::{
    AdmissionCommit, CandidatePatch, CandidateRecord, CandidateStatus, InterviewResult,
    NewCandidate, ACTION_INTERVIEWED,
};
use crate::models::user::{DashboardUser, NewUser, UserPatch, UserRole};
use crate::utils::keyed_lock::KeyedLocks;
use crate::utils::time::from_rfc3339;

mod fields {
    pub const NAME: &str = "Candidate Name";
    pub const NAME_FALLBACK: &str = "Name";
    pub const EMAIL: &str = "Email";
    pub const PHONE: &str = "Phone";
    pub const TOKEN: &str = "Token";
    pub const MANAGEMENT_TOKEN: &str = "Management Token";
    pub const APPOINTMENT: &str = "Interview Time";
    pub const APPOINTMENT_FALLBACK: &str = "AppointmentTime";
    pub const STATUS: &str = "status";
    pub const STATUS_FALLBACK: &str = "Status";
    pub const CALL_ATTEMPTS: &str = "Call Attempts";
    pub const COMPLETED: &str = "InterviewCompleted";
    pub const ACTION: &str = "action";
    pub const CALL_STARTED_AT: &str = "Call Started At";
    pub const SCORE: &str = "score";
    pub const COMMUNICATION: &str = "Communication";
    pub const ENTHUSIASM: &str = "enthusiasm";
    pub const PROFESSIONALISM: &str = "professionalism";
    pub const RECOMMENDATION: &str = "Recommandation";
    pub const SUMMARY: &str = "Interview Summary";
    pub const ANALYSIS: &str = "Interview Analysis";
    pub const TRANSCRIPT: &str = "Interview Transcript";
    pub const LENGTH: &str = "Interview Length";
    pub const AVAILABILITY: &str = "availability";
    pub const NEXT_ACTION: &str = "Next Action Recommendation";
    pub const LAST_MODIFIED: &str = "Last Modified";

    pub const USER_EMAIL: &str = "Email";
    pub const USER_PASSWORD_HASH: &str = "Password Hash";
    pub const USER_NAME: &str = "Name";
    pub const USER_ROLE: &str = "Role";
    pub const USER_RESET_TOKEN: &str = "Reset Token";
    pub const USER_RESET_EXPIRY: &str = "Reset Token Expiry";
    pub const USER_CREATED_AT: &str = "Created At";
    pub const USER_LAST_LOGIN: &str = "Last Login";
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AirtableRecord {
    pub id: String,
    #[serde(rename = "createdTime", default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fields: Map<String, JsonValue>,
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    records: Vec<AirtableRecord>,
    offset: Option<String>,
}

#[derive(Debug, Default)]
pub struct SelectOptions {
    pub filter_by_formula: Option<String>,
    pub max_records: Option<u32>,
    pub sort: Option<(String, &'static str)>,
}

/// Thin client over the Airtable v0 REST API.
#[derive(Clone)]
pub struct AirtableClient {
    http: Client,
    api_url: Url,
    api_key: String,
    base_id: String,
}

impl AirtableClient {
    pub fn new(api_url: &str, api_key: &str, base_id: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let api_url = Url::parse(api_url)
            .map_err(|e| Error::Config(format!("Invalid AIRTABLE_API_URL: {}", e)))?;
        Ok(Self {
            http,
            api_url,
            api_key: api_key.to_string(),
            base_id: base_id.to_string(),
        })
    }

    fn table_url(&self, table: &str, record_id: Option<&str>) -> Result<Url> {
        let mut url = self.api_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::Config("AIRTABLE_API_URL cannot be a base".into()))?;
            segments.pop_if_empty().push(&self.base_id).push(table);
            if let Some(id) = record_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<JsonValue>,
    ) -> Result<Option<reqwest::Response>> {
        let mut req = self
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(&self.api_key);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::Store(format!(
                "Airtable {} {} returned {}: {}",
                method,
                url.path(),
                status,
                text
            )));
        }
        Ok(Some(resp))
    }

    pub async fn select(&self, table: &str, options: SelectOptions) -> Result<Vec<AirtableRecord>> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;
        loop {
            let mut url = self.table_url(table, None)?;
            {
                let mut query = url.query_pairs_mut();
                if let Some(formula) = &options.filter_by_formula {
                    query.append_pair("filterByFormula", formula);
                }
                if let Some(max) = options.max_records {
                    query.append_pair("maxRecords", &max.to_string());
                }
                if let Some((field, direction)) = &options.sort {
                    query.append_pair("sort[0][field]", field);
                    query.append_pair("sort[0][direction]", direction);
                }
                if let Some(off) = &offset {
                    query.append_pair("offset", off);
                }
            }

            let Some(resp) = self.send(Method::GET, url, None).await? else {
                return Err(Error::Store(format!("Airtable table '{}' not found", table)));
            };
            let page: ListResponse = resp.json().await?;
            records.extend(page.records);

            let reached_max = options
                .max_records
                .is_some_and(|max| records.len() >= max as usize);
            match page.offset {
                Some(next) if !reached_max => offset = Some(next),
                _ => break,
            }
        }
        Ok(records)
    }

    pub async fn first(&self, table: &str, formula: String) -> Result<Option<AirtableRecord>> {
        let records = self
            .select(
                table,
                SelectOptions {
                    filter_by_formula: Some(formula),
                    max_records: Some(1),
                    sort: None,
                },
            )
            .await?;
        Ok(records.into_iter().next())
    }

    pub async fn find(&self, table: &str, id: &str) -> Result<Option<AirtableRecord>> {
        let url = self.table_url(table, Some(id))?;
        match self.send(Method::GET, url, None).await? {
            Some(resp) => Ok(Some(resp.json().await?)),
            None => Ok(None),
        }
    }

    pub async fn create(&self, table: &str, fields: Map<String, JsonValue>) -> Result<AirtableRecord> {
        let url = self.table_url(table, None)?;
        let body = json!({ "fields": fields, "typecast": true });
        let resp = self
            .send(Method::POST, url, Some(body))
            .await?
            .ok_or_else(|| Error::Store(format!("Airtable table '{}' not found", table)))?;
        Ok(resp.json().await?)
    }

    pub async fn update(
        &self,
        table: &str,
        id: &str,
        fields: Map<String, JsonValue>,
    ) -> Result<Option<AirtableRecord>> {
        let url = self.table_url(table, Some(id))?;
        let body = json!({ "fields": fields, "typecast": true });
        match self.send(Method::PATCH, url, Some(body)).await? {
            Some(resp) => Ok(Some(resp.json().await?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, table: &str, id: &str) -> Result<bool> {
        let url = self.table_url(table, Some(id))?;
        Ok(self.send(Method::DELETE, url, None).await?.is_some())
    }
}

/// Quotes a value for use inside an Airtable formula string literal.
pub fn formula_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn field_str(fields: &Map<String, JsonValue>, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| match fields.get(*name) {
        Some(JsonValue::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(JsonValue::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn field_i32(fields: &Map<String, JsonValue>, name: &str) -> Option<i32> {
    match fields.get(name)? {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .and_then(|v| i32::try_from(v).ok()),
        JsonValue::String(s) => s.trim().parse::<f64>().ok().map(|f| f.round() as i32),
        _ => None,
    }
}

fn field_bool(fields: &Map<String, JsonValue>, name: &str) -> bool {
    match fields.get(name) {
        Some(JsonValue::Bool(b)) => *b,
        Some(JsonValue::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn field_time(fields: &Map<String, JsonValue>, names: &[&str]) -> Option<DateTime<Utc>> {
    field_str(fields, names).and_then(|s| from_rfc3339(&s).ok())
}

fn candidate_from_record(record: AirtableRecord) -> CandidateRecord {
    let f = &record.fields;
    let created_at = record.created_time.unwrap_or_else(Utc::now);
    CandidateRecord {
        id: record.id.clone(),
        name: field_str(f, &[fields::NAME, fields::NAME_FALLBACK]).unwrap_or_default(),
        email: field_str(f, &[fields::EMAIL]).unwrap_or_default(),
        phone: field_str(f, &[fields::PHONE]),
        token: field_str(f, &[fields::TOKEN]),
        management_token: field_str(f, &[fields::MANAGEMENT_TOKEN]),
        appointment_time: field_time(f, &[fields::APPOINTMENT, fields::APPOINTMENT_FALLBACK]),
        status: CandidateStatus::parse(
            &field_str(f, &[fields::STATUS, fields::STATUS_FALLBACK]).unwrap_or_default(),
        ),
        call_attempts: field_i32(f, fields::CALL_ATTEMPTS).unwrap_or(0),
        interview_completed: field_bool(f, fields::COMPLETED),
        action: field_str(f, &[fields::ACTION]),
        call_started_at: field_time(f, &[fields::CALL_STARTED_AT]),
        result: InterviewResult {
            overall_score: field_i32(f, fields::SCORE),
            communication: field_i32(f, fields::COMMUNICATION),
            enthusiasm: field_i32(f, fields::ENTHUSIASM),
            professionalism: field_i32(f, fields::PROFESSIONALISM),
            recommendation: field_str(f, &[fields::RECOMMENDATION]),
            summary: field_str(f, &[fields::SUMMARY]),
            analysis: field_str(f, &[fields::ANALYSIS]),
            transcript: field_str(f, &[fields::TRANSCRIPT]),
            interview_length_seconds: field_i32(f, fields::LENGTH),
            availability: field_str(f, &[fields::AVAILABILITY]),
            next_action: field_str(f, &[fields::NEXT_ACTION]),
        },
        created_at,
        updated_at: field_time(f, &[fields::LAST_MODIFIED]).unwrap_or(created_at),
    }
}

fn patch_to_fields(patch: CandidatePatch) -> Map<String, JsonValue> {
    let mut out = Map::new();
    let mut put = |name: &str, value: Option<JsonValue>| {
        if let Some(v) = value {
            out.insert(name.to_string(), v);
        }
    };
    put(fields::NAME, patch.name.map(JsonValue::from));
    put(fields::EMAIL, patch.email.map(JsonValue::from));
    put(fields::PHONE, patch.phone.map(JsonValue::from));
    put(fields::TOKEN, patch.token.map(JsonValue::from));
    put(fields::MANAGEMENT_TOKEN, patch.management_token.map(JsonValue::from));
    put(
        fields::APPOINTMENT,
        patch.appointment_time.map(|t| JsonValue::from(t.to_rfc3339())),
    );
    put(fields::STATUS, patch.status.map(|s| JsonValue::from(String::from(s))));
    put(fields::COMPLETED, patch.interview_completed.map(JsonValue::from));
    put(fields::ACTION, patch.action.map(JsonValue::from));
    put(fields::CALL_ATTEMPTS, patch.call_attempts.map(JsonValue::from));
    put(
        fields::CALL_STARTED_AT,
        patch.call_started_at.map(|t| JsonValue::from(t.to_rfc3339())),
    );
    if let Some(r) = patch.result {
        put(fields::SCORE, r.overall_score.map(JsonValue::from));
        put(fields::COMMUNICATION, r.communication.map(JsonValue::from));
        put(fields::ENTHUSIASM, r.enthusiasm.map(JsonValue::from));
        put(fields::PROFESSIONALISM, r.professionalism.map(JsonValue::from));
        put(fields::RECOMMENDATION, r.recommendation.map(JsonValue::from));
        put(fields::SUMMARY, r.summary.map(JsonValue::from));
        put(fields::ANALYSIS, r.analysis.map(JsonValue::from));
        put(fields::TRANSCRIPT, r.transcript.map(JsonValue::from));
        put(fields::LENGTH, r.interview_length_seconds.map(JsonValue::from));
        put(fields::AVAILABILITY, r.availability.map(JsonValue::from));
        put(fields::NEXT_ACTION, r.next_action.map(JsonValue::from));
    }
    out
}

#[derive(Clone)]
pub struct AirtableCandidateStore {
    client: AirtableClient,
    table: String,
    locks: KeyedLocks,
    lock_timeout: Duration,
}

impl AirtableCandidateStore {
    pub fn new(client: AirtableClient, table: String, lock_timeout: Duration) -> Self {
        Self {
            client,
            table,
            locks: KeyedLocks::new(),
            lock_timeout,
        }
    }

    async fn find_by_field(&self, field: &str, value: &str) -> Result<Option<CandidateRecord>> {
        let formula = format!("{{{}}} = {}", field, formula_string(value));
        Ok(self
            .client
            .first(&self.table, formula)
            .await?
            .map(candidate_from_record))
    }
}

#[async_trait]
impl CandidateStore for AirtableCandidateStore {
    async fn find_by_token(&self, token: &str) -> Result<Option<CandidateRecord>> {
        self.find_by_field(fields::TOKEN, token).await
    }

    async fn find_by_management_token(&self, token: &str) -> Result<Option<CandidateRecord>> {
        self.find_by_field(fields::MANAGEMENT_TOKEN, token).await
    }

    async fn get(&self, id: &str) -> Result<Option<CandidateRecord>> {
        Ok(self
            .client
            .find(&self.table, id)
            .await?
            .map(candidate_from_record))
    }

    async fn list(&self) -> Result<Vec<CandidateRecord>> {
        let records = self
            .client
            .select(
                &self.table,
                SelectOptions {
                    sort: Some((fields::APPOINTMENT.to_string(), "desc")),
                    ..Default::default()
                },
            )
            .await?;
        Ok(records.into_iter().map(candidate_from_record).collect())
    }

    async fn create(&self, candidate: NewCandidate) -> Result<CandidateRecord> {
        let fields = patch_to_fields(CandidatePatch {
            name: Some(candidate.name),
            email: Some(candidate.email),
            phone: candidate.phone,
            status: Some(CandidateStatus::Pending),
            call_attempts: Some(0),
            interview_completed: Some(false),
            ..Default::default()
        });
        let record = self.client.create(&self.table, fields).await?;
        Ok(candidate_from_record(record))
    }

    async fn update(&self, id: &str, patch: CandidatePatch) -> Result<CandidateRecord> {
        let fields = patch_to_fields(patch);
        self.client
            .update(&self.table, id, fields)
            .await?
            .map(candidate_from_record)
            .ok_or_else(|| Error::NotFound("Candidate not found".into()))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.client.delete(&self.table, id).await
    }

    async fn commit_admission(&self, token: &str, now: DateTime<Utc>) -> Result<AdmissionCommit> {
        let _guard = self
            .locks
            .acquire(token, self.lock_timeout)
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        let Some(current) = self.find_by_token(token).await? else {
            return Ok(AdmissionCommit::NotFound);
        };

        let attempts = current.call_attempts + 1;
        if current.interview_started() || attempts > 1 {
            return Ok(AdmissionCommit::AlreadyStarted(current));
        }
        if current.is_cancelled() {
            return Ok(AdmissionCommit::Cancelled(current));
        }

        let updated = self
            .update(
                &current.id,
                CandidatePatch {
                    action: Some(ACTION_INTERVIEWED.to_string()),
                    interview_completed: Some(true),
                    status: Some(CandidateStatus::Pending),
                    call_attempts: Some(attempts),
                    call_started_at: Some(now),
                    ..Default::default()
                },
            )
            .await?;
        Ok(AdmissionCommit::Committed(updated))
    }
}

fn user_from_record(record: AirtableRecord) -> DashboardUser {
    let f = &record.fields;
    let email = field_str(f, &[fields::USER_EMAIL]).unwrap_or_default();
    DashboardUser {
        id: record.id.clone(),
        name: field_str(f, &[fields::USER_NAME]).unwrap_or_else(|| email.clone()),
        email,
        role: UserRole::parse(&field_str(f, &[fields::USER_ROLE]).unwrap_or_default()),
        password_hash: field_str(f, &[fields::USER_PASSWORD_HASH]),
        reset_token: field_str(f, &[fields::USER_RESET_TOKEN]),
        reset_token_expiry: field_time(f, &[fields::USER_RESET_EXPIRY]),
        created_at: field_time(f, &[fields::USER_CREATED_AT]).or(record.created_time),
        last_login: field_time(f, &[fields::USER_LAST_LOGIN]),
    }
}

fn user_patch_to_fields(patch: UserPatch) -> Map<String, JsonValue> {
    let mut out = Map::new();
    if let Some(v) = patch.email {
        out.insert(fields::USER_EMAIL.into(), v.into());
    }
    if let Some(v) = patch.name {
        out.insert(fields::USER_NAME.into(), v.into());
    }
    if let Some(v) = patch.role {
        out.insert(fields::USER_ROLE.into(), v.as_str().into());
    }
    if let Some(v) = patch.password_hash {
        out.insert(fields::USER_PASSWORD_HASH.into(), v.into());
    }
    // Airtable clears a cell when it receives null.
    if let Some(v) = patch.reset_token {
        out.insert(fields::USER_RESET_TOKEN.into(), v.map_or(JsonValue::Null, JsonValue::from));
    }
    if let Some(v) = patch.reset_token_expiry {
        out.insert(
            fields::USER_RESET_EXPIRY.into(),
            v.map_or(JsonValue::Null, |t| JsonValue::from(t.to_rfc3339())),
        );
    }
    if let Some(v) = patch.last_login {
        out.insert(fields::USER_LAST_LOGIN.into(), v.to_rfc3339().into());
    }
    out
}

#[derive(Clone)]
pub struct AirtableUserStore {
    client: AirtableClient,
    table: String,
}

impl AirtableUserStore {
    pub fn new(client: AirtableClient, table: String) -> Self {
        Self { client, table }
    }
}

#[async_trait]
impl UserStore for AirtableUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<DashboardUser>> {
        let formula = format!(
            "LOWER({{{}}}) = LOWER({})",
            fields::USER_EMAIL,
            formula_string(email)
        );
        Ok(self.client.first(&self.table, formula).await?.map(user_from_record))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<DashboardUser>> {
        Ok(self.client.find(&self.table, id).await?.map(user_from_record))
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<DashboardUser>> {
        let formula = format!("{{{}}} = {}", fields::USER_RESET_TOKEN, formula_string(token));
        Ok(self.client.first(&self.table, formula).await?.map(user_from_record))
    }

    async fn list(&self) -> Result<Vec<DashboardUser>> {
        let records = self
            .client
            .select(
                &self.table,
                SelectOptions {
                    sort: Some((fields::USER_CREATED_AT.to_string(), "desc")),
                    ..Default::default()
                },
            )
            .await?;
        Ok(records.into_iter().map(user_from_record).collect())
    }

    async fn create(&self, user: NewUser) -> Result<DashboardUser> {
        let mut out = Map::new();
        out.insert(fields::USER_EMAIL.into(), user.email.into());
        out.insert(fields::USER_NAME.into(), user.name.into());
        out.insert(fields::USER_ROLE.into(), user.role.as_str().into());
        out.insert(fields::USER_PASSWORD_HASH.into(), user.password_hash.into());
        out.insert(fields::USER_CREATED_AT.into(), Utc::now().to_rfc3339().into());
        let record = self.client.create(&self.table, out).await?;
        Ok(user_from_record(record))
    }

    async fn update(&self, id: &str, patch: UserPatch) -> Result<DashboardUser> {
        self.client
            .update(&self.table, id, user_patch_to_fields(patch))
            .await?
            .map(user_from_record)
            .ok_or_else(|| Error::NotFound("User not found".into()))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.client.delete(&self.table, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: JsonValue) -> AirtableRecord {
        AirtableRecord {
            id: "recABC".into(),
            created_time: Some(Utc::now()),
            fields: fields.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn formula_strings_escape_quotes() {
        assert_eq!(formula_string("abc"), "'abc'");
        assert_eq!(formula_string("a'b"), "'a\\'b'");
        assert_eq!(formula_string("a\\b"), "'a\\\\b'");
    }

    #[test]
    fn candidate_fields_fall_back_to_legacy_names() {
        let c = candidate_from_record(record(json!({
            "Name": "Grace",
            "Email": "grace@example.com",
            "AppointmentTime": "2024-01-01T10:00:00Z",
            "Status": "Accept",
            "score": "8",
            "InterviewCompleted": true,
            "Call Attempts": 1
        })));
        assert_eq!(c.name, "Grace");
        assert_eq!(c.status, CandidateStatus::Accepted);
        assert_eq!(c.result.overall_score, Some(8));
        assert!(c.interview_completed);
        assert_eq!(c.call_attempts, 1);
        assert_eq!(
            c.appointment_time.map(|t| t.to_rfc3339()),
            Some("2024-01-01T10:00:00+00:00".to_string())
        );
    }

    #[test]
    fn patch_only_writes_present_fields() {
        let out = patch_to_fields(CandidatePatch {
            status: Some(CandidateStatus::Rejected),
            call_attempts: Some(1),
            ..Default::default()
        });
        assert_eq!(out.len(), 2);
        assert_eq!(out["status"], json!("reject"));
        assert_eq!(out["Call Attempts"], json!(1));
    }

    #[test]
    fn clearing_reset_token_sends_null() {
        let out = user_patch_to_fields(UserPatch::clear_reset());
        assert_eq!(out["Reset Token"], JsonValue::Null);
        assert_eq!(out["Reset Token Expiry"], JsonValue::Null);
    }

    #[test]
    fn table_url_encodes_table_name() {
        let client = AirtableClient::new("https://api.airtable.com/v0", "key", "appXYZ").unwrap();
        let url = client.table_url("Dashboard Users", Some("rec1")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.airtable.com/v0/appXYZ/Dashboard%20Users/rec1"
        );
    }
}
