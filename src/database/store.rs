use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::StoreConfig;
use crate::database::{
    airtable::{AirtableCandidateStore, AirtableClient, AirtableUserStore},
    memory::{MemoryCandidateStore, MemoryUserStore},
    pool::connect_postgres,
    postgres::{PgCandidateStore, PgUserStore},
};
use crate::error::Result;
use crate::models::candidate::{AdmissionCommit, CandidatePatch, CandidateRecord, NewCandidate};
use crate::models::user::{DashboardUser, NewUser, UserPatch};

/// System of record for candidates. Lookups by token are exact matches.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    async fn find_by_token(&self, token: &str) -> Result<Option<CandidateRecord>>;

    async fn find_by_management_token(&self, token: &str) -> Result<Option<CandidateRecord>>;

    async fn get(&self, id: &str) -> Result<Option<CandidateRecord>>;

    async fn list(&self) -> Result<Vec<CandidateRecord>>;

    async fn create(&self, candidate: NewCandidate) -> Result<CandidateRecord>;

    /// Fails with `Error::NotFound` when the record does not exist.
    async fn update(&self, id: &str, patch: CandidatePatch) -> Result<CandidateRecord>;

    async fn delete(&self, id: &str) -> Result<bool>;

    /// Marks the interview as entered, at most once per token.
    ///
    /// The write only happens when the record has no recorded attempt and is
    /// not flagged as interviewed; otherwise the current record comes back as
    /// `AlreadyStarted` untouched. Concurrent callers for the same token get
    /// exactly one `Committed`.
    async fn commit_admission(&self, token: &str, now: DateTime<Utc>) -> Result<AdmissionCommit>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Case-insensitive.
    async fn find_by_email(&self, email: &str) -> Result<Option<DashboardUser>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<DashboardUser>>;

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<DashboardUser>>;

    async fn list(&self) -> Result<Vec<DashboardUser>>;

    async fn create(&self, user: NewUser) -> Result<DashboardUser>;

    async fn update(&self, id: &str, patch: UserPatch) -> Result<DashboardUser>;

    async fn delete(&self, id: &str) -> Result<bool>;
}

#[derive(Clone)]
pub struct Stores {
    pub candidates: Arc<dyn CandidateStore>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    pub fn memory() -> Self {
        Self {
            candidates: Arc::new(MemoryCandidateStore::new()),
            users: Arc::new(MemoryUserStore::new()),
        }
    }
}

pub async fn connect(config: &StoreConfig, lock_timeout: Duration) -> Result<Stores> {
    match config {
        StoreConfig::Postgres { database_url } => {
            let pool = connect_postgres(database_url).await?;
            Ok(Stores {
                candidates: Arc::new(PgCandidateStore::new(pool.clone())),
                users: Arc::new(PgUserStore::new(pool)),
            })
        }
        StoreConfig::Airtable {
            api_url,
            api_key,
            base_id,
            candidates_table,
            users_table,
        } => {
            let client = AirtableClient::new(api_url, api_key, base_id)?;
            Ok(Stores {
                candidates: Arc::new(AirtableCandidateStore::new(
                    client.clone(),
                    candidates_table.clone(),
                    lock_timeout,
                )),
                users: Arc::new(AirtableUserStore::new(client, users_table.clone())),
            })
        }
        StoreConfig::Memory => Ok(Stores::memory()),
    }
}
