use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::store::{CandidateStore, UserStore};
use crate::error::{Error, Result};
use crate::models::candidate::{
    AdmissionCommit, CandidatePatch, CandidateRecord, CandidateStatus, NewCandidate,
    ACTION_INTERVIEWED,
};
use crate::models::user::{DashboardUser, NewUser, UserPatch};

/// In-process candidate table. The admission commit runs under the map lock,
/// which makes it a compare-and-set.
#[derive(Clone, Default)]
pub struct MemoryCandidateStore {
    records: Arc<Mutex<HashMap<String, CandidateRecord>>>,
}

impl MemoryCandidateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self) -> MutexGuard<'_, HashMap<String, CandidateRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts a fully formed record, replacing any record with the same id.
    pub fn insert(&self, record: CandidateRecord) {
        self.records().insert(record.id.clone(), record);
    }
}

#[async_trait]
impl CandidateStore for MemoryCandidateStore {
    async fn find_by_token(&self, token: &str) -> Result<Option<CandidateRecord>> {
        Ok(self
            .records()
            .values()
            .find(|r| r.token.as_deref() == Some(token))
            .cloned())
    }

    async fn find_by_management_token(&self, token: &str) -> Result<Option<CandidateRecord>> {
        Ok(self
            .records()
            .values()
            .find(|r| r.management_token.as_deref() == Some(token))
            .cloned())
    }

    async fn get(&self, id: &str) -> Result<Option<CandidateRecord>> {
        Ok(self.records().get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<CandidateRecord>> {
        Ok(self.records().values().cloned().collect())
    }

    async fn create(&self, candidate: NewCandidate) -> Result<CandidateRecord> {
        let mut record = CandidateRecord::new(Uuid::new_v4().to_string(), candidate.name, candidate.email);
        record.phone = candidate.phone;
        self.insert(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, patch: CandidatePatch) -> Result<CandidateRecord> {
        let mut records = self.records();
        let record = records
            .get_mut(id)
            .ok_or_else(|| Error::NotFound("Candidate not found".into()))?;
        patch.apply(record, Utc::now());
        Ok(record.clone())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.records().remove(id).is_some())
    }

    async fn commit_admission(&self, token: &str, now: DateTime<Utc>) -> Result<AdmissionCommit> {
        let mut records = self.records();
        let Some(record) = records
            .values_mut()
            .find(|r| r.token.as_deref() == Some(token))
        else {
            return Ok(AdmissionCommit::NotFound);
        };

        let attempts = record.call_attempts + 1;
        if record.interview_started() || attempts > 1 {
            return Ok(AdmissionCommit::AlreadyStarted(record.clone()));
        }
        if record.is_cancelled() {
            return Ok(AdmissionCommit::Cancelled(record.clone()));
        }

        record.action = Some(ACTION_INTERVIEWED.to_string());
        record.interview_completed = true;
        record.status = CandidateStatus::Pending;
        record.call_attempts = attempts;
        record.call_started_at = Some(now);
        record.updated_at = now;
        Ok(AdmissionCommit::Committed(record.clone()))
    }
}

#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<Mutex<HashMap<String, DashboardUser>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn users(&self) -> MutexGuard<'_, HashMap<String, DashboardUser>> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<DashboardUser>> {
        Ok(self
            .users()
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<DashboardUser>> {
        Ok(self.users().get(id).cloned())
    }

    async fn find_by_reset_token(&self, token: &str) -> Result<Option<DashboardUser>> {
        Ok(self
            .users()
            .values()
            .find(|u| u.reset_token.as_deref() == Some(token))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<DashboardUser>> {
        let mut users: Vec<DashboardUser> = self.users().values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn create(&self, user: NewUser) -> Result<DashboardUser> {
        let mut users = self.users();
        if users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(Error::Conflict("User already exists".into()));
        }
        let created = DashboardUser {
            id: Uuid::new_v4().to_string(),
            email: user.email,
            name: user.name,
            role: user.role,
            password_hash: Some(user.password_hash),
            reset_token: None,
            reset_token_expiry: None,
            created_at: Some(Utc::now()),
            last_login: None,
        };
        users.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, patch: UserPatch) -> Result<DashboardUser> {
        let mut users = self.users();
        let user = users
            .get_mut(id)
            .ok_or_else(|| Error::NotFound("User not found".into()))?;
        patch.apply(user);
        Ok(user.clone())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.users().remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn commit_admission_is_single_shot() {
        let store = MemoryCandidateStore::new();
        let created = store
            .create(NewCandidate {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                phone: None,
            })
            .await
            .unwrap();
        store
            .update(
                &created.id,
                CandidatePatch {
                    token: Some("tok".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let now = Utc::now();
        let first = store.commit_admission("tok", now).await.unwrap();
        let second = store.commit_admission("tok", now).await.unwrap();

        match first {
            AdmissionCommit::Committed(r) => {
                assert_eq!(r.call_attempts, 1);
                assert!(r.interview_completed);
                assert_eq!(r.action.as_deref(), Some(ACTION_INTERVIEWED));
            }
            other => panic!("expected commit, got {:?}", other),
        }
        match second {
            AdmissionCommit::AlreadyStarted(r) => assert_eq!(r.call_attempts, 1),
            other => panic!("expected duplicate, got {:?}", other),
        }
        assert!(matches!(
            store.commit_admission("nope", now).await.unwrap(),
            AdmissionCommit::NotFound
        ));
    }

    #[tokio::test]
    async fn user_email_lookup_ignores_case() {
        let store = MemoryUserStore::new();
        store
            .create(NewUser {
                email: "Admin@Example.com".into(),
                name: "Admin".into(),
                role: crate::models::user::UserRole::Admin,
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        assert!(store.find_by_email("admin@example.com").await.unwrap().is_some());
        let dup = store
            .create(NewUser {
                email: "ADMIN@example.com".into(),
                name: "Other".into(),
                role: crate::models::user::UserRole::User,
                password_hash: "hash".into(),
            })
            .await;
        assert!(matches!(dup, Err(Error::Conflict(_))));
    }
}
