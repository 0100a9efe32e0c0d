use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::database::store::UserStore;
use crate::error::{Error, Result};
use crate::middleware::auth::Claims;
use crate::models::user::{DashboardUser, NewUser, UserPatch, UserRole};
use crate::services::email_service::{templates, EmailService};
use crate::utils::crypto::{hash_password, verify_password};
use crate::utils::links::page_link;
use crate::utils::token::generate_reset_token;
use crate::utils::validation::password_policy;

pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub password: Option<String>,
}

/// Dashboard accounts and JWT sessions.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    email: EmailService,
    jwt_secret: String,
    jwt_ttl_hours: i64,
    base_url: String,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        email: EmailService,
        jwt_secret: String,
        jwt_ttl_hours: i64,
        base_url: String,
    ) -> Self {
        Self {
            users,
            email,
            jwt_secret,
            jwt_ttl_hours,
            base_url,
        }
    }

    pub fn issue_token(&self, user: &DashboardUser) -> Result<String> {
        let exp = Utc::now() + Duration::hours(self.jwt_ttl_hours);
        let claims = Claims {
            sub: user.id.clone(),
            exp: exp.timestamp() as usize,
            role: Some(user.role.as_str().to_string()),
            email: Some(user.email.clone()),
        };
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?)
    }

    pub fn decode_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )?;
        Ok(data.claims)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(String, DashboardUser)> {
        let Some(user) = self.users.find_by_email(email.trim()).await? else {
            tracing::info!("login failed: unknown email");
            return Err(Error::Unauthorized(INVALID_CREDENTIALS.into()));
        };
        let verified = user
            .password_hash
            .as_deref()
            .is_some_and(|hash| verify_password(password, hash));
        if !verified {
            tracing::info!(user_id = %user.id, "login failed: bad password");
            return Err(Error::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        let user = self
            .users
            .update(
                &user.id,
                UserPatch {
                    last_login: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;
        let token = self.issue_token(&user)?;
        tracing::info!(user_id = %user.id, role = user.role.as_str(), "login");
        Ok((token, user))
    }

    pub async fn current_user(&self, user_id: &str) -> Result<DashboardUser> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".into()))
    }

    /// Never reveals whether the address has an account.
    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let Some(user) = self.users.find_by_email(email.trim()).await? else {
            tracing::info!("password reset requested for unknown email");
            return Ok(());
        };

        let token = generate_reset_token();
        let expiry = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.users
            .update(
                &user.id,
                UserPatch {
                    reset_token: Some(Some(token.clone())),
                    reset_token_expiry: Some(Some(expiry)),
                    ..Default::default()
                },
            )
            .await?;

        let link = page_link(&self.base_url, "reset-password.html", &[("token", token.as_str())])?;
        self.email
            .dispatch(templates::password_reset(&user.email, &user.name, &link));
        tracing::info!(user_id = %user.id, "password reset token issued");
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<()> {
        self.reset_password_at(token, new_password, Utc::now()).await
    }

    pub async fn reset_password_at(
        &self,
        token: &str,
        new_password: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let invalid = || Error::BadRequest("Invalid or expired reset token".into());
        if token.trim().is_empty() {
            return Err(invalid());
        }
        let user = self
            .users
            .find_by_reset_token(token)
            .await?
            .ok_or_else(invalid)?;
        if !user.reset_token_expiry.is_some_and(|expiry| expiry > now) {
            tracing::info!(user_id = %user.id, "expired reset token presented");
            return Err(invalid());
        }

        let password_hash = checked_hash(new_password)?;
        let mut patch = UserPatch::clear_reset();
        patch.password_hash = Some(password_hash);
        self.users.update(&user.id, patch).await?;

        self.email
            .dispatch(templates::password_changed(&user.email, &user.name));
        tracing::info!(user_id = %user.id, "password reset");
        Ok(())
    }

    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let user = self.current_user(user_id).await?;
        let verified = user
            .password_hash
            .as_deref()
            .is_some_and(|hash| verify_password(current_password, hash));
        if !verified {
            return Err(Error::BadRequest("Current password is incorrect".into()));
        }

        let password_hash = checked_hash(new_password)?;
        self.users
            .update(
                &user.id,
                UserPatch {
                    password_hash: Some(password_hash),
                    ..Default::default()
                },
            )
            .await?;

        self.email
            .dispatch(templates::password_changed(&user.email, &user.name));
        tracing::info!(user_id = %user.id, "password changed");
        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<DashboardUser>> {
        self.users.list().await
    }

    pub async fn create_user(
        &self,
        email: &str,
        name: &str,
        role: UserRole,
        password: &str,
    ) -> Result<DashboardUser> {
        let email = email.trim().to_lowercase();
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(Error::Conflict("A user with this email already exists".into()));
        }
        let password_hash = checked_hash(password)?;
        let user = self
            .users
            .create(NewUser {
                email,
                name: name.trim().to_string(),
                role,
                password_hash,
            })
            .await?;
        tracing::info!(user_id = %user.id, role = user.role.as_str(), "user created");
        Ok(user)
    }

    pub async fn update_user(&self, id: &str, update: UserUpdate) -> Result<DashboardUser> {
        let email = update.email.map(|e| e.trim().to_lowercase());
        if let Some(email) = &email {
            if let Some(existing) = self.users.find_by_email(email).await? {
                if existing.id != id {
                    return Err(Error::Conflict("A user with this email already exists".into()));
                }
            }
        }
        let password_hash = update.password.as_deref().map(checked_hash).transpose()?;
        self.users
            .update(
                id,
                UserPatch {
                    email,
                    name: update.name,
                    role: update.role,
                    password_hash,
                    ..Default::default()
                },
            )
            .await
    }

    pub async fn delete_user(&self, actor_id: &str, id: &str) -> Result<()> {
        if actor_id == id {
            return Err(Error::BadRequest("You cannot delete your own account".into()));
        }
        if !self.users.delete(id).await? {
            return Err(Error::NotFound("User not found".into()));
        }
        tracing::info!(user_id = %id, actor = %actor_id, "user deleted");
        Ok(())
    }

    /// Sets a password without the current one. Used by the admin CLI.
    pub async fn set_password(&self, email: &str, new_password: &str) -> Result<DashboardUser> {
        let user = self
            .users
            .find_by_email(email.trim())
            .await?
            .ok_or_else(|| Error::NotFound("User not found".into()))?;
        let mut patch = UserPatch::clear_reset();
        patch.password_hash = Some(checked_hash(new_password)?);
        self.users.update(&user.id, patch).await
    }
}

fn checked_hash(password: &str) -> Result<String> {
    password_policy(password).map_err(|e| {
        Error::BadRequest(
            e.message
                .map(|m| m.into_owned())
                .unwrap_or_else(|| "Password does not meet requirements".into()),
        )
    })?;
    Ok(hash_password(password)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryUserStore;
    use crate::services::email_service::LogMailer;
    use crate::services::notification_service::RetryPolicy;

    fn service() -> (AuthService, Arc<MemoryUserStore>) {
        let store = Arc::new(MemoryUserStore::new());
        let email = EmailService::new(
            Arc::new(LogMailer::new()),
            RetryPolicy {
                max_attempts: 1,
                delay: std::time::Duration::from_millis(1),
            },
        );
        let svc = AuthService::new(
            store.clone(),
            email,
            "jwt-secret".into(),
            8,
            "https://bloom.test".into(),
        );
        (svc, store)
    }

    #[tokio::test]
    async fn login_issues_decodable_token() {
        let (svc, _) = service();
        let user = svc
            .create_user("Admin@Bloom.test", "Admin", UserRole::Admin, "Admin123")
            .await
            .unwrap();
        assert_eq!(user.email, "admin@bloom.test");

        let (token, logged_in) = svc.login("ADMIN@bloom.test", "Admin123").await.unwrap();
        assert!(logged_in.last_login.is_some());
        let claims = svc.decode_token(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role.as_deref(), Some("admin"));

        assert!(matches!(
            svc.login("admin@bloom.test", "wrong").await,
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            svc.login("nobody@bloom.test", "Admin123").await,
            Err(Error::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn weak_password_is_rejected() {
        let (svc, _) = service();
        let err = svc
            .create_user("u@bloom.test", "U", UserRole::User, "weak")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[tokio::test]
    async fn reset_token_flow_and_expiry() {
        let (svc, store) = service();
        let user = svc
            .create_user("u@bloom.test", "U", UserRole::User, "Passw0rdA")
            .await
            .unwrap();

        svc.forgot_password("nobody@bloom.test").await.unwrap();
        svc.forgot_password("u@bloom.test").await.unwrap();
        let stored = store.find_by_id(&user.id).await.unwrap().unwrap();
        let token = stored.reset_token.clone().unwrap();
        assert_eq!(token.len(), 64);

        let late = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES + 1);
        assert!(svc
            .reset_password_at(&token, "NewPassw0rd", late)
            .await
            .is_err());

        svc.reset_password(&token, "NewPassw0rd").await.unwrap();
        let stored = store.find_by_id(&user.id).await.unwrap().unwrap();
        assert!(stored.reset_token.is_none());
        assert!(svc.login("u@bloom.test", "NewPassw0rd").await.is_ok());
        assert!(svc.reset_password(&token, "Another1A").await.is_err());
    }

    #[tokio::test]
    async fn change_password_requires_current() {
        let (svc, _) = service();
        let user = svc
            .create_user("u@bloom.test", "U", UserRole::User, "Passw0rdA")
            .await
            .unwrap();
        assert!(matches!(
            svc.change_password(&user.id, "nope", "NewPassw0rd").await,
            Err(Error::BadRequest(_))
        ));
        svc.change_password(&user.id, "Passw0rdA", "NewPassw0rd")
            .await
            .unwrap();
        assert!(svc.login("u@bloom.test", "NewPassw0rd").await.is_ok());
    }

    #[tokio::test]
    async fn admin_cannot_delete_self() {
        let (svc, _) = service();
        let admin = svc
            .create_user("a@bloom.test", "A", UserRole::Admin, "Admin123")
            .await
            .unwrap();
        let other = svc
            .create_user("b@bloom.test", "B", UserRole::User, "Admin123")
            .await
            .unwrap();
        assert!(matches!(
            svc.delete_user(&admin.id, &admin.id).await,
            Err(Error::BadRequest(_))
        ));
        svc.delete_user(&admin.id, &other.id).await.unwrap();
        assert!(matches!(
            svc.delete_user(&admin.id, &other.id).await,
            Err(Error::NotFound(_))
        ));
    }
}
