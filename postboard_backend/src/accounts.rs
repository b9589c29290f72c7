//! Registration, sign-in and password reset.

use crate::auth::password::{hash_password, validate_strength, verify_password};
use crate::auth::{Actor, ClaimVerifier, Role};
use crate::config::AuthConfig;
use crate::database::models::{NewUser, PasswordResetRecord, Status, UserRecord};
use crate::database::repositories::{PasswordResetRepository, UserRepository};
use crate::database::Database;
use crate::error::{DenyReason, PostboardError, PostboardResult};
use crate::utils::{is_expired, now_utc_iso, utc_iso_in};
use anyhow::Context;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

const LOGIN_LEN: std::ops::RangeInclusive<usize> = 3..=64;

/// Outbound mail. Delivery itself is left to the implementation.
pub trait Mailer: Send + Sync {
    fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Clone)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

impl Mailer for LogMailer {
    fn send(&self, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        tracing::info!(from = %self.from, to, subject, body, "outgoing mail");
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountInput {
    pub login: String,
    pub email: String,
    #[serde(alias = "fullName")]
    pub full_name: String,
    pub password: String,
    #[serde(alias = "passwordConfirmation")]
    pub password_confirmation: String,
}

/// Credentials for `login`. Clients send a login name, an email address, or
/// both; a non-blank login wins.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
}

impl LoginInput {
    pub fn identifier(&self) -> &str {
        [self.login.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|value| !value.is_empty())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: i64,
    pub role: Role,
    pub expires_in: u64,
}

#[derive(Clone)]
pub struct AccountService {
    database: Database,
    verifier: ClaimVerifier,
    mailer: Arc<dyn Mailer>,
    reset_token_ttl_secs: u64,
    reset_url_base: String,
}

impl AccountService {
    pub fn new(
        database: Database,
        verifier: ClaimVerifier,
        mailer: Arc<dyn Mailer>,
        auth: &AuthConfig,
    ) -> Self {
        Self {
            database,
            verifier,
            mailer,
            reset_token_ttl_secs: auth.reset_token_ttl_secs,
            reset_url_base: auth.reset_url_base.trim_end_matches('/').to_string(),
        }
    }

    /// Self-service sign-up. New accounts are always plain users.
    pub fn register(&self, input: AccountInput) -> PostboardResult<UserRecord> {
        create_account(&self.database, input, Role::User)
    }

    pub fn login(&self, input: LoginInput) -> PostboardResult<LoginResponse> {
        let identifier = input.identifier();
        if identifier.is_empty() || input.password.is_empty() {
            return Err(PostboardError::invalid(
                "login or email and password are required",
            ));
        }

        let user = self
            .database
            .with_repositories(|repos| repos.users().find_by_login_or_email(identifier))?
            .ok_or_else(|| PostboardError::Unauthenticated("invalid credentials".into()))?;

        if user.status != Status::Active {
            tracing::info!(user_id = user.id, "login refused for inactive account");
            return Err(PostboardError::Forbidden(DenyReason::InactiveAccount));
        }
        if !verify_password(&input.password, &user.password_hash)? {
            return Err(PostboardError::Unauthenticated("invalid credentials".into()));
        }

        let token = self.verifier.issue(user.id, user.role)?;
        tracing::info!(user_id = user.id, role = %user.role, "user logged in");
        Ok(LoginResponse {
            token,
            user_id: user.id,
            role: user.role,
            expires_in: self.verifier.ttl_secs(),
        })
    }

    /// Tokens are not tracked server side, so there is nothing to revoke.
    pub fn logout(&self, actor: &Actor) {
        tracing::info!(user_id = actor.id, "user logged out");
    }

    pub fn request_password_reset(&self, email: &str) -> PostboardResult<()> {
        let email = email.trim();
        let user = self
            .database
            .with_repositories(|repos| repos.users().find_by_email(email))?
            .ok_or_else(|| PostboardError::not_found("user"))?;

        let token = Uuid::new_v4().simple().to_string();
        self.database.with_repositories(|repos| {
            repos.password_resets().create(&PasswordResetRecord {
                token: token.clone(),
                user_id: user.id,
                expires_at: utc_iso_in(self.reset_token_ttl_secs),
            })
        })?;

        let link = format!("{}/{}", self.reset_url_base, token);
        self.mailer
            .send(
                &user.email,
                "Password Reset Request",
                &format!("Please reset your password using the following link: {link}"),
            )
            .context("failed to send password reset mail")?;
        tracing::info!(user_id = user.id, "password reset requested");
        Ok(())
    }

    pub fn confirm_password_reset(&self, token: &str, new_password: &str) -> PostboardResult<()> {
        validate_strength(new_password)?;
        let password_hash = hash_password(new_password)?;

        let user_id = self.database.with_transaction(|repos| {
            let resets = repos.password_resets();
            let reset = match resets.get(token)? {
                Some(reset) if !is_expired(&reset.expires_at) => reset,
                Some(_) => {
                    resets.delete(token)?;
                    return Ok(None);
                }
                None => return Ok(None),
            };
            repos.users().update_password(reset.user_id, &password_hash)?;
            resets.delete(token)?;
            Ok(Some(reset.user_id))
        })?;

        let user_id =
            user_id.ok_or_else(|| PostboardError::invalid("invalid or expired token"))?;
        tracing::info!(user_id, "password reset completed");
        Ok(())
    }
}

/// Validates and stores a new ACTIVE account with the given role.
pub fn create_account(
    database: &Database,
    input: AccountInput,
    role: Role,
) -> PostboardResult<UserRecord> {
    let login = validate_login(&input.login)?;
    let email = validate_email(&input.email)?;
    let full_name = input.full_name.trim().to_string();
    if full_name.is_empty() {
        return Err(PostboardError::invalid("full name is required"));
    }
    if input.password != input.password_confirmation {
        return Err(PostboardError::invalid(
            "password and password confirmation do not match",
        ));
    }
    validate_strength(&input.password)?;
    let password_hash = hash_password(&input.password)?;

    let user = database.with_transaction(|repos| {
        let users = repos.users();
        if users.find_by_login_or_email(&login)?.is_some() {
            return Err(PostboardError::Conflict("login already in use".into()).into());
        }
        if users.find_by_email(&email)?.is_some() {
            return Err(PostboardError::Conflict("email already in use".into()).into());
        }
        let id = users.create(&NewUser {
            login,
            email,
            full_name,
            password_hash,
            role,
            status: Status::Active,
            created_at: now_utc_iso(),
        })?;
        users
            .get(id)?
            .with_context(|| format!("user {id} missing right after insert"))
    })?;

    tracing::info!(user_id = user.id, role = %user.role, "account created");
    Ok(user)
}

pub(crate) fn validate_login(login: &str) -> PostboardResult<String> {
    let login = login.trim();
    if !LOGIN_LEN.contains(&login.chars().count()) {
        return Err(PostboardError::invalid(format!(
            "login must be between {} and {} characters",
            LOGIN_LEN.start(),
            LOGIN_LEN.end()
        )));
    }
    if login.contains('@') {
        return Err(PostboardError::invalid("login may not contain '@'"));
    }
    Ok(login.to_string())
}

pub(crate) fn validate_email(email: &str) -> PostboardResult<String> {
    let email = email.trim();
    if !email_pattern()?.is_match(email) {
        return Err(PostboardError::invalid(
            "enter a valid email address, like: yourname@email.com",
        ));
    }
    Ok(email.to_string())
}

fn email_pattern() -> PostboardResult<&'static Regex> {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    if let Some(pattern) = EMAIL.get() {
        return Ok(pattern);
    }
    let pattern = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
        .map_err(|err| PostboardError::Internal(err.into()))?;
    Ok(EMAIL.get_or_init(|| pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use std::sync::Mutex;

    const SECRET: &str = "account-tests-secret-0123456789abcdef";

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl Mailer for RecordingMailer {
        fn send(&self, to: &str, _subject: &str, body: &str) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push((to.to_string(), body.to_string()));
            Ok(())
        }
    }

    struct FailingMailer;

    impl Mailer for FailingMailer {
        fn send(&self, _to: &str, _subject: &str, _body: &str) -> anyhow::Result<()> {
            anyhow::bail!("smtp unreachable")
        }
    }

    fn service_with(db: &Database, mailer: Arc<dyn Mailer>) -> AccountService {
        let auth = AuthConfig::with_secret(SECRET);
        let verifier = ClaimVerifier::new(&auth.jwt_secret, auth.token_ttl_secs).unwrap();
        AccountService::new(db.clone(), verifier, mailer, &auth)
    }

    fn account(login: &str) -> AccountInput {
        AccountInput {
            login: login.into(),
            email: format!("{login}@example.com"),
            full_name: "Test User".into(),
            password: "Sup3r-secret".into(),
            password_confirmation: "Sup3r-secret".into(),
        }
    }

    #[test]
    fn register_then_login_issues_verifiable_token() {
        let db = test_support::database();
        let service = service_with(&db, Arc::new(LogMailer::new("noreply@test")));

        let user = service.register(account("alice")).unwrap();
        assert_eq!(user.role, Role::User);

        let session = service
            .login(LoginInput {
                login: None,
                email: Some("alice@example.com".into()),
                password: "Sup3r-secret".into(),
            })
            .unwrap();
        assert_eq!(session.user_id, user.id);
        let actor = service.verifier.verify(&session.token).unwrap();
        assert_eq!(actor, Actor::new(user.id, Role::User));
    }

    #[test]
    fn registration_validates_input() {
        let db = test_support::database();
        let service = service_with(&db, Arc::new(LogMailer::new("noreply@test")));

        let cases = [
            AccountInput {
                login: "ab".into(),
                ..account("short")
            },
            AccountInput {
                email: "not-an-email".into(),
                ..account("bademail")
            },
            AccountInput {
                password_confirmation: "different".into(),
                ..account("mismatch")
            },
            AccountInput {
                password: "alllowercase1".into(),
                password_confirmation: "alllowercase1".into(),
                ..account("weak")
            },
        ];
        for input in cases {
            let login = input.login.clone();
            assert!(
                matches!(service.register(input), Err(PostboardError::InvalidInput(_))),
                "{login}"
            );
        }
    }

    #[test]
    fn duplicate_login_or_email_conflicts() {
        let db = test_support::database();
        let service = service_with(&db, Arc::new(LogMailer::new("noreply@test")));
        service.register(account("bob")).unwrap();

        assert!(service.register(account("bob")).unwrap_err().is_conflict());
        let same_email = AccountInput {
            login: "bobby".into(),
            ..account("bob")
        };
        assert!(service.register(same_email).unwrap_err().is_conflict());
    }

    #[test]
    fn wrong_password_and_inactive_accounts_are_refused() {
        let db = test_support::database();
        let service = service_with(&db, Arc::new(LogMailer::new("noreply@test")));
        let user = service.register(account("carol")).unwrap();

        assert!(matches!(
            service.login(LoginInput {
                login: Some("carol".into()),
                email: None,
                password: "Wr0ng-password".into(),
            }),
            Err(PostboardError::Unauthenticated(_))
        ));

        db.with_repositories(|repos| {
            repos.conn().execute(
                "UPDATE users SET status = 'INACTIVE' WHERE id = ?1",
                [user.id],
            )?;
            Ok(())
        })
        .unwrap();
        assert!(matches!(
            service.login(LoginInput {
                login: Some("carol".into()),
                email: None,
                password: "Sup3r-secret".into(),
            }),
            Err(PostboardError::Forbidden(DenyReason::InactiveAccount))
        ));
    }

    #[test]
    fn password_reset_round_trip_is_single_use() {
        let db = test_support::database();
        let mailer = Arc::new(RecordingMailer::default());
        let service = service_with(&db, mailer.clone());
        service.register(account("dave")).unwrap();

        service.request_password_reset("dave@example.com").unwrap();
        let (to, body) = mailer.sent.lock().unwrap()[0].clone();
        assert_eq!(to, "dave@example.com");
        let token = body.rsplit('/').next().unwrap().to_string();

        service.confirm_password_reset(&token, "N3w-password").unwrap();
        assert!(matches!(
            service.confirm_password_reset(&token, "N3w-password"),
            Err(PostboardError::InvalidInput(_))
        ));
        assert!(service
            .login(LoginInput {
                login: Some("dave".into()),
                email: None,
                password: "N3w-password".into(),
            })
            .is_ok());
    }

    #[test]
    fn password_reset_failures() {
        let db = test_support::database();
        let service = service_with(&db, Arc::new(FailingMailer));
        service.register(account("erin")).unwrap();

        assert!(matches!(
            service.request_password_reset("nobody@example.com"),
            Err(PostboardError::NotFound(_))
        ));
        assert!(matches!(
            service.request_password_reset("erin@example.com"),
            Err(PostboardError::Internal(_))
        ));
        assert!(matches!(
            service.confirm_password_reset("bogus", "N3w-password"),
            Err(PostboardError::InvalidInput(_))
        ));
    }

    #[test]
    fn login_payload_may_carry_both_login_and_email() {
        let db = test_support::database();
        let service = service_with(&db, Arc::new(LogMailer::new("noreply@test")));
        let user = service.register(account("erin")).unwrap();

        let both: LoginInput = serde_json::from_value(serde_json::json!({
            "login": "erin",
            "email": "someone-else@example.com",
            "password": "Sup3r-secret",
        }))
        .unwrap();
        assert_eq!(both.identifier(), "erin");
        assert_eq!(service.login(both).unwrap().user_id, user.id);

        let email_only: LoginInput = serde_json::from_value(serde_json::json!({
            "login": "  ",
            "email": "erin@example.com",
            "password": "Sup3r-secret",
        }))
        .unwrap();
        assert_eq!(email_only.identifier(), "erin@example.com");
        assert_eq!(service.login(email_only).unwrap().user_id, user.id);

        let neither: LoginInput =
            serde_json::from_value(serde_json::json!({ "password": "Sup3r-secret" })).unwrap();
        assert!(matches!(
            service.login(neither),
            Err(PostboardError::InvalidInput(_))
        ));
    }
}
