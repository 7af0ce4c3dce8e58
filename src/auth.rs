//! Sign-in and sign-up.
//!
//! Account handling sits behind [`IdentityProvider`]. [`LocalIdentityProvider`] is an in-process
//! stand-in for a hosted provider: Argon2id password hashes, optional JSON persistence and an
//! explicit [`LocalIdentityProvider::confirm`] step in place of the emailed confirmation link.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::SessionContext;
use crate::library::UserId;
use crate::nav::Route;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const PASSWORDS_DO_NOT_MATCH: &str = "Passwords do not match";
pub const CHECK_EMAIL: &str =
    "Check your email to confirm your account! Then you can start creating QR codes.";

/// Provider failures. `Display` is the provider's message, shown verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,
    #[error("Email not confirmed")]
    EmailNotConfirmed,
    #[error("User already registered")]
    AlreadyRegistered,
    #[error("Password should be at least 6 characters")]
    WeakPassword,
    #[error("Unable to validate email address: invalid format")]
    InvalidEmail,
    #[error("No account registered for {0}")]
    UnknownAccount(String),
    #[error("{0}")]
    Provider(String),
}

/// The signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    pub email: String,
}

pub trait IdentityProvider {
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<AuthUser, AuthError>>;
    /// Registers a new account. It cannot sign in until confirmed.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> impl std::future::Future<Output = Result<AuthUser, AuthError>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Account {
    id: UserId,
    email: String,
    password_hash: String,
    confirmed: bool,
    created_at: DateTime<Utc>,
}

/// Hash a password using Argon2id. Returns a PHC-format string.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Provider(format!("Failed to hash password: {e}")))
}

/// Verify a password against a PHC-format hash string.
fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AuthError::Provider(format!("Invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Debug, Default)]
pub struct LocalIdentityProvider {
    accounts: Mutex<HashMap<String, Account>>,
    path: Option<PathBuf>,
}

impl LocalIdentityProvider {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the account file at `path`; a missing file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AuthError> {
        let path = path.into();
        let accounts = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<Vec<Account>>(&bytes)
                .map_err(|e| AuthError::Provider(format!("corrupt account file '{}': {e}", path.display())))?
                .into_iter()
                .map(|a| (a.email.clone(), a))
                .collect(),
            Err(e) if e.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(AuthError::Provider(format!(
                    "cannot read account file '{}': {e}",
                    path.display()
                )))
            }
        };
        Ok(Self {
            accounts: Mutex::new(accounts),
            path: Some(path),
        })
    }

    /// Marks an account as confirmed, as the emailed link would.
    pub fn confirm(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let mut accounts = self.accounts();
        let account = accounts
            .get_mut(&email)
            .ok_or_else(|| AuthError::UnknownAccount(email.clone()))?;
        account.confirmed = true;
        self.persist(&accounts)?;
        info!(%email, "account confirmed");
        Ok(())
    }

    fn accounts(&self) -> MutexGuard<'_, HashMap<String, Account>> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, accounts: &HashMap<String, Account>) -> Result<(), AuthError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut list: Vec<&Account> = accounts.values().collect();
        list.sort_by(|a, b| a.email.cmp(&b.email));
        let bytes = serde_json::to_vec_pretty(&list).map_err(|e| AuthError::Provider(e.to_string()))?;
        write_file(path, &bytes)
            .map_err(|e| AuthError::Provider(format!("cannot write account file '{}': {e}", path.display())))
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)
}

impl IdentityProvider for LocalIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let email = normalize_email(email);
        let accounts = self.accounts();
        let account = accounts.get(&email).ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(password, &account.password_hash)? {
            warn!(%email, "sign-in rejected");
            return Err(AuthError::InvalidCredentials);
        }
        if !account.confirmed {
            return Err(AuthError::EmailNotConfirmed);
        }
        info!(%email, "signed in");
        Ok(AuthUser {
            id: account.id,
            email: account.email.clone(),
        })
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        let email = normalize_email(email);
        if email.is_empty() || !email.contains('@') {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        let mut accounts = self.accounts();
        if accounts.contains_key(&email) {
            return Err(AuthError::AlreadyRegistered);
        }
        let account = Account {
            id: Uuid::new_v4(),
            email: email.clone(),
            password_hash: hash_password(password)?,
            confirmed: false,
            created_at: Utc::now(),
        };
        let user = AuthUser {
            id: account.id,
            email: account.email.clone(),
        };
        accounts.insert(email.clone(), account);
        if let Err(e) = self.persist(&accounts) {
            accounts.remove(&email);
            return Err(e);
        }
        info!(%email, "account registered");
        Ok(user)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

/// What the sign-in/sign-up modal submits.
#[derive(Debug, Clone, Default)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
    /// Only checked when signing up.
    pub confirm_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    SignedIn { user: AuthUser, next: Route },
    SignedUp { message: &'static str },
    Failed { message: String },
}

/// Submits auth forms to a provider and records successful sign-ins in the session.
pub struct AuthGate<P> {
    provider: P,
}

impl<P: IdentityProvider> AuthGate<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub async fn submit(&self, form: &AuthForm, session: &mut SessionContext) -> AuthOutcome {
        match form.mode {
            AuthMode::SignIn => match self.provider.sign_in(&form.email, &form.password).await {
                Ok(user) => match session.sign_in(user.clone()) {
                    Ok(()) => AuthOutcome::SignedIn {
                        user,
                        next: Route::create(),
                    },
                    Err(e) => AuthOutcome::Failed { message: e.to_string() },
                },
                Err(e) => AuthOutcome::Failed { message: e.to_string() },
            },
            AuthMode::SignUp => {
                if form.password != form.confirm_password {
                    return AuthOutcome::Failed {
                        message: PASSWORDS_DO_NOT_MATCH.to_string(),
                    };
                }
                match self.provider.sign_up(&form.email, &form.password).await {
                    Ok(_) => AuthOutcome::SignedUp { message: CHECK_EMAIL },
                    Err(e) => AuthOutcome::Failed { message: e.to_string() },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(mode: AuthMode, email: &str, password: &str, confirm: &str) -> AuthForm {
        AuthForm {
            mode,
            email: email.into(),
            password: password.into(),
            confirm_password: confirm.into(),
        }
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
        assert!(verify_password("x", "not a hash").is_err());
    }

    #[tokio::test]
    async fn test_provider_messages() {
        let provider = LocalIdentityProvider::in_memory();
        assert_eq!(provider.sign_up("a@b.c", "12345").await, Err(AuthError::WeakPassword));
        provider.sign_up("A@b.c ", "123456").await.unwrap();
        assert_eq!(provider.sign_up("a@b.c", "123456").await, Err(AuthError::AlreadyRegistered));
        assert_eq!(provider.sign_in("a@b.c", "123456").await, Err(AuthError::EmailNotConfirmed));
        assert_eq!(provider.sign_in("a@b.c", "nope").await, Err(AuthError::InvalidCredentials));
        assert_eq!(provider.sign_in("z@b.c", "123456").await, Err(AuthError::InvalidCredentials));

        provider.confirm("a@b.c").unwrap();
        let user = provider.sign_in("a@b.c", "123456").await.unwrap();
        assert_eq!(user.email, "a@b.c");
    }

    #[tokio::test]
    async fn test_accounts_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        let id = {
            let provider = LocalIdentityProvider::open(&path).unwrap();
            let user = provider.sign_up("jane@example.com", "secret1").await.unwrap();
            provider.confirm("jane@example.com").unwrap();
            user.id
        };
        let provider = LocalIdentityProvider::open(&path).unwrap();
        assert_eq!(provider.sign_in("jane@example.com", "secret1").await.unwrap().id, id);
    }

    #[tokio::test]
    async fn test_gate_sign_up_then_sign_in() {
        let gate = AuthGate::new(LocalIdentityProvider::in_memory());
        let mut session = SessionContext::ephemeral();

        let outcome = gate
            .submit(&form(AuthMode::SignUp, "jane@example.com", "secret1", "secret2"), &mut session)
            .await;
        assert_eq!(outcome, AuthOutcome::Failed { message: "Passwords do not match".into() });

        let outcome = gate
            .submit(&form(AuthMode::SignUp, "jane@example.com", "secret1", "secret1"), &mut session)
            .await;
        assert_eq!(outcome, AuthOutcome::SignedUp { message: CHECK_EMAIL });
        assert!(session.user().is_none());

        let outcome = gate
            .submit(&form(AuthMode::SignIn, "jane@example.com", "secret1", ""), &mut session)
            .await;
        assert_eq!(outcome, AuthOutcome::Failed { message: "Email not confirmed".into() });

        gate.provider().confirm("jane@example.com").unwrap();
        let outcome = gate
            .submit(&form(AuthMode::SignIn, "jane@example.com", "secret1", ""), &mut session)
            .await;
        let AuthOutcome::SignedIn { user, next } = outcome else {
            panic!("expected sign-in, got {outcome:?}");
        };
        assert_eq!(next, Route::create());
        assert_eq!(session.user(), Some(&user));
    }
}
