//! Login, sessions and password management.
//!
//! Password hashes live next to the store rather than inside it, so a store
//! snapshot never carries credentials. The logged-in user is mirrored to
//! `current_user.json` in the data directory to survive restarts.

use crate::error::AuthError;
use crate::forms::MIN_PASSWORD_LEN;
use crate::model::User;
use crate::seed::{ADMIN_ID, ADMIN_PASSWORD};
use crate::store::DataStore;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File holding the logged-in user inside the data directory
pub const SESSION_FILE: &str = "current_user.json";

/// Session lifetime in hours
pub const SESSION_DURATION_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: u64,
    pub expires_at: DateTime<Utc>,
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub token: String,
    pub user: User,
}

#[derive(Debug)]
pub struct AuthService {
    data_dir: PathBuf,
    hashes: HashMap<u64, String>,
    sessions: HashMap<String, Session>,
    session_duration: Duration,
}

impl AuthService {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        AuthService {
            data_dir: data_dir.into(),
            hashes: HashMap::new(),
            sessions: HashMap::new(),
            session_duration: Duration::hours(SESSION_DURATION_HOURS),
        }
    }

    pub fn with_session_duration(mut self, duration: Duration) -> Self {
        self.session_duration = duration;
        self
    }

    pub fn session_file(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE)
    }

    /// Gives the administrator account its default password
    pub fn seed_admin(&mut self) -> Result<(), AuthError> {
        self.set_password(ADMIN_ID, ADMIN_PASSWORD)
    }

    pub fn set_password(&mut self, user_id: u64, password: &str) -> Result<(), AuthError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::PasswordTooShort);
        }
        let hash = hash_password(password)?;
        self.hashes.insert(user_id, hash);
        Ok(())
    }

    pub fn has_password(&self, user_id: u64) -> bool {
        self.hashes.contains_key(&user_id)
    }

    /// Authenticates by email and password
    ///
    /// # Arguments
    /// * `store` - Store holding the accounts; the user's last session time is stamped there
    /// * `email` - Account email, compared case-insensitively
    /// * `password` - Plaintext password
    ///
    /// # Returns
    /// * `Result<LoginSession, AuthError>` - The session token and the logged-in user
    ///
    /// # Errors
    /// * `InvalidCredentials` for an unknown email, an account without password or a wrong password
    /// * `InactiveUser` when the account is disabled
    /// * `SessionIo` / `SessionData` when the session file cannot be written
    pub fn login(
        &mut self,
        store: &mut DataStore,
        email: &str,
        password: &str,
    ) -> Result<LoginSession, AuthError> {
        let user = store
            .user_by_email(email)
            .ok_or(AuthError::InvalidCredentials)?;
        let user_id = user.id;
        if !user.ativo {
            warn!("login refused for inactive user {}", user_id);
            return Err(AuthError::InactiveUser);
        }

        let hash = self
            .hashes
            .get(&user_id)
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(password, hash)? {
            warn!("wrong password for user {}", user_id);
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        let user = store
            .touch_last_session(user_id, now)
            .map_err(|_| AuthError::InvalidCredentials)?
            .clone();
        self.persist_user(&user)?;

        let token = Uuid::new_v4().to_string();
        self.sessions.insert(
            token.clone(),
            Session {
                user_id,
                expires_at: now + self.session_duration,
            },
        );
        info!("user {} logged in", user_id);

        Ok(LoginSession { token, user })
    }

    /// Drops the session and forgets the persisted user
    pub fn logout(&mut self, token: &str) -> Result<(), AuthError> {
        if let Some(session) = self.sessions.remove(token) {
            info!("user {} logged out", session.user_id);
        }
        match fs::remove_file(self.session_file()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// User id of an unexpired session
    pub fn validate_session(&self, token: &str) -> Option<u64> {
        self.sessions
            .get(token)
            .filter(|s| s.expires_at > Utc::now())
            .map(|s| s.user_id)
    }

    /// Removes expired sessions, returning their tokens
    pub fn purge_expired(&mut self) -> Vec<String> {
        let now = Utc::now();
        self.drop_sessions(|s| s.expires_at <= now)
    }

    /// The user persisted by the last login, if any
    pub fn restore(&self) -> Result<Option<User>, AuthError> {
        let path = self.session_file();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Re-persists the logged-in user after an edit
    ///
    /// Nothing is written when no user is logged in or when `user` is someone else.
    pub fn update_current_user(&self, user: &User) -> Result<bool, AuthError> {
        match self.restore()? {
            Some(current) if current.id == user.id => {
                self.persist_user(user)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn change_password(
        &mut self,
        user_id: u64,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let hash = self
            .hashes
            .get(&user_id)
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(old_password, hash)? {
            return Err(AuthError::InvalidCredentials);
        }
        self.set_password(user_id, new_password)?;
        info!("password changed for user {}", user_id);
        Ok(())
    }

    /// Forgets the credentials and sessions of a deleted account, returning the dropped tokens
    pub fn remove_user(&mut self, user_id: u64) -> Vec<String> {
        self.hashes.remove(&user_id);
        self.drop_sessions(|s| s.user_id == user_id)
    }

    fn drop_sessions(&mut self, doomed: impl Fn(&Session) -> bool) -> Vec<String> {
        let tokens: Vec<String> = self
            .sessions
            .iter()
            .filter(|(_, s)| doomed(s))
            .map(|(token, _)| token.clone())
            .collect();
        for token in &tokens {
            self.sessions.remove(token);
        }
        if !tokens.is_empty() {
            debug!("dropped {} sessions", tokens.len());
        }
        tokens
    }

    fn persist_user(&self, user: &User) -> Result<(), AuthError> {
        ensure_dir(&self.data_dir)?;
        let json = serde_json::to_string_pretty(user)?;
        fs::write(self.session_file(), json)?;
        Ok(())
    }
}

fn ensure_dir(dir: &Path) -> std::io::Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    match argon2.hash_password(password.as_bytes(), &salt) {
        Ok(hash) => Ok(hash.to_string()),
        Err(e) => Err(AuthError::Hashing(e.to_string())),
    }
}

fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| AuthError::Hashing(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(_) => Ok(false),
    }
}
