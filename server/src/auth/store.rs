//! Durable credential store backed by SQLite.
//!
//! Accounts are keyed by the case-folded name; the name as registered is kept for
//! display. Passwords are stored as argon2 PHC strings.

use argon2::Argon2;
use chrono::Utc;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rusqlite::OptionalExtension;

use crate::auth::validate::{fold, is_email, is_name};
use crate::db::{self, DbPool};
use crate::error::AuthError;

/// Account details returned by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub email: String,
}

#[derive(Clone)]
pub struct CredentialStore {
    db: DbPool,
}

impl CredentialStore {
    /// Open (or create) the store under `data_dir`.
    pub fn open(data_dir: &str) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            db: db::init_db(data_dir)?,
        })
    }

    pub async fn exists(&self, name: &str) -> Result<bool, AuthError> {
        let db = self.db.clone();
        let key = fold(name);
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|e| AuthError::Store(format!("DB lock: {}", e)))?;
            let found = conn
                .query_row("SELECT 1 FROM users WHERE name_key = ?1", [&key], |_| Ok(()))
                .optional()
                .map_err(|e| AuthError::Store(e.to_string()))?;
            Ok(found.is_some())
        })
        .await
        .map_err(|e| AuthError::Store(format!("Task join: {}", e)))?
    }

    /// Create an account. Fails without touching the existing record if the name is taken.
    pub async fn register(&self, name: &str, password: &str, email: &str) -> Result<(), AuthError> {
        if !is_name(name) {
            return Err(AuthError::InvalidName);
        }
        if !is_email(email) {
            return Err(AuthError::MalformedEmail);
        }

        let db = self.db.clone();
        let name = name.to_string();
        let email = email.to_string();
        let password = password.to_string();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut password_hash::rand_core::OsRng);
            let hash = Argon2::default()
                .hash_password(password.as_bytes(), &salt)
                .map_err(|e| AuthError::Store(format!("hash_password: {}", e)))?
                .to_string();

            let conn = db
                .lock()
                .map_err(|e| AuthError::Store(format!("DB lock: {}", e)))?;

            let key = fold(&name);
            let taken = conn
                .query_row("SELECT 1 FROM users WHERE name_key = ?1", [&key], |_| Ok(()))
                .optional()
                .map_err(|e| AuthError::Store(e.to_string()))?;
            if taken.is_some() {
                return Err(AuthError::Duplicate);
            }

            conn.execute(
                "INSERT INTO users (name_key, name, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![key, name, email, hash, Utc::now().to_rfc3339()],
            )
            .map_err(|e| AuthError::Store(format!("Insert user: {}", e)))?;

            tracing::info!(name = %name, "User registered");
            Ok(())
        })
        .await
        .map_err(|e| AuthError::Store(format!("Task join: {}", e)))?
    }

    pub async fn login(&self, name: &str, password: &str) -> Result<Profile, AuthError> {
        let db = self.db.clone();
        let key = fold(name);
        let password = password.to_string();

        tokio::task::spawn_blocking(move || {
            let row: Option<(String, String, String)> = {
                let conn = db
                    .lock()
                    .map_err(|e| AuthError::Store(format!("DB lock: {}", e)))?;
                conn.query_row(
                    "SELECT name, email, password_hash FROM users WHERE name_key = ?1",
                    [&key],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()
                .map_err(|e| AuthError::Store(e.to_string()))?
            };

            let (name, email, hash) = row.ok_or(AuthError::UnknownUser)?;
            let parsed = PasswordHash::new(&hash).map_err(|e| AuthError::Store(e.to_string()))?;
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .map_err(|_| AuthError::BadCredentials)?;

            Ok(Profile { name, email })
        })
        .await
        .map_err(|e| AuthError::Store(format!("Task join: {}", e)))?
    }

    /// Flush the WAL into the main database file before shutdown.
    pub fn close(&self) {
        match self.db.lock() {
            Ok(conn) => {
                if let Err(e) = conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(())) {
                    tracing::warn!(error = %e, "WAL checkpoint failed");
                }
                tracing::info!("Closed user database");
            }
            Err(e) => tracing::warn!(error = %e, "DB lock poisoned on close"),
        }
    }
}
