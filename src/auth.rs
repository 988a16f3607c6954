//! Session-cookie authentication: password hashing, token generation,
//! cookie parsing, and the `CurrentUser` extractor.
//!
//! Login stores an opaque token in the sessions table and hands it to the
//! client as an HttpOnly `sessionid` cookie; every protected handler pulls
//! the user back out through [`CurrentUser`].

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::{header::COOKIE, request::Parts, HeaderMap};
use chrono::Utc;
use rand::{distr::Alphanumeric, Rng};
use redb::{Database, ReadableDatabase};

use crate::database::{get_record, AppState, TABLE_SESSIONS, TABLE_USERS};
use crate::error::ApiError;
use crate::model::{SessionRecord, User};

pub const SESSION_COOKIE: &str = "sessionid";
pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Hash a plain password with argon2id.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::internal(e.to_string()))
}

/// Verify a password against an argon2id hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Random alphanumeric token for sessions, CSRF, and password resets.
pub fn random_token(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Extracts a named cookie value from the request headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(raw) = header.to_str() else { continue };
        for pair in raw.split(';') {
            if let Some((key, value)) = pair.trim().split_once('=') {
                if key == name {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// Creates a session row for the user and returns the token.
pub fn create_session(db: &Database, user_id: u64) -> Result<String, ApiError> {
    let token = random_token(32);
    let record = SessionRecord { user_id, created_at: Utc::now() };
    let json = serde_json::to_string(&record)?;

    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(TABLE_SESSIONS)?;
        table.insert(token.as_str(), json.as_str())?;
    }
    write_txn.commit()?;
    Ok(token)
}

pub fn destroy_session(db: &Database, token: &str) -> Result<(), ApiError> {
    let write_txn = db.begin_write()?;
    {
        let mut table = write_txn.open_table(TABLE_SESSIONS)?;
        table.remove(token)?;
    }
    write_txn.commit()?;
    Ok(())
}

/// Resolves the session cookie to an active user, or 401.
pub fn resolve_session(db: &Database, headers: &HeaderMap) -> Result<User, ApiError> {
    let token = cookie_value(headers, SESSION_COOKIE)
        .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided"))?;

    let session: SessionRecord = {
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(TABLE_SESSIONS)?;
        match table.get(token.as_str())? {
            Some(guard) => serde_json::from_str(guard.value())?,
            None => return Err(ApiError::unauthorized("Invalid or expired session")),
        }
    };

    let user: User = get_record(db, TABLE_USERS, session.user_id)?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    if !user.is_active {
        return Err(ApiError::unauthorized("Account is deactivated"));
    }
    Ok(user)
}

/// Extractor wrapping the authenticated user for protected handlers.
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = resolve_session(&state.db, &parts.headers)?;
        Ok(CurrentUser(user))
    }
}

/// 403 unless the caller is an admin or owner.
pub fn require_admin(user: &User) -> Result<(), ApiError> {
    if !user.is_admin() {
        return Err(ApiError::forbidden("Permission denied"));
    }
    Ok(())
}

/// 403 unless the caller is the owner.
pub fn require_owner(user: &User) -> Result<(), ApiError> {
    if !user.is_owner() {
        return Err(ApiError::forbidden("Permission denied"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_roundtrip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
        assert!(!verify_password("hunter22", "not-a-hash"));
    }

    #[test]
    fn cookie_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "csrftoken=abc; sessionid=xyz123".parse().unwrap());
        assert_eq!(cookie_value(&headers, "sessionid").as_deref(), Some("xyz123"));
        assert_eq!(cookie_value(&headers, "csrftoken").as_deref(), Some("abc"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }
}
