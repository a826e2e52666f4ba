use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, Request, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{SecondsFormat, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};

use super::error::ApiError;
use crate::db::{LoginRequest, LoginResponse, Session, User, UserResponse, ADMIN_USERNAME};
use crate::ordering::Actor;
use crate::AppState;

/// Name of the HttpOnly cookie holding the session token
pub const SESSION_COOKIE: &str = "folio_session";

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a random token
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Timestamps in the sessions table compare as strings, so they share one format
fn timestamp(at: chrono::DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Create a session for `user_id` and return the plain token
pub async fn create_session(
    pool: &SqlitePool,
    user_id: i64,
    ttl_hours: i64,
) -> Result<String, sqlx::Error> {
    let token = generate_token();
    let now = Utc::now();
    let expires_at = timestamp(now + chrono::Duration::hours(ttl_hours));

    // Expired sessions are only cleaned up here
    sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(timestamp(now))
        .execute(pool)
        .await?;

    sqlx::query(
        "INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(hash_token(&token))
    .bind(&expires_at)
    .bind(timestamp(now))
    .execute(pool)
    .await?;

    Ok(token)
}

/// Look up the user owning an unexpired session token
pub async fn get_current_user(pool: &SqlitePool, token: &str) -> Result<Option<User>, sqlx::Error> {
    let session: Option<Session> =
        sqlx::query_as("SELECT * FROM sessions WHERE token_hash = ? AND expires_at > ?")
            .bind(hash_token(token))
            .bind(timestamp(Utc::now()))
            .fetch_optional(pool)
            .await?;

    let Some(session) = session else {
        return Ok(None);
    };

    sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(session.user_id)
        .fetch_optional(pool)
        .await
}

/// Extract the session token from the Authorization header or the session cookie
fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(AUTHORIZATION).and_then(|h| h.to_str().ok()) {
        if let Some(token) = auth_header.strip_prefix("Bearer ") {
            return Some(token.trim().to_string());
        }
    }

    CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

/// Make sure the built-in "admin" account exists and holds the admin flag.
///
/// The configured password is only written when the account is created or
/// when `reset_password` is set.
pub async fn ensure_admin_user(
    pool: &SqlitePool,
    password: &str,
    reset_password: bool,
) -> anyhow::Result<User> {
    let existing: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = ?")
        .bind(ADMIN_USERNAME)
        .fetch_optional(pool)
        .await?;

    let hash = || {
        hash_password(password).map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
    };

    let user = match existing {
        None => {
            let user: User = sqlx::query_as(
                "INSERT INTO users (username, password_hash, is_admin) VALUES (?, ?, 1) RETURNING *",
            )
            .bind(ADMIN_USERNAME)
            .bind(hash()?)
            .fetch_one(pool)
            .await?;
            info!("Created built-in admin user");
            user
        }
        Some(user) if reset_password => {
            let user: User = sqlx::query_as(
                "UPDATE users SET password_hash = ?, is_admin = 1 WHERE id = ? RETURNING *",
            )
            .bind(hash()?)
            .bind(user.id)
            .fetch_one(pool)
            .await?;
            warn!("Admin password was reset from configuration");
            user
        }
        Some(user) if !user.is_admin => {
            sqlx::query_as("UPDATE users SET is_admin = 1 WHERE id = ? RETURNING *")
                .bind(user.id)
                .fetch_one(pool)
                .await?
        }
        Some(user) => user,
    };

    Ok(user)
}

/// Fail with 403 unless the user holds the admin flag
pub fn require_admin(user: &User) -> Result<(), ApiError> {
    Actor::from(user).require_admin().map_err(ApiError::from)
}

/// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE username = ?")
        .bind(request.username.trim())
        .fetch_optional(&state.db)
        .await?;

    let user = match user {
        Some(user) if verify_password(&request.password, &user.password_hash) => user,
        _ => {
            warn!(username = %request.username, "Failed login attempt");
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
    };

    let token = create_session(&state.db, user.id, state.config.auth.session_ttl_hours).await?;
    info!(username = %user.username, "User logged in");

    let cookie = Cookie::build((SESSION_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.auth.secure_cookie);

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            token,
            user: UserResponse::from(user),
        }),
    ))
}

/// Logout endpoint - drops the session and clears the cookie
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode), ApiError> {
    if let Some(token) = extract_token(&headers) {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(hash_token(&token))
            .execute(&state.db)
            .await?;
    }

    Ok((
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        StatusCode::NO_CONTENT,
    ))
}

/// Current identity
pub async fn me(user: User) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

/// Auth middleware that rejects requests without a valid session and hands
/// the resolved user to the handlers
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers())
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    let user = get_current_user(&state.db, &token)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Session expired or invalid"))?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Extractor for getting the current authenticated user from a request
#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<User>() {
            return Ok(user.clone());
        }

        let token = extract_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

        get_current_user(&state.db, &token)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Session expired or invalid"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use axum::http::HeaderValue;

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("s3cret").unwrap();
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("wrong", &hash));
        assert!(!verify_password("s3cret", "not-a-hash"));
    }

    #[test]
    fn test_token_hash_is_stable() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert_eq!(hash_token(&token), hash_token(&token));
        assert_ne!(hash_token(&token), token);
    }

    #[test]
    fn test_extract_token_prefers_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            HeaderValue::from_static("folio_session=from-cookie; other=1"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("from-cookie"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(extract_token(&headers).as_deref(), Some("from-header"));

        assert_eq!(extract_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_ensure_admin_user() {
        let pool = db::open_in_memory().await.unwrap();

        let admin = ensure_admin_user(&pool, "first", false).await.unwrap();
        assert!(admin.is_admin);
        assert!(admin.is_builtin_admin());
        assert!(verify_password("first", &admin.password_hash));

        // password left alone without a reset
        let admin = ensure_admin_user(&pool, "second", false).await.unwrap();
        assert!(verify_password("first", &admin.password_hash));

        let admin = ensure_admin_user(&pool, "second", true).await.unwrap();
        assert!(verify_password("second", &admin.password_hash));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_session_lookup() {
        let pool = db::open_in_memory().await.unwrap();
        let admin = ensure_admin_user(&pool, "pw", false).await.unwrap();

        let token = create_session(&pool, admin.id, 1).await.unwrap();
        let user = get_current_user(&pool, &token).await.unwrap().unwrap();
        assert_eq!(user.username, ADMIN_USERNAME);

        assert!(get_current_user(&pool, "bogus").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected() {
        let pool = db::open_in_memory().await.unwrap();
        let admin = ensure_admin_user(&pool, "pw", false).await.unwrap();

        let token = create_session(&pool, admin.id, -1).await.unwrap();
        assert!(get_current_user(&pool, &token).await.unwrap().is_none());
    }

    #[test]
    fn test_require_admin() {
        let user = User {
            id: 2,
            username: "editor".to_string(),
            password_hash: String::new(),
            is_admin: false,
        };
        assert_eq!(require_admin(&user).unwrap_err().status(), StatusCode::FORBIDDEN);
    }
}
