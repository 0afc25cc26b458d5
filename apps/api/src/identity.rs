//! Anonymous identity resolution.
//!
//! The client token is the user id itself, an opaque UUID string carried in a
//! long-lived cookie. An absent or unrecognized token always mints a fresh
//! identity; tokens are never honored on first sight, so a client cannot
//! choose its own id. Concurrent first-contacts without a token each get
//! their own isolated identity.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::user::{Tier, UserRow};

pub const COOKIE_NAME: &str = "trendsift_uid";
const COOKIE_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 365;

#[derive(Debug, Clone)]
pub struct ResolvedIdentity {
    pub user: UserRow,
    pub is_new: bool,
}

impl ResolvedIdentity {
    /// The token the caller should persist client-side.
    pub fn token(&self) -> &str {
        &self.user.id
    }
}

/// Maps an opaque client token to a durable user row, creating one with tier
/// `free` on first contact. Recognized tokens get their `last_seen_at`
/// stamped.
pub async fn resolve(
    pool: &SqlitePool,
    token: Option<&str>,
) -> Result<ResolvedIdentity, sqlx::Error> {
    if let Some(token) = token {
        let existing = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
            .bind(token)
            .fetch_optional(pool)
            .await?;

        if let Some(mut user) = existing {
            let now = Utc::now();
            sqlx::query("UPDATE users SET last_seen_at = ? WHERE id = ?")
                .bind(now)
                .bind(&user.id)
                .execute(pool)
                .await?;
            user.last_seen_at = now;
            return Ok(ResolvedIdentity {
                user,
                is_new: false,
            });
        }
    }

    let now = Utc::now();
    let id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO users (id, tier, created_at, last_seen_at) VALUES (?, ?, ?, ?)")
        .bind(&id)
        .bind(Tier::Free.as_str())
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

    Ok(ResolvedIdentity {
        user: UserRow {
            id,
            tier: Tier::Free.as_str().to_string(),
            created_at: now,
            last_seen_at: now,
        },
        is_new: true,
    })
}

/// Every known user id, in creation order. The orchestrator fans
/// `sync_new_items` out over this set.
pub async fn all_user_ids(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT id FROM users ORDER BY created_at, id")
        .fetch_all(pool)
        .await
}

/// Pulls the identity token out of the Cookie header, if any.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(COOKIE)?.to_str().ok()?;
    for pair in raw.split(';') {
        let pair = pair.trim();
        if let Some(value) = pair.strip_prefix(COOKIE_NAME) {
            if let Some(value) = value.strip_prefix('=') {
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// Set-Cookie value for a freshly minted token.
pub fn issue_cookie(token: &str) -> String {
    format!("{COOKIE_NAME}={token}; Path=/; Max-Age={COOKIE_MAX_AGE_SECS}; HttpOnly; SameSite=Lax")
}

/// Wraps a JSON payload, setting the identity cookie when this request
/// minted the user. Returning clients get no Set-Cookie header.
pub fn json_with_cookie(identity: &ResolvedIdentity, payload: impl serde::Serialize) -> Response {
    let mut response = Json(payload).into_response();
    if identity.is_new {
        if let Ok(value) = HeaderValue::from_str(&issue_cookie(identity.token())) {
            response.headers_mut().insert(SET_COOKIE, value);
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn test_resolve_without_token_mints_identity() {
        let pool = test_pool().await;

        let resolved = resolve(&pool, None).await.unwrap();

        assert!(resolved.is_new);
        assert_eq!(resolved.user.tier(), Tier::Free);
        assert_eq!(resolved.token().len(), 36);
    }

    #[tokio::test]
    async fn test_resolve_recognizes_returning_token() {
        let pool = test_pool().await;
        let first = resolve(&pool, None).await.unwrap();

        let second = resolve(&pool, Some(first.token())).await.unwrap();

        assert!(!second.is_new);
        assert_eq!(second.user.id, first.user.id);
        assert!(second.user.last_seen_at >= second.user.created_at);
    }

    #[tokio::test]
    async fn test_resolve_never_honors_unknown_tokens() {
        let pool = test_pool().await;

        let resolved = resolve(&pool, Some("made-up-token")).await.unwrap();

        assert!(resolved.is_new);
        assert_ne!(resolved.user.id, "made-up-token");
    }

    #[tokio::test]
    async fn test_all_user_ids_lists_every_identity() {
        let pool = test_pool().await;
        let a = resolve(&pool, None).await.unwrap();
        let b = resolve(&pool, None).await.unwrap();

        let ids = all_user_ids(&pool).await.unwrap();

        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a.user.id));
        assert!(ids.contains(&b.user.id));
    }

    #[test]
    fn test_token_from_headers_finds_our_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; trendsift_uid=abc-123; lang=en"),
        );
        assert_eq!(token_from_headers(&headers), Some("abc-123".to_string()));
    }

    #[test]
    fn test_token_from_headers_ignores_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("trendsift_uid_old=zzz; theme=dark"),
        );
        assert_eq!(token_from_headers(&headers), None);
        assert_eq!(token_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn test_issue_cookie_shape() {
        let cookie = issue_cookie("tok");
        assert!(cookie.starts_with("trendsift_uid=tok;"));
        assert!(cookie.contains("Max-Age="));
        assert!(cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn test_json_with_cookie_sets_header_only_for_new_users() {
        let pool = test_pool().await;

        let fresh = resolve(&pool, None).await.unwrap();
        let response = json_with_cookie(&fresh, serde_json::json!({"ok": true}));
        let set_cookie = response.headers().get(SET_COOKIE).unwrap();
        assert!(set_cookie
            .to_str()
            .unwrap()
            .starts_with(&format!("trendsift_uid={}", fresh.token())));

        let returning = resolve(&pool, Some(fresh.token())).await.unwrap();
        let response = json_with_cookie(&returning, serde_json::json!({"ok": true}));
        assert!(response.headers().get(SET_COOKIE).is_none());
    }
}
