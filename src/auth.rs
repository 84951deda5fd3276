// auth.rs
// Bearer-token middleware and the AuthUser caller context. Tokens are
// HS256 JWTs carrying the subject id, role, and (for tenants) the numeric
// tid. Handlers receive the decoded identity as an immutable value.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{errors::ApiError, models::Role, state::AppState};

pub const TOKEN_TTL_SECONDS: i64 = 60 * 60 * 24 * 7; // 7 days

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Hex ObjectId of the tenant or admin account.
    pub sub: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tid: Option<i64>,
    pub exp: i64,
}

/// Immutable caller context extracted once per request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub subject: String,
    pub role: Role,
    pub tid: Option<i64>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("admin access required".into()))
        }
    }

    /// Tenant-scoped endpoints: the path tid must match the token subject
    /// unless the caller is an admin.
    pub fn require_tenant_self(&self, tid: i64) -> Result<(), ApiError> {
        if self.is_admin() || self.tid == Some(tid) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "token does not match tenant id".into(),
            ))
        }
    }
}

fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "rentdesk-dev-secret".to_string())
}

pub fn issue_token(subject: &str, role: Role, tid: Option<i64>) -> Result<String, ApiError> {
    let claims = Claims {
        sub: subject.to_string(),
        role,
        tid,
        exp: chrono::Utc::now().timestamp() + TOKEN_TTL_SECONDS,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret().as_bytes()),
    )
    .map_err(|err| ApiError::Internal(err.into()))
}

pub fn verify_token(token: &str) -> Option<AuthUser> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret().as_bytes()),
        &Validation::default(),
    )
    .ok()?;
    Some(AuthUser {
        subject: data.claims.sub,
        role: data.claims.role,
        tid: data.claims.tid,
    })
}

pub fn hash_password(raw: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(raw.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|err| ApiError::Internal(anyhow::anyhow!("password hashing failed: {err}")))
}

pub fn verify_password(raw: &str, hashed: &str) -> bool {
    PasswordHash::new(hashed)
        .map(|parsed| {
            Argon2::default()
                .verify_password(raw.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

pub async fn require_auth(
    State(_state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = match extract_bearer(request.headers()) {
        Some(t) => t,
        None => return Err(unauthorized_response()),
    };

    match verify_token(&token) {
        Some(user) => {
            request.extensions_mut().insert(user);
            Ok(next.run(request).await)
        }
        None => Err(unauthorized_response()),
    }
}

#[allow(refining_impl_trait)]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> BoxFuture<'static, Result<Self, Self::Rejection>> {
        let user = parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(unauthorized_response);

        Box::pin(async move { user })
    }
}

fn unauthorized_response() -> Response {
    (StatusCode::UNAUTHORIZED, "unauthorized").into_response()
}

fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_preserves_identity() {
        let token = issue_token("abc123", Role::Tenant, Some(9)).unwrap();
        let user = verify_token(&token).unwrap();
        assert_eq!(user.subject, "abc123");
        assert_eq!(user.role, Role::Tenant);
        assert_eq!(user.tid, Some(9));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(verify_token("not-a-jwt").is_none());
    }

    #[test]
    fn password_hash_verifies_and_rejects() {
        let hash = hash_password("s3cret").unwrap();
        assert!(verify_password("s3cret", &hash));
        assert!(!verify_password("wrong", &hash));
    }

    #[test]
    fn tenant_scope_check() {
        let tenant = AuthUser {
            subject: "x".into(),
            role: Role::Tenant,
            tid: Some(4),
        };
        assert!(tenant.require_tenant_self(4).is_ok());
        assert!(tenant.require_tenant_self(5).is_err());

        let admin = AuthUser {
            subject: "y".into(),
            role: Role::Admin,
            tid: None,
        };
        assert!(admin.require_tenant_self(5).is_ok());
    }
}
