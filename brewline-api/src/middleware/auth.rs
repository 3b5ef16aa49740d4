use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use brewline_core::UserId;

use crate::{error::AppError, state::AppState};

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    #[serde(rename = "id")]
    pub user_id: UserId,
    pub role: String,
    pub iss: String,
    pub exp: usize,
}

/// Verified claims plus the raw bearer token, for handlers that re-check the session
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub claims: Claims,
    pub token: String,
}

// ============================================================================
// Authentication Middleware
// ============================================================================

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| AppError::AuthenticationError("Token Not Found".to_string()))?;
    let token = bearer.token().to_string();

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[state.auth.issuer.as_str()]);

    let token_data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(state.auth.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::AuthenticationError("Expired Token, Please Login Again".to_string()),
        _ => AppError::AuthenticationError("Invalid Token, Please Login Again".to_string()),
    })?;

    req.extensions_mut().insert(AuthSession {
        claims: token_data.claims,
        token,
    });

    Ok(next.run(req).await)
}

// ============================================================================
// Role Checks
// ============================================================================

pub async fn require_user(req: Request, next: Next) -> Result<Response, AppError> {
    check_role(&req, ROLE_USER)?;
    Ok(next.run(req).await)
}

pub async fn require_admin(req: Request, next: Next) -> Result<Response, AppError> {
    check_role(&req, ROLE_ADMIN)?;
    Ok(next.run(req).await)
}

fn check_role(req: &Request, role: &str) -> Result<(), AppError> {
    let session = req
        .extensions()
        .get::<AuthSession>()
        .ok_or_else(|| AppError::AuthenticationError("Token Not Found".to_string()))?;

    if session.claims.role != role {
        return Err(AppError::AuthorizationError("Forbidden Access".to_string()));
    }
    Ok(())
}
