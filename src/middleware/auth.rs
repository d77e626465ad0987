//! Middleware de autenticación JWT
//!
//! Este módulo maneja la autenticación JWT, extracción de tokens
//! y verificación de usuarios autenticados.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};

use crate::{
    models::UserRole,
    state::AppState,
    utils::{
        errors::{forbidden_error, AppError, AppResult},
        jwt::{extract_token_from_header, verify_token},
    },
};

/// Usuario autenticado que se inyecta en las requests
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub role: UserRole,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

impl AuthenticatedUser {
    /// Exigir un rol concreto para `operation`
    pub fn require_role(&self, role: UserRole, operation: &str) -> AppResult<()> {
        if self.role != role {
            return Err(forbidden_error(
                operation,
                &format!("requires role '{}'", role.as_str()),
            ));
        }
        Ok(())
    }
}

/// Middleware de autenticación JWT
///
/// Rechaza con 401 tokens ausentes, mal formados, expirados, revocados o
/// de usuarios que ya no existen. El rol se toma de la base de datos.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Authorization token required".to_string()))?;

    let token = extract_token_from_header(auth_header)?;
    let claims = verify_token(token, &state.jwt)?;

    if state.is_token_revoked(&claims.jti).await {
        return Err(AppError::Unauthorized("Session has been closed".to_string()));
    }

    let user_id = claims.user_id()?;
    let user = state
        .store
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;

    let authenticated_user = AuthenticatedUser {
        user_id: user.id,
        role: user.role,
        expires_at: claims.expires_at(),
        jti: claims.jti,
    };

    // Inyectar usuario autenticado en las extensions
    request.extensions_mut().insert(authenticated_user);

    Ok(next.run(request).await)
}

/// Middleware que además exige rol admin (rutas de administración)
pub async fn admin_middleware(request: Request, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| AppError::Unauthorized("Authorization token required".to_string()))?;
    user.require_role(UserRole::Admin, "access admin resources")?;

    Ok(next.run(request).await)
}
