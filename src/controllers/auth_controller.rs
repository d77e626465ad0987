//! Controlador de usuarios y sesiones
//!
//! Registro, login/logout con JWT revocable, perfil propio y listado para
//! administración. Los passwords se guardan con bcrypt.

use std::sync::Arc;

use tracing::{info, warn};
use validator::Validate;

use crate::config::EnvironmentConfig;
use crate::dto::{LoginRequest, LoginResponse, RegisterRequest, UpdateProfileRequest};
use crate::middleware::AuthenticatedUser;
use crate::models::{NewUser, UserResponse, UserRole};
use crate::repositories::DispatchStore;
use crate::state::AppState;
use crate::utils::errors::{not_found_error, validation_error, AppError, AppResult};
use crate::utils::jwt::generate_token;
use crate::utils::validation::normalize_email;

pub struct AuthController {
    state: AppState,
}

impl AuthController {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub async fn register(&self, request: RegisterRequest) -> AppResult<UserResponse> {
        request.validate()?;
        if request.role == UserRole::Admin {
            return Err(validation_error("role", "admin accounts cannot self-register"));
        }

        let password_hash = hash_password(&request.password, self.state.config.bcrypt_cost)?;
        let user = self
            .state
            .store
            .create_user(NewUser {
                email: normalize_email(&request.email),
                username: request.username.trim().to_string(),
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
                phone_number: request.phone_number.map(|p| p.trim().to_string()),
                role: request.role,
                is_verified: false,
                password_hash,
            })
            .await?;

        info!("👤 Usuario registrado: {} ({})", user.id, user.role.as_str());
        Ok(user.into())
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        request.validate()?;
        let email = normalize_email(&request.email);

        let user = self.state.store.find_user_by_email(&email).await?;
        let user = match user {
            Some(user) if verify_password(&request.password, &user.password_hash)? => user,
            _ => {
                warn!("🔐 Login fallido para {}", email);
                return Err(AppError::Unauthorized("Invalid email or password".to_string()));
            }
        };

        let issued = generate_token(user.id, user.role, &self.state.jwt)?;
        info!("🔑 Sesión iniciada: usuario {}", user.id);

        Ok(LoginResponse {
            token: issued.token,
            expires_at: issued.expires_at,
            user: user.into(),
        })
    }

    /// Cerrar la sesión presentada; el token deja de ser válido al instante
    pub async fn logout(&self, user: &AuthenticatedUser) {
        self.state
            .revoke_token(user.jti.clone(), user.user_id, user.expires_at)
            .await;
        info!("👋 Sesión cerrada: usuario {}", user.user_id);
    }

    pub async fn me(&self, user: &AuthenticatedUser) -> AppResult<UserResponse> {
        self.state
            .store
            .find_user_by_id(user.user_id)
            .await?
            .map(UserResponse::from)
            .ok_or_else(|| not_found_error("User", user.user_id))
    }

    pub async fn update_profile(
        &self,
        user: &AuthenticatedUser,
        request: UpdateProfileRequest,
    ) -> AppResult<UserResponse> {
        request.validate()?;
        let updated = self
            .state
            .store
            .update_user_profile(user.user_id, request.into())
            .await?;
        Ok(updated.into())
    }

    pub async fn list_users(&self, user: &AuthenticatedUser) -> AppResult<Vec<UserResponse>> {
        user.require_role(UserRole::Admin, "list users")?;
        let users = self.state.store.list_users().await?;
        Ok(users.into_iter().map(UserResponse::from).collect())
    }
}

/// Crear el administrador inicial si `ADMIN_EMAIL`/`ADMIN_PASSWORD` están definidos
pub async fn bootstrap_admin(
    store: &Arc<dyn DispatchStore>,
    config: &EnvironmentConfig,
) -> AppResult<()> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };

    let email = normalize_email(email);
    if store.find_user_by_email(&email).await?.is_some() {
        return Ok(());
    }

    let username = email.split('@').next().unwrap_or("admin").to_string();
    store
        .create_user(NewUser {
            email: email.clone(),
            username,
            first_name: String::new(),
            last_name: String::new(),
            phone_number: None,
            role: UserRole::Admin,
            is_verified: true,
            password_hash: hash_password(password, config.bcrypt_cost)?,
        })
        .await?;

    info!("🛡️ Administrador inicial creado: {}", email);
    Ok(())
}

fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    bcrypt::hash(password, cost).map_err(|e| AppError::Hash(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    bcrypt::verify(password, hash).map_err(|e| AppError::Hash(e.to_string()))
}
