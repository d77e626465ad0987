//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::config::environment::EnvironmentConfig;
use crate::repositories::DispatchStore;
use crate::utils::jwt::JwtConfig;

/// Sesión cerrada por logout; se guarda hasta que el token expiraría igual
#[derive(Clone, Debug)]
pub struct RevokedToken {
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
}

impl RevokedToken {
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub jwt: JwtConfig,
    pub store: Arc<dyn DispatchStore>,
    pub revoked_tokens: Arc<RwLock<HashMap<String, RevokedToken>>>,
}

impl AppState {
    pub fn new(config: EnvironmentConfig, store: Arc<dyn DispatchStore>) -> Self {
        Self {
            jwt: JwtConfig::from(&config),
            config,
            store,
            revoked_tokens: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Revocar la sesión identificada por `jti`
    pub async fn revoke_token(&self, jti: String, user_id: i64, expires_at: DateTime<Utc>) {
        let mut tokens = self.revoked_tokens.write().await;
        tokens.insert(jti, RevokedToken { user_id, expires_at });
        tracing::debug!("🔒 Sesión revocada para usuario {} ({} revocadas)", user_id, tokens.len());
    }

    pub async fn is_token_revoked(&self, jti: &str) -> bool {
        self.revoked_tokens.read().await.contains_key(jti)
    }

    /// Limpiar revocaciones de tokens que ya expiraron por sí solos
    pub async fn cleanup_expired_tokens(&self) -> usize {
        let mut tokens = self.revoked_tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, token| !token.is_expired());
        before - tokens.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MemoryDispatchStore;

    #[tokio::test]
    async fn test_revocation_and_cleanup() {
        let state = AppState::new(
            EnvironmentConfig::default(),
            Arc::new(MemoryDispatchStore::new()),
        );

        state
            .revoke_token("live".to_string(), 1, Utc::now() + chrono::Duration::hours(1))
            .await;
        state
            .revoke_token("stale".to_string(), 1, Utc::now() - chrono::Duration::hours(1))
            .await;

        assert!(state.is_token_revoked("live").await);
        assert_eq!(state.cleanup_expired_tokens().await, 1);
        assert!(!state.is_token_revoked("stale").await);
        assert!(state.is_token_revoked("live").await);
    }
}
