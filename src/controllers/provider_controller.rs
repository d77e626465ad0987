//! Controlador de proveedores
//!
//! Perfil único por usuario `provider`, ubicación, estado y resumen de
//! trabajos. Las reglas de disponibilidad viven en
//! [`crate::services::availability`] y se aplican dentro del store.

use std::sync::Arc;

use tracing::info;
use validator::Validate;

use crate::dto::{
    CreateProviderProfileRequest, ProviderStatsResponse, UpdateLocationRequest, UpdateStatusRequest,
};
use crate::middleware::AuthenticatedUser;
use crate::models::{Provider, RequestFilter, RequestStatus, UserRole};
use crate::repositories::DispatchStore;
use crate::services::total_earnings;
use crate::utils::errors::{AppError, AppResult};

pub struct ProviderController {
    store: Arc<dyn DispatchStore>,
}

impl ProviderController {
    pub fn new(store: Arc<dyn DispatchStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, user: &AuthenticatedUser) -> AppResult<Vec<Provider>> {
        user.require_role(UserRole::Admin, "list providers")?;
        self.store.list_providers().await
    }

    /// Perfil del proveedor autenticado
    pub async fn my_profile(&self, user: &AuthenticatedUser) -> AppResult<Provider> {
        current_provider(self.store.as_ref(), user).await
    }

    pub async fn create_profile(
        &self,
        user: &AuthenticatedUser,
        request: CreateProviderProfileRequest,
    ) -> AppResult<Provider> {
        user.require_role(UserRole::Provider, "create a provider profile")?;
        request.validate()?;

        let provider = self.store.create_provider(user.user_id, request.into()).await?;
        info!(
            "🚚 Perfil de proveedor creado: {} (usuario {}, completo: {})",
            provider.id, user.user_id, provider.profile_completed
        );
        Ok(provider)
    }

    pub async fn update_location(
        &self,
        user: &AuthenticatedUser,
        request: UpdateLocationRequest,
    ) -> AppResult<Provider> {
        request.validate()?;
        let provider = current_provider(self.store.as_ref(), user).await?;
        self.store
            .update_location(provider.id, request.latitude, request.longitude)
            .await
    }

    pub async fn update_status(
        &self,
        user: &AuthenticatedUser,
        request: UpdateStatusRequest,
    ) -> AppResult<Provider> {
        let provider = current_provider(self.store.as_ref(), user).await?;
        let updated = self.store.update_status(provider.id, request.status).await?;
        info!(
            "📡 Proveedor {}: {} → {}",
            provider.id, provider.current_status, updated.current_status
        );
        Ok(updated)
    }

    pub async fn my_stats(&self, user: &AuthenticatedUser) -> AppResult<ProviderStatsResponse> {
        let provider = current_provider(self.store.as_ref(), user).await?;
        let jobs = self
            .store
            .list_requests(&RequestFilter::for_provider(provider.id))
            .await?;

        Ok(ProviderStatsResponse {
            provider_id: provider.id,
            completed_jobs: jobs
                .iter()
                .filter(|r| r.status == RequestStatus::Completed)
                .count(),
            active_jobs: jobs.iter().filter(|r| r.status.is_bound_active()).count(),
            total_earnings: total_earnings(&jobs),
        })
    }
}

/// Perfil del usuario autenticado; 403 si no es proveedor, 404 si aún no lo creó
pub async fn current_provider(
    store: &dyn DispatchStore,
    user: &AuthenticatedUser,
) -> AppResult<Provider> {
    user.require_role(UserRole::Provider, "act as a provider")?;
    store
        .find_provider_by_user(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Provider profile not found".to_string()))
}
