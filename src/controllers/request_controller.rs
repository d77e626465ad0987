//! Controlador de solicitudes
//!
//! Autorización por rol y orquestación; las transiciones se validan en
//! [`crate::services::lifecycle`] y se aplican atómicamente en el store.

use std::sync::Arc;

use tracing::info;

use crate::controllers::provider_controller::current_provider;
use crate::dto::{
    AdminAssignRequest, CompleteRequestRequest, CreateServiceRequestRequest,
    DispatchStatsResponse, ListQuery, ListResponse,
};
use crate::middleware::AuthenticatedUser;
use crate::models::{
    AssignmentPhase, ProviderStatus, RequestFilter, RequestStatus, ServiceRequest, UserRole,
};
use crate::repositories::DispatchStore;
use crate::services::AverageResponse;
use crate::utils::errors::{forbidden_error, not_found_error, AppResult};

pub struct RequestController {
    store: Arc<dyn DispatchStore>,
}

impl RequestController {
    pub fn new(store: Arc<dyn DispatchStore>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        user: &AuthenticatedUser,
        request: CreateServiceRequestRequest,
    ) -> AppResult<ServiceRequest> {
        user.require_role(UserRole::User, "create a request")?;
        let new_request = request.into_new_request()?;

        let created = self.store.create_request(user.user_id, new_request).await?;
        info!(
            "🆘 Solicitud {} creada por usuario {} ({:?})",
            created.id, user.user_id, created.service_type
        );
        Ok(created)
    }

    /// Listado general: admin ve todo, un proveedor solo las pendientes
    pub async fn list(
        &self,
        user: &AuthenticatedUser,
        query: &ListQuery,
    ) -> AppResult<ListResponse<ServiceRequest>> {
        let filter = match user.role {
            UserRole::Admin => RequestFilter::default(),
            UserRole::Provider => match query.status {
                None | Some(RequestStatus::Pending) => RequestFilter {
                    status: Some(RequestStatus::Pending),
                    ..Default::default()
                },
                Some(_) => {
                    return Err(forbidden_error(
                        "list requests",
                        "providers may only list pending requests",
                    ))
                }
            },
            UserRole::User => {
                return Err(forbidden_error("list requests", "use my_requests instead"))
            }
        };
        self.list_with(filter, query).await
    }

    pub async fn my_requests(
        &self,
        user: &AuthenticatedUser,
        query: &ListQuery,
    ) -> AppResult<ListResponse<ServiceRequest>> {
        self.list_with(RequestFilter::for_requester(user.user_id), query)
            .await
    }

    pub async fn my_assignments(
        &self,
        user: &AuthenticatedUser,
        query: &ListQuery,
    ) -> AppResult<ListResponse<ServiceRequest>> {
        let provider = current_provider(self.store.as_ref(), user).await?;
        self.list_with(RequestFilter::for_provider(provider.id), query)
            .await
    }

    async fn list_with(
        &self,
        mut filter: RequestFilter,
        query: &ListQuery,
    ) -> AppResult<ListResponse<ServiceRequest>> {
        if filter.status.is_none() {
            filter.status = query.status;
        }
        filter.updated_since = query.updated_since;

        let requests = self.store.list_requests(&filter).await?;
        ListResponse::from_query(requests, query)
    }

    /// Detalle: dueño, proveedor vinculado, admin, o cualquier proveedor si sigue pendiente
    pub async fn get(&self, user: &AuthenticatedUser, request_id: i64) -> AppResult<ServiceRequest> {
        let request = self
            .store
            .find_request(request_id)
            .await?
            .ok_or_else(|| not_found_error("Request", request_id))?;

        let allowed = match user.role {
            UserRole::Admin => true,
            UserRole::User => request.requester_id == user.user_id,
            UserRole::Provider => {
                request.status == RequestStatus::Pending
                    || match self.store.find_provider_by_user(user.user_id).await? {
                        Some(provider) => request.is_bound_to(provider.id),
                        None => false,
                    }
            }
        };

        if !allowed {
            return Err(forbidden_error("view request", "not a participant"));
        }
        Ok(request)
    }

    /// Auto-aceptación por el proveedor autenticado
    pub async fn accept(&self, user: &AuthenticatedUser, request_id: i64) -> AppResult<ServiceRequest> {
        let provider = current_provider(self.store.as_ref(), user).await?;
        let assigned = self
            .store
            .assign_request(request_id, provider.id, AssignmentPhase::Accepted)
            .await?;

        info!("✅ Solicitud {} aceptada por proveedor {}", request_id, provider.id);
        Ok(assigned)
    }

    pub async fn admin_assign(
        &self,
        user: &AuthenticatedUser,
        request_id: i64,
        body: AdminAssignRequest,
    ) -> AppResult<ServiceRequest> {
        user.require_role(UserRole::Admin, "assign requests")?;
        let assigned = self
            .store
            .assign_request(request_id, body.provider_id, AssignmentPhase::Dispatched)
            .await?;

        info!(
            "📋 Solicitud {} asignada a proveedor {} por admin {}",
            request_id, body.provider_id, user.user_id
        );
        Ok(assigned)
    }

    pub async fn start(&self, user: &AuthenticatedUser, request_id: i64) -> AppResult<ServiceRequest> {
        let provider = current_provider(self.store.as_ref(), user).await?;
        let started = self.store.start_request(request_id, provider.id).await?;

        info!("🚗 Solicitud {} en curso (proveedor {})", request_id, provider.id);
        Ok(started)
    }

    pub async fn complete(
        &self,
        user: &AuthenticatedUser,
        request_id: i64,
        body: CompleteRequestRequest,
    ) -> AppResult<ServiceRequest> {
        let provider = current_provider(self.store.as_ref(), user).await?;
        let completed = self
            .store
            .complete_request(request_id, provider.id, body.final_cost)
            .await?;

        info!(
            "🏁 Solicitud {} completada por proveedor {} (coste {})",
            request_id,
            provider.id,
            completed.final_cost.unwrap_or_default()
        );
        Ok(completed)
    }

    pub async fn cancel(&self, user: &AuthenticatedUser, request_id: i64) -> AppResult<ServiceRequest> {
        let cancelled = self.store.cancel_request(request_id, user.user_id).await?;

        info!("🚫 Solicitud {} cancelada por usuario {}", request_id, user.user_id);
        Ok(cancelled)
    }

    /// Resumen del panel de administración
    pub async fn stats(&self, user: &AuthenticatedUser) -> AppResult<DispatchStatsResponse> {
        user.require_role(UserRole::Admin, "view dispatch stats")?;

        let requests = self.store.list_requests(&RequestFilter::default()).await?;
        let providers = self.store.list_providers().await?;
        let average = AverageResponse::from_requests(&requests);

        Ok(DispatchStatsResponse {
            active_requests: requests.iter().filter(|r| r.status.is_active()).count(),
            total_providers: providers.len(),
            online_providers: providers
                .iter()
                .filter(|p| p.current_status == ProviderStatus::Online)
                .count(),
            avg_response: average.display(),
            avg_response_minutes: average.minutes,
        })
    }
}
