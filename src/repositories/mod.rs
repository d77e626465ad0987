//! Repositorios
//!
//! Traits de persistencia para usuarios, proveedores y solicitudes. Cada
//! mutación de solicitud es atómica: carga, valida con
//! [`crate::services::lifecycle`] y escribe bajo una misma guardia, o no
//! escribe nada.
//!
//! Implementaciones:
//! - [`pg_store::PgDispatchStore`]: PostgreSQL (transacción + `FOR UPDATE`
//!   + `UPDATE ... WHERE status = <esperado>`)
//! - [`memory_store::MemoryDispatchStore`]: en memoria, para desarrollo y tests

pub mod memory_store;
pub mod pg_store;

pub use memory_store::MemoryDispatchStore;
pub use pg_store::PgDispatchStore;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::models::{
    AssignmentPhase, NewProvider, NewServiceRequest, NewUser, Provider, ProviderStatus,
    RequestFilter, ServiceRequest, User, UserProfileUpdate,
};
use crate::utils::errors::AppResult;

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Crear usuario; `Conflict` si el email ya existe
    async fn create_user(&self, new_user: NewUser) -> AppResult<User>;

    async fn find_user_by_id(&self, id: i64) -> AppResult<Option<User>>;

    /// Buscar por email ya normalizado
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn list_users(&self) -> AppResult<Vec<User>>;

    async fn update_user_profile(&self, id: i64, changes: UserProfileUpdate) -> AppResult<User>;
}

#[async_trait]
pub trait ProviderRepository: Send + Sync {
    /// Crear el perfil (una sola vez por usuario); `Conflict` si ya existe
    async fn create_provider(&self, user_id: i64, new_provider: NewProvider) -> AppResult<Provider>;

    async fn find_provider_by_id(&self, id: i64) -> AppResult<Option<Provider>>;

    async fn find_provider_by_user(&self, user_id: i64) -> AppResult<Option<Provider>>;

    async fn list_providers(&self) -> AppResult<Vec<Provider>>;

    /// Upsert de la última ubicación conocida
    async fn update_location(
        &self,
        provider_id: i64,
        latitude: f64,
        longitude: f64,
    ) -> AppResult<Provider>;

    /// Cambio explícito de estado, respetando el trabajo activo
    async fn update_status(&self, provider_id: i64, status: ProviderStatus) -> AppResult<Provider>;

    /// ¿Tiene el proveedor una solicitud vinculada sin terminar?
    async fn has_active_job(&self, provider_id: i64) -> AppResult<bool>;
}

#[async_trait]
pub trait RequestRepository: Send + Sync {
    /// Crear en `pending`; `Conflict` si el solicitante ya tiene una activa
    async fn create_request(
        &self,
        requester_id: i64,
        new_request: NewServiceRequest,
    ) -> AppResult<ServiceRequest>;

    async fn find_request(&self, id: i64) -> AppResult<Option<ServiceRequest>>;

    /// Listado más reciente primero; vacío nunca es error
    async fn list_requests(&self, filter: &RequestFilter) -> AppResult<Vec<ServiceRequest>>;

    /// Compare-and-set `pending → assigned` y proveedor a `busy`
    async fn assign_request(
        &self,
        request_id: i64,
        provider_id: i64,
        phase: AssignmentPhase,
    ) -> AppResult<ServiceRequest>;

    async fn start_request(&self, request_id: i64, provider_id: i64) -> AppResult<ServiceRequest>;

    /// Cierre con coste final; libera al proveedor
    async fn complete_request(
        &self,
        request_id: i64,
        provider_id: i64,
        final_cost: Option<Decimal>,
    ) -> AppResult<ServiceRequest>;

    async fn cancel_request(&self, request_id: i64, requester_id: i64) -> AppResult<ServiceRequest>;
}

/// Store completo que consume la aplicación
pub trait DispatchStore: UserRepository + ProviderRepository + RequestRepository {}

impl<T> DispatchStore for T where T: UserRepository + ProviderRepository + RequestRepository {}
