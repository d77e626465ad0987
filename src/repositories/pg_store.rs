//! Store PostgreSQL
//!
//! Cada transición corre en una transacción: bloquea la fila de la
//! solicitud (`FOR UPDATE`), luego la del proveedor, valida con las reglas
//! puras y escribe con `WHERE status = <esperado>`. Si esa escritura no
//! afecta ninguna fila, otra transacción ganó la carrera.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tracing::debug;

use super::{ProviderRepository, RequestRepository, UserRepository};
use crate::models::{
    AssignmentPhase, NewProvider, NewServiceRequest, NewUser, Provider, ProviderStatus,
    RequestFilter, RequestStatus, ServiceRequest, User, UserProfileUpdate,
};
use crate::services::{availability, lifecycle, LifecycleError};
use crate::utils::errors::{conflict_error, not_found_error, AppError, AppResult};

pub struct PgDispatchStore {
    pool: PgPool,
}

impl PgDispatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_request(
        tx: &mut Transaction<'_, Postgres>,
        request_id: i64,
    ) -> AppResult<ServiceRequest> {
        sqlx::query_as::<_, ServiceRequest>(
            "SELECT * FROM service_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(request_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| not_found_error("Request", request_id))
    }

    async fn lock_provider(
        tx: &mut Transaction<'_, Postgres>,
        provider_id: i64,
    ) -> AppResult<Provider> {
        sqlx::query_as::<_, Provider>("SELECT * FROM providers WHERE id = $1 FOR UPDATE")
            .bind(provider_id)
            .fetch_optional(&mut **tx)
            .await?
            .ok_or_else(|| not_found_error("Provider", provider_id))
    }

    async fn active_job_exists(
        tx: &mut Transaction<'_, Postgres>,
        provider_id: i64,
    ) -> AppResult<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM service_requests
                WHERE provider_id = $1 AND status IN ('assigned', 'in_progress')
            )
            "#,
        )
        .bind(provider_id)
        .fetch_one(&mut **tx)
        .await?;
        Ok(exists)
    }

    /// Escribir el resultado de una transición solo si el estado sigue siendo `expected`
    async fn write_transition(
        tx: &mut Transaction<'_, Postgres>,
        expected: RequestStatus,
        next: &ServiceRequest,
    ) -> AppResult<Option<ServiceRequest>> {
        let updated = sqlx::query_as::<_, ServiceRequest>(
            r#"
            UPDATE service_requests
            SET status = $3,
                provider_id = $4,
                assignment_phase = $5,
                final_cost = $6,
                updated_at = $7,
                assigned_at = $8,
                started_at = $9,
                completed_at = $10,
                cancelled_at = $11
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(next.id)
        .bind(expected)
        .bind(next.status)
        .bind(next.provider_id)
        .bind(next.assignment_phase)
        .bind(next.final_cost)
        .bind(next.updated_at)
        .bind(next.assigned_at)
        .bind(next.started_at)
        .bind(next.completed_at)
        .bind(next.cancelled_at)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(updated)
    }

    async fn set_provider_status(
        tx: &mut Transaction<'_, Postgres>,
        provider_id: i64,
        status: ProviderStatus,
    ) -> AppResult<Provider> {
        let provider = sqlx::query_as::<_, Provider>(
            "UPDATE providers SET current_status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(provider_id)
        .bind(status)
        .fetch_one(&mut **tx)
        .await?;
        Ok(provider)
    }
}

fn map_unique_violation(error: sqlx::Error, on_conflict: impl FnOnce() -> AppError) -> AppError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => on_conflict(),
        _ => AppError::Database(error),
    }
}

#[async_trait]
impl UserRepository for PgDispatchStore {
    async fn create_user(&self, new_user: NewUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, username, first_name, last_name, phone_number, role, is_verified, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&new_user.email)
        .bind(&new_user.username)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.phone_number)
        .bind(new_user.role)
        .bind(new_user.is_verified)
        .bind(&new_user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, || conflict_error("User", "email", &new_user.email)))
    }

    async fn find_user_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn update_user_profile(&self, id: i64, changes: UserProfileUpdate) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;
        let mut user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| not_found_error("User", id))?;
        changes.apply_to(&mut user);

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET username = $2, first_name = $3, last_name = $4, phone_number = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone_number)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(user)
    }
}

#[async_trait]
impl ProviderRepository for PgDispatchStore {
    async fn create_provider(&self, user_id: i64, new_provider: NewProvider) -> AppResult<Provider> {
        let profile_completed = new_provider.is_complete();
        sqlx::query_as::<_, Provider>(
            r#"
            INSERT INTO providers (
                user_id, company_name, license_number, vehicle_type, vehicle_plate,
                insurance_provider, insurance_policy_number, current_status, profile_completed
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'offline', $8)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&new_provider.company_name)
        .bind(&new_provider.license_number)
        .bind(&new_provider.vehicle_type)
        .bind(&new_provider.vehicle_plate)
        .bind(&new_provider.insurance_provider)
        .bind(&new_provider.insurance_policy_number)
        .bind(profile_completed)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                AppError::Conflict("Provider profile already exists for this user".to_string())
            })
        })
    }

    async fn find_provider_by_id(&self, id: i64) -> AppResult<Option<Provider>> {
        let provider = sqlx::query_as::<_, Provider>("SELECT * FROM providers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(provider)
    }

    async fn find_provider_by_user(&self, user_id: i64) -> AppResult<Option<Provider>> {
        let provider = sqlx::query_as::<_, Provider>("SELECT * FROM providers WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(provider)
    }

    async fn list_providers(&self) -> AppResult<Vec<Provider>> {
        let providers = sqlx::query_as::<_, Provider>("SELECT * FROM providers ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(providers)
    }

    async fn update_location(
        &self,
        provider_id: i64,
        latitude: f64,
        longitude: f64,
    ) -> AppResult<Provider> {
        let mut tx = self.pool.begin().await?;
        let mut provider = Self::lock_provider(&mut tx, provider_id).await?;

        availability::apply_location(&mut provider, latitude, longitude, Utc::now()).map_err(|e| {
            let mut errors = validator::ValidationErrors::new();
            errors.add("location", e);
            AppError::Validation(errors)
        })?;

        let provider = sqlx::query_as::<_, Provider>(
            r#"
            UPDATE providers
            SET latitude = $2, longitude = $3, location_updated_at = $4, updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(provider.id)
        .bind(provider.latitude)
        .bind(provider.longitude)
        .bind(provider.location_updated_at)
        .bind(provider.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(provider)
    }

    async fn update_status(&self, provider_id: i64, status: ProviderStatus) -> AppResult<Provider> {
        let mut tx = self.pool.begin().await?;
        let provider = Self::lock_provider(&mut tx, provider_id).await?;
        let has_active_job = Self::active_job_exists(&mut tx, provider_id).await?;

        availability::check_status_change(&provider, status, has_active_job)?;
        let provider = Self::set_provider_status(&mut tx, provider_id, status).await?;

        tx.commit().await?;
        Ok(provider)
    }

    async fn has_active_job(&self, provider_id: i64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;
        let exists = Self::active_job_exists(&mut tx, provider_id).await?;
        tx.commit().await?;
        Ok(exists)
    }
}

#[async_trait]
impl RequestRepository for PgDispatchStore {
    async fn create_request(
        &self,
        requester_id: i64,
        new_request: NewServiceRequest,
    ) -> AppResult<ServiceRequest> {
        let mut tx = self.pool.begin().await?;

        // Serializa las altas del mismo solicitante
        sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(requester_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| not_found_error("User", requester_id))?;

        let (has_active,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM service_requests
                WHERE requester_id = $1 AND status IN ('pending', 'assigned', 'in_progress')
            )
            "#,
        )
        .bind(requester_id)
        .fetch_one(&mut *tx)
        .await?;
        if has_active {
            return Err(AppError::Conflict(
                "Requester already has an active request".to_string(),
            ));
        }

        let request = sqlx::query_as::<_, ServiceRequest>(
            r#"
            INSERT INTO service_requests (
                requester_id, service_type, priority, status, location_address,
                latitude, longitude, vehicle_make, vehicle_model, vehicle_year,
                vehicle_plate, description
            )
            VALUES ($1, $2, $3, 'pending', $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(requester_id)
        .bind(new_request.service_type)
        .bind(new_request.priority)
        .bind(&new_request.location_address)
        .bind(new_request.latitude)
        .bind(new_request.longitude)
        .bind(&new_request.vehicle_make)
        .bind(&new_request.vehicle_model)
        .bind(new_request.vehicle_year)
        .bind(&new_request.vehicle_plate)
        .bind(&new_request.description)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(request)
    }

    async fn find_request(&self, id: i64) -> AppResult<Option<ServiceRequest>> {
        let request = sqlx::query_as::<_, ServiceRequest>("SELECT * FROM service_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(request)
    }

    async fn list_requests(&self, filter: &RequestFilter) -> AppResult<Vec<ServiceRequest>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM service_requests WHERE TRUE");
        if let Some(requester_id) = filter.requester_id {
            builder.push(" AND requester_id = ").push_bind(requester_id);
        }
        if let Some(provider_id) = filter.provider_id {
            builder.push(" AND provider_id = ").push_bind(provider_id);
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(since) = filter.updated_since {
            builder.push(" AND updated_at > ").push_bind(since);
        }
        builder.push(" ORDER BY created_at DESC, id DESC");

        let requests = builder
            .build_query_as::<ServiceRequest>()
            .fetch_all(&self.pool)
            .await?;
        Ok(requests)
    }

    async fn assign_request(
        &self,
        request_id: i64,
        provider_id: i64,
        phase: AssignmentPhase,
    ) -> AppResult<ServiceRequest> {
        let mut tx = self.pool.begin().await?;
        let current = Self::lock_request(&mut tx, request_id).await?;
        let provider = Self::lock_provider(&mut tx, provider_id).await?;

        let mut next = current.clone();
        lifecycle::assign(&mut next, provider_id, phase, Utc::now())?;
        let has_active_job = Self::active_job_exists(&mut tx, provider_id).await?;
        availability::ensure_eligible(&provider, has_active_job)?;

        let assigned = Self::write_transition(&mut tx, RequestStatus::Pending, &next)
            .await?
            .ok_or(LifecycleError::AlreadyAssigned {
                request_id,
                status: current.status,
            })?;
        Self::set_provider_status(&mut tx, provider_id, availability::status_after_assignment())
            .await?;

        tx.commit().await?;
        debug!("request {} bound to provider {}", request_id, provider_id);
        Ok(assigned)
    }

    async fn start_request(&self, request_id: i64, provider_id: i64) -> AppResult<ServiceRequest> {
        let mut tx = self.pool.begin().await?;
        let current = Self::lock_request(&mut tx, request_id).await?;

        let mut next = current.clone();
        lifecycle::start(&mut next, provider_id, Utc::now())?;

        let started = Self::write_transition(&mut tx, current.status, &next)
            .await?
            .ok_or_else(|| not_found_error("Request", request_id))?;

        tx.commit().await?;
        Ok(started)
    }

    async fn complete_request(
        &self,
        request_id: i64,
        provider_id: i64,
        final_cost: Option<Decimal>,
    ) -> AppResult<ServiceRequest> {
        let mut tx = self.pool.begin().await?;
        let current = Self::lock_request(&mut tx, request_id).await?;

        let mut next = current.clone();
        lifecycle::complete(&mut next, provider_id, final_cost, Utc::now())?;
        let provider = Self::lock_provider(&mut tx, provider_id).await?;

        let completed = Self::write_transition(&mut tx, current.status, &next)
            .await?
            .ok_or_else(|| not_found_error("Request", request_id))?;

        let still_active = Self::active_job_exists(&mut tx, provider_id).await?;
        let released = availability::status_after_release(provider.current_status, still_active);
        if released != provider.current_status {
            Self::set_provider_status(&mut tx, provider_id, released).await?;
        }

        tx.commit().await?;
        Ok(completed)
    }

    async fn cancel_request(&self, request_id: i64, requester_id: i64) -> AppResult<ServiceRequest> {
        let mut tx = self.pool.begin().await?;
        let current = Self::lock_request(&mut tx, request_id).await?;

        let mut next = current.clone();
        lifecycle::cancel(&mut next, requester_id, Utc::now())?;

        let cancelled = Self::write_transition(&mut tx, RequestStatus::Pending, &next)
            .await?
            .ok_or_else(|| not_found_error("Request", request_id))?;

        tx.commit().await?;
        Ok(cancelled)
    }
}
