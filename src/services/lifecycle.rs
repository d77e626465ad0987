//! Máquina de estados de las solicitudes
//!
//! Funciones puras que validan y aplican cada transición sobre una
//! `ServiceRequest` ya cargada. Los stores las ejecutan dentro de su guardia
//! atómica (lock en memoria o transacción con `FOR UPDATE`), así que aquí no
//! hay I/O ni concurrencia.
//!
//! ```text
//! pending ──assign──▶ assigned ──start──▶ in_progress
//!    │                   │                    │
//!    │                   └──────complete──────┴──▶ completed
//!    └──cancel──▶ cancelled
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use crate::models::{AssignmentPhase, RequestStatus, ServiceRequest};

/// Errores de transición
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LifecycleError {
    #[error("request {request_id} already taken (status: {status})")]
    AlreadyAssigned {
        request_id: i64,
        status: RequestStatus,
    },

    #[error("cannot {action} request {request_id} while {status}")]
    InvalidState {
        request_id: i64,
        action: &'static str,
        status: RequestStatus,
    },

    #[error("not authorized: {0}")]
    NotAuthorized(&'static str),

    #[error("provider {provider_id} is not available for new work")]
    ProviderUnavailable { provider_id: i64 },

    #[error("provider {provider_id} still has an active request")]
    ActiveJobInProgress { provider_id: i64 },

    #[error("{0}")]
    InvalidCost(&'static str),
}

/// Vincular un proveedor a una solicitud pendiente.
///
/// Es la parte "compare" del compare-and-set: si la solicitud ya no está
/// en `pending`, quien llama perdió la carrera.
pub fn assign(
    request: &mut ServiceRequest,
    provider_id: i64,
    phase: AssignmentPhase,
    now: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    if request.status != RequestStatus::Pending {
        return Err(LifecycleError::AlreadyAssigned {
            request_id: request.id,
            status: request.status,
        });
    }

    request.status = RequestStatus::Assigned;
    request.provider_id = Some(provider_id);
    request.assignment_phase = Some(phase);
    request.assigned_at = Some(now);
    request.updated_at = now;
    Ok(())
}

/// El proveedor vinculado comienza el trabajo (`assigned → in_progress`)
pub fn start(
    request: &mut ServiceRequest,
    actor_provider_id: i64,
    now: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    if !request.is_bound_to(actor_provider_id) {
        return Err(LifecycleError::NotAuthorized(
            "only the bound provider can start this request",
        ));
    }
    if request.status != RequestStatus::Assigned {
        return Err(LifecycleError::InvalidState {
            request_id: request.id,
            action: "start",
            status: request.status,
        });
    }

    request.status = RequestStatus::InProgress;
    request.started_at = Some(now);
    request.updated_at = now;
    Ok(())
}

/// Cerrar la solicitud con su coste final
pub fn complete(
    request: &mut ServiceRequest,
    actor_provider_id: i64,
    final_cost: Option<Decimal>,
    now: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    if !request.is_bound_to(actor_provider_id) {
        return Err(LifecycleError::NotAuthorized(
            "only the bound provider can complete this request",
        ));
    }
    if !request.status.is_bound_active() {
        return Err(LifecycleError::InvalidState {
            request_id: request.id,
            action: "complete",
            status: request.status,
        });
    }
    let cost = normalize_cost(final_cost)?;

    request.status = RequestStatus::Completed;
    request.final_cost = Some(cost);
    request.completed_at = Some(now);
    request.updated_at = now;
    Ok(())
}

/// Cancelación por el solicitante, solo mientras nadie la tomó
pub fn cancel(
    request: &mut ServiceRequest,
    actor_user_id: i64,
    now: DateTime<Utc>,
) -> Result<(), LifecycleError> {
    if request.requester_id != actor_user_id {
        return Err(LifecycleError::NotAuthorized(
            "only the requester can cancel this request",
        ));
    }
    if request.status != RequestStatus::Pending {
        return Err(LifecycleError::InvalidState {
            request_id: request.id,
            action: "cancel",
            status: request.status,
        });
    }

    request.status = RequestStatus::Cancelled;
    request.cancelled_at = Some(now);
    request.updated_at = now;
    Ok(())
}

/// Tope de `final_cost`: lo que cabe en la columna `NUMERIC(10, 2)`
pub fn max_final_cost() -> Decimal {
    Decimal::new(9_999_999_999, 2)
}

/// Coste final: obligatorio, no negativo, dos decimales, dentro del tope
pub fn normalize_cost(final_cost: Option<Decimal>) -> Result<Decimal, LifecycleError> {
    let cost = final_cost.ok_or(LifecycleError::InvalidCost("final_cost is required"))?;
    if cost.is_sign_negative() && !cost.is_zero() {
        return Err(LifecycleError::InvalidCost(
            "final_cost must be a non-negative number",
        ));
    }

    let mut cost = cost.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    cost.rescale(2);
    if cost > max_final_cost() {
        return Err(LifecycleError::InvalidCost(
            "final_cost must not exceed 99999999.99",
        ));
    }
    Ok(cost)
}

/// Invariantes de persistencia de una solicitud
pub fn invariants_hold(request: &ServiceRequest) -> bool {
    let completed = request.status == RequestStatus::Completed;
    let cancelled = request.status == RequestStatus::Cancelled;
    let bound = matches!(
        request.status,
        RequestStatus::Assigned | RequestStatus::InProgress | RequestStatus::Completed
    );

    request.completed_at.is_some() == completed
        && request.final_cost.is_some() == completed
        && request.cancelled_at.is_some() == cancelled
        && request.provider_id.is_some() == bound
        && request.assignment_phase.is_some() == bound
}
