//! Modelo de ServiceRequest
//!
//! Una solicitud de asistencia en carretera seguida a lo largo de su ciclo
//! de vida. Las solicitudes nunca se borran; solo transicionan.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

/// Tipo de servicio - mapea al ENUM service_type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "service_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Towing,
    Battery,
    Tire,
    Fuel,
    Lockout,
    Winch,
    Other,
}

/// Prioridad - mapea al ENUM request_priority
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "request_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// Estado canónico de la solicitud - mapea al ENUM request_status
///
/// `dispatched` y `accepted` se aceptan como sinónimos de `assigned` en la
/// entrada; la diferencia vive en [`AssignmentPhase`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "request_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    #[serde(alias = "dispatched", alias = "accepted")]
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl RequestStatus {
    /// Estados activos: un proveedor (o nadie aún) trabaja en la solicitud
    pub const ACTIVE: [RequestStatus; 3] = [
        RequestStatus::Pending,
        RequestStatus::Assigned,
        RequestStatus::InProgress,
    ];

    /// Estados con proveedor vinculado y trabajo por terminar
    pub const BOUND_ACTIVE: [RequestStatus; 2] =
        [RequestStatus::Assigned, RequestStatus::InProgress];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Assigned => "assigned",
            RequestStatus::InProgress => "in_progress",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Cancelled)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Tiene proveedor vinculado y aún no terminó
    pub fn is_bound_active(&self) -> bool {
        Self::BOUND_ACTIVE.contains(self)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-fase de una solicitud asignada - mapea al ENUM assignment_phase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "assignment_phase", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AssignmentPhase {
    /// Asignada manualmente por un administrador
    Dispatched,
    /// Aceptada por el propio proveedor
    Accepted,
}

/// ServiceRequest - mapea exactamente a la tabla service_requests
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServiceRequest {
    pub id: i64,
    pub requester_id: i64,
    pub provider_id: Option<i64>,
    pub service_type: ServiceType,
    pub priority: Priority,
    pub status: RequestStatus,
    pub assignment_phase: Option<AssignmentPhase>,
    pub location_address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub vehicle_make: String,
    pub vehicle_model: String,
    pub vehicle_year: Option<i32>,
    pub vehicle_plate: Option<String>,
    pub description: String,
    pub final_cost: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl ServiceRequest {
    /// Construir una solicitud nueva en estado `pending`
    pub fn new_pending(id: i64, requester_id: i64, new: NewServiceRequest, now: DateTime<Utc>) -> Self {
        Self {
            id,
            requester_id,
            provider_id: None,
            service_type: new.service_type,
            priority: new.priority,
            status: RequestStatus::Pending,
            assignment_phase: None,
            location_address: new.location_address,
            latitude: new.latitude,
            longitude: new.longitude,
            vehicle_make: new.vehicle_make,
            vehicle_model: new.vehicle_model,
            vehicle_year: new.vehicle_year,
            vehicle_plate: new.vehicle_plate,
            description: new.description,
            final_cost: None,
            created_at: now,
            updated_at: now,
            assigned_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
        }
    }

    /// ¿El proveedor indicado está vinculado a esta solicitud?
    pub fn is_bound_to(&self, provider_id: i64) -> bool {
        self.provider_id == Some(provider_id)
    }
}

/// Datos validados para crear una solicitud
#[derive(Debug, Clone)]
pub struct NewServiceRequest {
    pub service_type: ServiceType,
    pub priority: Priority,
    pub location_address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub vehicle_make: String,
    pub vehicle_model: String,
    pub vehicle_year: Option<i32>,
    pub vehicle_plate: Option<String>,
    pub description: String,
}

/// Filtros de listado (contrato de polling)
#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub requester_id: Option<i64>,
    pub provider_id: Option<i64>,
    pub status: Option<RequestStatus>,
    pub updated_since: Option<DateTime<Utc>>,
}

impl RequestFilter {
    pub fn for_requester(requester_id: i64) -> Self {
        Self {
            requester_id: Some(requester_id),
            ..Default::default()
        }
    }

    pub fn for_provider(provider_id: i64) -> Self {
        Self {
            provider_id: Some(provider_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, request: &ServiceRequest) -> bool {
        self.requester_id.map_or(true, |id| request.requester_id == id)
            && self.provider_id.map_or(true, |id| request.provider_id == Some(id))
            && self.status.map_or(true, |status| request.status == status)
            && self
                .updated_since
                .map_or(true, |since| request.updated_at > since)
    }
}
