//! Disponibilidad de proveedores
//!
//! Reglas del tracker: quién puede recibir trabajo nuevo, qué cambios de
//! estado se aceptan y cómo queda el proveedor al liberar un trabajo.
//! Un proveedor con una solicitud activa vinculada nunca es elegible,
//! diga lo que diga su flag de estado.

use chrono::{DateTime, Utc};

use crate::models::{Provider, ProviderStatus};
use crate::services::lifecycle::LifecycleError;
use crate::utils::validation::validate_coordinates;

/// Elegible para trabajo nuevo: online y sin solicitud activa vinculada
pub fn is_eligible(provider: &Provider, has_active_job: bool) -> bool {
    provider.current_status == ProviderStatus::Online && !has_active_job
}

pub fn ensure_eligible(provider: &Provider, has_active_job: bool) -> Result<(), LifecycleError> {
    if is_eligible(provider, has_active_job) {
        Ok(())
    } else {
        Err(LifecycleError::ProviderUnavailable {
            provider_id: provider.id,
        })
    }
}

/// Validar un cambio explícito de estado.
///
/// `online` se rechaza mientras haya un trabajo activo; `busy` y `offline`
/// siempre se aceptan.
pub fn check_status_change(
    provider: &Provider,
    new_status: ProviderStatus,
    has_active_job: bool,
) -> Result<(), LifecycleError> {
    if new_status == ProviderStatus::Online && has_active_job {
        return Err(LifecycleError::ActiveJobInProgress {
            provider_id: provider.id,
        });
    }
    Ok(())
}

/// Estado del proveedor justo después de quedar vinculado a una solicitud
pub fn status_after_assignment() -> ProviderStatus {
    ProviderStatus::Busy
}

/// Estado del proveedor al cerrar un trabajo: vuelve a `online` si estaba
/// ocupado y no le queda otro trabajo activo.
pub fn status_after_release(current: ProviderStatus, still_has_active_job: bool) -> ProviderStatus {
    match current {
        ProviderStatus::Busy if !still_has_active_job => ProviderStatus::Online,
        other => other,
    }
}

/// Aplicar un reporte de ubicación (último en escribir gana)
pub fn apply_location(
    provider: &mut Provider,
    latitude: f64,
    longitude: f64,
    now: DateTime<Utc>,
) -> Result<(), validator::ValidationError> {
    validate_coordinates(latitude, longitude)?;
    provider.latitude = Some(latitude);
    provider.longitude = Some(longitude);
    provider.location_updated_at = Some(now);
    provider.updated_at = now;
    Ok(())
}
