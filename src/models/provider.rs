//! Modelo de Provider
//!
//! Perfil de operador de grúa vinculado a un usuario con rol `provider`,
//! más su disponibilidad actual y última ubicación conocida.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

/// Estado del proveedor - mapea al ENUM provider_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(type_name = "provider_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    Online,
    Busy,
    Offline,
}

impl ProviderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderStatus::Online => "online",
            ProviderStatus::Busy => "busy",
            ProviderStatus::Offline => "offline",
        }
    }
}

impl std::fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider - mapea exactamente a la tabla providers
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Provider {
    pub id: i64,
    pub user_id: i64,
    pub company_name: String,
    pub license_number: String,
    pub vehicle_type: Option<String>,
    pub vehicle_plate: String,
    pub insurance_provider: Option<String>,
    pub insurance_policy_number: Option<String>,
    pub current_status: ProviderStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_updated_at: Option<DateTime<Utc>>,
    pub profile_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Datos para crear el perfil de un proveedor (una sola vez)
#[derive(Debug, Clone)]
pub struct NewProvider {
    pub company_name: String,
    pub license_number: String,
    pub vehicle_type: Option<String>,
    pub vehicle_plate: String,
    pub insurance_provider: Option<String>,
    pub insurance_policy_number: Option<String>,
}

impl NewProvider {
    /// El perfil se considera completo cuando los datos del seguro están presentes
    pub fn is_complete(&self) -> bool {
        let filled = |field: &Option<String>| {
            field.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
        };
        filled(&self.insurance_provider) && filled(&self.insurance_policy_number)
    }
}
