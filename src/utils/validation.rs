//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validación de datos
//! usadas desde los DTOs (`#[validate(custom = ...)]`) y desde los controladores.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use validator::ValidationError;

lazy_static! {
    /// Matrícula: letras, dígitos, espacios y guiones
    pub static ref PLATE_REGEX: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 \-]{0,14}$").unwrap();
}

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_empty");
        error.message = Some("must not be empty".into());
        return Err(error);
    }
    Ok(())
}

/// Validar que una latitud/longitud estén en rango
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), ValidationError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        let mut error = ValidationError::new("latitude");
        error.add_param("value".into(), &latitude);
        error.message = Some("latitude must be between -90 and 90".into());
        return Err(error);
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        let mut error = ValidationError::new("longitude");
        error.add_param("value".into(), &longitude);
        error.message = Some("longitude must be between -180 and 180".into());
        return Err(error);
    }
    Ok(())
}

/// Validar matrícula (usado por `#[validate(custom = ...)]`)
pub fn validate_plate(value: &str) -> Result<(), ValidationError> {
    if !PLATE_REGEX.is_match(value.trim()) {
        let mut error = ValidationError::new("plate");
        error.message = Some("plate must contain only letters, digits, spaces or dashes".into());
        return Err(error);
    }
    Ok(())
}

/// Validar un coste final: presente y no negativo
pub fn validate_final_cost(value: Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut error = ValidationError::new("final_cost");
        error.message = Some("final_cost must be a non-negative number".into());
        return Err(error);
    }
    Ok(())
}

/// Normalizar email para búsquedas y unicidad
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Normalizar matrícula (mayúsculas, espacios colapsados)
pub fn normalize_plate(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}
