//! Extractores con rechazo en formato `AppError`
//!
//! Un cuerpo o query mal formado devuelve el mismo JSON de error que el
//! resto de la API en lugar del texto plano de axum. Un JSON bien formado
//! con campos ausentes o de tipo incorrecto es un error de validación.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, rejection::QueryRejection, FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use validator::{ValidationError, ValidationErrors};

use super::errors::AppError;

/// `Json<T>` que rechaza con `AppError` (validación o petición incorrecta)
pub struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        Ok(AppJson(value))
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::JsonDataError(error) => {
            let mut invalid = ValidationError::new("invalid");
            invalid.message = Some(error.body_text().into());

            let mut errors = ValidationErrors::new();
            errors.add("body", invalid);
            AppError::Validation(errors)
        }
        other => AppError::BadRequest(other.body_text()),
    }
}

/// `Query<T>` que rechaza con `AppError::BadRequest`
pub struct AppQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: QueryRejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(AppQuery(value))
    }
}
