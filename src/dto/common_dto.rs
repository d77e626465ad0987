use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::RequestStatus;
use crate::utils::errors::{bad_request_error, AppResult};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

// Respuesta genérica para acciones sin recurso que devolver
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

// Query string de los listados (contrato de polling)
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<RequestStatus>,
    pub updated_since: Option<DateTime<Utc>>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl ListQuery {
    fn is_paginated(&self) -> bool {
        self.page.is_some() || self.page_size.is_some()
    }
}

// Envelope paginado
#[derive(Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: usize,
    pub page: usize,
    pub page_size: usize,
    pub results: Vec<T>,
}

/// Lista desnuda o envelope paginado, según pida el cliente
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Items(Vec<T>),
    Page(Page<T>),
}

impl<T> ListResponse<T> {
    pub fn from_query(items: Vec<T>, query: &ListQuery) -> AppResult<Self> {
        if !query.is_paginated() {
            return Ok(ListResponse::Items(items));
        }

        let page = query.page.unwrap_or(1);
        let page_size = query.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page == 0 {
            return Err(bad_request_error("page must be >= 1"));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(bad_request_error("page_size must be between 1 and 100"));
        }

        let count = items.len();
        // Un offset que desborda queda más allá del final: página vacía
        let results = match (page - 1).checked_mul(page_size) {
            Some(offset) => items.into_iter().skip(offset).take(page_size).collect(),
            None => Vec::new(),
        };

        Ok(ListResponse::Page(Page {
            count,
            page,
            page_size,
            results,
        }))
    }
}
