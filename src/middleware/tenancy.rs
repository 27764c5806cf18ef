// src/middleware/tenancy.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::common::error::AppError;

// O gateway autentica e repassa a loja neste cabeçalho
pub const TENANT_ID_HEADER: &str = "x-tenant-id";

/// Loja (tenant) dona de tudo o que a requisição lê ou grava.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext(pub Uuid);

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(TENANT_ID_HEADER)
            .ok_or(AppError::InvalidTenantHeader("O cabeçalho X-Tenant-ID é obrigatório."))?;

        let value_str = value.to_str().map_err(|_| {
            AppError::InvalidTenantHeader("Cabeçalho X-Tenant-ID contém caracteres inválidos.")
        })?;

        let tenant_id = Uuid::parse_str(value_str.trim()).map_err(|_| {
            AppError::InvalidTenantHeader("Cabeçalho X-Tenant-ID inválido (não é um UUID).")
        })?;

        Ok(TenantContext(tenant_id))
    }
}
