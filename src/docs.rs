// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Imports ---
        handlers::imports::list_target_fields,
        handlers::imports::preview_import,
        handlers::imports::start_import,
        handlers::imports::stream_import,
        handlers::imports::list_imports,
        handlers::imports::get_import,

        // --- Activity ---
        handlers::imports::list_activity,
    ),
    components(
        schemas(
            // --- Mapeamento ---
            models::schema::StandardField,
            models::schema::TargetField,
            models::import::TargetSchema,
            models::import::FieldType,
            models::import::MappingTarget,
            models::import::ColumnMapping,
            models::import::ImportPreview,

            // --- Execuções ---
            models::import::ImportStatus,
            models::import::ImportRun,
            models::import::RowError,
            models::import::ImportProgress,
            models::import::ActivityEntry,

            // --- Dados importados ---
            models::crm::Address,
            models::crm::Customer,
            models::operations::LineItem,
            models::operations::Order,

            // --- Payloads ---
            handlers::imports::PreviewPayload,
            handlers::imports::StartImportPayload,
        )
    ),
    tags(
        (name = "Imports", description = "Importação em massa de clientes e pedidos"),
        (name = "Activity", description = "Feed de atividades da loja")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        // O gateway já autenticou; aqui só chega a loja escolhida
        components.add_security_scheme(
            "tenant_header",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-tenant-id"))),
        );
    }
}
