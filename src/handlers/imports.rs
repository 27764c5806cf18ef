// src/handlers/imports.rs

use std::{convert::Infallible, time::Duration};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
    Json,
};
use futures::stream::{Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::tenancy::TenantContext,
    models::{
        import::{ActivityEntry, ColumnMapping, ImportEvent, ImportPreview, ImportRun, TargetSchema},
        schema::TargetField,
    },
    services::import::{mapper::validate_mapping, ImportRequest},
};

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreviewPayload {
    #[validate(length(min = 1, message = "Informe o schema de destino"))]
    #[schema(example = "ORDERS")]
    pub target_schema: String,

    // Conteúdo bruto do arquivo (CSV ou TSV)
    #[schema(example = "Email,Name,Order,Total\nalice@x.com,Alice,A100,10")]
    pub content: String,

    // Colunas sem correspondência viram campos de extensão
    #[serde(default = "default_true")]
    pub allow_extension: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StartImportPayload {
    #[validate(length(min = 1, max = 255, message = "O nome do arquivo deve ter entre 1 e 255 caracteres"))]
    #[schema(example = "orders_export.csv")]
    pub file_name: String,

    #[validate(length(min = 1, message = "Informe o schema de destino"))]
    #[schema(example = "ORDERS")]
    pub target_schema: String,

    pub content: String,

    #[validate(length(min = 1, message = "Informe ao menos uma coluna"))]
    pub mappings: Vec<ColumnMapping>,
}

impl StartImportPayload {
    fn into_request(self, tenant_id: Uuid) -> Result<ImportRequest, AppError> {
        Ok(ImportRequest {
            tenant_id,
            target: self.target_schema.parse()?,
            file_name: self.file_name,
            content: self.content,
            mappings: self.mappings,
        })
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivityQuery {
    /// Máximo de entradas (1 a 200, padrão 50)
    pub limit: Option<i64>,
}

// =============================================================================
//  ÁREA 1: DESCOBERTA
// =============================================================================

// GET /api/imports/schemas/{schema}/fields
#[utoipa::path(
    get,
    path = "/api/imports/schemas/{schema}/fields",
    tag = "Imports",
    responses(
        (status = 200, description = "Campos do schema de destino", body = Vec<TargetField>),
        (status = 400, description = "Schema desconhecido")
    ),
    params(
        ("schema" = String, Path, description = "CUSTOMERS ou ORDERS"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("tenant_header" = []))
)]
pub async fn list_target_fields(
    State(app_state): State<AppState>,
    _tenant: TenantContext,
    Path(schema): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let schema: TargetSchema = schema.parse()?;
    Ok(Json(app_state.import_service.target_fields(schema)))
}

// POST /api/imports/preview
#[utoipa::path(
    post,
    path = "/api/imports/preview",
    tag = "Imports",
    request_body = PreviewPayload,
    responses(
        (status = 200, description = "Cabeçalhos, amostra e mapeamento sugerido", body = ImportPreview),
        (status = 400, description = "Dados inválidos")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("tenant_header" = []))
)]
pub async fn preview_import(
    State(app_state): State<AppState>,
    _tenant: TenantContext,
    Json(payload): Json<PreviewPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let schema: TargetSchema = payload.target_schema.parse()?;

    let preview = app_state
        .import_service
        .preview(schema, &payload.content, payload.allow_extension);

    Ok(Json(preview))
}

// =============================================================================
//  ÁREA 2: EXECUÇÃO
// =============================================================================

// POST /api/imports
#[utoipa::path(
    post,
    path = "/api/imports",
    tag = "Imports",
    request_body = StartImportPayload,
    responses(
        (status = 201, description = "Importação executada (completed ou failed)", body = ImportRun),
        (status = 400, description = "Mapeamento recusado")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("tenant_header" = []))
)]
pub async fn start_import(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<StartImportPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let request = payload.into_request(tenant.0)?;

    let run = app_state.import_service.run_import(request, None).await?;

    Ok((StatusCode::CREATED, Json(run)))
}

// POST /api/imports/stream
#[utoipa::path(
    post,
    path = "/api/imports/stream",
    tag = "Imports",
    request_body = StartImportPayload,
    responses(
        (status = 200, description = "Eventos SSE: progress, completed ou error", body = String, content_type = "text/event-stream"),
        (status = 400, description = "Mapeamento recusado")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("tenant_header" = []))
)]
pub async fn stream_import(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Json(payload): Json<StartImportPayload>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    payload.validate()?;
    let request = payload.into_request(tenant.0)?;
    // Recusa antes de abrir o stream, para o cliente receber um 400 normal
    validate_mapping(request.target, &request.mappings)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let service = app_state.import_service.clone();

    tokio::spawn(async move {
        let last = match service.run_import(request, Some(tx.clone())).await {
            Ok(run) => ImportEvent::Completed(run),
            Err(e) => {
                tracing::error!("Importação interrompida: {}", e);
                ImportEvent::Error { message: e.to_string() }
            }
        };
        if tx.send(last).is_err() {
            tracing::debug!("Cliente SSE desconectou antes do fim da importação");
        }
    });

    let stream = UnboundedReceiverStream::new(rx).filter_map(|event| async move {
        match serde_json::to_string(&event) {
            Ok(json) => Some(Ok(Event::default().event(event.name()).data(json))),
            Err(e) => {
                tracing::warn!("Falha ao serializar evento de importação: {}", e);
                None
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

// =============================================================================
//  ÁREA 3: CONSULTAS
// =============================================================================

// GET /api/imports
#[utoipa::path(
    get,
    path = "/api/imports",
    tag = "Imports",
    responses(
        (status = 200, description = "Execuções da loja, mais recentes primeiro", body = Vec<ImportRun>)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("tenant_header" = []))
)]
pub async fn list_imports(
    State(app_state): State<AppState>,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let runs = app_state.import_service.list_runs(tenant.0).await?;
    Ok(Json(runs))
}

// GET /api/imports/{id}
#[utoipa::path(
    get,
    path = "/api/imports/{id}",
    tag = "Imports",
    responses(
        (status = 200, description = "Execução com contagens e erros por linha", body = ImportRun),
        (status = 404, description = "Importação não encontrada")
    ),
    params(
        ("id" = Uuid, Path, description = "ID da execução"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("tenant_header" = []))
)]
pub async fn get_import(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let run = app_state.import_service.get_run(tenant.0, id).await?;
    Ok(Json(run))
}

// GET /api/activity
#[utoipa::path(
    get,
    path = "/api/activity",
    tag = "Activity",
    responses(
        (status = 200, description = "Feed de atividades da loja", body = Vec<ActivityEntry>)
    ),
    params(
        ActivityQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Loja")
    ),
    security(("tenant_header" = []))
)]
pub async fn list_activity(
    State(app_state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<ActivityQuery>,
) -> Result<impl IntoResponse, AppError> {
    let entries = app_state
        .import_service
        .list_activity(tenant.0, query.limit.unwrap_or(50))
        .await?;
    Ok(Json(entries))
}
