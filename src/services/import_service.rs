// src/services/import_service.rs

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::ImportSettings,
    db::ImportStore,
    models::{
        import::{ActivityEntry, ImportEvent, ImportPreview, ImportRun, TargetSchema},
        schema::TargetField,
    },
    services::import::{self, ImportRequest, mapper::suggest_mapping, reader::parse_delimited},
};

#[derive(Clone)]
pub struct ImportService {
    store: Arc<dyn ImportStore>,
    settings: ImportSettings,
}

impl ImportService {
    pub fn new(store: Arc<dyn ImportStore>, settings: ImportSettings) -> Self {
        Self { store, settings }
    }

    // =========================================================================
    //  1. DESCOBERTA (SCHEMA E PRÉ-VISUALIZAÇÃO)
    // =========================================================================

    pub fn target_fields(&self, schema: TargetSchema) -> Vec<TargetField> {
        schema.fields()
    }

    /// Lê o arquivo e sugere o mapeamento. Nada é gravado.
    pub fn preview(&self, schema: TargetSchema, content: &str, allow_extension: bool) -> ImportPreview {
        let table = parse_delimited(content);
        let sample_rows: Vec<_> = table
            .rows
            .iter()
            .take(self.settings.preview_rows)
            .cloned()
            .collect();
        let suggested_mappings = suggest_mapping(schema, &table.headers, &sample_rows, allow_extension);

        ImportPreview {
            target_schema: schema,
            total_rows: table.rows.len(),
            headers: table.headers,
            sample_rows,
            suggested_mappings,
        }
    }

    // =========================================================================
    //  2. EXECUÇÃO
    // =========================================================================

    pub async fn run_import(
        &self,
        request: ImportRequest,
        events: Option<UnboundedSender<ImportEvent>>,
    ) -> Result<ImportRun, AppError> {
        import::run(self.store.as_ref(), &self.settings, request, events).await
    }

    // =========================================================================
    //  3. CONSULTAS
    // =========================================================================

    pub async fn list_runs(&self, tenant_id: Uuid) -> Result<Vec<ImportRun>, AppError> {
        self.store.list_runs(tenant_id).await
    }

    pub async fn get_run(&self, tenant_id: Uuid, run_id: Uuid) -> Result<ImportRun, AppError> {
        self.store
            .get_run(tenant_id, run_id)
            .await?
            .ok_or(AppError::ImportRunNotFound)
    }

    pub async fn list_activity(&self, tenant_id: Uuid, limit: i64) -> Result<Vec<ActivityEntry>, AppError> {
        self.store.list_activity(tenant_id, limit.clamp(1, 200)).await
    }
}
