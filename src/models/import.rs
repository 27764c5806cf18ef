// src/models/import.rs

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use utoipa::ToSchema;

use crate::common::error::AppError;
use crate::models::schema::StandardField;

// --- ENUMS ---

// Mapeia o CREATE TYPE import_status do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "import_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    Pending,
    Mapping,
    Importing,
    Completed,
    Failed,
}

impl ImportStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ImportStatus::Completed | ImportStatus::Failed)
    }

    /// pending -> mapping -> importing -> (completed | failed).
    /// Qualquer estado não terminal pode cair direto em failed.
    pub fn can_transition_to(self, next: ImportStatus) -> bool {
        use ImportStatus::*;
        match (self, next) {
            (Pending, Mapping) | (Mapping, Importing) | (Importing, Completed) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

// Mapeia o CREATE TYPE import_target do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "import_target", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetSchema {
    Customers,
    Orders,
}

impl FromStr for TargetSchema {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customers" => Ok(TargetSchema::Customers),
            "orders" => Ok(TargetSchema::Orders),
            _ => Err(AppError::UnknownTargetSchema(s.to_string())),
        }
    }
}

// Tipos simples aceitos em campos de extensão (mesma família do crm_field_type)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Boolean,
}

// --- MAPEAMENTO ---

/// Destino de uma coluna de origem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum MappingTarget {
    Skip,
    Standard {
        field: StandardField,
    },
    #[serde(rename_all = "camelCase")]
    Extension {
        key: String,
        field_type: FieldType,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    #[schema(example = "Email")]
    pub source_column: String,
    pub target: MappingTarget,
    #[serde(default)]
    pub required: bool,
}

impl ColumnMapping {
    pub fn standard(source_column: &str, field: StandardField) -> Self {
        Self {
            source_column: source_column.to_string(),
            target: MappingTarget::Standard { field },
            required: false,
        }
    }

    pub fn extension(source_column: &str, key: &str, field_type: FieldType) -> Self {
        Self {
            source_column: source_column.to_string(),
            target: MappingTarget::Extension {
                key: key.to_string(),
                field_type,
            },
            required: false,
        }
    }

    pub fn skip(source_column: &str) -> Self {
        Self {
            source_column: source_column.to_string(),
            target: MappingTarget::Skip,
            required: false,
        }
    }
}

// --- EXECUÇÃO (O Ledger) ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    // None = nota da execução inteira (ex.: falha no recálculo de um cliente)
    pub row_index: Option<usize>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportRun {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "orders_export_2024.csv")]
    pub file_name: String,
    pub target_schema: TargetSchema,
    pub status: ImportStatus,
    pub total_rows: i64,
    pub imported_rows: i64,
    pub error_rows: i64,
    pub mappings: Vec<ColumnMapping>,
    pub errors: Vec<RowError>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ImportRun {
    pub fn new(
        tenant_id: Uuid,
        file_name: &str,
        target_schema: TargetSchema,
        mappings: Vec<ColumnMapping>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            file_name: file_name.to_string(),
            target_schema,
            status: ImportStatus::Pending,
            total_rows: 0,
            imported_rows: 0,
            error_rows: 0,
            mappings,
            errors: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn transition(&mut self, next: ImportStatus) -> Result<(), AppError> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::InvalidStatusTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }
}

// --- PRÉ-VISUALIZAÇÃO ---

/// Cabeçalhos, amostra e mapeamento sugerido para o operador revisar.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportPreview {
    pub target_schema: TargetSchema,
    pub headers: Vec<String>,
    pub total_rows: usize,
    pub sample_rows: Vec<HashMap<String, String>>,
    pub suggested_mappings: Vec<ColumnMapping>,
}

/// Evento de progresso emitido uma vez por chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportProgress {
    pub rows_done: usize,
    pub rows_total: usize,
    pub errors_so_far: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ImportEvent {
    Progress(ImportProgress),
    Completed(ImportRun),
    Error { message: String },
}

impl ImportEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ImportEvent::Progress(_) => "progress",
            ImportEvent::Completed(_) => "completed",
            ImportEvent::Error { .. } => "error",
        }
    }
}

// --- FEED DE ATIVIDADES ---

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "import.completed")]
    pub kind: String,
    pub message: String,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_runs_refuse_any_transition() {
        let mut run = ImportRun::new(Uuid::new_v4(), "a.csv", TargetSchema::Orders, vec![]);
        run.transition(ImportStatus::Mapping).unwrap();
        run.transition(ImportStatus::Importing).unwrap();
        run.transition(ImportStatus::Completed).unwrap();
        assert!(run.completed_at.is_some());

        let err = run.transition(ImportStatus::Failed).unwrap_err();
        assert!(matches!(err, AppError::InvalidStatusTransition { .. }));
        assert_eq!(run.status, ImportStatus::Completed);
    }

    #[test]
    fn pending_cannot_skip_to_completed() {
        assert!(!ImportStatus::Pending.can_transition_to(ImportStatus::Completed));
        assert!(ImportStatus::Pending.can_transition_to(ImportStatus::Failed));
    }

    #[test]
    fn mapping_target_uses_mode_tag() {
        let mapping = ColumnMapping::extension("Loyalty Tier", "loyalty_tier", FieldType::Text);
        let json = serde_json::to_value(&mapping).unwrap();
        assert_eq!(json["target"]["mode"], "extension");
        assert_eq!(json["target"]["fieldType"], "TEXT");

        let parsed: ColumnMapping = serde_json::from_value(serde_json::json!({
            "sourceColumn": "Email",
            "target": { "mode": "standard", "field": "email" }
        }))
        .unwrap();
        assert_eq!(parsed, ColumnMapping::standard("Email", StandardField::Email));
    }

    #[test]
    fn target_schema_parses_case_insensitively() {
        assert_eq!("Orders".parse::<TargetSchema>().unwrap(), TargetSchema::Orders);
        assert!("products".parse::<TargetSchema>().is_err());
    }
}
