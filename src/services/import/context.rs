// src/services/import/context.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    config::ImportSettings,
    models::{
        crm::Address,
        import::{ColumnMapping, FieldType, MappingTarget, TargetSchema},
        schema::{AddressPart, StandardField},
    },
    services::import::{coerce::coerce_extension, reader::Row},
};

/// Mapeamento aprovado, indexado para leitura rápida por linha.
#[derive(Debug, Clone, Default)]
pub struct MappingIndex {
    standard: HashMap<StandardField, String>,
    extensions: Vec<(String, String, FieldType)>,
}

impl MappingIndex {
    pub fn new(mappings: &[ColumnMapping]) -> Self {
        let mut index = MappingIndex::default();
        for mapping in mappings {
            match &mapping.target {
                MappingTarget::Skip => {}
                MappingTarget::Standard { field } => {
                    index
                        .standard
                        .entry(*field)
                        .or_insert_with(|| mapping.source_column.clone());
                }
                MappingTarget::Extension { key, field_type } => {
                    index
                        .extensions
                        .push((mapping.source_column.clone(), key.clone(), *field_type));
                }
            }
        }
        index
    }

    pub fn has(&self, field: StandardField) -> bool {
        self.standard.contains_key(&field)
    }

    pub fn has_any(&self, fields: &[StandardField]) -> bool {
        fields.iter().any(|f| self.has(*f))
    }

    /// Valor aparado da coluna mapeada; vazio conta como ausente.
    pub fn value<'r>(&self, row: &'r Row, field: StandardField) -> Option<&'r str> {
        let column = self.standard.get(&field)?;
        row.get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn owned(&self, row: &Row, field: StandardField) -> Option<String> {
        self.value(row, field).map(str::to_string)
    }

    /// E-mail normalizado (aparado, minúsculas).
    pub fn email(&self, row: &Row) -> Option<String> {
        self.value(row, StandardField::Email).map(str::to_lowercase)
    }

    fn collect_address(&self, row: &Row, part_of: fn(StandardField) -> Option<AddressPart>) -> Option<Address> {
        let mut address = Address::default();
        for (field, column) in &self.standard {
            let Some(part) = part_of(*field) else { continue };
            if let Some(value) = row.get(column).map(|v| v.trim()).filter(|v| !v.is_empty()) {
                address.set(part, value);
            }
        }
        (!address.is_empty()).then_some(address)
    }

    pub fn billing_address(&self, row: &Row) -> Option<Address> {
        self.collect_address(row, StandardField::address_part)
    }

    pub fn shipping_address(&self, row: &Row) -> Option<Address> {
        self.collect_address(row, StandardField::shipping_part)
    }

    /// Campos de extensão da linha já convertidos para o tipo inferido.
    pub fn extension_values(&self, row: &Row) -> Value {
        let mut bag = Map::new();
        for (column, key, field_type) in &self.extensions {
            if let Some(raw) = row.get(column).filter(|v| !v.trim().is_empty()) {
                bag.insert(key.clone(), coerce_extension(raw, *field_type));
            }
        }
        Value::Object(bag)
    }
}

/// Contexto imutável de uma execução, passado de estágio em estágio.
#[derive(Debug, Clone)]
pub struct ImportContext {
    pub tenant_id: Uuid,
    pub run_id: Uuid,
    pub target: TargetSchema,
    pub mappings: MappingIndex,
    pub started_at: DateTime<Utc>,
    pub chunk_size: usize,
    pub lookup_batch_size: usize,
}

impl ImportContext {
    pub fn new(
        tenant_id: Uuid,
        run_id: Uuid,
        target: TargetSchema,
        mappings: &[ColumnMapping],
        started_at: DateTime<Utc>,
        settings: &ImportSettings,
    ) -> Self {
        Self {
            tenant_id,
            run_id,
            target,
            mappings: MappingIndex::new(mappings),
            started_at,
            chunk_size: settings.chunk_size.max(1),
            lookup_batch_size: settings.lookup_batch_size.max(1),
        }
    }
}
