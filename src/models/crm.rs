// src/models/crm.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value; // <--- metadata e endereço vão como JSONB
use sqlx::FromRow;
use uuid::Uuid;
use utoipa::ToSchema;

use crate::models::schema::AddressPart;

// --- ENDEREÇO ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Address {
    pub fn set(&mut self, part: AddressPart, value: &str) {
        let slot = match part {
            AddressPart::Line1 => &mut self.line1,
            AddressPart::Line2 => &mut self.line2,
            AddressPart::City => &mut self.city,
            AddressPart::Province => &mut self.province,
            AddressPart::Zip => &mut self.zip,
            AddressPart::Country => &mut self.country,
        };
        *slot = Some(value.to_string());
    }

    pub fn is_empty(&self) -> bool {
        *self == Address::default()
    }
}

// --- CLIENTE (O Dado) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,

    // Sempre em minúsculas: é a chave natural dentro do tenant
    #[schema(example = "maria@email.com")]
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,

    pub address: Option<Value>,

    // CAMPOS DE EXTENSÃO
    // Aqui vai o { "loyalty_tier": "gold", "points": 120 }
    pub metadata: Value,

    // Agregados derivados: sempre sobrescritos pelo recálculo, nunca incrementados
    pub orders_count: i64,
    #[schema(example = "150.50")]
    pub total_spent: Decimal,
    #[schema(example = "75.25")]
    pub avg_order_value: Decimal,
    pub first_order_at: Option<DateTime<Utc>>,
    pub last_order_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Rascunho de cliente montado pelo resolvedor antes da escrita.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCustomer {
    pub id: Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<Address>,
    pub metadata: Value,
    // Todas as linhas do arquivo com este e-mail
    pub row_indices: Vec<usize>,
}

/// Linha mínima do histórico usada pelo recálculo.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct OrderFact {
    pub total_price: Decimal,
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CustomerAggregates {
    pub orders_count: i64,
    pub total_spent: Decimal,
    pub avg_order_value: Decimal,
    pub first_order_at: Option<DateTime<Utc>>,
    pub last_order_at: Option<DateTime<Utc>>,
}
