// src/models/operations.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;
use utoipa::ToSchema;

use crate::models::crm::Address;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[schema(example = "Camiseta Básica")]
    pub name: String,
    #[schema(example = "TSHIRT-P")]
    pub sku: Option<String>,
    #[schema(example = 2)]
    pub quantity: i64,
    #[schema(example = "49.90")]
    pub price: Decimal,
}

impl LineItem {
    /// Preço x quantidade. Estouro vira zero, como qualquer valor ilegível.
    pub fn line_total(&self) -> Decimal {
        self.price
            .checked_mul(Decimal::from(self.quantity))
            .unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub import_run_id: Option<Uuid>,
    #[schema(example = "#1024")]
    pub order_number: String,
    pub customer_id: Option<Uuid>,
    pub email: Option<String>,
    #[schema(example = "paid")]
    pub financial_status: Option<String>,
    #[schema(example = "fulfilled")]
    pub fulfillment_status: Option<String>,
    pub subtotal_price: Decimal,
    pub total_tax: Decimal,
    pub total_discounts: Decimal,
    pub total_shipping: Decimal,
    #[schema(example = "150.50")]
    pub total_price: Decimal,
    #[schema(example = "BRL")]
    pub currency: Option<String>,
    #[schema(value_type = Vec<LineItem>)]
    pub line_items: Json<Vec<LineItem>>,
    pub shipping_address: Option<Value>,
    pub processed_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

/// Pedido lógico montado pelo agrupador (uma ou mais linhas do arquivo).
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Option<Uuid>,
    pub email: Option<String>,
    pub financial_status: Option<String>,
    pub fulfillment_status: Option<String>,
    pub subtotal_price: Decimal,
    pub total_tax: Decimal,
    pub total_discounts: Decimal,
    pub total_shipping: Decimal,
    pub total_price: Decimal,
    pub currency: Option<String>,
    pub line_items: Vec<LineItem>,
    pub shipping_address: Option<Address>,
    pub processed_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub metadata: Value,
    pub row_indices: Vec<usize>,
}
