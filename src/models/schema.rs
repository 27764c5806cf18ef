// src/models/schema.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::import::TargetSchema;

/// Campos fixos conhecidos pelos schemas de destino.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StandardField {
    // Cliente
    Email,
    FirstName,
    LastName,
    FullName,
    Phone,
    AddressLine1,
    AddressLine2,
    AddressCity,
    AddressProvince,
    AddressZip,
    AddressCountry,

    // Pedido
    OrderNumber,
    FinancialStatus,
    FulfillmentStatus,
    Currency,
    TotalPrice,
    SubtotalPrice,
    TotalTax,
    TotalDiscounts,
    TotalShipping,
    ProcessedAt,
    Notes,

    // Itens do pedido (uma linha do arquivo = um item)
    LineItemName,
    LineItemSku,
    LineItemQuantity,
    LineItemPrice,

    // Endereço de entrega
    ShippingLine1,
    ShippingLine2,
    ShippingCity,
    ShippingProvince,
    ShippingZip,
    ShippingCountry,
}

/// Partes de um endereço estruturado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressPart {
    Line1,
    Line2,
    City,
    Province,
    Zip,
    Country,
}

impl StandardField {
    pub const CUSTOMER_FIELDS: [StandardField; 11] = [
        StandardField::Email,
        StandardField::FirstName,
        StandardField::LastName,
        StandardField::FullName,
        StandardField::Phone,
        StandardField::AddressLine1,
        StandardField::AddressLine2,
        StandardField::AddressCity,
        StandardField::AddressProvince,
        StandardField::AddressZip,
        StandardField::AddressCountry,
    ];

    // A ordem importa: o mapeador usa a primeira ocorrência na busca por substring
    pub const ORDER_FIELDS: [StandardField; 21] = [
        StandardField::OrderNumber,
        StandardField::FinancialStatus,
        StandardField::FulfillmentStatus,
        StandardField::Currency,
        StandardField::TotalPrice,
        StandardField::SubtotalPrice,
        StandardField::TotalTax,
        StandardField::TotalDiscounts,
        StandardField::TotalShipping,
        StandardField::ProcessedAt,
        StandardField::Notes,
        StandardField::LineItemName,
        StandardField::LineItemSku,
        StandardField::LineItemQuantity,
        StandardField::LineItemPrice,
        StandardField::ShippingLine1,
        StandardField::ShippingLine2,
        StandardField::ShippingCity,
        StandardField::ShippingProvince,
        StandardField::ShippingZip,
        StandardField::ShippingCountry,
    ];

    pub const LINE_ITEM_FIELDS: [StandardField; 4] = [
        StandardField::LineItemName,
        StandardField::LineItemSku,
        StandardField::LineItemQuantity,
        StandardField::LineItemPrice,
    ];

    pub fn key(self) -> &'static str {
        match self {
            StandardField::Email => "email",
            StandardField::FirstName => "first_name",
            StandardField::LastName => "last_name",
            StandardField::FullName => "full_name",
            StandardField::Phone => "phone",
            StandardField::AddressLine1 => "address_line1",
            StandardField::AddressLine2 => "address_line2",
            StandardField::AddressCity => "address_city",
            StandardField::AddressProvince => "address_province",
            StandardField::AddressZip => "address_zip",
            StandardField::AddressCountry => "address_country",
            StandardField::OrderNumber => "order_number",
            StandardField::FinancialStatus => "financial_status",
            StandardField::FulfillmentStatus => "fulfillment_status",
            StandardField::Currency => "currency",
            StandardField::TotalPrice => "total_price",
            StandardField::SubtotalPrice => "subtotal_price",
            StandardField::TotalTax => "total_tax",
            StandardField::TotalDiscounts => "total_discounts",
            StandardField::TotalShipping => "total_shipping",
            StandardField::ProcessedAt => "processed_at",
            StandardField::Notes => "notes",
            StandardField::LineItemName => "line_item_name",
            StandardField::LineItemSku => "line_item_sku",
            StandardField::LineItemQuantity => "line_item_quantity",
            StandardField::LineItemPrice => "line_item_price",
            StandardField::ShippingLine1 => "shipping_line1",
            StandardField::ShippingLine2 => "shipping_line2",
            StandardField::ShippingCity => "shipping_city",
            StandardField::ShippingProvince => "shipping_province",
            StandardField::ShippingZip => "shipping_zip",
            StandardField::ShippingCountry => "shipping_country",
        }
    }

    /// Rótulo exibido no assistente (segue os cabeçalhos típicos de exportações de e-commerce).
    pub fn label(self) -> &'static str {
        match self {
            StandardField::Email => "Email",
            StandardField::FirstName => "First Name",
            StandardField::LastName => "Last Name",
            StandardField::FullName => "Name",
            StandardField::Phone => "Phone",
            StandardField::AddressLine1 => "Billing Address1",
            StandardField::AddressLine2 => "Billing Address2",
            StandardField::AddressCity => "Billing City",
            StandardField::AddressProvince => "Billing Province",
            StandardField::AddressZip => "Billing Zip",
            StandardField::AddressCountry => "Billing Country",
            StandardField::OrderNumber => "Order",
            StandardField::FinancialStatus => "Financial Status",
            StandardField::FulfillmentStatus => "Fulfillment Status",
            StandardField::Currency => "Currency",
            StandardField::TotalPrice => "Total",
            StandardField::SubtotalPrice => "Subtotal",
            StandardField::TotalTax => "Taxes",
            StandardField::TotalDiscounts => "Discount Amount",
            StandardField::TotalShipping => "Shipping",
            StandardField::ProcessedAt => "Created at",
            StandardField::Notes => "Notes",
            StandardField::LineItemName => "Lineitem name",
            StandardField::LineItemSku => "Lineitem sku",
            StandardField::LineItemQuantity => "Lineitem quantity",
            StandardField::LineItemPrice => "Lineitem price",
            StandardField::ShippingLine1 => "Shipping Address1",
            StandardField::ShippingLine2 => "Shipping Address2",
            StandardField::ShippingCity => "Shipping City",
            StandardField::ShippingProvince => "Shipping Province",
            StandardField::ShippingZip => "Shipping Zip",
            StandardField::ShippingCountry => "Shipping Country",
        }
    }

    pub fn address_part(self) -> Option<AddressPart> {
        match self {
            StandardField::AddressLine1 => Some(AddressPart::Line1),
            StandardField::AddressLine2 => Some(AddressPart::Line2),
            StandardField::AddressCity => Some(AddressPart::City),
            StandardField::AddressProvince => Some(AddressPart::Province),
            StandardField::AddressZip => Some(AddressPart::Zip),
            StandardField::AddressCountry => Some(AddressPart::Country),
            _ => None,
        }
    }

    pub fn shipping_part(self) -> Option<AddressPart> {
        match self {
            StandardField::ShippingLine1 => Some(AddressPart::Line1),
            StandardField::ShippingLine2 => Some(AddressPart::Line2),
            StandardField::ShippingCity => Some(AddressPart::City),
            StandardField::ShippingProvince => Some(AddressPart::Province),
            StandardField::ShippingZip => Some(AddressPart::Zip),
            StandardField::ShippingCountry => Some(AddressPart::Country),
            _ => None,
        }
    }
}

/// Definição de um campo de destino, como o assistente a exibe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetField {
    pub key: StandardField,
    #[schema(example = "Email")]
    pub label: String,
    pub required: bool,
}

impl TargetSchema {
    pub fn required_fields(self) -> &'static [StandardField] {
        match self {
            TargetSchema::Customers => &[StandardField::Email],
            // Pedidos sem e-mail ainda são importados (cliente nulo)
            TargetSchema::Orders => &[],
        }
    }

    /// Lista de campos do schema, na ordem usada pelo mapeador.
    pub fn fields(self) -> Vec<TargetField> {
        let required = self.required_fields();
        let keys: Vec<StandardField> = match self {
            TargetSchema::Customers => StandardField::CUSTOMER_FIELDS.to_vec(),
            TargetSchema::Orders => StandardField::ORDER_FIELDS
                .iter()
                .chain(StandardField::CUSTOMER_FIELDS.iter())
                .copied()
                .collect(),
        };

        keys.into_iter()
            .map(|key| TargetField {
                key,
                label: key.label().to_string(),
                required: required.contains(&key),
            })
            .collect()
    }
}
