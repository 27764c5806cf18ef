// src/services/import/grouper.rs

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    models::{
        operations::{LineItem, NewOrder},
        schema::StandardField,
    },
    services::import::{
        coerce::{checked_sum, parse_datetime, parse_number, parse_quantity},
        context::{ImportContext, MappingIndex},
        reader::Row,
    },
};

/// Chave para linhas sem número de pedido: cada uma vira um pedido sozinho.
fn synthetic_key(ctx: &ImportContext, row_index: usize) -> String {
    let run = ctx.run_id.simple().to_string();
    format!("IMP-{}-{}", &run[..8], row_index + 1)
}

fn money(m: &MappingIndex, row: &Row, field: StandardField) -> Decimal {
    m.value(row, field).map(parse_number).unwrap_or(Decimal::ZERO)
}

fn line_item(m: &MappingIndex, row: &Row, position: usize) -> LineItem {
    let sku = m.owned(row, StandardField::LineItemSku);
    let name = m
        .owned(row, StandardField::LineItemName)
        .or_else(|| sku.clone())
        .unwrap_or_else(|| format!("Item {}", position + 1));

    let quantity = if m.has(StandardField::LineItemQuantity) {
        parse_quantity(m.value(row, StandardField::LineItemQuantity).unwrap_or_default())
    } else {
        1
    };

    LineItem {
        name,
        sku,
        quantity,
        price: money(m, row, StandardField::LineItemPrice),
    }
}

fn build_order(
    ctx: &ImportContext,
    rows: &[Row],
    order_number: String,
    row_indices: Vec<usize>,
    customer_ids: &HashMap<String, Uuid>,
) -> NewOrder {
    let m = &ctx.mappings;
    // Campos do pedido vêm sempre da primeira linha do grupo
    let first = &rows[row_indices[0]];

    let mut line_items: Vec<LineItem> = if m.has_any(&StandardField::LINE_ITEM_FIELDS) {
        row_indices
            .iter()
            .enumerate()
            .map(|(position, &index)| line_item(m, &rows[index], position))
            .collect()
    } else {
        Vec::new()
    };
    let items_total = checked_sum(line_items.iter().map(LineItem::line_total));

    let total_price = if m.has(StandardField::TotalPrice) {
        money(m, first, StandardField::TotalPrice)
    } else {
        items_total
    };
    let subtotal_price = if m.has(StandardField::SubtotalPrice) {
        money(m, first, StandardField::SubtotalPrice)
    } else if line_items.is_empty() {
        total_price
    } else {
        items_total
    };

    if line_items.is_empty() {
        line_items.push(LineItem {
            name: format!("Pedido {order_number}"),
            sku: None,
            quantity: 1,
            price: total_price,
        });
    }

    let email = m.email(first);
    let customer_id = email.as_ref().and_then(|e| customer_ids.get(e)).copied();

    let mut metadata = m.extension_values(first);
    if let Value::Object(bag) = &mut metadata {
        bag.insert(
            "_import".to_string(),
            json!({ "runId": ctx.run_id, "rows": row_indices }),
        );
    }

    NewOrder {
        id: Uuid::new_v4(),
        order_number,
        customer_id,
        email,
        financial_status: m.owned(first, StandardField::FinancialStatus),
        fulfillment_status: m.owned(first, StandardField::FulfillmentStatus),
        subtotal_price,
        total_tax: money(m, first, StandardField::TotalTax),
        total_discounts: money(m, first, StandardField::TotalDiscounts),
        total_shipping: money(m, first, StandardField::TotalShipping),
        total_price,
        currency: m.owned(first, StandardField::Currency),
        line_items,
        shipping_address: m.shipping_address(first),
        processed_at: m
            .value(first, StandardField::ProcessedAt)
            .and_then(parse_datetime)
            .unwrap_or(ctx.started_at),
        notes: m.owned(first, StandardField::Notes),
        metadata,
        row_indices,
    }
}

/// Agrupa linhas consecutivas ou não pelo número do pedido,
/// preservando a ordem de primeira aparição.
pub fn group_orders(ctx: &ImportContext, rows: &[Row], customer_ids: &HashMap<String, Uuid>) -> Vec<NewOrder> {
    let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
    let mut by_key: HashMap<&str, usize> = HashMap::new();

    for (index, row) in rows.iter().enumerate() {
        match ctx.mappings.value(row, StandardField::OrderNumber) {
            Some(key) => match by_key.get(key) {
                Some(&group) => groups[group].1.push(index),
                None => {
                    by_key.insert(key, groups.len());
                    groups.push((key.to_string(), vec![index]));
                }
            },
            None => groups.push((synthetic_key(ctx, index), vec![index])),
        }
    }

    groups
        .into_iter()
        .map(|(key, indices)| build_order(ctx, rows, key, indices, customer_ids))
        .collect()
}
