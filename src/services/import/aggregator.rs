// src/services/import/aggregator.rs

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    db::ImportStore,
    models::crm::{CustomerAggregates, OrderFact},
    services::import::coerce::checked_sum,
};

/// Agregados sempre recalculados do histórico completo, nunca somados.
pub fn aggregates_from_history(history: &[OrderFact]) -> CustomerAggregates {
    let orders_count = history.len() as i64;
    let total_spent = checked_sum(history.iter().map(|o| o.total_price)).round_dp(2);
    let avg_order_value = if orders_count > 0 {
        (total_spent / Decimal::from(orders_count)).round_dp(2)
    } else {
        Decimal::ZERO
    };

    CustomerAggregates {
        orders_count,
        total_spent,
        avg_order_value,
        first_order_at: history.iter().map(|o| o.processed_at).min(),
        last_order_at: history.iter().map(|o| o.processed_at).max(),
    }
}

#[derive(Debug, Default)]
pub struct AggregateReport {
    pub updated: usize,
    pub failed: Vec<(Uuid, String)>,
}

/// Recalcula cada cliente tocado pela execução, um por vez.
/// Falha em um cliente não interrompe os demais.
pub async fn recompute_aggregates(
    store: &dyn ImportStore,
    tenant_id: Uuid,
    customer_ids: &BTreeSet<Uuid>,
) -> AggregateReport {
    let mut report = AggregateReport::default();

    for &customer_id in customer_ids {
        let outcome = async {
            let history = store.order_history(tenant_id, customer_id).await?;
            let aggregates = aggregates_from_history(&history);
            store
                .update_customer_aggregates(tenant_id, customer_id, &aggregates)
                .await
        }
        .await;

        match outcome {
            Ok(()) => report.updated += 1,
            Err(e) => {
                tracing::warn!(%customer_id, error = %e, "Falha ao recalcular agregados do cliente");
                report.failed.push((customer_id, e.to_string()));
            }
        }
    }

    tracing::info!(updated = report.updated, failed = report.failed.len(), "Agregados de clientes recalculados");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn fact(total: &str, day: u32) -> OrderFact {
        OrderFact {
            total_price: total.parse().unwrap(),
            processed_at: Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn empty_history_yields_zeroes() {
        let aggregates = aggregates_from_history(&[]);
        assert_eq!(aggregates, CustomerAggregates::default());
    }

    #[test]
    fn averages_are_rounded_to_cents() {
        let history = [fact("10.00", 1), fact("10.00", 5), fact("10.01", 3)];
        let aggregates = aggregates_from_history(&history);

        assert_eq!(aggregates.orders_count, 3);
        assert_eq!(aggregates.total_spent, "30.01".parse::<Decimal>().unwrap());
        assert_eq!(aggregates.avg_order_value, "10.00".parse::<Decimal>().unwrap());
        assert_eq!(aggregates.first_order_at, Some(history[0].processed_at));
        assert_eq!(aggregates.last_order_at, Some(history[1].processed_at));
    }
}
