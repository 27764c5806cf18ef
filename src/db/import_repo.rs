// src/db/import_repo.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{types::Json, FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ImportStore,
    models::{
        crm::{CustomerAggregates, NewCustomer, OrderFact},
        import::{ActivityEntry, ColumnMapping, ImportRun, ImportStatus, RowError, TargetSchema},
        operations::NewOrder,
    },
};

// Linha crua de import_runs: mapeamentos e erros vivem em JSONB
#[derive(Debug, FromRow)]
struct ImportRunRow {
    id: Uuid,
    tenant_id: Uuid,
    file_name: String,
    target_schema: TargetSchema,
    status: ImportStatus,
    total_rows: i64,
    imported_rows: i64,
    error_rows: i64,
    mappings: Json<Vec<ColumnMapping>>,
    errors: Json<Vec<RowError>>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl From<ImportRunRow> for ImportRun {
    fn from(row: ImportRunRow) -> Self {
        Self {
            id: row.id,
            tenant_id: row.tenant_id,
            file_name: row.file_name,
            target_schema: row.target_schema,
            status: row.status,
            total_rows: row.total_rows,
            imported_rows: row.imported_rows,
            error_rows: row.error_rows,
            mappings: row.mappings.0,
            errors: row.errors.0,
            started_at: row.started_at,
            completed_at: row.completed_at,
        }
    }
}

const RUN_COLUMNS: &str = "id, tenant_id, file_name, target_schema, status, total_rows, imported_rows, \
     error_rows, mappings, errors, started_at, completed_at";

#[derive(Clone)]
pub struct PgImportStore {
    pool: PgPool,
}

impl PgImportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ImportStore for PgImportStore {
    // =========================================================================
    //  CLIENTES
    // =========================================================================

    async fn find_customers_by_email(
        &self,
        tenant_id: Uuid,
        emails: &[String],
    ) -> Result<HashMap<String, Uuid>, AppError> {
        // Sem UNIQUE no e-mail: se houver duplicata, o mais antigo vence
        let found: Vec<(String, Uuid)> = sqlx::query_as(
            r#"
            SELECT email, id
            FROM customers
            WHERE tenant_id = $1 AND email = ANY($2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(emails)
        .fetch_all(&self.pool)
        .await?;

        Ok(found.into_iter().collect())
    }

    async fn insert_customers(&self, tenant_id: Uuid, customers: &[NewCustomer]) -> Result<(), AppError> {
        if customers.is_empty() {
            return Ok(());
        }

        let addresses = customers
            .iter()
            .map(|c| c.address.as_ref().map(serde_json::to_value).transpose())
            .collect::<Result<Vec<Option<Value>>, _>>()?;

        let mut tx = self.pool.begin().await?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO customers (id, tenant_id, email, first_name, last_name, phone, address, metadata) ",
        );
        builder.push_values(customers.iter().zip(addresses), |mut b, (customer, address)| {
            b.push_bind(customer.id)
                .push_bind(tenant_id)
                .push_bind(customer.email.clone())
                .push_bind(customer.first_name.clone())
                .push_bind(customer.last_name.clone())
                .push_bind(customer.phone.clone())
                .push_bind(address)
                .push_bind(customer.metadata.clone());
        });
        builder.build().execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn update_customer_aggregates(
        &self,
        tenant_id: Uuid,
        customer_id: Uuid,
        aggregates: &CustomerAggregates,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE customers
            SET orders_count = $3,
                total_spent = $4,
                avg_order_value = $5,
                first_order_at = $6,
                last_order_at = $7,
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(customer_id)
        .bind(aggregates.orders_count)
        .bind(aggregates.total_spent)
        .bind(aggregates.avg_order_value)
        .bind(aggregates.first_order_at)
        .bind(aggregates.last_order_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // =========================================================================
    //  PEDIDOS
    // =========================================================================

    async fn insert_orders(&self, tenant_id: Uuid, run_id: Uuid, orders: &[NewOrder]) -> Result<(), AppError> {
        if orders.is_empty() {
            return Ok(());
        }

        let shipping = orders
            .iter()
            .map(|o| o.shipping_address.as_ref().map(serde_json::to_value).transpose())
            .collect::<Result<Vec<Option<Value>>, _>>()?;

        let mut tx = self.pool.begin().await?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            r#"INSERT INTO orders (
                id, tenant_id, import_run_id, order_number, customer_id, email,
                financial_status, fulfillment_status,
                subtotal_price, total_tax, total_discounts, total_shipping, total_price,
                currency, line_items, shipping_address, processed_at, notes, metadata
            ) "#,
        );
        builder.push_values(orders.iter().zip(shipping), |mut b, (order, shipping_address)| {
            b.push_bind(order.id)
                .push_bind(tenant_id)
                .push_bind(run_id)
                .push_bind(order.order_number.clone())
                .push_bind(order.customer_id)
                .push_bind(order.email.clone())
                .push_bind(order.financial_status.clone())
                .push_bind(order.fulfillment_status.clone())
                .push_bind(order.subtotal_price)
                .push_bind(order.total_tax)
                .push_bind(order.total_discounts)
                .push_bind(order.total_shipping)
                .push_bind(order.total_price)
                .push_bind(order.currency.clone())
                .push_bind(Json(order.line_items.clone()))
                .push_bind(shipping_address)
                .push_bind(order.processed_at)
                .push_bind(order.notes.clone())
                .push_bind(order.metadata.clone());
        });
        builder.build().execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn order_history(&self, tenant_id: Uuid, customer_id: Uuid) -> Result<Vec<OrderFact>, AppError> {
        let history = sqlx::query_as::<_, OrderFact>(
            r#"
            SELECT total_price, processed_at
            FROM orders
            WHERE tenant_id = $1 AND customer_id = $2
            ORDER BY processed_at ASC
            "#,
        )
        .bind(tenant_id)
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(history)
    }

    // =========================================================================
    //  LEDGER
    // =========================================================================

    async fn create_run(&self, run: &ImportRun) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO import_runs (
                id, tenant_id, file_name, target_schema, status,
                total_rows, imported_rows, error_rows, mappings, errors, started_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(run.id)
        .bind(run.tenant_id)
        .bind(&run.file_name)
        .bind(run.target_schema)
        .bind(run.status)
        .bind(run.total_rows)
        .bind(run.imported_rows)
        .bind(run.error_rows)
        .bind(Json(&run.mappings))
        .bind(Json(&run.errors))
        .bind(run.started_at)
        .bind(run.completed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_run(&self, run: &ImportRun) -> Result<(), AppError> {
        // O filtro de status impede reescrever uma execução já encerrada
        sqlx::query(
            r#"
            UPDATE import_runs
            SET status = $3,
                total_rows = $4,
                imported_rows = $5,
                error_rows = $6,
                errors = $7,
                completed_at = $8
            WHERE tenant_id = $1 AND id = $2
              AND status NOT IN ('COMPLETED', 'FAILED')
            "#,
        )
        .bind(run.tenant_id)
        .bind(run.id)
        .bind(run.status)
        .bind(run.total_rows)
        .bind(run.imported_rows)
        .bind(run.error_rows)
        .bind(Json(&run.errors))
        .bind(run.completed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_run(&self, tenant_id: Uuid, run_id: Uuid) -> Result<Option<ImportRun>, AppError> {
        let row = sqlx::query_as::<_, ImportRunRow>(&format!(
            "SELECT {RUN_COLUMNS} FROM import_runs WHERE tenant_id = $1 AND id = $2"
        ))
        .bind(tenant_id)
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ImportRun::from))
    }

    async fn list_runs(&self, tenant_id: Uuid) -> Result<Vec<ImportRun>, AppError> {
        let rows = sqlx::query_as::<_, ImportRunRow>(&format!(
            "SELECT {RUN_COLUMNS} FROM import_runs WHERE tenant_id = $1 ORDER BY started_at DESC LIMIT 100"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ImportRun::from).collect())
    }

    async fn append_activity(&self, entry: &ActivityEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO activity_log (id, tenant_id, kind, message, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id)
        .bind(entry.tenant_id)
        .bind(&entry.kind)
        .bind(&entry.message)
        .bind(&entry.metadata)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_activity(&self, tenant_id: Uuid, limit: i64) -> Result<Vec<ActivityEntry>, AppError> {
        let entries = sqlx::query_as::<_, ActivityEntry>(
            r#"
            SELECT id, tenant_id, kind, message, metadata, created_at
            FROM activity_log
            WHERE tenant_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(tenant_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
