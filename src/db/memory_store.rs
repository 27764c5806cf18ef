// src/db/memory_store.rs

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::types::Json;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ImportStore,
    models::{
        crm::{Customer, CustomerAggregates, NewCustomer, OrderFact},
        import::{ActivityEntry, ImportRun},
        operations::{NewOrder, Order},
    },
};

#[derive(Default)]
struct Tables {
    customers: Vec<Customer>,
    orders: Vec<Order>,
    runs: Vec<ImportRun>,
    activity: Vec<ActivityEntry>,
}

// Falhas simuladas, indexadas pela ordem da chamada (0, 1, 2...)
#[derive(Default)]
struct Faults {
    lookup_batches: HashSet<usize>,
    customer_chunks: HashSet<usize>,
    order_chunks: HashSet<usize>,
    panicking_order_chunks: HashSet<usize>,
    aggregate_updates: bool,
}

/// Store em memória: modo `IMPORT_STORE=memory` e testes.
/// Cada inserção de lote é tudo-ou-nada, como uma transação.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
    faults: Faults,
    lookup_calls: AtomicUsize,
    customer_calls: AtomicUsize,
    order_calls: AtomicUsize,
}

fn simulated(what: &str, call: usize) -> AppError {
    AppError::InternalServerError(anyhow::anyhow!("falha simulada em {what} (chamada {call})"))
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Injeção de falhas ---

    pub fn with_failing_lookup_batches(mut self, calls: &[usize]) -> Self {
        self.faults.lookup_batches.extend(calls);
        self
    }

    pub fn with_failing_customer_chunks(mut self, calls: &[usize]) -> Self {
        self.faults.customer_chunks.extend(calls);
        self
    }

    pub fn with_failing_order_chunks(mut self, calls: &[usize]) -> Self {
        self.faults.order_chunks.extend(calls);
        self
    }

    pub fn with_panicking_order_chunks(mut self, calls: &[usize]) -> Self {
        self.faults.panicking_order_chunks.extend(calls);
        self
    }

    pub fn with_failing_aggregate_updates(mut self) -> Self {
        self.faults.aggregate_updates = true;
        self
    }

    // --- Consultas auxiliares ---

    pub async fn seed_customer(&self, tenant_id: Uuid, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.tables.lock().await.customers.push(Customer {
            id,
            tenant_id,
            email: email.trim().to_lowercase(),
            first_name: None,
            last_name: None,
            phone: None,
            address: None,
            metadata: json!({}),
            orders_count: 0,
            total_spent: Decimal::ZERO,
            avg_order_value: Decimal::ZERO,
            first_order_at: None,
            last_order_at: None,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub async fn customers(&self, tenant_id: Uuid) -> Vec<Customer> {
        let tables = self.tables.lock().await;
        tables
            .customers
            .iter()
            .filter(|c| c.tenant_id == tenant_id)
            .cloned()
            .collect()
    }

    pub async fn customer_by_email(&self, tenant_id: Uuid, email: &str) -> Option<Customer> {
        let email = email.trim().to_lowercase();
        self.customers(tenant_id).await.into_iter().find(|c| c.email == email)
    }

    pub async fn orders(&self, tenant_id: Uuid) -> Vec<Order> {
        let tables = self.tables.lock().await;
        tables
            .orders
            .iter()
            .filter(|o| o.tenant_id == tenant_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ImportStore for InMemoryStore {
    async fn find_customers_by_email(
        &self,
        tenant_id: Uuid,
        emails: &[String],
    ) -> Result<HashMap<String, Uuid>, AppError> {
        let call = self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        if self.faults.lookup_batches.contains(&call) {
            return Err(simulated("busca de clientes", call));
        }

        let wanted: HashSet<&str> = emails.iter().map(String::as_str).collect();
        let tables = self.tables.lock().await;
        let mut found = HashMap::new();
        for customer in tables.customers.iter().filter(|c| c.tenant_id == tenant_id) {
            if wanted.contains(customer.email.as_str()) {
                found.entry(customer.email.clone()).or_insert(customer.id);
            }
        }
        Ok(found)
    }

    async fn insert_customers(&self, tenant_id: Uuid, customers: &[NewCustomer]) -> Result<(), AppError> {
        let call = self.customer_calls.fetch_add(1, Ordering::SeqCst);
        if self.faults.customer_chunks.contains(&call) {
            return Err(simulated("lote de clientes", call));
        }

        // Monta o lote inteiro antes de tocar nas tabelas
        let now = Utc::now();
        let mut rows = Vec::with_capacity(customers.len());
        for draft in customers {
            rows.push(Customer {
                id: draft.id,
                tenant_id,
                email: draft.email.clone(),
                first_name: draft.first_name.clone(),
                last_name: draft.last_name.clone(),
                phone: draft.phone.clone(),
                address: draft.address.as_ref().map(serde_json::to_value).transpose()?,
                metadata: draft.metadata.clone(),
                orders_count: 0,
                total_spent: Decimal::ZERO,
                avg_order_value: Decimal::ZERO,
                first_order_at: None,
                last_order_at: None,
                created_at: now,
                updated_at: now,
            });
        }

        self.tables.lock().await.customers.extend(rows);
        Ok(())
    }

    async fn update_customer_aggregates(
        &self,
        tenant_id: Uuid,
        customer_id: Uuid,
        aggregates: &CustomerAggregates,
    ) -> Result<(), AppError> {
        if self.faults.aggregate_updates {
            return Err(simulated("recálculo de agregados", 0));
        }

        let mut tables = self.tables.lock().await;
        if let Some(customer) = tables
            .customers
            .iter_mut()
            .find(|c| c.tenant_id == tenant_id && c.id == customer_id)
        {
            customer.orders_count = aggregates.orders_count;
            customer.total_spent = aggregates.total_spent;
            customer.avg_order_value = aggregates.avg_order_value;
            customer.first_order_at = aggregates.first_order_at;
            customer.last_order_at = aggregates.last_order_at;
            customer.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn insert_orders(&self, tenant_id: Uuid, run_id: Uuid, orders: &[NewOrder]) -> Result<(), AppError> {
        let call = self.order_calls.fetch_add(1, Ordering::SeqCst);
        if self.faults.panicking_order_chunks.contains(&call) {
            panic!("pânico simulado no lote de pedidos {call}");
        }
        if self.faults.order_chunks.contains(&call) {
            return Err(simulated("lote de pedidos", call));
        }

        let now = Utc::now();
        let mut rows = Vec::with_capacity(orders.len());
        for draft in orders {
            rows.push(Order {
                id: draft.id,
                tenant_id,
                import_run_id: Some(run_id),
                order_number: draft.order_number.clone(),
                customer_id: draft.customer_id,
                email: draft.email.clone(),
                financial_status: draft.financial_status.clone(),
                fulfillment_status: draft.fulfillment_status.clone(),
                subtotal_price: draft.subtotal_price,
                total_tax: draft.total_tax,
                total_discounts: draft.total_discounts,
                total_shipping: draft.total_shipping,
                total_price: draft.total_price,
                currency: draft.currency.clone(),
                line_items: Json(draft.line_items.clone()),
                shipping_address: draft.shipping_address.as_ref().map(serde_json::to_value).transpose()?,
                processed_at: draft.processed_at,
                notes: draft.notes.clone(),
                metadata: draft.metadata.clone(),
                created_at: now,
            });
        }

        self.tables.lock().await.orders.extend(rows);
        Ok(())
    }

    async fn order_history(&self, tenant_id: Uuid, customer_id: Uuid) -> Result<Vec<OrderFact>, AppError> {
        let tables = self.tables.lock().await;
        let mut history: Vec<OrderFact> = tables
            .orders
            .iter()
            .filter(|o| o.tenant_id == tenant_id && o.customer_id == Some(customer_id))
            .map(|o| OrderFact {
                total_price: o.total_price,
                processed_at: o.processed_at,
            })
            .collect();
        history.sort_by_key(|fact| fact.processed_at);
        Ok(history)
    }

    async fn create_run(&self, run: &ImportRun) -> Result<(), AppError> {
        self.tables.lock().await.runs.push(run.clone());
        Ok(())
    }

    async fn save_run(&self, run: &ImportRun) -> Result<(), AppError> {
        let mut tables = self.tables.lock().await;
        if let Some(stored) = tables
            .runs
            .iter_mut()
            .find(|r| r.tenant_id == run.tenant_id && r.id == run.id)
        {
            if !stored.status.is_terminal() {
                *stored = run.clone();
            }
        }
        Ok(())
    }

    async fn get_run(&self, tenant_id: Uuid, run_id: Uuid) -> Result<Option<ImportRun>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .runs
            .iter()
            .find(|r| r.tenant_id == tenant_id && r.id == run_id)
            .cloned())
    }

    async fn list_runs(&self, tenant_id: Uuid) -> Result<Vec<ImportRun>, AppError> {
        let tables = self.tables.lock().await;
        let mut runs: Vec<ImportRun> = tables
            .runs
            .iter()
            .filter(|r| r.tenant_id == tenant_id)
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(runs)
    }

    async fn append_activity(&self, entry: &ActivityEntry) -> Result<(), AppError> {
        self.tables.lock().await.activity.push(entry.clone());
        Ok(())
    }

    async fn list_activity(&self, tenant_id: Uuid, limit: i64) -> Result<Vec<ActivityEntry>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .activity
            .iter()
            .rev()
            .filter(|e| e.tenant_id == tenant_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
