// src/db/store.rs

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        crm::{CustomerAggregates, NewCustomer, OrderFact},
        import::{ActivityEntry, ImportRun},
        operations::NewOrder,
    },
};

/// Porta de I/O do pipeline de importação.
/// Cada chamada é aguardada até o fim antes do próximo estágio.
#[async_trait]
pub trait ImportStore: Send + Sync {
    // --- Clientes ---

    /// Busca por e-mail (já normalizado). Retorna apenas os encontrados.
    async fn find_customers_by_email(
        &self,
        tenant_id: Uuid,
        emails: &[String],
    ) -> Result<HashMap<String, Uuid>, AppError>;

    /// Insere o lote inteiro ou nada.
    async fn insert_customers(&self, tenant_id: Uuid, customers: &[NewCustomer]) -> Result<(), AppError>;

    async fn update_customer_aggregates(
        &self,
        tenant_id: Uuid,
        customer_id: Uuid,
        aggregates: &CustomerAggregates,
    ) -> Result<(), AppError>;

    // --- Pedidos ---

    /// Insere o lote inteiro ou nada.
    async fn insert_orders(&self, tenant_id: Uuid, run_id: Uuid, orders: &[NewOrder]) -> Result<(), AppError>;

    /// Histórico completo do cliente, em ordem crescente de processed_at.
    async fn order_history(&self, tenant_id: Uuid, customer_id: Uuid) -> Result<Vec<OrderFact>, AppError>;

    // --- Ledger ---

    async fn create_run(&self, run: &ImportRun) -> Result<(), AppError>;

    /// Atualiza status/contagens. Execuções terminais não são alteradas.
    async fn save_run(&self, run: &ImportRun) -> Result<(), AppError>;

    async fn get_run(&self, tenant_id: Uuid, run_id: Uuid) -> Result<Option<ImportRun>, AppError>;

    async fn list_runs(&self, tenant_id: Uuid) -> Result<Vec<ImportRun>, AppError>;

    async fn append_activity(&self, entry: &ActivityEntry) -> Result<(), AppError>;

    async fn list_activity(&self, tenant_id: Uuid, limit: i64) -> Result<Vec<ActivityEntry>, AppError>;
}
