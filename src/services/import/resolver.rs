// src/services/import/resolver.rs

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
    db::ImportStore,
    models::{crm::NewCustomer, schema::StandardField},
    services::import::{context::ImportContext, reader::Row, writer::BatchWriter},
};

/// Resultado da busca: quem já existe e quem precisa ser criado.
#[derive(Debug, Default)]
pub struct CustomerLookup {
    // e-mail normalizado -> id
    pub ids: HashMap<String, Uuid>,
    pub pending: Vec<NewCustomer>,
    pub existing_rows: Vec<usize>,
    pub missing_email_rows: Vec<usize>,
    pub failed_batches: usize,
}

#[derive(Debug, Default)]
pub struct CustomerResolution {
    pub ids: HashMap<String, Uuid>,
    pub created: usize,
    pub existing_rows: Vec<usize>,
    pub missing_email_rows: Vec<usize>,
}

fn split_full_name(full: &str) -> (Option<String>, Option<String>) {
    let mut parts = full.split_whitespace();
    let first = parts.next().map(str::to_string);
    let rest = parts.collect::<Vec<_>>().join(" ");
    (first, (!rest.is_empty()).then_some(rest))
}

/// Monta o rascunho a partir da primeira linha em que o e-mail aparece.
fn draft_customer(ctx: &ImportContext, row: &Row, email: String, row_indices: Vec<usize>) -> NewCustomer {
    let m = &ctx.mappings;
    let mut first_name = m.owned(row, StandardField::FirstName);
    let mut last_name = m.owned(row, StandardField::LastName);

    if first_name.is_none() && last_name.is_none() {
        if let Some(full) = m.value(row, StandardField::FullName) {
            (first_name, last_name) = split_full_name(full);
        }
    }

    NewCustomer {
        id: Uuid::new_v4(),
        email,
        first_name,
        last_name,
        phone: m.owned(row, StandardField::Phone),
        address: m.billing_address(row),
        metadata: m.extension_values(row),
        row_indices,
    }
}

/// Agrupa as linhas por e-mail e consulta o store em lotes.
/// Lote de busca que falha é tratado como "nenhum encontrado".
pub async fn lookup_customers(store: &dyn ImportStore, ctx: &ImportContext, rows: &[Row]) -> CustomerLookup {
    let mut lookup = CustomerLookup::default();
    let mut order: Vec<String> = Vec::new();
    let mut rows_by_email: HashMap<String, Vec<usize>> = HashMap::new();

    for (index, row) in rows.iter().enumerate() {
        match ctx.mappings.email(row) {
            Some(email) => rows_by_email
                .entry(email)
                .or_insert_with_key(|email| {
                    order.push(email.clone());
                    Vec::new()
                })
                .push(index),
            None => lookup.missing_email_rows.push(index),
        }
    }

    for (batch_index, batch) in order.chunks(ctx.lookup_batch_size).enumerate() {
        match store.find_customers_by_email(ctx.tenant_id, batch).await {
            Ok(found) => lookup.ids.extend(found),
            Err(e) => {
                lookup.failed_batches += 1;
                tracing::warn!(
                    batch = batch_index,
                    emails = batch.len(),
                    error = %e,
                    "Falha na busca de clientes; e-mails do lote serão tratados como novos"
                );
            }
        }
    }

    for email in order {
        let indices = rows_by_email.remove(&email).unwrap_or_default();
        if lookup.ids.contains_key(&email) {
            lookup.existing_rows.extend(indices);
        } else if let Some(&first) = indices.first() {
            lookup
                .pending
                .push(draft_customer(ctx, &rows[first], email, indices));
        }
    }

    tracing::debug!(
        found = lookup.ids.len(),
        pending = lookup.pending.len(),
        missing_email = lookup.missing_email_rows.len(),
        "Busca de clientes concluída"
    );
    lookup
}

/// Grava os rascunhos e devolve os ids dos que entraram.
pub async fn create_customers(
    store: &dyn ImportStore,
    ctx: &ImportContext,
    pending: &[NewCustomer],
    writer: &mut BatchWriter<'_, '_>,
) -> HashMap<String, Uuid> {
    writer
        .write("customers", pending, |chunk| store.insert_customers(ctx.tenant_id, chunk))
        .await
        .into_iter()
        .map(|customer| (customer.email.clone(), customer.id))
        .collect()
}

pub async fn resolve_customers(
    store: &dyn ImportStore,
    ctx: &ImportContext,
    rows: &[Row],
    writer: &mut BatchWriter<'_, '_>,
) -> CustomerResolution {
    let lookup = lookup_customers(store, ctx, rows).await;
    let created = create_customers(store, ctx, &lookup.pending, writer).await;

    let mut ids = lookup.ids;
    let created_count = created.len();
    ids.extend(created);

    CustomerResolution {
        ids,
        created: created_count,
        existing_rows: lookup.existing_rows,
        missing_email_rows: lookup.missing_email_rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ImportSettings,
        db::memory_store::InMemoryStore,
        models::import::{ColumnMapping, TargetSchema},
        services::import::{
            ledger::RunTally,
            writer::ProgressReporter,
        },
    };
    use chrono::Utc;

    fn context(tenant_id: Uuid, lookup_batch_size: usize) -> ImportContext {
        let settings = ImportSettings {
            lookup_batch_size,
            ..ImportSettings::default()
        };
        ImportContext::new(
            tenant_id,
            Uuid::new_v4(),
            TargetSchema::Customers,
            &[
                ColumnMapping::standard("Email", StandardField::Email),
                ColumnMapping::standard("Name", StandardField::FullName),
            ],
            Utc::now(),
            &settings,
        )
    }

    fn rows(data: &[(&str, &str)]) -> Vec<Row> {
        data.iter()
            .map(|(email, name)| {
                Row::from([
                    ("Email".to_string(), email.to_string()),
                    ("Name".to_string(), name.to_string()),
                ])
            })
            .collect()
    }

    #[test]
    fn splits_full_name_on_first_whitespace() {
        assert_eq!(
            split_full_name("Maria  da Silva"),
            (Some("Maria".into()), Some("da Silva".into()))
        );
        assert_eq!(split_full_name("Cher"), (Some("Cher".into()), None));
    }

    #[tokio::test]
    async fn groups_rows_by_normalized_email() {
        let tenant = Uuid::new_v4();
        let store = InMemoryStore::new();
        let existing = store.seed_customer(tenant, "bob@x.com").await;
        let ctx = context(tenant, 200);

        let data = rows(&[
            ("Alice@X.com", "Alice Doe"),
            ("", "Sem Email"),
            ("bob@x.com", "Bob"),
            ("alice@x.com ", "Alice"),
        ]);
        let lookup = lookup_customers(&store, &ctx, &data).await;

        assert_eq!(lookup.ids.get("bob@x.com"), Some(&existing));
        assert_eq!(lookup.existing_rows, vec![2]);
        assert_eq!(lookup.missing_email_rows, vec![1]);
        assert_eq!(lookup.pending.len(), 1);

        let alice = &lookup.pending[0];
        assert_eq!(alice.email, "alice@x.com");
        assert_eq!(alice.row_indices, vec![0, 3]);
        assert_eq!(alice.first_name.as_deref(), Some("Alice"));
        assert_eq!(alice.last_name.as_deref(), Some("Doe"));
    }

    #[tokio::test]
    async fn failed_lookup_batch_treats_emails_as_new() {
        let tenant = Uuid::new_v4();
        let store = InMemoryStore::new().with_failing_lookup_batches(&[0]);
        store.seed_customer(tenant, "a@x.com").await;
        store.seed_customer(tenant, "c@x.com").await;
        let ctx = context(tenant, 2);

        let data = rows(&[("a@x.com", "A"), ("b@x.com", "B"), ("c@x.com", "C")]);
        let lookup = lookup_customers(&store, &ctx, &data).await;

        assert_eq!(lookup.failed_batches, 1);
        // a e b estavam no lote que falhou; c foi encontrado no segundo
        let pending: Vec<&str> = lookup.pending.iter().map(|c| c.email.as_str()).collect();
        assert_eq!(pending, vec!["a@x.com", "b@x.com"]);
        assert_eq!(lookup.existing_rows, vec![2]);
    }

    #[tokio::test]
    async fn created_customers_are_returned_with_their_ids() {
        let tenant = Uuid::new_v4();
        let store = InMemoryStore::new();
        let ctx = context(tenant, 200);
        let data = rows(&[("a@x.com", "A"), ("b@x.com", "B")]);

        let progress = ProgressReporter::silent();
        let mut tally = RunTally::default();
        let resolution = {
            let mut writer = BatchWriter::new(1, &mut tally, &progress);
            resolve_customers(&store, &ctx, &data, &mut writer).await
        };

        assert_eq!(resolution.created, 2);
        assert_eq!(resolution.ids.len(), 2);
        assert_eq!(tally.imported, 2);
        assert_eq!(store.customers(tenant).await.len(), 2);
    }
}
