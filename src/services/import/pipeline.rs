// src/services/import/pipeline.rs

use std::collections::BTreeSet;

use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::ImportSettings,
    db::ImportStore,
    models::import::{ColumnMapping, ImportEvent, ImportRun, ImportStatus, TargetSchema},
    services::import::{
        aggregator::recompute_aggregates,
        context::ImportContext,
        grouper::group_orders,
        ledger::{RunLedger, RunTally},
        mapper::validate_mapping,
        reader::{Row, parse_delimited},
        resolver::{create_customers, lookup_customers, resolve_customers},
        writer::{BatchWriter, ProgressReporter},
    },
};

/// Tudo o que uma execução precisa: o arquivo e o mapeamento aprovado.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub tenant_id: Uuid,
    pub file_name: String,
    pub target: TargetSchema,
    pub content: String,
    pub mappings: Vec<ColumnMapping>,
}

/// Executa a importação de ponta a ponta.
///
/// Só devolve erro quando nada foi gravado ainda (mapeamento recusado,
/// execução não registrada) ou quando o fechamento não pôde ser salvo.
/// Falhas de lote viram erros de linha dentro da execução.
pub async fn run(
    store: &dyn ImportStore,
    settings: &ImportSettings,
    request: ImportRequest,
    events: Option<UnboundedSender<ImportEvent>>,
) -> Result<ImportRun, AppError> {
    validate_mapping(request.target, &request.mappings)?;
    let table = parse_delimited(&request.content);

    let run = ImportRun::new(request.tenant_id, &request.file_name, request.target, request.mappings);
    let ctx = ImportContext::new(
        run.tenant_id,
        run.id,
        run.target_schema,
        &run.mappings,
        run.started_at,
        settings,
    );

    let mut ledger = RunLedger::open(store, run).await?;
    ledger.advance(ImportStatus::Mapping).await?;
    ledger.set_total_rows(table.rows.len());
    ledger.advance(ImportStatus::Importing).await?;

    tracing::info!(
        run_id = %ctx.run_id,
        rows = table.rows.len(),
        columns = table.headers.len(),
        chunk_size = ctx.chunk_size,
        "Iniciando importação"
    );

    let progress = ProgressReporter::new(events, table.rows.len());
    let mut tally = RunTally::default();

    match ctx.target {
        TargetSchema::Customers => {
            import_customers(store, &ctx, &table.rows, &mut ledger, &mut tally, &progress).await
        }
        TargetSchema::Orders => {
            import_orders(store, &ctx, &table.rows, &mut ledger, &mut tally, &progress).await
        }
    }

    // Quem acompanha sempre recebe ao menos um evento de progresso
    if progress.emitted() == 0 {
        progress.report(&tally);
    }

    ledger.finish(tally).await
}

async fn import_customers(
    store: &dyn ImportStore,
    ctx: &ImportContext,
    rows: &[Row],
    ledger: &mut RunLedger<'_>,
    tally: &mut RunTally,
    progress: &ProgressReporter,
) {
    let lookup = lookup_customers(store, ctx, rows).await;
    tally.record_failed(&lookup.missing_email_rows, "Linha sem e-mail");
    // Clientes existentes contam como importados e não são alterados
    tally.record_imported(&lookup.existing_rows);

    let mut writer = BatchWriter::new(ctx.chunk_size, tally, progress).with_ledger(ledger);
    let created = create_customers(store, ctx, &lookup.pending, &mut writer).await;

    tracing::info!(
        created = created.len(),
        existing = lookup.existing_rows.len(),
        without_email = lookup.missing_email_rows.len(),
        "Clientes processados"
    );
}

async fn import_orders(
    store: &dyn ImportStore,
    ctx: &ImportContext,
    rows: &[Row],
    ledger: &mut RunLedger<'_>,
    tally: &mut RunTally,
    progress: &ProgressReporter,
) {
    // Criação de clientes aqui é efeito colateral: não conta linhas nem emite progresso
    let mut customer_tally = RunTally::default();
    let silent = ProgressReporter::silent();
    let resolution = {
        let mut writer = BatchWriter::new(ctx.chunk_size, &mut customer_tally, &silent);
        resolve_customers(store, ctx, rows, &mut writer).await
    };
    for error in customer_tally.errors {
        tally.note(error.row_index, format!("Cliente não criado: {}", error.message));
    }

    let drafts = group_orders(ctx, rows, &resolution.ids);
    tracing::info!(
        orders = drafts.len(),
        rows = rows.len(),
        customers_created = resolution.created,
        "Linhas agrupadas em pedidos"
    );

    let written = {
        let mut writer = BatchWriter::new(ctx.chunk_size, tally, progress).with_ledger(ledger);
        writer
            .write("orders", &drafts, |chunk| {
                store.insert_orders(ctx.tenant_id, ctx.run_id, chunk)
            })
            .await
    };

    let touched: BTreeSet<Uuid> = written.iter().filter_map(|order| order.customer_id).collect();
    let report = recompute_aggregates(store, ctx.tenant_id, &touched).await;
    for (customer_id, message) in report.failed {
        tally.note(None, format!("Falha ao recalcular o cliente {customer_id}: {message}"));
    }
}
