// src/services/import/ledger.rs

use std::collections::BTreeMap;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::ImportStore,
    models::import::{ActivityEntry, ImportRun, ImportStatus, RowError},
};

/// Contagens acumuladas de uma execução.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunTally {
    pub imported: usize,
    pub errored: usize,
    pub errors: Vec<RowError>,
}

impl RunTally {
    pub fn record_imported(&mut self, rows: &[usize]) {
        self.imported += rows.len();
    }

    pub fn record_failed(&mut self, rows: &[usize], message: &str) {
        self.errored += rows.len();
        self.errors.extend(rows.iter().map(|&row| RowError {
            row_index: Some(row),
            message: message.to_string(),
        }));
    }

    /// Registra uma ocorrência sem mexer nas contagens de linhas.
    pub fn note(&mut self, row_index: Option<usize>, message: String) {
        self.errors.push(RowError { row_index, message });
    }

    pub fn processed(&self) -> usize {
        self.imported + self.errored
    }
}

/// Ciclo de vida de uma ImportRun: criação, checkpoints e fechamento.
pub struct RunLedger<'s> {
    store: &'s dyn ImportStore,
    run: ImportRun,
}

impl<'s> RunLedger<'s> {
    pub async fn open(store: &'s dyn ImportStore, run: ImportRun) -> Result<Self, AppError> {
        store.create_run(&run).await?;
        tracing::info!(run_id = %run.id, file = %run.file_name, target = ?run.target_schema, "Importação registrada");
        Ok(Self { store, run })
    }

    pub fn set_total_rows(&mut self, total: usize) {
        self.run.total_rows = total as i64;
    }

    pub async fn advance(&mut self, status: ImportStatus) -> Result<(), AppError> {
        self.run.transition(status)?;
        self.persist().await;
        Ok(())
    }

    /// Grava o progresso parcial. Falha aqui não derruba a execução.
    pub async fn checkpoint(&mut self, tally: &RunTally) {
        self.run.imported_rows = tally.imported as i64;
        self.run.error_rows = tally.errored as i64;
        self.persist().await;
    }

    async fn persist(&self) {
        if let Err(e) = self.store.save_run(&self.run).await {
            tracing::warn!(run_id = %self.run.id, error = %e, "Não foi possível atualizar a importação");
        }
    }

    /// Fecha a execução: completed se alguma linha entrou, failed caso contrário.
    pub async fn finish(mut self, mut tally: RunTally) -> Result<ImportRun, AppError> {
        if self.run.total_rows == 0 {
            tally.note(None, "Arquivo sem linhas de dados".to_string());
        }

        self.run.imported_rows = tally.imported as i64;
        self.run.error_rows = tally.errored as i64;
        self.run.errors = tally.errors;

        let status = if tally.imported > 0 {
            ImportStatus::Completed
        } else {
            ImportStatus::Failed
        };
        self.run.transition(status)?;
        self.store.save_run(&self.run).await?;

        let entry = activity_for(&self.run);
        if let Err(e) = self.store.append_activity(&entry).await {
            tracing::warn!(run_id = %self.run.id, error = %e, "Falha ao registrar atividade da importação");
        }

        tracing::info!(
            run_id = %self.run.id,
            status = ?self.run.status,
            total = self.run.total_rows,
            imported = self.run.imported_rows,
            errors = self.run.error_rows,
            "✅ Importação finalizada"
        );

        Ok(self.run)
    }
}

fn activity_for(run: &ImportRun) -> ActivityEntry {
    // Quantas vezes cada mensagem de erro apareceu
    let mut error_tally: BTreeMap<&str, usize> = BTreeMap::new();
    for error in &run.errors {
        *error_tally.entry(error.message.as_str()).or_default() += 1;
    }

    let (kind, verb) = match run.status {
        ImportStatus::Completed => ("import.completed", "concluída"),
        _ => ("import.failed", "falhou"),
    };

    ActivityEntry {
        id: Uuid::new_v4(),
        tenant_id: run.tenant_id,
        kind: kind.to_string(),
        message: format!(
            "Importação de {} {}: {} de {} linhas importadas, {} com erro",
            run.file_name, verb, run.imported_rows, run.total_rows, run.error_rows
        ),
        metadata: json!({
            "runId": run.id,
            "fileName": run.file_name,
            "targetSchema": run.target_schema,
            "totalRows": run.total_rows,
            "importedRows": run.imported_rows,
            "errorRows": run.error_rows,
            "errorTally": error_tally,
        }),
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::import::TargetSchema;

    #[test]
    fn tally_counts_failed_rows_and_keeps_notes_separate() {
        let mut tally = RunTally::default();
        tally.record_imported(&[0, 1]);
        tally.record_failed(&[2, 3], "timeout");
        tally.note(None, "recalculo falhou".into());

        assert_eq!(tally.imported, 2);
        assert_eq!(tally.errored, 2);
        assert_eq!(tally.processed(), 4);
        assert_eq!(tally.errors.len(), 3);
        assert_eq!(tally.errors[0].row_index, Some(2));
    }

    #[test]
    fn activity_summarizes_error_messages() {
        let mut run = ImportRun::new(Uuid::new_v4(), "pedidos.csv", TargetSchema::Orders, vec![]);
        run.status = ImportStatus::Completed;
        run.total_rows = 3;
        run.imported_rows = 1;
        run.error_rows = 2;
        run.errors = vec![
            RowError { row_index: Some(1), message: "timeout".into() },
            RowError { row_index: Some(2), message: "timeout".into() },
        ];

        let entry = activity_for(&run);
        assert_eq!(entry.kind, "import.completed");
        assert_eq!(entry.metadata["errorTally"]["timeout"], 2);
        assert_eq!(entry.metadata["fileName"], "pedidos.csv");
        assert!(entry.message.contains("1 de 3"));
    }
}
