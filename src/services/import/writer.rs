// src/services/import/writer.rs

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use tokio::sync::mpsc::UnboundedSender;

use crate::{
    common::error::AppError,
    models::{
        crm::NewCustomer,
        import::{ImportEvent, ImportProgress},
        operations::NewOrder,
    },
    services::import::ledger::{RunLedger, RunTally},
};

/// Rascunhos que sabem de quais linhas do arquivo vieram.
pub trait RowSpan {
    fn row_indices(&self) -> &[usize];
}

impl RowSpan for NewCustomer {
    fn row_indices(&self) -> &[usize] {
        &self.row_indices
    }
}

impl RowSpan for NewOrder {
    fn row_indices(&self) -> &[usize] {
        &self.row_indices
    }
}

/// Emite `{rowsDone, rowsTotal, errorsSoFar}` para quem chamou.
/// Se o receptor sumiu, a importação segue normalmente.
pub struct ProgressReporter {
    events: Option<UnboundedSender<ImportEvent>>,
    rows_total: usize,
    emitted: AtomicUsize,
}

impl ProgressReporter {
    pub fn new(events: Option<UnboundedSender<ImportEvent>>, rows_total: usize) -> Self {
        Self {
            events,
            rows_total,
            emitted: AtomicUsize::new(0),
        }
    }

    pub fn silent() -> Self {
        Self::new(None, 0)
    }

    pub fn emitted(&self) -> usize {
        self.emitted.load(Ordering::Relaxed)
    }

    pub fn report(&self, tally: &RunTally) -> ImportProgress {
        let progress = ImportProgress {
            rows_done: tally.processed(),
            rows_total: self.rows_total,
            errors_so_far: tally.errored,
        };

        if let Some(events) = &self.events {
            self.emitted.fetch_add(1, Ordering::Relaxed);
            if events.send(ImportEvent::Progress(progress)).is_err() {
                tracing::debug!("Receptor de progresso descartado");
            }
        }
        progress
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "pânico sem mensagem".to_string()
    }
}

/// Grava rascunhos em lotes de tamanho fixo, um lote por vez.
/// Um lote entra inteiro ou todas as suas linhas viram erro com a mensagem do backend.
pub struct BatchWriter<'w, 's> {
    chunk_size: usize,
    tally: &'w mut RunTally,
    progress: &'w ProgressReporter,
    ledger: Option<&'w mut RunLedger<'s>>,
}

impl<'w, 's> BatchWriter<'w, 's> {
    pub fn new(chunk_size: usize, tally: &'w mut RunTally, progress: &'w ProgressReporter) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            tally,
            progress,
            ledger: None,
        }
    }

    /// Persiste as contagens da execução depois de cada lote.
    pub fn with_ledger(mut self, ledger: &'w mut RunLedger<'s>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Retorna os itens que foram gravados, na ordem original.
    pub async fn write<'c, T, F, Fut>(&mut self, label: &str, items: &'c [T], mut insert: F) -> Vec<&'c T>
    where
        T: RowSpan,
        F: FnMut(&'c [T]) -> Fut,
        Fut: Future<Output = Result<(), AppError>>,
    {
        let mut written = Vec::with_capacity(items.len());

        for (index, chunk) in items.chunks(self.chunk_size).enumerate() {
            let rows: Vec<usize> = chunk
                .iter()
                .flat_map(|item| item.row_indices().iter().copied())
                .collect();

            // Pânico dentro do lote também vira erro do lote
            match AssertUnwindSafe(insert(chunk)).catch_unwind().await {
                Ok(Ok(())) => {
                    self.tally.record_imported(&rows);
                    written.extend(chunk.iter());
                    tracing::debug!(label, chunk = index, records = chunk.len(), rows = rows.len(), "Lote gravado");
                }
                Ok(Err(e)) => {
                    tracing::warn!(label, chunk = index, rows = rows.len(), error = %e, "Lote rejeitado");
                    self.tally.record_failed(&rows, &e.to_string());
                }
                Err(payload) => {
                    let message = panic_message(&*payload);
                    tracing::error!(label, chunk = index, rows = rows.len(), panic = %message, "Falha inesperada ao gravar lote");
                    self.tally
                        .record_failed(&rows, &format!("Falha inesperada ao gravar lote: {message}"));
                }
            }

            self.progress.report(self.tally);
            if let Some(ledger) = self.ledger.as_deref_mut() {
                ledger.checkpoint(self.tally).await;
            }
        }

        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    struct Draft(Vec<usize>);

    impl RowSpan for Draft {
        fn row_indices(&self) -> &[usize] {
            &self.0
        }
    }

    #[tokio::test]
    async fn failed_chunk_marks_every_row_and_progress_is_monotonic() {
        let drafts: Vec<Draft> = (0..5).map(|i| Draft(vec![i * 2, i * 2 + 1])).collect();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let progress = ProgressReporter::new(Some(tx), 10);
        let mut tally = RunTally::default();

        let mut call = 0;
        let written = {
            let mut writer = BatchWriter::new(2, &mut tally, &progress);
            writer
                .write("drafts", &drafts, |_chunk| {
                    call += 1;
                    let fail = call == 2;
                    async move {
                        if fail {
                            Err(AppError::InternalServerError(anyhow::anyhow!("deadlock detected")))
                        } else {
                            Ok(())
                        }
                    }
                })
                .await
        };

        assert_eq!(written.len(), 3);
        assert_eq!(tally.imported, 6);
        assert_eq!(tally.errored, 4);
        let failed_rows: Vec<Option<usize>> = tally.errors.iter().map(|e| e.row_index).collect();
        assert_eq!(failed_rows, vec![Some(4), Some(5), Some(6), Some(7)]);
        assert!(tally.errors[0].message.contains("deadlock detected"));

        let mut done = Vec::new();
        while let Ok(ImportEvent::Progress(p)) = rx.try_recv() {
            assert_eq!(p.rows_total, 10);
            done.push((p.rows_done, p.errors_so_far));
        }
        assert_eq!(done, vec![(4, 0), (8, 4), (10, 4)]);
    }

    #[tokio::test]
    async fn panic_inside_a_chunk_is_contained() {
        let drafts = vec![Draft(vec![0]), Draft(vec![1])];
        let progress = ProgressReporter::silent();
        let mut tally = RunTally::default();

        let mut writer = BatchWriter::new(1, &mut tally, &progress);
        let written = writer
            .write("drafts", &drafts, |chunk| {
                let explode = chunk[0].0 == vec![0];
                async move {
                    if explode {
                        panic!("conexão perdida");
                    }
                    Ok(())
                }
            })
            .await;

        assert_eq!(written.len(), 1);
        assert_eq!(tally.errored, 1);
        assert!(tally.errors[0].message.contains("conexão perdida"));
    }

    #[test]
    fn dropped_receiver_does_not_break_reporting() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let progress = ProgressReporter::new(Some(tx), 3);
        let p = progress.report(&RunTally::default());
        assert_eq!(p.rows_total, 3);
        assert_eq!(progress.emitted(), 1);
    }
}
