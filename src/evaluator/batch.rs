//! Bounded-concurrency batch judging.

use chrono::Utc;
use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use super::checkpoint::CheckpointWriter;
use super::output::OutputRecord;
use crate::dataset::{natural_cmp, MergedRecord};
use crate::error::{DataError, JudgeError};
use crate::judge::{Judge, JudgeInput};
use crate::metrics::JudgeMetrics;

/// Result of judging a batch. Records are in natural id order.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub records: Vec<OutputRecord>,
}

impl BatchOutcome {
    pub fn judged_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_judged()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.records.len() - self.judged_count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &OutputRecord> {
        self.records.iter().filter(|r| !r.is_judged())
    }
}

/// Judges merged records with at most `concurrency` calls in flight.
///
/// One record's failure never affects another: every record ends up in the
/// outcome exactly once, either judged or failed.
pub struct BatchEvaluator {
    judge: Arc<dyn Judge>,
    concurrency: usize,
    metrics: Option<Arc<JudgeMetrics>>,
    checkpoint: Option<PathBuf>,
}

impl BatchEvaluator {
    pub fn new(judge: Arc<dyn Judge>, concurrency: usize) -> Self {
        Self {
            judge,
            concurrency: concurrency.max(1),
            metrics: None,
            checkpoint: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<JudgeMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Appends each settled record to `path` as it completes.
    pub fn with_checkpoint(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint = Some(path.into());
        self
    }

    /// Judges every record. Errors only if the checkpoint cannot be written.
    pub async fn run(&self, records: &[MergedRecord]) -> Result<BatchOutcome, DataError> {
        let started = Instant::now();
        let total = records.len();
        info!(
            records = total,
            concurrency = self.concurrency,
            model = self.judge.model(),
            "Starting batch evaluation"
        );

        let writer = match &self.checkpoint {
            Some(path) => Some(CheckpointWriter::open(path).await?),
            None => None,
        };
        let checkpoint_tx = writer.as_ref().map(|w| w.sender());

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let futures = records.iter().map(|record| {
            let semaphore = semaphore.clone();
            let checkpoint_tx = checkpoint_tx.clone();
            async move {
                // The semaphore is never closed, so acquire cannot fail.
                let _permit = semaphore.acquire().await.ok();
                let output = self.judge_one(record).await;
                if let Some(tx) = checkpoint_tx {
                    send_checkpoint(&tx, &output).await;
                }
                output
            }
        });

        let mut outputs = join_all(futures).await;
        drop(checkpoint_tx);

        if let Some(writer) = writer {
            let written = writer.finish().await?;
            debug!(written, "Checkpoint writer finished");
        }

        outputs.sort_by(|a, b| natural_cmp(&a.id, &b.id));
        let outcome = BatchOutcome { records: outputs };

        info!(
            judged = outcome.judged_count(),
            failed = outcome.failed_count(),
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Batch evaluation finished"
        );
        Ok(outcome)
    }

    async fn judge_one(&self, record: &MergedRecord) -> OutputRecord {
        let input = JudgeInput::new(
            &record.task.instruction,
            &record.task.answer,
            &record.prediction,
        );
        let model = self.judge.model();

        let output = match self.judge.judge(&input).await {
            Ok(verdict) => {
                debug!(id = %record.id(), score = verdict.score, "Record judged");
                OutputRecord::judged(record, verdict, model, Utc::now())
            }
            Err(err) => {
                log_failure(record.id(), &err);
                OutputRecord::failed(record, &err, model, Utc::now())
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_outcome(output.status.as_str());
        }
        output
    }
}

fn log_failure(id: &str, err: &JudgeError) {
    match err {
        JudgeError::Parse(msg) => {
            warn!(id = %id, error = %msg, "Judge reply had no usable verdict")
        }
        JudgeError::Fatal(msg) => {
            warn!(id = %id, error = %msg, "Judge backend rejected the request")
        }
        JudgeError::Transient { attempts, message } => {
            warn!(id = %id, attempts, error = %message, "Judge backend unavailable, giving up")
        }
        JudgeError::InvalidInput(msg) => {
            warn!(id = %id, error = %msg, "Record cannot be judged")
        }
    }
}

async fn send_checkpoint(tx: &mpsc::Sender<OutputRecord>, output: &OutputRecord) {
    if tx.send(output.clone()).await.is_err() {
        warn!(id = %output.id, "Checkpoint writer stopped; record kept in memory only");
    }
}
