//! Processing queue: registry ownership, FIFO work channel and the single
//! consumer task.
//!
//! Ids are pushed onto an unbounded channel on intake and on retry. One
//! consumer task owns the receiving side, so at most one file is ever being
//! extracted. Shutdown: [`ProcessingQueue::shutdown`] stops the consumer
//! after the record it is working on.

use bytes::Bytes;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use promo_core::models::{
    FailureKind, FileDetailView, FileRecordView, FileStatus, RecordError, RegistrySummary,
};
use promo_core::{Config, IntakeError};
use promo_extract::ExtractionError;

use crate::context::FileProcessor;
use crate::registry::{ClaimedFile, Registry, RetryError};

const EVENT_CHANNEL_CAPACITY: usize = 256;
/// Slack added on top of the extraction and conversion timeouts before the
/// queue gives up on a processor.
const PROCESSING_TIMEOUT_GRACE_SECS: u64 = 5;

#[derive(Clone, Debug)]
pub struct QueueConfig {
    pub max_file_size_bytes: u64,
    /// `None` = unlimited manual retries.
    pub max_manual_retries: Option<u32>,
    /// Upper bound on a single processing attempt.
    pub processing_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 25 * 1024 * 1024,
            max_manual_retries: None,
            processing_timeout: Duration::from_secs(95),
        }
    }
}

impl QueueConfig {
    pub fn from_config(config: &Config) -> Self {
        let timeout_secs = config
            .extraction_timeout_secs()
            .saturating_add(config.workbook_timeout_secs())
            .saturating_add(PROCESSING_TIMEOUT_GRACE_SECS);
        Self {
            max_file_size_bytes: config.max_file_size_bytes(),
            max_manual_retries: config.max_manual_retries(),
            processing_timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// Status change of a tracked file. `status` is `None` when the file was removed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueEvent {
    pub file_id: Uuid,
    pub status: Option<FileStatus>,
}

/// One file of a batch upload.
#[derive(Clone, Debug)]
pub struct Upload {
    pub name: String,
    pub content_type: String,
    pub content: Bytes,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub accepted: Vec<FileRecordView>,
    pub rejected: Vec<IntakeError>,
}

struct InFlight {
    file_id: Uuid,
    cancel: CancellationToken,
}

struct Shared {
    registry: Mutex<Registry>,
    in_flight: Mutex<Option<InFlight>>,
    events: broadcast::Sender<QueueEvent>,
}

impl Shared {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn in_flight(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Callers hold the registry lock, so events follow registry order.
    fn publish(&self, file_id: Uuid, status: Option<FileStatus>) {
        // No subscribers is fine.
        let _ = self.events.send(QueueEvent { file_id, status });
    }
}

#[derive(Clone)]
pub struct ProcessingQueue {
    shared: Arc<Shared>,
    work_tx: mpsc::UnboundedSender<Uuid>,
    shutdown: CancellationToken,
}

impl ProcessingQueue {
    /// Create the queue and spawn its consumer task.
    pub fn new(config: QueueConfig, processor: Arc<dyn FileProcessor>) -> Self {
        let (work_tx, work_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let shared = Arc::new(Shared {
            registry: Mutex::new(Registry::new(
                config.max_file_size_bytes,
                config.max_manual_retries,
            )),
            in_flight: Mutex::new(None),
            events,
        });
        let shutdown = CancellationToken::new();

        let worker_shared = shared.clone();
        let worker_shutdown = shutdown.clone();
        tokio::spawn(async move {
            Self::consumer(
                worker_shared,
                processor,
                config.processing_timeout,
                work_rx,
                worker_shutdown,
            )
            .await;
        });

        Self {
            shared,
            work_tx,
            shutdown,
        }
    }

    /// Validate one upload and enqueue it.
    #[tracing::instrument(skip(self, content), fields(size = content.len()))]
    pub fn submit(
        &self,
        name: &str,
        content_type: &str,
        content: Bytes,
    ) -> Result<FileRecordView, IntakeError> {
        let view = {
            let mut registry = self.shared.registry();
            let view = registry.intake(name, content_type, content).inspect_err(|e| {
                tracing::debug!(code = e.code(), error = %e, "Upload rejected");
            })?;
            self.enqueue(view.id);
            self.shared.publish(view.id, Some(FileStatus::Pending));
            view
        };

        tracing::info!(file_id = %view.id, kind = %view.kind, "File accepted");
        Ok(view)
    }

    /// Validate each upload independently, in order. Files accepted earlier
    /// in the batch count for duplicate detection.
    pub fn submit_batch(&self, uploads: Vec<Upload>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for upload in uploads {
            match self.submit(&upload.name, &upload.content_type, upload.content) {
                Ok(view) => outcome.accepted.push(view),
                Err(e) => outcome.rejected.push(e),
            }
        }
        outcome
    }

    /// Reset a failed file to `Pending` and put it back at the tail.
    #[tracing::instrument(skip(self))]
    pub fn retry(&self, id: Uuid) -> Result<FileRecordView, RetryError> {
        let view = {
            let mut registry = self.shared.registry();
            let view = registry.retry(id)?;
            self.enqueue(id);
            self.shared.publish(id, Some(FileStatus::Pending));
            view
        };

        tracing::info!(file_id = %id, attempts = view.attempts, "File re-queued");
        Ok(view)
    }

    /// Remove a file. An in-flight extraction for it is cancelled and its
    /// result discarded. Returns `false` when the id is unknown.
    #[tracing::instrument(skip(self))]
    pub fn remove(&self, id: Uuid) -> bool {
        let removed = {
            let mut registry = self.shared.registry();
            let removed = registry.remove(id);
            if removed.is_some() {
                if let Some(in_flight) = self.shared.in_flight().as_ref() {
                    if in_flight.file_id == id {
                        in_flight.cancel.cancel();
                    }
                }
                self.shared.publish(id, None);
            }
            removed
        };

        match removed {
            Some(record) => {
                tracing::info!(file_id = %id, status = %record.status(), "File removed");
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: Uuid) -> Option<FileDetailView> {
        self.shared.registry().detail(id)
    }

    /// All files, newest first.
    pub fn list(&self) -> Vec<FileRecordView> {
        self.shared.registry().list()
    }

    pub fn summary(&self) -> RegistrySummary {
        self.shared.registry().summary()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.shared.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        !self.work_tx.is_closed()
    }

    /// Signals the consumer to stop once the current record is finished.
    pub fn shutdown(&self) {
        tracing::info!("Initiating processing queue shutdown");
        self.shutdown.cancel();
    }

    fn enqueue(&self, id: Uuid) {
        if self.work_tx.send(id).is_err() {
            tracing::warn!(file_id = %id, "Processing queue is stopped, file stays pending");
        }
    }

    async fn consumer(
        shared: Arc<Shared>,
        processor: Arc<dyn FileProcessor>,
        processing_timeout: Duration,
        mut work_rx: mpsc::UnboundedReceiver<Uuid>,
        shutdown: CancellationToken,
    ) {
        tracing::info!(
            processing_timeout_secs = processing_timeout.as_secs(),
            "Processing queue consumer started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                next = work_rx.recv() => match next {
                    Some(id) => {
                        Self::process_one(&shared, processor.as_ref(), processing_timeout, id).await
                    }
                    None => break,
                },
            }
        }

        tracing::info!("Processing queue consumer stopped");
    }

    async fn process_one(
        shared: &Shared,
        processor: &dyn FileProcessor,
        processing_timeout: Duration,
        id: Uuid,
    ) {
        let cancel = CancellationToken::new();
        let claimed = {
            let mut registry = shared.registry();
            let claimed = registry.claim(id);
            if claimed.is_some() {
                *shared.in_flight() = Some(InFlight {
                    file_id: id,
                    cancel: cancel.clone(),
                });
                shared.publish(id, Some(FileStatus::Processing));
            }
            claimed
        };

        let Some(ClaimedFile {
            id,
            attempt,
            content,
            content_type,
            kind,
        }) = claimed
        else {
            tracing::debug!(file_id = %id, "Skipping file that is no longer pending");
            return;
        };

        tracing::info!(file_id = %id, attempt, kind = %kind, "Processing file");

        let result = tokio::time::timeout(
            processing_timeout,
            processor.process(content, &content_type, kind, &cancel),
        )
        .await
        .unwrap_or_else(|_| {
            Err(ExtractionError::UpstreamUnavailable(format!(
                "Processing timed out after {}s",
                processing_timeout.as_secs()
            )))
        });

        let published = {
            let mut registry = shared.registry();
            *shared.in_flight() = None;

            match result {
                Ok(products) => {
                    let count = products.len();
                    let done = registry.complete(id, attempt, products);
                    if done {
                        tracing::info!(file_id = %id, products = count, "File processed");
                        shared.publish(id, Some(FileStatus::Done));
                    }
                    done
                }
                Err(ExtractionError::Cancelled) => false,
                Err(e) => {
                    let error = e.to_record_error().unwrap_or_else(|| RecordError {
                        kind: FailureKind::UpstreamUnavailable,
                        message: e.to_string(),
                    });
                    let failed = registry.fail(id, attempt, error);
                    if failed {
                        tracing::warn!(file_id = %id, error = %e, "File processing failed");
                        shared.publish(id, Some(FileStatus::Error));
                    }
                    failed
                }
            }
        };

        if !published {
            tracing::debug!(file_id = %id, "Discarded result for removed file");
        }
    }
}
