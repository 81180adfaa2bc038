use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::{broadcast, Mutex};

use crate::batch::events::{BatchEvent, EventBus};
use crate::batch::state::{
    compute_idle_status, BatchState, PairFailure, PairResult, ResultSlot, RunSummary,
    StatusMessage,
};
use crate::config::AppConfig;
use crate::errors::{HighlightError, HighlightResult};
use crate::export::{export_results, ExportManifest};
use crate::overlay::{generate_highlights, OverlayStyle};
use crate::pairing::{duplicate_base_names, match_files, title_mismatch};
use crate::upload::SharedFile;

#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub style: OverlayStyle,
    pub status_clear_after: Duration,
    pub strict_names: bool,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            style: OverlayStyle::default(),
            status_clear_after: Duration::from_secs(2),
            strict_names: false,
        }
    }
}

impl BatchSettings {
    pub fn from_config(cfg: &AppConfig) -> HighlightResult<Self> {
        Ok(Self {
            style: OverlayStyle::from_config(&cfg.overlay)?,
            status_clear_after: Duration::from_millis(cfg.batch.status_clear_after_ms),
            strict_names: cfg.batch.strict_names,
        })
    }
}

#[derive(Debug, Default)]
struct Shared {
    dumps: Vec<SharedFile>,
    screenshots: Vec<SharedFile>,
    batch: BatchState,
}

/// A pair with both files present, ready to process.
struct Job {
    name: String,
    dump: SharedFile,
    screenshot: SharedFile,
}

/// Drives every matched pair through the highlight pipeline and keeps one
/// aggregate status.
pub struct BatchOrchestrator {
    settings: BatchSettings,
    shared: Arc<Mutex<Shared>>,
    events: EventBus,
    generation: Arc<AtomicU64>,
}

/// Set a new status, cancelling any pending clear.
fn apply_status(batch: &mut BatchState, status: StatusMessage, events: &EventBus) {
    batch.cancel_status_clear();
    batch.status_epoch += 1;
    batch.status = status;
    tracing::debug!(?status, "status changed");
    events.send(BatchEvent::StatusChanged { status });
}

impl BatchOrchestrator {
    pub fn new(settings: BatchSettings) -> Self {
        let shared = Shared {
            batch: BatchState::new(compute_idle_status(0, 0)),
            ..Shared::default()
        };
        Self {
            settings,
            shared: Arc::new(Mutex::new(shared)),
            events: EventBus::new(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.events.subscribe()
    }

    pub async fn set_layout_dumps(&self, files: Vec<SharedFile>) -> StatusMessage {
        let mut g = self.shared.lock().await;
        g.dumps = files;
        self.reset(&mut g)
    }

    pub async fn set_screenshots(&self, files: Vec<SharedFile>) -> StatusMessage {
        let mut g = self.shared.lock().await;
        g.screenshots = files;
        self.reset(&mut g)
    }

    pub async fn set_uploads(
        &self,
        dumps: Vec<SharedFile>,
        screenshots: Vec<SharedFile>,
    ) -> StatusMessage {
        let mut g = self.shared.lock().await;
        g.dumps = dumps;
        g.screenshots = screenshots;
        self.reset(&mut g)
    }

    /// New uploads reinitialise the batch; an in-flight run keeps going.
    fn reset(&self, g: &mut Shared) -> StatusMessage {
        let status = compute_idle_status(g.screenshots.len(), g.dumps.len());
        g.batch.pairs.clear();
        g.batch.results.clear();
        apply_status(&mut g.batch, status, &self.events);
        tracing::info!(
            dumps = g.dumps.len(),
            screenshots = g.screenshots.len(),
            status = ?status,
            "uploads changed"
        );
        status
    }

    pub async fn status(&self) -> StatusMessage {
        self.shared.lock().await.batch.status
    }

    pub async fn results(&self) -> Vec<PairResult> {
        self.shared.lock().await.batch.results.clone()
    }

    pub async fn export(&self, out_dir: &Path) -> HighlightResult<ExportManifest> {
        let results = self.results().await;
        export_results(&results, out_dir)
    }

    pub async fn run(&self) -> HighlightResult<RunSummary> {
        let (generation, jobs) = {
            let mut g = self.shared.lock().await;
            let idle = compute_idle_status(g.screenshots.len(), g.dumps.len());
            if !idle.allows_run() {
                return Err(HighlightError::RunNotAllowed(idle));
            }

            let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            apply_status(&mut g.batch, StatusMessage::InProgress, &self.events);

            let pairs = match_files(&g.dumps, &g.screenshots);
            g.batch.results.clear();
            for pair in &pairs {
                g.batch.register_placeholder(&pair.name);
            }
            tracing::info!(generation, pairs = pairs.len(), "run started");

            let duplicates = duplicate_base_names(&pairs);
            if !duplicates.is_empty() {
                tracing::warn!(?duplicates, "layout dumps share a base name");
            }
            let abort = if self.settings.strict_names && !duplicates.is_empty() {
                Some(StatusMessage::DuplicateName)
            } else if title_mismatch(&pairs, g.dumps.len()) {
                Some(StatusMessage::TitleMismatch)
            } else {
                None
            };

            let jobs: Vec<Job> = pairs
                .iter()
                .filter_map(|p| match (&p.layout_dump, &p.screenshot) {
                    (Some(dump), Some(screenshot)) => Some(Job {
                        name: p.name.clone(),
                        dump: dump.clone(),
                        screenshot: screenshot.clone(),
                    }),
                    _ => None,
                })
                .collect();
            g.batch.pairs = pairs;

            if let Some(status) = abort {
                tracing::warn!(generation, ?status, "run aborted before processing");
                apply_status(&mut g.batch, status, &self.events);
                self.events.send(BatchEvent::RunFinished { generation, status });
                return Ok(RunSummary {
                    generation,
                    status,
                    succeeded: Vec::new(),
                    failed: Vec::new(),
                    superseded: false,
                });
            }
            (generation, jobs)
        };

        let outcomes = join_all(jobs.into_iter().map(|job| self.process_pair(generation, job))).await;

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(name) => succeeded.push(name),
                Err(failure) => failed.push(failure),
            }
        }

        let mut g = self.shared.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::info!(generation, "run superseded; leaving status untouched");
            return Ok(RunSummary {
                generation,
                status: g.batch.status,
                succeeded,
                failed,
                superseded: true,
            });
        }

        let status = if failed.is_empty() {
            StatusMessage::Done
        } else {
            StatusMessage::Failed
        };
        apply_status(&mut g.batch, status, &self.events);
        if status == StatusMessage::Done {
            self.schedule_status_clear(&mut g.batch);
        }
        self.events.send(BatchEvent::RunFinished { generation, status });
        tracing::info!(
            generation,
            succeeded = succeeded.len(),
            failed = failed.len(),
            "run finished"
        );

        Ok(RunSummary {
            generation,
            status,
            succeeded,
            failed,
            superseded: false,
        })
    }

    async fn process_pair(&self, generation: u64, job: Job) -> Result<String, PairFailure> {
        self.events.send(BatchEvent::PairStarted {
            generation,
            name: job.name.clone(),
        });
        tracing::debug!(generation, name = %job.name, "pair started");

        let result =
            generate_highlights(job.dump.as_ref(), job.screenshot.as_ref(), &self.settings.style)
                .await;

        let mut g = self.shared.lock().await;
        let current = self.generation.load(Ordering::SeqCst) == generation;
        match result {
            Ok(image) => {
                if current {
                    let (width, height) = (image.width, image.height);
                    g.batch.set_slot(&job.name, ResultSlot::Ready(image));
                    self.events.send(BatchEvent::PairCompleted {
                        generation,
                        name: job.name.clone(),
                        width,
                        height,
                    });
                } else {
                    tracing::debug!(generation, name = %job.name, "discarding stale result");
                }
                Ok(job.name)
            }
            Err(e) => {
                let reason = e.to_string();
                tracing::error!(generation, name = %job.name, error = %reason, "pair failed");
                if current {
                    g.batch.set_slot(&job.name, ResultSlot::Failed(reason.clone()));
                    self.events.send(BatchEvent::PairFailed {
                        generation,
                        name: job.name.clone(),
                        reason: reason.clone(),
                    });
                }
                Err(PairFailure {
                    name: job.name,
                    reason,
                })
            }
        }
    }

    fn schedule_status_clear(&self, batch: &mut BatchState) {
        let epoch = batch.status_epoch;
        let delay = self.settings.status_clear_after;
        let shared = Arc::clone(&self.shared);
        let events = self.events.clone();
        batch.status_clear_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut g = shared.lock().await;
            if g.batch.status_epoch != epoch {
                return;
            }
            // Detach our own handle so clearing does not abort this task.
            drop(g.batch.status_clear_timer.take());
            apply_status(&mut g.batch, StatusMessage::NoMessage, &events);
        }));
    }
}

impl Drop for BatchOrchestrator {
    /// A pending clear holds the event bus open; stop it so subscribers see
    /// the channel close.
    fn drop(&mut self) {
        if let Ok(mut g) = self.shared.try_lock() {
            g.batch.cancel_status_clear();
        }
    }
}
