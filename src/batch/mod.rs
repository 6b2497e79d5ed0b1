//! Sequential batch processing with pause, resume, cancel, and per-item
//! retry.
//!
//! The controller owns the queue and results; pause and cancel requests
//! arrive through shared flags so they can be raised from another task
//! (a signal handler, for instance) while a run is in flight.

pub mod csv;

use crate::error::Error;
use crate::schema::GeneratedSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[cfg(test)]
mod tests;

/// Most URLs accepted into a single batch
pub const MAX_URLS: usize = 20;

/// Delay between items, and the poll interval while paused
const PACING: Duration = Duration::from_millis(500);

/// Lifecycle of a batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchState {
    Idle,
    Running,
    Paused,
    Completed,
    Cancelled,
}

/// One unit of work: a URL and its seed keywords
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub url: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Outcome of processing one item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub url: String,
    pub keywords: Vec<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<GeneratedSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    pub current: usize,
    pub total: usize,
    pub current_url: Option<String>,
    pub succeeded: usize,
    pub failed: usize,
}

/// Turns one batch item into a schema
pub trait ItemProcessor {
    async fn process(&self, item: &BatchItem) -> Result<GeneratedSchema, Error>;
}

/// Cloneable handle for pausing, resuming, and cancelling a running batch
#[derive(Debug, Clone, Default)]
pub struct BatchControls {
    paused: Arc<AtomicBool>,
    cancelled: Arc<AtomicBool>,
}

impl BatchControls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn request_cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

pub struct BatchController {
    queue: Vec<BatchItem>,
    results: Vec<Option<BatchResult>>,
    index: usize,
    state: BatchState,
    controls: BatchControls,
}

impl BatchController {
    pub fn new() -> Self {
        Self {
            queue: Vec::new(),
            results: Vec::new(),
            index: 0,
            state: BatchState::Idle,
            controls: BatchControls::new(),
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn controls(&self) -> BatchControls {
        self.controls.clone()
    }

    pub fn results(&self) -> impl Iterator<Item = &BatchResult> {
        self.results.iter().flatten()
    }

    pub fn progress(&self) -> BatchProgress {
        let succeeded = self.results().filter(|r| r.success).count();
        let failed = self.results().filter(|r| !r.success).count();
        BatchProgress {
            current: self.index,
            total: self.queue.len(),
            current_url: self.queue.get(self.index).map(|item| item.url.clone()),
            succeeded,
            failed,
        }
    }

    /// Loads a queue of items. Only valid while idle; anything beyond the
    /// batch cap is dropped.
    pub fn load(&mut self, mut items: Vec<BatchItem>) -> Result<(), Error> {
        if self.state != BatchState::Idle {
            return Err(Error::Validation(
                "A batch is already loaded; reset before loading another".to_string(),
            ));
        }
        if items.len() > MAX_URLS {
            ::log::warn!(
                "Batch capped at {} URLs, dropping {}",
                MAX_URLS,
                items.len() - MAX_URLS
            );
            items.truncate(MAX_URLS);
        }
        self.results = vec![None; items.len()];
        self.queue = items;
        self.index = 0;
        Ok(())
    }

    /// Runs the loaded queue to completion, cancellation, or until the
    /// caller's future is dropped. Pause requests take effect at item
    /// boundaries; a cancel marks every unfinished item as failed.
    pub async fn start<P: ItemProcessor>(&mut self, processor: &P) -> Result<(), Error> {
        if self.state != BatchState::Idle {
            return Err(Error::Validation(
                "Batch has already been started".to_string(),
            ));
        }
        if self.queue.is_empty() {
            return Err(Error::Validation("No URLs to process".to_string()));
        }

        self.state = BatchState::Running;
        ::log::info!("Starting batch of {} URLs", self.queue.len());
        self.run(processor).await;
        Ok(())
    }

    async fn run<P: ItemProcessor>(&mut self, processor: &P) {
        while self.index < self.queue.len() {
            if self.controls.is_cancelled() {
                self.mark_remaining_cancelled();
                self.state = BatchState::Cancelled;
                ::log::info!("Batch cancelled at item {}", self.index);
                return;
            }

            while self.controls.is_paused() && !self.controls.is_cancelled() {
                if self.state != BatchState::Paused {
                    self.state = BatchState::Paused;
                    ::log::info!("Batch paused before item {}", self.index);
                }
                tokio::time::sleep(PACING).await;
            }
            if self.state == BatchState::Paused {
                self.state = BatchState::Running;
                ::log::info!("Batch resumed at item {}", self.index);
                continue;
            }

            let item = self.queue[self.index].clone();
            ::log::info!(
                "Processing {} ({} of {})",
                item.url,
                self.index + 1,
                self.queue.len()
            );
            let result = process_item(processor, &item).await;
            if result.success {
                ::log::info!("Succeeded: {}", item.url);
            } else {
                ::log::warn!(
                    "Failed: {} ({})",
                    item.url,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            self.results[self.index] = Some(result);
            self.index += 1;

            if self.index < self.queue.len() {
                tokio::time::sleep(PACING).await;
            }
        }

        self.state = BatchState::Completed;
        let progress = self.progress();
        ::log::info!(
            "Batch complete: {} succeeded, {} failed",
            progress.succeeded,
            progress.failed
        );
    }

    fn mark_remaining_cancelled(&mut self) {
        for (slot, item) in self.results.iter_mut().zip(&self.queue) {
            let done = slot.as_ref().map(|r| r.success).unwrap_or(false);
            if !done {
                *slot = Some(BatchResult {
                    url: item.url.clone(),
                    keywords: item.keywords.clone(),
                    success: false,
                    schema: None,
                    error: Some("Cancelled".to_string()),
                });
            }
        }
    }

    /// Reprocesses a single failed item in place. Only valid once the run
    /// has completed or while it is paused.
    pub async fn retry<P: ItemProcessor>(
        &mut self,
        index: usize,
        processor: &P,
    ) -> Result<(), Error> {
        if !matches!(self.state, BatchState::Completed | BatchState::Paused) {
            return Err(Error::Validation(
                "Retry is only available once the batch is completed or paused".to_string(),
            ));
        }
        let failed = self
            .results
            .get(index)
            .and_then(Option::as_ref)
            .map(|r| !r.success)
            .unwrap_or(false);
        if !failed {
            return Err(Error::Validation(format!(
                "Item {} is not a failed item",
                index
            )));
        }

        let item = self.queue[index].clone();
        ::log::info!("Retrying {}", item.url);
        self.results[index] = Some(process_item(processor, &item).await);
        Ok(())
    }

    /// Returns to idle, discarding the queue and all results
    pub fn reset(&mut self) {
        self.queue.clear();
        self.results.clear();
        self.index = 0;
        self.state = BatchState::Idle;
        self.controls.reset();
    }
}

impl Default for BatchController {
    fn default() -> Self {
        Self::new()
    }
}

async fn process_item<P: ItemProcessor>(processor: &P, item: &BatchItem) -> BatchResult {
    match processor.process(item).await {
        Ok(schema) => BatchResult {
            url: item.url.clone(),
            keywords: item.keywords.clone(),
            success: true,
            schema: Some(schema),
            error: None,
        },
        Err(e) => BatchResult {
            url: item.url.clone(),
            keywords: item.keywords.clone(),
            success: false,
            schema: None,
            error: Some(normalize_error_message(&e.to_string())),
        },
    }
}

/// Maps raw transport failures onto guidance the user can act on
pub fn normalize_error_message(raw: &str) -> String {
    if raw.contains("Timeout") {
        return "Page took too long to load. The site may be slow or blocking automated access."
            .to_string();
    }
    if raw.contains("Failed to fetch") || raw.contains("Cannot access") {
        return "Could not reach this URL. It may be inaccessible or blocked.".to_string();
    }
    if raw.contains("CORS") || raw.contains("cross-origin") {
        return "The site blocks cross-origin access to its content.".to_string();
    }
    raw.to_string()
}
