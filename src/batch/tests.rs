use super::*;
use crate::schema::GeneratedSchema;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Scripted processor: fails the URLs it is told to fail, counts attempts,
/// and can raise pause or cancel flags while "processing" a given URL.
#[derive(Default)]
struct ScriptedProcessor {
    fail_once: HashSet<String>,
    fail_always: HashSet<String>,
    cancel_on: Option<(String, BatchControls)>,
    pause_on: Option<(String, BatchControls)>,
    attempts: Mutex<HashMap<String, usize>>,
}

impl ScriptedProcessor {
    fn attempts_for(&self, url: &str) -> usize {
        *self.attempts.lock().unwrap().get(url).unwrap_or(&0)
    }
}

impl ItemProcessor for ScriptedProcessor {
    async fn process(&self, item: &BatchItem) -> Result<GeneratedSchema, Error> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let n = attempts.entry(item.url.clone()).or_insert(0);
            *n += 1;
            *n
        };

        if let Some((url, controls)) = &self.cancel_on {
            if *url == item.url {
                controls.request_cancel();
            }
        }
        if let Some((url, controls)) = &self.pause_on {
            if *url == item.url {
                controls.pause();
            }
        }

        if self.fail_always.contains(&item.url)
            || (self.fail_once.contains(&item.url) && attempt == 1)
        {
            return Err(Error::Fetch(crate::error::FetchError::Timeout(
                Duration::from_secs(90),
            )));
        }

        let mut schema = GeneratedSchema::default();
        schema.set("@type", json!("WebPage"));
        schema.set("url", json!(item.url));
        Ok(schema)
    }
}

fn items(urls: &[&str]) -> Vec<BatchItem> {
    urls.iter()
        .map(|u| BatchItem {
            url: u.to_string(),
            keywords: Vec::new(),
        })
        .collect()
}

#[tokio::test]
async fn test_batch_completes_and_tallies_results() {
    let mut controller = BatchController::new();
    controller
        .load(items(&[
            "https://a.example",
            "https://b.example",
            "https://c.example",
        ]))
        .unwrap();

    let processor = ScriptedProcessor {
        fail_always: HashSet::from(["https://b.example".to_string()]),
        ..Default::default()
    };
    controller.start(&processor).await.unwrap();

    assert_eq!(controller.state(), BatchState::Completed);
    let progress = controller.progress();
    assert_eq!(progress.succeeded, 2);
    assert_eq!(progress.failed, 1);

    let failed: Vec<_> = controller.results().filter(|r| !r.success).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].url, "https://b.example");
    // Timeout failures are rewritten as actionable guidance
    assert!(failed[0].error.as_deref().unwrap().contains("too long"));
}

#[tokio::test]
async fn test_cancel_marks_unfinished_items_failed() {
    let mut controller = BatchController::new();
    controller
        .load(items(&[
            "https://a.example",
            "https://b.example",
            "https://c.example",
        ]))
        .unwrap();

    let processor = ScriptedProcessor {
        cancel_on: Some(("https://a.example".to_string(), controller.controls())),
        ..Default::default()
    };
    controller.start(&processor).await.unwrap();

    assert_eq!(controller.state(), BatchState::Cancelled);
    let results: Vec<_> = controller.results().collect();
    assert_eq!(results.len(), 3);
    assert!(results[0].success);
    assert!(!results[1].success);
    assert_eq!(results[1].error.as_deref(), Some("Cancelled"));
    assert_eq!(results[2].error.as_deref(), Some("Cancelled"));
    // Only the first item was ever processed
    assert_eq!(processor.attempts_for("https://b.example"), 0);
}

#[tokio::test]
async fn test_pause_then_resume_continues_from_same_item() {
    let mut controller = BatchController::new();
    controller
        .load(items(&["https://a.example", "https://b.example"]))
        .unwrap();

    let controls = controller.controls();
    let processor = ScriptedProcessor {
        pause_on: Some(("https://a.example".to_string(), controls.clone())),
        ..Default::default()
    };

    let resumer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1200)).await;
        controls.resume();
    });

    controller.start(&processor).await.unwrap();
    resumer.await.unwrap();

    assert_eq!(controller.state(), BatchState::Completed);
    assert_eq!(controller.progress().succeeded, 2);
    assert_eq!(processor.attempts_for("https://a.example"), 1);
    assert_eq!(processor.attempts_for("https://b.example"), 1);
}

#[tokio::test]
async fn test_retry_reprocesses_failed_item_in_place() {
    let mut controller = BatchController::new();
    controller
        .load(items(&["https://a.example", "https://b.example"]))
        .unwrap();

    let processor = ScriptedProcessor {
        fail_once: HashSet::from(["https://b.example".to_string()]),
        ..Default::default()
    };
    controller.start(&processor).await.unwrap();
    assert_eq!(controller.progress().failed, 1);

    controller.retry(1, &processor).await.unwrap();

    assert_eq!(controller.progress().failed, 0);
    assert_eq!(controller.progress().succeeded, 2);
    assert_eq!(processor.attempts_for("https://b.example"), 2);
}

#[tokio::test]
async fn test_retry_rejected_on_successful_item() {
    let mut controller = BatchController::new();
    controller.load(items(&["https://a.example"])).unwrap();
    let processor = ScriptedProcessor::default();
    controller.start(&processor).await.unwrap();

    let err = controller.retry(0, &processor).await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_retry_rejected_before_start_and_after_cancel() {
    let mut controller = BatchController::new();
    controller
        .load(items(&["https://a.example", "https://b.example"]))
        .unwrap();
    let processor = ScriptedProcessor::default();

    // Idle: nothing has run yet
    assert!(controller.retry(0, &processor).await.unwrap_err().is_validation());

    let cancelling = ScriptedProcessor {
        cancel_on: Some(("https://a.example".to_string(), controller.controls())),
        ..Default::default()
    };
    controller.start(&cancelling).await.unwrap();
    assert_eq!(controller.state(), BatchState::Cancelled);

    // Cancelled runs are terminal; their items cannot be retried
    assert!(controller.retry(1, &processor).await.unwrap_err().is_validation());
}

#[tokio::test]
async fn test_reset_returns_to_idle() {
    let mut controller = BatchController::new();
    controller.load(items(&["https://a.example"])).unwrap();
    let processor = ScriptedProcessor::default();
    controller.start(&processor).await.unwrap();

    controller.reset();

    assert_eq!(controller.state(), BatchState::Idle);
    assert_eq!(controller.results().count(), 0);
    assert_eq!(controller.progress().total, 0);

    // A fresh queue can be loaded and run after a reset
    controller.load(items(&["https://b.example"])).unwrap();
    controller.start(&processor).await.unwrap();
    assert_eq!(controller.state(), BatchState::Completed);
}

#[tokio::test]
async fn test_load_caps_queue_size() {
    let urls: Vec<String> = (0..25).map(|i| format!("https://site{}.example", i)).collect();
    let refs: Vec<&str> = urls.iter().map(String::as_str).collect();

    let mut controller = BatchController::new();
    controller.load(items(&refs)).unwrap();
    assert_eq!(controller.progress().total, MAX_URLS);
}

#[tokio::test]
async fn test_start_with_empty_queue_is_rejected() {
    let mut controller = BatchController::new();
    let processor = ScriptedProcessor::default();
    let err = controller.start(&processor).await.unwrap_err();
    assert!(err.is_validation());
}

#[test]
fn test_normalize_error_messages() {
    assert!(normalize_error_message("Timeout: page took longer than 90s").contains("too long"));
    assert!(normalize_error_message("Cannot access this URL type").contains("inaccessible"));
    assert!(normalize_error_message("blocked by CORS policy").contains("cross-origin"));
    assert_eq!(normalize_error_message("something else"), "something else");
}
