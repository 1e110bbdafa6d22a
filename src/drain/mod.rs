//! Batch drain engine
//!
//! Both the capture and the extraction stage consume pending rows the same
//! way: select a bounded batch, transform every item concurrently, commit
//! the survivors in one transaction, repeat. This module owns that loop and
//! leaves selection, transformation and commit to the caller.
//!
//! Items that fail within a run are remembered in a skip list and excluded
//! from later selections, so a batch in which every item fails does not stop
//! the loop while healthy rows remain further down the table.

use crate::config::CrawlerConfig;
use crate::crawler::FetchError;
use crate::storage::{FrontierUrl, RawPage};
use crate::Result;
use futures::future::join_all;
use serde::Serialize;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Something a drain loop can select, process and mark done
pub trait WorkItem {
    /// Natural key of the item (its URL)
    fn key(&self) -> &str;
}

impl WorkItem for FrontierUrl {
    fn key(&self) -> &str {
        &self.url
    }
}

impl WorkItem for RawPage {
    fn key(&self) -> &str {
        &self.url
    }
}

/// Outcome of one batch selection
#[derive(Debug)]
pub enum BatchFetch<T> {
    /// Items to process; never empty when produced by [`BatchFetch::from_items`]
    Ready(Vec<T>),
    /// No pending work is left
    Exhausted,
}

impl<T> BatchFetch<T> {
    /// Wraps a selection result, mapping an empty selection to `Exhausted`
    pub fn from_items(items: Vec<T>) -> Self {
        if items.is_empty() {
            BatchFetch::Exhausted
        } else {
            BatchFetch::Ready(items)
        }
    }
}

/// Why a single item was left out of its batch
#[derive(Debug, Error)]
pub enum ItemError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("No HTML content for {0}")]
    EmptyHtml(String),
}

/// Tuning knobs for a drain loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainOptions {
    pub batch_size: usize,
    pub transaction_timeout: Duration,
    pub max_commit_failures: u32,
}

impl DrainOptions {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1) as usize,
            transaction_timeout: Duration::from_secs(config.transaction_timeout_secs),
            max_commit_failures: config.max_commit_failures.max(1),
        }
    }
}

/// Why a drain loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Selection returned no more items
    Exhausted,
    /// Too many consecutive commits were rolled back
    CommitFailures,
}

/// Counters for one drain loop
#[derive(Debug, Clone, Serialize)]
pub struct DrainReport {
    pub stage: &'static str,
    pub batches: u64,
    /// Upstream rows marked processed
    pub committed: u64,
    pub item_failures: u64,
    pub commit_failures: u64,
    pub stop: StopReason,
}

/// Runs a drain loop to completion
///
/// # Arguments
///
/// * `stage` - Stage name used in logs and the report
/// * `options` - Batch size, commit deadline and commit failure cap
/// * `fetch_batch` - Selects up to `limit` pending items not in `skip`
/// * `process_item` - Transforms one item; errors exclude only that item
/// * `commit_batch` - Persists outputs before the deadline and returns how
///   many upstream rows it marked processed
///
/// # Returns
///
/// * `Ok(DrainReport)` - The loop ran out of work or hit the commit cap
/// * `Err(HarvestError)` - Selecting a batch failed
pub async fn drain<T, O, F, P, Fut, C>(
    stage: &'static str,
    options: &DrainOptions,
    mut fetch_batch: F,
    process_item: P,
    mut commit_batch: C,
) -> Result<DrainReport>
where
    T: WorkItem,
    F: FnMut(usize, &[String]) -> Result<BatchFetch<T>>,
    P: Fn(T) -> Fut,
    Fut: Future<Output = std::result::Result<O, ItemError>>,
    C: FnMut(Vec<O>, Instant) -> Result<usize>,
{
    let mut report = DrainReport {
        stage,
        batches: 0,
        committed: 0,
        item_failures: 0,
        commit_failures: 0,
        stop: StopReason::Exhausted,
    };
    let mut skip: Vec<String> = Vec::new();
    let mut consecutive_commit_failures = 0u32;

    tracing::info!("Starting {} drain (batch size {})", stage, options.batch_size);

    loop {
        let items = match fetch_batch(options.batch_size, &skip)? {
            BatchFetch::Ready(items) if !items.is_empty() => items,
            _ => {
                report.stop = StopReason::Exhausted;
                break;
            }
        };
        report.batches += 1;

        let keys: Vec<String> = items.iter().map(|item| item.key().to_string()).collect();
        let results = join_all(items.into_iter().map(&process_item)).await;

        let mut outputs = Vec::with_capacity(results.len());
        let mut succeeded: Vec<String> = Vec::with_capacity(results.len());
        let mut failed = 0u64;
        for (key, result) in keys.into_iter().zip(results) {
            match result {
                Ok(output) => {
                    outputs.push(output);
                    succeeded.push(key);
                }
                Err(e) => {
                    tracing::warn!("{}: skipping {}: {}", stage, key, e);
                    failed += 1;
                    skip.push(key);
                }
            }
        }

        tracing::info!(
            "{} batch {}: {} ok, {} failed",
            stage,
            report.batches,
            outputs.len(),
            failed
        );
        report.item_failures += failed;

        if outputs.is_empty() {
            continue;
        }

        let deadline = Instant::now() + options.transaction_timeout;
        match commit_batch(outputs, deadline) {
            Ok(marked) => {
                consecutive_commit_failures = 0;
                report.committed += marked as u64;
                // Rows that stay unmarked would be reselected forever
                if marked < succeeded.len() {
                    skip.extend(succeeded);
                }
            }
            Err(e) => {
                tracing::error!("{} batch {} rolled back: {}", stage, report.batches, e);
                report.commit_failures += 1;
                consecutive_commit_failures += 1;
                if consecutive_commit_failures >= options.max_commit_failures {
                    report.stop = StopReason::CommitFailures;
                    break;
                }
            }
        }
    }

    tracing::info!(
        "{} drain finished: {} batches, {} committed, {} item failures, {} rolled back ({:?})",
        stage,
        report.batches,
        report.committed,
        report.item_failures,
        report.commit_failures,
        report.stop
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;
    use crate::HarvestError;
    use std::cell::RefCell;
    use std::collections::BTreeSet;

    #[derive(Debug, Clone)]
    struct Job(String);

    impl WorkItem for Job {
        fn key(&self) -> &str {
            &self.0
        }
    }

    /// Ordered pending keys plus the set marked done
    struct FakeTable {
        pending: Vec<String>,
        done: BTreeSet<String>,
        selections: u32,
    }

    impl FakeTable {
        fn new(keys: impl IntoIterator<Item = String>) -> RefCell<Self> {
            RefCell::new(Self {
                pending: keys.into_iter().collect(),
                done: BTreeSet::new(),
                selections: 0,
            })
        }
    }

    fn options(batch_size: usize) -> DrainOptions {
        DrainOptions {
            batch_size,
            transaction_timeout: Duration::from_secs(5),
            max_commit_failures: 3,
        }
    }

    fn select(table: &RefCell<FakeTable>, limit: usize, skip: &[String]) -> Result<BatchFetch<Job>> {
        let mut t = table.borrow_mut();
        t.selections += 1;
        let items = t
            .pending
            .iter()
            .filter(|k| !t.done.contains(*k) && !skip.contains(*k))
            .take(limit)
            .cloned()
            .map(Job)
            .collect();
        Ok(BatchFetch::from_items(items))
    }

    fn mark(table: &RefCell<FakeTable>, outputs: Vec<String>) -> Result<usize> {
        let mut t = table.borrow_mut();
        let mut marked = 0;
        for key in outputs {
            if t.done.insert(key) {
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn succeed(job: Job) -> std::result::Result<String, ItemError> {
        Ok(job.0)
    }

    async fn fail_bad(job: Job) -> std::result::Result<String, ItemError> {
        if job.0.starts_with("bad") {
            Err(ItemError::EmptyHtml(job.0))
        } else {
            Ok(job.0)
        }
    }

    #[tokio::test]
    async fn test_drains_in_ceil_k_over_b_batches() {
        let table = FakeTable::new((0..120).map(|i| format!("k{}", i)));

        let report = drain(
            "test",
            &options(50),
            |limit, skip| select(&table, limit, skip),
            succeed,
            |outputs, _| mark(&table, outputs),
        )
        .await
        .unwrap();

        assert_eq!(report.batches, 3);
        assert_eq!(report.committed, 120);
        assert_eq!(report.stop, StopReason::Exhausted);
        assert_eq!(table.borrow().done.len(), 120);
    }

    #[tokio::test]
    async fn test_item_failure_does_not_sink_batch() {
        let table = FakeTable::new(vec!["a".into(), "bad-1".into(), "b".into(), "c".into()]);

        let report = drain(
            "test",
            &options(4),
            |limit, skip| select(&table, limit, skip),
            fail_bad,
            |outputs, _| mark(&table, outputs),
        )
        .await
        .unwrap();

        assert_eq!(report.batches, 1);
        assert_eq!(report.committed, 3);
        assert_eq!(report.item_failures, 1);
        assert!(!table.borrow().done.contains("bad-1"));
    }

    #[tokio::test]
    async fn test_all_failed_batch_moves_on_to_healthy_items() {
        let table = FakeTable::new(vec![
            "bad-1".into(),
            "bad-2".into(),
            "good-1".into(),
            "good-2".into(),
        ]);

        let report = drain(
            "test",
            &options(2),
            |limit, skip| select(&table, limit, skip),
            fail_bad,
            |outputs, _| mark(&table, outputs),
        )
        .await
        .unwrap();

        assert_eq!(report.committed, 2);
        assert_eq!(report.item_failures, 2);
        assert_eq!(report.batches, 2);
        assert!(table.borrow().done.contains("good-2"));
    }

    #[tokio::test]
    async fn test_stops_after_consecutive_commit_failures() {
        let table = FakeTable::new(vec!["a".into(), "b".into()]);

        let report = drain(
            "test",
            &options(10),
            |limit, skip| select(&table, limit, skip),
            succeed,
            |_outputs: Vec<String>, _| Err(HarvestError::Storage(StorageError::TransactionTimeout("test"))),
        )
        .await
        .unwrap();

        assert_eq!(report.stop, StopReason::CommitFailures);
        assert_eq!(report.commit_failures, 3);
        assert_eq!(report.batches, 3);
        assert!(table.borrow().done.is_empty());
    }

    #[tokio::test]
    async fn test_rolled_back_batch_is_reselected() {
        let table = FakeTable::new(vec!["a".into(), "b".into()]);
        let attempts = RefCell::new(0);

        let report = drain(
            "test",
            &options(10),
            |limit, skip| select(&table, limit, skip),
            succeed,
            |outputs, _| {
                *attempts.borrow_mut() += 1;
                if *attempts.borrow() == 1 {
                    return Err(HarvestError::Storage(StorageError::TransactionTimeout("test")));
                }
                mark(&table, outputs)
            },
        )
        .await
        .unwrap();

        assert_eq!(report.commit_failures, 1);
        assert_eq!(report.committed, 2);
        assert_eq!(report.stop, StopReason::Exhausted);
    }

    #[tokio::test]
    async fn test_unmarked_commit_does_not_loop_forever() {
        let table = FakeTable::new(vec!["a".into()]);

        let report = drain(
            "test",
            &options(10),
            |limit, skip| select(&table, limit, skip),
            succeed,
            |_outputs: Vec<String>, _| Ok(0),
        )
        .await
        .unwrap();

        assert_eq!(report.batches, 1);
        assert_eq!(report.committed, 0);
        assert_eq!(table.borrow().selections, 2);
    }

    #[tokio::test]
    async fn test_selection_error_propagates() {
        let result = drain(
            "test",
            &options(10),
            |_limit, _skip| -> Result<BatchFetch<Job>> { Err(HarvestError::LockPoisoned) },
            succeed,
            |outputs: Vec<String>, _| Ok(outputs.len()),
        )
        .await;

        assert!(matches!(result, Err(HarvestError::LockPoisoned)));
    }

    #[test]
    fn test_batch_fetch_from_items() {
        assert!(matches!(BatchFetch::<Job>::from_items(vec![]), BatchFetch::Exhausted));
        assert!(matches!(
            BatchFetch::from_items(vec![Job("a".into())]),
            BatchFetch::Ready(items) if items.len() == 1
        ));
    }

    #[test]
    fn test_options_from_config() {
        let config = CrawlerConfig::default();
        let options = DrainOptions::from_config(&config);
        assert_eq!(options.batch_size, 50);
        assert_eq!(options.transaction_timeout, Duration::from_secs(200));
        assert_eq!(options.max_commit_failures, 3);
    }
}
