//! Background loading of a results document.
//!
//! The file is read and parsed on a worker thread. Entries are classified
//! one at a time; after each one the worker reports progress, yields, and
//! checks the cancellation token. The interactive thread polls the handle
//! once per frame.

use super::types::RawResult;
use crate::error::{Result, ViewerError};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

/// Required top-level key of a results document.
pub const RESULTS_KEY: &str = "results";

/// Shared flag used to ask a running load to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadProgress {
    pub completed: usize,
    pub total: usize,
    /// 0 to 100.
    pub percent: f64,
}

impl LoadProgress {
    fn new(completed: usize, total: usize) -> Self {
        let percent = if total == 0 {
            100.0
        } else {
            completed as f64 / total as f64 * 100.0
        };
        Self {
            completed,
            total,
            percent,
        }
    }

    pub fn message(&self) -> String {
        format!(
            "Loading entry {}/{} ({:.0}%)",
            self.completed, self.total, self.percent
        )
    }
}

#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(Vec<RawResult>),
    Cancelled,
    Failed(ViewerError),
}

/// Pull the `results` array out of a parsed document.
pub fn results_array(document: Value) -> Result<Vec<Value>> {
    let Value::Object(mut map) = document else {
        return Err(ViewerError::Validation(
            "top-level value must be an object".to_string(),
        ));
    };
    match map.remove(RESULTS_KEY) {
        Some(Value::Array(entries)) => Ok(entries),
        Some(_) => Err(ViewerError::Validation(format!(
            "'{}' must be an array",
            RESULTS_KEY
        ))),
        None => Err(ViewerError::Validation(format!(
            "missing required key '{}'",
            RESULTS_KEY
        ))),
    }
}

/// Classify every entry of `document`, reporting progress after each one.
/// Stops with `Cancelled` at the first check after `token` is set; entries
/// read so far are dropped.
pub fn read_entries<P>(document: Value, token: &CancelToken, mut on_progress: P) -> LoadOutcome
where
    P: FnMut(LoadProgress),
{
    let entries = match results_array(document) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("{}", e);
            return LoadOutcome::Failed(e);
        }
    };

    let total = entries.len();
    let mut loaded = Vec::with_capacity(total);
    for (i, value) in entries.into_iter().enumerate() {
        loaded.push(RawResult::classify(value));
        on_progress(LoadProgress::new(i + 1, total));

        thread::yield_now();
        if token.is_cancelled() {
            info!("Load cancelled after {}/{} entries", i + 1, total);
            return LoadOutcome::Cancelled;
        }
    }

    LoadOutcome::Loaded(loaded)
}

/// Parse `content` and classify its entries.
pub fn read_str<P>(content: &str, token: &CancelToken, on_progress: P) -> LoadOutcome
where
    P: FnMut(LoadProgress),
{
    match serde_json::from_str::<Value>(content) {
        Ok(document) => read_entries(document, token, on_progress),
        Err(e) => LoadOutcome::Failed(e.into()),
    }
}

fn read_file<P>(path: &Path, token: &CancelToken, on_progress: P) -> LoadOutcome
where
    P: FnMut(LoadProgress),
{
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => return LoadOutcome::Failed(ViewerError::io(path, e)),
    };
    if token.is_cancelled() {
        return LoadOutcome::Cancelled;
    }
    read_str(&content, token, on_progress)
}

/// A load running on a worker thread.
pub struct LoadHandle {
    path: PathBuf,
    token: CancelToken,
    progress_rx: Receiver<LoadProgress>,
    outcome_rx: Receiver<LoadOutcome>,
    latest: Option<LoadProgress>,
}

/// Start loading `path` in the background.
pub fn spawn_load(path: impl Into<PathBuf>) -> LoadHandle {
    let path = path.into();
    let token = CancelToken::new();
    let (progress_tx, progress_rx) = channel();
    let (outcome_tx, outcome_rx) = channel();

    info!("Loading results from {}", path.display());
    let worker_path = path.clone();
    let worker_token = token.clone();
    thread::spawn(move || {
        let outcome = read_file(&worker_path, &worker_token, |progress| {
            let _ = progress_tx.send(progress);
        });
        if let LoadOutcome::Loaded(entries) = &outcome {
            info!(
                "Loaded {} entries from {}",
                entries.len(),
                worker_path.display()
            );
        }
        let _ = outcome_tx.send(outcome);
    });

    LoadHandle {
        path,
        token,
        progress_rx,
        outcome_rx,
        latest: None,
    }
}

impl LoadHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ask the worker to stop at its next check.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Most recent progress seen by `poll` or `drain_progress`.
    pub fn progress(&self) -> Option<&LoadProgress> {
        self.latest.as_ref()
    }

    /// Updates received since the last call, oldest first.
    pub fn drain_progress(&mut self) -> Vec<LoadProgress> {
        let updates: Vec<LoadProgress> = self.progress_rx.try_iter().collect();
        if let Some(last) = updates.last() {
            self.latest = Some(*last);
        }
        updates
    }

    /// Non-blocking check for the outcome.
    pub fn poll(&mut self) -> Option<LoadOutcome> {
        self.drain_progress();
        match self.outcome_rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(LoadOutcome::Failed(
                ViewerError::Validation("loader stopped without a result".to_string()),
            )),
        }
    }

    /// Block until the worker finishes.
    #[cfg(test)]
    pub fn wait(&self) -> LoadOutcome {
        self.outcome_rx.recv().unwrap_or_else(|_| {
            LoadOutcome::Failed(ViewerError::Validation(
                "loader stopped without a result".to_string(),
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::normalize::normalize;
    use crate::results::table::{TableModel, WidgetFactory};
    use crate::results::types::{CellWidget, NormalizedRow};
    use serde_json::json;
    use std::io::Write;

    fn document(n: usize) -> Value {
        let entries: Vec<Value> = (0..n)
            .map(|i| json!({"query_id": format!("Q{}", i), "query_len": 100 + i}))
            .collect();
        json!({ "results": entries })
    }

    struct NoWidgets;

    impl WidgetFactory for NoWidgets {
        type Widget = ();

        fn build(&self, _: usize, _: &NormalizedRow, _: &CellWidget) -> Result<()> {
            Ok(())
        }

        fn fallback(&self, _: &ViewerError) {}
    }

    #[test]
    fn test_progress_strictly_increasing_to_100() {
        let mut seen = Vec::new();
        let outcome = read_entries(document(100), &CancelToken::new(), |p| seen.push(p.percent));
        let LoadOutcome::Loaded(entries) = outcome else {
            panic!("expected loaded outcome");
        };
        assert_eq!(entries.len(), 100);
        assert_eq!(seen.len(), 100);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(*seen.last().unwrap(), 100.0);
    }

    #[test]
    fn test_missing_results_fails_before_progress() {
        let mut updates = 0;
        let outcome = read_entries(json!({"data": []}), &CancelToken::new(), |_| updates += 1);
        assert!(matches!(outcome, LoadOutcome::Failed(ViewerError::Validation(_))));
        assert_eq!(updates, 0);

        let outcome = read_entries(json!({"results": {}}), &CancelToken::new(), |_| updates += 1);
        assert!(matches!(outcome, LoadOutcome::Failed(ViewerError::Validation(_))));
        let outcome = read_entries(json!([1, 2]), &CancelToken::new(), |_| updates += 1);
        assert!(matches!(outcome, LoadOutcome::Failed(ViewerError::Validation(_))));
        assert_eq!(updates, 0);
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let outcome = read_str("{ not json", &CancelToken::new(), |_| {});
        assert!(matches!(outcome, LoadOutcome::Failed(ViewerError::Json(_))));
    }

    #[test]
    fn test_cancel_after_third_update() {
        let token = CancelToken::new();
        let mut updates = 0;
        let outcome = read_entries(document(10), &token, |_| {
            updates += 1;
            if updates == 3 {
                token.cancel();
            }
        });
        assert!(matches!(outcome, LoadOutcome::Cancelled));
        assert_eq!(updates, 3);

        // Nothing reaches the table from a cancelled load.
        let mut model: TableModel<()> = TableModel::new();
        if let LoadOutcome::Loaded(entries) = outcome {
            model.append_batch(entries.iter().map(normalize).collect(), &NoWidgets);
        }
        assert_eq!(model.row_count(), 0);
    }

    #[test]
    fn test_empty_results_loads_nothing() {
        let mut updates = 0;
        let outcome = read_entries(json!({"results": []}), &CancelToken::new(), |_| updates += 1);
        assert!(matches!(outcome, LoadOutcome::Loaded(ref e) if e.is_empty()));
        assert_eq!(updates, 0);
    }

    #[test]
    fn test_spawn_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(document(25).to_string().as_bytes()).unwrap();

        let mut handle = spawn_load(file.path());
        let outcome = handle.wait();
        let updates = handle.drain_progress();

        let LoadOutcome::Loaded(entries) = outcome else {
            panic!("expected loaded outcome");
        };
        assert_eq!(entries.len(), 25);
        assert_eq!(updates.len(), 25);
        assert_eq!(handle.progress().map(|p| p.completed), Some(25));
    }

    #[test]
    fn test_cancel_running_spawned_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(document(200_000).to_string().as_bytes()).unwrap();

        let mut handle = spawn_load(file.path());
        while handle.progress().is_none() {
            handle.drain_progress();
            thread::yield_now();
        }
        handle.cancel();

        let outcome = loop {
            if let Some(outcome) = handle.poll() {
                break outcome;
            }
            thread::yield_now();
        };
        assert!(matches!(outcome, LoadOutcome::Cancelled));
        let completed = handle.progress().map(|p| p.completed).unwrap();
        assert!(completed < 200_000);
    }

    #[test]
    fn test_spawn_load_missing_file() {
        let handle = spawn_load("/nonexistent/results.json");
        assert!(matches!(
            handle.wait(),
            LoadOutcome::Failed(ViewerError::Io { .. })
        ));
    }

    #[test]
    fn test_cancel_before_start() {
        let token = CancelToken::new();
        token.cancel();
        let mut updates = 0;
        let outcome = read_entries(document(5), &token, |_| updates += 1);
        // The first entry is still accounted for before the check.
        assert!(matches!(outcome, LoadOutcome::Cancelled));
        assert_eq!(updates, 1);
    }
}
