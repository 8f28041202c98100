//! Debounced selection watcher.
//!
//! Raw selection changes arrive far more often than they are worth
//! analyzing (every mouse move while dragging). The watcher waits for the
//! selection to settle for `debounce` before running the pipeline and
//! publishes the result on a `watch` channel. Clearing the selection
//! publishes `None` right away.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

use crate::pipeline::SelectionPipeline;
use crate::types::{PageInfo, SelectionData, SelectionSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    pub debounce: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(250),
        }
    }
}

enum Change {
    Update(SelectionSnapshot, PageInfo),
    Clear,
}

/// Handle to the debounce task. Dropping it stops the task.
pub struct SelectionWatcher {
    changes: mpsc::UnboundedSender<Change>,
    current: watch::Receiver<Option<SelectionData>>,
    task: JoinHandle<()>,
}

impl SelectionWatcher {
    /// Spawn the watcher on the current runtime.
    pub fn spawn(pipeline: SelectionPipeline, config: WatcherConfig) -> Self {
        let (changes, rx) = mpsc::unbounded_channel();
        let (tx, current) = watch::channel(None);
        let task = tokio::spawn(run(pipeline, config.debounce, rx, tx));
        Self {
            changes,
            current,
            task,
        }
    }

    /// Report a raw selection change.
    pub fn update(&self, snapshot: SelectionSnapshot, page: PageInfo) {
        let change = if snapshot.is_empty() {
            Change::Clear
        } else {
            Change::Update(snapshot, page)
        };
        let _ = self.changes.send(change);
    }

    /// Report that the selection was cleared.
    pub fn clear(&self) {
        let _ = self.changes.send(Change::Clear);
    }

    /// Receiver of committed selections.
    pub fn subscribe(&self) -> watch::Receiver<Option<SelectionData>> {
        self.current.clone()
    }

    /// Most recently committed selection.
    pub fn current(&self) -> Option<SelectionData> {
        self.current.borrow().clone()
    }
}

impl Drop for SelectionWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    pipeline: SelectionPipeline,
    debounce: Duration,
    mut changes: mpsc::UnboundedReceiver<Change>,
    out: watch::Sender<Option<SelectionData>>,
) {
    let mut pending: Option<(SelectionSnapshot, PageInfo)> = None;
    let mut deadline = Instant::now();

    loop {
        tokio::select! {
            change = changes.recv() => match change {
                None => break,
                Some(Change::Clear) => {
                    pending = None;
                    publish(&out, None);
                }
                Some(Change::Update(snapshot, page)) => {
                    trace!("Selection changed, debouncing");
                    pending = Some((snapshot, page));
                    deadline = Instant::now() + debounce;
                }
            },
            _ = sleep_until(deadline), if pending.is_some() => {
                if let Some((snapshot, page)) = pending.take() {
                    let data = pipeline.analyze(&snapshot, &page);
                    debug!("Selection committed: {}", data.is_some());
                    publish(&out, data);
                }
            }
        }
    }
}

fn publish(out: &watch::Sender<Option<SelectionData>>, data: Option<SelectionData>) {
    out.send_if_modified(|current| {
        if *current == data {
            false
        } else {
            *current = data;
            true
        }
    });
}
