use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::error::{AlignError, Result};
use crate::types::{AlignmentResult, LineAlignment};

/// Events emitted while a track is being aligned.
#[derive(Debug, Clone)]
pub enum AlignmentProgress {
    /// About to run the model over chunk `chunk_index` of `total_chunks`.
    Processing {
        chunk_index: usize,
        total_chunks: usize,
    },
    /// Lines resolved so far, in track time.
    PartialResult { lines: Vec<LineAlignment> },
    Complete(AlignmentResult),
    /// An attempt failed. `retries_left` is 0 when the run is over.
    Failed {
        error: Arc<AlignError>,
        retries_left: u32,
    },
}

impl AlignmentProgress {
    pub fn is_terminal(&self) -> bool {
        match self {
            AlignmentProgress::Complete(_) => true,
            AlignmentProgress::Failed { retries_left, .. } => *retries_left == 0,
            _ => false,
        }
    }
}

/// Handle to an alignment running on its own thread. Dropping the handle
/// cancels the run and waits for the thread.
pub struct AlignmentJob {
    events: Receiver<AlignmentProgress>,
    cancelled: Arc<AtomicBool>,
    join: Option<JoinHandle<Result<AlignmentResult>>>,
}

impl AlignmentJob {
    pub(crate) fn new(
        events: Receiver<AlignmentProgress>,
        cancelled: Arc<AtomicBool>,
        join: JoinHandle<Result<AlignmentResult>>,
    ) -> Self {
        Self {
            events,
            cancelled,
            join: Some(join),
        }
    }

    pub fn events(&self) -> &Receiver<AlignmentProgress> {
        &self.events
    }

    pub fn try_next(&self) -> Option<AlignmentProgress> {
        self.events.try_recv().ok()
    }

    /// Waits up to `timeout` for the next event. `None` on timeout or once
    /// the worker has finished and every event was drained.
    pub fn next_timeout(&self, timeout: Duration) -> Option<AlignmentProgress> {
        self.events.recv_timeout(timeout).ok()
    }

    /// Asks the worker to stop before its next chunk.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Blocks until the worker finishes and returns its outcome.
    pub fn wait(mut self) -> Result<AlignmentResult> {
        self.join_worker()
    }

    fn join_worker(&mut self) -> Result<AlignmentResult> {
        match self.join.take() {
            Some(join) => join.join().unwrap_or_else(|_| {
                Err(AlignError::inference("running alignment", "worker panicked"))
            }),
            None => Err(AlignError::Cancelled),
        }
    }
}

impl Drop for AlignmentJob {
    fn drop(&mut self) {
        if self.join.is_some() {
            self.cancel();
            let _ = self.join_worker();
        }
    }
}
