use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, Sender};

use crate::session::domain::task_scheduler::{
    RepeatingFn, RepeatingTask, Task, TaskScheduler, TimerHandle,
};

/// Runs session work on plain OS threads.
///
/// Layout: `ticker thread → one worker thread per tick`
///
/// The ticker only waits on a `crossbeam_channel::tick` and a cancel
/// channel; tick work runs on its own thread so a slow submission never
/// delays the next tick.
#[derive(Default)]
pub struct ThreadScheduler {
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for every one-shot task spawned so far, e.g. a session close
    /// request that should reach the backend before the process exits.
    pub fn join_pending(&self) {
        let handles: Vec<_> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in handles {
            if handle.join().is_err() {
                log::warn!("Background task panicked");
            }
        }
    }
}

impl TaskScheduler for ThreadScheduler {
    fn spawn(&self, task: Task) {
        let handle = thread::spawn(task);
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    fn schedule_repeating(&self, interval: Duration, task: RepeatingFn) -> RepeatingTask {
        let cancelled = Arc::new(AtomicBool::new(false));
        let (cancel_tx, cancel_rx) = crossbeam_channel::bounded::<()>(1);
        let ticker_cancelled = cancelled.clone();

        let ticker = thread::spawn(move || {
            let ticks = crossbeam_channel::tick(interval);
            loop {
                select! {
                    recv(cancel_rx) -> _ => break,
                    recv(ticks) -> _ => {
                        // A tick and a cancel can be ready together; the flag
                        // decides so no tick starts once cancel() has begun.
                        if ticker_cancelled.load(Ordering::SeqCst) {
                            break;
                        }
                        let task = task.clone();
                        thread::spawn(move || task());
                    }
                }
            }
        });

        RepeatingTask::new(Box::new(ThreadTimer {
            cancelled,
            cancel_tx: Some(cancel_tx),
            ticker: Some(ticker),
        }))
    }
}

struct ThreadTimer {
    cancelled: Arc<AtomicBool>,
    cancel_tx: Option<Sender<()>>,
    ticker: Option<JoinHandle<()>>,
}

impl TimerHandle for ThreadTimer {
    fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        // Dropping the sender disconnects the channel and wakes the ticker.
        self.cancel_tx.take();
        if let Some(ticker) = self.ticker.take() {
            if ticker.join().is_err() {
                log::warn!("Capture ticker thread panicked");
            }
        }
    }
}
