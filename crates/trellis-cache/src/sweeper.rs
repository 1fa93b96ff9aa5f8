//! Background expiry sweep.
//!
//! The sweeper is a plain OS thread that wakes every `interval`, takes the
//! cache's write lock once, and drops every expired entry. It holds only a
//! weak reference to the cache, so it exits on its own if the cache is
//! dropped first. [`SweepHandle`] stops it deterministically: calling
//! [`SweepHandle::shutdown`] (or dropping the handle) signals the thread and
//! joins it before returning.

use crate::Inner;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Weak;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Owner of a running sweeper thread.
#[derive(Debug)]
pub struct SweepHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
    interval: Duration,
}

impl SweepHandle {
    pub(crate) fn spawn<V>(inner: Weak<Inner<V>>, interval: Duration) -> std::io::Result<Self>
    where
        V: Send + Sync + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread = thread::Builder::new()
            .name("trellis-cache-sweeper".to_string())
            .spawn(move || {
                debug!(interval_ms = interval.as_millis(), "Cache sweeper started");
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            let Some(inner) = inner.upgrade() else {
                                debug!("Cache dropped, sweeper exiting");
                                break;
                            };
                            let removed = inner.purge_expired();
                            if removed > 0 {
                                info!(removed, "Swept expired cache entries");
                            }
                        }
                        // Explicit stop, or the handle was dropped without one.
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("Cache sweeper stopped");
            })?;

        Ok(Self {
            stop: Some(stop_tx),
            thread: Some(thread),
            interval,
        })
    }

    /// The configured interval between sweeps.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns `true` while the sweeper thread has not exited.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop the sweeper and wait for its thread to exit.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        if let Some(stop) = self.stop.take() {
            // The thread may already be gone if the cache was dropped.
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Cache sweeper thread panicked");
            }
        }
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
