//! Popup lifecycle management.
//!
//! The authorization dialog runs in an external, cross-origin window. Its
//! contents are not observable from this side, so the only lifecycle fact
//! available is the window's closed flag. [`watch_closed`] samples that flag
//! on a fixed interval and delivers a one-shot [`ClosureSignal`] when it
//! flips - trading up to one interval of latency for independence from any
//! cross-origin messaging.
//!
//! The sampling task is cancelled exactly once on every exit path: it stops
//! itself after firing, and [`ClosureSignal`] aborts it on drop when a
//! session is abandoned mid-wait.
//!
//! Hosts plug in via [`PopupHost`]; [`ManualPopupHost`] is the shipped
//! in-memory implementation for tests and embedding hosts that drive window
//! state themselves.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// A handle to an open authorization window.
///
/// The only observable fact is whether the window has closed; why it closed
/// (success, denial, or the user dismissing it) is not knowable from here.
pub trait PopupHandle: Send + Sync {
    /// Check the window's closed flag. Called from the sampling task, so it
    /// must be cheap and non-blocking.
    fn is_closed(&self) -> bool;
}

/// Host environment capable of opening authorization windows.
#[async_trait]
pub trait PopupHost: Send + Sync {
    /// Open an external window at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PopupBlocked`] when the host refuses to create the
    /// window. There is no retry; the caller surfaces the error.
    async fn open(&self, url: &str) -> Result<Box<dyn PopupHandle>>;
}

/// One-shot notification that a watched popup has closed.
///
/// Dropping the signal without awaiting it aborts the sampling task, so an
/// abandoned wait never leaks a timer.
#[derive(Debug)]
pub struct ClosureSignal {
    rx: oneshot::Receiver<()>,
    task: JoinHandle<()>,
}

impl ClosureSignal {
    /// Wait until the popup's closed flag has been observed.
    pub async fn wait(mut self) {
        // The sender is only dropped after sending or when the task is
        // aborted, and we hold the abort handle until this returns.
        let _ = (&mut self.rx).await;
    }
}

impl Drop for ClosureSignal {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start sampling a popup's closed flag every `interval`.
///
/// The returned [`ClosureSignal`] fires at most once. Sampling stops
/// immediately after the closed flag is first observed; no further
/// `is_closed` calls are made after that.
#[must_use]
pub fn watch_closed(handle: Box<dyn PopupHandle>, interval: Duration) -> ClosureSignal {
    let (tx, rx) = oneshot::channel();
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            trace!("sampling popup closed flag");
            if handle.is_closed() {
                debug!("popup closed");
                let _ = tx.send(());
                break;
            }
        }
    });

    ClosureSignal { rx, task }
}

/// An in-memory popup whose closed flag is driven by the caller.
///
/// Clones share the same flag, so a test can keep one clone and hand the
/// other to the watcher.
#[derive(Debug, Clone, Default)]
pub struct ManualPopup {
    closed: Arc<AtomicBool>,
}

impl ManualPopup {
    /// Create an open popup.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the popup as closed.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl PopupHandle for ManualPopup {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// In-memory popup host for tests and embedding hosts.
///
/// Records every opened URL and keeps a handle to each popup so the caller
/// can close it. Can be configured to refuse opening, simulating a popup
/// blocker.
#[derive(Debug, Clone, Default)]
pub struct ManualPopupHost {
    blocked: bool,
    opened: Arc<Mutex<Vec<(String, ManualPopup)>>>,
}

impl ManualPopupHost {
    /// Create a host that opens every request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a host that refuses every open request.
    #[must_use]
    pub fn blocked() -> Self {
        Self {
            blocked: true,
            opened: Arc::default(),
        }
    }

    /// URLs opened so far, in order.
    #[must_use]
    pub fn opened_urls(&self) -> Vec<String> {
        self.opened
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Number of popups opened so far.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.opened
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// The most recently opened popup, if any.
    #[must_use]
    pub fn last_popup(&self) -> Option<ManualPopup> {
        self.opened
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .last()
            .map(|(_, popup)| popup.clone())
    }
}

#[async_trait]
impl PopupHost for ManualPopupHost {
    async fn open(&self, url: &str) -> Result<Box<dyn PopupHandle>> {
        if self.blocked {
            return Err(Error::PopupBlocked);
        }
        let popup = ManualPopup::new();
        self.opened
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((url.to_string(), popup.clone()));
        Ok(Box::new(popup))
    }
}
