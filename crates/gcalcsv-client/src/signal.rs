//! Cancellation for the event traversal.
//!
//! A traversal stops when its deadline elapses or when an interrupt is
//! requested through the [`CancelHandle`] (Ctrl-C in the binary):
//! - the deadline is fixed once, when the signal is created
//! - the interrupt is a `watch` flag that only ever goes from false to true

use std::fmt;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, warn};

/// Why a traversal was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The fetch deadline elapsed.
    DeadlineExceeded,
    /// The user interrupted the run.
    Interrupted,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeadlineExceeded => write!(f, "deadline exceeded"),
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Requests cancellation of the paired [`CancelSignal`].
#[derive(Debug)]
pub struct CancelHandle {
    interrupt_tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Marks the traversal as interrupted.
    pub fn cancel(&self) {
        // send_replace never fails, even with no receiver left
        self.interrupt_tx.send_replace(true);
    }
}

/// Observed by the collector at every page boundary.
#[derive(Debug)]
pub struct CancelSignal {
    deadline: Option<Instant>,
    interrupt_rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// Creates a signal whose deadline is `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> (Self, CancelHandle) {
        Self::build(Some(Instant::now() + timeout))
    }

    /// Creates a signal that only fires on interrupt.
    pub fn without_deadline() -> (Self, CancelHandle) {
        Self::build(None)
    }

    fn build(deadline: Option<Instant>) -> (Self, CancelHandle) {
        let (interrupt_tx, interrupt_rx) = watch::channel(false);
        (
            Self {
                deadline,
                interrupt_rx,
            },
            CancelHandle { interrupt_tx },
        )
    }

    /// Returns the reason if the signal has already fired.
    pub fn check(&self) -> Result<(), CancelReason> {
        if *self.interrupt_rx.borrow() {
            return Err(CancelReason::Interrupted);
        }
        if self.deadline.is_some_and(|at| at <= Instant::now()) {
            return Err(CancelReason::DeadlineExceeded);
        }
        Ok(())
    }

    /// Resolves once the signal fires.
    ///
    /// If every handle is dropped only the deadline remains.
    pub async fn triggered(&mut self) -> CancelReason {
        let deadline = self.deadline;
        let expired = async move {
            match deadline {
                Some(at) => time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        let interrupt_rx = &mut self.interrupt_rx;
        let interrupted = async move {
            let closed = interrupt_rx.wait_for(|set| *set).await.is_err();
            if closed {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            () = interrupted => CancelReason::Interrupted,
            () = expired => CancelReason::DeadlineExceeded,
        }
    }
}

/// Spawns a task that cancels `handle` on Ctrl-C.
///
/// The caller aborts the returned task once the traversal is over.
pub fn spawn_interrupt_listener(handle: CancelHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("received interrupt, stopping");
                handle.cancel();
            }
            Err(e) => debug!("unable to listen for interrupt: {}", e),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_signal_is_not_triggered() {
        let (signal, _handle) = CancelSignal::with_timeout(Duration::from_secs(10));
        assert_eq!(signal.check(), Ok(()));
    }

    #[tokio::test]
    async fn cancel_is_observed_by_check_and_triggered() {
        let (mut signal, handle) = CancelSignal::without_deadline();
        handle.cancel();
        assert_eq!(signal.check(), Err(CancelReason::Interrupted));
        assert_eq!(signal.triggered().await, CancelReason::Interrupted);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_fires_after_timeout() {
        let (mut signal, _handle) = CancelSignal::with_timeout(Duration::from_secs(10));
        let started = Instant::now();
        assert_eq!(signal.triggered().await, CancelReason::DeadlineExceeded);
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert_eq!(signal.check(), Err(CancelReason::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_handle_leaves_the_deadline() {
        let (mut signal, handle) = CancelSignal::with_timeout(Duration::from_secs(3));
        drop(handle);
        assert_eq!(signal.triggered().await, CancelReason::DeadlineExceeded);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_wins_over_later_deadline() {
        let (mut signal, handle) = CancelSignal::with_timeout(Duration::from_secs(60));
        tokio::spawn(async move {
            time::sleep(Duration::from_secs(1)).await;
            handle.cancel();
        });
        assert_eq!(signal.triggered().await, CancelReason::Interrupted);
    }

    #[test]
    fn reasons_display() {
        assert_eq!(CancelReason::DeadlineExceeded.to_string(), "deadline exceeded");
        assert_eq!(CancelReason::Interrupted.to_string(), "interrupted");
    }
}
