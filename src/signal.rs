//! Exactly-once completion signalling.
//!
//! Connect, reconnect, and teardown paths can race to report the same
//! outcome; `CompletionSignal` guarantees a single resolution no matter how
//! many paths call [`CompletionSignal::complete`]. Handles are cheap to
//! clone so each racing path can hold its own.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Cloneable handle that resolves its paired [`Completion`] at most once
#[derive(Debug, Clone)]
pub struct CompletionSignal {
    tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl CompletionSignal {
    /// Create a signal together with the future it resolves
    pub fn new() -> (Self, Completion) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            Completion { rx },
        )
    }

    /// Resolve the paired future
    ///
    /// Returns `true` for the call that actually fired the signal, `false`
    /// for every later call. Safe to invoke from any number of racing paths.
    pub fn complete(&self) -> bool {
        let sender = self
            .tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match sender {
            Some(tx) => {
                let _ = tx.send(());
                true
            }
            None => false,
        }
    }

    /// Whether the signal has already fired
    pub fn is_complete(&self) -> bool {
        self.tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }
}

/// Future half of a [`CompletionSignal`]
///
/// Resolves when the signal fires, or when every handle has been dropped
/// without firing (the guarded operation cannot complete anymore).
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<()>,
}

impl Future for Completion {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completes_exactly_once() {
        let (signal, completion) = CompletionSignal::new();

        assert!(!signal.is_complete());
        assert!(signal.complete());
        assert!(!signal.complete());
        assert!(signal.is_complete());

        completion.await;
    }

    #[tokio::test]
    async fn test_racing_handles_resolve_once() {
        let (signal, completion) = CompletionSignal::new();
        let clone = signal.clone();

        let fired_by_clone = clone.complete();
        let fired_by_original = signal.complete();

        assert!(fired_by_clone);
        assert!(!fired_by_original);
        completion.await;
    }

    #[tokio::test]
    async fn test_dropped_handles_resolve() {
        let (signal, completion) = CompletionSignal::new();
        drop(signal);

        // all handles gone without firing still resolves the future
        completion.await;
    }
}
