// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cooperative cancellation shared between the signal handler and the loop

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Cloneable one-shot cancellation token
///
/// Triggering drops the internal sender, which wakes every waiter at once.
#[derive(Clone)]
pub struct ShutdownSignal {
    inner: Arc<Inner>,
}

struct Inner {
    triggered: AtomicBool,
    sender: Mutex<Option<Sender<()>>>,
    receiver: Receiver<()>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (sender, receiver) = channel::bounded(0);
        Self {
            inner: Arc::new(Inner {
                triggered: AtomicBool::new(false),
                sender: Mutex::new(Some(sender)),
                receiver,
            }),
        }
    }

    /// Fire the signal. Safe to call from a signal handler thread, and more
    /// than once.
    pub fn trigger(&self) {
        self.inner.triggered.store(true, Ordering::SeqCst);
        self.inner.sender.lock().take();
    }

    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::SeqCst)
    }

    /// Sleep for up to `timeout`, returning early with `true` if the signal fires
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_triggered() {
            return true;
        }
        match self.inner.receiver.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => self.is_triggered(),
            _ => true,
        }
    }

    /// Disconnects when the signal fires; for use in `select!`
    pub(crate) fn receiver(&self) -> &Receiver<()> {
        &self.inner.receiver
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("triggered", &self.is_triggered())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_wait_times_out_when_not_triggered() {
        let signal = ShutdownSignal::new();
        let started = Instant::now();
        assert!(!signal.wait_timeout(Duration::from_millis(30)));
        assert!(started.elapsed() >= Duration::from_millis(30));
        assert!(!signal.is_triggered());
    }

    #[test]
    fn test_trigger_wakes_waiter_from_another_thread() {
        let signal = ShutdownSignal::new();
        let remote = signal.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.trigger();
        });

        let started = Instant::now();
        assert!(signal.wait_timeout(Duration::from_secs(5)));
        assert!(started.elapsed() < Duration::from_secs(2));
        handle.join().unwrap();
    }

    #[test]
    fn test_trigger_twice_is_harmless() {
        let signal = ShutdownSignal::new();
        signal.trigger();
        signal.trigger();
        assert!(signal.is_triggered());
        assert!(signal.wait_timeout(Duration::ZERO));
    }
}
