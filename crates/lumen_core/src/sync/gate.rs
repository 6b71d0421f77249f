//! Open/closed gate workers pass before taking a job.

use parking_lot::{Condvar, Mutex};

/// A gate that blocks callers of [`PauseGate::wait_open`] while closed.
pub struct PauseGate {
    /// True while paused.
    closed: Mutex<bool>,
    /// Signalled when the gate opens.
    opened: Condvar,
}

impl PauseGate {
    /// Creates an open gate.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            closed: Mutex::new(false),
            opened: Condvar::new(),
        }
    }

    /// Closes the gate. Returns false if it was already closed.
    pub fn close(&self) -> bool {
        let mut closed = self.closed.lock();
        !std::mem::replace(&mut *closed, true)
    }

    /// Opens the gate and wakes every waiter. Returns false if it was
    /// already open.
    pub fn open(&self) -> bool {
        let mut closed = self.closed.lock();
        let was_closed = std::mem::replace(&mut *closed, false);
        self.opened.notify_all();
        was_closed
    }

    /// Returns true while the gate is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed.lock()
    }

    /// Blocks until the gate is open. Returns true if it had to wait.
    pub fn wait_open(&self) -> bool {
        let mut closed = self.closed.lock();
        let waited = *closed;
        while *closed {
            self.opened.wait(&mut closed);
        }
        waited
    }
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PauseGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PauseGate")
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_open_gate_does_not_block() {
        let gate = PauseGate::new();
        assert!(!gate.is_closed());
        assert!(!gate.wait_open());
    }

    #[test]
    fn test_close_and_open_report_transitions() {
        let gate = PauseGate::new();
        assert!(gate.close());
        assert!(!gate.close());
        assert!(gate.is_closed());
        assert!(gate.open());
        assert!(!gate.open());
    }

    #[test]
    fn test_waiters_released_on_open() {
        let gate = Arc::new(PauseGate::new());
        gate.close();

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let gate = Arc::clone(&gate);
                thread::spawn(move || gate.wait_open())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        assert!(waiters.iter().all(|w| !w.is_finished()));

        gate.open();
        for waiter in waiters {
            assert!(waiter.join().unwrap());
        }
    }
}
