use crate::model::Operation;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Single-flight token shared by save and search.
///
/// At most one operation holds the token at a time. Releasing happens when the
/// returned guard drops, and only clears the token the guard acquired.
#[derive(Debug, Clone, Default)]
pub struct FlightGate {
    current: Arc<Mutex<Option<Flight>>>,
    next_id: Arc<AtomicU64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Flight {
    id: u64,
    op: Operation,
}

impl FlightGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the token for `op`, or report which operation holds it.
    pub fn try_acquire(&self, op: Operation) -> Result<FlightGuard, Operation> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = *current {
            return Err(running.op);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        *current = Some(Flight { id, op });
        Ok(FlightGuard {
            gate: self.clone(),
            flight: Flight { id, op },
        })
    }

    /// The operation currently in flight, if any.
    pub fn current(&self) -> Option<Operation> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map(|f| f.op)
    }
}

#[must_use = "the gate is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct FlightGuard {
    gate: FlightGate,
    flight: Flight,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut current = self
            .gate
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *current == Some(self.flight) {
            *current = None;
        }
    }
}
