//! Periodic agent health probe.
//!
//! Owns the connectivity state. Probe failures are folded into that state and
//! never surface anywhere else.

use crate::agent::AgentClient;
use crate::model::{AgentStatus, ConnectivityState};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// `tokio::time::interval` rejects a zero period.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

pub struct ConnectivityMonitor {
    client: AgentClient,
    interval: Duration,
    shared: Arc<Shared>,
}

struct Shared {
    stopped: Mutex<bool>,
    tx: watch::Sender<AgentStatus>,
}

impl Shared {
    /// Publish a probe verdict unless the monitor has been stopped.
    fn publish(&self, next: AgentStatus) {
        // Held across the send so `stop` cannot interleave with a publish.
        let stopped = self.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        if *stopped {
            return;
        }
        self.tx.send_if_modified(|cur| {
            if *cur == next {
                return false;
            }
            if cur.state != next.state {
                tracing::info!(from = ?cur.state, to = ?next.state, detail = ?next.detail, "agent connectivity changed");
            }
            *cur = next;
            true
        });
    }
}

impl ConnectivityMonitor {
    pub fn new(client: AgentClient, interval: Duration) -> Self {
        debug_assert!(!interval.is_zero(), "poll interval must be non-zero");
        let (tx, _) = watch::channel(AgentStatus::default());
        Self {
            client,
            interval: interval.max(MIN_INTERVAL),
            shared: Arc::new(Shared {
                stopped: Mutex::new(false),
                tx,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<AgentStatus> {
        self.shared.tx.subscribe()
    }

    /// Probe immediately, then every `interval` until the returned handle is stopped.
    pub fn start(self) -> MonitorHandle {
        let shared = self.shared.clone();
        let client = self.client;
        let interval = self.interval;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let status = probe_once(&client).await;
                shared.publish(status);
            }
        });
        MonitorHandle {
            shared: self.shared,
            task: Some(task),
        }
    }
}

/// Run a single probe and fold the result into a status.
pub async fn probe_once(client: &AgentClient) -> AgentStatus {
    match client.probe().await {
        Ok(detail) => AgentStatus {
            state: ConnectivityState::Connected,
            detail,
        },
        Err(e) => {
            tracing::debug!(error = %e, "agent probe failed");
            AgentStatus {
                state: ConnectivityState::Disconnected,
                detail: Some(e.to_string()),
            }
        }
    }
}

/// Running monitor. Dropping it stops the monitor.
pub struct MonitorHandle {
    shared: Arc<Shared>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl MonitorHandle {
    pub fn status(&self) -> AgentStatus {
        self.shared.tx.borrow().clone()
    }

    /// Stop probing. Safe to call more than once; no state change is published after it returns.
    pub fn stop(&mut self) {
        *self
            .shared
            .stopped
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = true;
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("connectivity monitor stopped");
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
