//! Session controller.
//!
//! Owns the connectivity monitor for the lifetime of the session and turns UI commands
//! into dispatcher calls, emitting events for presentation layers.

use crate::dispatcher::{Dispatch, Dispatcher, Outcome, SkipReason};
use crate::model::{AppEvent, InfoEvent, Operation};
use crate::monitor::ConnectivityMonitor;
use anyhow::Result;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

type PendingDispatch = Pin<Box<dyn Future<Output = Dispatch> + Send>>;

/// Commands emitted by UI layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UiCommand {
    Save,
    Search(String),
    Quit,
}

/// Translate a finished dispatch into events. Discarded replies produce nothing.
pub(crate) fn dispatch_events(op: Operation, dispatch: Dispatch) -> Vec<AppEvent> {
    match dispatch {
        Dispatch::Skipped(SkipReason::Busy(running)) => vec![AppEvent::Info(InfoEvent::Busy {
            requested: op,
            running,
        })],
        Dispatch::Skipped(SkipReason::EmptyQuery) => vec![AppEvent::Info(InfoEvent::EmptyQuery)],
        Dispatch::Skipped(SkipReason::ShutDown) | Dispatch::Discarded => Vec::new(),
        Dispatch::Settled(Outcome::Recorded(record)) => {
            vec![
                AppEvent::Info(InfoEvent::Message(format!("Memory retrieved for: {}", record.query))),
                AppEvent::RecordAppended { record },
            ]
        }
        Dispatch::Settled(outcome) => outcome
            .notice()
            .cloned()
            .map(AppEvent::Notice)
            .into_iter()
            .collect(),
    }
}

/// Run the session: start probing, serve commands until `Quit` or the command channel closes.
pub(crate) async fn run_controller(
    monitor: ConnectivityMonitor,
    dispatcher: Dispatcher,
    event_tx: UnboundedSender<AppEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut monitor = monitor.start();

    while let Some(cmd) = cmd_rx.recv().await {
        let dispatcher = dispatcher.clone();
        let (op, call): (Operation, PendingDispatch) = match cmd {
            UiCommand::Quit => break,
            UiCommand::Save => (
                Operation::Save,
                Box::pin(async move { dispatcher.save_page().await }),
            ),
            UiCommand::Search(query) => (
                Operation::Search,
                Box::pin(async move { dispatcher.search_memory(&query).await }),
            ),
        };
        let tx = event_tx.clone();
        // Calls run detached so a slow agent never blocks the command loop.
        tokio::spawn(async move {
            let dispatch = call.await;
            for ev in dispatch_events(op, dispatch) {
                // The UI may already be gone; late events are simply dropped.
                let _ = tx.send(ev);
            }
        });
    }

    monitor.stop();
    dispatcher.shutdown();
    tracing::info!("session ended");
    Ok(())
}
