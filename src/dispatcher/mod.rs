//! Save/search dispatch with a single-flight guard.

mod gate;

pub use gate::{FlightGate, FlightGuard};

use crate::agent::{non_empty, AgentClient};
use crate::memory_log::{display_timestamp, ResultLog};
use crate::model::{MemoryRecord, Operation};
use crate::notice::Notice;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shown in place of an empty answer.
pub const NO_RESPONSE_PLACEHOLDER: &str = "No AI response captured";

/// What happened to a dispatch request.
#[derive(Debug, Clone)]
pub enum Dispatch {
    /// Refused before any network call.
    Skipped(SkipReason),
    /// The call completed; the outcome has been applied.
    Settled(Outcome),
    /// The dispatcher was shut down while the call was in flight; the reply was dropped.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Busy(Operation),
    EmptyQuery,
    ShutDown,
}

#[derive(Debug, Clone)]
pub enum Outcome {
    Saved(Notice),
    Recorded(MemoryRecord),
    Failed(Notice),
}

impl Outcome {
    pub fn notice(&self) -> Option<&Notice> {
        match self {
            Outcome::Saved(n) | Outcome::Failed(n) => Some(n),
            Outcome::Recorded(_) => None,
        }
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    client: AgentClient,
    gate: FlightGate,
    log: ResultLog,
    closed: Arc<AtomicBool>,
}

impl Dispatcher {
    pub fn new(client: AgentClient, log: ResultLog) -> Self {
        Self {
            client,
            gate: FlightGate::new(),
            log,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn gate(&self) -> FlightGate {
        self.gate.clone()
    }

    pub fn log(&self) -> ResultLog {
        self.log.clone()
    }

    /// Drop replies that arrive from now on and refuse new calls.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn acquire(&self, op: Operation) -> Result<FlightGuard, SkipReason> {
        if self.is_closed() {
            return Err(SkipReason::ShutDown);
        }
        self.gate.try_acquire(op).map_err(SkipReason::Busy)
    }

    pub async fn save_page(&self) -> Dispatch {
        let _flight = match self.acquire(Operation::Save) {
            Ok(g) => g,
            Err(reason) => return Dispatch::Skipped(reason),
        };
        tracing::info!(base_url = self.client.base_url(), "saving current page");

        let reply = self.client.save_page().await;
        if self.is_closed() {
            tracing::debug!("save reply arrived after shutdown, dropping it");
            return Dispatch::Discarded;
        }

        let outcome = match reply.and_then(|r| r.into_result()) {
            Ok(r) => {
                tracing::info!(operation_id = ?r.operation_id, "page saved");
                Outcome::Saved(Notice::saved(non_empty(r.message)))
            }
            Err(e) => {
                tracing::warn!(error = %e, "save failed");
                Outcome::Failed(Notice::from_error(
                    Operation::Save,
                    &e,
                    self.client.base_url(),
                ))
            }
        };
        Dispatch::Settled(outcome)
    }

    /// Search memory for `query`. A blank query is ignored without touching the gate.
    pub async fn search_memory(&self, query: &str) -> Dispatch {
        if query.trim().is_empty() {
            return Dispatch::Skipped(SkipReason::EmptyQuery);
        }
        let _flight = match self.acquire(Operation::Search) {
            Ok(g) => g,
            Err(reason) => return Dispatch::Skipped(reason),
        };
        tracing::info!(query, "searching memory");

        let reply = self.client.search(query).await;
        if self.is_closed() {
            tracing::debug!(query, "search reply arrived after shutdown, dropping it");
            return Dispatch::Discarded;
        }

        let outcome = match reply.and_then(|r| r.into_result()) {
            Ok(r) => {
                let record = MemoryRecord {
                    id: non_empty(r.operation_id).unwrap_or_else(|| self.log.fallback_id()),
                    query: query.to_string(),
                    response: non_empty(r.ai_response)
                        .unwrap_or_else(|| NO_RESPONSE_PLACEHOLDER.to_string()),
                    timestamp: display_timestamp(),
                };
                self.log.append(record.clone());
                tracing::info!(id = %record.id, chars = record.response.len(), "search recorded");
                Outcome::Recorded(record)
            }
            Err(e) => {
                tracing::warn!(error = %e, "search failed");
                Outcome::Failed(Notice::from_error(
                    Operation::Search,
                    &e,
                    self.client.base_url(),
                ))
            }
        };
        Dispatch::Settled(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Contract;
    use crate::notice::NoticeKind;
    use crate::testkit::{self, StubAgent};
    use axum::http::StatusCode;
    use serde_json::json;
    use std::time::Duration;

    const SEARCH: &str = "/api/kinic/search-extract";
    const SAVE: &str = "/api/kinic/save";

    fn dispatcher_for(base_url: &str, contract: Contract) -> Dispatcher {
        let client = AgentClient::new(&testkit::config(base_url, contract)).unwrap();
        Dispatcher::new(client, ResultLog::new())
    }

    #[tokio::test]
    async fn successful_search_appends_one_record() {
        let stub = StubAgent::desktop().await;
        stub.set_search_reply(
            StatusCode::OK,
            json!({"success": true, "operation_id": "42", "ai_response": "hello"}),
        );
        let d = dispatcher_for(&stub.base_url, Contract::Desktop);

        let res = d.search_memory("test").await;
        let Dispatch::Settled(Outcome::Recorded(record)) = res else {
            panic!("unexpected: {res:?}");
        };
        assert_eq!(record.id, "42");
        assert_eq!(record.query, "test");
        assert_eq!(record.response, "hello");
        assert_eq!(d.log().snapshot(), vec![record]);
        assert_eq!(stub.hits(SEARCH), 1);
        assert_eq!(stub.last_body(), Some(json!({"query": "test"})));
        assert_eq!(d.gate().current(), None);
    }

    #[tokio::test]
    async fn search_failure_surfaces_error_and_suggestion() {
        let stub = StubAgent::desktop().await;
        stub.set_search_reply(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"success": false, "error": "no extension", "suggestion": "install it"}),
        );
        let d = dispatcher_for(&stub.base_url, Contract::Desktop);

        let res = d.search_memory("test").await;
        let Dispatch::Settled(Outcome::Failed(notice)) = res else {
            panic!("unexpected: {res:?}");
        };
        assert_eq!(notice.kind, NoticeKind::ApplicationError);
        assert!(notice.body.contains("no extension"));
        assert!(notice.body.contains("install it"));
        assert!(d.log().is_empty());
        assert_eq!(d.gate().current(), None);
    }

    #[tokio::test]
    async fn missing_fields_fall_back() {
        let stub = StubAgent::simple().await;
        stub.set_search_reply(StatusCode::OK, json!({"success": true, "ai_response": ""}));
        let d = dispatcher_for(&stub.base_url, Contract::Simple);

        d.search_memory("first").await;
        d.search_memory("second").await;
        let records = d.log().snapshot();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.response == NO_RESPONSE_PLACEHOLDER));
        assert_ne!(records[0].id, records[1].id);
        assert_eq!(records[1].query, "second");
    }

    #[tokio::test]
    async fn blank_queries_never_reach_the_agent() {
        let stub = StubAgent::desktop().await;
        let d = dispatcher_for(&stub.base_url, Contract::Desktop);
        let held = d.gate().try_acquire(Operation::Save).unwrap();

        for q in ["", "   ", "\t\n"] {
            assert!(matches!(
                d.search_memory(q).await,
                Dispatch::Skipped(SkipReason::EmptyQuery)
            ));
        }
        // Gate state is left exactly as it was.
        assert_eq!(d.gate().current(), Some(Operation::Save));
        drop(held);
        assert!(matches!(
            d.search_memory(" ").await,
            Dispatch::Skipped(SkipReason::EmptyQuery)
        ));
        assert_eq!(d.gate().current(), None);
        assert_eq!(stub.total_hits(), 0);
    }

    #[tokio::test]
    async fn save_while_busy_issues_no_call() {
        let stub = StubAgent::desktop().await;
        let d = dispatcher_for(&stub.base_url, Contract::Desktop);
        let _held = d.gate().try_acquire(Operation::Search).unwrap();

        assert!(matches!(
            d.save_page().await,
            Dispatch::Skipped(SkipReason::Busy(Operation::Search))
        ));
        assert!(matches!(
            d.search_memory("test").await,
            Dispatch::Skipped(SkipReason::Busy(Operation::Search))
        ));
        assert_eq!(stub.total_hits(), 0);
    }

    #[tokio::test]
    async fn in_flight_save_blocks_a_concurrent_search() {
        let stub = StubAgent::desktop().await;
        stub.set_delay(Duration::from_millis(200));
        let d = dispatcher_for(&stub.base_url, Contract::Desktop);

        let saver = d.clone();
        let save = tokio::spawn(async move { saver.save_page().await });
        stub.wait_for_hits(SAVE, 1).await;

        assert!(matches!(
            d.search_memory("while saving").await,
            Dispatch::Skipped(SkipReason::Busy(Operation::Save))
        ));
        assert!(matches!(
            save.await.unwrap(),
            Dispatch::Settled(Outcome::Saved(_))
        ));
        assert_eq!(stub.hits(SEARCH), 0);
        assert_eq!(d.gate().current(), None);
    }

    #[tokio::test]
    async fn transport_failure_releases_the_gate() {
        let base = testkit::unreachable_base_url().await;
        let d = dispatcher_for(&base, Contract::Desktop);

        for res in [d.save_page().await, d.search_memory("test").await] {
            let Dispatch::Settled(Outcome::Failed(notice)) = res else {
                panic!("unexpected: {res:?}");
            };
            assert_eq!(notice.kind, NoticeKind::ConnectionError);
            assert!(notice.body.contains(&base));
            assert_eq!(d.gate().current(), None);
        }
        assert!(d.log().is_empty());
    }

    #[tokio::test]
    async fn unparseable_reply_is_a_connection_error() {
        let stub = StubAgent::spawn(axum::Router::new().route(
            "/save",
            axum::routing::post(|| async { "<html>oops</html>" }),
        ))
        .await;
        let d = dispatcher_for(&stub.base_url, Contract::Simple);
        let res = d.save_page().await;
        let Dispatch::Settled(Outcome::Failed(notice)) = res else {
            panic!("unexpected: {res:?}");
        };
        assert_eq!(notice.kind, NoticeKind::ConnectionError);
        assert_eq!(d.gate().current(), None);
    }

    #[tokio::test]
    async fn save_success_does_not_touch_the_log() {
        let stub = StubAgent::simple().await;
        let d = dispatcher_for(&stub.base_url, Contract::Simple);
        let res = d.save_page().await;
        let Dispatch::Settled(outcome) = res else {
            panic!("unexpected: {res:?}");
        };
        let notice = outcome.notice().expect("save notice");
        assert_eq!(notice.kind, NoticeKind::Success);
        assert_eq!(notice.body, "Page saved to Kinic memory");
        assert!(d.log().is_empty());
        // The bare contract posts without a body.
        assert_eq!(stub.last_body(), None);
    }

    #[tokio::test]
    async fn reply_after_shutdown_is_discarded() {
        let stub = StubAgent::desktop().await;
        stub.set_delay(Duration::from_millis(200));
        let d = dispatcher_for(&stub.base_url, Contract::Desktop);

        let searcher = d.clone();
        let search = tokio::spawn(async move { searcher.search_memory("late").await });
        stub.wait_for_hits(SEARCH, 1).await;
        d.shutdown();

        assert!(matches!(search.await.unwrap(), Dispatch::Discarded));
        assert!(d.log().is_empty());
        assert_eq!(d.gate().current(), None);
        assert!(matches!(
            d.save_page().await,
            Dispatch::Skipped(SkipReason::ShutDown)
        ));
    }
}
