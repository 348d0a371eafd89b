//! Event types and ProgressBus for the ingest pipeline
//!
//! The pipeline runs as an asynchronous job and reports stage transitions
//! as events. Observers (the uploading client, a reviewer dashboard) attach
//! independently, optionally filtered to a single upload session, and must
//! never be able to stall the pipeline worker.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Terminal result summary attached to a `completed` event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestSummary {
    /// Routing policy the pipeline settled on (e.g. "NEW_PIECE")
    pub policy: String,
    /// Session created for this upload, if one was created
    pub session_id: Option<Uuid>,
    /// Number of instrument parts estimated by structural analysis
    pub part_count: usize,
    /// Confidence of the structural estimate (0-100)
    pub confidence: u8,
}

/// Event envelope: `{type, job_id, session_id, timestamp, data}`.
///
/// The `type` tag and stage payload serialize adjacently under `data`,
/// matching the event stream contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestEvent {
    /// Pipeline job this event belongs to
    pub job_id: Uuid,
    /// Upload session the job is processing (filter key)
    pub session_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub data: EventData,
}

/// Stage-specific event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventData {
    /// A pipeline stage started or advanced
    Progress {
        /// Stage name (e.g. "fingerprinting", "structural_analysis")
        step: String,
        /// Overall completion estimate (0-100)
        percent: u8,
        /// Human-readable stage description
        message: String,
    },

    /// The job finished successfully. Terminal: no further events for
    /// this job will be delivered.
    Completed { summary: IngestSummary },

    /// The job failed. Terminal, same delivery guarantee as `Completed`.
    Failed { reason: String },
}

impl IngestEvent {
    pub fn progress(
        job_id: Uuid,
        session_id: Option<Uuid>,
        step: impl Into<String>,
        percent: u8,
        message: impl Into<String>,
    ) -> Self {
        Self {
            job_id,
            session_id,
            timestamp: Utc::now(),
            data: EventData::Progress {
                step: step.into(),
                percent,
                message: message.into(),
            },
        }
    }

    pub fn completed(job_id: Uuid, session_id: Option<Uuid>, summary: IngestSummary) -> Self {
        Self {
            job_id,
            session_id,
            timestamp: Utc::now(),
            data: EventData::Completed { summary },
        }
    }

    pub fn failed(job_id: Uuid, session_id: Option<Uuid>, reason: impl Into<String>) -> Self {
        Self {
            job_id,
            session_id,
            timestamp: Utc::now(),
            data: EventData::Failed {
                reason: reason.into(),
            },
        }
    }

    /// Whether this event ends its job
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.data,
            EventData::Completed { .. } | EventData::Failed { .. }
        )
    }
}

/// Fan-out bus for ingest pipeline events
///
/// Wraps tokio::broadcast, providing:
/// - Non-blocking publish (slow subscribers never block the pipeline)
/// - Multiple concurrent subscribers with independent teardown
/// - Terminal-job tracking: once a `completed` or `failed` event fires
///   for a job_id, later events for that job are dropped at the emit side
///
/// The bus is an owned value with an explicit construction point — create
/// one per worker process and share it via `Arc` or `clone()`. A
/// subscriber dropping its receiver deregisters only itself; the
/// underlying job always runs to its terminal event.
#[derive(Clone)]
pub struct ProgressBus {
    tx: broadcast::Sender<IngestEvent>,
    finished: Arc<Mutex<HashSet<Uuid>>>,
    capacity: usize,
}

impl ProgressBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// Capacity bounds how far a slow subscriber may lag before it starts
    /// losing events; the producer is unaffected either way.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            finished: Arc::new(Mutex::new(HashSet::new())),
            capacity,
        }
    }

    /// Emit an event, fire-and-forget.
    ///
    /// Returns true if the event was offered to subscribers, false if it
    /// was suppressed (its job already reached a terminal event) or nobody
    /// is listening. Either way the caller never blocks and never fails.
    pub fn emit(&self, event: IngestEvent) -> bool {
        let job_id = event.job_id;

        {
            let mut finished = self
                .finished
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());

            if finished.contains(&job_id) {
                tracing::debug!(%job_id, "Dropping event for finished job");
                return false;
            }

            if event.is_terminal() {
                finished.insert(job_id);
            }
        }

        match self.tx.send(event) {
            Ok(receiver_count) => {
                tracing::debug!(%job_id, receiver_count, "Event broadcast");
                true
            }
            Err(_) => {
                // No receivers - acceptable, the job runs to completion
                // independent of observers
                tracing::debug!(%job_id, "No receivers for event");
                false
            }
        }
    }

    /// Whether a terminal event has already fired for this job
    pub fn is_finished(&self, job_id: Uuid) -> bool {
        self.finished
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(&job_id)
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<IngestEvent> {
        self.tx.subscribe()
    }

    /// Subscribe filtered to a single upload session.
    ///
    /// The returned subscription only yields events whose `session_id`
    /// matches. Dropping it detaches this observer and nothing else.
    pub fn subscribe_session(&self, session_id: Uuid) -> SessionSubscription {
        SessionSubscription {
            rx: self.tx.subscribe(),
            session_id,
        }
    }

    /// Current number of attached subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A session-filtered view of the bus
pub struct SessionSubscription {
    rx: broadcast::Receiver<IngestEvent>,
    session_id: Uuid,
}

impl SessionSubscription {
    /// Receive the next event for this subscription's session.
    ///
    /// Events for other sessions are skipped. A lagged receiver resumes
    /// from the oldest retained event (the skipped span is lost, which is
    /// the contract: slow consumers drop events, producers never wait).
    /// Returns None once the bus is gone.
    pub async fn recv(&mut self) -> Option<IngestEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => {
                    if event.session_id == Some(self.session_id) {
                        return Some(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        session_id = %self.session_id,
                        skipped,
                        "Subscriber lagged, events dropped"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Session this subscription is filtered to
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }
}
