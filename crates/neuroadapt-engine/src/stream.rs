//! Multi-subject session routing
//!
//! The [`SessionRouter`] runs one worker task per subject over a bounded
//! window queue, so each subject's windows are processed strictly in order
//! while different subjects proceed in parallel. All workers feed a shared
//! event channel; consumers receive exactly one event per submitted window.
//!
//! Cancellation is all-or-nothing per window: a cancelled subject's queued
//! windows are discarded, and an evaluation already in flight is dropped
//! before its commit, leaving the subject state exactly as it was.

use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;

use neuroadapt_core::config::SessionConfig;
use neuroadapt_core::error::{ConfigError, SessionError};
use neuroadapt_core::types::{AdaptationDecision, RationaleTag, SampleWindow, SubjectId, SubjectState};

use crate::session::{Session, SessionStats};

/// Default bound on each subject's window queue
const DEFAULT_QUEUE_DEPTH: usize = 64;

/// Default event channel capacity
const EVENT_CHANNEL_DEPTH: usize = 256;

/// Emit a state snapshot every this many processed windows
const SNAPSHOT_INTERVAL: u64 = 32;

// ============================================================================
// Events and Errors
// ============================================================================

/// Events emitted by the router, one per submitted window plus lifecycle
/// notifications.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    /// A window was processed (or rejected by the quality gate)
    Decision {
        /// Subject the decision belongs to
        subject_id: SubjectId,
        /// The decision
        decision: AdaptationDecision,
    },
    /// A window was rejected by the sequence or geometry gate; the decision
    /// is the diagnostic no-op variant
    Rejected {
        /// Subject the window belonged to
        subject_id: SubjectId,
        /// Diagnostic no-op decision for the rejected window
        decision: AdaptationDecision,
        /// What the gate objected to
        error: SessionError,
    },
    /// Periodic subject state snapshot for the presentation collaborator
    Snapshot {
        /// Subject the snapshot belongs to
        subject_id: SubjectId,
        /// State as of the snapshot
        state: SubjectState,
    },
    /// The subject's worker has shut down
    Closed {
        /// Subject whose session closed
        subject_id: SubjectId,
        /// Final counters
        stats: SessionStats,
        /// Final state (checkpointable)
        state: SubjectState,
    },
}

/// Errors from submitting a window to the router.
#[derive(Error, Debug)]
pub enum SubmitError {
    /// Session creation failed for a new subject
    #[error("session configuration rejected: {0}")]
    Config(#[from] ConfigError),

    /// The subject's worker has already shut down
    #[error("subject {0} is closed")]
    SubjectClosed(SubjectId),
}

// ============================================================================
// Router
// ============================================================================

struct SubjectHandle {
    window_tx: mpsc::Sender<SampleWindow>,
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Routes windows from an ingestion collaborator to per-subject sessions.
pub struct SessionRouter {
    config: SessionConfig,
    queue_depth: usize,
    subjects: HashMap<SubjectId, SubjectHandle>,
    event_tx: mpsc::Sender<SessionEvent>,
    event_rx: mpsc::Receiver<SessionEvent>,
}

impl SessionRouter {
    /// Create a router.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the session configuration is invalid;
    /// nothing is spawned in that case.
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_DEPTH);

        Ok(Self {
            config,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            subjects: HashMap::new(),
            event_tx,
            event_rx,
        })
    }

    /// Number of live subject workers
    #[must_use]
    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    /// Receive the next event from any subject.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.event_rx.recv().await
    }

    /// Submit a window for a subject, spawning its worker on first use.
    ///
    /// Applies backpressure when the subject's queue is full.
    ///
    /// # Errors
    ///
    /// Returns a [`SubmitError`] when the subject's worker has shut down.
    pub async fn submit(
        &mut self,
        subject_id: SubjectId,
        window: SampleWindow,
    ) -> Result<(), SubmitError> {
        if !self.subjects.contains_key(&subject_id) {
            let session = Session::new(subject_id, self.config.clone())?;
            self.spawn_worker(subject_id, session);
        }

        let handle = self
            .subjects
            .get(&subject_id)
            .ok_or(SubmitError::SubjectClosed(subject_id))?;

        handle
            .window_tx
            .send(window)
            .await
            .map_err(|_| SubmitError::SubjectClosed(subject_id))
    }

    /// Close a subject gracefully: queued windows are processed, then the
    /// worker emits [`SessionEvent::Closed`].
    pub fn close(&mut self, subject_id: SubjectId) {
        // Dropping the sender ends the worker's receive loop
        self.subjects.remove(&subject_id);
    }

    /// Cancel a subject: queued and in-flight windows are discarded without
    /// state mutation, then the worker emits [`SessionEvent::Closed`].
    pub fn cancel(&mut self, subject_id: SubjectId) {
        if let Some(handle) = self.subjects.remove(&subject_id) {
            let _ = handle.cancel_tx.send(true);
        }
    }

    /// Close every subject gracefully.
    pub fn close_all(&mut self) {
        self.subjects.clear();
    }

    /// Close a subject and wait for its worker to finish.
    ///
    /// Drain pending events with [`Self::next_event`] afterwards; the
    /// worker's final [`SessionEvent::Closed`] is already queued when this
    /// returns.
    pub async fn join(&mut self, subject_id: SubjectId) {
        if let Some(handle) = self.subjects.remove(&subject_id) {
            drop(handle.window_tx);
            let _ = handle.task.await;
        }
    }

    fn spawn_worker(&mut self, subject_id: SubjectId, session: Session) {
        let (window_tx, window_rx) = mpsc::channel(self.queue_depth);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let event_tx = self.event_tx.clone();

        info!(subject = %subject_id, "spawning session worker");
        let task = tokio::spawn(subject_task(session, window_rx, cancel_rx, event_tx));

        self.subjects.insert(
            subject_id,
            SubjectHandle {
                window_tx,
                cancel_tx,
                task,
            },
        );
    }
}

/// Per-subject worker: serializes one subject's windows, emits events.
async fn subject_task(
    mut session: Session,
    mut window_rx: mpsc::Receiver<SampleWindow>,
    cancel_rx: watch::Receiver<bool>,
    event_tx: mpsc::Sender<SessionEvent>,
) {
    let subject_id = session.subject_id();

    loop {
        if *cancel_rx.borrow() {
            break;
        }

        let Some(window) = window_rx.recv().await else {
            break;
        };

        if *cancel_rx.borrow() {
            break;
        }

        let window_index = window.index();
        let outcome = session.evaluate(&window);

        // Cancellation between evaluate and commit discards the in-flight
        // window without mutating subject state (all-or-nothing per window)
        if *cancel_rx.borrow() {
            break;
        }

        let event = match outcome {
            Ok(pending) => {
                let decision = session.commit(pending);
                let snapshot_due = decision.rationale.is_processed()
                    && session.state().windows_processed % SNAPSHOT_INTERVAL == 0;

                if snapshot_due {
                    let _ = event_tx
                        .send(SessionEvent::Snapshot {
                            subject_id,
                            state: session.checkpoint(),
                        })
                        .await;
                }

                SessionEvent::Decision {
                    subject_id,
                    decision,
                }
            }
            Err(error) => SessionEvent::Rejected {
                subject_id,
                decision: AdaptationDecision::no_op(window_index, RationaleTag::OutOfSequence),
                error,
            },
        };

        if event_tx.send(event).await.is_err() {
            break;
        }
    }

    let _ = event_tx
        .send(SessionEvent::Closed {
            subject_id,
            stats: *session.stats(),
            state: session.checkpoint(),
        })
        .await;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn alpha_window(index: u64) -> SampleWindow {
        let channels: Vec<Vec<f64>> = (0..8)
            .map(|ch| {
                (0..1000)
                    .map(|i| {
                        let t = i as f64 / 250.0;
                        let carrier =
                            (2.0 * std::f64::consts::PI * 10.0 * t + ch as f64 * 0.4).sin();
                        let noise = ((i * 37 + ch * 11) as f64).sin() * 2.0;
                        30.0 * carrier + noise
                    })
                    .collect()
            })
            .collect();
        SampleWindow::from_channels(index, index * 4_000_000, 250.0, channels).unwrap()
    }

    async fn drain_until_closed(
        router: &mut SessionRouter,
        subject_id: SubjectId,
    ) -> (Vec<SessionEvent>, SessionStats, SubjectState) {
        let mut events = Vec::new();
        loop {
            let event = router.next_event().await.expect("event channel closed");
            match event {
                SessionEvent::Closed {
                    subject_id: sid,
                    stats,
                    state,
                } if sid == subject_id => return (events, stats, state),
                other => events.push(other),
            }
        }
    }

    #[tokio::test]
    async fn test_decisions_arrive_in_window_order() {
        let mut router = SessionRouter::new(SessionConfig::default()).unwrap();
        let subject = SubjectId::from_u32(1);

        for i in 0..8 {
            router.submit(subject, alpha_window(i)).await.unwrap();
        }
        router.close(subject);

        let (events, stats, _) = drain_until_closed(&mut router, subject).await;
        let indices: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Decision { decision, .. } => Some(decision.window_index),
                _ => None,
            })
            .collect();

        assert_eq!(indices, (0..8).collect::<Vec<_>>());
        assert_eq!(stats.processed, 8);
    }

    #[tokio::test]
    async fn test_one_event_per_submitted_window() {
        let mut router = SessionRouter::new(SessionConfig::default()).unwrap();
        let subject = SubjectId::from_u32(2);

        router.submit(subject, alpha_window(5)).await.unwrap();
        router.submit(subject, alpha_window(3)).await.unwrap(); // out of order
        router.submit(subject, alpha_window(6)).await.unwrap();
        router.close(subject);

        let (events, stats, state) = drain_until_closed(&mut router, subject).await;
        assert_eq!(events.len(), 3);

        match &events[1] {
            SessionEvent::Rejected {
                decision, error, ..
            } => {
                assert_eq!(decision.window_index, 3);
                assert_eq!(decision.rationale, RationaleTag::OutOfSequence);
                assert!(matches!(error, SessionError::OutOfOrderWindow { .. }));
            }
            other => panic!("expected a rejection, got {other:?}"),
        }

        assert_eq!(stats.rejected_sequence, 1);
        assert_eq!(state.last_window_index, Some(6));
    }

    #[tokio::test]
    async fn test_subjects_run_independently() {
        let mut router = SessionRouter::new(SessionConfig::default()).unwrap();
        let a = SubjectId::from_u32(10);
        let b = SubjectId::from_u32(11);

        for i in 0..4 {
            router.submit(a, alpha_window(i)).await.unwrap();
            router.submit(b, alpha_window(i)).await.unwrap();
        }
        assert_eq!(router.subject_count(), 2);
        router.close_all();

        let mut per_subject: HashMap<SubjectId, Vec<u64>> = HashMap::new();
        let mut closed = 0;
        while closed < 2 {
            match router.next_event().await.unwrap() {
                SessionEvent::Decision {
                    subject_id,
                    decision,
                } => per_subject
                    .entry(subject_id)
                    .or_default()
                    .push(decision.window_index),
                SessionEvent::Closed { .. } => closed += 1,
                _ => {}
            }
        }

        for indices in per_subject.values() {
            assert_eq!(indices, &(0..4).collect::<Vec<_>>());
        }
    }

    #[tokio::test]
    async fn test_cancel_discards_queued_windows() {
        let mut router = SessionRouter::new(SessionConfig::default()).unwrap();
        let subject = SubjectId::from_u32(20);

        router.submit(subject, alpha_window(0)).await.unwrap();
        router.cancel(subject);

        // Only Closed (and possibly the first decision, if the worker beat
        // the cancel signal) may arrive; the final state must be consistent
        // with the number of decisions actually emitted
        let (events, stats, state) = drain_until_closed(&mut router, subject).await;
        let decisions = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Decision { .. }))
            .count() as u64;

        assert_eq!(stats.processed, decisions);
        assert_eq!(state.windows_processed, decisions);
    }

    #[tokio::test]
    async fn test_resubmit_after_close_spawns_fresh_worker() {
        let mut router = SessionRouter::new(SessionConfig::default()).unwrap();
        let subject = SubjectId::from_u32(30);

        router.submit(subject, alpha_window(0)).await.unwrap();
        router.close(subject);

        // The handle is gone, so a new worker is spawned with fresh state;
        // this is the documented reconnect path, not an error
        router.submit(subject, alpha_window(0)).await.unwrap();
        router.close(subject);

        let mut closed = 0;
        while closed < 2 {
            if matches!(router.next_event().await.unwrap(), SessionEvent::Closed { .. }) {
                closed += 1;
            }
        }
    }

    #[tokio::test]
    async fn test_invalid_config_rejects_router() {
        let mut config = SessionConfig::default();
        config.signal.channel_count = 0;
        assert!(SessionRouter::new(config).is_err());
    }
}
