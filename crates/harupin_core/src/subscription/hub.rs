//! Per-observer subscription state machines.
//!
//! # Responsibility
//! - Tie one filter + zoom state to one live note query and one clustering pass
//!   per delivered set.
//! - Discard any work produced under a state that has since been replaced.
//!
//! # Invariants
//! - The generation is bumped before the previous query is cancelled, and the
//!   previous query is cancelled before the next one is established.
//! - An update is sent only while its generation is current (checked under the
//!   gate lock) and received only while it is still current.
//! - After `observe`, `set_criteria`, `set_zoom` or `teardown` returns, no update
//!   computed under the previous state can be received.

use crate::cluster::{cluster, NoteCluster, ThresholdPolicy};
use crate::query::criteria::FilterCriteria;
use crate::query::engine::{NoteQuery, NoteSet, QueryEngine, QueryStatus};
use crate::store::StoreResult;
use log::{debug, info, warn};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Hands out map observers sharing one query engine and zoom policy.
#[derive(Clone)]
pub struct SubscriptionHub {
    engine: QueryEngine,
    policy: ThresholdPolicy,
}

impl SubscriptionHub {
    pub fn new(engine: QueryEngine, policy: ThresholdPolicy) -> Self {
        Self { engine, policy }
    }

    pub fn policy(&self) -> ThresholdPolicy {
        self.policy
    }

    /// Creates an idle observer.
    pub fn observer(&self) -> MapObserver {
        let (sender, receiver) = mpsc::channel();
        MapObserver {
            engine: self.engine.clone(),
            policy: self.policy,
            gate: Arc::new(Mutex::new(Gate {
                generation: 0,
                sender,
            })),
            receiver,
            state: ObserverState::Idle,
            query: None,
        }
    }
}

/// Observer lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverState {
    Idle,
    Subscribed { criteria: FilterCriteria, zoom: f64 },
}

/// Clusters for one delivered note set.
#[derive(Debug, Clone)]
pub struct ClusterUpdate {
    /// Logical state this update was computed under.
    pub generation: u64,
    pub criteria: FilterCriteria,
    pub zoom: f64,
    pub threshold_degrees: f64,
    pub clusters: Vec<NoteCluster>,
    /// `Degraded` when the clusters come from the last known-good set.
    pub status: QueryStatus,
}

impl ClusterUpdate {
    /// Total number of notes across all clusters.
    pub fn note_count(&self) -> usize {
        self.clusters.iter().map(|cluster| cluster.len()).sum()
    }
}

struct Gate {
    generation: u64,
    sender: Sender<ClusterUpdate>,
}

/// One map view's subscription. Tears down on drop.
pub struct MapObserver {
    engine: QueryEngine,
    policy: ThresholdPolicy,
    gate: Arc<Mutex<Gate>>,
    receiver: Receiver<ClusterUpdate>,
    state: ObserverState,
    query: Option<NoteQuery>,
}

impl MapObserver {
    pub fn state(&self) -> &ObserverState {
        &self.state
    }

    /// Current logical-state generation.
    pub fn generation(&self) -> u64 {
        lock(&self.gate).generation
    }

    /// Latest note set behind the clusters, if one has been delivered.
    pub fn current_notes(&self) -> Option<Arc<NoteSet>> {
        self.query.as_ref().and_then(NoteQuery::current)
    }

    /// Subscribes (or re-subscribes) to `criteria` at `zoom`.
    ///
    /// Always issues a fresh live query, even for previously used criteria.
    ///
    /// # Errors
    /// - Returns the store error when the live query cannot be established; the
    ///   observer is then `Idle`.
    pub fn observe(&mut self, criteria: FilterCriteria, zoom: f64) -> StoreResult<()> {
        let generation = self.advance();
        if let Some(previous) = self.query.take() {
            previous.cancel();
        }

        let threshold_degrees = self.policy.threshold_for_zoom(zoom);
        let on_change = {
            let gate = Arc::clone(&self.gate);
            let criteria = criteria.clone();
            move |set: Arc<NoteSet>| {
                if lock(&gate).generation != generation {
                    return;
                }
                let started_at = Instant::now();
                let clusters = cluster(&set.notes, threshold_degrees);
                let gate = lock(&gate);
                if gate.generation != generation {
                    debug!(
                        "event=cluster_discard module=subscription status=ok generation={} current_generation={}",
                        generation, gate.generation
                    );
                    return;
                }
                debug!(
                    "event=cluster_pass module=subscription status=ok generation={} notes={} clusters={} duration_us={}",
                    generation,
                    set.notes.len(),
                    clusters.len(),
                    started_at.elapsed().as_micros()
                );
                // A dropped receiver means the observer is gone; nothing to do.
                let _ = gate.sender.send(ClusterUpdate {
                    generation,
                    criteria: criteria.clone(),
                    zoom,
                    threshold_degrees,
                    clusters,
                    status: set.status.clone(),
                });
            }
        };

        match self.engine.observe(criteria.clone(), on_change) {
            Ok(query) => {
                info!(
                    "event=observer_subscribe module=subscription status=ok generation={} predicate={} zoom={} threshold_degrees={}",
                    generation,
                    criteria.predicate().kind(),
                    zoom,
                    threshold_degrees
                );
                self.query = Some(query);
                self.state = ObserverState::Subscribed { criteria, zoom };
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=observer_subscribe module=subscription status=error generation={} error={}",
                    generation, err
                );
                self.state = ObserverState::Idle;
                Err(err)
            }
        }
    }

    /// Switches the filter, keeping the zoom. No-op when idle or unchanged.
    pub fn set_criteria(&mut self, criteria: FilterCriteria) -> StoreResult<()> {
        match &self.state {
            ObserverState::Subscribed {
                criteria: current,
                zoom,
            } if *current != criteria => {
                let zoom = *zoom;
                self.observe(criteria, zoom)
            }
            _ => Ok(()),
        }
    }

    /// Switches the zoom, keeping the filter. No-op when idle or unchanged.
    pub fn set_zoom(&mut self, zoom: f64) -> StoreResult<()> {
        match &self.state {
            ObserverState::Subscribed {
                criteria,
                zoom: current,
            } if current.to_bits() != zoom.to_bits() => {
                let criteria = criteria.clone();
                self.observe(criteria, zoom)
            }
            _ => Ok(()),
        }
    }

    /// Empties the visible set (e.g. after the store became unavailable).
    pub fn clear(&self) {
        if let Some(query) = &self.query {
            query.clear();
        }
    }

    /// Returns to `Idle` and releases the live query.
    pub fn teardown(&mut self) {
        if self.state == ObserverState::Idle && self.query.is_none() {
            return;
        }
        let generation = self.advance();
        if let Some(query) = self.query.take() {
            query.cancel();
        }
        self.state = ObserverState::Idle;
        let dropped = self.receiver.try_iter().count();
        info!(
            "event=observer_teardown module=subscription status=ok generation={} dropped_updates={}",
            generation, dropped
        );
    }

    /// Next current update, if one is already queued.
    pub fn try_recv(&self) -> Option<ClusterUpdate> {
        self.receiver
            .try_iter()
            .find(|update| self.is_current(update))
    }

    /// Blocks until the next current update arrives.
    ///
    /// The observer owns its sending half, so this only returns `None` if the
    /// channel is torn down underneath it. Prefer `recv_timeout` on threads
    /// that must stay responsive.
    pub fn recv(&self) -> Option<ClusterUpdate> {
        loop {
            let update = self.receiver.recv().ok()?;
            if self.is_current(&update) {
                return Some(update);
            }
        }
    }

    /// Waits up to `timeout` for the next current update.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ClusterUpdate> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(remaining) {
                Ok(update) if self.is_current(&update) => return Some(update),
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return None
                }
            }
        }
    }

    /// Drains the queue and returns only the newest current update.
    pub fn latest(&self) -> Option<ClusterUpdate> {
        let mut latest = None;
        while let Some(update) = self.try_recv() {
            latest = Some(update);
        }
        latest
    }

    fn is_current(&self, update: &ClusterUpdate) -> bool {
        update.generation == lock(&self.gate).generation
    }

    fn advance(&self) -> u64 {
        let mut gate = lock(&self.gate);
        gate.generation += 1;
        gate.generation
    }
}

impl Drop for MapObserver {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
