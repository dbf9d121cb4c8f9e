//! Per-entity boundary membership tracking.
//!
//! The [`TransitionTracker`] owns the only cross-cycle mutable state in the
//! system: a map from entity id to last-known [`Membership`]. Each update is a
//! read-modify-write performed while holding the map entry's shard lock, so
//! updates for different entities run concurrently and updates for the same
//! entity are serialized.
//!
//! # State machine
//!
//! ```text
//! Unknown --[any observation]--> Inside | Outside      (no event)
//! Inside  --[inside]-----------> Inside                (no event)
//! Inside  --[outside]----------> Outside               (Left)
//! Outside --[inside]-----------> Inside                (Entered)
//! Outside --[outside]----------> Outside               (no event)
//! ```
//!
//! State is sticky: an aircraft that disappears for hours resumes from its last
//! recorded state. [`TrackerConfig::stale_after`] opts into treating long gaps
//! as a fresh first sighting instead.

use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, trace};

use crate::model::{EntityId, Membership, Observation, TransitionEvent};

/// Tracker configuration.
#[derive(Debug, Clone, Default)]
pub struct TrackerConfig {
    /// Gap after which the previous state is forgotten. `None` keeps state
    /// indefinitely.
    pub stale_after: Option<Duration>,
}

impl TrackerConfig {
    /// Forget state for entities not seen within `window`.
    pub fn with_stale_after(mut self, window: Duration) -> Self {
        self.stale_after = Some(window);
        self
    }
}

/// Last-known membership of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MembershipRecord {
    /// Current state.
    pub state: Membership,
    /// Timestamp of the observation that last updated this record.
    pub updated_at: Option<DateTime<Utc>>,
}

/// Stateful transition detector.
///
/// Created once at startup and shared (via `Arc`) for the process lifetime.
/// Nothing is persisted; a restart begins with every entity Unknown.
#[derive(Debug, Default)]
pub struct TransitionTracker {
    states: DashMap<EntityId, MembershipRecord>,
    config: TrackerConfig,
}

impl TransitionTracker {
    /// Create a tracker with the given configuration.
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            states: DashMap::new(),
            config,
        }
    }

    /// Create a tracker with sticky state.
    pub fn with_defaults() -> Self {
        Self::new(TrackerConfig::default())
    }

    /// Apply one membership sample for an entity.
    ///
    /// Returns an event only when the entity had a known state and that state
    /// differs from the new one. Samples older than the entity's last update
    /// leave the state untouched and return `None`.
    pub fn update(
        &self,
        entity: &EntityId,
        inside: bool,
        timestamp: DateTime<Utc>,
    ) -> Option<TransitionEvent> {
        self.apply(entity, None, inside, timestamp)
    }

    /// Apply an observation, carrying its label into any emitted event.
    pub fn observe(&self, observation: &Observation, inside: bool) -> Option<TransitionEvent> {
        self.apply(
            &observation.entity,
            observation.label.as_deref(),
            inside,
            observation.timestamp,
        )
    }

    fn apply(
        &self,
        entity: &EntityId,
        label: Option<&str>,
        inside: bool,
        timestamp: DateTime<Utc>,
    ) -> Option<TransitionEvent> {
        let current = Membership::from_inside(inside);

        // Entry guard holds the shard write lock until the end of this scope.
        let mut entry = self.states.entry(entity.clone()).or_default();
        let record = entry.value_mut();

        if let Some(last) = record.updated_at {
            if timestamp < last {
                debug!(
                    entity = %entity,
                    sample = %timestamp,
                    last = %last,
                    "Ignoring out-of-order sample"
                );
                return None;
            }
        }

        let previous = if self.is_expired(record, timestamp) {
            debug!(entity = %entity, "Membership expired, treating as first sighting");
            Membership::Unknown
        } else {
            record.state
        };

        record.state = current;
        record.updated_at = Some(timestamp);

        if !previous.is_known() || previous == current {
            trace!(entity = %entity, state = %current, "Membership unchanged");
            return None;
        }

        Some(TransitionEvent {
            entity: entity.clone(),
            label: label.map(str::to_string),
            previous,
            current,
            timestamp,
        })
    }

    fn is_expired(&self, record: &MembershipRecord, timestamp: DateTime<Utc>) -> bool {
        match (self.config.stale_after, record.updated_at) {
            (Some(window), Some(last)) => (timestamp - last)
                .to_std()
                .map(|gap| gap > window)
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Current membership of an entity (`Unknown` if never seen).
    pub fn state(&self, entity: &EntityId) -> Membership {
        self.states
            .get(entity)
            .map(|r| r.state)
            .unwrap_or(Membership::Unknown)
    }

    /// Full record for an entity, if it has been seen.
    pub fn record(&self, entity: &EntityId) -> Option<MembershipRecord> {
        self.states.get(entity).map(|r| *r)
    }

    /// Number of entities seen this run.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether no entity has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Entities currently in the given state, sorted by id.
    pub fn entities_in(&self, state: Membership) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self
            .states
            .iter()
            .filter(|e| e.value().state == state)
            .map(|e| e.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// The active configuration.
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}
