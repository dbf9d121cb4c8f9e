//! Destinations for transition events.
//!
//! Sinks are fire-and-forget: they must not block the polling cycle and cannot
//! fail it. A channel sink whose receiver has gone away simply drops events.

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::model::{Direction, TransitionEvent};

/// Receives transition events as they are detected.
pub trait EventSink: Send + Sync {
    /// Handle one event.
    fn emit(&self, event: &TransitionEvent);
}

/// Writes each event as an info-level log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &TransitionEvent) {
        let direction = match event.direction() {
            Direction::Entered => "entered",
            Direction::Left => "left",
        };
        info!(
            entity = %event.entity,
            label = event.label.as_deref().unwrap_or("unknown"),
            direction,
            "{}",
            event
        );
    }
}

/// Forwards events to an unbounded channel for downstream consumers.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<TransitionEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver its events arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TransitionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &TransitionEvent) {
        if self.tx.send(event.clone()).is_err() {
            warn!(entity = %event.entity, "Event receiver dropped, discarding transition");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityId, Membership};
    use chrono::{TimeZone, Utc};

    fn event() -> TransitionEvent {
        TransitionEvent {
            entity: EntityId::new("4b1805").unwrap(),
            label: Some("SWR12".to_string()),
            previous: Membership::Outside,
            current: Membership::Inside,
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_channel_sink_delivers() {
        let (sink, mut rx) = ChannelSink::new();
        sink.emit(&event());
        assert_eq!(rx.try_recv().unwrap(), event());
    }

    #[test]
    fn test_channel_sink_survives_dropped_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.emit(&event());
    }
}
