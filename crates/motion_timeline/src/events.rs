// SPDX-License-Identifier: MIT OR Apache-2.0
//! Session event bus.

use std::collections::BTreeMap;

/// Notifications raised by a session
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEvent {
    /// Playback started
    Play,
    /// Playback stopped
    Stop,
    /// Document changed structurally; views should redraw
    Refresh,
    /// Playhead moved
    SeekCurrentFrame {
        /// New playhead frame
        frame_no: u32,
    },
    /// Playback speed changed
    AnmSpeedChanged {
        /// New speed multiplier
        speed: f32,
    },
    /// Pose edited through the host
    EditPoseUpdated,
}

impl TimelineEvent {
    /// Get the event name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Play => "Play",
            Self::Stop => "Stop",
            Self::Refresh => "Refresh",
            Self::SeekCurrentFrame { .. } => "SeekCurrentFrame",
            Self::AnmSpeedChanged { .. } => "AnmSpeedChanged",
            Self::EditPoseUpdated => "EditPoseUpdated",
        }
    }
}

/// Callback type for timeline events
pub type EventCallback = Box<dyn Fn(&TimelineEvent) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Subscriber registry owned by a session
#[derive(Default)]
pub struct EventBus {
    subscribers: BTreeMap<SubscriptionId, EventCallback>,
    next_id: u64,
}

impl EventBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback; it runs for every event in subscription order
    pub fn subscribe(&mut self, callback: EventCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.insert(id, callback);
        id
    }

    /// Remove a callback. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    /// Deliver an event to every subscriber
    pub fn publish(&self, event: &TimelineEvent) {
        tracing::trace!("Event: {}", event.name());
        for callback in self.subscribers.values() {
            callback(event);
        }
    }

    /// Remove every subscriber
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }

    /// Number of subscribers
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether nobody is subscribed
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_publish_reaches_subscribers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();

        let sink = Arc::clone(&seen);
        bus.subscribe(Box::new(move |e| sink.lock().push(e.name())));
        bus.publish(&TimelineEvent::Play);
        bus.publish(&TimelineEvent::SeekCurrentFrame { frame_no: 4 });

        assert_eq!(*seen.lock(), vec!["Play", "SeekCurrentFrame"]);
    }

    #[test]
    fn test_unsubscribe() {
        let count = Arc::new(Mutex::new(0));
        let mut bus = EventBus::new();

        let sink = Arc::clone(&count);
        let id = bus.subscribe(Box::new(move |_| *sink.lock() += 1));
        bus.publish(&TimelineEvent::Refresh);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&TimelineEvent::Refresh);

        assert_eq!(*count.lock(), 1);
        assert!(bus.is_empty());
    }
}
