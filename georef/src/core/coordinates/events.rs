//! Georeference change notification
//!
//! An explicit subscription channel: dependents subscribe, own their id, and
//! poll for events recorded since their cursor. Everything runs on the main
//! thread, so this is a plain cursor buffer rather than a lock-based queue.
//! Events already seen by every subscriber are dropped eagerly.

use std::collections::{HashMap, VecDeque};

use tracing::warn;

/// Handle identifying one subscriber. Owned by the dependent and released
/// through [`GeoreferenceEvents::unsubscribe`] in its teardown path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Which property of the georeference changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoreferenceChange {
    Origin,
    Scale,
    Ellipsoid,
    Placement,
}

/// One committed georeference mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoreferenceEvent {
    /// Revision the georeference reached with this change.
    pub revision: u64,
    /// What changed.
    pub change: GeoreferenceChange,
}

/// Cursor-based event channel for georeference updates.
#[derive(Debug, Default)]
pub struct GeoreferenceEvents {
    next_id: u64,
    /// Absolute event index each subscriber has consumed up to.
    cursors: HashMap<SubscriptionId, u64>,
    /// Events not yet seen by every subscriber; `events[0]` has absolute
    /// index `base`.
    events: VecDeque<GeoreferenceEvent>,
    base: u64,
}

impl GeoreferenceEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Only events recorded after this call are
    /// visible to it.
    pub fn subscribe(&mut self) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.cursors.insert(id, self.base + self.events.len() as u64);
        id
    }

    /// Release a subscription. Unknown ids are logged and ignored.
    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        if self.cursors.remove(&id).is_none() {
            warn!(?id, "unsubscribe for unknown georeference subscription");
            return;
        }
        self.compact();
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.cursors.len()
    }

    /// Record an event. Dropped immediately when nobody is listening.
    pub fn push(&mut self, event: GeoreferenceEvent) {
        if self.cursors.is_empty() {
            self.base += 1;
            return;
        }
        self.events.push_back(event);
    }

    /// Drain the events recorded since `id`'s cursor. Unknown ids are
    /// logged and yield nothing.
    pub fn poll(&mut self, id: SubscriptionId) -> Vec<GeoreferenceEvent> {
        let Some(cursor) = self.cursors.get_mut(&id) else {
            warn!(?id, "poll for unknown georeference subscription");
            return Vec::new();
        };

        let start = (*cursor - self.base) as usize;
        let drained: Vec<GeoreferenceEvent> =
            self.events.iter().skip(start).copied().collect();
        *cursor = self.base + self.events.len() as u64;

        self.compact();
        drained
    }

    /// Drop events every remaining subscriber has consumed.
    fn compact(&mut self) {
        let horizon = match self.cursors.values().min() {
            Some(min) => *min,
            None => self.base + self.events.len() as u64,
        };
        while self.base < horizon {
            self.events.pop_front();
            self.base += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(revision: u64) -> GeoreferenceEvent {
        GeoreferenceEvent {
            revision,
            change: GeoreferenceChange::Origin,
        }
    }

    #[test]
    fn subscriber_sees_only_events_after_subscribing() {
        let mut events = GeoreferenceEvents::new();
        events.push(event(1));

        let id = events.subscribe();
        events.push(event(2));
        events.push(event(3));

        let seen: Vec<u64> = events.poll(id).iter().map(|e| e.revision).collect();
        assert_eq!(seen, vec![2, 3]);
        assert!(events.poll(id).is_empty());
    }

    #[test]
    fn subscribers_have_independent_cursors() {
        let mut events = GeoreferenceEvents::new();
        let a = events.subscribe();
        let b = events.subscribe();

        events.push(event(1));
        assert_eq!(events.poll(a).len(), 1);

        events.push(event(2));
        assert_eq!(events.poll(a).len(), 1);
        assert_eq!(events.poll(b).len(), 2);
    }

    #[test]
    fn unsubscribed_receives_nothing() {
        let mut events = GeoreferenceEvents::new();
        let id = events.subscribe();
        events.unsubscribe(id);

        events.push(event(1));
        assert!(events.poll(id).is_empty());
        assert_eq!(events.subscriber_count(), 0);
    }

    #[test]
    fn events_are_dropped_once_everyone_has_seen_them() {
        let mut events = GeoreferenceEvents::new();
        let a = events.subscribe();
        let b = events.subscribe();

        events.push(event(1));
        events.push(event(2));
        let _ = events.poll(a);
        assert_eq!(events.events.len(), 2);

        let _ = events.poll(b);
        assert!(events.events.is_empty());
    }

    #[test]
    fn push_without_subscribers_is_dropped() {
        let mut events = GeoreferenceEvents::new();
        events.push(event(1));
        assert!(events.events.is_empty());
    }
}
