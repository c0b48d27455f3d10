//! Push-based position fix subscription
//!
//! Each subscriber owns the receiving end of its own channel; dropping the
//! receiver or calling [`LocationFeed::unsubscribe`] ends delivery.

use crate::core::PositionFix;
use log::debug;
use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};

/// Subscription registration handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u32);

impl SubscriptionHandle {
    pub fn id(&self) -> u32 {
        self.0
    }
}

/// Fan-out of position fixes to any number of subscribers
#[derive(Debug, Default)]
pub struct LocationFeed {
    subscribers: HashMap<SubscriptionHandle, Sender<PositionFix>>,
    next_handle: u32,
    published: u64,
}

impl LocationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber; fixes arrive on the receiver in publish order
    pub fn subscribe(&mut self) -> (SubscriptionHandle, Receiver<PositionFix>) {
        let (sender, receiver) = channel();
        let handle = SubscriptionHandle(self.next_handle);
        self.next_handle += 1;
        self.subscribers.insert(handle, sender);
        debug!("Location subscriber {} registered", handle.id());
        (handle, receiver)
    }

    /// Stop delivery to a subscriber. Returns false for unknown handles.
    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) -> bool {
        let removed = self.subscribers.remove(&handle).is_some();
        if removed {
            debug!("Location subscriber {} removed", handle.id());
        }
        removed
    }

    /// Deliver a fix to every live subscriber, dropping those whose receiver
    /// is gone. Returns the number of deliveries.
    pub fn publish(&mut self, fix: PositionFix) -> usize {
        self.published += 1;
        self.subscribers.retain(|handle, sender| {
            let alive = sender.send(fix).is_ok();
            if !alive {
                debug!("Location subscriber {} disconnected", handle.id());
            }
            alive
        });
        self.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Fixes published since creation
    pub fn published(&self) -> u64 {
        self.published
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GeoPoint;

    fn fix(t: u64) -> PositionFix {
        PositionFix::new(GeoPoint::new(1.0, 2.0).unwrap(), 5.0, t).unwrap()
    }

    #[test]
    fn test_fixes_arrive_in_publish_order() {
        let mut feed = LocationFeed::new();
        let (_, receiver) = feed.subscribe();
        for t in [10, 20, 30] {
            assert_eq!(feed.publish(fix(t)), 1);
        }
        let received: Vec<u64> = receiver.try_iter().map(|f| f.timestamp_ms).collect();
        assert_eq!(received, vec![10, 20, 30]);
    }

    #[test]
    fn test_unsubscribe_cancels_delivery() {
        let mut feed = LocationFeed::new();
        let (first, first_rx) = feed.subscribe();
        let (second, second_rx) = feed.subscribe();
        assert_ne!(first, second);

        assert!(feed.unsubscribe(first));
        assert!(!feed.unsubscribe(first));
        feed.publish(fix(1));

        assert!(first_rx.try_recv().is_err());
        assert_eq!(second_rx.try_recv().unwrap().timestamp_ms, 1);
    }

    #[test]
    fn test_dropped_receivers_are_pruned() {
        let mut feed = LocationFeed::new();
        let (_, receiver) = feed.subscribe();
        drop(receiver);
        assert_eq!(feed.publish(fix(1)), 0);
        assert_eq!(feed.subscriber_count(), 0);
        assert_eq!(feed.published(), 1);
    }
}
