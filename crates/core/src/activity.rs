//! User activity events and the sources that produce them

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// A qualifying user interaction. Only the fact that it happened matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityEvent {
    PointerMove,
    KeyPress,
    Click,
    Scroll,
}

impl ActivityEvent {
    /// Every event kind that resets the idle clock
    pub const ALL: [Self; 4] = [Self::PointerMove, Self::KeyPress, Self::Click, Self::Scroll];

    /// DOM event type the browser listener registers for
    #[must_use]
    pub const fn dom_event_name(self) -> &'static str {
        match self {
            Self::PointerMove => "mousemove",
            Self::KeyPress => "keydown",
            Self::Click => "click",
            Self::Scroll => "scroll",
        }
    }
}

impl fmt::Display for ActivityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dom_event_name())
    }
}

/// Sender half handed to an activity source on subscribe
pub type ActivitySender = mpsc::UnboundedSender<ActivityEvent>;

/// Something that can report user activity to a single subscriber.
///
/// The returned [`Subscription`] unsubscribes when dropped, so every exit path
/// of the subscriber releases the listener.
pub trait ActivitySource: Send + Sync {
    fn subscribe(&self, sender: ActivitySender) -> Subscription;
}

/// Guard for an active subscription. Dropping it runs the release hook.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription with nothing to release
    pub fn noop() -> Self {
        Self { release: None }
    }

    /// Release explicitly
    pub fn unsubscribe(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// In-process activity source for native hosts and tests
#[derive(Clone, Default)]
pub struct ChannelActivitySource {
    subscriber: Arc<Mutex<Option<(u64, ActivitySender)>>>,
    next_id: Arc<Mutex<u64>>,
}

impl ChannelActivitySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to the current subscriber.
    ///
    /// Returns `false` when nobody is listening.
    pub fn emit(&self, event: ActivityEvent) -> bool {
        let Ok(guard) = self.subscriber.lock() else {
            return false;
        };
        match guard.as_ref() {
            Some((_, sender)) => sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Whether a subscriber is currently attached
    pub fn has_subscriber(&self) -> bool {
        self.subscriber
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }
}

impl ActivitySource for ChannelActivitySource {
    fn subscribe(&self, sender: ActivitySender) -> Subscription {
        let id = match self.next_id.lock() {
            Ok(mut next) => {
                *next += 1;
                *next
            }
            Err(_) => return Subscription::noop(),
        };
        if let Ok(mut guard) = self.subscriber.lock() {
            *guard = Some((id, sender));
        }

        let subscriber = self.subscriber.clone();
        Subscription::new(move || {
            if let Ok(mut guard) = subscriber.lock() {
                // A newer subscription may have replaced this one
                if matches!(guard.as_ref(), Some((current, _)) if *current == id) {
                    *guard = None;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dom_event_names() {
        let names: Vec<_> = ActivityEvent::ALL
            .iter()
            .map(|e| e.dom_event_name())
            .collect();
        assert_eq!(names, vec!["mousemove", "keydown", "click", "scroll"]);
    }

    #[test]
    fn test_channel_source_delivers_while_subscribed() {
        let source = ChannelActivitySource::new();
        assert!(!source.emit(ActivityEvent::Click));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = source.subscribe(tx);
        assert!(source.has_subscriber());
        assert!(source.emit(ActivityEvent::Click));
        assert_eq!(rx.try_recv().unwrap(), ActivityEvent::Click);

        drop(subscription);
        assert!(!source.has_subscriber());
        assert!(!source.emit(ActivityEvent::Scroll));
    }

    #[test]
    fn test_stale_subscription_does_not_remove_newer() {
        let source = ChannelActivitySource::new();
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let first = source.subscribe(tx1);
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let _second = source.subscribe(tx2);

        first.unsubscribe();
        assert!(source.has_subscriber());
        assert!(source.emit(ActivityEvent::KeyPress));
        assert_eq!(rx2.try_recv().unwrap(), ActivityEvent::KeyPress);
    }
}
