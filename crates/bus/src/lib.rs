//! Ordered publish/subscribe channel for compile outcomes.
//!
//! The preview renderer publishes one [`CompileEvent`] per finished compile
//! attempt; the session coordinator and any UI feedback surface subscribe.
//! Every subscriber owns an unbounded crossbeam receiver, so publishing never
//! blocks and each subscriber sees events in publish order.
//!
//! Types:
//!
//! - `CompileEvent` is the tagged payload: accepted source or failure message,
//!   always naming the example the compiled source was bound to.
//! - `NotificationBus` is the cloneable producer side.
//! - `Subscription` is one consumer's receiving end.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CompileEvent {
    SourceAccepted { example: String, source: String },
    CompileFailed { example: String, message: String },
}

impl CompileEvent {
    pub fn example(&self) -> &str {
        match self {
            CompileEvent::SourceAccepted { example, .. }
            | CompileEvent::CompileFailed { example, .. } => example,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CompileEvent::CompileFailed { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotificationBus {
    subscribers: Arc<Mutex<Vec<Sender<CompileEvent>>>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = unbounded();
        match self.subscribers.lock() {
            Ok(mut subscribers) => subscribers.push(tx),
            Err(poisoned) => poisoned.into_inner().push(tx),
        }
        Subscription { rx }
    }

    /// Delivers `event` to every live subscriber and returns how many received
    /// it. Subscribers whose [`Subscription`] was dropped are pruned.
    ///
    /// The lock is held across the sends so concurrent publishers cannot
    /// interleave differently for different subscribers.
    pub fn publish(&self, event: CompileEvent) -> usize {
        let mut subscribers = match self.subscribers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("notification bus lock poisoned; recovering");
                poisoned.into_inner()
            }
        };

        let before = subscribers.len();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        let delivered = subscribers.len();
        if delivered < before {
            debug!(pruned = before - delivered, "dropped closed bus subscribers");
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .map(|subscribers| subscribers.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }
}

#[derive(Debug)]
pub struct Subscription {
    rx: Receiver<CompileEvent>,
}

impl Subscription {
    pub fn try_next(&self) -> Option<CompileEvent> {
        self.rx.try_recv().ok()
    }

    /// Everything published since the last drain, in publish order.
    pub fn drain(&self) -> Vec<CompileEvent> {
        self.rx.try_iter().collect()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<CompileEvent> {
        match self.rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn accepted(example: &str, source: &str) -> CompileEvent {
        CompileEvent::SourceAccepted {
            example: example.into(),
            source: source.into(),
        }
    }

    fn failed(example: &str, message: &str) -> CompileEvent {
        CompileEvent::CompileFailed {
            example: example.into(),
            message: message.into(),
        }
    }

    #[test]
    fn every_subscriber_sees_publish_order() {
        let bus = NotificationBus::new();
        let first = bus.subscribe();
        let second = bus.subscribe();

        let events = vec![accepted("A", "a"), failed("B", "oops"), accepted("B", "b")];
        for event in events.clone() {
            assert_eq!(bus.publish(event), 2);
        }

        assert_eq!(first.drain(), events);
        assert_eq!(second.drain(), events);
        assert!(first.try_next().is_none());
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let bus = NotificationBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());
        assert_eq!(bus.subscriber_count(), 2);

        assert_eq!(bus.publish(accepted("A", "a")), 1);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.drain().len(), 1);
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let bus = NotificationBus::new();
        assert_eq!(bus.publish(failed("A", "bad")), 0);
    }

    #[test]
    fn delivery_crosses_threads_in_order() {
        let bus = NotificationBus::new();
        let sub = bus.subscribe();
        let producer = bus.clone();

        let handle = thread::spawn(move || {
            for i in 0..100 {
                producer.publish(accepted("A", &i.to_string()));
            }
        });
        handle.join().unwrap();

        let received: Vec<String> = sub
            .drain()
            .into_iter()
            .map(|event| match event {
                CompileEvent::SourceAccepted { source, .. } => source,
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        let expected: Vec<String> = (0..100).map(|i| i.to_string()).collect();
        assert_eq!(received, expected);
    }

    #[test]
    fn recv_timeout_returns_none_when_idle() {
        let bus = NotificationBus::new();
        let sub = bus.subscribe();
        assert!(sub.recv_timeout(Duration::from_millis(5)).is_none());
        bus.publish(failed("A", "bad"));
        let event = sub.recv_timeout(Duration::from_millis(5)).unwrap();
        assert_eq!(event.example(), "A");
        assert!(event.is_failure());
    }
}
