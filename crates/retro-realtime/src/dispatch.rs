//! Subscription registry and message fan-out to caller handlers.

use std::collections::HashMap;
use std::sync::Arc;

use retro_stomp::Frame;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::topic::Topic;

/// Callback invoked with each deserialized message body.
pub type MessageHandler = Arc<dyn Fn(serde_json::Value) + Send + Sync>;

/// One registered subscription.
struct SubscriptionEntry {
    topic: Topic,
    handler: MessageHandler,
}

/// Active subscriptions for the current link, keyed by subscription id.
///
/// Every subscribe call gets its own entry — two subscriptions to the same
/// topic are never merged, so both handlers keep receiving.
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    entries: HashMap<String, SubscriptionEntry>,
}

impl SubscriptionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a handler and mint the subscription id for its SUBSCRIBE
    /// frame.
    pub(crate) fn register(&mut self, topic: Topic, handler: MessageHandler) -> String {
        let id = format!("sub-{}", Uuid::now_v7());
        let _ = self.entries.insert(
            id.clone(),
            SubscriptionEntry { topic, handler },
        );
        id
    }

    /// Route a MESSAGE frame to the handler its `subscription` header names.
    ///
    /// Malformed bodies are dropped with a log; the channel is best-effort
    /// and the REST API remains the source of truth.
    pub(crate) fn dispatch(&self, frame: &Frame) {
        let Some(sub_id) = frame.get_header("subscription") else {
            warn!("MESSAGE frame without subscription header; dropping");
            return;
        };
        let Some(entry) = self.entries.get(sub_id) else {
            debug!(sub_id, "message for unknown subscription; dropping");
            return;
        };
        match serde_json::from_slice::<serde_json::Value>(&frame.body) {
            Ok(payload) => (entry.handler)(payload),
            Err(e) => {
                warn!(
                    topic = %entry.topic,
                    sub_id,
                    "dropping malformed message body: {e}"
                );
            }
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topic::Category;
    use retro_stomp::Command;
    use std::sync::Mutex;

    fn collecting_handler() -> (MessageHandler, Arc<Mutex<Vec<serde_json::Value>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let handler: MessageHandler = Arc::new(move |v| sink.lock().unwrap().push(v));
        (handler, seen)
    }

    fn message(sub_id: &str, body: &[u8]) -> Frame {
        let mut frame = Frame::new(Command::Message)
            .header("subscription", sub_id)
            .header("destination", "/topic/team-1/thoughts");
        frame.body = body.to_vec();
        frame
    }

    #[test]
    fn register_mints_unique_ids() {
        let mut reg = SubscriptionRegistry::new();
        let (h1, _) = collecting_handler();
        let (h2, _) = collecting_handler();
        let id1 = reg.register(Topic::new("t", Category::Thoughts), h1);
        let id2 = reg.register(Topic::new("t", Category::Thoughts), h2);
        assert_ne!(id1, id2);
    }

    #[test]
    fn dispatch_routes_to_named_subscription() {
        let mut reg = SubscriptionRegistry::new();
        let (h1, seen1) = collecting_handler();
        let (h2, seen2) = collecting_handler();
        let id1 = reg.register(Topic::new("t", Category::Thoughts), h1);
        let _id2 = reg.register(Topic::new("t", Category::ActionItems), h2);

        reg.dispatch(&message(&id1, br#"{"id":7}"#));

        assert_eq!(seen1.lock().unwrap().len(), 1);
        assert_eq!(seen1.lock().unwrap()[0]["id"], 7);
        assert!(seen2.lock().unwrap().is_empty());
    }

    #[test]
    fn same_topic_subscriptions_both_receive() {
        let mut reg = SubscriptionRegistry::new();
        let (h1, seen1) = collecting_handler();
        let (h2, seen2) = collecting_handler();
        let topic = Topic::new("team-1", Category::Thoughts);
        let id1 = reg.register(topic.clone(), h1);
        let id2 = reg.register(topic, h2);

        // Broker fans out one copy per subscription id.
        reg.dispatch(&message(&id1, br#"{"n":1}"#));
        reg.dispatch(&message(&id2, br#"{"n":1}"#));

        assert_eq!(seen1.lock().unwrap().len(), 1);
        assert_eq!(seen2.lock().unwrap().len(), 1);
    }

    #[test]
    fn malformed_body_dropped_without_panic() {
        let mut reg = SubscriptionRegistry::new();
        let (handler, seen) = collecting_handler();
        let id = reg.register(Topic::new("t", Category::EndRetro), handler);

        reg.dispatch(&message(&id, b"not json at all"));

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn unknown_subscription_dropped() {
        let reg = SubscriptionRegistry::new();
        // No entries — must not panic.
        reg.dispatch(&message("sub-nobody", b"{}"));
    }

    #[test]
    fn frame_without_subscription_header_dropped() {
        let mut reg = SubscriptionRegistry::new();
        let (handler, seen) = collecting_handler();
        let _id = reg.register(Topic::new("t", Category::Thoughts), handler);

        let mut frame = Frame::new(Command::Message);
        frame.body = b"{}".to_vec();
        reg.dispatch(&frame);

        assert!(seen.lock().unwrap().is_empty());
    }
}
