//! Deferred-call topics.
//!
//! Extension points such as `observe` or `cwv` are supplied late, by a lazily
//! loaded enhancer.  Callers do not have to wait for them: [`TopicBus::call`]
//! queues the arguments while a topic is unbound, and [`TopicBus::bind`]
//! replays the queue in FIFO order before switching the topic to direct
//! dispatch.
//!
//! ```rust,ignore
//! let bus = TopicBus::new();
//! bus.call("cwv", json!({ "LCP": 1200 }));        // queued
//! bus.bind("cwv", Arc::new(|args| report(args))); // replays the queued call
//! bus.call("cwv", json!({ "CLS": 0.01 }));        // dispatched directly
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, trace};

/// Handler bound to a topic.
pub type TopicHandler = Arc<dyn Fn(Value) + Send + Sync>;

enum TopicState {
    Buffering(VecDeque<Value>),
    Bound(TopicHandler),
}

impl Default for TopicState {
    fn default() -> Self {
        Self::Buffering(VecDeque::new())
    }
}

/// Keyed set of deferred-call topics.
#[derive(Default)]
pub struct TopicBus {
    topics: Mutex<HashMap<String, TopicState>>,
}

impl TopicBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `topic` so that it reports as buffering before any call.
    pub fn declare(&self, topic: &str) {
        self.topics.lock().entry(topic.to_string()).or_default();
    }

    /// Invokes `topic`, or queues `args` until a handler is bound.
    pub fn call(&self, topic: &str, args: Value) {
        let handler = {
            let mut topics = self.topics.lock();
            match topics.entry(topic.to_string()).or_default() {
                TopicState::Bound(handler) => Arc::clone(handler),
                TopicState::Buffering(queue) => {
                    queue.push_back(args);
                    trace!(topic, pending = queue.len(), "Queued deferred call");
                    return;
                }
            }
        };
        handler(args);
    }

    /// Binds `handler` to `topic`, replays queued calls in order, then
    /// dispatches later calls directly.
    ///
    /// Binding an already bound topic replaces its handler.
    pub fn bind(&self, topic: &str, handler: TopicHandler) {
        let pending = {
            let mut topics = self.topics.lock();
            let previous = topics.insert(topic.to_string(), TopicState::Bound(Arc::clone(&handler)));
            match previous {
                Some(TopicState::Buffering(queue)) => queue,
                _ => VecDeque::new(),
            }
        };
        debug!(topic, replayed = pending.len(), "Bound deferred-call topic");
        for args in pending {
            handler(args);
        }
    }

    /// Returns `true` if a handler is bound to `topic`.
    pub fn is_bound(&self, topic: &str) -> bool {
        matches!(self.topics.lock().get(topic), Some(TopicState::Bound(_)))
    }

    /// Number of calls waiting for `topic`'s handler.
    pub fn pending(&self, topic: &str) -> usize {
        match self.topics.lock().get(topic) {
            Some(TopicState::Buffering(queue)) => queue.len(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recorder() -> (Arc<Mutex<Vec<Value>>>, TopicHandler) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, Arc::new(move |v| sink.lock().push(v)))
    }

    #[test]
    fn test_calls_replay_in_order_on_bind() {
        let bus = TopicBus::new();
        bus.call("observe", json!(1));
        bus.call("observe", json!(2));
        bus.call("cwv", json!("other"));
        assert_eq!(bus.pending("observe"), 2);

        let (seen, handler) = recorder();
        bus.bind("observe", handler);
        assert_eq!(*seen.lock(), vec![json!(1), json!(2)]);
        assert_eq!(bus.pending("observe"), 0);
        assert_eq!(bus.pending("cwv"), 1);

        bus.call("observe", json!(3));
        assert_eq!(*seen.lock(), vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn test_queue_drains_only_once() {
        let bus = TopicBus::new();
        bus.call("cwv", json!("a"));
        let (first, handler) = recorder();
        bus.bind("cwv", handler);
        let (second, handler) = recorder();
        bus.bind("cwv", handler);
        assert_eq!(first.lock().len(), 1);
        assert!(second.lock().is_empty());
    }

    #[test]
    fn test_declare_reports_buffering() {
        let bus = TopicBus::new();
        bus.declare("observe");
        assert!(!bus.is_bound("observe"));
        assert_eq!(bus.pending("observe"), 0);
    }
}
