//! Synchronous callback registry notified after every board append.

use ledgerboard_chain::HashRecord;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Callback = Box<dyn Fn(&HashRecord) + Send + Sync>;

/// Callbacks run in subscription order on the dispatching thread.
#[derive(Default)]
pub struct Subscribers {
    next_id: u64,
    callbacks: BTreeMap<SubscriptionId, Callback>,
}

impl fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl Subscribers {
    pub fn subscribe(
        &mut self,
        callback: impl Fn(&HashRecord) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.callbacks.insert(id, Box::new(callback));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.callbacks.remove(&id).is_some()
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    pub fn publish(&self, record: &HashRecord) {
        for callback in self.callbacks.values() {
            callback(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerboard_chain::Chain;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    #[test]
    fn publish_reaches_live_subscribers_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut subscribers = Subscribers::default();

        let first = {
            let seen = Arc::clone(&seen);
            subscribers.subscribe(move |r| seen.lock().unwrap().push(format!("a:{}", r.action())))
        };
        {
            let seen = Arc::clone(&seen);
            subscribers.subscribe(move |r| seen.lock().unwrap().push(format!("b:{}", r.action())));
        }

        let mut chain = Chain::new();
        subscribers.publish(chain.append("PING", "Test", "t-1", json!({}), "alice"));
        assert!(subscribers.unsubscribe(first));
        assert!(!subscribers.unsubscribe(first));
        subscribers.publish(chain.append("PONG", "Test", "t-1", json!({}), "alice"));

        assert_eq!(*seen.lock().unwrap(), vec!["a:PING", "b:PING", "b:PONG"]);
        assert_eq!(subscribers.len(), 1);
    }
}
