use super::ServerMessage;
use crate::Identity;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;

/// Fan-out hub for server messages. Each WebSocket bridge subscribes an
/// unbounded channel; publishing is a synchronous send, the actual
/// socket write happens in the bridge task. Locks are never held across
/// an await.
#[derive(Default)]
pub struct Broadcast {
    subscribers: Mutex<HashMap<u64, Subscriber>>,
    count: AtomicU64,
}

struct Subscriber {
    identity: Identity,
    tx: UnboundedSender<String>,
}

impl Broadcast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `identity`. Returns the subscription
    /// id (for unsubscribe) and the receiving end the bridge drains.
    pub fn subscribe(&self, identity: Identity) -> (u64, UnboundedReceiver<String>) {
        let id = self.count.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .expect("broadcast lock")
            .insert(id, Subscriber { identity, tx });
        (id, rx)
    }

    pub fn unsubscribe(&self, id: u64) {
        self.subscribers.lock().expect("broadcast lock").remove(&id);
    }

    /// Send to every connection. Dead subscribers are dropped on the way.
    pub fn publish(&self, message: &ServerMessage) {
        let json = message.to_json();
        let mut subscribers = self.subscribers.lock().expect("broadcast lock");
        let dead = subscribers
            .iter()
            .filter(|(_, sub)| sub.tx.send(json.clone()).is_err())
            .map(|(id, _)| *id)
            .collect::<Vec<_>>();
        for id in dead {
            log::warn!("[gateway] dropping dead subscriber {}", id);
            subscribers.remove(&id);
        }
    }

    /// Send to every connection belonging to one identity.
    pub fn unicast(&self, who: &Identity, message: &ServerMessage) {
        let json = message.to_json();
        let subscribers = self.subscribers.lock().expect("broadcast lock");
        subscribers
            .values()
            .filter(|sub| &sub.identity == who)
            .map(|sub| sub.tx.send(json.clone()))
            .filter_map(|res| res.err())
            .for_each(|e| log::warn!("failed unicast to {}: {:?}", who, e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_reaches_all_subscribers() {
        let hub = Broadcast::new();
        let (_, mut rx1) = hub.subscribe(String::from("alice"));
        let (_, mut rx2) = hub.subscribe(String::from("bob"));
        hub.publish(&ServerMessage::timer(1, 240, 0, None));
        assert!(rx1.try_recv().unwrap().contains("timer"));
        assert!(rx2.try_recv().unwrap().contains("timer"));
    }

    #[test]
    fn unicast_targets_one_identity() {
        let hub = Broadcast::new();
        let (_, mut alice) = hub.subscribe(String::from("alice"));
        let (_, mut bob) = hub.subscribe(String::from("bob"));
        hub.unicast(
            &String::from("alice"),
            &ServerMessage::coins(String::from("alice"), 900, None),
        );
        assert!(alice.try_recv().is_ok());
        assert!(bob.try_recv().is_err());
    }

    #[test]
    fn unicast_reaches_every_tab() {
        let hub = Broadcast::new();
        let (_, mut tab1) = hub.subscribe(String::from("alice"));
        let (_, mut tab2) = hub.subscribe(String::from("alice"));
        hub.unicast(
            &String::from("alice"),
            &ServerMessage::coins(String::from("alice"), 900, None),
        );
        assert!(tab1.try_recv().is_ok());
        assert!(tab2.try_recv().is_ok());
    }

    #[test]
    fn dead_subscribers_are_pruned() {
        let hub = Broadcast::new();
        let (_, rx) = hub.subscribe(String::from("alice"));
        drop(rx);
        let (_, mut live) = hub.subscribe(String::from("bob"));
        hub.publish(&ServerMessage::timer(1, 240, 0, None));
        hub.publish(&ServerMessage::timer(1, 239, 0, None));
        assert!(live.try_recv().unwrap().contains("240"));
        assert!(live.try_recv().unwrap().contains("239"));
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let hub = Broadcast::new();
        let (id, mut rx) = hub.subscribe(String::from("alice"));
        hub.unsubscribe(id);
        hub.publish(&ServerMessage::timer(1, 240, 0, None));
        assert!(rx.try_recv().is_err());
    }
}
