//! Read-only notification channels.
//!
//! Every component instance owns one broadcast channel; the clock owns one
//! more. Components publish through an [`Emitter`], external consumers
//! [`Notifier::subscribe`]. A channel may also relay into other channels,
//! which is how a receiver re-emits the notifications of the markets it
//! trades on.
//!
//! Publishing never blocks and never fails: with no subscribers the
//! notification is dropped, and lagging subscribers lose the oldest
//! messages.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::trace;

use supplysim_types::{ComponentKind, EngineId, GameTime, Notification, NotificationKind};

/// Default per-channel buffer.
pub const DEFAULT_CAPACITY: usize = 256;

/// Address of one channel: a component of a node, or the clock (`None`).
pub type ChannelKey = (String, Option<ComponentKind>);

/// Publishing half handed to one component.
#[derive(Debug, Clone)]
pub struct Emitter {
    engine_id: EngineId,
    node_name: String,
    target: String,
    senders: Vec<broadcast::Sender<Notification>>,
}

impl Emitter {
    /// An emitter with no subscribers, for components used standalone.
    pub fn detached(node_name: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            engine_id: EngineId::new(),
            node_name: node_name.into(),
            target: kind.as_str().to_owned(),
            senders: Vec::new(),
        }
    }

    /// Name of the publishing node.
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Publish a notification and return it.
    pub fn emit(
        &self,
        kind: NotificationKind,
        game_time: GameTime,
        payload: serde_json::Value,
    ) -> Notification {
        let notification = Notification {
            kind,
            target: self.target.clone(),
            time: Utc::now(),
            game_time,
            node_name: self.node_name.clone(),
            engine_id: self.engine_id,
            payload,
        };
        for sender in &self.senders {
            if sender.send(notification.clone()).is_err() {
                trace!(kind = ?kind, node = %self.node_name, "No subscribers");
            }
        }
        notification
    }
}

/// The set of notification channels of one game.
#[derive(Debug)]
pub struct Notifier {
    engine_id: EngineId,
    capacity: usize,
    channels: BTreeMap<ChannelKey, broadcast::Sender<Notification>>,
    relays: BTreeMap<ChannelKey, BTreeSet<ChannelKey>>,
}

impl Notifier {
    /// Create a notifier with the clock channel registered.
    pub fn new(engine_id: EngineId) -> Self {
        Self::with_capacity(engine_id, DEFAULT_CAPACITY)
    }

    /// Create a notifier whose channels buffer `capacity` messages.
    pub fn with_capacity(engine_id: EngineId, capacity: usize) -> Self {
        let mut notifier = Self {
            engine_id,
            capacity: capacity.max(1),
            channels: BTreeMap::new(),
            relays: BTreeMap::new(),
        };
        notifier.ensure((String::new(), None));
        notifier
    }

    /// Register the channel of a node component. Idempotent.
    pub fn register(&mut self, node_name: &str, kind: ComponentKind) {
        self.ensure((node_name.to_owned(), Some(kind)));
    }

    /// Forward everything published on `source` to `target` as well.
    ///
    /// Takes effect for emitters created afterwards.
    pub fn relay(&mut self, source: ChannelKey, target: ChannelKey) {
        self.ensure(source.clone());
        self.ensure(target.clone());
        self.relays.entry(source).or_default().insert(target);
    }

    /// Build the emitter of a node component.
    pub fn emitter(&mut self, node_name: &str, kind: ComponentKind) -> Emitter {
        self.emitter_for((node_name.to_owned(), Some(kind)), kind.as_str())
    }

    /// Build the clock emitter.
    pub fn clock_emitter(&mut self) -> Emitter {
        self.emitter_for((String::new(), None), "clock")
    }

    /// Subscribe to a node component's channel, or the clock's with
    /// `kind == None`.
    ///
    /// Returns `None` if no such channel was registered.
    pub fn subscribe(
        &self,
        node_name: &str,
        kind: Option<ComponentKind>,
    ) -> Option<broadcast::Receiver<Notification>> {
        self.channels
            .get(&(node_name.to_owned(), kind))
            .map(broadcast::Sender::subscribe)
    }

    /// Subscribe to the clock channel.
    pub fn subscribe_clock(&self) -> broadcast::Receiver<Notification> {
        match self.channels.get(&(String::new(), None)) {
            Some(sender) => sender.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    fn ensure(&mut self, key: ChannelKey) {
        let capacity = self.capacity;
        self.channels
            .entry(key)
            .or_insert_with(|| broadcast::channel(capacity).0);
    }

    fn emitter_for(&mut self, key: ChannelKey, target: &str) -> Emitter {
        self.ensure(key.clone());
        let mut senders = Vec::new();
        if let Some(own) = self.channels.get(&key) {
            senders.push(own.clone());
        }
        if let Some(targets) = self.relays.get(&key) {
            senders.extend(targets.iter().filter_map(|t| self.channels.get(t).cloned()));
        }
        Emitter {
            engine_id: self.engine_id,
            node_name: key.0,
            target: target.to_owned(),
            senders,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_component_notifications() {
        let mut notifier = Notifier::new(EngineId::new());
        notifier.register("factory", ComponentKind::Inventory);
        let mut rx = notifier
            .subscribe("factory", Some(ComponentKind::Inventory))
            .unwrap();

        let emitter = notifier.emitter("factory", ComponentKind::Inventory);
        emitter.emit(
            NotificationKind::InventoryImport,
            GameTime::working(1, 2),
            serde_json::json!({"unit": 3}),
        );

        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind, NotificationKind::InventoryImport);
        assert_eq!(received.target, "inventory");
        assert_eq!(received.node_name, "factory");
    }

    #[tokio::test]
    async fn relays_reach_receiver_channels() {
        let mut notifier = Notifier::new(EngineId::new());
        notifier.relay(
            (String::from("exchange"), Some(ComponentKind::BiddingMarket)),
            (String::from("retailer"), Some(ComponentKind::BiddingReceiver)),
        );
        let mut rx = notifier
            .subscribe("retailer", Some(ComponentKind::BiddingReceiver))
            .unwrap();

        let emitter = notifier.emitter("exchange", ComponentKind::BiddingMarket);
        emitter.emit(
            NotificationKind::BiddingReleased,
            GameTime::working(1, 0),
            serde_json::Value::Null,
        );

        let received = rx.recv().await.unwrap();
        assert_eq!(received.node_name, "exchange");
        assert_eq!(received.kind, NotificationKind::BiddingReleased);
    }

    #[test]
    fn unknown_channel_has_no_subscription() {
        let notifier = Notifier::new(EngineId::new());
        assert!(notifier.subscribe("ghost", Some(ComponentKind::Io)).is_none());
        assert!(notifier.subscribe("", None).is_some());
    }

    #[test]
    fn emitting_without_subscribers_is_fine() {
        let emitter = Emitter::detached("factory", ComponentKind::Account);
        let n = emitter.emit(
            NotificationKind::Tick,
            GameTime::working(1, 1),
            serde_json::Value::Null,
        );
        assert_eq!(n.target, "account");
    }
}
