use common::comm::{BusMessage, MessageKind};
use jeflog::{pass, warn};
use std::{
  collections::HashMap,
  sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};
use tokio::{io, net::UdpSocket};

/// A callback receiving every matching message published on a topic.
pub type Handler = Box<dyn FnMut(&BusMessage) + Send>;

struct Subscriber {
  id: u64,
  kinds: Vec<MessageKind>,
  handler: Handler,
}

#[derive(Default)]
struct Topics {
  next_id: u64,
  subscribers: HashMap<String, Vec<Subscriber>>,
}

/// An in-process publish/subscribe bus.
///
/// Handlers run synchronously inside [`Bus::publish`] while the bus is locked,
/// so a handler must not subscribe, publish or stop a subscription itself.
#[derive(Clone, Default)]
pub struct Bus {
  topics: Arc<Mutex<Topics>>,
}

fn lock(topics: &Mutex<Topics>) -> MutexGuard<'_, Topics> {
  topics.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Bus {
  /// Creates a bus with no subscribers.
  pub fn new() -> Self {
    Bus::default()
  }

  /// Subscribes `handler` to the messages on `topic` whose kind is one of
  /// `kinds`. The subscription lasts until it is stopped or dropped.
  pub fn subscribe<F>(
    &self,
    topic: &str,
    kinds: &[MessageKind],
    handler: F,
  ) -> Subscription
  where
    F: FnMut(&BusMessage) + Send + 'static,
  {
    let mut topics = lock(&self.topics);
    let id = topics.next_id;
    topics.next_id += 1;

    topics
      .subscribers
      .entry(topic.to_owned())
      .or_default()
      .push(Subscriber {
        id,
        kinds: kinds.to_vec(),
        handler: Box::new(handler),
      });

    Subscription {
      topics: Arc::downgrade(&self.topics),
      topic: topic.to_owned(),
      id,
      active: true,
    }
  }

  /// Delivers `message` to every matching subscriber of `topic`, returning how
  /// many received it.
  pub fn publish(&self, topic: &str, message: &BusMessage) -> usize {
    let mut topics = lock(&self.topics);
    let kind = message.kind();

    let Some(subscribers) = topics.subscribers.get_mut(topic) else {
      return 0;
    };

    let mut delivered = 0;

    for subscriber in subscribers.iter_mut() {
      if subscriber.kinds.contains(&kind) {
        (subscriber.handler)(message);
        delivered += 1;
      }
    }

    delivered
  }

  /// Number of live subscriptions on `topic`.
  pub fn subscriber_count(&self, topic: &str) -> usize {
    lock(&self.topics)
      .subscribers
      .get(topic)
      .map_or(0, Vec::len)
  }
}

/// A live subscription on a [`Bus`]. Stopping it takes effect before
/// [`Subscription::stop`] returns.
#[derive(Debug)]
pub struct Subscription {
  topics: Weak<Mutex<Topics>>,
  topic: String,
  id: u64,
  active: bool,
}

impl Subscription {
  /// Removes the handler from the bus. Stopping twice is a no-op.
  pub fn stop(&mut self) {
    if !self.is_active() {
      return;
    }

    self.active = false;

    let Some(topics) = self.topics.upgrade() else {
      return;
    };

    let mut topics = lock(&topics);

    if let Some(subscribers) = topics.subscribers.get_mut(&self.topic) {
      subscribers.retain(|subscriber| subscriber.id != self.id);
    }
  }

  /// Whether the handler is still subscribed.
  pub fn is_active(&self) -> bool {
    self.active
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    self.stop();
  }
}

/// Receives JSON-encoded bus messages as UDP datagrams on `port` and publishes
/// them on `topic`.
///
/// This is where message shape is validated: datagrams that do not decode into
/// a known message are logged and dropped.
pub async fn listen(bus: Bus, topic: String, port: u16) -> io::Result<()> {
  let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
  pass!("Listening for telemetry on UDP port \x1b[1m{port}\x1b[0m.");

  relay(bus, topic, socket).await
}

/// Publishes every decodable datagram arriving on `socket`.
pub async fn relay(bus: Bus, topic: String, socket: UdpSocket) -> io::Result<()> {
  let mut buffer = vec![0; 65_536];

  loop {
    let (size, peer) = socket.recv_from(&mut buffer).await?;

    match serde_json::from_slice::<BusMessage>(&buffer[..size]) {
      Ok(message) => {
        bus.publish(&topic, &message);
      }
      Err(error) => {
        warn!("Dropped malformed telemetry from \x1b[1m{peer}\x1b[0m: {error}");
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use common::comm::motors::MotorState;
  use std::time::Duration;

  fn motors(x: f64) -> BusMessage {
    BusMessage::Motors {
      motor: MotorState {
        current_x: x,
        ..MotorState::default()
      },
    }
  }

  fn recorder() -> (Arc<Mutex<Vec<BusMessage>>>, impl FnMut(&BusMessage) + Send) {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = received.clone();

    (received, move |message: &BusMessage| {
      sink.lock().unwrap().push(message.clone())
    })
  }

  #[test]
  fn delivers_only_subscribed_kinds_and_topics() {
    let bus = Bus::new();
    let (received, handler) = recorder();
    let _subscription = bus.subscribe("status", &[MessageKind::Motors], handler);

    let sfp = BusMessage::Sfp {
      sfp: Default::default(),
    };

    assert_eq!(bus.publish("status", &motors(1.0)), 1);
    assert_eq!(bus.publish("status", &sfp), 0);
    assert_eq!(bus.publish("other", &motors(2.0)), 0);

    assert_eq!(*received.lock().unwrap(), [motors(1.0)]);
  }

  #[test]
  fn stop_takes_effect_immediately() {
    let bus = Bus::new();
    let (received, handler) = recorder();
    let mut subscription =
      bus.subscribe("status", &[MessageKind::Sfp, MessageKind::Motors], handler);

    bus.publish("status", &motors(1.0));
    subscription.stop();
    subscription.stop();

    assert!(!subscription.is_active());
    assert_eq!(bus.subscriber_count("status"), 0);
    assert_eq!(bus.publish("status", &motors(2.0)), 0);
    assert_eq!(received.lock().unwrap().len(), 1);
  }

  #[test]
  fn dropping_subscription_unsubscribes() {
    let bus = Bus::new();
    let (_, handler) = recorder();

    drop(bus.subscribe("status", &[MessageKind::Motors], handler));
    assert_eq!(bus.subscriber_count("status"), 0);
  }

  #[tokio::test]
  async fn relays_valid_datagrams_and_drops_the_rest() -> anyhow::Result<()> {
    let bus = Bus::new();
    let (received, handler) = recorder();
    let _subscription = bus.subscribe("status", &[MessageKind::Motors], handler);

    let socket = UdpSocket::bind("127.0.0.1:0").await?;
    let address = socket.local_addr()?;
    let relay = tokio::spawn(relay(bus.clone(), "status".to_owned(), socket));

    let sender = UdpSocket::bind("127.0.0.1:0").await?;
    sender.send_to(b"{\"type\": \"motors\"}", address).await?;
    sender
      .send_to(
        br#"{"type": "motors", "motor": {"current_x": 3, "current_y": 0}}"#,
        address,
      )
      .await?;

    for _ in 0..100 {
      if !received.lock().unwrap().is_empty() {
        break;
      }

      tokio::time::sleep(Duration::from_millis(10)).await;
    }

    relay.abort();
    assert_eq!(*received.lock().unwrap(), [motors(3.0)]);

    Ok(())
  }
}
