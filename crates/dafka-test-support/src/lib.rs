//! An in-process, channel-backed transport for exercising `dafka-consumer`
//! without a real network stack.
//!
//! Mirrors the mock-server/mock-client pattern this workspace's sibling
//! crates use for their own integration tests: a shared bus stands in for
//! the zeromq PUB/SUB fabric, with the same kind-byte-plus-key prefix
//! matching `dafka_proto::filter_prefix` defines for the real wire filters.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use dafka_consumer::transport::{Beacon, BeaconEvent, Publisher, Subscriber};
use dafka_consumer::TransportError;
use dafka_proto::{filter_prefix, FilterKind, InboundFrame, OutboundFrame};

const BUS_CAPACITY: usize = 1024;
const BEACON_EVENT_CAPACITY: usize = 32;
const OUTBOUND_CAPACITY: usize = 256;

/// One frame in flight on the bus, tagged with the prefix a subscriber's
/// filter set must contain to receive it.
#[derive(Debug, Clone)]
struct Envelope {
    prefix: String,
    frame: InboundFrame,
}

/// A shared in-process stand-in for the zeromq fabric a real deployment
/// would use. Clone to hand copies to producers/stores in a test.
#[derive(Clone)]
pub struct InProcessBus {
    tx: broadcast::Sender<Envelope>,
}

impl InProcessBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(BUS_CAPACITY);
        InProcessBus { tx }
    }

    /// Publish a `DATA` frame on `topic`.
    pub fn publish_data(&self, topic: &str, frame: InboundFrame) {
        self.publish(filter_prefix(FilterKind::Data, topic), frame);
    }

    /// Publish a `HEAD` frame on `topic`.
    pub fn publish_head(&self, topic: &str, frame: InboundFrame) {
        self.publish(filter_prefix(FilterKind::Head, topic), frame);
    }

    /// Publish a `DIRECT` frame addressed to `consumer_address`.
    pub fn publish_direct(&self, consumer_address: &str, frame: InboundFrame) {
        self.publish(filter_prefix(FilterKind::Direct, consumer_address), frame);
    }

    fn publish(&self, prefix: String, frame: InboundFrame) {
        // No subscribers is not an error: matches a real PUB socket with
        // nobody listening yet.
        let _ = self.tx.send(Envelope { prefix, frame });
    }

    /// Create a new subscriber attached to this bus, with no filters
    /// installed yet.
    pub fn subscriber(&self) -> InProcessSubscriber {
        InProcessSubscriber {
            rx: self.tx.subscribe(),
            filters: HashSet::new(),
        }
    }
}

impl Default for InProcessBus {
    fn default() -> Self {
        InProcessBus::new()
    }
}

/// The inbound half of the in-process transport: a broadcast receiver plus
/// the set of installed filter prefixes.
pub struct InProcessSubscriber {
    rx: broadcast::Receiver<Envelope>,
    filters: HashSet<String>,
}

#[async_trait]
impl Subscriber for InProcessSubscriber {
    async fn subscribe_data(&mut self, topic: &str) -> Result<(), TransportError> {
        self.filters.insert(filter_prefix(FilterKind::Data, topic));
        Ok(())
    }

    async fn subscribe_head(&mut self, topic: &str) -> Result<(), TransportError> {
        self.filters.insert(filter_prefix(FilterKind::Head, topic));
        Ok(())
    }

    async fn subscribe_direct(&mut self, consumer_address: &str) -> Result<(), TransportError> {
        self.filters
            .insert(filter_prefix(FilterKind::Direct, consumer_address));
        Ok(())
    }

    async fn recv(&mut self) -> Result<InboundFrame, TransportError> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) if self.filters.contains(&envelope.prefix) => {
                    return Ok(envelope.frame)
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return Err(TransportError::Closed),
            }
        }
    }
}

/// The outbound half: every `send` is pushed onto a channel a test can drain
/// to assert on what the consumer emitted.
pub struct InProcessPublisher {
    tx: mpsc::Sender<OutboundFrame>,
    local_port: Option<u16>,
}

#[async_trait]
impl Publisher for InProcessPublisher {
    async fn send(&mut self, frame: OutboundFrame) -> Result<(), TransportError> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| TransportError::Send("outbound receiver dropped".into()))
    }

    fn local_port(&self) -> Option<u16> {
        self.local_port
    }
}

/// Build a connected publisher/receiver pair. `local_port` is handed to the
/// beacon collaborator verbatim; it has no meaning for this transport.
pub fn publisher_pair(local_port: Option<u16>) -> (InProcessPublisher, mpsc::Receiver<OutboundFrame>) {
    let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
    (InProcessPublisher { tx, local_port }, rx)
}

/// A beacon collaborator that completes its handshake immediately and
/// otherwise only surfaces events a test injects through its paired sender.
pub struct InProcessBeacon {
    events: mpsc::Receiver<BeaconEvent>,
}

#[async_trait]
impl Beacon for InProcessBeacon {
    async fn start(&mut self, _consumer_address: &str, _port: Option<u16>) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_event(&mut self) -> Result<BeaconEvent, TransportError> {
        self.events.recv().await.ok_or(TransportError::Closed)
    }

    async fn shutdown(&mut self) {
        self.events.close();
    }
}

/// Build a connected beacon/sender pair. Send `BeaconEvent`s through the
/// sender to simulate peer discovery during a test.
pub fn beacon_pair() -> (InProcessBeacon, mpsc::Sender<BeaconEvent>) {
    let (tx, rx) = mpsc::channel(BEACON_EVENT_CAPACITY);
    (InProcessBeacon { events: rx }, tx)
}

/// Bundles one bus plus a freshly wired subscriber/publisher/beacon, the
/// shape every scenario test needs to hand to `dafka_consumer::event_loop::spawn`.
pub struct Scenario {
    pub bus: InProcessBus,
    pub subscriber: InProcessSubscriber,
    pub publisher: InProcessPublisher,
    pub outbound: mpsc::Receiver<OutboundFrame>,
    pub beacon: InProcessBeacon,
    pub beacon_events: mpsc::Sender<BeaconEvent>,
}

impl Scenario {
    pub fn new() -> Self {
        let bus = InProcessBus::new();
        let subscriber = bus.subscriber();
        let (publisher, outbound) = publisher_pair(None);
        let (beacon, beacon_events) = beacon_pair();
        Scenario {
            bus,
            subscriber,
            publisher,
            outbound,
            beacon,
            beacon_events,
        }
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Scenario::new()
    }
}
