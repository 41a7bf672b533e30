//! Transport traits standing in for the zeromq-style sockets of the source
//! design, so the consumer core is runnable without a real network stack.
//!
//! Production backends (zeromq, nng, multicast UDP) are out of scope for this
//! crate; `dafka-test-support` ships an in-process, channel-backed
//! implementation used by this crate's tests and the demo binary.

use async_trait::async_trait;
use dafka_proto::{InboundFrame, OutboundFrame};

use crate::error::TransportError;

/// Events the beacon collaborator may surface to the event loop.
///
/// The beacon's own gossip/discovery protocol is external to this crate; we
/// only specify the events it hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeaconEvent {
    /// The beacon finished its startup handshake and is ready.
    Ready,
    /// A new store replica was discovered and wired into the subscriber
    /// socket. Hook point for open question 3 in `SPEC_FULL.md` (re-emitting
    /// EARLIEST on store connect) -- not acted on by the core itself.
    StoreConnected { address: String },
    /// A new producer was discovered and wired into the subscriber socket.
    ProducerConnected { address: String },
}

/// The inbound subscriber socket: topic/address filter installation plus
/// frame reception.
#[async_trait]
pub trait Subscriber: Send {
    async fn subscribe_data(&mut self, topic: &str) -> Result<(), TransportError>;
    async fn subscribe_head(&mut self, topic: &str) -> Result<(), TransportError>;
    async fn subscribe_direct(&mut self, consumer_address: &str) -> Result<(), TransportError>;

    /// Wait for the next inbound frame. Returns `Err(TransportError::Closed)`
    /// when the underlying channel has been torn down -- callers treat this
    /// the same as an interrupted wait (see `SPEC_FULL.md` §7).
    async fn recv(&mut self) -> Result<InboundFrame, TransportError>;
}

/// The outbound publisher socket: fetch/earliest frame emission.
#[async_trait]
pub trait Publisher: Send {
    async fn send(&mut self, frame: OutboundFrame) -> Result<(), TransportError>;

    /// The ephemeral port (or, for in-process transports, the ephemeral
    /// address) this publisher is bound to, handed to the beacon collaborator
    /// at startup.
    fn local_port(&self) -> Option<u16>;
}

/// The peer-discovery collaborator.
#[async_trait]
pub trait Beacon: Send {
    /// Start the beacon, handing it this consumer's address and the port its
    /// publisher is bound to. Resolves once the beacon is ready.
    async fn start(&mut self, consumer_address: &str, port: Option<u16>) -> Result<(), TransportError>;

    /// Wait for the next beacon event.
    async fn next_event(&mut self) -> Result<BeaconEvent, TransportError>;

    /// Tear down the beacon collaborator.
    async fn shutdown(&mut self);
}
