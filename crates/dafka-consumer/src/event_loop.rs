//! C5: Event Loop & Control Plane.
//!
//! The single task that owns all consumer state and multiplexes the control
//! channel, the inbound subscriber channel, and the beacon channel.

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use dafka_proto::OutboundFrame;

use crate::config::ConsumerConfig;
use crate::error::TransportError;
use crate::fetch_emitter::FetchEmitter;
use crate::gap_detector;
use crate::sequence_index::SequenceIndex;
use crate::subscription::SubscriptionManager;
use crate::transport::{Beacon, BeaconEvent, Publisher, Subscriber};

/// Commands accepted on the control channel.
#[derive(Debug, Clone)]
pub enum ControlCommand {
    Subscribe(String),
    Terminate,
}

/// A successfully reconstructed payload handed to the application.
///
/// `HEAD` frames never produce one of these; only `DATA`/`DIRECT` records do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredMessage {
    pub topic: String,
    pub producer: String,
    pub payload: Vec<u8>,
}

/// A handle the embedder uses to drive a running consumer task.
pub struct ConsumerHandle {
    address: String,
    control_tx: mpsc::Sender<ControlCommand>,
    join: tokio::task::JoinHandle<()>,
}

impl ConsumerHandle {
    /// This consumer's generated identity, used by collaborators (stores) to
    /// address DIRECT replies back to it.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Subscribe to `topic`. Ready immediately; the actual subscribe happens
    /// on the consumer task the next time it polls the control channel.
    pub async fn subscribe(
        &self,
        topic: impl Into<String>,
    ) -> Result<(), mpsc::error::SendError<ControlCommand>> {
        self.control_tx
            .send(ControlCommand::Subscribe(topic.into()))
            .await
    }

    /// Request shutdown. The loop observes this after the in-flight event
    /// finishes processing.
    pub async fn terminate(&self) -> Result<(), mpsc::error::SendError<ControlCommand>> {
        self.control_tx.send(ControlCommand::Terminate).await
    }

    /// Wait for the consumer task to exit.
    pub async fn join(self) -> Result<(), tokio::task::JoinError> {
        self.join.await
    }
}

const CONTROL_CHANNEL_CAPACITY: usize = 16;
const DELIVERY_CHANNEL_CAPACITY: usize = 256;

/// Construct a consumer from its transport collaborators and spawn its event
/// loop task.
///
/// Performs the construction steps from `SPEC_FULL.md` §4.5 before the task
/// is spawned: generates the consumer identity, installs the DIRECT filter,
/// and starts the beacon, waiting for its ready signal. Returning from this
/// function *is* the readiness signal -- there is nothing left to await.
pub async fn spawn<S, P, B>(
    mut subscriber: S,
    mut publisher: P,
    mut beacon: B,
    config: ConsumerConfig,
) -> Result<(ConsumerHandle, mpsc::Receiver<DeliveredMessage>), TransportError>
where
    S: Subscriber + 'static,
    P: Publisher + 'static,
    B: Beacon + 'static,
{
    let consumer_address = Uuid::new_v4().to_string();

    subscriber.subscribe_direct(&consumer_address).await?;

    let port = publisher.local_port();
    beacon.start(&consumer_address, port).await?;
    info!(consumer_address = %consumer_address, "consumer ready");

    let (control_tx, control_rx) = mpsc::channel(CONTROL_CHANNEL_CAPACITY);
    let (delivery_tx, delivery_rx) = mpsc::channel(DELIVERY_CHANNEL_CAPACITY);

    let state = ConsumerState {
        consumer_address: consumer_address.clone(),
        offset_reset: config.offset_reset,
        verbose: config.verbose,
        index: SequenceIndex::new(),
        subscriptions: SubscriptionManager::new(),
        subscriber,
        publisher,
        beacon,
        control_rx,
        delivery_tx,
    };

    let join = tokio::spawn(run(state));

    Ok((
        ConsumerHandle {
            address: consumer_address,
            control_tx,
            join,
        },
        delivery_rx,
    ))
}

struct ConsumerState<S, P, B> {
    consumer_address: String,
    offset_reset: crate::config::OffsetReset,
    verbose: bool,
    index: SequenceIndex,
    subscriptions: SubscriptionManager,
    subscriber: S,
    publisher: P,
    beacon: B,
    control_rx: mpsc::Receiver<ControlCommand>,
    delivery_tx: mpsc::Sender<DeliveredMessage>,
}

async fn run<S, P, B>(mut state: ConsumerState<S, P, B>)
where
    S: Subscriber,
    P: Publisher,
    B: Beacon,
{
    loop {
        tokio::select! {
            cmd = state.control_rx.recv() => {
                match cmd {
                    Some(ControlCommand::Subscribe(topic)) => {
                        let mut emitter = FetchEmitter::new(&mut state.publisher, state.verbose);
                        if let Err(e) = state
                            .subscriptions
                            .subscribe(&topic, &state.consumer_address, state.offset_reset, &mut state.subscriber, &mut emitter)
                            .await
                        {
                            error!(topic, error = %e, "subscribe failed");
                        }
                    }
                    Some(ControlCommand::Terminate) | None => break,
                }
            }
            frame = state.subscriber.recv() => {
                match frame {
                    Ok(frame) => handle_inbound_frame(&mut state, frame).await,
                    Err(TransportError::Closed) => break,
                    Err(e) => {
                        // Transient inbound decode/transport error: skip, keep running.
                        if state.verbose {
                            debug!(error = %e, "inbound frame error, skipping");
                        }
                    }
                }
            }
            event = state.beacon.next_event() => {
                match event {
                    Ok(BeaconEvent::Ready) => {}
                    Ok(BeaconEvent::StoreConnected { address }) => {
                        debug!(address, "beacon: store connected");
                    }
                    Ok(BeaconEvent::ProducerConnected { address }) => {
                        debug!(address, "beacon: producer connected");
                    }
                    Err(TransportError::Closed) => break,
                    Err(e) => warn!(error = %e, "beacon channel error"),
                }
            }
        }
    }

    state.beacon.shutdown().await;
    if state.verbose {
        debug!("consumer stopped");
    }
}

async fn handle_inbound_frame<S, P, B>(
    state: &mut ConsumerState<S, P, B>,
    frame: dafka_proto::InboundFrame,
) where
    S: Subscriber,
    P: Publisher,
    B: Beacon,
{
    let decision = gap_detector::handle_frame(
        &mut state.index,
        &state.consumer_address,
        state.offset_reset,
        &frame,
    );

    if let Some(fetch) = decision.fetch {
        let mut emitter = FetchEmitter::new(&mut state.publisher, state.verbose);
        let _ = emitter.emit(OutboundFrame::Fetch(fetch)).await;
    }

    if let Some(payload) = decision.deliver {
        let message = DeliveredMessage {
            topic: frame.topic().to_owned(),
            producer: frame.producer().to_owned(),
            payload,
        };
        if state.delivery_tx.send(message).await.is_err() {
            // Application side dropped the receiver; nothing more to do.
            warn!("delivery channel closed, dropping message");
        }
    }
}

// Re-exported so downstream crates can build frames without importing
// dafka-proto directly for the common cases.
pub use dafka_proto::{DataFrame as InboundDataFrame, DirectFrame as InboundDirectFrame};
