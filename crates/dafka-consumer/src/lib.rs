//! A gap-detecting consumer core for a decentralized, replicated pub/sub log.
//!
//! Producers broadcast `DATA` frames carrying a monotonic per-(topic,
//! producer) sequence number; stores replay history on request via `DIRECT`
//! frames; `HEAD` frames announce a producer's current high-water mark. This
//! crate tracks the highest contiguously-delivered sequence per stream,
//! notices gaps, and emits `FETCH`/`EARLIEST` requests to close them --
//! without ever reordering or duplicating what it hands to the application.
//!
//! The wire types live in [`dafka_proto`]; this crate owns the gap-detection
//! algorithm, the subscription and index bookkeeping, and the event loop that
//! ties them to a pluggable [`transport`].
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use dafka_consumer::config::ConsumerConfig;
//! use dafka_consumer::event_loop;
//!
//! # let subscriber = todo!();
//! # let publisher = todo!();
//! # let beacon = todo!();
//! let (handle, mut delivered) = event_loop::spawn(subscriber, publisher, beacon, ConsumerConfig::default()).await?;
//! handle.subscribe("prices").await?;
//! while let Some(msg) = delivered.recv().await {
//!     println!("{}/{}: {} bytes", msg.topic, msg.producer, msg.payload.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod event_loop;
pub mod fetch_emitter;
pub mod gap_detector;
pub mod sequence_index;
pub mod subscription;
pub mod transport;

pub use config::{ConsumerConfig, OffsetReset};
pub use event_loop::{spawn, ConsumerHandle, ControlCommand, DeliveredMessage};
pub use error::{ConfigError, SequenceIndexError, TransportError};
pub use transport::{Beacon, BeaconEvent, Publisher, Subscriber};

pub use dafka_proto as proto;
