//! C4: Fetch Emitter.
//!
//! Serializes and publishes fetch/earliest frames on the outbound channel.
//! Each call is unconditional: no deduplication across consecutive identical
//! fetches (see the "fetch storms" open question in `SPEC_FULL.md` §9).

use dafka_proto::OutboundFrame;
use tracing::{debug, warn};

use crate::error::TransportError;
use crate::transport::Publisher;

/// Thin wrapper around a [`Publisher`] that logs on send failure instead of
/// propagating it into the event loop (see `SPEC_FULL.md` §7: outbound send
/// failure is logged, not retried, and the frame is simply lost).
pub struct FetchEmitter<'a> {
    publisher: &'a mut dyn Publisher,
    verbose: bool,
}

impl<'a> FetchEmitter<'a> {
    pub fn new(publisher: &'a mut dyn Publisher, verbose: bool) -> Self {
        FetchEmitter { publisher, verbose }
    }

    /// Publish one fetch/earliest frame. Returns the underlying transport
    /// error so tests can assert on it directly; the event loop itself only
    /// logs and continues.
    pub async fn emit(&mut self, frame: OutboundFrame) -> Result<(), TransportError> {
        let result = self.publisher.send(frame).await;
        match &result {
            Ok(()) => {
                if self.verbose {
                    debug!("fetch/earliest frame published");
                }
            }
            Err(e) => warn!(error = %e, "outbound send failed; frame dropped"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dafka_proto::{EarliestFrame, InboundFrame};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingPublisher {
        sent: Arc<Mutex<Vec<OutboundFrame>>>,
        fail_next: bool,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn send(&mut self, frame: OutboundFrame) -> Result<(), TransportError> {
            if self.fail_next {
                return Err(TransportError::Send("boom".into()));
            }
            self.sent.lock().unwrap().push(frame);
            Ok(())
        }

        fn local_port(&self) -> Option<u16> {
            Some(4242)
        }
    }

    #[allow(dead_code)]
    fn unused(_: InboundFrame) {}

    #[tokio::test]
    async fn emit_forwards_to_publisher() {
        let mut pub_ = RecordingPublisher::default();
        let sent = pub_.sent.clone();
        {
            let mut emitter = FetchEmitter::new(&mut pub_, true);
            emitter
                .emit(OutboundFrame::Earliest(EarliestFrame {
                    topic: "t".into(),
                    consumer_address: "c1".into(),
                }))
                .await
                .unwrap();
        }
        assert_eq!(sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn emit_surfaces_send_failure_without_panicking() {
        let mut pub_ = RecordingPublisher {
            fail_next: true,
            ..Default::default()
        };
        let mut emitter = FetchEmitter::new(&mut pub_, false);
        let err = emitter
            .emit(OutboundFrame::Earliest(EarliestFrame {
                topic: "t".into(),
                consumer_address: "c1".into(),
            }))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Send(_)));
    }
}
