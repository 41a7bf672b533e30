//! C2: Subscription Manager.
//!
//! Maintains the set of subscribed topics on the inbound socket and emits
//! EARLIEST discovery frames when the offset policy requires full history.

use std::collections::HashSet;

use dafka_proto::{EarliestFrame, OutboundFrame};
use tracing::debug;

use crate::config::OffsetReset;
use crate::error::TransportError;
use crate::fetch_emitter::FetchEmitter;
use crate::transport::Subscriber;

/// Tracks which topics this consumer has subscribed to and installs the
/// corresponding filters exactly once per topic.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    subscribed: HashSet<String>,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        SubscriptionManager::default()
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscribed.contains(topic)
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.subscribed.iter().map(String::as_str)
    }

    /// Subscribe to `topic`: idempotent, installs DATA and HEAD filters, and
    /// emits an EARLIEST frame when `offset_reset` is `Earliest`.
    pub async fn subscribe(
        &mut self,
        topic: &str,
        consumer_address: &str,
        offset_reset: OffsetReset,
        subscriber: &mut dyn Subscriber,
        fetch_emitter: &mut FetchEmitter<'_>,
    ) -> Result<(), TransportError> {
        if self.subscribed.contains(topic) {
            return Ok(());
        }

        subscriber.subscribe_data(topic).await?;
        subscriber.subscribe_head(topic).await?;
        debug!(topic, "subscribed to topic");

        if offset_reset == OffsetReset::Earliest {
            debug!(topic, "offset_reset=earliest, emitting EARLIEST frame");
            let _ = fetch_emitter
                .emit(OutboundFrame::Earliest(EarliestFrame {
                    topic: topic.to_owned(),
                    consumer_address: consumer_address.to_owned(),
                }))
                .await;
        }

        self.subscribed.insert(topic.to_owned());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dafka_proto::InboundFrame;
    use std::sync::{Arc, Mutex};

    #[derive(Default, Clone)]
    struct RecordingSubscriber {
        data_topics: Arc<Mutex<Vec<String>>>,
        head_topics: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Subscriber for RecordingSubscriber {
        async fn subscribe_data(&mut self, topic: &str) -> Result<(), TransportError> {
            self.data_topics.lock().unwrap().push(topic.to_owned());
            Ok(())
        }
        async fn subscribe_head(&mut self, topic: &str) -> Result<(), TransportError> {
            self.head_topics.lock().unwrap().push(topic.to_owned());
            Ok(())
        }
        async fn subscribe_direct(&mut self, _consumer_address: &str) -> Result<(), TransportError> {
            Ok(())
        }
        async fn recv(&mut self) -> Result<InboundFrame, TransportError> {
            Err(TransportError::Closed)
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        sent: Arc<Mutex<Vec<OutboundFrame>>>,
    }

    #[async_trait]
    impl crate::transport::Publisher for RecordingPublisher {
        async fn send(&mut self, frame: OutboundFrame) -> Result<(), TransportError> {
            self.sent.lock().unwrap().push(frame);
            Ok(())
        }
        fn local_port(&self) -> Option<u16> {
            None
        }
    }

    #[tokio::test]
    async fn subscribe_installs_data_and_head_filters() {
        let mut mgr = SubscriptionManager::new();
        let mut sub = RecordingSubscriber::default();
        let mut publisher = RecordingPublisher::default();
        let mut emitter = FetchEmitter::new(&mut publisher, false);

        mgr.subscribe("hello", "c1", OffsetReset::Latest, &mut sub, &mut emitter)
            .await
            .unwrap();

        assert_eq!(*sub.data_topics.lock().unwrap(), vec!["hello".to_string()]);
        assert_eq!(*sub.head_topics.lock().unwrap(), vec!["hello".to_string()]);
        assert!(mgr.is_subscribed("hello"));
    }

    #[tokio::test]
    async fn subscribe_is_idempotent() {
        let mut mgr = SubscriptionManager::new();
        let mut sub = RecordingSubscriber::default();
        let mut publisher = RecordingPublisher::default();

        {
            let mut emitter = FetchEmitter::new(&mut publisher, false);
            mgr.subscribe("hello", "c1", OffsetReset::Latest, &mut sub, &mut emitter)
                .await
                .unwrap();
        }
        {
            let mut emitter = FetchEmitter::new(&mut publisher, false);
            mgr.subscribe("hello", "c1", OffsetReset::Latest, &mut sub, &mut emitter)
                .await
                .unwrap();
        }

        assert_eq!(sub.data_topics.lock().unwrap().len(), 1);
        assert_eq!(sub.head_topics.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn earliest_reset_emits_earliest_frame() {
        let mut mgr = SubscriptionManager::new();
        let mut sub = RecordingSubscriber::default();
        let mut publisher = RecordingPublisher::default();
        let sent = publisher.sent.clone();
        let mut emitter = FetchEmitter::new(&mut publisher, false);

        mgr.subscribe("hello", "c1", OffsetReset::Earliest, &mut sub, &mut emitter)
            .await
            .unwrap();

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        match &sent[0] {
            OutboundFrame::Earliest(e) => {
                assert_eq!(e.topic, "hello");
                assert_eq!(e.consumer_address, "c1");
            }
            other => panic!("expected Earliest frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn latest_reset_does_not_emit_earliest_frame() {
        let mut mgr = SubscriptionManager::new();
        let mut sub = RecordingSubscriber::default();
        let mut publisher = RecordingPublisher::default();
        let sent = publisher.sent.clone();
        let mut emitter = FetchEmitter::new(&mut publisher, false);

        mgr.subscribe("hello", "c1", OffsetReset::Latest, &mut sub, &mut emitter)
            .await
            .unwrap();

        assert!(sent.lock().unwrap().is_empty());
    }
}
