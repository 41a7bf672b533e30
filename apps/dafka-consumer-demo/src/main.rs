// dafka-consumer-demo: drives a dafka_consumer::event_loop consumer against
// the in-process transport from dafka-test-support, so the core can be
// exercised end to end without a real store/producer deployment.

use std::time::Duration;

use tracing::info;

use dafka_consumer::config::ConsumerConfig;
use dafka_consumer::event_loop;
use dafka_proto::{DataFrame, InboundFrame};
use dafka_test_support::Scenario;

const DEMO_TOPIC: &str = "race-results";
const DEMO_PRODUCER: &str = "timing-mat-1";
const CONFIG_PATH: &str = "dafka-consumer.toml";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "dafka-consumer-demo starting");

    let config = match dafka_consumer::config::load_config(CONFIG_PATH) {
        Ok(cfg) => {
            info!(path = CONFIG_PATH, "config loaded");
            cfg
        }
        Err(e) => {
            info!(path = CONFIG_PATH, error = %e, "no usable config file, using defaults");
            ConsumerConfig::default()
        }
    };

    let scenario = Scenario::new();
    let bus = scenario.bus.clone();
    // Keep these alive for the consumer's lifetime: once a sender/receiver is
    // dropped, the corresponding transport channel looks closed to the event
    // loop and it shuts down as if interrupted.
    let _outbound = scenario.outbound;
    let _beacon_events = scenario.beacon_events;

    let (handle, mut delivered) = event_loop::spawn(
        scenario.subscriber,
        scenario.publisher,
        scenario.beacon,
        config,
    )
    .await
    .expect("failed to start consumer");

    handle
        .subscribe(DEMO_TOPIC)
        .await
        .expect("consumer task is still running");

    // Stand in for a real producer: emit a handful of in-order DATA frames.
    tokio::spawn(async move {
        for sequence in 1..=5u64 {
            tokio::time::sleep(Duration::from_millis(200)).await;
            bus.publish_data(
                DEMO_TOPIC,
                InboundFrame::Data(DataFrame {
                    topic: DEMO_TOPIC.to_owned(),
                    producer: DEMO_PRODUCER.to_owned(),
                    sequence,
                    payload: format!("split #{sequence}").into_bytes(),
                }),
            );
        }
    });

    let mut received = 0;
    while let Some(message) = delivered.recv().await {
        info!(
            topic = %message.topic,
            producer = %message.producer,
            payload = %String::from_utf8_lossy(&message.payload),
            "delivered"
        );
        received += 1;
        if received == 5 {
            break;
        }
    }

    handle.terminate().await.ok();
    handle.join().await.expect("consumer task panicked");
    info!("dafka-consumer-demo finished");
}
