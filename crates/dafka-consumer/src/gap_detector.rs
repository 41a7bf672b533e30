//! C3: Gap Detector -- the central algorithm.
//!
//! On each inbound frame, consults the sequence index to decide (a) whether
//! to deliver, (b) whether to fetch, and (c) how to update the index.

use dafka_proto::{FetchFrame, InboundFrame};
use tracing::{debug, trace};

use crate::config::OffsetReset;
use crate::sequence_index::SequenceIndex;

/// What the Gap Detector decided to do with one inbound frame.
#[derive(Debug, PartialEq, Eq)]
pub struct GapDecision {
    /// A fetch to emit, if a gap was observed.
    pub fetch: Option<FetchFrame>,
    /// The payload to deliver to the application, if the frame was in order.
    pub deliver: Option<Vec<u8>>,
}

impl GapDecision {
    fn none() -> Self {
        GapDecision {
            fetch: None,
            deliver: None,
        }
    }
}

/// Runs the Step 1-3 algorithm from `SPEC_FULL.md` §4.3 against the index,
/// mutating it in place, and returns the resulting decision.
pub fn handle_frame(
    index: &mut SequenceIndex,
    consumer_address: &str,
    offset_reset: OffsetReset,
    frame: &InboundFrame,
) -> GapDecision {
    let key = frame.key();
    let s = frame.sequence();

    // Step 1 -- lookup or bootstrap.
    let mut prev = index.lookup(&key);
    if prev.is_none() {
        match offset_reset {
            OffsetReset::Latest => {
                let bootstrap = match frame {
                    InboundFrame::Data(_) | InboundFrame::Direct(_) => s.saturating_sub(1),
                    InboundFrame::Head(_) => s,
                };
                index
                    .insert(key.clone(), bootstrap)
                    .expect("key was just confirmed absent");
                prev = Some(bootstrap);
                trace!(topic = %key.topic, producer = %key.producer, bootstrap, "bootstrapped latest offset");
            }
            OffsetReset::Earliest => {
                // Leave prev absent; the fetch check below starts from 1.
            }
        }
    }

    // Step 2 -- fetch decision.
    let needs_fetch = match frame {
        InboundFrame::Data(_) | InboundFrame::Direct(_) => match prev {
            None => true,
            Some(p) => s > p + 1,
        },
        InboundFrame::Head(_) => match prev {
            None => true,
            Some(p) => s > p,
        },
    };

    let mut decision = GapDecision::none();
    if needs_fetch {
        let from = prev.map(|p| p + 1).unwrap_or(1);
        let count = s - prev.unwrap_or(0);
        debug!(
            topic = %key.topic, producer = %key.producer, from, count,
            "gap observed, emitting fetch"
        );
        decision.fetch = Some(FetchFrame {
            topic: key.topic.clone(),
            producer: key.producer.clone(),
            from_sequence: from,
            count,
            consumer_address: consumer_address.to_owned(),
        });
    }

    // Step 3 -- delivery decision (DATA/DIRECT only). In earliest mode a
    // never-before-seen key has no index entry yet (Step 1 deliberately left
    // it unbootstrapped); compare against an implicit "nothing delivered"
    // baseline of 0 so the first in-order frame can still land. The index
    // only gains an entry for this key once that first delivery happens.
    if frame.is_deliverable_kind() {
        let effective_prev = prev.unwrap_or(0);
        if s == effective_prev + 1 {
            index
                .record_delivery(key, s)
                .expect("monotonic by construction: s == effective_prev + 1");
            decision.deliver = frame.payload().map(|p| p.to_vec());
        }
    }

    decision
}
