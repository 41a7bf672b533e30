//! Wire frame types for the dafka-style pub/sub consumer.
//!
//! Inbound frames (`DATA`, `DIRECT`, `HEAD`) are produced by producers and
//! stores; outbound frames (`FETCH`, `EARLIEST`) are produced by this
//! consumer and consumed by stores. All frames are tagged on `kind` for
//! discriminated (de)serialization, the same convention used throughout this
//! crate's sibling protocol definitions.

use serde::{Deserialize, Serialize};

/// The (topic, producer-address) pair that identifies one sequence stream.
///
/// A structured value type with `Eq + Hash + Clone` semantics -- never a
/// concatenated string. Safe to use directly as a `HashMap` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceKey {
    pub topic: String,
    pub producer: String,
}

impl SequenceKey {
    pub fn new(topic: impl Into<String>, producer: impl Into<String>) -> Self {
        SequenceKey {
            topic: topic.into(),
            producer: producer.into(),
        }
    }
}

/// A frame broadcast on a topic by its producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataFrame {
    pub topic: String,
    pub producer: String,
    pub sequence: u64,
    pub payload: Vec<u8>,
}

/// A frame addressed directly to a consumer, typically a store's fetch reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectFrame {
    pub topic: String,
    pub producer: String,
    pub sequence: u64,
    pub payload: Vec<u8>,
}

/// A payload-less high-water announcement from a producer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadFrame {
    pub topic: String,
    pub producer: String,
    pub sequence: u64,
}

/// Any frame the consumer may receive on its subscriber channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
#[serde(rename_all = "snake_case")]
pub enum InboundFrame {
    Data(DataFrame),
    Direct(DirectFrame),
    Head(HeadFrame),
}

impl InboundFrame {
    pub fn key(&self) -> SequenceKey {
        match self {
            InboundFrame::Data(f) => SequenceKey::new(f.topic.clone(), f.producer.clone()),
            InboundFrame::Direct(f) => SequenceKey::new(f.topic.clone(), f.producer.clone()),
            InboundFrame::Head(f) => SequenceKey::new(f.topic.clone(), f.producer.clone()),
        }
    }

    pub fn sequence(&self) -> u64 {
        match self {
            InboundFrame::Data(f) => f.sequence,
            InboundFrame::Direct(f) => f.sequence,
            InboundFrame::Head(f) => f.sequence,
        }
    }

    pub fn topic(&self) -> &str {
        match self {
            InboundFrame::Data(f) => &f.topic,
            InboundFrame::Direct(f) => &f.topic,
            InboundFrame::Head(f) => &f.topic,
        }
    }

    pub fn producer(&self) -> &str {
        match self {
            InboundFrame::Data(f) => &f.producer,
            InboundFrame::Direct(f) => &f.producer,
            InboundFrame::Head(f) => &f.producer,
        }
    }

    /// `true` for `DATA`/`DIRECT`, which are the only deliverable kinds.
    pub fn is_deliverable_kind(&self) -> bool {
        matches!(self, InboundFrame::Data(_) | InboundFrame::Direct(_))
    }

    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            InboundFrame::Data(f) => Some(&f.payload),
            InboundFrame::Direct(f) => Some(&f.payload),
            InboundFrame::Head(_) => None,
        }
    }
}

/// Requests the inclusive range `[from_sequence, from_sequence + count - 1]`
/// of `DATA` records produced by `producer` for `topic`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFrame {
    pub topic: String,
    pub producer: String,
    pub from_sequence: u64,
    pub count: u64,
    pub consumer_address: String,
}

/// Announces that `consumer_address` wants the full history of `topic`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarliestFrame {
    pub topic: String,
    pub consumer_address: String,
}

/// Any frame the consumer may publish on its outbound channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
#[serde(rename_all = "snake_case")]
pub enum OutboundFrame {
    Fetch(FetchFrame),
    Earliest(EarliestFrame),
}

/// The three inbound frame kinds, used to build subscriber filter prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Data,
    Head,
    Direct,
}

impl FilterKind {
    fn tag_byte(self) -> u8 {
        match self {
            FilterKind::Data => b'D',
            FilterKind::Head => b'H',
            FilterKind::Direct => b'X',
        }
    }
}

/// Build the `kind-byte ∥ topic-or-address-string` prefix used to install a
/// subscriber filter. `key` is a topic name for `Data`/`Head`, or a consumer
/// address for `Direct`.
pub fn filter_prefix(kind: FilterKind, key: &str) -> String {
    format!("{}{}", kind.tag_byte() as char, key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_key_has_value_semantics() {
        let a = SequenceKey::new("hello", "p1");
        let b = SequenceKey::new("hello", "p1".to_owned());
        assert_eq!(a, b);
        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn inbound_frame_tags_round_trip_through_json() {
        let frame = InboundFrame::Head(HeadFrame {
            topic: "hello".into(),
            producer: "p1".into(),
            sequence: 9,
        });
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains("\"kind\":\"head\""));
        let back: InboundFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn filter_prefix_uses_kind_byte_then_key() {
        assert_eq!(filter_prefix(FilterKind::Data, "hello"), "Dhello");
        assert_eq!(filter_prefix(FilterKind::Head, "hello"), "Hhello");
        assert_eq!(filter_prefix(FilterKind::Direct, "abc-123"), "Xabc-123");
    }

    #[test]
    fn only_data_and_direct_are_deliverable() {
        let data = InboundFrame::Data(DataFrame {
            topic: "t".into(),
            producer: "p".into(),
            sequence: 1,
            payload: vec![],
        });
        let direct = InboundFrame::Direct(DirectFrame {
            topic: "t".into(),
            producer: "p".into(),
            sequence: 1,
            payload: vec![],
        });
        let head = InboundFrame::Head(HeadFrame {
            topic: "t".into(),
            producer: "p".into(),
            sequence: 1,
        });
        assert!(data.is_deliverable_kind());
        assert!(direct.is_deliverable_kind());
        assert!(!head.is_deliverable_kind());
    }
}
