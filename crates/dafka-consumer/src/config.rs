//! Consumer configuration loading.
//!
//! TOML is the sole config source. The recognized options are:
//! `consumer/offset/reset`, `consumer/verbose`, and an arbitrary `beacon`
//! table forwarded unchanged to the beacon collaborator. Absence of an option
//! applies its documented default; presence of a malformed value is a
//! [`ConfigError`], never a silent fallback.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// The offset bootstrap policy, fixed for the lifetime of the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetReset {
    /// Skip history; bootstrap on first observation of a producer.
    Latest,
    /// Fetch full history from sequence 0 on subscribe.
    Earliest,
}

impl Default for OffsetReset {
    fn default() -> Self {
        OffsetReset::Latest
    }
}

/// Typed consumer configuration, built from a [`RawConsumerConfig`] with
/// defaults applied.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    pub offset_reset: OffsetReset,
    pub verbose: bool,
    /// Beacon options, forwarded unchanged to the beacon collaborator.
    pub beacon: toml::Value,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        ConsumerConfig {
            offset_reset: OffsetReset::default(),
            verbose: false,
            beacon: toml::Value::Table(Default::default()),
        }
    }
}

/// Raw TOML deserialization shape, with `Option` fields so absence can be
/// distinguished from an explicit (possibly invalid) value.
#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    consumer: Option<RawConsumerSection>,
    #[serde(default)]
    beacon: toml::Value,
}

#[derive(Debug, Deserialize, Default)]
struct RawConsumerSection {
    offset: Option<RawOffsetSection>,
    verbose: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct RawOffsetSection {
    reset: Option<String>,
}

/// Parse a `ConsumerConfig` from a TOML document's contents.
pub fn parse_config(toml_text: &str) -> Result<ConsumerConfig, ConfigError> {
    let raw: RawConfig = toml::from_str(toml_text)?;
    build_config(raw)
}

/// Load a `ConsumerConfig` from a TOML file on disk.
///
/// Mirrors the two-stage raw/typed pattern used elsewhere in this crate's
/// sibling services: parse into an `Option`-heavy raw struct, then apply
/// defaults while constructing the public type.
pub fn load_config(path: impl AsRef<Path>) -> Result<ConsumerConfig, ConfigError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_config(&text)
}

fn build_config(raw: RawConfig) -> Result<ConsumerConfig, ConfigError> {
    let consumer = raw.consumer.unwrap_or_default();

    let offset_reset = match consumer.offset.and_then(|o| o.reset) {
        None => OffsetReset::Latest,
        Some(s) if s == "latest" => OffsetReset::Latest,
        Some(s) if s == "earliest" => OffsetReset::Earliest,
        Some(other) => return Err(ConfigError::InvalidReset(other)),
    };

    let verbose = match consumer.verbose {
        None => false,
        Some(s) if s == "0" => false,
        Some(s) if s == "1" => true,
        Some(other) => return Err(ConfigError::InvalidVerbose(other)),
    };

    Ok(ConsumerConfig {
        offset_reset,
        verbose,
        beacon: raw.beacon,
    })
}
