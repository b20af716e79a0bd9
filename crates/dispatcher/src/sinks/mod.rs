//! Sink implementations
//!
//! Contains BrokerSink (MQTT publish) and StreamSink (multipart chunked).

mod broker;
mod stream;

pub use self::broker::{BrokerSink, BrokerSinkConfig};
pub use self::stream::{StreamSink, StreamSinkConfig, PART_BOUNDARY, STREAM_CONTENT_TYPE};
