//! Cache Codec Module
//!
//! Wraps payloads in a self-describing envelope and turns it into bytes,
//! gzip-compressed or raw JSON depending on how the codec was built.

use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression as GzLevel;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{CacheError, Result};

/// Empirical ratio of gzip output to JSON input for job listings.
pub const COMPRESSION_RATIO: f64 = 0.3;

// == Compression ==
/// On-disk encoding recorded inside every envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    Gzip,
    #[default]
    None,
}

// == Envelope ==
/// The wrapper stored in every cache file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// The cached payload
    pub data: Value,
    /// Caller metadata plus access bookkeeping
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// When the envelope was first encoded
    pub serialized_at: DateTime<Utc>,
    /// Encoding used for the file this envelope came from
    #[serde(default)]
    pub compression: Compression,
}

impl Envelope {
    /// Number of times this entry has been read back.
    pub fn access_count(&self) -> u64 {
        self.metadata
            .get("access_count")
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    /// Stamps `last_accessed` and bumps `access_count`.
    pub fn record_access(&mut self, now: DateTime<Utc>) {
        let count = self.access_count() + 1;
        self.metadata
            .insert("last_accessed".to_string(), Value::String(now.to_rfc3339()));
        self.metadata
            .insert("access_count".to_string(), Value::from(count));
    }
}

// == Codec ==
/// Encodes and decodes envelopes.
#[derive(Debug, Clone, Copy)]
pub struct Codec {
    compression: Compression,
}

impl Codec {
    // == Constructor ==
    /// Creates a codec; `compression_enabled` selects gzip output.
    pub fn new(compression_enabled: bool) -> Self {
        let compression = if compression_enabled {
            Compression::Gzip
        } else {
            Compression::None
        };
        Self { compression }
    }

    /// Whether this codec writes gzip.
    pub fn compression_enabled(&self) -> bool {
        self.compression == Compression::Gzip
    }

    // == File Extension ==
    /// File suffix for entries written by this codec.
    pub fn file_extension(&self) -> &'static str {
        match self.compression {
            Compression::Gzip => ".json.gz",
            Compression::None => ".json",
        }
    }

    // == Encode ==
    /// Wraps `payload` and `metadata` in a fresh envelope and encodes it.
    pub fn encode<T>(&self, payload: &T, metadata: Option<Map<String, Value>>) -> Result<Vec<u8>>
    where
        T: Serialize + ?Sized,
    {
        let data = serde_json::to_value(payload)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;
        let envelope = Envelope {
            data,
            metadata: metadata.unwrap_or_default(),
            serialized_at: Utc::now(),
            compression: self.compression,
        };
        self.encode_envelope(&envelope)
    }

    /// Encodes an existing envelope, keeping its `serialized_at`.
    pub fn encode_envelope(&self, envelope: &Envelope) -> Result<Vec<u8>> {
        let mut envelope = envelope.clone();
        envelope.compression = self.compression;

        let json = serde_json::to_vec(&envelope)
            .map_err(|e| CacheError::Serialization(e.to_string()))?;

        match self.compression {
            Compression::None => Ok(json),
            Compression::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), GzLevel::default());
                encoder
                    .write_all(&json)
                    .and_then(|_| encoder.finish())
                    .map(|compressed| {
                        debug!(
                            "Compressed envelope: {} -> {} bytes",
                            json.len(),
                            compressed.len()
                        );
                        compressed
                    })
                    .map_err(|e| CacheError::Serialization(format!("gzip: {}", e)))
            }
        }
    }

    // == Decode ==
    /// Decodes bytes written by any codec configuration.
    ///
    /// Gzip is tried first; if the bytes are not a valid gzip stream they are
    /// parsed as raw JSON. Failing both is reported as corruption.
    pub fn decode(&self, bytes: &[u8]) -> Result<Envelope> {
        let mut decompressed = Vec::new();
        let json: &[u8] = match GzDecoder::new(bytes).read_to_end(&mut decompressed) {
            Ok(_) => &decompressed,
            Err(_) => bytes,
        };

        serde_json::from_slice(json).map_err(|e| CacheError::Deserialization(e.to_string()))
    }

    // == Estimate Size ==
    /// Approximate encoded size of `payload`; 0 if it cannot be encoded.
    pub fn estimate_size<T>(&self, payload: &T) -> usize
    where
        T: Serialize + ?Sized,
    {
        let raw = match serde_json::to_vec(payload) {
            Ok(bytes) => bytes.len(),
            Err(_) => return 0,
        };
        if self.compression_enabled() {
            (raw as f64 * COMPRESSION_RATIO) as usize
        } else {
            raw
        }
    }
}
