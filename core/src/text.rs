//! Byte-to-text strategies for binary array payloads.

use core::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};

use crate::errors::{Error, Result};

/// Reversible mapping between raw bytes and text that is safe to embed in a
/// JSON string.
pub trait ByteEncoding: fmt::Debug + Send + Sync {
    fn encode(&self, bytes: &[u8]) -> String;
    fn decode(&self, text: &str) -> Result<Vec<u8>>;
}

/// Standard base64 with padding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64;

impl ByteEncoding for Base64 {
    fn encode(&self, bytes: &[u8]) -> String {
        STANDARD.encode(bytes)
    }

    fn decode(&self, text: &str) -> Result<Vec<u8>> {
        STANDARD
            .decode(text)
            .map_err(|e| Error::TextDecoding(e.to_string()))
    }
}

/// URL-safe base64 alphabet (`-` and `_`), with padding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64UrlSafe;

impl ByteEncoding for Base64UrlSafe {
    fn encode(&self, bytes: &[u8]) -> String {
        URL_SAFE.encode(bytes)
    }

    fn decode(&self, text: &str) -> Result<Vec<u8>> {
        URL_SAFE
            .decode(text)
            .map_err(|e| Error::TextDecoding(e.to_string()))
    }
}
