//! Configuration for the array codec family.

use core::fmt;
use core::str::FromStr;
use std::sync::Arc;

use crate::compression::{Compression, Zlib};
use crate::errors::Error;
use crate::text::{Base64, ByteEncoding};

/// What to do when an array aliases storage that cannot be encoded by
/// reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AliasPolicy {
    /// Record a diagnostic, then encode an independent copy.
    #[default]
    Warn,
    /// Fail the encode with `UnsupportedAliasing`.
    Raise,
    /// Encode an independent copy without a diagnostic.
    Silent,
}

impl AliasPolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            AliasPolicy::Warn => "warn",
            AliasPolicy::Raise => "raise",
            AliasPolicy::Silent => "silent",
        }
    }
}

impl FromStr for AliasPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warn" => Ok(AliasPolicy::Warn),
            "raise" => Ok(AliasPolicy::Raise),
            "silent" => Ok(AliasPolicy::Silent),
            other => Err(Error::invalid_field(
                "alias_policy",
                format!("expected warn, raise or silent, found `{}`", other),
            )),
        }
    }
}

impl fmt::Display for AliasPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for one registration of the array codecs.
///
/// # Example
///
/// ```
/// use ndpickle_core::codec::{AliasPolicy, CodecOptions};
///
/// let options = CodecOptions {
///     size_threshold: Some(1024),
///     compression: None,
///     alias_policy: AliasPolicy::Raise,
///     ..CodecOptions::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct CodecOptions {
    /// Arrays with at least this many elements use the binary encoding.
    ///
    /// `None` disables binary mode. Default: `Some(16)`
    pub size_threshold: Option<usize>,

    /// Applied to raw bytes before text encoding, and reversed on decode.
    ///
    /// Both sides must agree. Default: zlib
    pub compression: Option<Arc<dyn Compression>>,

    /// Turns (possibly compressed) bytes into JSON-safe text.
    ///
    /// Default: standard base64
    pub text_encoding: Arc<dyn ByteEncoding>,

    /// Default: `AliasPolicy::Warn`
    pub alias_policy: AliasPolicy,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            size_threshold: Some(16),
            compression: Some(Arc::new(Zlib::default())),
            text_encoding: Arc::new(Base64),
            alias_policy: AliasPolicy::Warn,
        }
    }
}
