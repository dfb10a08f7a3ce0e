//! Compression strategies for binary array payloads.

use core::fmt;
use std::io::{Read, Write};

use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use flate2::Compression as Level;
use flate2::read::{GzDecoder, ZlibDecoder};
use flate2::write::{GzEncoder, ZlibEncoder};

use crate::errors::{Error, Result};

pub trait Compression: fmt::Debug + Send + Sync {
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>>;

    /// Inflate `bytes`, stopping after `limit` output bytes.
    fn decompress(&self, bytes: &[u8], limit: usize) -> Result<Vec<u8>>;
}

fn read_limited(reader: impl Read, limit: usize) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    reader
        .take(limit as u64)
        .read_to_end(&mut out)
        .map_err(Error::Compression)?;
    Ok(out)
}

/// zlib stream (RFC 1950).
#[derive(Debug, Clone, Copy)]
pub struct Zlib {
    pub level: u32,
}

impl Default for Zlib {
    fn default() -> Self {
        Self { level: 6 }
    }
}

impl Compression for Zlib {
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Level::new(self.level));
        encoder.write_all(bytes).map_err(Error::Compression)?;
        encoder.finish().map_err(Error::Compression)
    }

    fn decompress(&self, bytes: &[u8], limit: usize) -> Result<Vec<u8>> {
        read_limited(ZlibDecoder::new(bytes), limit)
    }
}

/// gzip member (RFC 1952).
#[derive(Debug, Clone, Copy)]
pub struct Gzip {
    pub level: u32,
}

impl Default for Gzip {
    fn default() -> Self {
        Self { level: 6 }
    }
}

impl Compression for Gzip {
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Level::new(self.level));
        encoder.write_all(bytes).map_err(Error::Compression)?;
        encoder.finish().map_err(Error::Compression)
    }

    fn decompress(&self, bytes: &[u8], limit: usize) -> Result<Vec<u8>> {
        read_limited(GzDecoder::new(bytes), limit)
    }
}

/// bzip2 stream. `level` is the block size, 1 to 9.
#[derive(Debug, Clone, Copy)]
pub struct Bz2 {
    pub level: u32,
}

impl Default for Bz2 {
    fn default() -> Self {
        Self { level: 9 }
    }
}

impl Compression for Bz2 {
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = BzEncoder::new(Vec::new(), bzip2::Compression::new(self.level.clamp(1, 9)));
        encoder.write_all(bytes).map_err(Error::Compression)?;
        encoder.finish().map_err(Error::Compression)
    }

    fn decompress(&self, bytes: &[u8], limit: usize) -> Result<Vec<u8>> {
        read_limited(BzDecoder::new(bytes), limit)
    }
}
