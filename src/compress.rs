//! Codec boundary between the pipeline and the file writer.
//!
//! The codec is selected at build time: `compress-lz4` uses LZ4 in fast
//! mode, `compress-zstd` uses ZSTD at its fastest level, and with neither
//! feature both functions are the identity. Compression is applied per
//! filled pipeline buffer, not per record.

use std::borrow::Cow;
use std::io;

#[cfg(all(feature = "compress-zstd", not(feature = "compress-lz4")))]
use crate::fixed_buffer::LARGE_BUFFER;

// LZ4 takes precedence if both codec features end up enabled.

#[cfg(feature = "compress-lz4")]
pub fn compress(src: &[u8]) -> io::Result<Cow<'_, [u8]>> {
    lz4::block::compress(src, Some(lz4::block::CompressionMode::FAST(1)), true).map(Cow::Owned)
}

#[cfg(feature = "compress-lz4")]
pub fn decompress(src: &[u8]) -> io::Result<Cow<'_, [u8]>> {
    // The compressed form carries its decompressed size up front.
    lz4::block::decompress(src, None).map(Cow::Owned)
}

#[cfg(all(feature = "compress-zstd", not(feature = "compress-lz4")))]
pub fn compress(src: &[u8]) -> io::Result<Cow<'_, [u8]>> {
    zstd::bulk::compress(src, 1).map(Cow::Owned)
}

#[cfg(all(feature = "compress-zstd", not(feature = "compress-lz4")))]
pub fn decompress(src: &[u8]) -> io::Result<Cow<'_, [u8]>> {
    zstd::bulk::decompress(src, LARGE_BUFFER).map(Cow::Owned)
}

#[cfg(not(any(feature = "compress-lz4", feature = "compress-zstd")))]
pub fn compress(src: &[u8]) -> io::Result<Cow<'_, [u8]>> {
    Ok(Cow::Borrowed(src))
}

#[cfg(not(any(feature = "compress-lz4", feature = "compress-zstd")))]
pub fn decompress(src: &[u8]) -> io::Result<Cow<'_, [u8]>> {
    Ok(Cow::Borrowed(src))
}
