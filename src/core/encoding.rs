// src/core/encoding.rs

//! Whole-body gzip helpers for the hit path and response capture.

use crate::core::CachefrontError;
use bytes::Bytes;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use std::io::{Read, Write};

/// Gzip-compresses a body for a client that accepts it.
pub fn gzip_compress(data: &[u8]) -> Result<Bytes, CachefrontError> {
    let mut encoder = GzEncoder::new(
        Vec::with_capacity(data.len() / 2),
        Compression::default(),
    );
    encoder.write_all(data)?;
    Ok(Bytes::from(encoder.finish()?))
}

/// Inflates a gzip body received from the origin.
pub fn gzip_decompress(data: &[u8]) -> Result<Bytes, CachefrontError> {
    let mut decoder = GzDecoder::new(data);
    let mut inflated = Vec::with_capacity(data.len().saturating_mul(2));
    decoder.read_to_end(&mut inflated)?;
    Ok(Bytes::from(inflated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_bytes() {
        let inputs: [&[u8]; 3] = [
            b"whatever!!!!!!!!!",
            b"",
            &[0u8; 4096],
        ];
        for input in inputs {
            let compressed = gzip_compress(input).unwrap();
            let inflated = gzip_decompress(&compressed).unwrap();
            assert_eq!(&inflated[..], input);
        }
    }

    #[test]
    fn garbage_input_fails_to_inflate() {
        assert!(gzip_decompress(b"definitely not gzip").is_err());
    }
}
