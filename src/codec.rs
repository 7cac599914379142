//! Compression codecs invoked by the scanner on encountering a
//! compressed block.

use std::io::Read;

use compress::zlib;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionTag {
    None,
    Lzo,
    Deflate,
}

impl CompressionTag {
    pub fn from_u32(tag: u32) -> Result<Self> {
        match tag {
            0 => Ok(CompressionTag::None),
            1 => Ok(CompressionTag::Lzo),
            2 => Ok(CompressionTag::Deflate),
            other => Err(Error::InvalidCompressMethod(other)),
        }
    }
}

/// Inflate a zlib-wrapped deflate payload (the format's "deflate" blocks
/// carry a 2-byte zlib header, as produced by the reference encoder).
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    zlib::Decoder::new(data)
        .read_to_end(&mut out)
        .map_err(|_| Error::MalformedBlock("deflate decode failed"))?;
    Ok(out)
}

/// LZO1x decompression; the format never carries an explicit compressed
/// length for this codec, so the caller must already know the expected
/// decompressed size.
pub fn lzo_decompress(data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    minilzo::decompress(data, expected_len).map_err(|_| Error::MalformedBlock("lzo decode failed"))
}

pub fn decompress(tag: CompressionTag, data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    match tag {
        CompressionTag::None => Ok(data.to_vec()),
        CompressionTag::Lzo => lzo_decompress(data, expected_len),
        CompressionTag::Deflate => inflate(data),
    }
}
