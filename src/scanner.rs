//! Cursor over an in-memory byte buffer. Decodes primitive integers,
//! sized/NUL-terminated text in the dictionary's configured encoding,
//! and compressed/encrypted sub-blocks. Scanners are cheap and are
//! spawned per parsed region (e.g. one per key block, one per record
//! block) rather than shared.

use byteorder::{ByteOrder, BE};

use crate::codec::{self, CompressionTag};
use crate::decrypt::Decryptor;
use crate::error::{Error, Result};
use crate::header::Config;

#[derive(Debug)]
pub struct Scanner {
    data: Vec<u8>,
    pos: usize,
    cfg: Config,
    /// When false (the default), `read_num` silently truncates a v2
    /// 64-bit field to its low 32 bits, matching the source engine.
    /// When true, a non-zero high half is an error.
    pub strict_numbers: bool,
}

impl Scanner {
    pub fn new(data: Vec<u8>, cfg: Config) -> Self {
        Scanner { data, pos: 0, cfg, strict_numbers: false }
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn need(&self, len: usize) -> Result<()> {
        if self.remaining() < len {
            Err(Error::MalformedBlock("unexpected end of buffer"))
        } else {
            Ok(())
        }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.need(1)?;
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.need(2)?;
        let v = BE::read_u16(&self.data[self.pos..self.pos + 2]);
        self.pos += 2;
        Ok(v)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.need(4)?;
        let v = BE::read_u32(&self.data[self.pos..self.pos + 4]);
        self.pos += 4;
        Ok(v)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.need(8)?;
        let v = BE::read_u64(&self.data[self.pos..self.pos + 8]);
        self.pos += 8;
        Ok(v)
    }

    /// Version-aware number: v1 is a plain 32-bit field; v2 is a 64-bit
    /// field of which only the low 32 bits are significant.
    pub fn read_num(&mut self) -> Result<u32> {
        if !self.cfg.v2 {
            return self.read_u32();
        }
        let raw = self.read_u64()?;
        if raw >> 32 != 0 {
            if self.strict_numbers {
                return Err(Error::NumberOverflow);
            }
        }
        Ok(raw as u32)
    }

    /// Version-aware short integer: 8-bit in v1, 16-bit in v2.
    pub fn read_short(&mut self) -> Result<u16> {
        if self.cfg.v2 {
            self.read_u16()
        } else {
            Ok(self.read_u8()? as u16)
        }
    }

    pub fn read_raw(&mut self, len: usize) -> Result<&[u8]> {
        self.need(len)?;
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Advances 4 bytes without validating the checksum; checksums are
    /// never validated.
    pub fn checksum(&mut self) -> Result<()> {
        self.read_raw(4)?;
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> String {
        self.cfg.encoding.decode(bytes).0.into_owned()
    }

    /// Fixed-length UTF-16LE decode.
    pub fn read_utf16le(&mut self, len_bytes: usize) -> Result<String> {
        let bytes = self.read_raw(len_bytes)?;
        Ok(encoding_rs::UTF_16LE.decode(bytes).0.into_owned())
    }

    /// Scans forward for a NUL terminator (width = `bytes_per_unit`),
    /// decodes the prefix, then advances past the terminator and, in
    /// v2, one additional tail code unit.
    pub fn read_text(&mut self) -> Result<String> {
        let width = self.cfg.bytes_per_unit;
        let mut i = self.pos;
        let idx = loop {
            if i + width > self.data.len() {
                return Err(Error::MalformedBlock("missing NUL terminator"));
            }
            let is_nul = self.data[i..i + width].iter().all(|b| *b == 0);
            if is_nul {
                break i;
            }
            i += width;
        };
        let text = self.decode(&self.data[self.pos..idx]);
        let advance = idx - self.pos + width + self.cfg.text_tail * width;
        self.need(advance)?;
        self.pos += advance;
        Ok(text)
    }

    /// Decodes exactly `count_units * bytes_per_unit` bytes, trims a
    /// trailing NUL (present when the declared count already includes
    /// the terminator, as in v1), then advances past the configured
    /// tail padding.
    pub fn read_text_sized(&mut self, count_units: usize) -> Result<String> {
        let byte_len = count_units * self.cfg.bytes_per_unit;
        let bytes = self.read_raw(byte_len)?.to_vec();
        let tail = self.cfg.text_tail * self.cfg.bytes_per_unit;
        self.need(tail)?;
        self.pos += tail;
        let text = self.decode(&bytes);
        Ok(trim_trailing_nul(&text))
    }

    /// Reads the 8-byte block preamble (4-byte compression tag, 4-byte
    /// checksum — skipped) then, when `decrypt` is set, derives the
    /// passkey from that checksum and decrypts in place before
    /// decompressing the remaining `compressed_len - 8` bytes,
    /// returning a fresh scanner over the decompressed payload. Tag 0
    /// (uncompressed) returns a scanner over the same bytes, unmodified.
    pub fn read_block(
        &mut self,
        compressed_len: usize,
        expected_decomp_len: Option<usize>,
        decrypt: bool,
    ) -> Result<Scanner> {
        if compressed_len < 8 {
            return Err(Error::MalformedBlock("block shorter than preamble"));
        }
        let tag_bytes = {
            let b = self.read_raw(4)?;
            [b[0], b[1], b[2], b[3]]
        };
        let tag = CompressionTag::from_u32(BE::read_u32(&tag_bytes))?;
        let checksum_bytes = {
            let b = self.read_raw(4)?;
            [b[0], b[1], b[2], b[3]]
        };

        let payload_len = compressed_len - 8;
        let payload = self.read_raw(payload_len)?.to_vec();

        if tag == CompressionTag::None {
            return Ok(Scanner::new(payload, self.cfg));
        }

        let payload = if decrypt {
            let dec = Decryptor::from_checksum(&checksum_bytes);
            let mut buf = payload;
            dec.decrypt(&mut buf);
            buf
        } else {
            payload
        };

        let expected = expected_decomp_len.unwrap_or(0);
        let decompressed = codec::decompress(tag, &payload, expected)?;
        if let Some(expected) = expected_decomp_len {
            if decompressed.len() != expected {
                return Err(Error::MalformedBlock("decompressed size mismatch"));
            }
        }
        Ok(Scanner::new(decompressed, self.cfg))
    }

    /// Consumes the scanner, returning its backing buffer. Used after
    /// `read_block` to take ownership of a decompressed payload in full.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

fn trim_trailing_nul(s: &str) -> String {
    s.trim_end_matches('\u{0}').to_string()
}
