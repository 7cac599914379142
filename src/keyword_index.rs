//! Keyword summary + keyword index decode: the directory of keyword
//! blocks used by scan-mode lookup and prefix search.

use crate::error::Result;
use crate::header::Config;
use crate::io::{ByteSource, FileCursor};
use crate::scanner::Scanner;

/// The four/five fixed-width fields preceding the keyword index block.
pub(crate) struct KeywordSummary {
    pub num_blocks: usize,
    pub num_entries: usize,
    pub key_index_decomp_len: Option<usize>,
    pub key_index_comp_len: usize,
    pub key_blocks_len: usize,
}

pub(crate) fn read_keyword_summary<S: ByteSource>(
    cursor: &mut FileCursor<S>,
    cfg: &Config,
) -> Result<KeywordSummary> {
    if !cfg.v2 {
        let buf = cursor.fetch(16)?;
        let mut s = Scanner::new(buf, *cfg);
        Ok(KeywordSummary {
            num_blocks: s.read_u32()? as usize,
            num_entries: s.read_u32()? as usize,
            key_index_decomp_len: None,
            key_index_comp_len: s.read_u32()? as usize,
            key_blocks_len: s.read_u32()? as usize,
        })
    } else {
        let buf = cursor.fetch(44)?;
        let mut s = Scanner::new(buf, *cfg);
        let summary = KeywordSummary {
            num_blocks: s.read_u64()? as usize,
            num_entries: s.read_u64()? as usize,
            key_index_decomp_len: Some(s.read_u64()? as usize),
            key_index_comp_len: s.read_u64()? as usize,
            key_blocks_len: s.read_u64()? as usize,
        };
        s.checksum()?;
        Ok(summary)
    }
}

/// One entry per keyword block: its byte range, first/last word, and
/// entry count.
#[derive(Debug, Clone)]
pub struct KeywordIndexEntry {
    pub num_entries: usize,
    pub first_word: String,
    pub last_word: String,
    pub comp_size: usize,
    pub decomp_size: usize,
    /// Absolute offset within the file of this block's compressed bytes.
    pub file_offset: u64,
    pub ordinal: usize,
}

/// Reads the keyword index block (one `read_block` call, optionally
/// decrypted) and decodes its `num_blocks` entries, stamping each with
/// its absolute file offset.
pub(crate) fn read_keyword_index<S: ByteSource>(
    cursor: &mut FileCursor<S>,
    cfg: &Config,
    summary: &KeywordSummary,
) -> Result<Vec<KeywordIndexEntry>> {
    let raw = cursor.fetch(summary.key_index_comp_len)?;
    let mut outer = Scanner::new(raw, *cfg);
    let mut inner = outer.read_block(
        summary.key_index_comp_len,
        summary.key_index_decomp_len,
        cfg.key_index_encrypted(),
    )?;

    let mut entries = Vec::with_capacity(summary.num_blocks);
    let mut file_offset = cursor.position();
    for ordinal in 0..summary.num_blocks {
        let num_entries = inner.read_num()? as usize;
        let first_word_size = inner.read_short()? as usize;
        let first_word = inner.read_text_sized(first_word_size)?;
        let last_word_size = inner.read_short()? as usize;
        let last_word = inner.read_text_sized(last_word_size)?;
        let comp_size = inner.read_num()? as usize;
        let decomp_size = inner.read_num()? as usize;

        entries.push(KeywordIndexEntry {
            num_entries,
            first_word,
            last_word,
            comp_size,
            decomp_size,
            file_offset,
            ordinal,
        });
        file_offset += comp_size as u64;
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::parse_attrs;
    use crate::io::FileSource;
    use std::io::Write;

    fn cfg_v1() -> Config {
        let attrs = parse_attrs(r#"<Dictionary GeneratedByEngineVersion="1.2" Encoding="UTF-8"/>"#).unwrap();
        Config::from_attributes(&attrs).unwrap()
    }

    fn tmp_with(bytes: &[u8]) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "mdict-ki-test-{}-{}.bin",
            std::process::id(),
            std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_nanos()
        ));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn reads_v1_summary_and_one_entry_index() {
        let cfg = cfg_v1();

        // Build one uncompressed keyword-index block payload: one entry
        // describing num_entries=2, first="a", last="b", comp=10, decomp=20.
        let mut payload = Vec::new();
        payload.extend_from_slice(&2u32.to_be_bytes()); // num_entries
        // v1's declared short field is a raw byte count that already
        // includes the trailing NUL terminator: "a" + NUL = 2 bytes.
        payload.push(2);
        payload.extend_from_slice(b"a\0");
        payload.push(2);
        payload.extend_from_slice(b"b\0");
        payload.extend_from_slice(&10u32.to_be_bytes());
        payload.extend_from_slice(&20u32.to_be_bytes());

        let mut block = Vec::new();
        block.extend_from_slice(&0u32.to_be_bytes()); // tag: none
        block.extend_from_slice(&[0, 0, 0, 0]); // checksum (unused)
        block.extend_from_slice(&payload);

        let mut file_bytes = Vec::new();
        file_bytes.extend_from_slice(&1u32.to_be_bytes()); // num_blocks
        file_bytes.extend_from_slice(&1u32.to_be_bytes()); // num_entries
        file_bytes.extend_from_slice(&(block.len() as u32).to_be_bytes()); // key_index_comp_len
        file_bytes.extend_from_slice(&0u32.to_be_bytes()); // key_blocks_len (unused here)
        file_bytes.extend_from_slice(&block);

        let path = tmp_with(&file_bytes);
        let mut source = FileSource::open(&path).unwrap();
        let mut cursor = FileCursor::new(&mut source);

        let summary = read_keyword_summary(&mut cursor, &cfg).unwrap();
        assert_eq!(summary.num_blocks, 1);
        let entries = read_keyword_index(&mut cursor, &cfg, &summary).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].first_word, "a");
        assert_eq!(entries[0].last_word, "b");
        assert_eq!(entries[0].comp_size, 10);
        assert_eq!(entries[0].decomp_size, 20);
        assert_eq!(entries[0].file_offset, file_bytes.len() as u64);

        let _ = std::fs::remove_file(&path);
    }
}
