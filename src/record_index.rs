//! Record summary + record-block directory: locates which compressed
//! record block holds a given record offset.

use crate::error::{Error, Result};
use crate::header::Config;
use crate::io::{ByteSource, FileCursor};
use crate::scanner::Scanner;

pub(crate) struct RecordSummary {
    pub num_blocks: usize,
    pub num_entries: usize,
    pub index_len: usize,
    pub blocks_len: usize,
}

/// Record summary fields use the version-aware `number` encoding: 4
/// bytes in v1, low 32 bits of 8 bytes in v2.
pub(crate) fn read_record_summary<S: ByteSource>(
    cursor: &mut FileCursor<S>,
    cfg: &Config,
) -> Result<RecordSummary> {
    let field_width = if cfg.v2 { 8 } else { 4 };
    let buf = cursor.fetch(field_width * 4)?;
    let mut s = Scanner::new(buf, *cfg);
    Ok(RecordSummary {
        num_blocks: s.read_num()? as usize,
        num_entries: s.read_num()? as usize,
        index_len: s.read_num()? as usize,
        blocks_len: s.read_num()? as usize,
    })
}

/// One entry of the directory: the compressed block's file range, its
/// decompressed size, and its cumulative decompressed offset (the sum of
/// every decompressed size before it).
#[derive(Debug, Clone, Copy)]
pub struct RecordBlockDescriptor {
    pub block_no: usize,
    pub file_offset_comp: u64,
    pub comp_size: usize,
    pub decomp_offset: u64,
    pub decomp_size: usize,
}

/// Ordered `(file_offset_comp, cumulative_offset_decomp)` directory of
/// length `num_blocks + 1`, the last element a sentinel.
pub struct RecordBlockDirectory {
    entries: Vec<RecordBlockDescriptor>,
    /// Sentinel: total compressed and decompressed sizes.
    total_comp: u64,
    total_decomp: u64,
}

impl RecordBlockDirectory {
    /// Reads the record-block index (`num_blocks` pairs of `(comp_size,
    /// decomp_size)`, both `number`-encoded) and computes cumulative
    /// offsets. The first record block begins right after this index.
    pub(crate) fn read<S: ByteSource>(
        cursor: &mut FileCursor<S>,
        cfg: &Config,
        summary: &RecordSummary,
    ) -> Result<Self> {
        let field_width = if cfg.v2 { 8 } else { 4 };
        let buf = cursor.fetch(field_width * 2 * summary.num_blocks)?;
        let mut s = Scanner::new(buf, *cfg);

        let mut entries = Vec::with_capacity(summary.num_blocks);
        let mut file_offset = cursor.position();
        let mut decomp_offset = 0u64;
        for block_no in 0..summary.num_blocks {
            let comp_size = s.read_num()? as usize;
            let decomp_size = s.read_num()? as usize;
            entries.push(RecordBlockDescriptor {
                block_no,
                file_offset_comp: file_offset,
                comp_size,
                decomp_offset,
                decomp_size,
            });
            file_offset += comp_size as u64;
            decomp_offset += decomp_size as u64;
        }

        Ok(RecordBlockDirectory { entries, total_comp: file_offset, total_decomp: decomp_offset })
    }

    /// Binary search over the decompressed-offset column. Returns `None`
    /// when `record_offset` exceeds the final sentinel.
    pub fn find(&self, record_offset: u64) -> Option<RecordBlockDescriptor> {
        if record_offset >= self.total_decomp {
            return None;
        }
        let mut lo = 0usize;
        let mut hi = self.entries.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.entries[mid].decomp_offset <= record_offset {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if lo == 0 {
            return None;
        }
        Some(self.entries[lo - 1])
    }

    pub fn total_decomp_len(&self) -> u64 {
        self.total_decomp
    }

    pub fn total_comp_end(&self) -> u64 {
        self.total_comp
    }
}

pub(crate) fn validate_summary(summary: &RecordSummary) -> Result<()> {
    if summary.num_blocks == 0 && summary.num_entries != 0 {
        return Err(Error::MalformedBlock("record summary: entries present with no blocks"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{parse_attrs, Config};
    use crate::io::FileSource;
    use std::io::Write;

    fn cfg_v1() -> Config {
        let attrs = parse_attrs(r#"<Dictionary GeneratedByEngineVersion="1.2" Encoding="UTF-8"/>"#).unwrap();
        Config::from_attributes(&attrs).unwrap()
    }

    fn tmp_with(bytes: &[u8]) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "mdict-ri-test-{}-{}.bin",
            std::process::id(),
            std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap().as_nanos()
        ));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn builds_directory_and_finds_offsets() {
        let cfg = cfg_v1();

        let mut file_bytes = Vec::new();
        file_bytes.extend_from_slice(&2u32.to_be_bytes()); // num_blocks
        file_bytes.extend_from_slice(&0u32.to_be_bytes()); // num_entries (unused here)
        file_bytes.extend_from_slice(&0u32.to_be_bytes()); // index_len (unused here)
        file_bytes.extend_from_slice(&0u32.to_be_bytes()); // blocks_len (unused here)
        // block 0: comp=5, decomp=10 ; block 1: comp=7, decomp=20
        file_bytes.extend_from_slice(&5u32.to_be_bytes());
        file_bytes.extend_from_slice(&10u32.to_be_bytes());
        file_bytes.extend_from_slice(&7u32.to_be_bytes());
        file_bytes.extend_from_slice(&20u32.to_be_bytes());

        let path = tmp_with(&file_bytes);
        let mut source = FileSource::open(&path).unwrap();
        let mut cursor = FileCursor::new(&mut source);

        let summary = read_record_summary(&mut cursor, &cfg).unwrap();
        assert_eq!(summary.num_blocks, 2);
        let index_end = cursor.position();
        let dir = RecordBlockDirectory::read(&mut cursor, &cfg, &summary).unwrap();

        assert_eq!(dir.entries[0].file_offset_comp, index_end);
        assert_eq!(dir.entries[0].decomp_offset, 0);
        assert_eq!(dir.entries[1].decomp_offset, 10);
        assert_eq!(dir.total_decomp_len(), 30);

        let hit = dir.find(15).unwrap();
        assert_eq!(hit.block_no, 1);
        assert_eq!(hit.decomp_offset, 10);

        let hit0 = dir.find(0).unwrap();
        assert_eq!(hit0.block_no, 0);

        assert!(dir.find(30).is_none());
        assert!(dir.find(1000).is_none());

        let _ = std::fs::remove_file(&path);
    }
}
