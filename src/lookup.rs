//! The query entry point: opens a dictionary file, builds the in-memory
//! directories, and resolves keyword/resource lookups and prefix
//! search.

use std::path::Path;

use crate::adapt::{adapt_key, normalize_mdd_path, KeyMaker};
use crate::cache::{KeyBlockCache, RecordBlockCache};
use crate::error::{Error, Result};
use crate::header::{self, Attributes, Config};
use crate::io::{ByteSource, FileCursor, FileSource};
use crate::keyword_index::{self, KeywordIndexEntry};
use crate::keyword_table::{KeyInfo, KeywordTable};
use crate::record_index::{self, RecordBlockDescriptor, RecordBlockDirectory};
use crate::scanner::Scanner;

/// `@@@LINK=` chains longer than this are treated as cycles.
const MAX_LINK_DEPTH: u32 = 8;

/// Upper bound on `search()` results.
const MAX_CANDIDATES: usize = 64;

/// Builds a [`Dictionary`], configuring lookup mode, key adaptation, and
/// record-block cache size.
pub struct DictionaryBuilder {
    express: bool,
    key_maker: Option<KeyMaker>,
    cache_blocks: usize,
    mdd: Option<bool>,
}

impl DictionaryBuilder {
    pub fn new() -> Self {
        DictionaryBuilder { express: false, key_maker: None, cache_blocks: 1, mdd: None }
    }

    /// Eagerly decode every key block into a hash table at open time
    /// ("express mode"). Off by default: building the table costs one
    /// pass over every key block up front.
    pub fn express(mut self, yes: bool) -> Self {
        self.express = yes;
        self
    }

    /// Declares this an `mdd` resource container rather than an `mdx`
    /// definition file, selecting path normalization as the default key
    /// adaptation. `open()` infers this from the file extension when not
    /// set explicitly.
    pub fn mdd(mut self, yes: bool) -> Self {
        self.mdd = Some(yes);
        self
    }

    /// Overrides the default key adaptation (case-fold/strip for `mdx`,
    /// path normalization for `mdd`) with a caller-supplied function. The
    /// same function is used both to build
    /// the internal directories and to adapt lookup queries, so it must
    /// be applied consistently.
    pub fn key_maker(mut self, f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.key_maker = Some(Box::new(f));
        self
    }

    /// Number of decompressed record blocks kept in the MRU cache.
    pub fn cache_blocks(mut self, n: usize) -> Self {
        self.cache_blocks = n.max(1);
        self
    }

    pub fn open(mut self, path: impl AsRef<Path>) -> Result<Dictionary<FileSource>> {
        if self.mdd.is_none() {
            let is_mdd = path.as_ref().extension().and_then(|e| e.to_str()).map(|e| e.eq_ignore_ascii_case("mdd")).unwrap_or(false);
            self.mdd = Some(is_mdd);
        }
        let source = FileSource::open(path)?;
        self.build(source)
    }

    pub fn build<S: ByteSource>(self, mut source: S) -> Result<Dictionary<S>> {
        let mut cursor = FileCursor::new(&mut source);
        let attrs = header::read_header(&mut cursor)?;
        let cfg = Config::from_attributes(&attrs)?;
        if cfg.header_encrypted() {
            return Err(Error::Decryption);
        }

        let keyword_summary = keyword_index::read_keyword_summary(&mut cursor, &cfg)?;
        let keyword_entries = keyword_index::read_keyword_index(&mut cursor, &cfg, &keyword_summary)?;

        let key_blocks_start = cursor.position();
        let is_mdd = self.mdd.unwrap_or(false);
        let key_maker: KeyMaker = self.key_maker.unwrap_or_else(|| {
            if is_mdd {
                Box::new(normalize_mdd_path)
            } else {
                Box::new(move |k: &str| adapt_key(k, &cfg))
            }
        });

        let keyword_table = if self.express {
            Some(build_keyword_table(&mut cursor, &cfg, &keyword_entries, key_maker.as_ref())?)
        } else {
            None
        };
        cursor.seek(key_blocks_start + keyword_summary.key_blocks_len as u64);

        let record_summary = record_index::read_record_summary(&mut cursor, &cfg)?;
        record_index::validate_summary(&record_summary)?;
        let record_dir = RecordBlockDirectory::read(&mut cursor, &cfg, &record_summary)?;

        Ok(Dictionary {
            attrs,
            cfg,
            source,
            keyword_entries,
            keyword_table,
            record_dir,
            key_maker,
            key_block_cache: KeyBlockCache::new(),
            record_cache: RecordBlockCache::new(self.cache_blocks),
        })
    }
}

impl Default for DictionaryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn build_keyword_table<S: ByteSource>(
    cursor: &mut FileCursor<S>,
    cfg: &Config,
    entries: &[KeywordIndexEntry],
    key_maker: &(dyn Fn(&str) -> String + Send + Sync),
) -> Result<KeywordTable> {
    let mut pairs = Vec::new();
    for entry in entries {
        cursor.seek(entry.file_offset);
        let raw = cursor.fetch(entry.comp_size)?;
        let decoded = decode_block(raw, entry.comp_size, Some(entry.decomp_size), *cfg)?;
        for (offset, keyword) in decode_key_block_pairs(&decoded, cfg)? {
            pairs.push((key_maker(&keyword), offset));
        }
    }
    Ok(KeywordTable::build(pairs.into_iter()))
}

fn decode_block(raw: Vec<u8>, comp_len: usize, expected: Option<usize>, cfg: Config) -> Result<Vec<u8>> {
    let mut scanner = Scanner::new(raw, cfg);
    let inner = scanner.read_block(comp_len, expected, false)?;
    Ok(inner.into_inner())
}

fn decode_key_block_pairs(data: &[u8], cfg: &Config) -> Result<Vec<(u64, String)>> {
    let mut scanner = Scanner::new(data.to_vec(), *cfg);
    let mut pairs = Vec::new();
    while !scanner.is_empty() {
        let offset = scanner.read_num()? as u64;
        let keyword = scanner.read_text()?;
        pairs.push((offset, keyword));
    }
    Ok(pairs)
}

/// An open dictionary (`.mdx` or `.mdd`): owns the parsed directories and
/// dispatches lookups in express or scan mode.
pub struct Dictionary<S: ByteSource> {
    attrs: Attributes,
    cfg: Config,
    source: S,
    keyword_entries: Vec<KeywordIndexEntry>,
    keyword_table: Option<KeywordTable>,
    record_dir: RecordBlockDirectory,
    key_maker: KeyMaker,
    key_block_cache: KeyBlockCache,
    record_cache: RecordBlockCache,
}

impl Dictionary<FileSource> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        DictionaryBuilder::new().open(path)
    }
}

impl<S: ByteSource> Dictionary<S> {
    pub fn description(&self) -> Option<&str> {
        self.attrs.get("Description")
    }

    pub fn title(&self) -> Option<&str> {
        self.attrs.get("Title")
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attrs
    }

    /// Looks up `phrase` as an `mdx` headword, resolving `@@@LINK=`
    /// redirections.
    pub fn lookup(&mut self, phrase: &str) -> Result<Vec<String>> {
        let adapted = (self.key_maker)(phrase);
        self.lookup_text(&adapted, 0)
    }

    fn lookup_text(&mut self, adapted: &str, depth: u32) -> Result<Vec<String>> {
        if depth > MAX_LINK_DEPTH {
            return Err(Error::LinkCycle);
        }
        let keyinfos = self.find_keyinfos(adapted)?;
        if keyinfos.is_empty() {
            return Err(Error::NotFound);
        }
        let mut out = Vec::new();
        for ki in keyinfos {
            let raw = self.extract_record_bytes(ki)?;
            let text = self.cfg.encoding.decode(&raw).0.into_owned();
            let text = text.trim_end_matches('\u{0}');
            match text.strip_prefix("@@@LINK=") {
                Some(target) => {
                    let target_adapted = (self.key_maker)(target.trim());
                    out.extend(self.lookup_text(&target_adapted, depth + 1)?);
                }
                None => out.push(text.to_string()),
            }
        }
        Ok(out)
    }

    /// Looks up `path` as an `mdd` resource path, returning its raw
    /// bytes. No `@@@LINK=` resolution applies to resource data.
    pub fn lookup_resource(&mut self, path: &str) -> Result<Vec<Vec<u8>>> {
        let adapted = (self.key_maker)(path);
        let keyinfos = self.find_keyinfos(&adapted)?;
        if keyinfos.is_empty() {
            return Err(Error::NotFound);
        }
        keyinfos.into_iter().map(|ki| self.extract_record_bytes(ki)).collect()
    }

    /// Returns up to `MAX_CANDIDATES` keywords starting at the first key
    /// that matches (or sorts after) `phrase`. `mdx` only.
    pub fn search(&mut self, phrase: &str) -> Result<Vec<String>> {
        let adapted = (self.key_maker)(phrase);
        let Some(mut block_idx) = self.locate_block(&adapted) else {
            return Ok(Vec::new());
        };
        let mut collected = Vec::new();
        while block_idx < self.keyword_entries.len() && collected.len() < MAX_CANDIDATES {
            let entry = self.keyword_entries[block_idx].clone();
            let pairs = decode_key_block_pairs(&self.load_key_block(&entry)?, &self.cfg)?;
            let start = pairs.partition_point(|(_, kw)| (self.key_maker)(kw).as_str() < adapted.as_str());
            for (_, kw) in pairs.iter().skip(start) {
                collected.push(kw.clone());
                if collected.len() >= MAX_CANDIDATES {
                    break;
                }
            }
            block_idx += 1;
        }
        Ok(collected)
    }

    fn find_keyinfos(&mut self, adapted: &str) -> Result<Vec<KeyInfo>> {
        if let Some(table) = &self.keyword_table {
            return Ok(table.find(adapted));
        }
        self.scan_find(adapted)
    }

    /// Scan-mode lookup: binary-search the keyword directory for the
    /// containing block, decompress it (via the single-slot cache when
    /// possible), then linearly match entries.
    fn scan_find(&mut self, adapted: &str) -> Result<Vec<KeyInfo>> {
        let Some(idx) = self.locate_block(adapted) else {
            return Ok(Vec::new());
        };
        let entry = self.keyword_entries[idx].clone();
        let pairs = decode_key_block_pairs(&self.load_key_block(&entry)?, &self.cfg)?;

        let mut results = Vec::new();
        for (i, (offset, keyword)) in pairs.iter().enumerate() {
            if (self.key_maker)(keyword) == adapted {
                let size = if i + 1 < pairs.len() { Some(pairs[i + 1].0 - offset) } else { None };
                results.push(KeyInfo { record_offset: *offset, size });
            }
        }
        Ok(results)
    }

    /// Binary search for the first keyword block whose adapted
    /// `last_word` is `>= adapted`.
    fn locate_block(&self, adapted: &str) -> Option<usize> {
        let entries = &self.keyword_entries;
        let mut lo = 0usize;
        let mut hi = entries.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let last = (self.key_maker)(&entries[mid].last_word);
            if last.as_str() < adapted {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if lo < entries.len() {
            Some(lo)
        } else {
            None
        }
    }

    fn load_key_block(&mut self, entry: &KeywordIndexEntry) -> Result<Vec<u8>> {
        if let Some(cached) = self.key_block_cache.get(&entry.first_word) {
            return Ok(cached.to_vec());
        }
        let mut cursor = FileCursor::new(&mut self.source);
        cursor.seek(entry.file_offset);
        let raw = cursor.fetch(entry.comp_size)?;
        let bytes = decode_block(raw, entry.comp_size, Some(entry.decomp_size), self.cfg)?;
        self.key_block_cache.put(entry.first_word.clone(), bytes.clone());
        Ok(bytes)
    }

    /// Locates the record block for `ki`, decompresses it (cached by
    /// block number), and slices out the record's bytes. A `None` size
    /// reads to the end of the containing block.
    fn extract_record_bytes(&mut self, ki: KeyInfo) -> Result<Vec<u8>> {
        let desc = self.record_dir.find(ki.record_offset).ok_or(Error::NotFound)?;
        let decompressed = self.load_record_block(&desc)?;
        let start = (ki.record_offset - desc.decomp_offset) as usize;
        let end = match ki.size {
            Some(size) => start + size as usize,
            None => decompressed.len(),
        };
        if start > end || end > decompressed.len() {
            return Err(Error::MalformedBlock("record slice out of range"));
        }
        Ok(decompressed[start..end].to_vec())
    }

    fn load_record_block(&mut self, desc: &RecordBlockDescriptor) -> Result<Vec<u8>> {
        if let Some(cached) = self.record_cache.get(desc.block_no) {
            return Ok(cached.to_vec());
        }
        let mut cursor = FileCursor::new(&mut self.source);
        cursor.seek(desc.file_offset_comp);
        let raw = cursor.fetch(desc.comp_size)?;
        let bytes = decode_block(raw, desc.comp_size, Some(desc.decomp_size), self.cfg)?;
        self.record_cache.put(desc.block_no, bytes.clone());
        Ok(bytes)
    }
}
