//! Keyword hash table used by "express mode" lookup: a sorted, compact
//! index mapping a hash of each keyword to its record offset.

use crate::murmur::hash_key;

/// `(record_offset, optional_size)` for one keyword. `size` is `None`
/// for the last record in the file, whose size is computed from the
/// containing block's end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInfo {
    pub record_offset: u64,
    pub size: Option<u64>,
}

struct Ordinal {
    hash: u32,
    ordinal: u32,
}

/// Sorted-by-hash array of `(hash, ordinal)` plus, indexed by ordinal,
/// the adapted key text and record offset.
pub struct KeywordTable {
    by_hash: Vec<Ordinal>,
    /// Indexed by ordinal: adapted key text, for post-hash verification.
    keys: Vec<String>,
    /// Indexed by ordinal: record offset. Monotonically non-decreasing.
    record_offsets: Vec<u64>,
}

impl KeywordTable {
    /// Builds the table from keyword entries in original (alphabetical)
    /// file order: `(adapted_key, record_offset)` pairs, one per
    /// keyword, ordinal assigned densely in iteration order.
    pub fn build(entries: impl Iterator<Item = (String, u64)>) -> Self {
        let mut keys = Vec::new();
        let mut record_offsets = Vec::new();
        let mut by_hash = Vec::new();

        for (ordinal, (key, offset)) in entries.enumerate() {
            by_hash.push(Ordinal { hash: hash_key(&key), ordinal: ordinal as u32 });
            keys.push(key);
            record_offsets.push(offset);
        }
        by_hash.sort_by_key(|e| e.hash);

        KeywordTable { by_hash, keys, record_offsets }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn keyinfo_for(&self, ordinal: usize) -> KeyInfo {
        let record_offset = self.record_offsets[ordinal];
        let size = if ordinal + 1 < self.record_offsets.len() {
            Some(self.record_offsets[ordinal + 1] - record_offset)
        } else {
            None
        };
        KeyInfo { record_offset, size }
    }

    /// Finds every keyword whose adapted text equals `adapted_key`.
    /// Hash collisions are resolved by verifying the candidate's true
    /// (adapted) key against the query after a hash hit.
    pub fn find(&self, adapted_key: &str) -> Vec<KeyInfo> {
        if self.by_hash.is_empty() {
            return Vec::new();
        }
        let target = hash_key(adapted_key);
        let Some(mut idx) = self.bisect(target) else {
            return Vec::new();
        };

        // Walk to the first entry sharing this hash, then collect every
        // entry with the same hash going forward, verifying keys.
        while idx > 0 && self.by_hash[idx - 1].hash == target {
            idx -= 1;
        }
        let mut results = Vec::new();
        while idx < self.by_hash.len() && self.by_hash[idx].hash == target {
            let ordinal = self.by_hash[idx].ordinal as usize;
            if self.keys[ordinal] == adapted_key {
                results.push(self.keyinfo_for(ordinal));
            }
            idx += 1;
        }
        results
    }

    fn bisect(&self, target: u32) -> Option<usize> {
        let mut lo = 0usize;
        let mut hi = self.by_hash.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.by_hash[mid].hash.cmp(&target) {
                std::cmp::Ordering::Equal => return Some(mid),
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_exact_match() {
        let table = KeywordTable::build(
            vec![("apple".to_string(), 0u64), ("banana".to_string(), 10), ("cherry".to_string(), 25)]
                .into_iter(),
        );
        let hits = table.find("banana");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].record_offset, 10);
        assert_eq!(hits[0].size, Some(15));
    }

    #[test]
    fn last_entry_has_no_size() {
        let table = KeywordTable::build(
            vec![("a".to_string(), 0u64), ("z".to_string(), 40)].into_iter(),
        );
        let hits = table.find("z");
        assert_eq!(hits[0].size, None);
    }

    #[test]
    fn missing_key_returns_empty() {
        let table = KeywordTable::build(vec![("only".to_string(), 0u64)].into_iter());
        assert!(table.find("nope").is_empty());
    }

    #[test]
    fn record_offsets_are_monotonic_invariant_holds() {
        let table = KeywordTable::build(
            vec![("a".to_string(), 0u64), ("b".to_string(), 5), ("c".to_string(), 5)].into_iter(),
        );
        for w in table.record_offsets.windows(2) {
            assert!(w[0] <= w[1]);
        }
    }
}
