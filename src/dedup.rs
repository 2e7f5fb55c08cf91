//! Line normalization and the frequency table.
//!
//! The table is a flat open-addressed array keyed by the FNV-1a hash of the
//! normalized line. Insertion order is observable through `first_line`, so a
//! std map (whose iteration order differs) is not a drop-in replacement here.

use regex::Regex;

const FNV_OFFSET: u64 = 14_695_981_039_346_656_037;
const FNV_PRIME: u64 = 1_099_511_628_211;

const MIN_CAPACITY: usize = 64;

/// FNV-1a over raw bytes.
pub fn fnv1a(data: &[u8]) -> u64 {
    let mut h = FNV_OFFSET;
    for &b in data {
        h ^= u64::from(b);
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// Normalize a line for deduplication: apply each strip pattern in order
/// (every non-empty match becomes a single space), then collapse whitespace
/// runs and trim.
pub fn normalize_line(line: &str, strip_patterns: &[Regex]) -> String {
    let mut result = line.to_string();
    for pat in strip_patterns {
        result = strip_matches(&result, pat);
    }
    collapse_whitespace(&result)
}

fn strip_matches(input: &str, pat: &Regex) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for m in pat.find_iter(input) {
        if m.start() == m.end() {
            continue;
        }
        out.push_str(&input[last..m.start()]);
        out.push(' ');
        last = m.end();
    }
    out.push_str(&input[last..]);
    out
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for word in s.split_ascii_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// One unique normalized line with its occurrence stats.
#[derive(Debug, Clone)]
pub struct DedupEntry {
    /// Normalized (stripped) text — the table key.
    pub normalized: String,
    /// First-seen original text.
    pub original: String,
    /// Line number of the first occurrence (zero-based).
    pub first_line: usize,
    pub count: usize,
    pub hash: u64,
}

/// Open-addressed hash table with linear probing. Capacity is a power of two;
/// the load factor is kept at or below 0.7 by doubling.
pub struct DedupTable {
    buckets: Vec<Option<DedupEntry>>,
    len: usize,
}

impl DedupTable {
    pub fn new() -> Self {
        Self::with_capacity_hint(MIN_CAPACITY)
    }

    /// `hint` is the expected number of unique lines; rounded up to the next
    /// power of two, never below 64.
    pub fn with_capacity_hint(hint: usize) -> Self {
        let cap = hint.max(MIN_CAPACITY).next_power_of_two();
        Self {
            buckets: vec![None; cap],
            len: 0,
        }
    }

    /// Number of unique entries.
    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Insert a line, normalizing it first. A repeated line bumps `count` on
    /// the existing entry; a new line records the original text and the line
    /// number of this first occurrence.
    pub fn insert(&mut self, line: &str, line_num: usize, strip_patterns: &[Regex]) -> &DedupEntry {
        if self.len * 10 > self.capacity() * 7 {
            self.grow();
        }

        let norm = normalize_line(line, strip_patterns);
        let hash = fnv1a(norm.as_bytes());
        let mask = self.capacity() - 1;
        let mut idx = (hash as usize) & mask;

        while let Some(e) = &self.buckets[idx] {
            if e.hash == hash && e.normalized == norm {
                break;
            }
            idx = (idx + 1) & mask;
        }

        let slot = &mut self.buckets[idx];
        if slot.is_none() {
            self.len += 1;
        }
        let entry = slot.get_or_insert_with(|| DedupEntry {
            normalized: norm,
            original: line.to_string(),
            first_line: line_num,
            count: 0,
            hash,
        });
        entry.count += 1;
        entry
    }

    /// Look up an entry by the original (unnormalized) line text.
    ///
    /// The probe hashes the raw line, so it only lands on entries whose
    /// normalization was a no-op. Callers treat a miss as count 1.
    pub fn lookup_original(&self, line: &str) -> Option<&DedupEntry> {
        let hash = fnv1a(line.as_bytes());
        let mask = self.capacity() - 1;
        let mut idx = (hash as usize) & mask;
        while let Some(e) = &self.buckets[idx] {
            if e.hash == hash && e.original == line {
                return Some(e);
            }
            idx = (idx + 1) & mask;
        }
        None
    }

    /// All entries sorted by count descending; ties keep first-occurrence
    /// order.
    pub fn sorted_by_frequency(&self) -> Vec<&DedupEntry> {
        let mut entries: Vec<&DedupEntry> = self.buckets.iter().flatten().collect();
        entries.sort_by(|a, b| b.count.cmp(&a.count).then(a.first_line.cmp(&b.first_line)));
        entries
    }

    fn grow(&mut self) {
        let new_cap = self.capacity() * 2;
        let mask = new_cap - 1;
        let mut new_buckets: Vec<Option<DedupEntry>> = vec![None; new_cap];
        for slot in self.buckets.drain(..) {
            if let Some(entry) = slot {
                let mut idx = (entry.hash as usize) & mask;
                while new_buckets[idx].is_some() {
                    idx = (idx + 1) & mask;
                }
                new_buckets[idx] = Some(entry);
            }
        }
        self.buckets = new_buckets;
    }
}

impl Default for DedupTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn strip(patterns: &[&str]) -> Vec<Regex> {
        patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
    }

    #[test]
    fn fnv1a_published_constants() {
        assert_eq!(fnv1a(b""), 14_695_981_039_346_656_037);
        // Known vector: "a" -> offset ^ 'a' * prime
        let expected = (14_695_981_039_346_656_037_u64 ^ u64::from(b'a'))
            .wrapping_mul(1_099_511_628_211);
        assert_eq!(fnv1a(b"a"), expected);
    }

    #[test]
    fn normalize_collapses_and_trims() {
        assert_eq!(normalize_line("  a \t b  ", &[]), "a b");
        assert_eq!(normalize_line("", &[]), "");
    }

    #[test]
    fn normalize_applies_patterns_in_order() {
        let pats = strip(&["0x[0-9a-f]+", "[0-9]+"]);
        assert_eq!(
            normalize_line("addr 0xdeadbeef at 42", &pats),
            "addr at"
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let pats = strip(&["\"[^\"]*\"", "[0-9]+"]);
        let once = normalize_line("built \"foo\" in 3 ms  ", &pats);
        assert_eq!(normalize_line(&once, &pats), once);
    }

    #[test]
    fn insert_counts_duplicates() {
        let mut t = DedupTable::new();
        for i in 0..3 {
            t.insert("warning: foo", i, &[]);
        }
        assert_eq!(t.len(), 1);
        let e = t.lookup_original("warning: foo").unwrap();
        assert_eq!(e.count, 3);
        assert_eq!(e.first_line, 0);
        assert_eq!(e.original, "warning: foo");
    }

    #[test]
    fn count_sum_equals_insert_count() {
        let mut t = DedupTable::new();
        let lines = ["a", "b", "a", "c", "a", "b"];
        for (i, l) in lines.iter().enumerate() {
            t.insert(l, i, &[]);
        }
        let total: usize = t.sorted_by_frequency().iter().map(|e| e.count).sum();
        assert_eq!(total, lines.len());
    }

    #[test]
    fn sorted_by_frequency_descending_with_first_seen_ties() {
        let mut t = DedupTable::new();
        for (i, l) in ["x", "y", "y", "z"].iter().enumerate() {
            t.insert(l, i, &[]);
        }
        let sorted = t.sorted_by_frequency();
        assert_eq!(sorted[0].original, "y");
        assert_eq!(sorted[1].original, "x");
        assert_eq!(sorted[2].original, "z");
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut t = DedupTable::with_capacity_hint(64);
        for i in 0..200 {
            t.insert(&format!("line {i}"), i, &[]);
        }
        assert_eq!(t.len(), 200);
        assert!(t.capacity().is_power_of_two());
        // Load factor stays at or below 0.7
        assert!(t.len() * 10 <= t.capacity() * 7);
        // Every entry still reachable after the resizes
        assert!(t.lookup_original("line 0").is_some());
        assert!(t.lookup_original("line 199").is_some());
    }

    #[test]
    fn lookup_misses_when_normalization_changed_the_line() {
        let pats = strip(&["[0-9]+"]);
        let mut t = DedupTable::new();
        t.insert("step 12 done", 0, &pats);
        // Raw-line probe hashes the unnormalized text and cannot find it.
        assert!(t.lookup_original("step 12 done").is_none());
    }
}
