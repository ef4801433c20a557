//! Byte n-gram counting (spec section 4.1).
//!
//! An n-gram index is a base-256 integer composed MSB-first from n
//! consecutive bytes. Counting seeds each key to a smoothing variant's base
//! pseudo-count the first time it's touched, then increments; a key never
//! seen stays absent from the map.

use fnv::FnvHashMap;

/// Sparse n-gram count/frequency table, keyed by n-gram index.
pub type Counts = FnvHashMap<u32, f64>;

/// Additive-smoothing variant used both while counting and while filling in
/// the floor frequency for unseen n-grams (spec section 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    /// Every n-gram that appears starts from a pseudo-count of 0.01.
    A,
    /// No pseudo-count; unseen n-grams fall back to a uniform floor.
    B,
}

impl Variant {
    /// Seed value an n-gram's counter is given the first time it's touched.
    pub fn base_count(self) -> f64 {
        match self {
            Variant::A => 0.01,
            Variant::B => 0.0,
        }
    }
}

/// Size of the n-gram index space, 256^n.
pub fn table_size(n: usize) -> u64 {
    256u64.pow(n as u32)
}

/// Count n-grams with a 1-byte sliding window, yielding
/// `max(0, buffer.len() - n + 1)` n-grams. Buffers shorter than `n` produce
/// an empty map.
pub fn count(buffer: &[u8], n: usize, variant: Variant) -> Counts {
    count_seeded(buffer, n, variant.base_count())
}

/// Count n-grams seeded with an explicit base pseudo-count. Used directly
/// by scoring, which always observes the buffer with a base count of 0
/// regardless of the model's smoothing variant (spec section 4.2 step 1).
pub fn count_seeded(buffer: &[u8], n: usize, base_count: f64) -> Counts {
    let mut counts = Counts::default();
    accumulate(&mut counts, buffer, n, base_count);
    counts
}

/// Fold n-grams from `buffer` into an existing count table, using the
/// first-touch-seeds-the-rest-increments rule. A label trained from several
/// concatenated samples must seed each key only once across all of them, not
/// once per sample (spec section 3), so model construction accumulates into
/// one shared table across samples rather than summing independently-seeded
/// per-sample maps.
pub fn accumulate(counts: &mut Counts, buffer: &[u8], n: usize, base_count: f64) {
    if n == 0 || buffer.len() < n {
        return;
    }
    let mut acc: u64 = 0;
    for (i, &b) in buffer.iter().enumerate() {
        acc = (acc << 8) | b as u64;
        if i + 1 >= n {
            let idx = (acc & (table_size(n) - 1)) as u32;
            *counts.entry(idx).or_insert(base_count) += 1.0;
        }
    }
}

/// Count bigrams sampling only bytes at offsets (0, 1) of each aligned
/// 4-byte word, ignoring offsets 2 and 3. Used by word-aligned ISAs with
/// sparse byte patterns (spec section 4.1). Truncates an incomplete
/// trailing window.
pub fn count_bigrams_mod4(buffer: &[u8], variant: Variant) -> Counts {
    count_bigrams_mod4_seeded(buffer, variant.base_count())
}

pub fn count_bigrams_mod4_seeded(buffer: &[u8], base_count: f64) -> Counts {
    let mut counts = Counts::default();
    accumulate_bigrams_mod4(&mut counts, buffer, base_count);
    counts
}

/// Mod4 counterpart of [`accumulate`].
pub fn accumulate_bigrams_mod4(counts: &mut Counts, buffer: &[u8], base_count: f64) {
    for word in buffer.chunks_exact(4) {
        let idx = (word[0] as u32) << 8 | word[1] as u32;
        *counts.entry(idx).or_insert(base_count) += 1.0;
    }
}
