//! Per-n Markov model: label frequency tables, KL-divergence scoring (spec
//! section 4.2).

use fnv::FnvHashMap;

use crate::ngram::{self, Counts, Variant};

/// A trained per-label frequency table plus its floor frequency and the raw
/// counts it was derived from (kept only for the optional diagnostic dump,
/// spec section 6.2).
#[derive(Debug, Clone)]
pub struct LabelModel {
    pub label: String,
    pub counts: Counts,
    pub q: Counts,
    pub f0: f64,
}

/// A bigram or trigram Markov model trained over a corpus, under one
/// smoothing variant. Two of these (n=2 and n=3, both Variant A) make up a
/// [`crate::classifier::Classifier`].
pub struct Model {
    n: usize,
    variant: Variant,
    mod4: bool,
    labels: Vec<LabelModel>,
    index: FnvHashMap<String, usize>,
}

impl Model {
    /// A model over n-grams of width `n`, sliding by 1 byte.
    pub fn new(n: usize, variant: Variant) -> Self {
        Self {
            n,
            variant,
            mod4: false,
            labels: Vec::new(),
            index: FnvHashMap::default(),
        }
    }

    /// A bigram model sampling one bigram per aligned 4-byte word (spec
    /// section 4.1's "mod4" option and design note on word-aligned ISAs).
    /// Not used by [`crate::classifier::Classifier`]'s default M2/M3 pair.
    pub fn new_bigram_mod4(variant: Variant) -> Self {
        Self {
            n: 2,
            variant,
            mod4: true,
            labels: Vec::new(),
            index: FnvHashMap::default(),
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn labels(&self) -> &[LabelModel] {
        &self.labels
    }

    /// Fold one training sample's bytes into `label`'s running count table.
    /// Samples sharing a label accumulate into the same table (spec section
    /// 3); an empty or too-short sample is logged and otherwise a no-op
    /// (spec section 7, `MalformedSample`).
    pub fn add_sample(&mut self, label: &str, bytes: &[u8]) {
        if bytes.is_empty() {
            log::warn!("model: empty training sample for label {label:?}, ignoring");
        } else if bytes.len() < self.n {
            log::warn!(
                "model: training sample for label {label:?} shorter than n={}, contributes nothing",
                self.n
            );
        }

        let idx = match self.index.get(label) {
            Some(&idx) => idx,
            None => {
                let idx = self.labels.len();
                self.labels.push(LabelModel {
                    label: label.to_string(),
                    counts: Counts::default(),
                    q: Counts::default(),
                    f0: 0.0,
                });
                self.index.insert(label.to_string(), idx);
                idx
            }
        };

        let base_count = self.variant.base_count();
        let counts = &mut self.labels[idx].counts;
        if self.mod4 {
            ngram::accumulate_bigrams_mod4(counts, bytes, base_count);
        } else {
            ngram::accumulate(counts, bytes, self.n, base_count);
        }
    }

    /// Normalize every label's raw counts into `Q_label` and `f0(label)`
    /// (spec section 4.2 steps 2-4). Must be called once after all samples
    /// are added and before [`Model::score`] is used.
    pub fn finalize(&mut self) {
        let table_size = ngram::table_size(self.n) as f64;
        let base_count = self.variant.base_count();
        for entry in &mut self.labels {
            if entry.counts.is_empty() {
                log::warn!(
                    "model: label {:?} has no n-grams after training, treating as empty",
                    entry.label
                );
                entry.f0 = match self.variant {
                    Variant::A => f64::MIN_POSITIVE,
                    Variant::B => 1.0 / (256.0 * table_size),
                };
                continue;
            }

            let raw_total: f64 = entry.counts.values().sum();
            let unseen = table_size - entry.counts.len() as f64;
            let qtotal = raw_total + base_count * unseen;

            entry.q = entry
                .counts
                .iter()
                .map(|(&idx, &count)| (idx, count / qtotal))
                .collect();

            entry.f0 = match self.variant {
                Variant::A => 0.01 / qtotal,
                Variant::B => 1.0 / (256.0 * table_size),
            };
        }
    }

    /// Score `buffer` against every trained label, returning `(label, KL)`
    /// pairs sorted ascending by KL divergence — the lowest KL is the best
    /// match. Buffers shorter than `n` yield an empty list (spec section
    /// 4.1's tie-break/edge policy).
    pub fn score(&self, buffer: &[u8]) -> Vec<(String, f64)> {
        let p = if self.mod4 {
            ngram::count_bigrams_mod4_seeded(buffer, 0.0)
        } else {
            ngram::count_seeded(buffer, self.n, 0.0)
        };
        if p.is_empty() {
            return Vec::new();
        }
        let p_total: f64 = p.values().sum();

        let score_label = |entry: &LabelModel| -> (String, f64) {
            let kl: f64 = p
                .iter()
                .map(|(idx, &raw)| {
                    let pi = raw / p_total;
                    let qi = entry.q.get(idx).copied().unwrap_or(entry.f0);
                    pi * (pi / qi).ln()
                })
                .sum();
            (entry.label.clone(), kl)
        };

        use rayon::prelude::*;
        let mut ranked: Vec<(String, f64)> = self.labels.par_iter().map(score_label).collect();
        ranked.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use float_eq::assert_float_eq;

    #[test]
    fn training_sample_ranks_itself_first() {
        let mut model = Model::new(2, Variant::A);
        model.add_sample("X86", b"\x55\x48\x89\xe5\x48\x83\xec\x10\x55\x48\x89\xe5");
        model.add_sample("ARMel", b"\x00\x48\x2d\xe9\x04\xb0\x8d\xe2\x00\x48\x2d\xe9");
        model.finalize();

        let ranked = model.score(b"\x55\x48\x89\xe5\x48\x83\xec\x10\x55\x48\x89\xe5");
        assert_eq!(ranked[0].0, "X86");
    }

    #[test]
    fn qtotal_invariant_holds_under_variant_a() {
        let mut model = Model::new(2, Variant::A);
        model.add_sample("X86", b"\x55\x48\x89\xe5\x48\x83\xec\x10");
        model.finalize();

        let entry = &model.labels()[0];
        let table_size = ngram::table_size(2) as f64;
        let mass: f64 = entry.q.values().sum::<f64>()
            + (table_size - entry.q.len() as f64) * entry.f0;
        assert_float_eq!(mass, 1.0, abs <= 1e-9);
    }

    #[test]
    fn every_frequency_strictly_positive() {
        let mut model = Model::new(3, Variant::A);
        model.add_sample("MIPSel", b"\x27\xbd\xff\xe0\xaf\xbf\x00\x1c");
        model.finalize();

        let entry = &model.labels()[0];
        assert!(entry.f0 > 0.0);
        assert!(entry.q.values().all(|&q| q > 0.0));
    }

    #[test]
    fn empty_buffer_scores_to_empty_list() {
        let mut model = Model::new(2, Variant::A);
        model.add_sample("X86", b"\x55\x48\x89\xe5");
        model.finalize();

        assert!(model.score(&[]).is_empty());
        assert!(model.score(b"\x55").is_empty());
    }

    #[test]
    fn repeated_samples_accumulate_into_one_table() {
        let mut once = Model::new(2, Variant::A);
        once.add_sample("X86", b"\x55\x48\x89\xe5");
        once.finalize();

        let mut twice = Model::new(2, Variant::A);
        twice.add_sample("X86", b"\x55\x48\x89\xe5");
        twice.add_sample("X86", b"\x55\x48\x89\xe5");
        twice.finalize();

        // Seeding happens once per label, not once per sample: the raw
        // count for a shared key should be exactly double, not
        // double-plus-an-extra-pseudocount.
        let once_entry = &once.labels()[0];
        let twice_entry = &twice.labels()[0];
        let key = 0x5548u32;
        assert_float_eq!(
            twice_entry.counts[&key],
            2.0 * once_entry.counts[&key] - 0.01,
            abs <= 1e-12
        );
    }
}
