//! Sliding-window segmentation: classify fixed-size chunks, collapse runs,
//! merge outlier chunks (spec section 4.4).

use crate::classifier::{Classification, Classifier, Guess};

/// One chunk's classification plus the "alternates" used by [`merge`]: the
/// union (as a multiset, duplicates kept) of the top-2 labels from M2 and
/// M3 — up to 4 entries (spec section 4.4, `window`).
#[derive(Debug, Clone)]
pub struct ChunkResult {
    pub label: Guess,
    pub alternates: Vec<String>,
}

/// A maximal run of consecutive chunks sharing a label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub label: Guess,
    pub count: usize,
}

/// Result of one sliding-window pass over a buffer (spec section 4.4
/// operation `segment`).
pub struct Segmentation {
    pub runs: Vec<Run>,
    pub chunk_size: usize,
    pub best_label: Guess,
    pub best_run_count: usize,
    /// Per-chunk classification from the pass that produced `runs`, needed
    /// by [`merge`] to look up a chunk's alternates.
    pub chunks: Vec<ChunkResult>,
}

impl Segmentation {
    /// Apply the outlier-merge pass (spec section 4.4 `merge`) to this
    /// segmentation's runs.
    pub fn merge(&self) -> Vec<Run> {
        merge(&self.runs, &self.chunks, &self.best_label)
    }
}

fn alternates_of(c: &Classification) -> Vec<String> {
    let mut v = Vec::with_capacity(4);
    v.extend(c.m2.iter().take(2).map(|(label, _)| label.clone()));
    v.extend(c.m3.iter().take(2).map(|(label, _)| label.clone()));
    v
}

/// One pass at a fixed chunk size `sz`: classify overlapping two-chunk
/// windows and collapse consecutive equal labels into runs.
fn window(classifier: &Classifier, buffer: &[u8], sz: usize) -> (Vec<Run>, Vec<ChunkResult>) {
    let k = buffer.len() / sz;
    let mut runs: Vec<Run> = Vec::new();
    let mut chunks = Vec::with_capacity(k);

    for i in 0..k {
        let start = sz * i;
        let end = (sz * (i + 2)).min(buffer.len());
        let classification = classifier.classify(&buffer[start..end]);
        let label = classification.guess.clone();
        chunks.push(ChunkResult {
            label: label.clone(),
            alternates: alternates_of(&classification),
        });

        match runs.last_mut() {
            Some(run) if run.label == label => run.count += 1,
            _ => runs.push(Run { label, count: 1 }),
        }
    }

    (runs, chunks)
}

/// Label of the longest run, ignoring `Unknown` runs; ties keep the first
/// occurrence (a run only replaces the current best on a strict `>`).
fn best_guess(runs: &[Run]) -> (Guess, usize) {
    let mut best = Guess::Unknown;
    let mut count = 0;
    for run in runs {
        if run.count > count && run.label.label().is_some() {
            best = run.label.clone();
            count = run.count;
        }
    }
    (best, count)
}

/// Adaptive-chunk-size initial value for a buffer of length `len` (spec
/// section 4.4's table).
fn initial_chunk_size(len: usize) -> usize {
    let mut sz = 0x800;
    if len < 0x20000 {
        sz = 0x400;
    }
    if len < 0x8000 {
        sz = 0x200;
    }
    if len < 0x1000 {
        sz = 0x100;
    }
    if len < 0x400 {
        sz = 0x40;
    }
    sz
}

/// Run the adaptive sliding-window pass, halving the chunk size and
/// retrying while it yields no run longer than 1 chunk.
///
/// The chunk size halving happens at the end of each pass's body, after
/// that pass's best-guess is taken — so the reported `chunk_size` is
/// already halved relative to the size the returned `runs` were actually
/// computed with. That is deliberate (do not "fix" it): the original tool
/// reports `2*sz*cnt` using the post-halving `sz`, and this mirrors that.
pub fn segment(classifier: &Classifier, buffer: &[u8]) -> Segmentation {
    let mut sz = initial_chunk_size(buffer.len());
    let mut best = Guess::Unknown;
    let mut count = 0;
    let mut runs = Vec::new();
    let mut chunks = Vec::new();

    while sz >= 0x40 && (best.is_unknown() || count <= 1) {
        let (r, c) = window(classifier, buffer, sz);
        let (b, n) = best_guess(&r);
        runs = r;
        chunks = c;
        best = b;
        count = n;
        sz /= 2;
    }

    Segmentation {
        runs,
        chunk_size: sz,
        best_label: best,
        best_run_count: count,
        chunks,
    }
}

fn probably_outlier(
    cn: usize,
    prv: &Run,
    nxt: &Run,
    first_chunk_alternates: &[String],
    best_label: &Guess,
) -> bool {
    if prv.label != nxt.label {
        return false;
    }
    let Some(neighbor_label) = prv.label.label() else {
        return false;
    };
    if cn > prv.count + nxt.count {
        return false;
    }

    let neighbor_count = first_chunk_alternates
        .iter()
        .filter(|a| a.as_str() == neighbor_label)
        .count();
    if neighbor_count == 2 {
        return true;
    }

    let best_present = best_label
        .label()
        .is_some_and(|bl| first_chunk_alternates.iter().any(|a| a == bl));
    !best_present && 10 * cn < prv.count + nxt.count
}

/// Outlier-merge pass (spec section 4.4 `merge`): fold small interior runs
/// into their neighbors when the neighbors agree and the per-chunk
/// alternates support it. `chunks` must be the per-original-chunk results
/// that `runs` was collapsed from. `best_label` is the overall best guess
/// computed alongside the pass that produced `runs` (not recomputed here).
pub fn merge(runs: &[Run], chunks: &[ChunkResult], best_label: &Guess) -> Vec<Run> {
    let mut result: Vec<Run> = Vec::new();
    let mut pos = 0usize;

    for (idx, run) in runs.iter().enumerate() {
        pos += run.count;

        if let Some(last) = result.last_mut() {
            if last.label == run.label {
                last.count += run.count;
                continue;
            }
        }

        let interior = !result.is_empty() && idx < runs.len() - 1;
        if interior {
            let first_chunk = pos - run.count;
            let prv = result.last().unwrap();
            let nxt = &runs[idx + 1];
            if probably_outlier(
                run.count,
                prv,
                nxt,
                &chunks[first_chunk].alternates,
                best_label,
            ) {
                result.last_mut().unwrap().count += run.count;
                continue;
            }
        }

        result.push(run.clone());
    }

    result
}
