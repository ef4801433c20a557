//! Diagnostic model dump (spec section 6.2) and the per-buffer
//! classification report (spec section 6.3). Neither is a stable wire
//! format; the report derives `Serialize` purely for the CLI's convenience.

use serde::Serialize;

use crate::classifier::Classifier;
use crate::model::Model;
use crate::segment;

/// Render one n-gram table as `0x<hex>: <count>,` lines sorted by count
/// descending, hex-padded to `2n` digits (spec section 6.2). The count is
/// truncated to an integer, matching `cpu_rec.py`'s `dump` (`%d`
/// formatting) rather than leaking the Variant-A smoothing seed into the
/// diagnostic output.
pub fn dump_table(model: &Model, label: &str) -> String {
    let width = 2 * model.n();
    let Some(entry) = model.labels().iter().find(|e| e.label == label) else {
        return String::new();
    };

    let mut counts: Vec<(u32, f64)> = entry.counts.iter().map(|(&k, &v)| (k, v)).collect();
    counts.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut out = String::new();
    for (idx, count) in counts {
        let count = count as i64;
        out.push_str(&format!("0x{idx:0width$x}: {count},\n", width = width));
    }
    out
}

/// Dump both M2 and M3 tables for `label` as two named sections.
pub fn dump_model(m2: &Model, m3: &Model, label: &str) -> String {
    format!(
        "M2\n{}M3\n{}",
        dump_table(m2, label),
        dump_table(m3, label)
    )
}

/// Per-buffer classification summary (spec section 6.3).
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub buffer_len: usize,
    pub label: Option<String>,
    /// Only populated when a caller supplies an already-extracted
    /// text-section buffer; this crate does not itself parse container
    /// formats (spec section 1's non-goals).
    pub text_section_label: Option<String>,
    /// `2 * chunk_size * longest_run_count`, the already-halved chunk size
    /// scaled by the best run's length, matching `cpu_rec.py`'s
    /// `chunk(%#x;%s)` display (spec section 9 open question (a)) rather
    /// than the bare chunk size.
    pub segment_size: usize,
    pub longest_run_count: usize,
    pub longest_run_label: Option<String>,
}

impl ClassificationReport {
    /// Classify and segment `buffer`, optionally also classifying a
    /// separately-supplied text-section buffer.
    pub fn build(
        classifier: &Classifier,
        buffer: &[u8],
        text_section: Option<&[u8]>,
    ) -> Self {
        let classification = classifier.classify(buffer);
        let text_section_label = text_section
            .map(|ts| classifier.classify(ts).guess)
            .and_then(|guess| guess.label().map(str::to_string));
        let segmentation = segment::segment(classifier, buffer);

        Self {
            buffer_len: buffer.len(),
            label: classification.guess.label().map(str::to_string),
            text_section_label,
            segment_size: 2 * segmentation.chunk_size * segmentation.best_run_count,
            longest_run_count: segmentation.best_run_count,
            longest_run_label: segmentation.best_label.label().map(str::to_string),
        }
    }
}
