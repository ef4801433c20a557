//! On-disk corpus loading (spec section 6.1), a concrete implementation of
//! the Corpus Interface contract (spec section 4.5).

use std::fs;
use std::io::Read;
use std::path::Path;

use xz2::read::XzDecoder;

use crate::error::{Error, Result};

/// One training sample read from the corpus directory.
pub struct Sample {
    pub label: String,
    pub bytes: Vec<u8>,
}

/// Load every `.corpus`/`.corpus.xz` entry in `dir` into a flat list of
/// samples. When both forms of a label exist, the uncompressed one wins
/// and a warning is logged (spec section 6.1). A directory that doesn't
/// exist, isn't readable, or yields zero usable samples is
/// [`Error::CorpusUnavailable`].
pub fn load_dir(dir: impl AsRef<Path>) -> Result<Vec<Sample>> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|_| Error::CorpusUnavailable(dir.to_path_buf()))?;

    let names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();

    let mut samples = Vec::new();
    for name in &names {
        if name.ends_with(".corpus.xz") {
            let uncompressed = &name[..name.len() - 3];
            if names.contains(&uncompressed.to_string()) {
                log::warn!(
                    "corpus: both compressed and uncompressed versions of {:?} present, using the uncompressed one",
                    &name[..name.len() - ".corpus.xz".len()]
                );
                continue;
            }
        }

        let (label, compressed) = if let Some(stripped) = name.strip_suffix(".corpus.xz") {
            (stripped, true)
        } else if let Some(stripped) = name.strip_suffix(".corpus") {
            (stripped, false)
        } else {
            continue;
        };

        let path = dir.join(name);
        let bytes = read_sample(&path, label, compressed)?;
        samples.push(Sample {
            label: label.to_string(),
            bytes,
        });
    }

    if samples.is_empty() {
        return Err(Error::CorpusUnavailable(dir.to_path_buf()));
    }
    Ok(samples)
}

fn read_sample(path: &Path, label: &str, compressed: bool) -> Result<Vec<u8>> {
    let raw = fs::read(path).map_err(|source| Error::CorpusIo {
        label: label.to_string(),
        source,
    })?;
    if !compressed {
        return Ok(raw);
    }
    let mut decoded = Vec::new();
    XzDecoder::new(&raw[..])
        .read_to_end(&mut decoded)
        .map_err(|source| Error::CorpusDecompress {
            label: label.to_string(),
            source,
        })?;
    Ok(decoded)
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_plain_and_labels_by_stripped_filename() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("X86.corpus"), b"\x55\x48\x89\xe5").unwrap();
        fs::write(dir.path().join("_zero.corpus"), vec![0u8; 16]).unwrap();

        let mut samples = load_dir(dir.path()).unwrap();
        samples.sort_by(|a, b| a.label.cmp(&b.label));
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].label, "X86");
        assert_eq!(samples[1].label, "_zero");
    }

    #[test]
    fn prefers_uncompressed_when_both_present() {
        use std::io::Write;
        use xz2::write::XzEncoder;

        let dir = tempdir().unwrap();
        fs::write(dir.path().join("ARMel.corpus"), b"plain").unwrap();
        let mut encoder = XzEncoder::new(Vec::new(), 6);
        encoder.write_all(b"compressed").unwrap();
        fs::write(dir.path().join("ARMel.corpus.xz"), encoder.finish().unwrap()).unwrap();

        let samples = load_dir(dir.path()).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].bytes, b"plain");
    }

    #[test]
    fn decompresses_xz_only_entries() {
        use std::io::Write;
        use xz2::write::XzEncoder;

        let dir = tempdir().unwrap();
        let mut encoder = XzEncoder::new(Vec::new(), 6);
        encoder.write_all(b"\x00\x48\x2d\xe9").unwrap();
        fs::write(
            dir.path().join("ARM64.corpus.xz"),
            encoder.finish().unwrap(),
        )
        .unwrap();

        let samples = load_dir(dir.path()).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].label, "ARM64");
        assert_eq!(samples[0].bytes, b"\x00\x48\x2d\xe9");
    }

    #[test]
    fn missing_directory_is_corpus_unavailable() {
        let err = load_dir("/nonexistent/path/does/not/exist").unwrap_err();
        assert!(matches!(err, Error::CorpusUnavailable(_)));
    }

    #[test]
    fn empty_directory_is_corpus_unavailable() {
        let dir = tempdir().unwrap();
        let err = load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, Error::CorpusUnavailable(_)));
    }
}
