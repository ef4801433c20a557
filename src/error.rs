use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building a [`crate::classifier::Classifier`]
/// from an on-disk corpus.
///
/// Scoring itself never fails: an unrecognized or ambiguous buffer is
/// represented by `Guess::Unknown`, not by an `Err`. Construction is the
/// only failure point, and it either produces a fully usable classifier or
/// fails permanently (see spec section 7).
#[derive(Debug, Error)]
pub enum Error {
    #[error("no corpus directory readable at {0}")]
    CorpusUnavailable(PathBuf),

    #[error("corpus entry {label:?} could not be read")]
    CorpusIo {
        label: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corpus entry {label:?} could not be xz-decompressed")]
    CorpusDecompress {
        label: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
