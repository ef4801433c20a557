//! Statistical CPU instruction set architecture recognition from raw bytes.
//!
//! Trains a bigram and a trigram byte-level Markov model per architecture
//! label from a corpus of reference samples, then classifies an arbitrary
//! buffer by comparing it against every trained label with
//! Kullback-Leibler divergence. See the module docs on [`classifier`] and
//! [`segment`] for the disagreement/veto heuristic and the sliding-window
//! segmenter respectively.

pub mod classifier;
pub mod corpus;
pub mod error;
pub mod model;
pub mod ngram;
pub mod query;
pub mod report;
pub mod segment;

pub use classifier::{Classification, Classifier, Guess};
pub use error::{Error, Result};
pub use ngram::Variant;
pub use report::ClassificationReport;
