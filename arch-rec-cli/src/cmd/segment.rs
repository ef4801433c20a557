use std::fs;
use std::path::PathBuf;

use arch_rec_core::query;
use arch_rec_core::Classifier;
use clap::Parser;

#[derive(Debug, Parser)]
pub struct SegmentCmd {
    /// Directory of `.corpus`/`.corpus.xz` reference samples
    #[clap(short, long)]
    pub corpus: PathBuf,

    /// Raw byte blob to segment
    #[clap(short, long)]
    pub input: PathBuf,

    /// Skip the outlier-merge pass and print the raw runs
    #[clap(long)]
    pub no_merge: bool,
}

impl SegmentCmd {
    pub fn run(self) -> eyre::Result<()> {
        let classifier = Classifier::from_corpus_dir(&self.corpus)?;
        let buffer = fs::read(&self.input)?;

        let segmentation = query::sliding(&classifier, &buffer);
        let runs = if self.no_merge {
            segmentation.runs.clone()
        } else {
            segmentation.merge()
        };

        println!("chunk size: 0x{:x}", segmentation.chunk_size);
        for run in &runs {
            let label = run.label.label().unwrap_or("unknown");
            println!("{label:<16} x{}", run.count);
        }
        Ok(())
    }
}
