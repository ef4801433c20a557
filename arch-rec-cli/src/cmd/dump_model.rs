use std::fs;
use std::path::PathBuf;

use arch_rec_core::{report, Classifier};
use clap::Parser;

#[derive(Debug, Parser)]
pub struct DumpModelCmd {
    /// Directory of `.corpus`/`.corpus.xz` reference samples
    #[clap(short, long)]
    pub corpus: PathBuf,

    /// Architecture label to dump (must match a corpus file's base name)
    #[clap(short, long)]
    pub label: String,

    /// Write the dump here instead of stdout
    #[clap(short, long)]
    pub output: Option<PathBuf>,
}

impl DumpModelCmd {
    pub fn run(self) -> eyre::Result<()> {
        let classifier = Classifier::from_corpus_dir(&self.corpus)?;
        let dump = report::dump_model(classifier.m2(), classifier.m3(), &self.label);

        match self.output {
            Some(path) => fs::write(path, dump)?,
            None => print!("{dump}"),
        }
        Ok(())
    }
}
