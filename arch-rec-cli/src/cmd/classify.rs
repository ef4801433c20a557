use std::fs;
use std::path::PathBuf;

use arch_rec_core::{Classifier, ClassificationReport};
use clap::Parser;

#[derive(Debug, Parser)]
pub struct ClassifyCmd {
    /// Directory of `.corpus`/`.corpus.xz` reference samples
    #[clap(short, long)]
    pub corpus: PathBuf,

    /// Raw byte blob to classify
    #[clap(short, long)]
    pub input: PathBuf,

    /// Already-extracted text section of `input`, if the caller has one
    /// (this crate does not itself parse container formats)
    #[clap(long)]
    pub text_section: Option<PathBuf>,

    /// Print the report as JSON instead of plain text
    #[clap(long)]
    pub json: bool,
}

impl ClassifyCmd {
    pub fn run(self) -> eyre::Result<()> {
        log::info!("training classifier from corpus at {}", self.corpus.display());
        let classifier = Classifier::from_corpus_dir(&self.corpus)?;

        let buffer = fs::read(&self.input)?;
        let text_section = self
            .text_section
            .as_ref()
            .map(fs::read)
            .transpose()?;

        let report = ClassificationReport::build(&classifier, &buffer, text_section.as_deref());

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("buffer length:     {}", report.buffer_len);
            println!("label:             {}", report.label.as_deref().unwrap_or("unknown"));
            if let Some(ts) = &report.text_section_label {
                println!("text section:      {ts}");
            }
            println!(
                "segment summary:   size=0x{:x} longest_run={} label={}",
                report.segment_size,
                report.longest_run_count,
                report.longest_run_label.as_deref().unwrap_or("unknown")
            );
        }
        Ok(())
    }
}
