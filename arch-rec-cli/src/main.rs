mod cmd;

use clap::{Parser, Subcommand};
use clap_verbosity_flag::Verbosity;
use human_panic::setup_panic;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
/// Identify the CPU architecture of a raw binary blob by statistical
/// comparison against a corpus of reference samples.
struct Args {
    #[clap(flatten)]
    verbose: Verbosity,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a whole buffer against a corpus
    Classify(cmd::classify::ClassifyCmd),

    /// Run the sliding-window segmenter over a buffer
    Segment(cmd::segment::SegmentCmd),

    /// Dump one label's trained n-gram table (spec section 6.2)
    DumpModel(cmd::dump_model::DumpModelCmd),
}

fn main() -> eyre::Result<()> {
    setup_panic!();

    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    match args.command {
        Commands::Classify(cmd) => cmd.run()?,
        Commands::Segment(cmd) => cmd.run()?,
        Commands::DumpModel(cmd) => cmd.run()?,
    }

    Ok(())
}
