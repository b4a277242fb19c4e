use clap::Parser;
use crowd_density::crowd::CrowdCliArgs;

/// Stream a webcam through a person detector and serve the annotated feed
/// with a live crowd-density value.
#[derive(Debug, Parser)]
#[command(name = "crowd-density", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub args: CrowdCliArgs,
}
