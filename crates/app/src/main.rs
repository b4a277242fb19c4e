mod cli;

use anyhow::Result;
use clap::Parser;
use crowd_density::crowd::{self, CrowdConfig};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = cli::Cli::parse();
    let config = CrowdConfig::try_from(cli.args)?;
    crowd::run(config)
}
