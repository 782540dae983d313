use anyhow::Result;
use clap::Parser;

mod app;
mod calls;
mod cli;
mod logger;

fn main() -> Result<()> {
    let cli = crate::cli::Cli::parse();
    crate::app::run(cli)
}
