//! gh-cost-center CLI
//!
//! Assigns Copilot users and repositories to cost centers

use clap::Parser;
use gh_cost_center::cli::{Cli, Runner};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let runner = Runner::new(cli);

    if let Err(e) = runner.run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
