/// triton-loadgen - Fixed-rate load generator for Triton inference servers.
///
/// Fetches a model's input schema once and sends zero-filled inference
/// requests at a constant rate, printing one line per completed request.
mod cli;

use clap::Parser;
use cli::{exit_code, Cli};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.run() {
        eprintln!("Error: {}", e);
        std::process::exit(exit_code(&e));
    }
}
