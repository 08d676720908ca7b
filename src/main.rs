use clap::Parser;

use affinity_cli::cli::{run, Cli};
use affinity_cli::error::render;

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let verbose = cli.global.verbose;
    if let Err(error) = run(cli).await {
        eprintln!("{}", render(&error, verbose));
        std::process::exit(1);
    }
}
