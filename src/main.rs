use clap::Parser;

use workforce::app::handle_fatal_error;
use workforce::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    if let Err(e) = cli::execute(cli).await {
        handle_fatal_error(e, verbose);
    }
}
