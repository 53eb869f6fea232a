use std::process::ExitCode;

use bookcheck::cli::{self, Args};
use clap::Parser;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    cli::run(Args::parse()).await
}
