use std::process::ExitCode;

use api_core::cli::{self, CliArgs};
use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    match cli::run(args).await {
        Ok(response) => {
            println!("{}", cli::render(&response));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
