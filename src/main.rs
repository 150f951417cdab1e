use clap::Parser;
use squeeze::cli::{Cli, Commands};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Eval(args) => squeeze::cli::eval(args).await,
        Commands::Config(args) => squeeze::cli::config(args),
    }
}
