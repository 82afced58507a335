//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use chargemap_cli::CliError;
use env_logger::Env;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    match chargemap_cli::run() {
        Ok(()) => {}
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("chargemap: {err}");
            std::process::exit(1);
        }
    }
}
