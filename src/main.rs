//! Funcreg CLI entry point.

use clap::Parser;
use funcreg::cli::{self, Cli, Commands, EXIT_ERROR};
use funcreg::logging;

fn main() {
    let cli = Cli::parse();

    // scan installs logging itself once the config file has been merged
    let exit_code = match cli.command {
        Commands::Scan(args) => match cli::run_scan(&args, cli.log_format) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                EXIT_ERROR
            }
        },
        Commands::Init(args) => {
            logging::init(false, cli.log_format);
            match cli::run_init(&args) {
                Ok(code) => code,
                Err(e) => {
                    eprintln!("Error: {:#}", e);
                    EXIT_ERROR
                }
            }
        }
    };

    std::process::exit(exit_code);
}
