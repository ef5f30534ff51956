//! treewatch CLI

use clap::Parser;
use cli_lib::{logging, Args};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // --help and --version land here too and are not failures
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let _log_guard = match logging::init(args.verbose, args.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("treewatch: {:#}", err);
            return ExitCode::from(1);
        }
    };

    let logs_to_file = args.log_file.is_some();
    match cli_lib::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if logs_to_file {
                tracing::error!("{:#}", err);
            }
            eprintln!("treewatch: {:#}", err);
            ExitCode::from(1)
        }
    }
}
