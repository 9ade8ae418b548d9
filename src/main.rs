use std::process::ExitCode;

use clap::Parser;
use daystreak::{
    cli::{run_cli, Args},
    utils::runtime::single_thread_runtime,
};
use tracing::error;

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            // Help and version go through here as well
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let result = single_thread_runtime().and_then(|runtime| runtime.block_on(run_cli(args)));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Error running cli {e:?}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
