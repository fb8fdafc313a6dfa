//! prebuild-modules - rebuild native Node.js addons per runtime target
//!
//! Resolves a target directory name from the runtime kind, version, platform
//! and architecture, rebuilds each configured module with node-gyp, and
//! stages the rebuilt trees for packaging.
//!
//! ## Architecture
//!
//! ```text
//! cli.rs → commands/prebuild.rs → build/stager.rs → exec/ → node-gyp
//! ```

mod build;
mod cli;
mod commands;
mod config;
mod error;
mod exec;
mod utils;

use clap::Parser;

use cli::Cli;
use error::PrebuildError;
use utils::terminal::print_error;

fn main() {
    let cli = Cli::parse();
    if let Err(err) = cli.execute() {
        std::process::exit(report_error(&err));
    }
}

/// Print the error and return the process exit code it maps to
fn report_error(err: &anyhow::Error) -> i32 {
    match err.chain().find_map(|e| e.downcast_ref::<PrebuildError>()) {
        Some(prebuild_err) => {
            prebuild_err.display_with_hints();
            prebuild_err.exit_code()
        }
        None => {
            print_error(&format!("{:#}", err));
            1
        }
    }
}
