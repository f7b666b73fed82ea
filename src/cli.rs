//! CLI struct definitions for the palisade command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `lib.rs`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "palisade",
    version = env!("CARGO_PKG_VERSION"),
    about = "Palisade is the workspace compliance guard: every substantive change must ship with progress records, checked-off tasks, and passing tests — with or without a VCS present."
)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Run the guard against the workspace (the default when no subcommand
    /// is given). Exits non-zero on a policy denial.
    Check(CheckCli),
    /// Show the detector strategy and classified change set without
    /// enforcing anything.
    Status(CheckCli),
    /// Scaffold `.palisade/guard.toml` with default settings.
    Init {
        /// Directory to initialize (defaults to current working directory).
        #[clap(short, long)]
        dir: Option<PathBuf>,
        /// Overwrite an existing guard.toml.
        #[clap(long)]
        force: bool,
    },
    /// Print the palisade version.
    Version,
}

#[derive(clap::Args, Debug)]
pub(crate) struct CheckCli {
    /// Workspace root (defaults to current working directory).
    #[clap(short, long)]
    pub root: Option<PathBuf>,
}
