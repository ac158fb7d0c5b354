//! # symbol-sieve CLI
//!
//! Command-line interface for the symbol decoder.
//!
//! ## Usage
//! ```bash
//! symbol-sieve decode receipt.jpg
//! symbol-sieve batch ~/Scans --recursive --output json
//! symbol-sieve cache stats
//! ```

mod cli;

use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}
