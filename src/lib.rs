//! # Symbol Sieve
//!
//! Finds and decodes machine-readable symbols in photographs of documents,
//! even when the photo is poor.
//!
//! ## Approach
//! - **Try several views** - Each image is run through a cascade of seven
//!   preprocessing steps and the recognizer sees every one of them
//! - **Reconcile** - Detections of the same symbol from different steps are
//!   merged, keeping the first
//! - **Never decode twice** - Results are cached by file content
//!
//! ## Architecture
//! - `core` - The decode pipeline (cascade, aggregation, cache, batch)
//! - `events` - Channel-based progress reporting
//! - `config` - TOML settings
//! - `error` - User-friendly error types

pub mod config;
pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{Result, SieveError};

/// Initialize tracing for the library
///
/// `RUST_LOG` takes precedence; otherwise `default_level` (e.g. `"warn"`,
/// `"symbol_sieve=debug"`) is used. Calling this more than once is harmless.
pub fn init_tracing(default_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
