//! Logging initialization for the BruceFlash CLI

use anyhow::Result;
use env_logger::{Builder, Target};
use log::LevelFilter;

/// Map the `-q`/`-v` flags to a log level.
pub fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    }
}

/// Initialize stderr logging for the CLI.
///
/// Logging goes to stderr so diagnostics never interleave with the
/// terminal transcript on stdout.
pub fn init_cli_logging(verbose: u8, quiet: bool) -> Result<()> {
    let level = level_for(verbose, quiet);

    Builder::from_default_env()
        .target(Target::Stderr)
        .filter_level(level)
        .format_timestamp_secs()
        .format_module_path(false)
        .init();

    log::debug!("BruceFlash logging initialized with level: {:?}", level);
    Ok(())
}
