//! Error handling utilities

use crate::error::BlockflowError;
use tracing::error;

/// Report a fatal error on stderr and exit
///
/// `BlockflowError`s exit with their category code; anything else exits 1.
/// With `-v` the full cause chain is printed.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {}", error);

    eprintln!("Error: {error}");
    if verbose >= 1 {
        eprintln!("\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            eprintln!("  {}: {}", i, cause);
        }
    }

    let exit_code = error
        .downcast_ref::<BlockflowError>()
        .map(BlockflowError::exit_code)
        .unwrap_or(1);

    std::process::exit(exit_code)
}
