//! Error handling at the process boundary

use tracing::error;

use crate::error::Error;
use crate::storage::StorageError;

pub const GENERAL_ERROR: i32 = 1;
pub const CONFIG_ERROR: i32 = 2;
pub const STORE_UNAVAILABLE: i32 = 3;

/// Exit code for an error that reached `main`
pub fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<Error>() {
        Some(Error::Config(_) | Error::Toml(_) | Error::Seed(_)) => CONFIG_ERROR,
        Some(Error::Storage(storage)) => storage_exit_code(storage),
        Some(_) => GENERAL_ERROR,
        None => error
            .downcast_ref::<StorageError>()
            .map_or(GENERAL_ERROR, storage_exit_code),
    }
}

fn storage_exit_code(error: &StorageError) -> i32 {
    match error {
        StorageError::Configuration(_) => CONFIG_ERROR,
        StorageError::Transport(_) => STORE_UNAVAILABLE,
        _ => GENERAL_ERROR,
    }
}

/// Report a fatal error and exit
///
/// The full cause chain is printed with `-v` and above.
pub fn handle_fatal_error(error: anyhow::Error, verbose: u8) -> ! {
    error!("Fatal error: {}", error);
    eprintln!("Error: {error}");

    if verbose >= 1 {
        eprintln!("\nError chain:");
        for (i, cause) in error.chain().enumerate() {
            eprintln!("  {}: {}", i, cause);
        }
    }

    std::process::exit(exit_code(&error))
}
