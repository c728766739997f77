//! Shared CLI plumbing for the runtime core's two binaries (spec §1
//! "AMBIENT STACK"): logging setup and a small `bail`-style result helper.

mod logging;

pub use logging::{init_logging, LogArgs, LogFormat};

/// Helper trait for exiting a binary's `main` early on a fatal error,
/// logging it first rather than unwinding a panic.
pub trait OrBail<T> {
    fn or_bail(self, message: &str) -> T;
}

impl<T, E> OrBail<T> for Result<T, E>
where
    E: std::fmt::Display + std::fmt::Debug,
{
    fn or_bail(self, message: &str) -> T {
        match self {
            Ok(t) => t,
            Err(e) => {
                tracing::debug!(error_details = ?e, message);
                tracing::error!(error = %e, message);
                std::process::exit(1);
            }
        }
    }
}
