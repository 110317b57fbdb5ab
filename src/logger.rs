//! Scoped structured logging for code that builds lazy computations.
//!
//! The lazy value types never log. This module gives their callers a logger
//! that follows the current scope: [`with_logger`] attaches a logger for the
//! duration of a closure, [`current`] fetches it back (falling back to the
//! global logger), and the re-exported macros log through it.
//!
//! The macros accept a format string and arguments, optionally followed by
//! `;` and key-value pairs:
//!
//! ```rust
//! use lazy_value::logger::{self, info, o};
//!
//! let root = slog::Logger::root(slog::Discard, o!());
//! logger::with_logger(&root, || {
//!    info!("loaded {} entries", 3; "source" => "disk");
//! });
//! ```

use slog::{OwnedKV, SendSyncRefUnwindSafeKV};
use thiserror::Error;

#[doc(inline)]
pub use slog::{o, Level, Logger};
#[doc(inline)]
pub use slog_scope::{crit, debug, error, info, trace, warn, GlobalLoggerGuard};

/// Exit status used by [`fatal!`](crate::fatal).
pub const FATAL_EXIT_CODE: i32 = 1;

/// Errors raised while setting up logging.
#[derive(Debug, Error)]
pub enum LoggerError {
   /// A global `log` logger was already installed in this process.
   #[error("failed to install the global logger")]
   Init(#[from] log::SetLoggerError),
}

/// Returns the logger attached to the current scope, or the global logger.
#[inline]
pub fn current() -> Logger {
   slog_scope::logger()
}

/// Runs `f` with `logger` attached to the current scope.
///
/// Scopes nest; the previous logger is restored when `f` returns or unwinds.
#[inline]
pub fn with_logger<R, F>(logger: &Logger, f: F) -> R
where
   F: FnOnce() -> R,
{
   slog_scope::scope(logger, f)
}

/// Runs `f` with a child of the current logger that carries `values`.
pub fn with_fields<T, R, F>(values: OwnedKV<T>, f: F) -> R
where
   T: SendSyncRefUnwindSafeKV + 'static,
   F: FnOnce() -> R,
{
   let child = current().new(values);
   with_logger(&child, f)
}

/// Installs a global terminal logger filtered by the `RUST_LOG` environment variable.
///
/// Keep the returned guard alive for as long as the global logger should stay
/// installed.
pub fn init_env() -> Result<GlobalLoggerGuard, LoggerError> {
   Ok(slog_envlogger::init()?)
}

/// Terminates the process after a fatal log record.
#[doc(hidden)]
pub fn exit_fatal() -> ! {
   std::process::exit(FATAL_EXIT_CODE)
}

/// Logs at error level through the scoped logger, then exits the process
/// with [`FATAL_EXIT_CODE`](crate::logger::FATAL_EXIT_CODE).
#[macro_export]
macro_rules! fatal {
   ($($args:tt)+) => {{
      $crate::logger::error!($($args)+);
      $crate::logger::exit_fatal()
   }};
}

#[doc(inline)]
pub use crate::fatal;
