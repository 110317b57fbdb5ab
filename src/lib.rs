//! Thread-safe lazy values: computed at most once, on first use, with the
//! outcome cached for every caller.
//!
//! This crate provides two cell types wrapping a fallible computation:
//!
//! - [`LazyValue<T, E>`]: runs the computation exactly once. Success *and*
//!   failure are cached; a failed computation is never retried.
//! - [`RetryLazyValue<T, E>`]: caches only success. A failure is handed back
//!   to the caller whose attempt failed and the next caller tries again.
//!
//! Both types are thread-safe and use atomic operations with `parking_lot`'s futex-based
//! synchronization for efficient blocking when necessary. Concurrent callers never
//! run the computation twice: one caller is elected to run it, the others park until
//! the outcome is published.
//!
//! # Features
//!
//! - **Lock-free fast path**: Reading a published outcome is a single atomic load.
//! - **Efficient blocking**: Uses futex-based parking while another thread computes.
//! - **Async support**: `get_async` waits cooperatively on a tokio runtime.
//! - **Defined panic behavior**: A panicking computation aborts a [`LazyValue`]
//!   instead of hanging its waiters; see [`Aborted`].
//! - **Scoped logging** (`logger` feature): a small `slog` facade for callers.
//!
//! # Examples
//!
//! ## Cached failure
//!
//! ```rust
//! use lazy_value::{LazyError, LazyValue};
//!
//! let disk: LazyValue<Vec<u8>, &str> = LazyValue::new(|| Err("disk unavailable"));
//!
//! assert_eq!(disk.get(), Err(LazyError::Failed(&"disk unavailable")));
//! // The computation is not run again.
//! assert_eq!(disk.get(), Err(LazyError::Failed(&"disk unavailable")));
//! ```
//!
//! ## Shared between threads
//!
//! ```rust
//! use std::env::VarError;
//! use std::sync::Arc;
//! use std::thread;
//!
//! use lazy_value::LazyValue;
//!
//! fn app_mode() -> Result<String, VarError> {
//!    std::env::var("APP_MODE").or_else(|_| Ok("production".to_string()))
//! }
//!
//! let mode = Arc::new(LazyValue::<String, VarError>::new(app_mode));
//!
//! let handles: Vec<_> = (0..4)
//!    .map(|_| {
//!       let mode = Arc::clone(&mode);
//!       thread::spawn(move || mode.get().is_ok())
//!    })
//!    .collect();
//! for handle in handles {
//!    assert!(handle.join().unwrap());
//! }
//! ```

/// Error types.
mod error;

/// Memoizing lazy value.
mod lazy;

/// Retrying lazy value.
mod retry;

/// Internal synchronization state management.
mod state;

/// Scoped structured logging facade.
#[cfg(feature = "logger")]
pub mod logger;

pub use error::{Aborted, LazyError};
pub use lazy::LazyValue;
pub use retry::RetryLazyValue;
