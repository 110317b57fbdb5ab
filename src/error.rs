//! Error types returned by lazy values.

use core::fmt;

use thiserror::Error;

/// The computation of a [`LazyValue`](crate::LazyValue) panicked.
///
/// The panic itself is propagated to the caller that was running the
/// computation. Every other caller, including ones that arrive later, gets
/// this error instead, since the computation was consumed and cannot run again.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
#[error("lazy computation panicked before producing a result")]
pub struct Aborted;

/// Error returned by [`LazyValue::get`](crate::LazyValue::get).
///
/// `Display` and `Error` are only available when `E: Display`; the enum itself
/// carries no bound so that any failure type can be cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LazyError<'a, E> {
   /// The computation ran and returned this failure. It is cached and handed
   /// back to every caller.
   Failed(&'a E),
   /// The computation panicked.
   Aborted(Aborted),
}

impl<'a, E> LazyError<'a, E> {
   /// Returns the cached failure, or `None` if the computation was aborted.
   #[inline]
   pub fn failure(&self) -> Option<&'a E> {
      match *self {
         Self::Failed(err) => Some(err),
         Self::Aborted(_) => None,
      }
   }

   /// Checks if the computation panicked rather than returning a failure.
   #[inline]
   pub fn is_aborted(&self) -> bool {
      matches!(self, Self::Aborted(_))
   }
}

impl<E> From<Aborted> for LazyError<'_, E> {
   #[inline]
   fn from(aborted: Aborted) -> Self {
      Self::Aborted(aborted)
   }
}

impl<E: fmt::Display> fmt::Display for LazyError<'_, E> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self {
         Self::Failed(err) => write!(f, "lazy computation failed: {}", err),
         Self::Aborted(aborted) => fmt::Display::fmt(aborted, f),
      }
   }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for LazyError<'_, E> {
   fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
      match self {
         Self::Failed(_) => None,
         Self::Aborted(aborted) => Some(aborted),
      }
   }
}
