//! Lazy value that retries its computation until it succeeds.
//!
//! [`RetryLazyValue<T, E, F>`] keeps its computation for as long as it has not
//! produced a value. A failed attempt hands the error to the caller that ran it
//! and reopens the gate, so the next caller (or a parked waiter) runs the
//! computation again. Once an attempt succeeds the value is cached forever.
//!
//! Attempts are still single-flight: at most one thread runs the computation at
//! any moment.

use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::sync::atomic::Ordering;
use core::{fmt, mem, ptr};

use crate::state::{Entry, Gate, GateGuard, Unwind};

/// A value computed on first use, retrying the computation after each failure.
///
/// Unlike [`LazyValue`](crate::LazyValue), failures are not cached. A panic in
/// the computation propagates to the caller running it and leaves the value
/// uncomputed, so the next caller tries again.
///
/// # Examples
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// use lazy_value::RetryLazyValue;
///
/// let attempts = AtomicUsize::new(0);
/// let value = RetryLazyValue::new(|| {
///    if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
///       Err("not yet")
///    } else {
///       Ok(7)
///    }
/// });
///
/// assert_eq!(value.get(), Err("not yet"));
/// assert_eq!(value.get(), Ok(&7));
/// assert_eq!(value.get(), Ok(&7));
/// assert_eq!(attempts.load(Ordering::SeqCst), 2);
/// ```
pub struct RetryLazyValue<T, E, F = fn() -> Result<T, E>> {
   computation: F,
   value: UnsafeCell<mem::MaybeUninit<T>>,
   gate: Gate,
   _error: PhantomData<fn() -> E>,
}

impl<T, E, F> RetryLazyValue<T, E, F> {
   /// Creates a retrying lazy value that will run `computation` on first use.
   #[inline]
   #[must_use]
   pub const fn new(computation: F) -> Self {
      Self {
         computation,
         value: UnsafeCell::new(mem::MaybeUninit::uninit()),
         gate: Gate::new(),
         _error: PhantomData,
      }
   }

   /// Checks if a value has been computed.
   ///
   /// This method never blocks.
   #[inline]
   pub fn is_done(&self) -> bool {
      self.gate.is_done(Ordering::Acquire)
   }

   /// Returns the value if it has been computed.
   ///
   /// This method never blocks and never runs the computation.
   #[inline]
   pub fn try_get(&self) -> Option<&T> {
      if self.is_done() {
         // SAFETY: is_done() observed DONE with Acquire ordering.
         Some(unsafe { self.get_unchecked() })
      } else {
         None
      }
   }

   /// Consumes the lazy value, returning the value if it was computed.
   #[inline]
   pub fn into_value(self) -> Option<T> {
      let mut this = mem::ManuallyDrop::new(self);
      // SAFETY: `this` is never used or dropped again, so the computation is
      // read out exactly once.
      drop(unsafe { ptr::read(&this.computation) });
      if this.gate.is_done(Ordering::Relaxed) {
         // SAFETY: The value is initialized and we own it exclusively.
         Some(unsafe { this.value.get_mut().assume_init_read() })
      } else {
         None
      }
   }

   /// # Safety
   ///
   /// The gate must have been observed DONE with `Acquire` ordering.
   #[inline]
   unsafe fn get_unchecked(&self) -> &T {
      debug_assert!(self.is_done(), "value read before it was published");
      // SAFETY: The caller guarantees that the value is initialized.
      unsafe { (*self.value.get()).assume_init_ref() }
   }
}

impl<T, E, F> RetryLazyValue<T, E, F>
where
   F: Fn() -> Result<T, E>,
{
   /// Returns the value, running the computation if no attempt has succeeded yet.
   ///
   /// - If a value is cached, returns `Ok(&value)`.
   /// - Otherwise runs the computation (or waits for the thread running it):
   ///     - On `Ok(value)`, caches it and returns `Ok(&value)`.
   ///     - On `Err(e)`, returns `Err(e)` and leaves the value uncomputed.
   ///
   /// A waiter released by a failed attempt becomes the next executor, so under
   /// contention a single `get` call never sees another caller's error.
   #[inline]
   pub fn get(&self) -> Result<&T, E> {
      if let Some(value) = self.try_get() {
         return Ok(value);
      }
      self.try_initialize()
   }

   /// Async version of [`get`](Self::get).
   pub async fn get_async(&self) -> Result<&T, E> {
      if let Some(value) = self.try_get() {
         return Ok(value);
      }
      let entry = self.gate.lock_async(Unwind::Reset).await;
      self.enter(entry)
   }

   // --- Internal Initialization Helpers ---

   /// Cold path for `get`.
   #[cold]
   fn try_initialize(&self) -> Result<&T, E> {
      self.enter(self.gate.lock(Unwind::Reset))
   }

   #[inline]
   fn enter(&self, entry: Entry<'_>) -> Result<&T, E> {
      match entry {
         // SAFETY: lock_step observed DONE with Acquire ordering.
         Entry::Done => Ok(unsafe { self.get_unchecked() }),
         Entry::Aborted => unreachable!("retrying gate is never aborted"),
         Entry::Exec(guard) => self.attempt(guard),
      }
   }

   fn attempt(&self, guard: GateGuard<'_>) -> Result<&T, E> {
      // On error or panic the guard is dropped, which reopens the gate.
      let value = (self.computation)()?;
      // SAFETY: We hold the guard, exclusive access to initialize the value.
      unsafe { (*self.value.get()).write(value) };
      guard.commit();
      // SAFETY: We just published the value.
      Ok(unsafe { self.get_unchecked() })
   }
}

// --- Trait Implementations ---

// SAFETY:
// `&T` is handed to any thread, so `T: Sync`; the value may be dropped on a
// different thread than the one that computed it, so `T: Send`. The computation
// is only called while holding the gate, one thread at a time, so `F: Send` is
// enough, as with a mutex. Errors never cross threads: each is returned to the
// caller that produced it.
unsafe impl<T, E, F> Sync for RetryLazyValue<T, E, F>
where
   T: Send + Sync,
   F: Send,
{
}

impl<T: fmt::Debug, E, F> fmt::Debug for RetryLazyValue<T, E, F> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("RetryLazyValue");
      match self.try_get() {
         Some(v) => d.field(v),
         None => d.field(&format_args!("<uncomputed>")),
      };
      d.finish()
   }
}

impl<T, E, F> Drop for RetryLazyValue<T, E, F> {
   #[inline]
   fn drop(&mut self) {
      if self.gate.is_done(Ordering::Relaxed) {
         // SAFETY: We have exclusive access and the value is initialized.
         unsafe { self.value.get_mut().assume_init_drop() };
      }
   }
}
