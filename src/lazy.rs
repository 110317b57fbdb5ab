//! Memoized, fallible, single-flight lazy value.
//!
//! This module provides the [`LazyValue<T, E, F>`] type. It owns a computation
//! returning `Result<T, E>` and runs it the first time the value is requested.
//! The outcome, success or failure, is cached and every later caller receives
//! the same outcome by reference. A failure is never retried; use
//! [`RetryLazyValue`](crate::RetryLazyValue) for that policy.
//!
//! The fast path (outcome already published) is a single atomic load. The slow
//! path elects one executor through the gate in `state`, and parks every other
//! caller until the outcome is published.

use core::cell::UnsafeCell;
use core::fmt;
use core::mem;
use core::sync::atomic::Ordering;

use crate::error::{Aborted, LazyError};
use crate::state::{Entry, Gate, GateGuard, Unwind};

/// Storage of a lazy value. Only the executor may touch it before the gate is DONE.
enum Slot<T, E, F> {
   Pending(F),
   Computing,
   Done(Result<T, E>),
}

/// A value computed at most once, on first use, from a fallible computation.
///
/// Concurrent callers of [`get`](Self::get) are safe: exactly one of them runs
/// the computation while the rest block until the outcome is published. After
/// that, every call returns the cached outcome without blocking.
///
/// # Panics inside the computation
///
/// If the computation panics, the panic propagates to the caller that was
/// running it. The instance is then permanently aborted: every waiter and every
/// later caller receives [`Aborted`]. A computation that never returns blocks all
/// waiters forever.
///
/// Calling `get` on the same instance from inside its own computation deadlocks.
///
/// # Examples
///
/// ```rust
/// use lazy_value::LazyValue;
///
/// let answer: LazyValue<u32, String> = LazyValue::new(|| Ok(6 * 7));
/// assert_eq!(answer.get(), Ok(&42));
/// ```
pub struct LazyValue<T, E, F = fn() -> Result<T, E>> {
   slot: UnsafeCell<Slot<T, E, F>>,
   gate: Gate,
}

impl<T, E, F> LazyValue<T, E, F> {
   /// Creates a lazy value that will run `computation` on first use.
   ///
   /// No work is performed here.
   #[inline]
   #[must_use]
   pub const fn new(computation: F) -> Self {
      Self {
         slot: UnsafeCell::new(Slot::Pending(computation)),
         gate: Gate::new(),
      }
   }

   /// Creates a lazy value whose outcome is already known.
   #[inline]
   #[must_use]
   pub const fn with_outcome(outcome: Result<T, E>) -> Self {
      Self {
         slot: UnsafeCell::new(Slot::Done(outcome)),
         gate: Gate::done(),
      }
   }

   /// Checks if the outcome has been published.
   ///
   /// This method never blocks.
   #[inline]
   pub fn is_done(&self) -> bool {
      self.gate.is_done(Ordering::Acquire)
   }

   /// Checks if the computation panicked.
   ///
   /// This method never blocks.
   #[inline]
   pub fn is_aborted(&self) -> bool {
      self.gate.is_aborted(Ordering::Acquire)
   }

   /// Returns the cached outcome if it has been published.
   ///
   /// Returns `None` if the computation has not run, is running, or was aborted.
   /// This method never blocks and never runs the computation.
   #[inline]
   pub fn peek(&self) -> Option<&Result<T, E>> {
      if self.is_done() {
         // SAFETY: is_done() observed DONE with Acquire ordering.
         Some(unsafe { self.outcome_unchecked() })
      } else {
         None
      }
   }

   /// Like [`peek`](Self::peek), with the outcome split into value and failure.
   #[inline]
   pub fn try_get(&self) -> Option<Result<&T, &E>> {
      self.peek().map(Result::as_ref)
   }

   /// Consumes the lazy value, returning the outcome if it was computed.
   #[inline]
   pub fn into_outcome(self) -> Option<Result<T, E>> {
      match self.slot.into_inner() {
         Slot::Done(outcome) => Some(outcome),
         Slot::Pending(_) | Slot::Computing => None,
      }
   }

   /// Returns the outcome without checking the gate.
   ///
   /// # Safety
   ///
   /// The gate must have been observed DONE with `Acquire` ordering (or by the
   /// executor after committing).
   #[inline]
   unsafe fn outcome_unchecked(&self) -> &Result<T, E> {
      debug_assert!(self.is_done(), "outcome read before it was published");
      // SAFETY: The caller guarantees the slot holds `Done`, which is never written again.
      match unsafe { &*self.slot.get() } {
         Slot::Done(outcome) => outcome,
         Slot::Pending(_) | Slot::Computing => unreachable!("gate is DONE but slot is empty"),
      }
   }
}

impl<T, E, F> LazyValue<T, E, F>
where
   F: FnOnce() -> Result<T, E>,
{
   /// Returns the cached outcome, running the computation if nobody has yet.
   ///
   /// Blocks while another thread runs the computation. Returns `Err(Aborted)`
   /// if the computation panicked, here or in another thread.
   #[inline]
   pub fn force(&self) -> Result<&Result<T, E>, Aborted> {
      if let Some(outcome) = self.peek() {
         return Ok(outcome);
      }
      self.initialize()
   }

   /// Returns the cached value, running the computation if nobody has yet.
   ///
   /// - If the computation returned `Ok(value)`, returns `Ok(&value)`, now and forever.
   /// - If it returned `Err(e)`, returns `Err(LazyError::Failed(&e))`, now and forever.
   /// - If it panicked, returns `Err(LazyError::Aborted(_))`, now and forever.
   ///
   /// If multiple threads call this concurrently, the computation runs once.
   #[inline]
   pub fn get(&self) -> Result<&T, LazyError<'_, E>> {
      match self.force()? {
         Ok(value) => Ok(value),
         Err(err) => Err(LazyError::Failed(err)),
      }
   }

   /// Async version of [`force`](Self::force).
   ///
   /// The computation itself is synchronous. While another caller runs it, this
   /// future yields to the runtime instead of parking the worker thread.
   pub async fn force_async(&self) -> Result<&Result<T, E>, Aborted> {
      if let Some(outcome) = self.peek() {
         return Ok(outcome);
      }
      let entry = self.gate.lock_async(Unwind::Abort).await;
      self.enter(entry)
   }

   /// Async version of [`get`](Self::get).
   pub async fn get_async(&self) -> Result<&T, LazyError<'_, E>> {
      match self.force_async().await? {
         Ok(value) => Ok(value),
         Err(err) => Err(LazyError::Failed(err)),
      }
   }

   // --- Internal Initialization Helpers ---

   /// Cold path for `force`.
   #[cold]
   fn initialize(&self) -> Result<&Result<T, E>, Aborted> {
      self.enter(self.gate.lock(Unwind::Abort))
   }

   #[inline]
   fn enter(&self, entry: Entry<'_>) -> Result<&Result<T, E>, Aborted> {
      match entry {
         // SAFETY: lock_step observed DONE with Acquire ordering.
         Entry::Done => Ok(unsafe { self.outcome_unchecked() }),
         Entry::Aborted => Err(Aborted),
         Entry::Exec(guard) => Ok(self.execute(guard)),
      }
   }

   /// Runs the computation as the elected executor and publishes its outcome.
   fn execute(&self, guard: GateGuard<'_>) -> &Result<T, E> {
      let slot = self.slot.get();
      // SAFETY: Holding the guard gives exclusive access to the slot. No reader
      // touches it until the gate is DONE.
      let computation = match unsafe { mem::replace(&mut *slot, Slot::Computing) } {
         Slot::Pending(computation) => computation,
         Slot::Computing | Slot::Done(_) => {
            unreachable!("gate handed out the executor role twice")
         }
      };

      // A panic here drops the guard, which aborts the gate and wakes waiters.
      let outcome = computation();

      // SAFETY: Still exclusive, the gate is not published yet.
      unsafe { *slot = Slot::Done(outcome) };
      guard.commit();
      // SAFETY: We just published the outcome.
      unsafe { self.outcome_unchecked() }
   }
}

// --- Trait Implementations ---

// SAFETY:
// Shared references hand out `&T` and `&E` to any thread, so both must be `Sync`.
// The outcome is dropped by whichever thread drops the last owner, so both must
// be `Send`. The computation is moved out and called by whichever thread wins
// the election, so `F` must be `Send`; it is never shared, so it need not be `Sync`.
unsafe impl<T, E, F> Sync for LazyValue<T, E, F>
where
   T: Send + Sync,
   E: Send + Sync,
   F: Send,
{
}

fn ok_default<T: Default, E>() -> Result<T, E> {
   Ok(T::default())
}

impl<T: Default, E> Default for LazyValue<T, E> {
   /// Creates a lazy value computing `Ok(T::default())`.
   #[inline]
   fn default() -> Self {
      Self::new(ok_default::<T, E>)
   }
}

impl<T, E, F> From<Result<T, E>> for LazyValue<T, E, F> {
   /// Creates a lazy value that is already done with the given outcome.
   #[inline]
   fn from(outcome: Result<T, E>) -> Self {
      Self::with_outcome(outcome)
   }
}

impl<T: fmt::Debug, E: fmt::Debug, F> fmt::Debug for LazyValue<T, E, F> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("LazyValue");
      match self.peek() {
         Some(outcome) => d.field(outcome),
         None if self.is_aborted() => d.field(&format_args!("<aborted>")),
         None if self.gate.is_locked() => d.field(&format_args!("<computing>")),
         None => d.field(&format_args!("<uncomputed>")),
      };
      d.finish()
   }
}
