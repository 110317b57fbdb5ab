//! Internal synchronization gate for lazy values.
//!
//! This module provides the one-shot gate used by both `LazyValue` and
//! `RetryLazyValue`. It implements a small state machine using atomic
//! operations and futex-based waiting via `parking_lot_core`.
//!
//! The state is packed into a single `AtomicU8` with the following layout:
//! - Bit 0: DONE - Outcome is published
//! - Bit 1: LOCKED - An executor is running the computation
//! - Bit 2: WAITING - At least one thread is parked on the gate
//! - Bit 3: ABORTED - The executor unwound without publishing an outcome
//! - Bits 4-7: EPOCH - Generation counter, bumped on every release of the lock
//!
//! Readers of a published outcome only perform an `Acquire` load; the executor
//! publishes with a `Release` swap, so the outcome written before the swap is
//! visible to every thread that observes DONE.

use core::mem;
use core::sync::atomic::{self, AtomicU8, Ordering};

use parking_lot_core::{DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN};

/// What happens to the gate when an executor's guard is dropped without `commit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Unwind {
   /// Enter ABORTED for good. Current and future callers observe `Entry::Aborted`.
   Abort,
   /// Return to the uninitialized state so the next caller becomes the executor.
   Reset,
}

/// Result of trying to enter the gate.
pub(crate) enum Entry<'a> {
   /// The outcome is published and may be read.
   Done,
   /// A previous executor unwound; nothing will ever be published.
   Aborted,
   /// The caller is the executor and must either commit or drop the guard.
   Exec(GateGuard<'a>),
}

/// Atomic one-shot gate.
#[repr(transparent)]
pub(crate) struct Gate(AtomicU8);

impl Gate {
   const DONE: u8 = 1;
   const LOCKED: u8 = 2;
   const WAITING: u8 = 4;
   const ABORTED: u8 = 8;
   const EPOCH_1: u8 = 16;
   const EPOCH_MASK: u8 = !(Self::DONE | Self::LOCKED | Self::WAITING | Self::ABORTED);

   #[inline(always)]
   const fn next_epoch(current_state: u8) -> u8 {
      (current_state & Self::EPOCH_MASK).wrapping_add(Self::EPOCH_1) & Self::EPOCH_MASK
   }

   /// Creates a gate that has not run its computation yet.
   #[inline]
   pub(crate) const fn new() -> Self {
      Self(AtomicU8::new(0))
   }

   /// Creates a gate whose outcome is already published.
   #[inline]
   pub(crate) const fn done() -> Self {
      Self(AtomicU8::new(Self::DONE))
   }

   /// Wakes every thread parked on this gate.
   #[inline]
   fn notify_all(&self) {
      // SAFETY: The key passed to unpark must match the key used for park.
      // Both use the address of the inner AtomicU8.
      unsafe {
         parking_lot_core::unpark_all(self.0.as_ptr() as usize, DEFAULT_UNPARK_TOKEN);
      }
   }

   /// Parks the current thread while the state still equals `expected_state`.
   #[inline]
   fn wait(&self, expected_state: u8) {
      // SAFETY: See `notify_all`.
      unsafe {
         // The validate closure runs under the bucket lock, so a wake between
         // our last load and the sleep cannot be lost.
         let _ = parking_lot_core::park(
            self.0.as_ptr() as usize,
            || self.0.load(atomic::Ordering::Relaxed) == expected_state,
            || {},
            |_, _| {},
            DEFAULT_PARK_TOKEN,
            None,
         );
      }
   }

   /// Replaces the state with `flags | next epoch` and wakes waiters if any were parked.
   /// Returns the previous state.
   #[inline]
   fn release_with(&self, flags: u8) -> u8 {
      let current_state = self.0.load(Ordering::Relaxed);
      let new_state = flags | Self::next_epoch(current_state);

      // Release pairs with the Acquire loads in `lock_step` and `is_done`: every
      // write to the slot made by the executor happens-before this store is seen.
      let prev_state = self.0.swap(new_state, Ordering::Release);
      if prev_state & Self::WAITING != 0 {
         self.notify_all();
      }
      prev_state
   }

   /// Publishes the outcome. Returns `true` if the gate was not already DONE.
   #[inline]
   pub(crate) fn set_done(&self) -> bool {
      self.release_with(Self::DONE) & Self::DONE == 0
   }

   /// Clears DONE and LOCKED so the next caller becomes the executor.
   #[inline]
   pub(crate) fn set_uninit(&self) {
      self.release_with(0);
   }

   /// Marks the gate as permanently aborted.
   #[inline]
   pub(crate) fn set_aborted(&self) {
      self.release_with(Self::ABORTED);
   }

   #[inline]
   pub(crate) fn is_done(&self, ordering: Ordering) -> bool {
      self.0.load(ordering) & Self::DONE != 0
   }

   #[inline]
   pub(crate) fn is_aborted(&self, ordering: Ordering) -> bool {
      self.0.load(ordering) & Self::ABORTED != 0
   }

   /// Whether an executor currently holds the gate.
   #[inline]
   pub(crate) fn is_locked(&self) -> bool {
      self.0.load(Ordering::Relaxed) & Self::LOCKED != 0
   }

   /// Single attempt at entering the gate.
   ///
   /// Returns `Ok(entry)` when the caller may proceed, or `Err(state)` when the
   /// gate is held by another executor. The returned state already has WAITING
   /// set, so it is safe to pass to `wait`.
   #[inline]
   fn lock_step(&self, unwind: Unwind) -> Result<Entry<'_>, u8> {
      loop {
         let current_state = self.0.load(Ordering::Acquire);
         if current_state & Self::DONE != 0 {
            return Ok(Entry::Done);
         }
         if current_state & Self::ABORTED != 0 {
            return Ok(Entry::Aborted);
         }

         if current_state & Self::LOCKED == 0 {
            match self.0.compare_exchange_weak(
               current_state,
               current_state | Self::LOCKED,
               Ordering::Acquire,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Ok(Entry::Exec(GateGuard::new(self, unwind))),
               Err(_) => {
                  std::hint::spin_loop();
                  continue;
               }
            }
         }

         if current_state & Self::WAITING == 0 {
            let new_state = current_state | Self::WAITING;
            match self.0.compare_exchange_weak(
               current_state,
               new_state,
               Ordering::Relaxed,
               Ordering::Relaxed,
            ) {
               Ok(_) => return Err(new_state),
               Err(_) => {
                  std::hint::spin_loop();
                  continue;
               }
            }
         }
         return Err(current_state);
      }
   }

   /// Enters the gate, parking the thread while another executor runs.
   #[inline]
   pub(crate) fn lock(&self, unwind: Unwind) -> Entry<'_> {
      loop {
         match self.lock_step(unwind) {
            Ok(entry) => return entry,
            Err(state) => self.wait(state),
         }
      }
   }

   /// Enters the gate from an async context.
   ///
   /// Yields to the runtime first and only falls back to a blocking park
   /// (inside `block_in_place`) on the multi-threaded runtime.
   #[inline]
   pub(crate) async fn lock_async(&self, unwind: Unwind) -> Entry<'_> {
      #[allow(clippy::never_loop)]
      loop {
         for _ in 0..16 {
            match self.lock_step(unwind) {
               Ok(entry) => return entry,
               Err(state) => {
                  for _ in 0..32 {
                     #[cfg(any(feature = "async-tokio", feature = "async-tokio-mt"))]
                     tokio::task::yield_now().await;
                     if self.0.load(Ordering::Relaxed) != state {
                        break;
                     }
                  }
               }
            }
         }

         #[cfg(feature = "async-tokio-mt")]
         {
            return match self.lock_step(unwind) {
               Ok(entry) => entry,
               Err(state) => tokio::task::block_in_place(|| {
                  self.wait(state);
                  self.lock(unwind)
               }),
            };
         }
      }
   }
}

/// RAII guard held by the executor.
///
/// `commit` publishes the outcome. Dropping the guard instead applies its
/// `Unwind` policy, which is how a panicking computation releases waiters.
pub(crate) struct GateGuard<'a> {
   gate: &'a Gate,
   unwind: Unwind,
}

impl<'a> GateGuard<'a> {
   #[inline(always)]
   const fn new(gate: &'a Gate, unwind: Unwind) -> Self {
      Self { gate, unwind }
   }

   /// Marks the outcome as published, consumes the guard and wakes waiters.
   #[inline(always)]
   pub(crate) fn commit(self) -> bool {
      let published = self.gate.set_done();
      mem::forget(self);
      published
   }
}

impl Drop for GateGuard<'_> {
   #[inline(always)]
   fn drop(&mut self) {
      match self.unwind {
         Unwind::Abort => self.gate.set_aborted(),
         Unwind::Reset => self.gate.set_uninit(),
      }
   }
}
