//! Mutually exclusive access primitive based on a spinlock.
//!
//! A [`Spin`] protects its wrapped data from concurrent access. On a
//! uniprocessor, "concurrent access" never comes from another core: it comes
//! from an interrupt handler running on top of code that is already holding
//! the lock. The `INT` generic parameter controls whether interrupts stay
//! enabled while the lock is held; [`IntMutex`] is the `INT = false`
//! specialization used for state the timer tick handler also touches.

use crate::arch::x86::{cli, interrupts_enabled, sti};
use core::{
	cell::UnsafeCell,
	fmt,
	fmt::Formatter,
	hint,
	ops::{Deref, DerefMut},
	sync::atomic::{AtomicBool, Ordering::Acquire, Ordering::Release},
};

#[inline(always)]
fn raw_lock(lock: &AtomicBool) {
	while lock.swap(true, Acquire) {
		hint::spin_loop();
	}
}

/// Releases the associated [`Spin`] when dropped.
pub struct SpinGuard<'s, T: ?Sized, const INT: bool> {
	spin: &'s Spin<T, INT>,
	/// The interrupt state observed right before locking, restored on unlock.
	/// Only meaningful when `INT == false`.
	int_state: bool,
}

impl<T: ?Sized, const INT: bool> Deref for SpinGuard<'_, T, INT> {
	type Target = T;

	fn deref(&self) -> &Self::Target {
		unsafe { &*self.spin.data.get() }
	}
}

impl<T: ?Sized, const INT: bool> DerefMut for SpinGuard<'_, T, INT> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		unsafe { &mut *self.spin.data.get() }
	}
}

impl<T: ?Sized + fmt::Debug, const INT: bool> fmt::Debug for SpinGuard<'_, T, INT> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(self.deref(), f)
	}
}

impl<T: ?Sized, const INT: bool> Drop for SpinGuard<'_, T, INT> {
	fn drop(&mut self) {
		unsafe {
			self.spin.unlock(self.int_state);
		}
	}
}

/// A value accessed from at most one context at a time.
///
/// When `INT` is `false`, interrupts are disabled for the lifetime of the
/// guard, which is required for state that the timer interrupt handler also
/// accesses (the process table, the scheduler's run queue).
pub struct Spin<T: ?Sized, const INT: bool = true> {
	locked: AtomicBool,
	data: UnsafeCell<T>,
}

unsafe impl<T: ?Sized + Send, const INT: bool> Sync for Spin<T, INT> {}
unsafe impl<T: ?Sized + Send, const INT: bool> Send for Spin<T, INT> {}

impl<T, const INT: bool> Spin<T, INT> {
	/// Creates a new instance wrapping `data`.
	pub const fn new(data: T) -> Self {
		Self {
			locked: AtomicBool::new(false),
			data: UnsafeCell::new(data),
		}
	}
}

impl<T: Default, const INT: bool> Default for Spin<T, INT> {
	fn default() -> Self {
		Self::new(Default::default())
	}
}

impl<T: ?Sized, const INT: bool> Spin<T, INT> {
	/// Acquires the lock, spinning until it becomes available.
	pub fn lock(&self) -> SpinGuard<'_, T, INT> {
		let int_state = if !INT {
			let state = interrupts_enabled();
			cli();
			state
		} else {
			false
		};
		raw_lock(&self.locked);
		SpinGuard {
			spin: self,
			int_state,
		}
	}

	unsafe fn unlock(&self, int_state: bool) {
		self.locked.store(false, Release);
		if !INT && int_state {
			sti();
		}
	}
}

/// A spinlock that disables interrupts while held.
///
/// Use for any table the timer tick handler mutates directly: the process
/// table, the run queue, the physical frame allocator's bitmap, the heap
/// free list.
pub type IntMutex<T> = Spin<T, false>;

/// A spinlock that leaves interrupts enabled while held.
pub type Mutex<T> = Spin<T, true>;
