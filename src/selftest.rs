//! The in-kernel self-test harness.
//!
//! Feeds `#[test_case]` functions scattered across `#[cfg(test)] mod test`
//! blocks to [`runner`] via `#![test_runner]`. There is no way to reset the
//! kernel between tests, so each test is expected to leave global state
//! (the PFA, the heap, the process table) as it found it.

use core::any::type_name;

/// A single self-test.
pub trait Testable {
	fn run(&self);
}

impl<T: Fn()> Testable for T {
	fn run(&self) {
		crate::print!("test {} ... ", type_name::<T>());
		self();
		crate::println!("ok");
	}
}

/// Runs every collected test, invoked by the `custom_test_frameworks`
/// harness built from `#[cfg(test)]`.
pub fn runner(tests: &[&dyn Testable]) {
	crate::println!("running {} tests", tests.len());
	for test in tests {
		test.run();
	}
	crate::println!("test result: ok. {} passed", tests.len());
}

/// Runs the full self-test suite outside of the `#[cfg(test)]` harness. Built
/// only under the `selftest` cargo feature; callers additionally gate the
/// call on the `-selftest` boot flag, so a `selftest`-enabled image can still
/// boot straight to the scheduler without a matching cmdline flag.
#[cfg(feature = "selftest")]
pub fn run_all() {
	crate::memory::pfa::selftest();
	crate::memory::vmem::selftest();
	crate::memory::malloc::selftest();
	crate::file::vfs::selftest();
	crate::println!("selftest: all checks passed");
}
