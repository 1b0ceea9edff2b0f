//! Kernel panic handling.
//!
//! A panic is an unrecoverable condition: a CPU exception other than a
//! resolvable page fault, a Rust-level invariant violation, or a fatal fault
//! reported by [`crate::debug`]. All roads here end with the processor
//! halted after printing the diagnostic.

use crate::{arch::x86, logger::LOGGER, println};
use core::panic::PanicInfo;

fn halt_forever() -> ! {
	loop {
		x86::halt();
	}
}

/// Prints the panic banner and halts. Shared by the Rust panic handler and
/// [`crate::debug::fatal_fault`]/[`crate::debug::fatal_exception`].
pub(crate) fn panic_impl(msg: &dyn core::fmt::Display) -> ! {
	x86::cli();
	LOGGER.lock().silent = false;
	println!("--- KERNEL PANIC ---");
	println!("{msg}");
	println!("--- halted ---");
	halt_forever()
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
	panic_impl(&info.message());
}
