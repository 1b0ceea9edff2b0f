//! Fatal-condition diagnostics.
//!
//! Reached from the trap dispatcher in [`crate::arch::x86::idt`] whenever a
//! fault cannot be resolved: an unrecoverable page fault, or any CPU
//! exception other than the page fault. Both paths print the same set of
//! facts the spec requires — fault address, instruction pointer, error code,
//! offending process identity — then hand off to [`crate::panic`].

use crate::{panic::panic_impl, process, process::regs::Regs};
use core::fmt;

struct FaultReport<'a> {
	reason: &'a str,
	fault_addr: u32,
	frame: &'a Regs,
}

impl fmt::Display for FaultReport<'_> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let cp = process::scheduler::current();
		let (name, pid) = cp.as_ref().map(|p| (p.name(), p.pid())).unwrap_or(("<none>", 0));
		write!(
			f,
			"{}\nfault-address={:#010x} eip={:#010x} error-code={:#010x} process={} pid={}",
			self.reason, self.fault_addr, self.frame.eip, self.frame.err_code, name, pid
		)
	}
}

/// A page fault that the copy-on-write handler could not resolve.
pub fn fatal_fault(fault_addr: u32, frame: &Regs) -> ! {
	panic_impl(&FaultReport {
		reason: "unrecoverable page fault",
		fault_addr,
		frame,
	})
}

/// Any CPU exception other than a resolvable page fault.
pub fn fatal_exception(name: &str, frame: &Regs) -> ! {
	panic_impl(&FaultReport {
		reason: name,
		fault_addr: 0,
		frame,
	})
}
