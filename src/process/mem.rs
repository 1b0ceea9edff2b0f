//! The page-fault path: the only kernel entry point that resolves a user
//! fault into something other than a fatal halt.

use crate::arch::x86::idt::{PF_PRESENT, PF_WRITE};
use crate::process::scheduler;

/// Handles a page fault at `addr` with the CPU's raw error code. Returns
/// `true` if the fault was a copy-on-write write that has now been resolved
/// and the faulting instruction can simply retry; `false` for every other
/// cause, which the caller treats as fatal.
pub fn handle_page_fault(addr: u32, err_code: u32) -> bool {
	if err_code & (PF_PRESENT | PF_WRITE) != (PF_PRESENT | PF_WRITE) {
		return false;
	}
	scheduler::with_current_space(|space| space.resolve_cow(addr)).unwrap_or(false)
}
