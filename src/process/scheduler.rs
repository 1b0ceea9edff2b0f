//! The timer-driven round-robin scheduling policy and the context-switch
//! glue that carries it out.
//!
//! Everything above [`switch_to`] sees only [`yield_now`], [`tick`] and
//! [`block_current`] as opaque operations; `switch_to` is the one place
//! that reaches into [`crate::arch::x86::context_switch`], per the design
//! note that the raw register discipline should stay in a narrow,
//! well-audited unit.

use super::{Pid, Process, Space, State, MAX_PROCS, TABLE};
use crate::arch::x86::gdt;
use alloc::boxed::Box;
use alloc::string::String;
use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Index into [`TABLE`] of the slot currently RUNNING.
static CURRENT_SLOT: AtomicUsize = AtomicUsize::new(0);
/// Ticks elapsed since the scheduler started.
static TICKS: AtomicU64 = AtomicU64::new(0);

/// Records `slot` as RUNNING. Called once at boot to seed the table's first
/// entry and after every successful switch.
pub fn set_current_slot(slot: usize) {
	CURRENT_SLOT.store(slot, Ordering::Release);
}

/// The table slot of the RUNNING process.
pub fn current_slot() -> usize {
	CURRENT_SLOT.load(Ordering::Acquire)
}

/// The pid of the RUNNING process, given a locked view of the table.
pub fn current_pid_locked(table: &[Option<Box<Process>>; MAX_PROCS]) -> Pid {
	table[current_slot()].as_ref().map(|p| p.pid).unwrap_or(0)
}

/// Ticks elapsed since boot.
pub fn ticks() -> u64 {
	TICKS.load(Ordering::Relaxed)
}

/// `ceil(ms / tick_period)`, per the sleep contract in §4.4: the `+1`-like
/// rounding ensures a sleep never wakes early.
pub fn ms_to_ticks(ms: u32) -> u64 {
	let period = 1000 / crate::arch::x86::pit::TICK_HZ;
	(ms as u64).div_ceil(period as u64).max(1)
}

/// A small, self-contained snapshot of the running process's identity, for
/// diagnostics that must not hold the process-table lock across formatting.
pub struct CurrentProc {
	name: String,
	pid: Pid,
}

impl CurrentProc {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn pid(&self) -> Pid {
		self.pid
	}
}

/// The RUNNING process's name and pid, if the table has been initialized.
pub fn current() -> Option<CurrentProc> {
	let table = TABLE.lock();
	table[current_slot()].as_ref().map(|p| CurrentProc {
		name: p.name.clone(),
		pid: p.pid,
	})
}

/// Sets the RUNNING process's state, used by `wait`/`sleep` to suspend
/// themselves before yielding.
pub fn block_current(state: State) {
	let mut table = TABLE.lock();
	let slot = current_slot();
	if let Some(p) = table[slot].as_mut() {
		p.state = state;
	}
}

/// Runs `f` with the current process's owned address space, if it has one
/// (pure-kernel tasks alias the kernel template and have none to mutate).
/// Used by the page-fault handler to resolve copy-on-write.
pub fn with_current_space<R>(f: impl FnOnce(&mut crate::memory::vmem::AddressSpace) -> R) -> Option<R> {
	let mut table = TABLE.lock();
	let slot = current_slot();
	match &mut table[slot].as_mut()?.space {
		Space::Owned(space) => Some(f(space)),
		Space::Kernel => None,
	}
}

/// Finds the next READY slot after `from`, scanning forward and wrapping
/// once, per the preemption contract in §4.4.
fn next_ready(table: &[Option<Box<Process>>; MAX_PROCS], from: usize) -> Option<usize> {
	for i in 1..=MAX_PROCS {
		let idx = (from + i) % MAX_PROCS;
		if let Some(p) = &table[idx] {
			if p.state == State::Ready {
				return Some(idx);
			}
		}
	}
	None
}

/// The timer tick handler: promotes expired sleepers, then attempts
/// preemption. Called from `irq_handler_rs` with interrupts already
/// disabled by the ISR entry stub.
pub fn tick() {
	let now = TICKS.fetch_add(1, Ordering::Relaxed) + 1;
	let switch = {
		let mut table = TABLE.lock();
		for p in table.iter_mut().flatten() {
			if p.state == State::Sleeping && p.sleep_until <= now {
				p.state = State::Ready;
			}
		}
		let cur = current_slot();
		let Some(new_slot) = next_ready(&table, cur) else {
			return;
		};
		if let Some(p) = table[cur].as_mut() {
			if p.state == State::Running {
				p.state = State::Ready;
			}
		}
		table[new_slot].as_mut().unwrap().state = State::Running;
		(cur, new_slot)
	};
	switch_to(switch.0, switch.1);
}

/// Voluntarily gives up the CPU. Picks the next READY process the same way
/// [`tick`] does; if none is READY and the caller is still RUNNING, returns
/// immediately. If the caller is no longer runnable (it just became a
/// zombie, blocked, or went to sleep) and nobody else is READY yet, this
/// halts and retries rather than returning, since the caller's contract
/// (`exit`, `wait`, `sleep`) requires never resuming here.
pub fn yield_now() {
	loop {
		let switch = {
			let mut table = TABLE.lock();
			let cur = current_slot();
			next_ready(&table, cur).map(|new_slot| {
				table[new_slot].as_mut().unwrap().state = State::Running;
				(cur, new_slot)
			})
		};
		match switch {
			Some((old, new)) => {
				switch_to(old, new);
				return;
			}
			None => {
				let still_running = {
					let table = TABLE.lock();
					table[current_slot()].as_ref().map(|p| p.state == State::Running).unwrap_or(false)
				};
				if still_running {
					return;
				}
				crate::arch::x86::halt();
			}
		}
	}
}

/// Switches execution from `old_slot` to `new_slot`: reprograms the TSS's
/// kernel-stack pointer, activates the new address space, then swaps saved
/// kernel stack pointers via [`crate::arch::x86::context_switch`].
///
/// # Panics
///
/// Panics if either slot is empty; callers only ever pass slots they just
/// observed occupied while holding the table lock.
fn switch_to(old_slot: usize, new_slot: usize) {
	set_current_slot(new_slot);
	let (old_ksp_ptr, new_ksp, new_cr3, kstack_top) = {
		let mut table = TABLE.lock();
		let new_proc = table[new_slot].as_ref().expect("switch target must be occupied");
		let new_cr3 = new_proc.space.cr3();
		let kstack_top = new_proc.kstack_top();
		let new_ksp = new_proc.ksp;
		let old = table[old_slot].as_mut().expect("switch source must be occupied");
		let old_ksp_ptr = &mut old.ksp as *mut u32;
		(old_ksp_ptr, new_ksp, new_cr3, kstack_top)
	};
	gdt::set_kernel_stack(kstack_top);
	unsafe {
		crate::arch::x86::write_cr3(new_cr3);
		crate::arch::x86::context_switch(old_ksp_ptr, new_ksp);
	}
}

/// Builds the saved-context region for a forked child's first resumption:
/// four zeroed callee-saved registers followed by a return address of
/// [`crate::arch::x86::fork_trampoline`], landing exactly below the copied
/// `Regs` frame at `regs_addr` so the trampoline's tail (`pop` the segment
/// registers, `popa`, `iret`) finds what it expects.
pub fn seed_fork_stack(regs_addr: u32) -> u32 {
	let mut sp = regs_addr;
	sp -= 4;
	unsafe {
		*(sp as *mut u32) = crate::arch::x86::fork_trampoline as usize as u32;
	}
	sp -= 16;
	unsafe {
		core::ptr::write_bytes(sp as *mut u8, 0, 16);
	}
	sp
}

/// The idle loop the boot thread falls into once the process table and
/// interrupts are live: it halts between timer ticks, relying on [`tick`]
/// to preempt it into any process that becomes READY.
pub fn run() -> ! {
	loop {
		crate::arch::x86::halt();
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test_case]
	fn ms_to_ticks_rounds_up_and_never_zero() {
		assert_eq!(ms_to_ticks(0), 1);
		assert_eq!(ms_to_ticks(10), 1);
		assert_eq!(ms_to_ticks(11), 2);
		assert_eq!(ms_to_ticks(30), 3);
	}
}
