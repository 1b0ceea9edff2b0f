//! The process table: fixed-capacity process records, fork, wait, exit,
//! sleep and kill. The timer-driven round-robin policy itself lives in
//! [`scheduler`]; this module owns the table those decisions act on.

pub mod mem;
pub mod regs;
pub mod scheduler;
pub mod signal;

use crate::config::{KERNEL_STACK_SIZE, MAX_FDS, MAX_PROCS, NAME_MAX};
use crate::errno::{Errno, EBADF, ECHILD, EMFILE, ESRCH};
use crate::file::open_file::OpenFile;
use crate::memory::vmem::AddressSpace;
use crate::process::regs::Regs;
use crate::sync::spin::{IntMutex, Mutex};
use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;

/// A process identifier. Always positive; `0` never names a real process.
pub type Pid = i32;

/// A process's scheduling state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
	Unused,
	Running,
	Ready,
	Blocked,
	Sleeping,
	Zombie,
}

/// A process's address space: either the shared kernel template, for
/// pure-kernel tasks, or a space this process owns outright.
pub(crate) enum Space {
	Kernel,
	Owned(AddressSpace),
}

impl Space {
	fn cr3(&self) -> u32 {
		match self {
			Space::Kernel => crate::memory::vmem::kernel_cr3(),
			Space::Owned(s) => s.cr3(),
		}
	}
}

/// One process table record.
pub struct Process {
	pid: Pid,
	ppid: Pid,
	state: State,
	/// Saved kernel stack pointer; valid only while not RUNNING.
	ksp: u32,
	kstack: Box<[u8]>,
	space: Space,
	fds: [Option<Arc<Mutex<OpenFile>>>; MAX_FDS],
	exit_code: i32,
	sleep_until: u64,
	pending_signals: u32,
	signal_mask: u32,
	handlers: [u32; 32],
	name: String,
	cwd: String,
}

impl Process {
	pub fn pid(&self) -> Pid {
		self.pid
	}

	pub fn ppid(&self) -> Pid {
		self.ppid
	}

	pub fn state(&self) -> State {
		self.state
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn cwd(&self) -> &str {
		&self.cwd
	}

	pub fn set_cwd(&mut self, cwd: &str) {
		self.cwd = String::from(&cwd[..cwd.len().min(NAME_MAX)]);
	}

	/// Returns the file descriptor table slot for `fd`, if any.
	pub fn fd(&self, fd: usize) -> Option<&Arc<Mutex<OpenFile>>> {
		self.fds.get(fd)?.as_ref()
	}

	/// Installs `file` at the lowest unused descriptor slot, returning its
	/// number, or `None` if the table is full.
	pub fn install_fd(&mut self, file: Arc<Mutex<OpenFile>>) -> Option<usize> {
		let slot = self.fds.iter().position(|f| f.is_none())?;
		self.fds[slot] = Some(file);
		Some(slot)
	}

	/// Installs `file` at exactly `fd`, closing whatever occupied that slot.
	pub fn install_fd_at(&mut self, fd: usize, file: Arc<Mutex<OpenFile>>) -> bool {
		if fd >= MAX_FDS {
			return false;
		}
		self.fds[fd] = Some(file);
		true
	}

	/// Drops the descriptor at `fd`, releasing the open-file reference.
	pub fn close_fd(&mut self, fd: usize) -> bool {
		if fd >= MAX_FDS || self.fds[fd].is_none() {
			return false;
		}
		self.fds[fd] = None;
		true
	}

	fn kstack_top(&self) -> u32 {
		self.kstack.as_ptr() as u32 + self.kstack.len() as u32
	}

	/// Signals pending delivery, already masked by [`Process::signal_mask`].
	pub fn deliverable_signals(&self) -> u32 {
		self.pending_signals & !self.signal_mask
	}

	/// The handler address installed for `sig`, or `0` (default action) if
	/// none was set.
	pub fn handler(&self, sig: u32) -> u32 {
		self.handlers.get((sig & 31) as usize).copied().unwrap_or(0)
	}

	/// Installs `handler` as `sig`'s action, returning the previous one.
	pub fn set_handler(&mut self, sig: u32, handler: u32) -> u32 {
		let slot = &mut self.handlers[(sig & 31) as usize];
		core::mem::replace(slot, handler)
	}

	/// Replaces the blocked-signal mask, returning the previous one.
	pub fn set_signal_mask(&mut self, mask: u32) -> u32 {
		core::mem::replace(&mut self.signal_mask, mask)
	}

	/// Clears `sig`'s bit in the pending mask, e.g. once a placeholder
	/// delivery has observed it.
	pub fn clear_pending(&mut self, sig: u32) {
		self.pending_signals &= !signal::bit(sig);
	}
}

const NO_PROCESS: Option<Box<Process>> = None;
static TABLE: IntMutex<[Option<Box<Process>>; MAX_PROCS]> = IntMutex::new([NO_PROCESS; MAX_PROCS]);

fn alloc_pid() -> Pid {
	use core::sync::atomic::{AtomicI32, Ordering};
	static NEXT: AtomicI32 = AtomicI32::new(1);
	NEXT.fetch_add(1, Ordering::Relaxed)
}

/// Builds the initial kernel stack for a thread that has never run: the
/// next context restore pops callee-saved registers (zeroed) and returns
/// to `entry`.
fn seed_kernel_stack(kstack: &mut [u8], entry: u32) -> u32 {
	let top = kstack.as_mut_ptr() as u32 + kstack.len() as u32;
	let mut sp = top;
	sp -= 4;
	unsafe {
		*(sp as *mut u32) = entry;
	}
	sp -= 16; // edi, esi, ebx, ebp, popped by context_switch on first resume
	unsafe {
		core::ptr::write_bytes(sp as *mut u8, 0, 16);
	}
	sp
}

/// Initializes the process table and installs the boot thread (pid 1,
/// kernel space, the thread that called this function) as RUNNING.
pub fn init() {
	let mut table = TABLE.lock();
	table[0] = Some(Box::new(Process {
		pid: 1,
		ppid: 0,
		state: State::Running,
		ksp: 0,
		kstack: Box::new([0u8; KERNEL_STACK_SIZE]),
		space: Space::Kernel,
		fds: core::array::from_fn(|_| None),
		exit_code: 0,
		sleep_until: 0,
		pending_signals: 0,
		signal_mask: 0,
		handlers: [0; 32],
		name: String::from("init"),
		cwd: String::from("/"),
	}));
	scheduler::set_current_slot(0);
}

fn find_free_slot(table: &[Option<Box<Process>>; MAX_PROCS]) -> Option<usize> {
	table.iter().position(|p| p.is_none())
}

/// Spawns a kernel thread at `entry`, sharing the kernel address space.
/// Returns its pid, or `None` if the table is full.
pub fn spawn_kernel_thread(entry: extern "C" fn() -> !, name: &str) -> Option<Pid> {
	let mut table = TABLE.lock();
	let slot = find_free_slot(&table)?;
	let pid = alloc_pid();
	let parent = scheduler::current_pid_locked(&table);
	let mut kstack = Box::new([0u8; KERNEL_STACK_SIZE]) as Box<[u8]>;
	let ksp = seed_kernel_stack(&mut kstack, entry as usize as u32);
	table[slot] = Some(Box::new(Process {
		pid,
		ppid: parent,
		state: State::Ready,
		ksp,
		kstack,
		space: Space::Kernel,
		fds: core::array::from_fn(|_| None),
		exit_code: 0,
		sleep_until: 0,
		pending_signals: 0,
		signal_mask: 0,
		handlers: [0; 32],
		name: String::from(name),
		cwd: String::from("/"),
	}));
	Some(pid)
}

/// Clones the current process: address space via copy-on-write, file
/// descriptor table by reference (bumping each open file's refcount), and a
/// fresh kernel stack seeded so the child's first resumption lands it back
/// in the syscall return path with `eax = 0`. `frame` is the interrupted
/// syscall's register frame, captured by the `int 0x80` entry stub; the
/// parent's own `eax` is set to the child's pid by the caller in
/// `syscall::process::sys_fork`, not here.
pub fn fork(frame: &Regs) -> Option<Pid> {
	let mut table = TABLE.lock();
	let cur_slot = scheduler::current_slot();
	let slot = find_free_slot(&table)?;
	let pid = alloc_pid();

	let (ppid, child_space, fds, cwd, name) = {
		let parent = table[cur_slot].as_mut().expect("current process must exist");
		let child_space = match &mut parent.space {
			Space::Kernel => Space::Kernel,
			Space::Owned(s) => Space::Owned(s.clone_cow()),
		};
		(parent.pid, child_space, parent.fds.clone(), parent.cwd.clone(), parent.name.clone())
	};

	let mut kstack = Box::new([0u8; KERNEL_STACK_SIZE]) as Box<[u8]>;
	let top = kstack.as_ptr() as u32 + kstack.len() as u32;
	let regs_addr = top - core::mem::size_of::<Regs>() as u32;
	unsafe {
		let child_frame = regs_addr as *mut Regs;
		core::ptr::write(child_frame, *frame);
		(*child_frame).set_return(0);
	}
	let child_ksp = scheduler::seed_fork_stack(regs_addr);

	table[slot] = Some(Box::new(Process {
		pid,
		ppid,
		state: State::Ready,
		ksp: child_ksp,
		kstack,
		space: child_space,
		fds,
		exit_code: 0,
		sleep_until: 0,
		pending_signals: 0,
		signal_mask: 0,
		handlers: [0; 32],
		name,
		cwd,
	}));
	Some(pid)
}

/// Waits for a child matching `pid` (or any child, if `-1`) to become a
/// zombie, harvests its exit code, and frees its slot.
pub fn wait(pid: Pid) -> Result<(Pid, i32), Errno> {
	loop {
		{
			let mut table = TABLE.lock();
			let me = scheduler::current_pid_locked(&table);
			let mut found_child = false;
			for slot in table.iter_mut() {
				let Some(p) = slot else { continue };
				if p.ppid != me {
					continue;
				}
				if p.state != State::Zombie {
					found_child = true;
					continue;
				}
				if pid != -1 && p.pid != pid {
					found_child = true;
					continue;
				}
				let ret = (p.pid, p.exit_code);
				*slot = None;
				return Ok(ret);
			}
			if !found_child {
				return Err(ECHILD);
			}
		}
		scheduler::block_current(State::Blocked);
		scheduler::yield_now();
	}
}

/// Terminates the current process: becomes a zombie, wakes a blocked
/// parent, releases its address space, and never returns.
pub fn exit(code: i32) -> ! {
	{
		let mut table = TABLE.lock();
		let slot = scheduler::current_slot();
		let ppid = table[slot].as_ref().unwrap().ppid;
		for p in table.iter_mut().flatten() {
			if p.pid == ppid && p.state == State::Blocked {
				p.state = State::Ready;
			}
		}
		let p = table[slot].as_mut().unwrap();
		p.exit_code = code;
		p.state = State::Zombie;
		if let Space::Owned(space) = core::mem::replace(&mut p.space, Space::Kernel) {
			space.destroy();
		}
		p.fds = core::array::from_fn(|_| None);
	}
	scheduler::yield_now();
	unreachable!("a zombie must never be rescheduled");
}

/// Computes `sleep_until = ticks + ceil(ms / tick_period)` and yields until
/// the tick handler promotes this process back to READY.
pub fn sleep(ms: u32) {
	let wake = scheduler::ticks() + crate::process::scheduler::ms_to_ticks(ms);
	{
		let mut table = TABLE.lock();
		let slot = scheduler::current_slot();
		let p = table[slot].as_mut().unwrap();
		p.sleep_until = wake;
		p.state = State::Sleeping;
	}
	scheduler::yield_now();
}

/// Sets `sig`'s bit in `pid`'s pending mask, waking it if it was blocked or
/// sleeping. The return value of an interrupted `sleep` is unspecified by
/// design (see the open questions this kernel inherits from its source).
pub fn kill(pid: Pid, sig: u32) -> Result<(), Errno> {
	let mut table = TABLE.lock();
	for p in table.iter_mut().flatten() {
		if p.pid == pid {
			p.pending_signals |= signal::bit(sig);
			if matches!(p.state, State::Blocked | State::Sleeping) {
				p.state = State::Ready;
			}
			return Ok(());
		}
	}
	Err(ESRCH)
}

/// Runs `f` with exclusive access to the process table, for the scheduler
/// and the page-fault handler.
pub(crate) fn with_table<R>(f: impl FnOnce(&mut [Option<Box<Process>>; MAX_PROCS]) -> R) -> R {
	let mut table = TABLE.lock();
	f(&mut table)
}

/// Runs `f` with exclusive access to the RUNNING process's record. Used by
/// the syscall layer, which only ever touches the caller's own entry.
fn with_current<R>(f: impl FnOnce(&mut Process) -> R) -> R {
	let mut table = TABLE.lock();
	let slot = scheduler::current_slot();
	f(table[slot].as_mut().expect("current process must exist"))
}

/// The RUNNING process's pid.
pub fn current_pid() -> Pid {
	with_current(|p| p.pid)
}

/// The RUNNING process's parent pid.
pub fn current_ppid() -> Pid {
	with_current(|p| p.ppid)
}

/// The RUNNING process's current working directory.
pub fn current_cwd() -> String {
	with_current(|p| p.cwd.clone())
}

/// Sets the RUNNING process's current working directory.
pub fn set_current_cwd(cwd: &str) {
	with_current(|p| p.set_cwd(cwd));
}

/// The open file installed at `fd` in the RUNNING process, if any.
pub fn current_fd(fd: usize) -> Option<Arc<Mutex<OpenFile>>> {
	with_current(|p| p.fd(fd).cloned())
}

/// Installs `file` at the RUNNING process's lowest free descriptor, or
/// `EMFILE` if its table is full.
pub fn install_current_fd(file: Arc<Mutex<OpenFile>>) -> Result<usize, Errno> {
	with_current(|p| p.install_fd(file).ok_or(EMFILE))
}

/// Installs `file` at exactly `fd` in the RUNNING process.
pub fn install_current_fd_at(fd: usize, file: Arc<Mutex<OpenFile>>) -> Result<(), Errno> {
	with_current(|p| if p.install_fd_at(fd, file) { Ok(()) } else { Err(EBADF) })
}

/// Closes descriptor `fd` in the RUNNING process, or `EBADF` if it was not
/// open.
pub fn close_current_fd(fd: usize) -> Result<(), Errno> {
	with_current(|p| if p.close_fd(fd) { Ok(()) } else { Err(EBADF) })
}

/// Resets the RUNNING process back onto the shared kernel address space,
/// destroying whatever address space it owned. Used by `execve`: this
/// kernel has no ELF loader, so exec always re-enters a built-in,
/// kernel-mode entry point rather than mapping a fresh user image, but per
/// the design question this inherits from its source, the old image must
/// not survive the call.
pub(crate) fn reset_current_space_to_kernel() {
	let old = with_current(|p| core::mem::replace(&mut p.space, Space::Kernel));
	if let Space::Owned(space) = old {
		space.destroy();
	}
	unsafe {
		crate::arch::x86::write_cr3(crate::memory::vmem::kernel_cr3());
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test_case]
	fn pid_allocation_is_monotonic_and_nonzero() {
		let a = alloc_pid();
		let b = alloc_pid();
		assert!(a > 0 && b > a);
	}
}
