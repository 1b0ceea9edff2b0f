//! Process-facing syscalls: lifecycle (`fork`/`exit`/`waitpid`), identity,
//! `sleep`, `kill`, and the built-in-only `execve`.

use crate::config::PATH_MAX;
use crate::errno::{Errno, ENOENT, ENOMEM};
use crate::process;
use crate::process::regs::Regs;

pub(super) fn sys_fork(frame: &Regs) -> Result<i32, Errno> {
	process::fork(frame).map(|pid| pid as i32).ok_or(ENOMEM)
}

pub(super) fn sys_waitpid(pid: i32, status_ptr: u32) -> Result<i32, Errno> {
	let (child, code) = process::wait(pid)?;
	if status_ptr != 0 {
		unsafe {
			*(status_ptr as *mut i32) = code;
		}
	}
	Ok(child)
}

pub(super) fn sys_getpid() -> i32 {
	process::current_pid()
}

pub(super) fn sys_getppid() -> i32 {
	process::current_ppid()
}

pub(super) fn sys_kill(pid: i32, sig: u32) -> Result<i32, Errno> {
	process::kill(pid, sig)?;
	Ok(0)
}

pub(super) fn sys_sleep(seconds: u32) -> Result<i32, Errno> {
	process::sleep(seconds.saturating_mul(1000));
	Ok(0)
}

/// A kernel-mode entry point `execve` can jump to in place of the calling
/// process's current code. This kernel has no ELF loader (out of scope by
/// design); every "program" `execve` can name is one of these, compiled
/// into the kernel itself.
type Builtin = extern "C" fn() -> !;

/// Built-in programs `execve` recognizes by path. Empty until a concrete
/// collaborator (e.g. the interactive shell, itself out of scope here)
/// registers one; an empty table makes every `execve` fail with `ENOENT`,
/// which is the correct, honest behavior for a kernel that ships none.
static BUILTINS: &[(&str, Builtin)] = &[];

fn lookup_builtin(path: &str) -> Option<Builtin> {
	BUILTINS.iter().find(|(name, _)| *name == path).map(|(_, entry)| *entry)
}

/// Replaces the calling process's program with a built-in entry point,
/// resetting its address space first so the old image cannot outlive the
/// call (see the design note this kernel inherits from its source about
/// `execve` not actually destroying the previous image). On success this
/// never returns to the caller.
pub(super) fn sys_execve(path_ptr: u32) -> Result<i32, Errno> {
	let path = super::read_cstr(path_ptr, PATH_MAX)?;
	let entry = lookup_builtin(&path).ok_or(ENOENT)?;
	process::reset_current_space_to_kernel();
	entry()
}
