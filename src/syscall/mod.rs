//! The system-call dispatcher: `int 0x80` lands every trap here with a
//! uniform [`Regs`] frame. The call number is the accumulator; the first
//! three arguments are `ebx`, `ecx`, `edx`; the return value is written back
//! into the accumulator before the trap returns.

pub mod fs;
pub mod process;

use crate::errno::{Errno, EINVAL, ENOSYS};
use crate::process::regs::Regs;
use alloc::string::String;
use alloc::vec::Vec;

/// Reads a NUL-terminated string from a user-supplied pointer, capped at
/// `max` bytes. The pointer is trusted the way every built-in program's
/// arguments are: this kernel loads no foreign code, so there is no
/// adversarial caller to harden against, only a buggy one, and a buggy
/// pointer still only faults the calling process's own page fault handler.
pub(crate) fn read_cstr(ptr: u32, max: usize) -> Result<String, Errno> {
	if ptr == 0 {
		return Err(EINVAL);
	}
	let mut bytes = Vec::new();
	for i in 0..max as u32 {
		let byte = unsafe { *((ptr + i) as *const u8) };
		if byte == 0 {
			break;
		}
		bytes.push(byte);
	}
	String::from_utf8(bytes).map_err(|_| EINVAL)
}

/// Demultiplexes `frame`'s syscall number onto the recognized calls in
/// §4.6, writing the signed result (or its sign-inverted error) back into
/// `frame`'s accumulator slot.
///
/// `exit` and a successful `execve` never return to this function: they
/// yield permanently or jump straight into a built-in entry point.
pub fn dispatch(frame: &mut Regs) {
	let no = frame.syscall_no();
	let (a0, a1, a2) = frame.syscall_args();

	#[cfg(feature = "strace")]
	println!("[strace] pid={} syscall {no}({a0:#x}, {a1:#x}, {a2:#x})", crate::process::current_pid());

	if no == 1 {
		crate::process::exit(a0 as i32);
	}

	let result = match no {
		2 => process::sys_fork(frame),
		3 => fs::sys_read(a0, a1, a2),
		4 => fs::sys_write(a0, a1, a2),
		5 => fs::sys_open(a0, a1, a2),
		6 => fs::sys_close(a0),
		7 => process::sys_waitpid(a0 as i32, a1),
		10 => fs::sys_unlink(a0),
		11 => process::sys_execve(a0),
		12 => fs::sys_chdir(a0),
		19 => fs::sys_lseek(a0, a1, a2),
		20 => Ok(process::sys_getpid()),
		37 => process::sys_kill(a0 as i32, a1),
		39 => fs::sys_mkdir(a0),
		63 => fs::sys_dup2(a0, a1),
		64 => Ok(process::sys_getppid()),
		89 => fs::sys_readdir(a0, a1, a2),
		162 => process::sys_sleep(a0),
		183 => fs::sys_getcwd(a0, a1),
		_ => Err(ENOSYS),
	};

	let value = match result {
		Ok(v) => v,
		Err(e) => -e,
	};
	frame.set_return(value);

	#[cfg(feature = "strace")]
	println!("[strace] syscall {no} -> {value}");
}
