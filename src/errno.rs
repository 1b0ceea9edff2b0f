//! Error numbers returned by system calls.
//!
//! Kernel code does not maintain a global `errno`: a failing operation
//! returns one of these values directly, and the syscall layer writes its
//! negation into the caller's return register.

/// Type representing a Unix-style errno.
pub type Errno = i32;

/// Operation not permitted.
pub const EPERM: Errno = 1;
/// No such file or directory.
pub const ENOENT: Errno = 2;
/// No such process.
pub const ESRCH: Errno = 3;
/// Bad file descriptor.
pub const EBADF: Errno = 9;
/// No child processes.
pub const ECHILD: Errno = 10;
/// Not enough space.
pub const ENOMEM: Errno = 12;
/// File exists.
pub const EEXIST: Errno = 17;
/// Not a directory.
pub const ENOTDIR: Errno = 20;
/// Is a directory.
pub const EISDIR: Errno = 21;
/// Invalid argument.
pub const EINVAL: Errno = 22;
/// Too many open files.
pub const EMFILE: Errno = 24;
/// Invalid seek.
pub const ESPIPE: Errno = 29;
/// No space left on device.
pub const ENOSPC: Errno = 28;
/// Function not implemented.
pub const ENOSYS: Errno = 38;

/// Returns the human-readable name of an errno, for diagnostics.
pub fn name(errno: Errno) -> &'static str {
	match errno {
		EPERM => "EPERM",
		ENOENT => "ENOENT",
		ESRCH => "ESRCH",
		EBADF => "EBADF",
		ECHILD => "ECHILD",
		ENOMEM => "ENOMEM",
		EEXIST => "EEXIST",
		ENOTDIR => "ENOTDIR",
		EISDIR => "EISDIR",
		EINVAL => "EINVAL",
		EMFILE => "EMFILE",
		ESPIPE => "ESPIPE",
		ENOSPC => "ENOSPC",
		ENOSYS => "ENOSYS",
		_ => "EUNKNOWN",
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test_case]
	fn errno_names_resolve() {
		assert_eq!(name(ENOENT), "ENOENT");
		assert_eq!(name(9999), "EUNKNOWN");
	}
}
