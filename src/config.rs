//! Compile-time tunables shared across subsystems.
//!
//! The reference kernel generates these from an external build-time config
//! tool; this tree is a single crate with no such step, so they are plain
//! constants instead.

/// Number of process table slots.
pub const MAX_PROCS: usize = 64;
/// Number of open-file-descriptor slots per process.
pub const MAX_FDS: usize = 32;
/// Size, in bytes, of the fixed kernel stack owned by each process record.
pub const KERNEL_STACK_SIZE: usize = 8 * 1024;
/// Upper bound on physical memory the frame allocator's bitmap can track.
pub const MAX_PHYS_MEM: usize = 256 * 1024 * 1024;
/// Page size in bytes on x86 with 4 KiB pages.
pub const PAGE_SIZE: usize = 4096;
/// Fixed virtual address where the kernel heap arena begins.
pub const HEAP_START: u32 = 0xD000_0000;
/// Maximum number of children a single in-memory-filesystem directory holds.
pub const RAMFS_MAX_CHILDREN: usize = 64;
/// Maximum length, in bytes, of a process name or current working directory.
pub const NAME_MAX: usize = 64;
/// Maximum length, in bytes, of a path read from user memory for a syscall.
pub const PATH_MAX: usize = 256;
/// Fixed top-of-stack virtual address mapped for a built-in program started
/// by `execve`.
pub const USER_STACK_TOP: u32 = 0xBFFF_F000;
