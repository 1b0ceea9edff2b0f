//! Device collaborators required by the core: a character console and the
//! keyboard ring it is fed from.
//!
//! These live outside the four core subsystems (PFA, VMM, heap, scheduler,
//! VFS, syscall dispatcher), but their interface crosses the core boundary:
//! the VFS wraps the console as `/dev/tty0`, a character-device vnode.

pub mod serial;
pub mod tty;
