//! The filesystem-neutral vnode: a name, a type, and a capability table of
//! operations a backend may or may not support.
//!
//! Every backend (ramfs file, ramfs directory, character device) builds a
//! [`VnodeOps`] table naming the functions it implements and leaves the rest
//! `None`; callers treat an absent entry as [`ENOSYS`].

use crate::errno::{Errno, EISDIR, ENOSYS, ENOTDIR};
use crate::file::open_file::OpenFlags;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

/// `S_IFDIR`, matching the conventional Unix mode bits this kernel's
/// userland expects from `stat`.
pub const S_IFDIR: u32 = 0x4000;
/// `S_IFREG`.
pub const S_IFREG: u32 = 0x8000;
/// `S_IFCHR`.
pub const S_IFCHR: u32 = 0x2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VnodeType {
	File,
	Dir,
	CharDevice,
	Pipe,
}

/// The `stat` result handed back to userland.
#[derive(Debug, Clone, Copy)]
pub struct Stat {
	pub inode: u32,
	pub size: u32,
	pub mode: u32,
}

/// A backend's capability set. Every field is optional; a missing capability
/// is reported as [`ENOSYS`] rather than a panic.
pub struct VnodeOps {
	pub open: Option<fn(&Arc<Vnode>, OpenFlags) -> Result<(), Errno>>,
	pub close: Option<fn(&Arc<Vnode>)>,
	pub read: Option<fn(&Arc<Vnode>, u32, &mut [u8]) -> Result<usize, Errno>>,
	pub write: Option<fn(&Arc<Vnode>, u32, &[u8]) -> Result<usize, Errno>>,
	pub readdir: Option<fn(&Arc<Vnode>, usize) -> Result<Option<String>, Errno>>,
	pub finddir: Option<fn(&Arc<Vnode>, &str) -> Option<Arc<Vnode>>>,
	pub create: Option<fn(&Arc<Vnode>, &str, VnodeType) -> Result<Arc<Vnode>, Errno>>,
	pub unlink: Option<fn(&Arc<Vnode>, &str) -> Result<(), Errno>>,
	pub truncate: Option<fn(&Arc<Vnode>, u32) -> Result<(), Errno>>,
}

impl VnodeOps {
	pub const NONE: VnodeOps = VnodeOps {
		open: None,
		close: None,
		read: None,
		write: None,
		readdir: None,
		finddir: None,
		create: None,
		unlink: None,
		truncate: None,
	};
}

/// A backend's private, mutable state. Kept as a small closed set rather than
/// a `dyn` trait object: this kernel has exactly three kinds of vnode.
pub enum Backend {
	RamFile { data: Vec<u8> },
	RamDir { children: Vec<Arc<Vnode>> },
	CharDevice,
}

pub struct Vnode {
	pub name: String,
	pub kind: VnodeType,
	pub inode: u32,
	pub perm: u32,
	pub size: AtomicU32,
	pub ops: VnodeOps,
	pub backend: crate::sync::spin::Mutex<Backend>,
	/// Non-owning back-reference for `..`; `None` at the filesystem root.
	pub parent: Option<Arc<Vnode>>,
	/// If set, path resolution continues inside this vnode instead of
	/// descending further into `backend`.
	pub mount_override: crate::sync::spin::Mutex<Option<Arc<Vnode>>>,
	/// Counts live [`OpenFile`](crate::file::open_file::OpenFile) instances
	/// referencing this vnode (invariant iv), not the number of descriptor
	/// slots: descriptors created by `dup2` share one open file and so one
	/// reference.
	pub refcount: AtomicU32,
}

impl Vnode {
	pub fn stat(&self) -> Stat {
		let mode = match self.kind {
			VnodeType::Dir => S_IFDIR,
			VnodeType::CharDevice => S_IFCHR,
			_ => S_IFREG,
		} | (self.perm & 0o777);
		Stat {
			inode: self.inode,
			size: self.size.load(Ordering::Relaxed),
			mode,
		}
	}

	pub fn is_dir(&self) -> bool {
		self.kind == VnodeType::Dir
	}

	pub fn open(self: &Arc<Self>, flags: OpenFlags) -> Result<(), Errno> {
		match self.ops.open {
			Some(f) => f(self, flags),
			None => Ok(()),
		}
	}

	pub fn close(self: &Arc<Self>) {
		if let Some(f) = self.ops.close {
			f(self);
		}
	}

	pub fn read(self: &Arc<Self>, offset: u32, buf: &mut [u8]) -> Result<usize, Errno> {
		if self.kind == VnodeType::Dir {
			return Err(EISDIR);
		}
		match self.ops.read {
			Some(f) => f(self, offset, buf),
			None => Err(ENOSYS),
		}
	}

	pub fn write(self: &Arc<Self>, offset: u32, buf: &[u8]) -> Result<usize, Errno> {
		if self.kind == VnodeType::Dir {
			return Err(EISDIR);
		}
		match self.ops.write {
			Some(f) => f(self, offset, buf),
			None => Err(ENOSYS),
		}
	}

	pub fn readdir(self: &Arc<Self>, index: usize) -> Result<Option<String>, Errno> {
		match self.ops.readdir {
			Some(f) => f(self, index),
			None => Err(ENOTDIR),
		}
	}

	pub fn finddir(self: &Arc<Self>, name: &str) -> Option<Arc<Vnode>> {
		self.ops.finddir.and_then(|f| f(self, name))
	}

	pub fn create(self: &Arc<Self>, name: &str, kind: VnodeType) -> Result<Arc<Vnode>, Errno> {
		match self.ops.create {
			Some(f) => f(self, name, kind),
			None => Err(ENOSYS),
		}
	}

	pub fn unlink(self: &Arc<Self>, name: &str) -> Result<(), Errno> {
		match self.ops.unlink {
			Some(f) => f(self, name),
			None => Err(ENOSYS),
		}
	}

	pub fn truncate(self: &Arc<Self>, size: u32) -> Result<(), Errno> {
		match self.ops.truncate {
			Some(f) => f(self, size),
			None => Err(ENOSYS),
		}
	}
}
