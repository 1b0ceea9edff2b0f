//! The in-memory filesystem: the kernel's only first-class backend. Regular
//! files are a growable byte buffer; directories are a bounded array of
//! child vnodes. Grounded directly on the original implementation's
//! `ramfs_node_t` and its operations.

use crate::config::{PAGE_SIZE, RAMFS_MAX_CHILDREN};
use crate::errno::{Errno, ENOENT, ENOSPC};
use crate::file::vnode::{Backend, Vnode, VnodeOps, VnodeType};
use crate::sync::spin::Mutex;
use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

fn next_inode() -> u32 {
	static NEXT: AtomicU32 = AtomicU32::new(1);
	NEXT.fetch_add(1, Ordering::Relaxed)
}

const FILE_OPS: VnodeOps = VnodeOps {
	read: Some(file_read),
	write: Some(file_write),
	truncate: Some(file_truncate),
	..VnodeOps::NONE
};

const DIR_OPS: VnodeOps = VnodeOps {
	readdir: Some(dir_readdir),
	finddir: Some(dir_finddir),
	create: Some(dir_create),
	unlink: Some(dir_unlink),
	..VnodeOps::NONE
};

/// Builds a detached file vnode with an empty buffer.
pub fn new_file(name: &str, parent: Option<Arc<Vnode>>) -> Arc<Vnode> {
	Arc::new(Vnode {
		name: String::from(name),
		kind: VnodeType::File,
		inode: next_inode(),
		perm: 0o600,
		size: AtomicU32::new(0),
		ops: FILE_OPS,
		backend: Mutex::new(Backend::RamFile { data: Vec::new() }),
		parent,
		mount_override: Mutex::new(None),
		refcount: AtomicU32::new(0),
	})
}

/// Builds a detached, empty directory vnode.
pub fn new_dir(name: &str, parent: Option<Arc<Vnode>>) -> Arc<Vnode> {
	Arc::new(Vnode {
		name: String::from(name),
		kind: VnodeType::Dir,
		inode: next_inode(),
		perm: 0o700,
		size: AtomicU32::new(0),
		ops: DIR_OPS,
		backend: Mutex::new(Backend::RamDir {
			children: Vec::new(),
		}),
		parent,
		mount_override: Mutex::new(None),
		refcount: AtomicU32::new(0),
	})
}

fn file_read(v: &Arc<Vnode>, offset: u32, buf: &mut [u8]) -> Result<usize, Errno> {
	let backend = v.backend.lock();
	let Backend::RamFile { data } = &*backend else {
		unreachable!("file ops only installed on RamFile backends")
	};
	let offset = offset as usize;
	if offset >= data.len() {
		return Ok(0);
	}
	let avail = data.len() - offset;
	let n = buf.len().min(avail);
	buf[..n].copy_from_slice(&data[offset..offset + n]);
	Ok(n)
}

fn file_write(v: &Arc<Vnode>, offset: u32, buf: &[u8]) -> Result<usize, Errno> {
	let mut backend = v.backend.lock();
	let Backend::RamFile { data } = &mut *backend else {
		unreachable!("file ops only installed on RamFile backends")
	};
	let offset = offset as usize;
	let needed = offset + buf.len();
	if needed > data.len() {
		let new_cap = needed + PAGE_SIZE;
		data.resize(new_cap, 0);
	}
	data[offset..offset + buf.len()].copy_from_slice(buf);
	if needed as u32 > v.size.load(Ordering::Relaxed) {
		v.size.store(needed as u32, Ordering::Relaxed);
	}
	Ok(buf.len())
}

fn file_truncate(v: &Arc<Vnode>, size: u32) -> Result<(), Errno> {
	let mut backend = v.backend.lock();
	let Backend::RamFile { data } = &mut *backend else {
		unreachable!("file ops only installed on RamFile backends")
	};
	if size == 0 {
		data.clear();
		data.shrink_to_fit();
		v.size.store(0, Ordering::Relaxed);
	} else if size < v.size.load(Ordering::Relaxed) {
		data.truncate(size as usize);
		v.size.store(size, Ordering::Relaxed);
	}
	Ok(())
}

fn dir_readdir(v: &Arc<Vnode>, index: usize) -> Result<Option<String>, Errno> {
	let backend = v.backend.lock();
	let Backend::RamDir { children } = &*backend else {
		unreachable!("dir ops only installed on RamDir backends")
	};
	Ok(children.get(index).map(|c| c.name.to_string()))
}

fn dir_finddir(v: &Arc<Vnode>, name: &str) -> Option<Arc<Vnode>> {
	let backend = v.backend.lock();
	let Backend::RamDir { children } = &*backend else {
		unreachable!("dir ops only installed on RamDir backends")
	};
	children.iter().find(|c| c.name == name).cloned()
}

fn dir_create(v: &Arc<Vnode>, name: &str, kind: VnodeType) -> Result<Arc<Vnode>, Errno> {
	let mut backend = v.backend.lock();
	let Backend::RamDir { children } = &mut *backend else {
		unreachable!("dir ops only installed on RamDir backends")
	};
	if children.len() >= RAMFS_MAX_CHILDREN {
		return Err(ENOSPC);
	}
	let child = match kind {
		VnodeType::Dir => new_dir(name, Some(v.clone())),
		_ => new_file(name, Some(v.clone())),
	};
	children.push(child.clone());
	Ok(child)
}

fn dir_unlink(v: &Arc<Vnode>, name: &str) -> Result<(), Errno> {
	let mut backend = v.backend.lock();
	let Backend::RamDir { children } = &mut *backend else {
		unreachable!("dir ops only installed on RamDir backends")
	};
	let Some(idx) = children.iter().position(|c| c.name == name) else {
		return Err(ENOENT);
	};
	// Order is not preserved: swap the last child into the removed slot.
	children.swap_remove(idx);
	Ok(())
}

#[cfg(test)]
mod test {
	use super::*;

	#[test_case]
	fn ramfs_write_grows_and_read_back_matches() {
		let f = new_file("a", None);
		let n = f.write(0, b"hello").unwrap();
		assert_eq!(n, 5);
		let mut buf = [0u8; 5];
		let n = f.read(0, &mut buf).unwrap();
		assert_eq!(n, 5);
		assert_eq!(&buf, b"hello");
	}

	#[test_case]
	fn ramfs_truncate_to_zero_clears_size() {
		let f = new_file("a", None);
		f.write(0, b"hello").unwrap();
		f.truncate(0).unwrap();
		assert_eq!(f.size.load(Ordering::Relaxed), 0);
		let mut buf = [0u8; 8];
		assert_eq!(f.read(0, &mut buf).unwrap(), 0);
	}

	#[test_case]
	fn ramfs_dir_create_find_unlink_roundtrip() {
		let dir = new_dir("/", None);
		let child = dir.create("tmp", VnodeType::Dir).unwrap();
		assert!(Arc::ptr_eq(&dir.finddir("tmp").unwrap(), &child));
		dir.unlink("tmp").unwrap();
		assert!(dir.finddir("tmp").is_none());
	}

	#[test_case]
	fn ramfs_dir_create_past_limit_fails() {
		let dir = new_dir("/", None);
		for i in 0..RAMFS_MAX_CHILDREN {
			dir.create(&alloc::format!("f{i}"), VnodeType::File).unwrap();
		}
		assert_eq!(dir.create("overflow", VnodeType::File), Err(ENOSPC));
	}
}
