//! Path resolution and the global root. Absolute paths start here;
//! relative paths start at the caller's `cwd`. Mount-overrides let
//! resolution hand off into another vnode tree mid-path, though this
//! kernel only ever installs one: the character device at `/dev/tty0`.

use crate::device::tty;
use crate::errno::{Errno, EEXIST, EISDIR, ENOENT, ENOTDIR};
use crate::file::open_file::{OpenFile, OpenFlags, O_CREAT, O_TRUNC};
use crate::file::ramfs;
use crate::file::vnode::{Backend, Vnode, VnodeOps, VnodeType};
use crate::sync::spin::{IntMutex, Mutex};
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::AtomicU32;

static ROOT: IntMutex<Option<Arc<Vnode>>> = IntMutex::new(None);

const CHAR_OPS: VnodeOps = VnodeOps {
	read: Some(chardev_read),
	write: Some(chardev_write),
	..VnodeOps::NONE
};

fn chardev_read(_v: &Arc<Vnode>, _offset: u32, buf: &mut [u8]) -> Result<usize, Errno> {
	Ok(tty::readline(buf))
}

fn chardev_write(_v: &Arc<Vnode>, _offset: u32, buf: &[u8]) -> Result<usize, Errno> {
	tty::puts(buf);
	Ok(buf.len())
}

fn new_chardev(name: &str, parent: Option<Arc<Vnode>>) -> Arc<Vnode> {
	Arc::new(Vnode {
		name: String::from(name),
		kind: VnodeType::CharDevice,
		inode: 0,
		perm: 0o666,
		size: AtomicU32::new(0),
		ops: CHAR_OPS,
		backend: Mutex::new(Backend::CharDevice),
		parent,
		mount_override: Mutex::new(None),
		refcount: AtomicU32::new(0),
	})
}

/// Builds the root directory and populates the conventional layout
/// (`/bin`, `/dev`, `/etc`, `/tmp`) before the scheduler starts, including
/// mounting the console at `/dev/tty0`.
pub fn init() {
	let root = ramfs::new_dir("/", None);
	for name in ["bin", "etc", "tmp"] {
		root.create(name, VnodeType::Dir).expect("boot layout fits within RAMFS_MAX_CHILDREN");
	}
	let dev = root.create("dev", VnodeType::Dir).expect("boot layout fits within RAMFS_MAX_CHILDREN");
	let tty0 = new_chardev("tty0", Some(dev.clone()));
	if let Backend::RamDir { children } = &mut *dev.backend.lock() {
		children.push(tty0);
	}
	*ROOT.lock() = Some(root);
}

fn root_vnode() -> Arc<Vnode> {
	ROOT.lock().clone().expect("vfs::init must run before any path is resolved")
}

/// Splits `path` on `/`, dropping empty components and `.`. `..` is kept as
/// a literal component; resolution treats it as a no-op once at a root,
/// per the design notes this kernel inherits from its source.
fn split(path: &str) -> Vec<&str> {
	path.split('/').filter(|c| !c.is_empty() && *c != ".").collect()
}

/// Resolves `path` to a vnode, starting at the filesystem root for an
/// absolute path or at `cwd` otherwise.
pub fn resolve(path: &str, cwd: &str) -> Result<Arc<Vnode>, Errno> {
	let mut cur = if path.starts_with('/') {
		root_vnode()
	} else {
		resolve(cwd, "/")?
	};
	for comp in split(path) {
		if comp == ".." {
			cur = cur.parent.clone().unwrap_or(cur);
			continue;
		}
		if let Some(mnt) = cur.mount_override.lock().clone() {
			cur = mnt;
		}
		if !cur.is_dir() {
			return Err(ENOTDIR);
		}
		cur = cur.finddir(comp).ok_or(ENOENT)?;
	}
	if let Some(mnt) = cur.mount_override.lock().clone() {
		cur = mnt;
	}
	Ok(cur)
}

/// Reconstructs the absolute path of `vnode` by walking its parent chain
/// back to the root, so callers that only have a resolved target (e.g.
/// `chdir`) can store an absolute `cwd` instead of the caller's possibly
/// relative argument.
pub fn absolute_path(vnode: &Arc<Vnode>) -> String {
	let mut names = Vec::new();
	let mut cur = vnode.clone();
	while let Some(parent) = cur.parent.clone() {
		names.push(cur.name.clone());
		cur = parent;
	}
	if names.is_empty() {
		return String::from("/");
	}
	names.reverse();
	let mut path = String::new();
	for name in names {
		path.push('/');
		path.push_str(&name);
	}
	path
}

/// Splits `path` into its parent directory and trailing component.
fn split_parent(path: &str) -> (String, String) {
	let comps = split(path);
	let is_abs = path.starts_with('/');
	let Some((last, rest)) = comps.split_last() else {
		return (String::from(if is_abs { "/" } else { "." }), String::new());
	};
	let mut parent = String::new();
	if is_abs {
		parent.push('/');
	}
	for (i, c) in rest.iter().enumerate() {
		if i > 0 {
			parent.push('/');
		}
		parent.push_str(c);
	}
	if parent.is_empty() {
		parent.push('.');
	}
	(parent, String::from(*last))
}

/// Installs `vnode` as a mount-override that resolution continues inside,
/// in place of descending further into the target's own backend.
pub fn mount(path: &str, cwd: &str, vnode: Arc<Vnode>) -> Result<(), Errno> {
	let target = resolve(path, cwd)?;
	*target.mount_override.lock() = Some(vnode);
	Ok(())
}

/// Resolves `path`, creating it first if it is missing and `O_CREAT` is set.
/// Truncates to zero if `O_TRUNC` is set. Returns an open file with its
/// offset positioned per `flags` and the vnode's refcount incremented.
pub fn open(path: &str, flags: OpenFlags, cwd: &str) -> Result<OpenFile, Errno> {
	let vnode = match resolve(path, cwd) {
		Ok(v) => v,
		Err(ENOENT) if flags & O_CREAT != 0 => {
			let (parent, name) = split_parent(path);
			if name.is_empty() {
				return Err(ENOENT);
			}
			let parent = resolve(&parent, cwd)?;
			parent.create(&name, VnodeType::File)?
		}
		Err(e) => return Err(e),
	};
	vnode.open(flags)?;
	if flags & O_TRUNC != 0 {
		vnode.truncate(0)?;
	}
	Ok(OpenFile::new(vnode, flags))
}

/// `mkdir`: resolves the parent and invokes its `create` with the trailing
/// name. Fails with `EEXIST` if the name is already taken.
pub fn mkdir(path: &str, cwd: &str) -> Result<(), Errno> {
	if resolve(path, cwd).is_ok() {
		return Err(EEXIST);
	}
	let (parent, name) = split_parent(path);
	if name.is_empty() {
		return Err(ENOENT);
	}
	let parent = resolve(&parent, cwd)?;
	parent.create(&name, VnodeType::Dir)?;
	Ok(())
}

/// `unlink`: resolves the parent path and invokes its `unlink` with the
/// trailing name. Refuses to unlink a directory through this entry point.
pub fn unlink(path: &str, cwd: &str) -> Result<(), Errno> {
	let target = resolve(path, cwd)?;
	if target.is_dir() {
		return Err(EISDIR);
	}
	let (parent, name) = split_parent(path);
	let parent = resolve(&parent, cwd)?;
	parent.unlink(&name)
}

#[cfg(feature = "selftest")]
pub fn selftest() {
	let _ = resolve("/dev/tty0", "/");
	let _ = resolve("/bin/../dev", "/");
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::file::open_file::{O_CREAT, O_RDWR};

	fn with_fresh_root<R>(f: impl FnOnce() -> R) -> R {
		init();
		f()
	}

	#[test_case]
	fn vfs_create_write_read_truncate_scenario() {
		with_fresh_root(|| {
			let mut file = open("/tmp/a", O_CREAT | O_RDWR, "/").unwrap();
			let n = file.write(b"hello").unwrap();
			assert_eq!(n, 5);
			file.lseek(0, crate::file::open_file::SEEK_SET).unwrap();
			let mut buf = [0u8; 5];
			assert_eq!(file.read(&mut buf).unwrap(), 5);
			assert_eq!(&buf, b"hello");
			file.vnode().truncate(0).unwrap();
			assert_eq!(file.vnode().stat().size, 0);
		});
	}

	#[test_case]
	fn vfs_idempotent_lookup_matches_canonicalized_path() {
		with_fresh_root(|| {
			let a = resolve("/bin", "/").unwrap();
			let b = resolve("/bin/../bin", "/").unwrap();
			assert!(Arc::ptr_eq(&a, &b));
		});
	}

	#[test_case]
	fn vfs_open_missing_without_creat_fails() {
		with_fresh_root(|| {
			assert_eq!(open("/tmp/missing", 0, "/").unwrap_err(), ENOENT);
		});
	}
}
