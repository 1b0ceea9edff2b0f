//! Filesystem-facing syscalls: every path argument resolves relative to the
//! calling process's `cwd`, and every descriptor argument indexes its fd
//! table.

use crate::config::PATH_MAX;
use crate::errno::{Errno, EBADF, EINVAL};
use crate::file::vfs;
use crate::process;
use crate::sync::spin::Mutex;
use alloc::sync::Arc;

/// Copies up to `buf.len()` bytes from `ptr`, or writes up to `buf.len()`
/// bytes to `ptr`; both directions share one bounds-free pointer cast since
/// every caller in this kernel is a trusted built-in, never foreign code.
unsafe fn user_slice_mut<'a>(ptr: u32, len: usize) -> &'a mut [u8] {
	unsafe { core::slice::from_raw_parts_mut(ptr as *mut u8, len) }
}

unsafe fn user_slice<'a>(ptr: u32, len: usize) -> &'a [u8] {
	unsafe { core::slice::from_raw_parts(ptr as *const u8, len) }
}

pub(super) fn sys_open(path_ptr: u32, flags: u32, _mode: u32) -> Result<i32, Errno> {
	let path = super::read_cstr(path_ptr, PATH_MAX)?;
	let cwd = process::current_cwd();
	let file = vfs::open(&path, flags, &cwd)?;
	let fd = process::install_current_fd(Arc::new(Mutex::new(file)))?;
	Ok(fd as i32)
}

pub(super) fn sys_close(fd: u32) -> Result<i32, Errno> {
	process::close_current_fd(fd as usize)?;
	Ok(0)
}

pub(super) fn sys_read(fd: u32, buf_ptr: u32, len: u32) -> Result<i32, Errno> {
	let file = process::current_fd(fd as usize).ok_or(EBADF)?;
	let buf = unsafe { user_slice_mut(buf_ptr, len as usize) };
	let n = file.lock().read(buf)?;
	Ok(n as i32)
}

pub(super) fn sys_write(fd: u32, buf_ptr: u32, len: u32) -> Result<i32, Errno> {
	let file = process::current_fd(fd as usize).ok_or(EBADF)?;
	let buf = unsafe { user_slice(buf_ptr, len as usize) };
	let n = file.lock().write(buf)?;
	Ok(n as i32)
}

pub(super) fn sys_unlink(path_ptr: u32) -> Result<i32, Errno> {
	let path = super::read_cstr(path_ptr, PATH_MAX)?;
	vfs::unlink(&path, &process::current_cwd())?;
	Ok(0)
}

pub(super) fn sys_mkdir(path_ptr: u32) -> Result<i32, Errno> {
	let path = super::read_cstr(path_ptr, PATH_MAX)?;
	vfs::mkdir(&path, &process::current_cwd())?;
	Ok(0)
}

pub(super) fn sys_chdir(path_ptr: u32) -> Result<i32, Errno> {
	let path = super::read_cstr(path_ptr, PATH_MAX)?;
	let cwd = process::current_cwd();
	let target = vfs::resolve(&path, &cwd)?;
	if !target.is_dir() {
		return Err(crate::errno::ENOTDIR);
	}
	process::set_current_cwd(&vfs::absolute_path(&target));
	Ok(0)
}

pub(super) fn sys_getcwd(buf_ptr: u32, len: u32) -> Result<i32, Errno> {
	let cwd = process::current_cwd();
	if cwd.len() as u32 + 1 > len {
		return Err(EINVAL);
	}
	let buf = unsafe { user_slice_mut(buf_ptr, cwd.len() + 1) };
	buf[..cwd.len()].copy_from_slice(cwd.as_bytes());
	buf[cwd.len()] = 0;
	Ok(cwd.len() as i32)
}

pub(super) fn sys_lseek(fd: u32, offset: u32, whence: u32) -> Result<i32, Errno> {
	let file = process::current_fd(fd as usize).ok_or(EBADF)?;
	let pos = file.lock().lseek(offset as i32, whence)?;
	Ok(pos as i32)
}

pub(super) fn sys_dup2(oldfd: u32, newfd: u32) -> Result<i32, Errno> {
	let file = process::current_fd(oldfd as usize).ok_or(EBADF)?;
	process::install_current_fd_at(newfd as usize, file)?;
	Ok(newfd as i32)
}

pub(super) fn sys_readdir(fd: u32, buf_ptr: u32, index: u32) -> Result<i32, Errno> {
	let file = process::current_fd(fd as usize).ok_or(EBADF)?;
	match file.lock().readdir(index as usize)? {
		Some(name) => {
			let n = name.len().min(PATH_MAX - 1);
			let buf = unsafe { user_slice_mut(buf_ptr, n + 1) };
			buf[..n].copy_from_slice(&name.as_bytes()[..n]);
			buf[n] = 0;
			Ok(n as i32)
		}
		None => Ok(0),
	}
}
