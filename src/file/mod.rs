//! The virtual filesystem: a mount-point tree of vnodes behind a polymorphic
//! operations table, with the in-memory backend as the sole first-class
//! filesystem.

pub mod open_file;
pub mod ramfs;
pub mod vfs;
pub mod vnode;

/// Builds the root vnode tree and its conventional boot layout. Must run
/// before any path is resolved.
pub fn init() {
	vfs::init();
}
