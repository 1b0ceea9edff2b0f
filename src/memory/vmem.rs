//! The virtual memory manager: two-level x86 page tables, TLB discipline,
//! and copy-on-write address-space cloning.
//!
//! An [`AddressSpace`] owns one page directory. The upper [`KERNEL_TABLES`]
//! directory entries are the kernel template and are bit-identical across
//! every address space; the lower [`USER_TABLES`] are private to the space
//! (save for frames shared by CoW).

use crate::memory::pfa;
use crate::sync::spin::IntMutex;
use alloc::boxed::Box;
use core::ptr;

/// A page-table/page-directory entry.
pub type Pte = u32;

const ENTRIES: usize = 1024;
/// Directory entries owned by userspace, indices `0..USER_TABLES`.
pub const USER_TABLES: usize = 768;
/// Directory entries shared by every address space, indices `USER_TABLES..1024`.
pub const KERNEL_TABLES: usize = 256;

/// PTE present.
pub const PRESENT: u32 = 1 << 0;
/// PTE writable.
pub const WRITABLE: u32 = 1 << 1;
/// PTE accessible from ring 3.
pub const USER: u32 = 1 << 2;
/// Software-only copy-on-write marker, carried in a CPU-ignored bit.
pub const COW: u32 = 1 << 9;

const ADDR_MASK: u32 = 0xFFFF_F000;

/// A second-level page table: 1024 leaf entries covering 4 MiB.
#[repr(C, align(4096))]
struct Table {
	entries: [Pte; ENTRIES],
}

impl Table {
	const fn zeroed() -> Self {
		Self {
			entries: [0; ENTRIES],
		}
	}
}

/// A page directory together with the frames backing each of its second-level
/// tables. Owns the physical frames of its own second-level tables, but never
/// the kernel ones (indices `USER_TABLES..1024`), which are a shared
/// read-only template.
pub struct AddressSpace {
	directory: Box<Table>,
	/// Physical address of each present second-level table, indexed the same
	/// as the directory, so `destroy_space` can free them without re-walking
	/// physical memory the directory entry already encodes (it does, but
	/// tracking it here keeps destroy symmetric with the allocator it used).
	tables: Box<[Option<u32>; ENTRIES]>,
}

static KERNEL_SPACE: IntMutex<Option<AddressSpace>> = IntMutex::new(None);

fn table_index(virt: u32) -> (usize, usize) {
	((virt >> 22) as usize, ((virt >> 12) & 0x3FF) as usize)
}

/// Identity-maps the first 4 MiB, builds the kernel template, activates it
/// and enables paging.
///
/// # Safety
///
/// Must run exactly once, before any other `memory::vmem` call, with the PFA
/// already initialized.
pub fn init() {
	let mut space = AddressSpace::new_kernel();
	for addr in (0..4 * 1024 * 1024).step_by(crate::memory::PAGE_SIZE) {
		space.map_raw(addr, addr, PRESENT | WRITABLE);
	}
	unsafe {
		activate(&space);
		crate::arch::x86::enable_paging();
	}
	*KERNEL_SPACE.lock() = Some(space);
}

impl AddressSpace {
	fn new_kernel() -> Self {
		Self {
			directory: Box::new(Table::zeroed()),
			tables: Box::new([None; ENTRIES]),
		}
	}

	/// Allocates a fresh space whose upper [`KERNEL_TABLES`] directory entries
	/// are copied by value from the kernel template.
	pub fn new() -> Self {
		let mut space = Self {
			directory: Box::new(Table::zeroed()),
			tables: Box::new([None; ENTRIES]),
		};
		let kernel = KERNEL_SPACE.lock();
		let kernel = kernel.as_ref().expect("vmem::init must run first");
		for i in USER_TABLES..ENTRIES {
			space.directory.entries[i] = kernel.directory.entries[i];
			space.tables[i] = kernel.tables[i];
		}
		space
	}

	fn ensure_table(&mut self, dir_idx: usize, user: bool) -> &mut Table {
		if self.tables[dir_idx].is_none() {
			let frame = pfa::alloc().expect("out of physical frames for a page table");
			let table = frame as *mut Table;
			unsafe {
				ptr::write_bytes(table, 0, 1);
			}
			let mut flags = PRESENT | WRITABLE;
			if user {
				flags |= USER;
			}
			self.directory.entries[dir_idx] = (frame & ADDR_MASK) | flags;
			self.tables[dir_idx] = Some(frame);
		}
		unsafe { &mut *(self.tables[dir_idx].unwrap() as *mut Table) }
	}

	fn map_raw(&mut self, virt: u32, phys: u32, flags: u32) {
		let (dir_idx, tbl_idx) = table_index(virt);
		let table = self.ensure_table(dir_idx, flags & USER != 0);
		table.entries[tbl_idx] = (phys & ADDR_MASK) | flags;
		crate::arch::x86::invlpg(virt);
	}

	/// Installs a leaf PTE for `virt`, allocating the second-level table if
	/// needed.
	pub fn map(&mut self, virt: u32, phys: u32, flags: u32) {
		self.map_raw(virt, phys, flags | PRESENT);
	}

	/// Clears the leaf entry for `virt` and flushes the TLB.
	pub fn unmap(&mut self, virt: u32) {
		let (dir_idx, tbl_idx) = table_index(virt);
		if let Some(frame) = self.tables[dir_idx] {
			let table = unsafe { &mut *(frame as *mut Table) };
			table.entries[tbl_idx] = 0;
			crate::arch::x86::invlpg(virt);
		}
	}

	/// Walks the tables and returns the mapped physical address, or `0` if
	/// `virt` is not present.
	pub fn resolve(&self, virt: u32) -> u32 {
		let (dir_idx, tbl_idx) = table_index(virt);
		let Some(frame) = self.tables[dir_idx] else {
			return 0;
		};
		let table = unsafe { &*(frame as *const Table) };
		let pte = table.entries[tbl_idx];
		if pte & PRESENT == 0 {
			return 0;
		}
		pte & ADDR_MASK
	}

	/// Returns the raw PTE for `virt`, if the second-level table exists.
	pub fn pte(&self, virt: u32) -> Option<Pte> {
		let (dir_idx, tbl_idx) = table_index(virt);
		let frame = self.tables[dir_idx]?;
		let table = unsafe { &*(frame as *const Table) };
		Some(table.entries[tbl_idx])
	}

	/// Overwrites the raw PTE for `virt` in place, without touching
	/// second-level table allocation. Used by the copy-on-write handler.
	pub fn set_pte(&mut self, virt: u32, pte: Pte) {
		let (dir_idx, tbl_idx) = table_index(virt);
		if let Some(frame) = self.tables[dir_idx] {
			let table = unsafe { &mut *(frame as *mut Table) };
			table.entries[tbl_idx] = pte;
			crate::arch::x86::invlpg(virt);
		}
	}

	/// Physical address of this space's page directory, for loading into `cr3`.
	pub fn cr3(&self) -> u32 {
		self.directory.entries.as_ptr() as u32
	}

	/// Resolves a write+present fault on `virt` if its leaf PTE carries the
	/// CoW bit: allocates a fresh frame, copies the shared frame's contents,
	/// installs a writable non-CoW PTE, and flushes the TLB. Returns `false`
	/// if the PTE wasn't a CoW leaf, leaving the fault unresolved.
	pub fn resolve_cow(&mut self, virt: u32) -> bool {
		let Some(pte) = self.pte(virt) else {
			return false;
		};
		if pte & COW == 0 {
			return false;
		}
		let old_frame = pte & ADDR_MASK;
		let Some(new_frame) = pfa::alloc() else {
			return false;
		};
		unsafe {
			ptr::copy_nonoverlapping(
				old_frame as *const u8,
				new_frame as *mut u8,
				crate::memory::PAGE_SIZE,
			);
		}
		let flags = (pte & !(ADDR_MASK | COW)) | WRITABLE;
		self.set_pte(virt, (new_frame & ADDR_MASK) | flags);
		true
	}

	/// Clones this space copy-on-write: every present user leaf becomes
	/// non-writable with the CoW bit set in both spaces, sharing the
	/// underlying frame. Second-level tables are duplicated, not shared, so
	/// later divergence in one space cannot corrupt the other.
	pub fn clone_cow(&mut self) -> Self {
		let mut child = Self::new();
		for dir_idx in 0..USER_TABLES {
			let Some(frame) = self.tables[dir_idx] else {
				continue;
			};
			let src_table = unsafe { &mut *(frame as *mut Table) };
			let dst_table = child.ensure_table(dir_idx, true);
			for tbl_idx in 0..ENTRIES {
				let pte = src_table.entries[tbl_idx];
				if pte & PRESENT == 0 {
					continue;
				}
				let shared = (pte & !WRITABLE) | COW;
				src_table.entries[tbl_idx] = shared;
				dst_table.entries[tbl_idx] = shared;
				let virt = ((dir_idx as u32) << 22) | ((tbl_idx as u32) << 12);
				crate::arch::x86::invlpg(virt);
			}
		}
		child
	}

	/// Frees every frame referenced by a present user leaf, every user
	/// second-level table, then the directory itself. Kernel leaves are
	/// never touched.
	pub fn destroy(mut self) {
		for dir_idx in 0..USER_TABLES {
			let Some(frame) = self.tables[dir_idx].take() else {
				continue;
			};
			let table = unsafe { &*(frame as *const Table) };
			for entry in table.entries.iter() {
				if entry & PRESENT != 0 {
					pfa::free(entry & ADDR_MASK);
				}
			}
			pfa::free(frame);
		}
	}
}

/// Physical address of the kernel template's page directory, for tasks whose
/// owning address space aliases the kernel space.
pub fn kernel_cr3() -> u32 {
	let kernel = KERNEL_SPACE.lock();
	kernel.as_ref().expect("vmem::init must run first").cr3()
}

/// Maps `virt` to `phys` in the kernel template, the space every other
/// address space copies its upper directory entries from. Used by the heap
/// to grow its arena, which lives entirely in kernel space.
pub fn kernel_map(virt: u32, phys: u32, flags: u32) {
	let mut kernel = KERNEL_SPACE.lock();
	let kernel = kernel.as_mut().expect("vmem::init must run first");
	kernel.map(virt, phys, flags);
}

/// Switches the CPU's page-directory base register to `space`.
///
/// # Safety
///
/// `space` must identity-map or otherwise correctly map the code currently
/// executing, or the next instruction fetch faults.
pub unsafe fn activate(space: &AddressSpace) {
	unsafe {
		crate::arch::x86::write_cr3(space.cr3());
	}
}

#[cfg(feature = "selftest")]
pub fn selftest() {
	let mut parent = AddressSpace::new();
	let frame = pfa::alloc().expect("frame for selftest");
	parent.map(0x0040_0000, frame, WRITABLE | USER);
	let mut child = parent.clone_cow();
	assert_eq!(parent.pte(0x0040_0000).unwrap() & WRITABLE, 0);
	assert_eq!(child.pte(0x0040_0000).unwrap() & WRITABLE, 0);
	assert_eq!(parent.resolve(0x0040_0000), child.resolve(0x0040_0000));
	child.unmap(0x0040_0000);
	pfa::free(frame);
}

#[cfg(test)]
mod test {
	use super::*;

	#[test_case]
	fn vmem_map_resolve_roundtrip() {
		let mut space = AddressSpace::new();
		let frame = pfa::alloc().unwrap();
		space.map(0x0040_0000, frame, WRITABLE | USER);
		assert_eq!(space.resolve(0x0040_0000), frame);
		space.unmap(0x0040_0000);
		assert_eq!(space.resolve(0x0040_0000), 0);
		pfa::free(frame);
	}

	#[test_case]
	fn vmem_clone_cow_shares_frame_readonly() {
		let mut parent = AddressSpace::new();
		let frame = pfa::alloc().unwrap();
		parent.map(0x0040_0000, frame, WRITABLE | USER);
		let child = parent.clone_cow();
		assert_eq!(parent.pte(0x0040_0000).unwrap() & WRITABLE, 0);
		assert_eq!(parent.pte(0x0040_0000).unwrap() & COW, COW);
		assert_eq!(child.resolve(0x0040_0000), frame);
		pfa::free(frame);
	}

	#[test_case]
	fn vmem_user_and_kernel_tables_partition_directory() {
		assert_eq!(USER_TABLES + KERNEL_TABLES, ENTRIES);
	}
}
