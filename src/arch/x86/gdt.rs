//! The Global Descriptor Table.
//!
//! x86 protected mode requires a GDT to describe the flat kernel/user code
//! and data segments and to install the Task State Segment the CPU reloads
//! `esp0` from on every ring 3 -> ring 0 transition.

use core::arch::asm;
use core::mem::size_of;

/// Kernel code segment selector.
pub const KERNEL_CS: u16 = 0x08;
/// Kernel data segment selector.
pub const KERNEL_DS: u16 = 0x10;
/// User code segment selector (RPL 3).
pub const USER_CS: u16 = 0x1B;
/// User data segment selector (RPL 3).
pub const USER_DS: u16 = 0x23;
/// TSS selector.
const TSS_SEL: u16 = 0x28;

const GDT_ENTRIES: usize = 6;

#[repr(C, packed)]
#[derive(Clone, Copy, Default)]
struct Entry {
	limit_low: u16,
	base_low: u16,
	base_middle: u8,
	access: u8,
	granularity: u8,
	base_high: u8,
}

impl Entry {
	const fn new(base: u32, limit: u32, access: u8, gran: u8) -> Self {
		Self {
			limit_low: (limit & 0xFFFF) as u16,
			base_low: (base & 0xFFFF) as u16,
			base_middle: ((base >> 16) & 0xFF) as u8,
			access,
			granularity: (((limit >> 16) & 0x0F) as u8) | (gran & 0xF0),
			base_high: ((base >> 24) & 0xFF) as u8,
		}
	}
}

#[repr(C, packed)]
struct Ptr {
	limit: u16,
	base: u32,
}

/// The Task State Segment.
///
/// Only `ss0`/`esp0` are used: the kernel has no hardware task switching, but
/// the CPU reads this structure on every privilege-level change to find the
/// kernel stack for the interrupted task.
#[repr(C, packed)]
struct Tss {
	prev_tss: u32,
	esp0: u32,
	ss0: u32,
	_rest: [u32; 23],
	iomap_base: u16,
}

static mut GDT: [Entry; GDT_ENTRIES] = [Entry {
	limit_low: 0,
	base_low: 0,
	base_middle: 0,
	access: 0,
	granularity: 0,
	base_high: 0,
}; GDT_ENTRIES];

static mut TSS: Tss = Tss {
	prev_tss: 0,
	esp0: 0,
	ss0: 0,
	_rest: [0; 23],
	iomap_base: size_of::<Tss>() as u16,
};

/// Installs the GDT and TSS and reloads every segment register.
///
/// Must run once, before interrupts are enabled.
pub fn init() {
	unsafe {
		let tss_base = core::ptr::addr_of!(TSS) as u32;
		let tss_limit = tss_base + size_of::<Tss>() as u32;

		GDT[0] = Entry::new(0, 0, 0x00, 0x00);
		GDT[1] = Entry::new(0, 0xFFFFFFFF, 0x9A, 0xCF); // kernel code
		GDT[2] = Entry::new(0, 0xFFFFFFFF, 0x92, 0xCF); // kernel data
		GDT[3] = Entry::new(0, 0xFFFFFFFF, 0xFA, 0xCF); // user code, DPL 3
		GDT[4] = Entry::new(0, 0xFFFFFFFF, 0xF2, 0xCF); // user data, DPL 3
		GDT[5] = Entry::new(tss_base, tss_limit, 0x89, 0x00);

		TSS.ss0 = KERNEL_DS as u32;
		TSS.esp0 = 0;

		let ptr = Ptr {
			limit: (size_of::<Entry>() * GDT_ENTRIES - 1) as u16,
			base: core::ptr::addr_of!(GDT) as u32,
		};
		asm!(
			"lgdt [{ptr}]",
			"mov ax, {kds:x}",
			"mov ds, ax",
			"mov es, ax",
			"mov fs, ax",
			"mov gs, ax",
			"mov ss, ax",
			"push {kcs}",
			"lea eax, [2f]",
			"push eax",
			"retf",
			"2:",
			ptr = in(reg) &ptr,
			kds = in(reg) KERNEL_DS as u32,
			kcs = in(reg) KERNEL_CS as u32,
			out("eax") _,
			options(nostack),
		);
		asm!("ltr {0:x}", in(reg) TSS_SEL, options(nostack, nomem));
	}
}

/// Reprograms the TSS's kernel-stack pointer.
///
/// The scheduler calls this on every context switch so that the next
/// ring 3 -> ring 0 transition lands on the new task's kernel stack.
pub fn set_kernel_stack(esp0: u32) {
	unsafe {
		TSS.esp0 = esp0;
	}
}
