//! The Interrupt Descriptor Table.
//!
//! Installs the CPU exception vectors, the two remapped PIC IRQ ranges, and
//! the `int 0x80` syscall gate, all pointing at the entry thunks compiled
//! from `arch/x86/interrupt.s`. From here on, every trap reaches
//! [`isr_handler_rs`] or [`irq_handler_rs`] with a uniform [`Regs`] frame.

use super::gdt::KERNEL_CS;
use crate::{debug, process, process::regs::Regs, syscall};
use core::arch::asm;
use core::mem::size_of;

const ENTRIES: usize = 129;

#[repr(C, packed)]
#[derive(Clone, Copy, Default)]
struct Entry {
	offset_low: u16,
	selector: u16,
	zero: u8,
	type_attr: u8,
	offset_high: u16,
}

impl Entry {
	const fn new(base: u32, selector: u16, flags: u8) -> Self {
		Self {
			offset_low: (base & 0xFFFF) as u16,
			offset_high: ((base >> 16) & 0xFFFF) as u16,
			selector,
			zero: 0,
			type_attr: flags,
		}
	}
}

#[repr(C, packed)]
struct Ptr {
	limit: u16,
	base: u32,
}

static mut IDT: [Entry; ENTRIES] = [Entry {
	offset_low: 0,
	selector: 0,
	zero: 0,
	type_attr: 0,
	offset_high: 0,
}; ENTRIES];

/// Present, ring 0, 32-bit interrupt gate.
const GATE_KERNEL: u8 = 0x8E;
/// Present, ring 3, 32-bit interrupt gate: reachable from userspace (used
/// only for the syscall vector).
const GATE_USER: u8 = 0xEE;

macro_rules! isr_symbols {
	($($name:ident),* $(,)?) => {
		extern "C" {
			$(fn $name();)*
		}
	};
}

isr_symbols!(
	isr0, isr1, isr2, isr3, isr4, isr5, isr6, isr7, isr8, isr9, isr10, isr11, isr12, isr13, isr14,
	isr15, isr16, isr17, isr18, isr19, isr128, irq0, irq1, irq2, irq3, irq4, irq5, irq6, irq7,
	irq8, irq9, irq10, irq11, irq12, irq13, irq14, irq15,
);

/// Installs the IDT. Does not enable interrupts; the caller must do that
/// only after the PIC has been remapped and the rest of boot has run.
pub fn init() {
	unsafe {
		let isrs: [unsafe extern "C" fn(); 20] = [
			isr0, isr1, isr2, isr3, isr4, isr5, isr6, isr7, isr8, isr9, isr10, isr11, isr12,
			isr13, isr14, isr15, isr16, isr17, isr18, isr19,
		];
		for (i, f) in isrs.into_iter().enumerate() {
			IDT[i] = Entry::new(f as usize as u32, KERNEL_CS, GATE_KERNEL);
		}
		let irqs: [unsafe extern "C" fn(); 16] = [
			irq0, irq1, irq2, irq3, irq4, irq5, irq6, irq7, irq8, irq9, irq10, irq11, irq12,
			irq13, irq14, irq15,
		];
		for (i, f) in irqs.into_iter().enumerate() {
			IDT[32 + i] = Entry::new(f as usize as u32, KERNEL_CS, GATE_KERNEL);
		}
		IDT[128] = Entry::new(isr128 as usize as u32, KERNEL_CS, GATE_USER);

		let ptr = Ptr {
			limit: (size_of::<Entry>() * ENTRIES - 1) as u16,
			base: core::ptr::addr_of!(IDT) as u32,
		};
		asm!("lidt [{0}]", in(reg) &ptr, options(nostack));
	}
}

/// Bit 0 of the page-fault error code: the page was present.
pub const PF_PRESENT: u32 = 1 << 0;
/// Bit 1: the fault was caused by a write.
pub const PF_WRITE: u32 = 1 << 1;
/// Bit 2: the fault happened in user mode.
pub const PF_USER: u32 = 1 << 2;

const PAGE_FAULT_VECTOR: u32 = 14;

static EXCEPTION_NAMES: [&str; 20] = [
	"Division by zero",
	"Debug",
	"NMI",
	"Breakpoint",
	"Overflow",
	"Bounds exceeded",
	"Invalid opcode",
	"Device not available",
	"Double fault",
	"Coprocessor segment overrun",
	"Invalid TSS",
	"Segment not present",
	"Stack segment fault",
	"General protection fault",
	"Page fault",
	"Unknown",
	"FPU error",
	"Alignment check",
	"Machine check",
	"SIMD error",
];

/// Called from `isr_common_stub`. Demultiplexes CPU exceptions, the page
/// fault, and `int 0x80` syscalls.
#[unsafe(no_mangle)]
extern "C" fn isr_handler_rs(frame: *mut Regs) {
	let frame = unsafe { &mut *frame };
	if frame.int_no == 128 {
		syscall::dispatch(frame);
		return;
	}
	if frame.int_no == PAGE_FAULT_VECTOR {
		let addr = super::read_cr2();
		if !process::mem::handle_page_fault(addr, frame.err_code) {
			debug::fatal_fault(addr, frame);
		}
		return;
	}
	let name = EXCEPTION_NAMES
		.get(frame.int_no as usize)
		.copied()
		.unwrap_or("Unknown exception");
	debug::fatal_exception(name, frame);
}

/// Called from `irq_common_stub`. Only the timer (IRQ0) and keyboard (IRQ1)
/// are wired up; every other line is acknowledged and ignored.
#[unsafe(no_mangle)]
extern "C" fn irq_handler_rs(frame: *mut Regs) {
	let frame = unsafe { &mut *frame };
	let irq = frame.int_no - 32;
	match irq {
		0 => process::scheduler::tick(),
		1 => {
			let scancode = unsafe { super::inb(0x60) };
			super::keyboard::handle_scancode(scancode);
		}
		_ => {}
	}
	super::pic::eoi(irq);
}
