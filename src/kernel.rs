//! Maestro is a small preemptively-multitasked kernel for 32-bit
//! protected-mode x86.
//!
//! It boots from a multiboot-compliant loader, brings up paging and a kernel
//! heap, mounts an in-memory filesystem, and runs cooperating kernel-thread
//! processes that reach kernel services through a software-interrupt
//! system-call interface.
//!
//! # Features
//!
//! - `selftest`: builds in the in-kernel self-test harness, run before the
//!   first user-visible task starts when the `-selftest` boot flag is given.
//! - `strace`: traces every system call through the logger.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![feature(alloc_error_handler)]
#![test_runner(crate::selftest::runner)]
#![reexport_test_harness_main = "kernel_selftest"]
#![allow(clippy::missing_safety_doc)]
#![allow(dead_code)]

extern crate alloc;

#[macro_use]
pub mod print;
pub mod arch;
pub mod cmdline;
pub mod config;
pub mod debug;
pub mod device;
pub mod errno;
pub mod file;
pub mod logger;
pub mod memory;
mod panic;
pub mod process;
pub mod selftest;
pub mod sync;
pub mod syscall;

use core::ffi::c_void;

/// The kernel's name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
/// Current kernel version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Entry point called by the multiboot stub in `arch/x86/boot.s`.
///
/// `magic` is the multiboot magic number left in `eax` by the loader;
/// `multiboot_ptr` is the loader's info structure, left in `ebx`.
#[unsafe(no_mangle)]
pub extern "C" fn kernel_main(magic: u32, multiboot_ptr: *const c_void) -> ! {
	device::serial::init();
	device::tty::init();

	println!("Boot {NAME} version {VERSION}");

	let boot_info = unsafe { arch::x86::multiboot::read(magic, multiboot_ptr) };
	let cmdline = cmdline::ArgsParser::parse(boot_info.cmdline());
	logger::LOGGER.lock().silent = cmdline.is_silent();

	println!("Setup memory management");
	memory::pfa::init(boot_info.mem_upper_bytes(), memory::kernel_end());
	memory::vmem::init();
	memory::malloc::init();

	println!("Setup interrupt handling");
	arch::x86::gdt::init();
	arch::x86::idt::init();
	arch::x86::pic::init();
	arch::x86::pit::init();

	println!("Setup files management");
	file::init();

	println!("Setup process management");
	process::init();

	#[cfg(test)]
	kernel_selftest();

	#[cfg(feature = "selftest")]
	if cmdline.is_selftest() {
		selftest::run_all();
	}

	println!("Starting scheduler");
	arch::x86::sti();
	process::scheduler::run();
}
