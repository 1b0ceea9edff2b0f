//! The bare-metal kernel executable.
//!
//! All of the actual logic lives in the `kernel` library crate (`src/kernel.rs`);
//! this binary only exists so Cargo produces the `maestro` ELF that the
//! multiboot stub in `arch/x86/boot.s` is linked into.

#![no_std]
#![no_main]

use kernel as _;
