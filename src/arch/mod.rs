//! Architecture-specific glue.
//!
//! The kernel targets 32-bit protected-mode x86 exclusively; this module
//! exists as a seam so the rest of the kernel never reaches for `asm!`
//! directly.

pub mod x86;
