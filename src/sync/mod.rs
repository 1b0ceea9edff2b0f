//! Synchronization primitives for the uniprocessor, interrupt-driven
//! concurrency model described in the kernel's design: global tables are
//! mutated only from kernel mode, and any critical section that is not
//! atomic with respect to interrupts must disable them for its duration.

pub mod spin;
