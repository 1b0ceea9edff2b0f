//! The 8253/8254 Programmable Interval Timer, programmed to fire IRQ0 at the
//! scheduler's 100 Hz tick rate.

use super::outb;

/// The PIT's oscillator frequency, in Hz.
const PIT_FREQUENCY: u32 = 1_193_182;
/// The scheduler's tick rate.
pub const TICK_HZ: u32 = 100;

const CHANNEL0_DATA: u16 = 0x40;
const COMMAND: u16 = 0x43;

/// Programs channel 0 in mode 3 (square wave) to fire at [`TICK_HZ`].
pub fn init() {
	let divisor = PIT_FREQUENCY / TICK_HZ;
	unsafe {
		outb(COMMAND, 0x36);
		outb(CHANNEL0_DATA, (divisor & 0xFF) as u8);
		outb(CHANNEL0_DATA, ((divisor >> 8) & 0xFF) as u8);
	}
}
