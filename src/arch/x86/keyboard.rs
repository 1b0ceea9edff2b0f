//! PS/2 keyboard scancode handling.
//!
//! This is an external collaborator in the kernel's design: the core only
//! needs a bounded ring of decoded characters for [`crate::device::tty`]'s
//! `readline` to drain. Scancode-to-ASCII translation is deliberately
//! minimal (US QWERTY, no dead keys) since richer keymaps are out of scope.

use crate::sync::spin::IntMutex;

const RING_SIZE: usize = 256;

struct Ring {
	buf: [u8; RING_SIZE],
	head: usize,
	tail: usize,
}

impl Ring {
	const fn new() -> Self {
		Self {
			buf: [0; RING_SIZE],
			head: 0,
			tail: 0,
		}
	}

	fn push(&mut self, c: u8) {
		let next = (self.tail + 1) % RING_SIZE;
		if next == self.head {
			return; // ring full: drop the keystroke
		}
		self.buf[self.tail] = c;
		self.tail = next;
	}

	fn pop(&mut self) -> Option<u8> {
		if self.head == self.tail {
			return None;
		}
		let c = self.buf[self.head];
		self.head = (self.head + 1) % RING_SIZE;
		Some(c)
	}
}

static RING: IntMutex<Ring> = IntMutex::new(Ring::new());

/// Lower-case set 1 scancode -> ASCII table, covering the alphanumeric rows.
/// Scancodes with bit 7 set are key-up events and are ignored.
const SET1_LOWER: [u8; 59] = [
	0, 27, b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'0', b'-', b'=', 8, b'\t', b'q',
	b'w', b'e', b'r', b't', b'y', b'u', b'i', b'o', b'p', b'[', b']', b'\n', 0, b'a', b's', b'd',
	b'f', b'g', b'h', b'j', b'k', b'l', b';', b'\'', b'`', 0, b'\\', b'z', b'x', b'c', b'v', b'b',
	b'n', b'm', b',', b'.', b'/', 0, b'*', 0, b' ',
];

/// Called from the IRQ1 handler with the raw byte read from port `0x60`.
pub fn handle_scancode(scancode: u8) {
	if scancode & 0x80 != 0 {
		return; // key release
	}
	if let Some(&c) = SET1_LOWER.get(scancode as usize) {
		if c != 0 {
			RING.lock().push(c);
		}
	}
}

/// Pops one decoded character, if any are buffered.
pub fn read_char() -> Option<u8> {
	RING.lock().pop()
}
