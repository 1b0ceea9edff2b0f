//! The physical frame allocator.
//!
//! A bitmap, one bit per 4 KiB frame, covering up to [`crate::config::MAX_PHYS_MEM`].
//! No coalescing: frames are fixed-size, so there is nothing to merge.

use crate::config::{MAX_PHYS_MEM, PAGE_SIZE};
use crate::sync::spin::IntMutex;

const FRAME_COUNT: usize = MAX_PHYS_MEM / PAGE_SIZE;
const WORDS: usize = FRAME_COUNT / 32;

struct Bitmap {
	words: [u32; WORDS],
	used: usize,
	total: usize,
}

impl Bitmap {
	const fn new() -> Self {
		Self {
			words: [u32::MAX; WORDS],
			used: 0,
			total: 0,
		}
	}

	fn is_set(&self, frame: usize) -> bool {
		self.words[frame / 32] & (1 << (frame % 32)) != 0
	}

	fn set(&mut self, frame: usize) {
		self.words[frame / 32] |= 1 << (frame % 32);
	}

	fn clear(&mut self, frame: usize) {
		self.words[frame / 32] &= !(1 << (frame % 32));
	}

	fn find_clear(&self) -> Option<usize> {
		for (i, &word) in self.words.iter().enumerate() {
			if word != u32::MAX {
				let bit = word.trailing_ones() as usize;
				let frame = i * 32 + bit;
				if frame < self.total {
					return Some(frame);
				}
				return None;
			}
		}
		None
	}
}

static STATE: IntMutex<Bitmap> = IntMutex::new(Bitmap::new());

/// Marks all frames used, then clears the range
/// `[first_free, total_mem_bytes)`, rounded to page boundaries.
///
/// `first_free` is typically [`crate::memory::kernel_end`]: frames below it
/// hold the kernel image and must never be handed out.
pub fn init(total_mem_bytes: u32, first_free: u32) {
	let mut s = STATE.lock();
	let total_frames = (total_mem_bytes as usize / PAGE_SIZE).min(FRAME_COUNT);
	s.total = total_frames;
	for word in s.words.iter_mut() {
		*word = u32::MAX;
	}
	let first_frame = crate::memory::page_align_up(first_free) as usize / PAGE_SIZE;
	s.used = first_frame;
	for frame in first_frame..total_frames {
		s.clear(frame);
	}
}

/// Allocates one physical frame, returning its base address, or `None` if
/// none remain.
pub fn alloc() -> Option<u32> {
	let mut s = STATE.lock();
	let frame = s.find_clear()?;
	s.set(frame);
	s.used += 1;
	Some((frame * PAGE_SIZE) as u32)
}

/// Frees the frame at `addr`. Idempotent: freeing an already-free frame is
/// a no-op.
pub fn free(addr: u32) {
	let frame = addr as usize / PAGE_SIZE;
	let mut s = STATE.lock();
	if frame >= s.total || !s.is_set(frame) {
		return;
	}
	s.clear(frame);
	s.used -= 1;
}

/// Number of frames currently allocated.
pub fn used_count() -> usize {
	STATE.lock().used
}

#[cfg(feature = "selftest")]
pub fn selftest() {
	let before = used_count();
	let a = alloc().expect("frame available for selftest");
	let b = alloc().expect("frame available for selftest");
	assert_ne!(a, b);
	assert_eq!(used_count(), before + 2);
	free(a);
	free(b);
	assert_eq!(used_count(), before);
}

#[cfg(test)]
mod test {
	use super::*;

	fn reset() {
		init(MAX_PHYS_MEM as u32, 0);
	}

	#[test_case]
	fn pfa_alloc_free_roundtrip() {
		reset();
		let before = used_count();
		let f = alloc().unwrap();
		assert_eq!(used_count(), before + 1);
		free(f);
		assert_eq!(used_count(), before);
	}

	#[test_case]
	fn pfa_free_is_idempotent() {
		reset();
		let f = alloc().unwrap();
		free(f);
		let before = used_count();
		free(f);
		assert_eq!(used_count(), before);
	}

	#[test_case]
	fn pfa_allocations_are_distinct() {
		reset();
		let a = alloc().unwrap();
		let b = alloc().unwrap();
		assert_ne!(a, b);
		free(a);
		free(b);
	}

	#[test_case]
	fn pfa_reserves_below_first_free() {
		init(MAX_PHYS_MEM as u32, (64 * PAGE_SIZE) as u32);
		for _ in 0..64 {
			alloc().unwrap();
		}
		assert!(alloc().unwrap() >= (65 * PAGE_SIZE) as u32);
	}
}
