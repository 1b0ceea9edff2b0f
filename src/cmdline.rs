//! Kernel command line parsing.
//!
//! The multiboot loader passes the kernel a single ASCII string. This module
//! splits it on whitespace and recognizes a small set of boot flags.

use core::str;

/// Splits `s` into whitespace-delimited tokens.
struct Tokens<'s> {
	s: &'s [u8],
	i: usize,
}

impl<'s> Iterator for Tokens<'s> {
	type Item = &'s [u8];

	fn next(&mut self) -> Option<Self::Item> {
		while self.i < self.s.len() && self.s[self.i].is_ascii_whitespace() {
			self.i += 1;
		}
		let start = self.i;
		while self.i < self.s.len() && !self.s[self.i].is_ascii_whitespace() {
			self.i += 1;
		}
		if self.i > start {
			Some(&self.s[start..self.i])
		} else {
			None
		}
	}
}

/// Parsed kernel command line.
pub struct ArgsParser {
	/// Whether the kernel suppresses console logging while booting.
	silent: bool,
	/// Whether the kernel runs its in-kernel self-test suite before starting
	/// the scheduler.
	selftest: bool,
}

impl ArgsParser {
	/// Parses `cmdline`. Unrecognized tokens are reported and skipped rather
	/// than treated as fatal, since a malformed command line should not
	/// prevent boot.
	pub fn parse(cmdline: &[u8]) -> Self {
		let mut s = Self {
			silent: false,
			selftest: false,
		};
		let mut tokens = Tokens {
			s: cmdline,
			i: 0,
		};
		while let Some(tok) = tokens.next() {
			match tok {
				b"-silent" => s.silent = true,
				b"-selftest" => s.selftest = true,
				_ => {
					if let Ok(tok) = str::from_utf8(tok) {
						crate::println!("cmdline: ignoring unrecognized argument `{tok}`");
					}
				}
			}
		}
		s
	}

	/// Whether the kernel should suppress console logging while booting.
	pub fn is_silent(&self) -> bool {
		self.silent
	}

	/// Whether the kernel should run its in-kernel self-test suite at boot.
	pub fn is_selftest(&self) -> bool {
		self.selftest
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test_case]
	fn cmdline_empty() {
		let p = ArgsParser::parse(b"");
		assert!(!p.is_silent());
		assert!(!p.is_selftest());
	}

	#[test_case]
	fn cmdline_silent() {
		let p = ArgsParser::parse(b"-silent");
		assert!(p.is_silent());
	}

	#[test_case]
	fn cmdline_selftest() {
		let p = ArgsParser::parse(b"-selftest -silent");
		assert!(p.is_silent());
		assert!(p.is_selftest());
	}

	#[test_case]
	fn cmdline_unknown_is_skipped_not_fatal() {
		let p = ArgsParser::parse(b"-bogus -silent");
		assert!(p.is_silent());
	}
}
