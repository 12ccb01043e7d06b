//! The big-endian items class files are made of.
//!
//! Reading works on a borrowed slice, so that errors can tell at which offset the data ended. Writing always goes to a
//! `Vec<u8>`, the finished class is copied out in one piece.

use anyhow::{anyhow, Context, Result};

/// A position in a byte slice, advanced by every read.
#[derive(Debug, Clone)]
pub(crate) struct Reader<'a> {
	data: &'a [u8],
	position: usize,
}

impl<'a> Reader<'a> {
	pub(crate) fn new(data: &'a [u8]) -> Reader<'a> {
		Reader { data, position: 0 }
	}

	pub(crate) fn position(&self) -> usize {
		self.position
	}

	pub(crate) fn remaining(&self) -> usize {
		self.data.len() - self.position
	}

	/// Takes the next `length` bytes, without copying them.
	pub(crate) fn take(&mut self, length: usize) -> Result<&'a [u8]> {
		let data: &'a [u8] = self.data;
		let bytes = self.position.checked_add(length)
			.and_then(|end| data.get(self.position..end))
			.with_context(|| anyhow!("data ends early: wanted {length} bytes at offset {}, but only {} are left", self.position, self.remaining()))?;
		self.position += length;
		Ok(bytes)
	}

	fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
		Ok(self.take(N)?.try_into()?)
	}

	pub(crate) fn u8(&mut self) -> Result<u8> {
		Ok(u8::from_be_bytes(self.array()?))
	}

	pub(crate) fn u16(&mut self) -> Result<u16> {
		Ok(u16::from_be_bytes(self.array()?))
	}

	pub(crate) fn u32(&mut self) -> Result<u32> {
		Ok(u32::from_be_bytes(self.array()?))
	}

	pub(crate) fn u64(&mut self) -> Result<u64> {
		Ok(u64::from_be_bytes(self.array()?))
	}

	/// A length or count stored as `u16`.
	pub(crate) fn u16_len(&mut self) -> Result<usize> {
		Ok(usize::from(self.u16()?))
	}

	/// A length stored as `u32`.
	pub(crate) fn u32_len(&mut self) -> Result<usize> {
		let length = self.u32()?;
		usize::try_from(length).with_context(|| anyhow!("length {length} doesn't fit into memory"))
	}

	/// Reads a `u16` count, then that many items.
	pub(crate) fn list<T>(&mut self, mut item: impl FnMut(&mut Self) -> Result<T>) -> Result<Vec<T>> {
		let count = self.u16_len()?;
		let mut items = Vec::with_capacity(count);
		for _ in 0..count {
			items.push(item(self)?);
		}
		Ok(items)
	}
}

/// Appending items to a class file being built.
pub(crate) trait Put {
	fn put_u8(&mut self, value: u8);
	fn put_u16(&mut self, value: u16);
	fn put_u32(&mut self, value: u32);
	fn put_u64(&mut self, value: u64);
	fn put_bytes(&mut self, bytes: &[u8]);

	/// Puts a length or count as `u16`, failing if it's too large.
	fn put_u16_len(&mut self, length: usize) -> Result<()> {
		let length = u16::try_from(length).with_context(|| anyhow!("{length} is too large, at most {} fit", u16::MAX))?;
		self.put_u16(length);
		Ok(())
	}

	fn put_u32_len(&mut self, length: usize) -> Result<()> {
		let length = u32::try_from(length).with_context(|| anyhow!("{length} is too large, at most {} fit", u32::MAX))?;
		self.put_u32(length);
		Ok(())
	}

	/// Puts the `u16` count of `items`, then every item.
	fn put_list<T>(&mut self, items: &[T], mut put: impl FnMut(&mut Self, &T) -> Result<()>) -> Result<()> {
		self.put_u16_len(items.len())?;
		for item in items {
			put(self, item)?;
		}
		Ok(())
	}
}

impl Put for Vec<u8> {
	fn put_u8(&mut self, value: u8) {
		self.push(value);
	}

	fn put_u16(&mut self, value: u16) {
		self.extend_from_slice(&value.to_be_bytes());
	}

	fn put_u32(&mut self, value: u32) {
		self.extend_from_slice(&value.to_be_bytes());
	}

	fn put_u64(&mut self, value: u64) {
		self.extend_from_slice(&value.to_be_bytes());
	}

	fn put_bytes(&mut self, bytes: &[u8]) {
		self.extend_from_slice(bytes);
	}
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::bytes::{Put, Reader};

	#[test]
	fn items_are_big_endian() -> Result<()> {
		let mut reader = Reader::new(&[0xca, 0xfe, 0xba, 0xbe, 0x00, 0x02, 0x00, 0x07, 0x00, 0x09, 0xff]);
		assert_eq!(reader.u32()?, 0xcafe_babe);
		assert_eq!(reader.list(|r| r.u16())?, vec![7, 9]);
		assert_eq!(reader.position(), 10);
		assert_eq!(reader.u8()?, 0xff);
		assert_eq!(reader.remaining(), 0);
		Ok(())
	}

	#[test]
	fn reading_past_the_end_fails() -> Result<()> {
		let mut reader = Reader::new(&[1, 2, 3]);
		assert_eq!(reader.u16()?, 0x0102);

		let error = reader.u32().err().map(|e| e.to_string());
		assert_eq!(error.as_deref(), Some("data ends early: wanted 4 bytes at offset 2, but only 1 are left"));
		// nothing was consumed
		assert_eq!(reader.u8()?, 3);

		assert!(Reader::new(&[]).take(usize::MAX).is_err());
		Ok(())
	}

	#[test]
	fn lengths_must_fit() -> Result<()> {
		let mut out = Vec::new();
		out.put_u16_len(0xffff)?;
		out.put_list(&[1u64], |out, &x| {
			out.put_u64(x);
			Ok(())
		})?;
		assert_eq!(out, vec![0xff, 0xff, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1]);

		assert!(out.put_u16_len(0x1_0000).is_err());
		assert_eq!(out.len(), 12);
		Ok(())
	}
}
