//! Remapping of generic signatures.
//!
//! See <https://docs.oracle.com/javase/specs/jvms/se22/html/jvms-4.html#jvms-4.7.9.1> for the grammar. All delimiters
//! are ascii, so scanning bytes never splits a multibyte character of an identifier.

use anyhow::{anyhow, bail, Context, Result};
use crate::Remapper;

pub(crate) fn map_signature<R: Remapper + ?Sized>(remapper: &R, signature: &str) -> Result<String> {
	let mut parser = Parser { remapper, signature, pos: 0, out: String::with_capacity(signature.len()) };
	parser.signature()
		.with_context(|| anyhow!("invalid signature {signature:?} at byte {}", parser.pos))?;
	Ok(parser.out)
}

struct Parser<'a, R: ?Sized> {
	remapper: &'a R,
	signature: &'a str,
	pos: usize,
	out: String,
}

impl<'a, R: Remapper + ?Sized> Parser<'a, R> {
	fn peek(&self) -> Option<u8> {
		self.signature.as_bytes().get(self.pos).copied()
	}

	fn next(&mut self) -> Result<u8> {
		let b = self.peek().context("unexpected end")?;
		self.pos += 1;
		Ok(b)
	}

	fn expect(&mut self, expected: u8) -> Result<()> {
		let b = self.next()?;
		if b != expected {
			bail!("expected {:?}, got {:?}", expected as char, b as char);
		}
		self.out.push(b as char);
		Ok(())
	}

	/// Reads up to, but excluding, the first byte matching `end`.
	fn identifier(&mut self, end: impl Fn(u8) -> bool) -> Result<&'a str> {
		let signature = self.signature;
		let start = self.pos;
		while !end(self.peek().context("unexpected end in identifier")?) {
			self.pos += 1;
		}
		if start == self.pos {
			bail!("empty identifier");
		}
		Ok(&signature[start..self.pos])
	}

	/// Any of a class, method or field signature.
	fn signature(&mut self) -> Result<()> {
		if self.peek() == Some(b'<') {
			self.type_parameters()?;
		}

		if self.peek() == Some(b'(') {
			self.expect(b'(')?;
			while self.peek() != Some(b')') {
				self.java_type()?;
			}
			self.expect(b')')?;

			if self.peek() == Some(b'V') {
				self.expect(b'V')?;
			} else {
				self.java_type()?;
			}

			while self.peek() == Some(b'^') {
				self.expect(b'^')?;
				self.reference_type()?;
			}
		} else {
			// super class and interfaces, or the single type of a field
			self.reference_type()?;
			while self.peek().is_some() {
				self.reference_type()?;
			}
		}

		if self.peek().is_some() {
			bail!("trailing data");
		}
		Ok(())
	}

	fn type_parameters(&mut self) -> Result<()> {
		self.expect(b'<')?;
		while self.peek() != Some(b'>') {
			let name = self.identifier(|b| b == b':')?;
			self.out.push_str(name);

			// class bound, which may be empty, then any number of interface bounds
			self.expect(b':')?;
			if matches!(self.peek(), Some(b'L' | b'T' | b'[')) {
				self.reference_type()?;
			}
			while self.peek() == Some(b':') {
				self.expect(b':')?;
				self.reference_type()?;
			}
		}
		self.expect(b'>')
	}

	fn java_type(&mut self) -> Result<()> {
		match self.peek() {
			Some(b @ (b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z')) => self.expect(b),
			_ => self.reference_type(),
		}
	}

	fn reference_type(&mut self) -> Result<()> {
		match self.peek() {
			Some(b'L') => self.class_type(),
			Some(b'T') => {
				self.expect(b'T')?;
				let name = self.identifier(|b| b == b';')?;
				self.out.push_str(name);
				self.expect(b';')
			},
			Some(b'[') => {
				self.expect(b'[')?;
				self.java_type()
			},
			Some(b) => bail!("unexpected {:?}, expected a reference type", b as char),
			None => bail!("unexpected end, expected a reference type"),
		}
	}

	fn class_type(&mut self) -> Result<()> {
		self.expect(b'L')?;

		let end = |b: u8| matches!(b, b'<' | b'.' | b';');

		let mut old_name = self.identifier(end)?.to_owned();
		let mut new_name = self.remapper.map_class(&old_name);
		self.out.push_str(&new_name);

		loop {
			match self.peek() {
				Some(b'<') => self.type_arguments()?,
				Some(b'.') => {
					self.expect(b'.')?;
					let inner = self.identifier(end)?;

					let old_inner = format!("{old_name}${inner}");
					let new_inner = self.remapper.map_class(&old_inner);

					let new_outer_prefix = format!("{new_name}$");
					let simple_name = match new_inner.strip_prefix(&new_outer_prefix) {
						Some(simple_name) => simple_name,
						None => new_inner.rsplit_once('$').map_or(new_inner.as_str(), |(_, simple)| simple),
					};
					self.out.push_str(simple_name);

					old_name = old_inner;
					new_name = new_inner;
				},
				_ => return self.expect(b';'),
			}
		}
	}

	fn type_arguments(&mut self) -> Result<()> {
		self.expect(b'<')?;
		while self.peek() != Some(b'>') {
			match self.peek() {
				Some(b'*') => self.expect(b'*')?,
				Some(b @ (b'+' | b'-')) => {
					self.expect(b)?;
					self.reference_type()?;
				},
				_ => self.reference_type()?,
			}
		}
		self.expect(b'>')
	}
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::Remapper;
	use crate::remapper::testing::remapper;

	#[test]
	fn field() -> Result<()> {
		let r = remapper();
		assert_eq!(r.map_signature("Ljava/util/List<La;>;")?, "Ljava/util/List<Lpkg/Apple;>;");
		assert_eq!(r.map_signature("TT;")?, "TT;");
		assert_eq!(r.map_signature("[Ljava/util/Map<+La;*-[Lc;>;")?, "[Ljava/util/Map<+Lpkg/Apple;*-[Lpkg/Core;>;");
		Ok(())
	}

	#[test]
	fn class() -> Result<()> {
		let r = remapper();
		assert_eq!(
			r.map_signature("<T:La;U::Ljava/lang/Comparable<TT;>;>Lc;Ljava/lang/Iterable<TU;>;")?,
			"<T:Lpkg/Apple;U::Ljava/lang/Comparable<TT;>;>Lpkg/Core;Ljava/lang/Iterable<TU;>;"
		);
		Ok(())
	}

	#[test]
	fn method() -> Result<()> {
		let r = remapper();
		assert_eq!(
			r.map_signature("<E:Ljava/lang/Exception;>(ILjava/util/List<La;>;)Lc;^TE;^La;")?,
			"<E:Ljava/lang/Exception;>(ILjava/util/List<Lpkg/Apple;>;)Lpkg/Core;^TE;^Lpkg/Apple;"
		);
		assert_eq!(r.map_signature("()V")?, "()V");
		Ok(())
	}

	#[test]
	fn inner_class_types() -> Result<()> {
		let r = remapper();
		assert_eq!(r.map_signature("La<TT;>.b;")?, "Lpkg/Apple<TT;>.Seed;");
		// unmapped inner classes keep their simple name
		assert_eq!(r.map_signature("Lc<TT;>.x;")?, "Lpkg/Core<TT;>.x;");
		Ok(())
	}

	#[test]
	fn malformed() {
		let r = remapper();
		assert!(r.map_signature("Ljava/util/List<La;>").is_err());
		assert!(r.map_signature("(I").is_err());
		assert!(r.map_signature("Q").is_err());
		assert!(r.map_signature("").is_err());
	}
}
