//! The constant pool of a class file.
//!
//! Indices into the pool never change: reading keeps every entry at the index it was read from, and new entries are
//! only ever appended. This way everything referencing the pool by index (bytecode, stack map frames, attributes we
//! don't know about) stays valid no matter what we rewrite.

use std::collections::HashMap;
use anyhow::{anyhow, bail, Context, Result};
use crate::constants::pool;
use crate::bytes::{Put, Reader};
use crate::jstring;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PoolEntry {
	Class { name_index: u16 },
	FieldRef { class_index: u16, name_and_type_index: u16 },
	MethodRef { class_index: u16, name_and_type_index: u16 },
	InterfaceMethodRef { class_index: u16, name_and_type_index: u16 },
	String { string_index: u16 },
	Integer { bytes: u32 },
	Float { bytes: u32 },
	Long { bytes: u64 },
	Double { bytes: u64 },
	NameAndType { name_index: u16, descriptor_index: u16 },
	/// The raw modified utf8 contents, as they appear in the class file.
	Utf8 { bytes: Vec<u8> },
	MethodHandle { reference_kind: u8, reference_index: u16 },
	MethodType { descriptor_index: u16 },
	Dynamic { bootstrap_method_attribute_index: u16, name_and_type_index: u16 },
	InvokeDynamic { bootstrap_method_attribute_index: u16, name_and_type_index: u16 },
	Module { name_index: u16 },
	Package { name_index: u16 },
}

impl PoolEntry {
	/// Long and double take up two pool slots.
	fn is_wide(&self) -> bool {
		matches!(self, PoolEntry::Long { .. } | PoolEntry::Double { .. })
	}

	fn read(reader: &mut Reader) -> Result<PoolEntry> {
		Ok(match reader.u8()? {
			pool::UTF8 => {
				let length = reader.u16_len()?;
				PoolEntry::Utf8 { bytes: reader.take(length)?.to_vec() }
			},
			pool::INTEGER => PoolEntry::Integer { bytes: reader.u32()? },
			pool::FLOAT => PoolEntry::Float { bytes: reader.u32()? },
			pool::LONG => PoolEntry::Long { bytes: reader.u64()? },
			pool::DOUBLE => PoolEntry::Double { bytes: reader.u64()? },
			pool::CLASS => PoolEntry::Class { name_index: reader.u16()? },
			pool::STRING => PoolEntry::String { string_index: reader.u16()? },
			pool::FIELD_REF => PoolEntry::FieldRef {
				class_index: reader.u16()?,
				name_and_type_index: reader.u16()?,
			},
			pool::METHOD_REF => PoolEntry::MethodRef {
				class_index: reader.u16()?,
				name_and_type_index: reader.u16()?,
			},
			pool::INTERFACE_METHOD_REF => PoolEntry::InterfaceMethodRef {
				class_index: reader.u16()?,
				name_and_type_index: reader.u16()?,
			},
			pool::NAME_AND_TYPE => PoolEntry::NameAndType {
				name_index: reader.u16()?,
				descriptor_index: reader.u16()?,
			},
			pool::METHOD_HANDLE => PoolEntry::MethodHandle {
				reference_kind: reader.u8()?,
				reference_index: reader.u16()?,
			},
			pool::METHOD_TYPE => PoolEntry::MethodType { descriptor_index: reader.u16()? },
			pool::DYNAMIC => PoolEntry::Dynamic {
				bootstrap_method_attribute_index: reader.u16()?,
				name_and_type_index: reader.u16()?,
			},
			pool::INVOKE_DYNAMIC => PoolEntry::InvokeDynamic {
				bootstrap_method_attribute_index: reader.u16()?,
				name_and_type_index: reader.u16()?,
			},
			pool::MODULE => PoolEntry::Module { name_index: reader.u16()? },
			pool::PACKAGE => PoolEntry::Package { name_index: reader.u16()? },
			tag => bail!("unknown constant pool tag {tag}"),
		})
	}

	fn tag(&self) -> u8 {
		match self {
			PoolEntry::Class { .. } => pool::CLASS,
			PoolEntry::FieldRef { .. } => pool::FIELD_REF,
			PoolEntry::MethodRef { .. } => pool::METHOD_REF,
			PoolEntry::InterfaceMethodRef { .. } => pool::INTERFACE_METHOD_REF,
			PoolEntry::String { .. } => pool::STRING,
			PoolEntry::Integer { .. } => pool::INTEGER,
			PoolEntry::Float { .. } => pool::FLOAT,
			PoolEntry::Long { .. } => pool::LONG,
			PoolEntry::Double { .. } => pool::DOUBLE,
			PoolEntry::NameAndType { .. } => pool::NAME_AND_TYPE,
			PoolEntry::Utf8 { .. } => pool::UTF8,
			PoolEntry::MethodHandle { .. } => pool::METHOD_HANDLE,
			PoolEntry::MethodType { .. } => pool::METHOD_TYPE,
			PoolEntry::Dynamic { .. } => pool::DYNAMIC,
			PoolEntry::InvokeDynamic { .. } => pool::INVOKE_DYNAMIC,
			PoolEntry::Module { .. } => pool::MODULE,
			PoolEntry::Package { .. } => pool::PACKAGE,
		}
	}

	fn write(&self, out: &mut Vec<u8>) -> Result<()> {
		out.put_u8(self.tag());
		match *self {
			PoolEntry::Utf8 { ref bytes } => {
				out.put_u16_len(bytes.len()).context("modified utf8 too long")?;
				out.put_bytes(bytes);
			},
			PoolEntry::Integer { bytes } | PoolEntry::Float { bytes } => out.put_u32(bytes),
			PoolEntry::Long { bytes } | PoolEntry::Double { bytes } => out.put_u64(bytes),
			PoolEntry::Class { name_index: index } |
			PoolEntry::String { string_index: index } |
			PoolEntry::MethodType { descriptor_index: index } |
			PoolEntry::Module { name_index: index } |
			PoolEntry::Package { name_index: index } => out.put_u16(index),
			PoolEntry::MethodHandle { reference_kind, reference_index } => {
				out.put_u8(reference_kind);
				out.put_u16(reference_index);
			},
			PoolEntry::FieldRef { class_index: first, name_and_type_index: second } |
			PoolEntry::MethodRef { class_index: first, name_and_type_index: second } |
			PoolEntry::InterfaceMethodRef { class_index: first, name_and_type_index: second } |
			PoolEntry::NameAndType { name_index: first, descriptor_index: second } |
			PoolEntry::Dynamic { bootstrap_method_attribute_index: first, name_and_type_index: second } |
			PoolEntry::InvokeDynamic { bootstrap_method_attribute_index: first, name_and_type_index: second } => {
				out.put_u16(first);
				out.put_u16(second);
			},
		}
		Ok(())
	}
}

/// An index-stable constant pool.
///
/// Appending an entry that is already present returns the index of the present entry instead.
#[derive(Debug, Clone)]
pub struct Pool {
	/// We store a [`None`] for the zero index, as well as for the upper indices of [`PoolEntry::Double`] and [`PoolEntry::Long`].
	entries: Vec<Option<PoolEntry>>,
	/// The first index of each entry, for deduplicating appended entries.
	interned: HashMap<PoolEntry, u16>,
}

impl Default for Pool {
	fn default() -> Self {
		Pool::new()
	}
}

impl Pool {
	pub fn new() -> Pool {
		Pool { entries: vec![None], interned: HashMap::new() }
	}

	/// Reads the constant pool. The first thing read is an `u16` specifying the size of the constant pool.
	pub(crate) fn read(reader: &mut Reader) -> Result<Pool> {
		let constant_pool_count = reader.u16_len()?;

		let mut pool = Pool::new();
		while pool.entries.len() < constant_pool_count {
			let index = pool.entries.len();
			let entry = PoolEntry::read(reader)
				.with_context(|| anyhow!("while reading pool entry at index {index}"))?;
			pool.push(entry)?;
		}

		if pool.entries.len() != constant_pool_count {
			bail!("last pool entry is a long or double overflowing the declared pool count of {constant_pool_count}");
		}

		Ok(pool)
	}

	pub(crate) fn write(&self, out: &mut Vec<u8>) -> Result<()> {
		out.put_u16_len(self.entries.len()).context("constant pool too large")?;
		for entry in self.entries.iter().flatten() {
			entry.write(out)?;
		}
		Ok(())
	}

	/// The `constant_pool_count` of this pool, that is the number of slots including the unusable zeroth one.
	pub fn count(&self) -> usize {
		self.entries.len()
	}

	/// Iterates over all entries together with their indices.
	pub fn iter(&self) -> impl Iterator<Item=(u16, &PoolEntry)> {
		self.entries.iter()
			.enumerate()
			.filter_map(|(index, entry)| Some((index as u16, entry.as_ref()?)))
	}

	/// Appends an entry, always creating a new slot.
	fn push(&mut self, entry: PoolEntry) -> Result<u16> {
		let width = if entry.is_wide() { 2 } else { 1 };
		let index = self.entries.len();
		if index + width > u16::MAX as usize {
			bail!("constant pool overflow: can't add {entry:?} at index {index}, a pool holds at most {} slots", u16::MAX);
		}
		let index = index as u16;

		self.interned.entry(entry.clone()).or_insert(index);
		self.entries.push(Some(entry));
		if width == 2 {
			self.entries.push(None);
		}

		Ok(index)
	}

	/// Returns the index of the given entry, appending it if it's not yet present.
	pub fn put(&mut self, entry: PoolEntry) -> Result<u16> {
		if let Some(&index) = self.interned.get(&entry) {
			return Ok(index);
		}
		self.push(entry)
	}

	pub fn put_utf8(&mut self, string: &str) -> Result<u16> {
		self.put(PoolEntry::Utf8 { bytes: jstring::from_str_to_vec(string) })
	}

	pub fn put_class(&mut self, name: &str) -> Result<u16> {
		let name_index = self.put_utf8(name)?;
		self.put(PoolEntry::Class { name_index })
	}

	pub fn put_string(&mut self, string: &str) -> Result<u16> {
		let string_index = self.put_utf8(string)?;
		self.put(PoolEntry::String { string_index })
	}

	pub fn put_name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16> {
		let name_index = self.put_utf8(name)?;
		let descriptor_index = self.put_utf8(descriptor)?;
		self.put(PoolEntry::NameAndType { name_index, descriptor_index })
	}

	pub fn put_field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> Result<u16> {
		let class_index = self.put_class(owner)?;
		let name_and_type_index = self.put_name_and_type(name, descriptor)?;
		self.put(PoolEntry::FieldRef { class_index, name_and_type_index })
	}

	pub fn put_method_ref(&mut self, owner: &str, name: &str, descriptor: &str, interface: bool) -> Result<u16> {
		let class_index = self.put_class(owner)?;
		let name_and_type_index = self.put_name_and_type(name, descriptor)?;
		if interface {
			self.put(PoolEntry::InterfaceMethodRef { class_index, name_and_type_index })
		} else {
			self.put(PoolEntry::MethodRef { class_index, name_and_type_index })
		}
	}

	pub fn put_method_type(&mut self, descriptor: &str) -> Result<u16> {
		let descriptor_index = self.put_utf8(descriptor)?;
		self.put(PoolEntry::MethodType { descriptor_index })
	}

	/// Overwrites the entry at `index`.
	///
	/// The slot must hold an entry already, and both the old and the new entry must take up the same number of slots.
	pub fn replace(&mut self, index: u16, entry: PoolEntry) -> Result<()> {
		let Some(Some(old)) = self.entries.get_mut(index as usize) else {
			bail!("can't replace pool entry at index {index}: no entry there");
		};
		if old.is_wide() != entry.is_wide() {
			bail!("can't replace pool entry {old:?} at index {index} with {entry:?}: they differ in width");
		}

		let old = std::mem::replace(old, entry.clone());
		if self.interned.get(&old) == Some(&index) {
			self.interned.remove(&old);
		}
		self.interned.entry(entry).or_insert(index);
		Ok(())
	}

	pub fn get(&self, index: u16) -> Result<&PoolEntry> {
		if let Some(Some(entry)) = self.entries.get(index as usize) {
			Ok(entry)
		} else {
			bail!("pool entry at index {index:?} is not there: either index too large or the upper half of long or double");
		}
	}

	pub fn get_utf8(&self, index: u16) -> Result<String> {
		let PoolEntry::Utf8 { bytes } = self.get(index)? else {
			bail!("pool entry not `Utf8`: {:?}", self.get(index)?);
		};
		jstring::from_slice_to_string(bytes).pool_context(index)
	}

	pub fn get_class_name(&self, index: u16) -> Result<String> {
		let &PoolEntry::Class { name_index } = self.get(index)? else {
			bail!("pool entry not `Class`: {:?}", self.get(index)?);
		};
		self.get_utf8(name_index).pool_context(index)
	}

	pub fn get_name_and_type(&self, index: u16) -> Result<(String, String)> {
		let &PoolEntry::NameAndType { name_index, descriptor_index } = self.get(index)? else {
			bail!("pool entry not `NameAndType`: {:?}", self.get(index)?);
		};
		let name = self.get_utf8(name_index).pool_context(index)?;
		let descriptor = self.get_utf8(descriptor_index).pool_context(index)?;
		Ok((name, descriptor))
	}

	/// Returns the owner, name and descriptor of a `Fieldref`, `Methodref` or `InterfaceMethodref`.
	pub fn get_member_ref(&self, index: u16) -> Result<(String, String, String)> {
		let (class_index, name_and_type_index) = match *self.get(index)? {
			PoolEntry::FieldRef { class_index, name_and_type_index } |
			PoolEntry::MethodRef { class_index, name_and_type_index } |
			PoolEntry::InterfaceMethodRef { class_index, name_and_type_index } => (class_index, name_and_type_index),
			ref entry => bail!("pool entry not a member reference: {entry:?}"),
		};
		let owner = self.get_class_name(class_index).pool_context(index)?;
		let (name, descriptor) = self.get_name_and_type(name_and_type_index).pool_context(index)?;
		Ok((owner, name, descriptor))
	}
}

/// Tiny helper trait for adding pool indices to errors.
trait PoolContext {
	fn pool_context(self, index: u16) -> Self;
}
impl<T> PoolContext for Result<T> {
	fn pool_context(self, index: u16) -> Self {
		self.with_context(|| anyhow!("while getting pool index {index}"))
	}
}
