use anyhow::{anyhow, bail, Context, Result};
use crate::bytes::{Put, Reader};
use crate::constants::{attribute, MAGIC};
use crate::pool::Pool;

/// An attribute, with its contents left unparsed.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeInfo {
	pub name_index: u16,
	pub info: Vec<u8>,
}

impl AttributeInfo {
	fn read(reader: &mut Reader) -> Result<AttributeInfo> {
		let name_index = reader.u16()?;
		let length = reader.u32_len()?;
		let info = reader.take(length)
			.with_context(|| anyhow!("attribute with name index {name_index} claims to be {length} bytes long"))?
			.to_vec();
		Ok(AttributeInfo { name_index, info })
	}

	fn write(&self, out: &mut Vec<u8>) -> Result<()> {
		out.put_u16(self.name_index);
		out.put_u32_len(self.info.len())
			.with_context(|| anyhow!("attribute with name index {} is too long", self.name_index))?;
		out.put_bytes(&self.info);
		Ok(())
	}

	pub fn name(&self, pool: &Pool) -> Result<String> {
		pool.get_utf8(self.name_index).context("while getting attribute name")
	}

	pub(crate) fn read_list(reader: &mut Reader) -> Result<Vec<AttributeInfo>> {
		reader.list(AttributeInfo::read)
	}

	pub(crate) fn write_list(out: &mut Vec<u8>, attributes: &[AttributeInfo]) -> Result<()> {
		out.put_list(attributes, |out, attribute| attribute.write(out))
	}
}

/// A field or a method.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberInfo {
	pub access_flags: u16,
	pub name_index: u16,
	pub descriptor_index: u16,
	pub attributes: Vec<AttributeInfo>,
}

impl MemberInfo {
	fn read(reader: &mut Reader) -> Result<MemberInfo> {
		Ok(MemberInfo {
			access_flags: reader.u16()?,
			name_index: reader.u16()?,
			descriptor_index: reader.u16()?,
			attributes: AttributeInfo::read_list(reader)?,
		})
	}

	fn write(&self, out: &mut Vec<u8>) -> Result<()> {
		out.put_u16(self.access_flags);
		out.put_u16(self.name_index);
		out.put_u16(self.descriptor_index);
		AttributeInfo::write_list(out, &self.attributes)
	}
}

/// A class file, with the constant pool and the top level structure parsed.
///
/// Attributes stay raw bytes, see [`AttributeInfo`].
#[derive(Debug, Clone)]
pub struct ClassFile {
	pub minor_version: u16,
	pub major_version: u16,
	pub pool: Pool,
	pub access_flags: u16,
	pub this_class: u16,
	/// Zero for `java/lang/Object` and `module-info`.
	pub super_class: u16,
	pub interfaces: Vec<u16>,
	pub fields: Vec<MemberInfo>,
	pub methods: Vec<MemberInfo>,
	pub attributes: Vec<AttributeInfo>,
}

impl ClassFile {
	/// Creates a new, empty public class.
	pub fn new(major_version: u16, pool: Pool, this_class: u16, super_class: u16) -> ClassFile {
		ClassFile {
			minor_version: 0,
			major_version,
			pool,
			access_flags: crate::constants::flags::ACC_PUBLIC | crate::constants::flags::ACC_SUPER,
			this_class,
			super_class,
			interfaces: Vec::new(),
			fields: Vec::new(),
			methods: Vec::new(),
			attributes: Vec::new(),
		}
	}

	/// Parses a class file. Fails if there's data after the end of the class.
	pub fn read(bytes: &[u8]) -> Result<ClassFile> {
		let mut reader = Reader::new(bytes);

		let magic = reader.u32().context("failed to read magic")?;
		if magic != MAGIC {
			bail!("invalid magic {magic:#010x}, expected {MAGIC:#010x}: not a class file");
		}

		let minor_version = reader.u16()?;
		let major_version = reader.u16()?;
		let pool = Pool::read(&mut reader).context("while reading the constant pool")?;
		let access_flags = reader.u16()?;
		let this_class = reader.u16()?;
		let super_class = reader.u16()?;
		let interfaces = reader.list(|r| r.u16())?;
		let fields = reader.list(MemberInfo::read).context("while reading fields")?;
		let methods = reader.list(MemberInfo::read).context("while reading methods")?;
		let attributes = AttributeInfo::read_list(&mut reader).context("while reading class attributes")?;

		if reader.remaining() != 0 {
			bail!("{} bytes of trailing data after the end of the class file", reader.remaining());
		}

		Ok(ClassFile {
			minor_version,
			major_version,
			pool,
			access_flags,
			this_class,
			super_class,
			interfaces,
			fields,
			methods,
			attributes,
		})
	}

	pub fn write(&self, writer: &mut impl std::io::Write) -> Result<()> {
		writer.write_all(&self.to_bytes()?).context("failed to write class file")
	}

	/// Converts the class file to binary representation.
	pub fn to_bytes(&self) -> Result<Vec<u8>> {
		let mut out = Vec::new();
		out.put_u32(MAGIC);
		out.put_u16(self.minor_version);
		out.put_u16(self.major_version);
		self.pool.write(&mut out)?;
		out.put_u16(self.access_flags);
		out.put_u16(self.this_class);
		out.put_u16(self.super_class);
		out.put_list(&self.interfaces, |out, &interface| {
			out.put_u16(interface);
			Ok(())
		})?;
		out.put_list(&self.fields, |out, field| field.write(out)).context("while writing fields")?;
		out.put_list(&self.methods, |out, method| method.write(out)).context("while writing methods")?;
		AttributeInfo::write_list(&mut out, &self.attributes).context("while writing class attributes")?;
		Ok(out)
	}

	pub fn name(&self) -> Result<String> {
		self.pool.get_class_name(self.this_class).context("while getting the name of the class")
	}

	pub fn super_name(&self) -> Result<Option<String>> {
		if self.super_class == 0 {
			Ok(None)
		} else {
			self.pool.get_class_name(self.super_class).map(Some).context("while getting the super class name")
		}
	}

	pub fn interface_names(&self) -> Result<Vec<String>> {
		self.interfaces.iter()
			.map(|&index| self.pool.get_class_name(index))
			.collect::<Result<_>>()
			.context("while getting the interface names")
	}

	/// Returns the first class level attribute with the given name.
	pub fn attribute(&self, name: &str) -> Result<Option<&AttributeInfo>> {
		for attribute in &self.attributes {
			if attribute.name(&self.pool)? == name {
				return Ok(Some(attribute));
			}
		}
		Ok(None)
	}

	/// Sets the `SourceFile` attribute, adding one if there's none.
	pub fn set_source_file(&mut self, source_file: &str) -> Result<()> {
		let sourcefile_index = self.pool.put_utf8(source_file)?;
		let info = sourcefile_index.to_be_bytes().to_vec();

		for attribute in &mut self.attributes {
			if attribute.name(&self.pool)? == attribute::SOURCE_FILE {
				attribute.info = info;
				return Ok(());
			}
		}

		let name_index = self.pool.put_utf8(attribute::SOURCE_FILE)?;
		self.attributes.push(AttributeInfo { name_index, info });
		Ok(())
	}
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::class::{AttributeInfo, ClassFile, MemberInfo};
	use crate::pool::Pool;

	fn class() -> Result<ClassFile> {
		let mut pool = Pool::new();
		let this_class = pool.put_class("a")?;
		let super_class = pool.put_class("java/lang/Object")?;
		let mut class = ClassFile::new(52, pool, this_class, super_class);
		class.interfaces.push(class.pool.put_class("java/lang/Runnable")?);
		class.fields.push(MemberInfo {
			access_flags: 0,
			name_index: class.pool.put_utf8("f")?,
			descriptor_index: class.pool.put_utf8("I")?,
			attributes: vec![],
		});
		Ok(class)
	}

	#[test]
	fn read_write_is_stable() -> Result<()> {
		let bytes = class()?.to_bytes()?;
		let read = ClassFile::read(&bytes)?;
		assert_eq!(read.name()?, "a");
		assert_eq!(read.super_name()?.as_deref(), Some("java/lang/Object"));
		assert_eq!(read.interface_names()?, vec!["java/lang/Runnable"]);
		assert_eq!(read.fields, class()?.fields);
		assert_eq!(read.to_bytes()?, bytes);
		Ok(())
	}

	#[test]
	fn rejects_bad_magic_and_trailing_data() -> Result<()> {
		let bytes = class()?.to_bytes()?;

		let mut bad_magic = bytes.clone();
		bad_magic[0] = 0;
		assert!(ClassFile::read(&bad_magic).is_err());

		let mut trailing = bytes.clone();
		trailing.push(0);
		assert!(ClassFile::read(&trailing).is_err());

		assert!(ClassFile::read(&bytes[..bytes.len() - 1]).is_err());
		Ok(())
	}

	#[test]
	fn source_file_is_added_then_replaced() -> Result<()> {
		let mut class = class()?;
		class.set_source_file("A.java")?;
		class.set_source_file("B.java")?;

		assert_eq!(class.attributes.len(), 1);
		let attribute: &AttributeInfo = &class.attributes[0];
		let index = u16::from_be_bytes([attribute.info[0], attribute.info[1]]);
		assert_eq!(class.pool.get_utf8(index)?, "B.java");
		Ok(())
	}
}
