//! Rewriting every symbolic reference of a class through a [`Remapper`].
//!
//! All old names are read from a snapshot of the pool taken before any change. New names are interned into the live
//! pool, and the entries referring to them are redirected in place. Utf8 entries themselves are never changed, as
//! string constants may share them.

use anyhow::{anyhow, bail, Context, Result};
use crate::{AttributeInfo, ClassFile, MemberInfo, Remapper};
use crate::bytes::{Put, Reader};
use crate::constants::{attribute, LAMBDA_METAFACTORY};
use crate::pool::{Pool, PoolEntry};

/// Remaps a class, returning the rewritten class.
///
/// Besides all references, this sets the `SourceFile` attribute to the new outermost simple name of the class.
pub fn remap_class<R: Remapper + ?Sized>(mut class: ClassFile, remapper: &R) -> Result<ClassFile> {
	let this_name = class.name()?;
	let bootstrap_methods = read_bootstrap_methods(&class)
		.context("while reading the bootstrap methods")?;

	let mut r = ClassRemapper {
		remapper,
		old: class.pool.clone(),
		pool: std::mem::take(&mut class.pool),
		this_name,
	};

	r.remap_pool(&bootstrap_methods).context("while remapping the constant pool")?;

	for field in &mut class.fields {
		r.field(field)?;
	}
	for method in &mut class.methods {
		r.method(method)?;
	}
	class.attributes = r.attributes(&class.attributes).context("while remapping class attributes")?;

	let new_name = remapper.map_class(&r.this_name);
	class.pool = r.pool;
	class.set_source_file(&source_file_name(&new_name))?;

	Ok(class)
}

/// `a/b/C$D` gives `C.java`.
fn source_file_name(class_name: &str) -> String {
	let simple = class_name.rsplit_once('/').map_or(class_name, |(_, simple)| simple);
	let outer = simple.split_once('$').map_or(simple, |(outer, _)| outer);
	format!("{outer}.java")
}

/// The new simple name of an inner class, following the renamed full name.
///
/// Anonymous and local classes have digits after the `$`, which aren't part of the simple name.
fn map_inner_class_name(old_name: &str, new_name: &str, inner_name: &str) -> String {
	if old_name == new_name {
		return inner_name.to_owned();
	}
	if let (Some((_, old_simple)), Some((_, new_simple))) = (old_name.rsplit_once('/'), new_name.rsplit_once('/')) {
		if old_simple == new_simple {
			return inner_name.to_owned();
		}
	}
	match new_name.rsplit_once('$') {
		Some((_, after)) => after.trim_start_matches(|c: char| c.is_ascii_digit()).to_owned(),
		None => inner_name.to_owned(),
	}
}

#[derive(Debug)]
struct BootstrapMethod {
	method_ref: u16,
	arguments: Vec<u16>,
}

fn read_bootstrap_methods(class: &ClassFile) -> Result<Vec<BootstrapMethod>> {
	let Some(attribute) = class.attribute(attribute::BOOTSTRAP_METHODS)? else {
		return Ok(Vec::new());
	};
	Reader::new(&attribute.info).list(|r| Ok(BootstrapMethod {
		method_ref: r.u16()?,
		arguments: r.list(|r| r.u16())?,
	}))
}

struct ClassRemapper<'a, R: ?Sized> {
	remapper: &'a R,
	/// The pool as it was before remapping.
	old: Pool,
	pool: Pool,
	/// The old name of the class being remapped.
	this_name: String,
}

impl<'a, R: Remapper + ?Sized> ClassRemapper<'a, R> {
	/// Maps the utf8 at `index`, returning the index of the new string.
	fn redirect(&mut self, index: u16, map: impl FnOnce(&R, &str) -> Result<String>) -> Result<u16> {
		let old = self.old.get_utf8(index)?;
		let new = map(self.remapper, &old)?;
		if new == old {
			Ok(index)
		} else {
			self.pool.put_utf8(&new)
		}
	}

	fn redirect_desc(&mut self, index: u16) -> Result<u16> {
		self.redirect(index, |r, desc| r.map_desc(desc))
	}

	fn redirect_signature(&mut self, index: u16) -> Result<u16> {
		self.redirect(index, |r, signature| r.map_signature(signature))
	}

	/// Returns the index of the `NameAndType` with the new name and descriptor, or `index` if nothing changed.
	fn redirect_name_and_type(&mut self, index: u16, new_name: &str, new_desc: &str) -> Result<u16> {
		let (name, desc) = self.old.get_name_and_type(index)?;
		if name == new_name && desc == new_desc {
			Ok(index)
		} else {
			self.pool.put_name_and_type(new_name, new_desc)
		}
	}

	fn remap_pool(&mut self, bootstrap_methods: &[BootstrapMethod]) -> Result<()> {
		let entries: Vec<(u16, PoolEntry)> = self.old.iter()
			.map(|(index, entry)| (index, entry.clone()))
			.collect();

		for (index, entry) in entries {
			self.pool_entry(index, entry, bootstrap_methods)
				.with_context(|| anyhow!("while remapping pool entry at index {index}"))?;
		}
		Ok(())
	}

	fn pool_entry(&mut self, index: u16, entry: PoolEntry, bootstrap_methods: &[BootstrapMethod]) -> Result<()> {
		let new_entry = match entry {
			PoolEntry::Class { name_index } => {
				PoolEntry::Class { name_index: self.redirect(name_index, |r, name| r.map_class_any(name))? }
			},
			PoolEntry::FieldRef { class_index, name_and_type_index } => {
				let (owner, name, desc) = self.old.get_member_ref(index)?;
				let new_name = self.remapper.map_field_name(&owner, &name, &desc);
				let new_desc = self.remapper.map_desc(&desc)?;
				let name_and_type_index = self.redirect_name_and_type(name_and_type_index, &new_name, &new_desc)?;
				PoolEntry::FieldRef { class_index, name_and_type_index }
			},
			PoolEntry::MethodRef { class_index, name_and_type_index } |
			PoolEntry::InterfaceMethodRef { class_index, name_and_type_index } => {
				let (owner, name, desc) = self.old.get_member_ref(index)?;
				let new_name = if owner.starts_with('[') {
					name
				} else {
					self.remapper.map_method_name(&owner, &name, &desc)
				};
				let new_desc = self.remapper.map_desc(&desc)?;
				let name_and_type_index = self.redirect_name_and_type(name_and_type_index, &new_name, &new_desc)?;
				if matches!(entry, PoolEntry::MethodRef { .. }) {
					PoolEntry::MethodRef { class_index, name_and_type_index }
				} else {
					PoolEntry::InterfaceMethodRef { class_index, name_and_type_index }
				}
			},
			PoolEntry::MethodType { descriptor_index } => {
				PoolEntry::MethodType { descriptor_index: self.redirect_desc(descriptor_index)? }
			},
			PoolEntry::Dynamic { bootstrap_method_attribute_index, name_and_type_index } => {
				let (name, desc) = self.old.get_name_and_type(name_and_type_index)?;
				let new_desc = self.remapper.map_desc(&desc)?;
				let name_and_type_index = self.redirect_name_and_type(name_and_type_index, &name, &new_desc)?;
				PoolEntry::Dynamic { bootstrap_method_attribute_index, name_and_type_index }
			},
			PoolEntry::InvokeDynamic { bootstrap_method_attribute_index, name_and_type_index } => {
				let (name, desc) = self.old.get_name_and_type(name_and_type_index)?;

				let bootstrap_method = bootstrap_methods.get(bootstrap_method_attribute_index as usize)
					.with_context(|| anyhow!("no bootstrap method at index {bootstrap_method_attribute_index}"))?;
				let new_name = match self.lambda_interface_method(bootstrap_method, &desc)? {
					Some((owner, sam_desc)) => self.remapper.map_method_name(&owner, &name, &sam_desc),
					None => name,
				};

				let new_desc = self.remapper.map_desc(&desc)?;
				let name_and_type_index = self.redirect_name_and_type(name_and_type_index, &new_name, &new_desc)?;
				PoolEntry::InvokeDynamic { bootstrap_method_attribute_index, name_and_type_index }
			},
			_ => return Ok(()),
		};

		if new_entry != entry {
			self.pool.replace(index, new_entry)?;
		}
		Ok(())
	}

	/// For a lambda created by the `LambdaMetafactory`, returns the interface and the descriptor of the method the
	/// lambda implements.
	///
	/// The interface is the return type of the call site descriptor, and the implemented descriptor is the first
	/// bootstrap argument.
	fn lambda_interface_method(&self, bootstrap_method: &BootstrapMethod, desc: &str) -> Result<Option<(String, String)>> {
		let PoolEntry::MethodHandle { reference_index, .. } = *self.old.get(bootstrap_method.method_ref)? else {
			bail!("bootstrap method at pool index {} isn't a method handle", bootstrap_method.method_ref);
		};
		let (bootstrap_owner, _, _) = self.old.get_member_ref(reference_index)?;
		if bootstrap_owner != LAMBDA_METAFACTORY {
			return Ok(None);
		}

		let Some(owner) = desc.rsplit_once(')')
			.and_then(|(_, ret)| ret.strip_prefix('L'))
			.and_then(|ret| ret.strip_suffix(';')) else {
			return Ok(None);
		};

		let Some(&first) = bootstrap_method.arguments.first() else {
			return Ok(None);
		};
		let PoolEntry::MethodType { descriptor_index } = *self.old.get(first)? else {
			return Ok(None);
		};
		let sam_desc = self.old.get_utf8(descriptor_index)?;

		Ok(Some((owner.to_owned(), sam_desc)))
	}

	fn field(&mut self, field: &mut MemberInfo) -> Result<()> {
		let name = self.old.get_utf8(field.name_index)?;
		let desc = self.old.get_utf8(field.descriptor_index)?;
		let this_name = self.this_name.clone();

		field.name_index = self.redirect(field.name_index, |r, name| Ok(r.map_field_name(&this_name, name, &desc)))?;
		field.descriptor_index = self.redirect_desc(field.descriptor_index)?;
		field.attributes = self.attributes(&field.attributes)
			.with_context(|| anyhow!("while remapping attributes of field {name:?} {desc:?}"))?;
		Ok(())
	}

	fn method(&mut self, method: &mut MemberInfo) -> Result<()> {
		let name = self.old.get_utf8(method.name_index)?;
		let desc = self.old.get_utf8(method.descriptor_index)?;
		let this_name = self.this_name.clone();

		method.name_index = self.redirect(method.name_index, |r, name| Ok(r.map_method_name(&this_name, name, &desc)))?;
		method.descriptor_index = self.redirect_desc(method.descriptor_index)?;
		method.attributes = self.attributes(&method.attributes)
			.with_context(|| anyhow!("while remapping attributes of method {name:?}{desc:?}"))?;
		Ok(())
	}

	fn attributes(&mut self, attributes: &[AttributeInfo]) -> Result<Vec<AttributeInfo>> {
		attributes.iter()
			.map(|attribute| self.attribute(attribute))
			.collect()
	}

	fn attribute(&mut self, attribute: &AttributeInfo) -> Result<AttributeInfo> {
		let name = attribute.name(&self.old)?;

		let transform: fn(&mut Self, &mut Reader, &mut Vec<u8>) -> Result<()> = match name.as_str() {
			attribute::SIGNATURE => Self::signature,
			attribute::CODE => Self::code,
			attribute::INNER_CLASSES => Self::inner_classes,
			attribute::ENCLOSING_METHOD => Self::enclosing_method,
			attribute::LOCAL_VARIABLE_TABLE => Self::local_variable_table,
			attribute::LOCAL_VARIABLE_TYPE_TABLE => Self::local_variable_type_table,
			attribute::RECORD => Self::record,
			attribute::RUNTIME_VISIBLE_ANNOTATIONS | attribute::RUNTIME_INVISIBLE_ANNOTATIONS => Self::annotations,
			attribute::RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS | attribute::RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS => Self::parameter_annotations,
			attribute::RUNTIME_VISIBLE_TYPE_ANNOTATIONS | attribute::RUNTIME_INVISIBLE_TYPE_ANNOTATIONS => Self::type_annotations,
			attribute::ANNOTATION_DEFAULT => Self::element_value,
			_ => return Ok(attribute.clone()),
		};

		let mut reader = Reader::new(&attribute.info);
		let mut info = Vec::with_capacity(attribute.info.len());
		transform(self, &mut reader, &mut info)
			.with_context(|| anyhow!("while remapping attribute {name:?}"))?;

		if reader.remaining() != 0 {
			bail!("attribute {name:?} has {} bytes of trailing data", reader.remaining());
		}

		Ok(AttributeInfo { name_index: attribute.name_index, info })
	}

	fn signature(&mut self, r: &mut Reader, w: &mut Vec<u8>) -> Result<()> {
		let signature_index = r.u16()?;
		w.put_u16(self.redirect_signature(signature_index)?);
		Ok(())
	}

	fn code(&mut self, r: &mut Reader, w: &mut Vec<u8>) -> Result<()> {
		let max_stack = r.u16()?;
		let max_locals = r.u16()?;
		let code_length = r.u32_len()?;
		let code = r.take(code_length)?;
		let exception_table_length = r.u16_len()?;
		// start_pc, end_pc, handler_pc, catch_type: the catch type is a class entry, which is remapped in place
		let exception_table = r.take(exception_table_length * 8)?;
		let attributes = AttributeInfo::read_list(r)?;

		w.put_u16(max_stack);
		w.put_u16(max_locals);
		w.put_u32_len(code.len())?;
		w.put_bytes(code);
		w.put_u16_len(exception_table_length)?;
		w.put_bytes(exception_table);
		AttributeInfo::write_list(w, &self.attributes(&attributes)?)
	}

	fn inner_classes(&mut self, r: &mut Reader, w: &mut Vec<u8>) -> Result<()> {
		let number_of_classes = r.u16_len()?;
		w.put_u16_len(number_of_classes)?;
		for _ in 0..number_of_classes {
			let inner_class_info_index = r.u16()?;
			let outer_class_info_index = r.u16()?;
			let mut inner_name_index = r.u16()?;
			let inner_class_access_flags = r.u16()?;

			if inner_name_index != 0 {
				let old_name = self.old.get_class_name(inner_class_info_index)?;
				let new_name = self.remapper.map_class(&old_name);
				inner_name_index = self.redirect(inner_name_index, |_, inner_name| {
					Ok(map_inner_class_name(&old_name, &new_name, inner_name))
				})?;
			}

			w.put_u16(inner_class_info_index);
			w.put_u16(outer_class_info_index);
			w.put_u16(inner_name_index);
			w.put_u16(inner_class_access_flags);
		}
		Ok(())
	}

	fn enclosing_method(&mut self, r: &mut Reader, w: &mut Vec<u8>) -> Result<()> {
		let class_index = r.u16()?;
		let mut method_index = r.u16()?;

		if method_index != 0 {
			let owner = self.old.get_class_name(class_index)?;
			let (name, desc) = self.old.get_name_and_type(method_index)?;
			let new_name = self.remapper.map_method_name(&owner, &name, &desc);
			let new_desc = self.remapper.map_desc(&desc)?;
			method_index = self.redirect_name_and_type(method_index, &new_name, &new_desc)?;
		}

		w.put_u16(class_index);
		w.put_u16(method_index);
		Ok(())
	}

	fn local_variable_table(&mut self, r: &mut Reader, w: &mut Vec<u8>) -> Result<()> {
		self.local_variables(r, w, Self::redirect_desc)
	}

	fn local_variable_type_table(&mut self, r: &mut Reader, w: &mut Vec<u8>) -> Result<()> {
		self.local_variables(r, w, Self::redirect_signature)
	}

	fn local_variables(&mut self, r: &mut Reader, w: &mut Vec<u8>, redirect: fn(&mut Self, u16) -> Result<u16>) -> Result<()> {
		let length = r.u16_len()?;
		w.put_u16_len(length)?;
		for _ in 0..length {
			// start_pc, length, name_index
			w.put_bytes(r.take(6)?);
			let descriptor_index = r.u16()?;
			w.put_u16(redirect(self, descriptor_index)?);
			// index
			w.put_bytes(r.take(2)?);
		}
		Ok(())
	}

	fn record(&mut self, r: &mut Reader, w: &mut Vec<u8>) -> Result<()> {
		let components_count = r.u16_len()?;
		w.put_u16_len(components_count)?;
		for _ in 0..components_count {
			let name_index = r.u16()?;
			let descriptor_index = r.u16()?;
			let attributes = AttributeInfo::read_list(r)?;

			let desc = self.old.get_utf8(descriptor_index)?;
			let this_name = self.this_name.clone();
			let name_index = self.redirect(name_index, |r, name| Ok(r.map_field_name(&this_name, name, &desc)))?;

			w.put_u16(name_index);
			w.put_u16(self.redirect_desc(descriptor_index)?);
			AttributeInfo::write_list(w, &self.attributes(&attributes)?)?;
		}
		Ok(())
	}

	fn annotations(&mut self, r: &mut Reader, w: &mut Vec<u8>) -> Result<()> {
		let num_annotations = r.u16_len()?;
		w.put_u16_len(num_annotations)?;
		for _ in 0..num_annotations {
			self.annotation(r, w)?;
		}
		Ok(())
	}

	fn parameter_annotations(&mut self, r: &mut Reader, w: &mut Vec<u8>) -> Result<()> {
		let num_parameters = r.u8()?;
		w.put_u8(num_parameters);
		for _ in 0..num_parameters {
			self.annotations(r, w)?;
		}
		Ok(())
	}

	fn type_annotations(&mut self, r: &mut Reader, w: &mut Vec<u8>) -> Result<()> {
		let num_annotations = r.u16_len()?;
		w.put_u16_len(num_annotations)?;
		for _ in 0..num_annotations {
			let target_type = r.u8()?;
			w.put_u8(target_type);

			// target_info doesn't reference the pool, so it's copied
			let target_info_length = match target_type {
				0x00 | 0x01 | 0x16 => 1,
				0x10 | 0x11 | 0x12 | 0x17 | 0x42..=0x46 => 2,
				0x13..=0x15 => 0,
				0x47..=0x4B => 3,
				0x40 | 0x41 => {
					let table_length = r.u16_len()?;
					w.put_u16_len(table_length)?;
					table_length * 6
				},
				_ => bail!("unknown type annotation target type {target_type:#04x}"),
			};
			w.put_bytes(r.take(target_info_length)?);

			let path_length = r.u8()?;
			w.put_u8(path_length);
			w.put_bytes(r.take(usize::from(path_length) * 2)?);

			self.annotation(r, w)?;
		}
		Ok(())
	}

	fn annotation(&mut self, r: &mut Reader, w: &mut Vec<u8>) -> Result<()> {
		let type_index = r.u16()?;
		w.put_u16(self.redirect_desc(type_index)?);

		let num_element_value_pairs = r.u16_len()?;
		w.put_u16_len(num_element_value_pairs)?;
		for _ in 0..num_element_value_pairs {
			let element_name_index = r.u16()?;
			w.put_u16(element_name_index);
			self.element_value(r, w)?;
		}
		Ok(())
	}

	fn element_value(&mut self, r: &mut Reader, w: &mut Vec<u8>) -> Result<()> {
		let tag = r.u8()?;
		w.put_u8(tag);
		match tag {
			b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => {
				w.put_u16(r.u16()?);
			},
			b'e' => {
				let type_name_index = r.u16()?;
				let const_name_index = r.u16()?;

				let desc = self.old.get_utf8(type_name_index)?;
				let owner = desc.strip_prefix('L')
					.and_then(|desc| desc.strip_suffix(';'))
					.with_context(|| anyhow!("enum constant type {desc:?} isn't an object type"))?
					.to_owned();

				w.put_u16(self.redirect_desc(type_name_index)?);
				w.put_u16(self.redirect(const_name_index, |r, name| Ok(r.map_field_name(&owner, name, &desc)))?);
			},
			b'c' => {
				let class_info_index = r.u16()?;
				w.put_u16(self.redirect_desc(class_info_index)?);
			},
			b'@' => self.annotation(r, w)?,
			b'[' => {
				let num_values = r.u16_len()?;
				w.put_u16_len(num_values)?;
				for _ in 0..num_values {
					self.element_value(r, w)?;
				}
			},
			tag => bail!("unknown element value tag {tag:?}"),
		}
		Ok(())
	}
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::remap::{map_inner_class_name, source_file_name};

	#[test]
	fn source_file() {
		assert_eq!(source_file_name("pkg/Apple$Seed"), "Apple.java");
		assert_eq!(source_file_name("Apple"), "Apple.java");
	}

	#[test]
	fn inner_class_name() -> Result<()> {
		assert_eq!(map_inner_class_name("a$b", "pkg/Apple$Seed", "b"), "Seed");
		assert_eq!(map_inner_class_name("a$1", "pkg/Apple$1", "1"), "");
		assert_eq!(map_inner_class_name("a$1b", "pkg/Apple$1Local", "b"), "Local");
		assert_eq!(map_inner_class_name("x$y", "x$y", "y"), "y");
		assert_eq!(map_inner_class_name("p/x$y", "q/x$y", "y"), "y");
		Ok(())
	}
}
