//! The [`Remapper`] trait, answering "what's the new name of X?" for [`crate::remap::remap_class`].

use anyhow::{bail, Result};
use crate::signature;

/// A remapper for class names, field names and method names.
///
/// Implementors only need to provide the methods without a default implementation. Unknown names are expected to be
/// returned unchanged.
pub trait Remapper {
	/// Maps an internal class name like `java/lang/Object`. This is never called with array class names.
	fn map_class(&self, name: &str) -> String;

	/// Maps a field name. The `owner` and `descriptor` are in the old namespace.
	fn map_field_name(&self, owner: &str, name: &str, descriptor: &str) -> String;

	/// Maps a method name. The `owner` and `descriptor` are in the old namespace.
	fn map_method_name(&self, owner: &str, name: &str, descriptor: &str) -> String;

	/// Maps any class name, including array class names like `[Ljava/lang/Object;`.
	fn map_class_any(&self, name: &str) -> Result<String> {
		if name.starts_with('[') {
			self.map_desc(name)
		} else {
			Ok(self.map_class(name))
		}
	}

	/// Maps a field or method descriptor.
	fn map_desc(&self, desc: &str) -> Result<String> {
		let mut s = String::with_capacity(desc.len());

		let mut iter = desc.chars();
		while let Some(ch) = iter.next() {
			s.push(ch);

			if ch == 'L' {
				let mut class_name = String::new();
				for ch in iter.by_ref() {
					class_name.push(ch);
					if ch == ';' {
						break;
					}
				}
				if class_name.pop() != Some(';') {
					bail!("descriptor {desc:?} has a missing semicolon somewhere");
				}

				s.push_str(&self.map_class(&class_name));
				s.push(';');
			}
		}

		Ok(s)
	}

	/// Maps a generic signature of a class, field, method or record component.
	fn map_signature(&self, signature: &str) -> Result<String> {
		signature::map_signature(self, signature)
	}
}
