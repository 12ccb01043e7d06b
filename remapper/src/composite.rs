//! Answering "which ancestor declares this member?" for the classes of one archive.

use std::collections::{HashSet, VecDeque};
use anyhow::Result;
use indexmap::IndexMap;
use classfile::ClassFile;
use mappings::{Direction, Field, Mappings, Method, TypeId};

/// The supertypes of a class, as they're written in its class file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHeader {
	pub super_class: Option<String>,
	pub interfaces: Vec<String>,
}

impl ClassHeader {
	pub fn new(super_class: Option<String>, interfaces: Vec<String>) -> ClassHeader {
		ClassHeader { super_class, interfaces }
	}

	pub fn of(class: &ClassFile) -> Result<ClassHeader> {
		Ok(ClassHeader {
			super_class: class.super_name()?,
			interfaces: class.interface_names()?,
		})
	}

	fn supertypes(&self) -> impl Iterator<Item=&str> {
		self.super_class.iter().chain(self.interfaces.iter()).map(String::as_str)
	}
}

/// The ordered ancestor chain of one class.
///
/// The chain starts with the class itself, followed by its supertypes breadth first: first the superclass, then the
/// interfaces in declaration order, then their supertypes and so on. Only classes of the working set that are known to
/// the mappings take part. Lookups return the member of the first type in the chain declaring it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composite {
	chain: Vec<TypeId>,
}

impl Composite {
	pub fn new(chain: Vec<TypeId>) -> Composite {
		Composite { chain }
	}

	/// Computes the chain of the class `name`, walking the hierarchy given by `headers`.
	///
	/// Each class is visited at most once, so diamonds and even cyclic hierarchies end.
	pub fn build(name: &str, mappings: &Mappings, headers: &IndexMap<String, ClassHeader>) -> Composite {
		let mut chain = Vec::new();
		let mut visited = HashSet::new();
		let mut queue = VecDeque::new();

		visited.insert(name);
		queue.push_back(name);

		while let Some(current) = queue.pop_front() {
			let Some(header) = headers.get(current) else {
				continue;
			};

			if let Some(id) = mappings.resolve_type_id(current, Direction::Obfuscated) {
				chain.push(id);
			}

			for supertype in header.supertypes() {
				if visited.insert(supertype) {
					queue.push_back(supertype);
				}
			}
		}

		Composite { chain }
	}

	pub fn chain(&self) -> &[TypeId] {
		&self.chain
	}

	/// Finds the closest field called `name`, by its obfuscated name.
	pub fn resolve_field<'a>(&self, mappings: &'a Mappings, name: &str) -> Option<&'a Field> {
		self.chain.iter()
			.find_map(|&id| mappings[id].resolve_field(name, Direction::Obfuscated))
	}

	/// Finds the closest method with the obfuscated `name` and `descriptor`.
	pub fn resolve_method<'a>(&self, mappings: &'a Mappings, name: &str, descriptor: &str) -> Option<&'a Method> {
		self.chain.iter()
			.find_map(|&id| mappings[id].resolve_method(mappings, name, descriptor, Direction::Obfuscated))
	}
}
