use std::ops::Index;
use std::sync::OnceLock;
use indexmap::IndexMap;
use crate::descriptor;

/// Which namespace a name is in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
	Obfuscated,
	Mapped,
}

impl Direction {
	pub fn opposite(self) -> Direction {
		match self {
			Direction::Obfuscated => Direction::Mapped,
			Direction::Mapped => Direction::Obfuscated,
		}
	}
}

/// Something carrying a name in both namespaces.
pub trait Member {
	fn obfuscated_name(&self) -> &str;
	fn mapped_name(&self) -> &str;

	fn name(&self, direction: Direction) -> &str {
		match direction {
			Direction::Obfuscated => self.obfuscated_name(),
			Direction::Mapped => self.mapped_name(),
		}
	}
}

macro_rules! member {
	($ty:ty) => {
		impl Member for $ty {
			fn obfuscated_name(&self) -> &str {
				&self.obfuscated_name
			}
			fn mapped_name(&self) -> &str {
				&self.mapped_name
			}
		}
	}
}

member!(Field);
member!(Method);
member!(Type);

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
	obfuscated_name: String,
	mapped_name: String,
	field_type: String,
}

impl Field {
	pub(crate) fn new(obfuscated_name: String, mapped_name: String, field_type: String) -> Field {
		Field { obfuscated_name, mapped_name, field_type }
	}

	/// The type of the field in the mapped namespace, like `java/lang/String[]`. Empty if the format has no field
	/// types.
	pub fn field_type(&self) -> &str {
		&self.field_type
	}
}

#[derive(Debug)]
pub struct Method {
	obfuscated_name: String,
	mapped_name: String,
	return_type: String,
	argument_types: Vec<String>,
	obfuscated_descriptor: OnceLock<String>,
	mapped_descriptor: OnceLock<String>,
}

impl Method {
	pub(crate) fn new(obfuscated_name: String, mapped_name: String, return_type: String, argument_types: Vec<String>) -> Method {
		Method {
			obfuscated_name,
			mapped_name,
			return_type,
			argument_types,
			obfuscated_descriptor: OnceLock::new(),
			mapped_descriptor: OnceLock::new(),
		}
	}

	/// The return type in the mapped namespace, like `void` or `java/lang/String`.
	pub fn return_type(&self) -> &str {
		&self.return_type
	}

	pub fn argument_types(&self) -> &[String] {
		&self.argument_types
	}

	/// The descriptor of this method in the given namespace, computed on first use.
	///
	/// `mappings` must be the mappings this method is part of.
	pub fn descriptor(&self, mappings: &Mappings, direction: Direction) -> &str {
		let cell = match direction {
			Direction::Obfuscated => &self.obfuscated_descriptor,
			Direction::Mapped => &self.mapped_descriptor,
		};
		cell.get_or_init(|| descriptor::method_descriptor(mappings, &self.return_type, &self.argument_types, direction))
	}
}

/// The index of a [`Type`] in its [`Mappings`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) usize);

/// A class. Nested classes carry their full name, like `a$b`.
#[derive(Debug)]
pub struct Type {
	obfuscated_name: String,
	mapped_name: String,
	parent: Option<TypeId>,
	children: Vec<TypeId>,
	fields: Vec<Field>,
	methods: Vec<Method>,
}

impl Type {
	pub(crate) fn new(obfuscated_name: String, mapped_name: String, parent: Option<TypeId>, children: Vec<TypeId>, fields: Vec<Field>, methods: Vec<Method>) -> Type {
		Type { obfuscated_name, mapped_name, parent, children, fields, methods }
	}

	/// The enclosing type, for nested types.
	pub fn parent(&self) -> Option<TypeId> {
		self.parent
	}

	pub fn children(&self) -> &[TypeId] {
		&self.children
	}

	pub fn fields(&self) -> &[Field] {
		&self.fields
	}

	pub fn methods(&self) -> &[Method] {
		&self.methods
	}

	/// Finds a field declared on this type.
	pub fn resolve_field(&self, name: &str, direction: Direction) -> Option<&Field> {
		self.fields.iter().find(|field| field.name(direction) == name)
	}

	/// Finds a method declared on this type, by name and descriptor.
	pub fn resolve_method(&self, mappings: &Mappings, name: &str, descriptor: &str, direction: Direction) -> Option<&Method> {
		self.methods.iter()
			.find(|method| method.name(direction) == name && method.descriptor(mappings, direction) == descriptor)
	}
}

/// The frozen mapping tree.
#[derive(Debug)]
pub struct Mappings {
	name: String,
	date_generated: String,
	roots: Vec<TypeId>,
	/// Indexed by [`TypeId`], parents before their children.
	types: Vec<Type>,
	obfuscated_roots: IndexMap<String, TypeId>,
	mapped_roots: IndexMap<String, TypeId>,
}

impl Index<TypeId> for Mappings {
	type Output = Type;

	fn index(&self, index: TypeId) -> &Type {
		&self.types[index.0]
	}
}

impl Mappings {
	pub(crate) fn new(name: String, date_generated: String, roots: Vec<TypeId>, types: Vec<Type>) -> Mappings {
		let obfuscated_roots = roots.iter().map(|&id| (types[id.0].obfuscated_name.clone(), id)).collect();
		let mapped_roots = roots.iter().map(|&id| (types[id.0].mapped_name.clone(), id)).collect();
		Mappings { name, date_generated, roots, types, obfuscated_roots, mapped_roots }
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// The date the mappings were read, as `YYYY-MM-DD`.
	pub fn date_generated(&self) -> &str {
		&self.date_generated
	}

	/// The top level types, in the order they were added.
	pub fn roots(&self) -> &[TypeId] {
		&self.roots
	}

	/// All types, nested ones included.
	pub fn types(&self) -> impl Iterator<Item=(TypeId, &Type)> {
		self.types.iter().enumerate().map(|(id, ty)| (TypeId(id), ty))
	}

	pub fn len(&self) -> usize {
		self.types.len()
	}

	pub fn is_empty(&self) -> bool {
		self.types.is_empty()
	}

	/// Finds the type with the given name.
	///
	/// Names of nested types are resolved segment by segment: `a$b$c` needs the top level type `a`, with a child `a$b`,
	/// which in turn has a child `a$b$c`.
	pub fn resolve_type_id(&self, name: &str, direction: Direction) -> Option<TypeId> {
		let mut segments = name.split('$');

		let root = segments.next()?;
		let roots = match direction {
			Direction::Obfuscated => &self.obfuscated_roots,
			Direction::Mapped => &self.mapped_roots,
		};
		let mut id = *roots.get(root)?;

		let mut full_name = root.to_owned();
		for segment in segments {
			full_name.push('$');
			full_name.push_str(segment);

			id = *self[id].children.iter()
				.find(|&&child| self[child].name(direction) == full_name)?;
		}

		Some(id)
	}

	pub fn resolve_type(&self, name: &str, direction: Direction) -> Option<&Type> {
		self.resolve_type_id(name, direction).map(|id| &self[id])
	}

	/// Returns the name of the type in the other namespace, or `name` if there's no such type.
	pub fn rename_type<'a>(&'a self, name: &'a str, from: Direction) -> &'a str {
		self.resolve_type(name, from)
			.map_or(name, |ty| ty.name(from.opposite()))
	}

	pub fn map_type_name<'a>(&'a self, obfuscated_name: &'a str) -> &'a str {
		self.rename_type(obfuscated_name, Direction::Obfuscated)
	}

	pub fn obfuscate_type_name<'a>(&'a self, mapped_name: &'a str) -> &'a str {
		self.rename_type(mapped_name, Direction::Mapped)
	}
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::{Direction, FieldSpec, Mappings, MappingsBuilder, Member, MethodSpec, TypeSpec};

	fn mappings() -> Result<Mappings> {
		let mut builder = MappingsBuilder::with_date("test", "2020-02-02");

		let mut a = TypeSpec::new("a", "pkg/A");
		a.add_field(FieldSpec::new("f", "value", "int"));
		a.add_method(MethodSpec::new("m", "run", "void", ["pkg/A", "int"]));
		a.add_method(MethodSpec::new("m", "walk", "void", ["int", "pkg/A"]));
		builder.add_type(a)?;
		builder.add_type(TypeSpec::new("a$b", "pkg/A$Inner"))?;
		builder.add_type(TypeSpec::new("a$b$c", "pkg/A$Inner$Deep"))?;
		builder.add_type(TypeSpec::new("d", "pkg/D"))?;

		Ok(builder.freeze())
	}

	#[test]
	fn round_trip_every_type() -> Result<()> {
		let mappings = mappings()?;
		assert_eq!(mappings.len(), 4);
		for (id, ty) in mappings.types() {
			assert_eq!(mappings.resolve_type_id(ty.obfuscated_name(), Direction::Obfuscated), Some(id));
			assert_eq!(mappings.resolve_type_id(ty.mapped_name(), Direction::Mapped), Some(id));
			assert_eq!(mappings.obfuscate_type_name(mappings.map_type_name(ty.obfuscated_name())), ty.obfuscated_name());
		}
		Ok(())
	}

	#[test]
	fn nested_lookup() -> Result<()> {
		let mappings = mappings()?;

		let inner = mappings.resolve_type("a$b", Direction::Obfuscated);
		assert_eq!(inner.map(|ty| ty.mapped_name()), Some("pkg/A$Inner"));
		assert!(mappings.resolve_type("a$c", Direction::Obfuscated).is_none());
		assert!(mappings.resolve_type("x$b", Direction::Obfuscated).is_none());

		let deep = mappings.resolve_type_id("pkg/A$Inner$Deep", Direction::Mapped);
		assert!(deep.is_some());
		let parent = deep.and_then(|id| mappings[id].parent());
		assert_eq!(parent, mappings.resolve_type_id("a$b", Direction::Obfuscated));

		// a mapped name never resolves as an obfuscated one
		assert!(mappings.resolve_type("pkg/A", Direction::Obfuscated).is_none());
		Ok(())
	}

	#[test]
	fn rename() -> Result<()> {
		let mappings = mappings()?;
		assert_eq!(mappings.map_type_name("a$b$c"), "pkg/A$Inner$Deep");
		assert_eq!(mappings.obfuscate_type_name("pkg/D"), "d");
		assert_eq!(mappings.map_type_name("java/lang/Object"), "java/lang/Object");
		assert_eq!(mappings.rename_type("a", Direction::Mapped), "a");
		Ok(())
	}

	#[test]
	fn descriptors() -> Result<()> {
		let mappings = mappings()?;
		let a = mappings.resolve_type("a", Direction::Obfuscated).ok_or_else(|| anyhow::anyhow!("no a"))?;

		let run = &a.methods()[0];
		let walk = &a.methods()[1];
		assert_eq!(run.descriptor(&mappings, Direction::Mapped), "(Lpkg/A;I)V");
		assert_eq!(run.descriptor(&mappings, Direction::Obfuscated), "(La;I)V");
		assert_eq!(walk.descriptor(&mappings, Direction::Obfuscated), "(ILa;)V");

		// argument order tells the overloads apart
		assert_eq!(a.resolve_method(&mappings, "m", "(ILa;)V", Direction::Obfuscated).map(|m| m.mapped_name()), Some("walk"));
		assert_eq!(a.resolve_method(&mappings, "run", "(Lpkg/A;I)V", Direction::Mapped).map(|m| m.obfuscated_name()), Some("m"));
		assert!(a.resolve_method(&mappings, "m", "()V", Direction::Obfuscated).is_none());

		assert_eq!(a.resolve_field("f", Direction::Obfuscated).map(|f| f.mapped_name()), Some("value"));
		assert_eq!(a.resolve_field("value", Direction::Mapped).map(|f| f.field_type()), Some("int"));
		assert!(a.resolve_field("value", Direction::Obfuscated).is_none());
		Ok(())
	}
}
