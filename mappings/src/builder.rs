use anyhow::{anyhow, bail, Context, Result};
use log::debug;
use crate::{Field, Mappings, Method, Type, TypeId};

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
	pub obfuscated_name: String,
	pub mapped_name: String,
	/// May be empty.
	pub field_type: String,
}

impl FieldSpec {
	pub fn new(obfuscated_name: impl Into<String>, mapped_name: impl Into<String>, field_type: impl Into<String>) -> FieldSpec {
		FieldSpec {
			obfuscated_name: obfuscated_name.into(),
			mapped_name: mapped_name.into(),
			field_type: field_type.into(),
		}
	}
}

/// A method, with its types in the mapped namespace, written like `java/lang/String[]`.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSpec {
	pub obfuscated_name: String,
	pub mapped_name: String,
	pub return_type: String,
	pub argument_types: Vec<String>,
}

impl MethodSpec {
	pub fn new<S: Into<String>>(
		obfuscated_name: impl Into<String>,
		mapped_name: impl Into<String>,
		return_type: impl Into<String>,
		argument_types: impl IntoIterator<Item=S>,
	) -> MethodSpec {
		MethodSpec {
			obfuscated_name: obfuscated_name.into(),
			mapped_name: mapped_name.into(),
			return_type: return_type.into(),
			argument_types: argument_types.into_iter().map(Into::into).collect(),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberSpec {
	Field(FieldSpec),
	Method(MethodSpec),
}

/// A type under construction. Nested types use their full `$` separated names.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
	pub obfuscated_name: String,
	pub mapped_name: String,
	pub members: Vec<MemberSpec>,
	children: Vec<TypeSpec>,
}

impl TypeSpec {
	pub fn new(obfuscated_name: impl Into<String>, mapped_name: impl Into<String>) -> TypeSpec {
		TypeSpec {
			obfuscated_name: obfuscated_name.into(),
			mapped_name: mapped_name.into(),
			members: Vec::new(),
			children: Vec::new(),
		}
	}

	pub fn add_field(&mut self, field: FieldSpec) {
		self.members.push(MemberSpec::Field(field));
	}

	pub fn add_method(&mut self, method: MethodSpec) {
		self.members.push(MemberSpec::Method(method));
	}

	pub fn children(&self) -> &[TypeSpec] {
		&self.children
	}
}

/// Fails if a sibling in `siblings` has the same obfuscated or mapped name as `spec`.
fn check_unique(siblings: &[TypeSpec], spec: &TypeSpec) -> Result<()> {
	for sibling in siblings {
		if sibling.obfuscated_name == spec.obfuscated_name {
			bail!("cannot add type {:?} -> {:?}, as there's already one with the obfuscated name: {:?} -> {:?}",
				spec.obfuscated_name, spec.mapped_name, sibling.obfuscated_name, sibling.mapped_name);
		}
		if sibling.mapped_name == spec.mapped_name {
			bail!("cannot add type {:?} -> {:?}, as there's already one with the mapped name: {:?} -> {:?}",
				spec.obfuscated_name, spec.mapped_name, sibling.obfuscated_name, sibling.mapped_name);
		}
	}
	Ok(())
}

/// The mutable graph readers assemble, before it gets [frozen][MappingsBuilder::freeze].
#[derive(Debug, Clone)]
pub struct MappingsBuilder {
	name: String,
	date_generated: String,
	types: Vec<TypeSpec>,
}

impl MappingsBuilder {
	/// Creates a builder dated today.
	pub fn new(name: impl Into<String>) -> MappingsBuilder {
		let date = chrono::Local::now().format("%Y-%m-%d").to_string();
		MappingsBuilder::with_date(name, date)
	}

	pub fn with_date(name: impl Into<String>, date_generated: impl Into<String>) -> MappingsBuilder {
		MappingsBuilder {
			name: name.into(),
			date_generated: date_generated.into(),
			types: Vec::new(),
		}
	}

	/// Adds a type. A name containing `$` is a nested type, and is attached to its already present enclosing type.
	///
	/// Fails if the enclosing type is missing, or if there's a type with the same obfuscated or mapped name already.
	pub fn add_type(&mut self, spec: TypeSpec) -> Result<()> {
		let siblings = match spec.obfuscated_name.rsplit_once('$') {
			Some((parent, _)) => {
				&mut self.get_mut(parent)
					.with_context(|| anyhow!("no matching parent class was found for nested type {:?}", spec.obfuscated_name))?
					.children
			},
			None => &mut self.types,
		};

		check_unique(siblings, &spec)?;
		siblings.push(spec);
		Ok(())
	}

	/// Finds a type by its obfuscated name, walking down nested names segment by segment.
	pub fn get(&self, obfuscated_name: &str) -> Option<&TypeSpec> {
		let mut segments = obfuscated_name.split('$');
		let mut full_name = segments.next()?.to_owned();

		let mut spec = self.types.iter().find(|spec| spec.obfuscated_name == full_name)?;
		for segment in segments {
			full_name.push('$');
			full_name.push_str(segment);
			spec = spec.children.iter().find(|child| child.obfuscated_name == full_name)?;
		}
		Some(spec)
	}

	/// Like [`MappingsBuilder::get`], for adding members to a type added earlier.
	pub fn get_mut(&mut self, obfuscated_name: &str) -> Option<&mut TypeSpec> {
		let mut segments = obfuscated_name.split('$');
		let mut full_name = segments.next()?.to_owned();

		let mut spec = self.types.iter_mut().find(|spec| spec.obfuscated_name == full_name)?;
		for segment in segments {
			full_name.push('$');
			full_name.push_str(segment);
			spec = spec.children.iter_mut().find(|child| child.obfuscated_name == full_name)?;
		}
		Some(spec)
	}

	/// Turns the builder into immutable [`Mappings`].
	pub fn freeze(self) -> Mappings {
		struct Pending {
			obfuscated_name: String,
			mapped_name: String,
			parent: Option<TypeId>,
			children: Vec<TypeId>,
			members: Vec<MemberSpec>,
		}

		// depth first, so that a parent always has a smaller id than its children
		fn allocate(spec: TypeSpec, parent: Option<TypeId>, pending: &mut Vec<Pending>) -> TypeId {
			let id = TypeId(pending.len());
			pending.push(Pending {
				obfuscated_name: spec.obfuscated_name,
				mapped_name: spec.mapped_name,
				parent,
				children: Vec::new(),
				members: spec.members,
			});

			let children = spec.children.into_iter()
				.map(|child| allocate(child, Some(id), pending))
				.collect();
			pending[id.0].children = children;

			id
		}

		let mut pending = Vec::new();
		let roots: Vec<TypeId> = self.types.into_iter()
			.map(|spec| allocate(spec, None, &mut pending))
			.collect();

		let types: Vec<Type> = pending.into_iter()
			.map(|pending| {
				let mut fields = Vec::new();
				let mut methods = Vec::new();
				for member in pending.members {
					match member {
						MemberSpec::Field(field) => {
							fields.push(Field::new(field.obfuscated_name, field.mapped_name, field.field_type));
						},
						MemberSpec::Method(method) => {
							methods.push(Method::new(method.obfuscated_name, method.mapped_name, method.return_type, method.argument_types));
						},
					}
				}
				Type::new(pending.obfuscated_name, pending.mapped_name, pending.parent, pending.children, fields, methods)
			})
			.collect();

		debug!("froze mappings {:?} with {} types, {} of them top level", self.name, types.len(), roots.len());

		Mappings::new(self.name, self.date_generated, roots, types)
	}
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::{Direction, FieldSpec, MappingsBuilder, Member, MethodSpec, TypeSpec};

	#[test]
	fn nested_types_need_their_parent() -> Result<()> {
		let mut builder = MappingsBuilder::with_date("test", "2020-02-02");
		builder.add_type(TypeSpec::new("a", "A"))?;
		assert!(builder.add_type(TypeSpec::new("a$b$c", "A$B$C")).is_err());
		builder.add_type(TypeSpec::new("a$b", "A$B"))?;
		builder.add_type(TypeSpec::new("a$b$c", "A$B$C"))?;
		assert!(builder.add_type(TypeSpec::new("x$y", "X$Y")).is_err());

		assert_eq!(builder.get("a$b$c").map(|spec| spec.mapped_name.as_str()), Some("A$B$C"));
		assert_eq!(builder.get("a").map(|spec| spec.children().len()), Some(1));
		Ok(())
	}

	#[test]
	fn duplicates_are_rejected() -> Result<()> {
		let mut builder = MappingsBuilder::with_date("test", "2020-02-02");
		builder.add_type(TypeSpec::new("a", "A"))?;
		assert!(builder.add_type(TypeSpec::new("a", "B")).is_err());
		assert!(builder.add_type(TypeSpec::new("b", "A")).is_err());
		builder.add_type(TypeSpec::new("a$b", "A$B"))?;
		assert!(builder.add_type(TypeSpec::new("a$b", "A$C")).is_err());
		Ok(())
	}

	#[test]
	fn freeze_wires_ids_and_members() -> Result<()> {
		let mut builder = MappingsBuilder::with_date("test", "2020-02-02");
		builder.add_type(TypeSpec::new("a", "A"))?;
		builder.add_type(TypeSpec::new("b", "B"))?;
		builder.add_type(TypeSpec::new("a$c", "A$C"))?;

		// members can still be added after the type
		let c = builder.get_mut("a$c").ok_or_else(|| anyhow::anyhow!("no a$c"))?;
		c.add_field(FieldSpec::new("f", "value", ""));
		c.add_method(MethodSpec::new("m", "run", "void", Vec::<String>::new()));
		c.add_field(FieldSpec::new("g", "other", "int"));

		let mappings = builder.freeze();
		assert_eq!(mappings.name(), "test");
		assert_eq!(mappings.date_generated(), "2020-02-02");

		let names: Vec<&str> = mappings.roots().iter().map(|&id| mappings[id].obfuscated_name()).collect();
		assert_eq!(names, vec!["a", "b"]);

		let a = mappings.resolve_type_id("a", Direction::Obfuscated).ok_or_else(|| anyhow::anyhow!("no a"))?;
		let c = mappings.resolve_type_id("a$c", Direction::Obfuscated).ok_or_else(|| anyhow::anyhow!("no a$c"))?;
		assert!(a < c);
		assert_eq!(mappings[a].children(), &[c]);
		assert_eq!(mappings[c].parent(), Some(a));

		let fields: Vec<&str> = mappings[c].fields().iter().map(|f| f.mapped_name()).collect();
		assert_eq!(fields, vec!["value", "other"]);
		assert_eq!(mappings[c].methods().len(), 1);
		Ok(())
	}

	#[test]
	fn todays_date() {
		let mappings = MappingsBuilder::new("test").freeze();
		let date = mappings.date_generated();
		assert_eq!(date.len(), 10);
		assert_eq!(&date[4..5], "-");
	}
}
