//! The [`Remapper`] used for rewriting the classes of an archive.

use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use indexmap::IndexMap;
use classfile::Remapper;
use mappings::{Direction, Mappings, Member};
use crate::composite::Composite;

/// Counts lookups and the lookups that found nothing and fell back to the old name.
#[derive(Debug, Default)]
pub struct Coverage {
	types: AtomicUsize,
	type_misses: AtomicUsize,
	fields: AtomicUsize,
	field_misses: AtomicUsize,
	methods: AtomicUsize,
	method_misses: AtomicUsize,
}

impl Coverage {
	fn count(lookups: &AtomicUsize, misses: &AtomicUsize, hit: bool) {
		lookups.fetch_add(1, Ordering::Relaxed);
		if !hit {
			misses.fetch_add(1, Ordering::Relaxed);
		}
	}

	pub fn report(&self) -> CoverageReport {
		CoverageReport {
			types: self.types.load(Ordering::Relaxed),
			type_misses: self.type_misses.load(Ordering::Relaxed),
			fields: self.fields.load(Ordering::Relaxed),
			field_misses: self.field_misses.load(Ordering::Relaxed),
			methods: self.methods.load(Ordering::Relaxed),
			method_misses: self.method_misses.load(Ordering::Relaxed),
		}
	}
}

/// A snapshot of [`Coverage`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoverageReport {
	pub types: usize,
	pub type_misses: usize,
	pub fields: usize,
	pub field_misses: usize,
	pub methods: usize,
	pub method_misses: usize,
}

impl Display for CoverageReport {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "types: {}/{} mapped, fields: {}/{} mapped, methods: {}/{} mapped",
			self.types - self.type_misses, self.types,
			self.fields - self.field_misses, self.fields,
			self.methods - self.method_misses, self.methods,
		)
	}
}

/// Maps names from the obfuscated to the mapped namespace.
///
/// Members are looked up on their owner first, then along the owner's [`Composite`] chain. Anything not found keeps its
/// name. Cloning is cheap, all clones share the same data and the same [`Coverage`].
#[derive(Debug, Clone)]
pub struct NameResolver {
	mappings: Arc<Mappings>,
	composites: Arc<IndexMap<String, Composite>>,
	coverage: Arc<Coverage>,
}

impl NameResolver {
	pub fn new(mappings: Arc<Mappings>, composites: Arc<IndexMap<String, Composite>>) -> NameResolver {
		NameResolver {
			mappings,
			composites,
			coverage: Arc::new(Coverage::default()),
		}
	}

	pub fn coverage(&self) -> CoverageReport {
		self.coverage.report()
	}

	fn resolve_field(&self, owner: &str, name: &str) -> Option<&str> {
		if let Some(field) = self.mappings.resolve_type(owner, Direction::Obfuscated)
			.and_then(|owner| owner.resolve_field(name, Direction::Obfuscated)) {
			return Some(field.mapped_name());
		}

		self.composites.get(owner)
			.and_then(|composite| composite.resolve_field(&self.mappings, name))
			.map(|field| field.mapped_name())
	}

	fn resolve_method(&self, owner: &str, name: &str, descriptor: &str) -> Option<&str> {
		if let Some(method) = self.mappings.resolve_type(owner, Direction::Obfuscated)
			.and_then(|owner| owner.resolve_method(&self.mappings, name, descriptor, Direction::Obfuscated)) {
			return Some(method.mapped_name());
		}

		self.composites.get(owner)
			.and_then(|composite| composite.resolve_method(&self.mappings, name, descriptor))
			.map(|method| method.mapped_name())
	}
}

impl Remapper for NameResolver {
	fn map_class(&self, name: &str) -> String {
		let mapped = self.mappings.resolve_type(name, Direction::Obfuscated)
			.map(|ty| ty.mapped_name());

		Coverage::count(&self.coverage.types, &self.coverage.type_misses, mapped.is_some());
		mapped.unwrap_or(name).to_owned()
	}

	fn map_field_name(&self, owner: &str, name: &str, _descriptor: &str) -> String {
		let mapped = self.resolve_field(owner, name);

		Coverage::count(&self.coverage.fields, &self.coverage.field_misses, mapped.is_some());
		mapped.unwrap_or(name).to_owned()
	}

	fn map_method_name(&self, owner: &str, name: &str, descriptor: &str) -> String {
		if name == "<init>" || name == "<clinit>" {
			return name.to_owned();
		}

		let mapped = self.resolve_method(owner, name, descriptor);

		Coverage::count(&self.coverage.methods, &self.coverage.method_misses, mapped.is_some());
		mapped.unwrap_or(name).to_owned()
	}
}

#[cfg(test)]
mod testing {
	use std::sync::Arc;
	use anyhow::Result;
	use indexmap::IndexMap;
	use pretty_assertions::assert_eq;
	use classfile::Remapper;
	use mappings::{FieldSpec, MappingsBuilder, MethodSpec, TypeSpec};
	use crate::composite::{ClassHeader, Composite};
	use crate::resolver::NameResolver;

	fn resolver() -> Result<NameResolver> {
		let mut builder = MappingsBuilder::with_date("test", "2020-02-02");

		let mut a = TypeSpec::new("a", "pkg/Apple");
		a.add_field(FieldSpec::new("f", "value", "int"));
		a.add_method(MethodSpec::new("m", "grow", "void", ["pkg/Apple"]));
		a.add_method(MethodSpec::new("<init>", "create", "void", Vec::<String>::new()));
		builder.add_type(a)?;
		builder.add_type(TypeSpec::new("b", "pkg/Banana"))?;
		let mappings = Arc::new(builder.freeze());

		let headers = IndexMap::from([
			("a".to_owned(), ClassHeader::new(Some("java/lang/Object".to_owned()), Vec::new())),
			("b".to_owned(), ClassHeader::new(Some("a".to_owned()), Vec::new())),
		]);
		let composites = headers.keys()
			.map(|name| (name.clone(), Composite::build(name, &mappings, &headers)))
			.collect();

		Ok(NameResolver::new(mappings, Arc::new(composites)))
	}

	#[test]
	fn classes() -> Result<()> {
		let resolver = resolver()?;
		assert_eq!(resolver.map_class("a"), "pkg/Apple");
		assert_eq!(resolver.map_class("java/lang/Object"), "java/lang/Object");
		assert_eq!(resolver.map_class_any("[[La;")?, "[[Lpkg/Apple;");
		assert_eq!(resolver.map_desc("(La;Lb;)V")?, "(Lpkg/Apple;Lpkg/Banana;)V");
		Ok(())
	}

	#[test]
	fn inherited_members() -> Result<()> {
		let resolver = resolver()?;
		assert_eq!(resolver.map_field_name("a", "f", "I"), "value");
		assert_eq!(resolver.map_field_name("b", "f", "I"), "value");
		assert_eq!(resolver.map_field_name("b", "missing", "I"), "missing");
		assert_eq!(resolver.map_field_name("java/lang/Object", "f", "I"), "f");

		assert_eq!(resolver.map_method_name("b", "m", "(La;)V"), "grow");
		assert_eq!(resolver.map_method_name("b", "m", "()V"), "m");
		Ok(())
	}

	#[test]
	fn constructors_keep_their_names() -> Result<()> {
		let resolver = resolver()?;
		assert_eq!(resolver.map_method_name("a", "<init>", "()V"), "<init>");
		assert_eq!(resolver.map_method_name("a", "<clinit>", "()V"), "<clinit>");
		Ok(())
	}

	#[test]
	fn coverage() -> Result<()> {
		let resolver = resolver()?;
		let clone = resolver.clone();
		resolver.map_class("a");
		clone.map_class("c");
		clone.map_field_name("b", "f", "I");

		let report = resolver.coverage();
		assert_eq!((report.types, report.type_misses), (2, 1));
		assert_eq!((report.fields, report.field_misses), (1, 0));
		assert_eq!(report.methods, 0);
		Ok(())
	}
}
