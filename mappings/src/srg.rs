//! Reading mappings in the tab indented SRG format, optionally with the names of MCP.
//!
//! ```txt
//! a net/minecraft/Apple
//! 	b field_1234_a
//! 	c (La;I)La$d; func_5678_b
//! a$d net/minecraft/Apple$Seed
//! ```
//!
//! Unindented lines are classes, indented ones fields and methods of the class above. Each line starts with the
//! obfuscated name. SRG names like `field_1234_a` and `func_5678_b` are replaced by the names found in the MCP tables
//! `fields.csv` and `methods.csv`.
//!
//! Method descriptors are in the obfuscated namespace, so they're translated to mapped java style types once all
//! classes are known.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use anyhow::{anyhow, bail, Context, Result};
use indexmap::IndexMap;
use log::{debug, trace, warn};
use crate::{FieldSpec, Mappings, MappingsBuilder, MethodSpec, TypeSpec};

/// The tables translating SRG names to MCP names.
#[derive(Debug, Clone, Default)]
pub struct McpNames {
	pub fields: IndexMap<String, String>,
	pub methods: IndexMap<String, String>,
}

/// Reads a MCP table like `fields.csv`, mapping the first column (`searge`) to the second one (`name`).
///
/// ```
/// let string = "\
/// searge,name,side,desc
/// field_1234_a,value,0,\"The value, if any\"
/// ";
/// let names = mappings::srg::read_names(string.as_bytes()).unwrap();
/// assert_eq!(names.get("field_1234_a").map(String::as_str), Some("value"));
/// ```
pub fn read_names(reader: impl Read) -> Result<IndexMap<String, String>> {
	let mut names = IndexMap::new();

	for (line_number, line) in BufReader::new(reader).lines().enumerate() {
		let line = line?;
		if line.trim().is_empty() {
			continue;
		}

		let mut columns = line.split(',');
		let searge = columns.next().unwrap_or_default().trim();
		let name = columns.next()
			.with_context(|| anyhow!("line {} has no second column: {line:?}", line_number + 1))?
			.trim();

		if line_number == 0 && searge == "searge" {
			continue;
		}

		names.insert(searge.to_owned(), name.to_owned());
	}

	Ok(names)
}

pub fn read_names_file(path: impl AsRef<Path>) -> Result<IndexMap<String, String>> {
	let path = path.as_ref();
	read_names(File::open(path)?)
		.with_context(|| anyhow!("failed to read MCP names file {path:?}"))
}

/// Reads a SRG mappings file, naming the mappings after the file.
pub fn read_file(path: impl AsRef<Path>, names: &McpNames) -> Result<Mappings> {
	let path = path.as_ref();
	let name = path.file_name().map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
	read(name, File::open(path)?, names)
		.with_context(|| anyhow!("failed to read mappings file {path:?} as SRG mappings"))
}

/// A method, waiting for all classes to be known.
#[derive(Debug)]
struct PendingMethod {
	obfuscated_name: String,
	mapped_name: String,
	descriptor: String,
}

/// Reads SRG mappings from the given reader.
///
/// ```
/// use mappings::Direction;
/// use mappings::srg::McpNames;
///
/// let string = "\
/// a org/example/Apple
/// \tb field_1234_a
/// \tc (La;)V grow
/// ";
/// let mappings = mappings::srg::read("example", string.as_bytes(), &McpNames::default()).unwrap();
///
/// let apple = mappings.resolve_type("org/example/Apple", Direction::Mapped).unwrap();
/// assert_eq!(apple.methods()[0].descriptor(&mappings, Direction::Obfuscated), "(La;)V");
/// ```
pub fn read(name: impl Into<String>, reader: impl Read, names: &McpNames) -> Result<Mappings> {
	let mut builder = MappingsBuilder::new(name);
	let mut current: Option<TypeSpec> = None;
	let mut pending: IndexMap<String, Vec<PendingMethod>> = IndexMap::new();

	for (line_number, line) in BufReader::new(reader).lines().enumerate() {
		let line_number = line_number + 1;
		let line = line?;

		read_line(&mut builder, &mut current, &mut pending, names, &line)
			.with_context(|| anyhow!("in line {line_number}: {line:?}"))?;
	}

	if let Some(spec) = current {
		builder.add_type(spec)?;
	}

	for (owner, methods) in pending {
		let mut specs = Vec::with_capacity(methods.len());
		for method in methods {
			let (argument_types, return_type) = java_types(&builder, &method.descriptor)
				.with_context(|| anyhow!("in method {owner:?}.{:?}{:?}", method.obfuscated_name, method.descriptor))?;
			specs.push(MethodSpec::new(method.obfuscated_name, method.mapped_name, return_type, argument_types));
		}

		let spec = builder.get_mut(&owner)
			.with_context(|| anyhow!("methods for unknown type {owner:?}"))?;
		for method in specs {
			spec.add_method(method);
		}
	}

	let mappings = builder.freeze();
	debug!("read {} types from SRG mappings {:?}", mappings.len(), mappings.name());
	Ok(mappings)
}

fn read_line(
	builder: &mut MappingsBuilder,
	current: &mut Option<TypeSpec>,
	pending: &mut IndexMap<String, Vec<PendingMethod>>,
	names: &McpNames,
	line: &str,
) -> Result<()> {
	let trimmed = line.trim();
	if trimmed.is_empty() || trimmed.starts_with('#') {
		return Ok(());
	}

	let (obfuscated, rest) = trimmed.split_once(' ')
		.context("line has an invalid format, expected `obfuscated mapped`")?;
	let obfuscated = obfuscated.replace('.', "/");
	let rest = rest.trim().replace('.', "/");

	if !line.starts_with(char::is_whitespace) {
		if let Some(finished) = current.take() {
			trace!("finished type {:?}", finished.obfuscated_name);
			builder.add_type(finished)?;
		}
		*current = Some(TypeSpec::new(obfuscated, rest));
		return Ok(());
	}

	let spec = current.as_mut().context("member line without a type")?;

	if rest.starts_with('(') {
		let (descriptor, mapped) = rest.rsplit_once(' ')
			.context("method line has no mapped name")?;
		let mapped = translate(mapped, "func_", &names.methods);

		pending.entry(spec.obfuscated_name.clone())
			.or_default()
			.push(PendingMethod {
				obfuscated_name: obfuscated,
				mapped_name: mapped,
				descriptor: descriptor.trim().to_owned(),
			});
	} else {
		let mapped = translate(&rest, "field_", &names.fields);
		spec.add_field(FieldSpec::new(obfuscated, mapped, ""));
	}

	Ok(())
}

/// Replaces a SRG name with its MCP name, if known.
fn translate(name: &str, prefix: &str, names: &IndexMap<String, String>) -> String {
	if name.starts_with(prefix) {
		if let Some(translated) = names.get(name) {
			return translated.clone();
		}
	}
	name.to_owned()
}

/// Splits an obfuscated method descriptor into mapped java style argument types and return type.
fn java_types(builder: &MappingsBuilder, descriptor: &str) -> Result<(Vec<String>, String)> {
	let arguments = descriptor.strip_prefix('(').context("descriptor doesn't start with `(`")?;
	let (arguments, return_type) = arguments.split_once(')').context("descriptor has no `)`")?;

	let mut types = Vec::new();
	let mut rest = arguments;
	while !rest.is_empty() {
		let (java_type, after) = java_type(builder, rest)?;
		types.push(java_type);
		rest = after;
	}

	let (return_type, after) = java_type(builder, return_type)?;
	if !after.is_empty() {
		bail!("trailing data {after:?} after return type");
	}

	Ok((types, return_type))
}

/// Reads one type from the start of `descriptor`, returning it and the rest.
fn java_type<'a>(builder: &MappingsBuilder, descriptor: &'a str) -> Result<(String, &'a str)> {
	let dimensions = descriptor.bytes().take_while(|&b| b == b'[').count();
	let descriptor = &descriptor[dimensions..];

	let (mut java_type, rest) = if let Some(object) = descriptor.strip_prefix('L') {
		let (name, rest) = object.split_once(';')
			.with_context(|| anyhow!("missing `;` in {descriptor:?}"))?;

		let java_type = match builder.get(name) {
			Some(spec) => spec.mapped_name.clone(),
			None => {
				// names with a package are most likely not obfuscated ones
				if !name.contains('/') {
					warn!("no type {name:?} in the mappings, keeping the obfuscated name");
				}
				name.to_owned()
			},
		};
		(java_type, rest)
	} else {
		let mut chars = descriptor.chars();
		let java_type = match chars.next() {
			Some('I') => "int",
			Some('V') => "void",
			Some('Z') => "boolean",
			Some('B') => "byte",
			Some('C') => "char",
			Some('S') => "short",
			Some('D') => "double",
			Some('F') => "float",
			Some('J') => "long",
			Some(other) => bail!("unknown descriptor type {other:?}"),
			None => bail!("unexpected end of descriptor"),
		};
		(java_type.to_owned(), chars.as_str())
	};

	for _ in 0..dimensions {
		java_type.push_str("[]");
	}
	Ok((java_type, rest))
}

#[cfg(test)]
mod testing {
	use anyhow::{anyhow, Result};
	use indexmap::IndexMap;
	use pretty_assertions::assert_eq;
	use crate::{Direction, Member};
	use crate::srg::McpNames;

	const MAPPINGS: &str = "\
a net/minecraft/Apple
\tb field_1234_a
\tc field_1234_b
\td (La;[ILa$e;)La$e; func_5678_a
\td (Ljava/lang/String;)V func_5678_b
\tf ()Lzz; func_9999_c
a$e net/minecraft/Apple$Seed
\ta ()Z func_1111_a
";

	fn names() -> McpNames {
		McpNames {
			fields: IndexMap::from([
				("field_1234_a".to_owned(), "value".to_owned()),
			]),
			methods: IndexMap::from([
				("func_5678_a".to_owned(), "plant".to_owned()),
				("func_1111_a".to_owned(), "isRipe".to_owned()),
			]),
		}
	}

	#[test]
	fn read() -> Result<()> {
		let mappings = super::read("test", MAPPINGS.as_bytes(), &names())?;
		assert_eq!(mappings.len(), 2);
		assert_eq!(mappings.map_type_name("a$e"), "net/minecraft/Apple$Seed");

		let apple = mappings.resolve_type("a", Direction::Obfuscated).ok_or_else(|| anyhow!("no a"))?;
		assert_eq!(apple.resolve_field("b", Direction::Obfuscated).map(|f| f.mapped_name()), Some("value"));
		assert_eq!(apple.resolve_field("c", Direction::Obfuscated).map(|f| f.mapped_name()), Some("field_1234_b"));
		assert_eq!(apple.resolve_field("b", Direction::Obfuscated).map(|f| f.field_type()), Some(""));

		let plant = apple.resolve_method(&mappings, "d", "(La;[ILa$e;)La$e;", Direction::Obfuscated)
			.ok_or_else(|| anyhow!("no plant"))?;
		assert_eq!(plant.mapped_name(), "plant");
		assert_eq!(plant.argument_types(), &["net/minecraft/Apple", "int[]", "net/minecraft/Apple$Seed"]);
		assert_eq!(plant.descriptor(&mappings, Direction::Mapped), "(Lnet/minecraft/Apple;[ILnet/minecraft/Apple$Seed;)Lnet/minecraft/Apple$Seed;");

		// overloads with an obfuscated name in common
		let other = apple.resolve_method(&mappings, "d", "(Ljava/lang/String;)V", Direction::Obfuscated)
			.ok_or_else(|| anyhow!("no func_5678_b"))?;
		assert_eq!(other.mapped_name(), "func_5678_b");

		// unknown classes are kept
		let unknown = apple.resolve_method(&mappings, "f", "()Lzz;", Direction::Obfuscated);
		assert!(unknown.is_some());

		let seed = mappings.resolve_type("a$e", Direction::Obfuscated).ok_or_else(|| anyhow!("no a$e"))?;
		assert_eq!(seed.methods()[0].mapped_name(), "isRipe");
		Ok(())
	}

	#[test]
	fn invalid_lines_fail() {
		let names = McpNames::default();
		assert!(super::read("test", "a\n".as_bytes(), &names).is_err());
		assert!(super::read("test", "\tb c\n".as_bytes(), &names).is_err());
		assert!(super::read("test", "a b\n\tc (Q)V d\n".as_bytes(), &names).is_err());
	}

	#[test]
	fn names_csv() -> Result<()> {
		let csv = "searge,name,side,desc\nfunc_1_a,run,2,\n\nfunc_2_b,walk,0,\"Walks, slowly\"\n";
		let names = super::read_names(csv.as_bytes())?;
		assert_eq!(names.len(), 2);
		assert_eq!(names.get("func_2_b").map(String::as_str), Some("walk"));
		Ok(())
	}
}
