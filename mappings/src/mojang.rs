//! Reading mappings in the format Mojang publishes them in, which is the format of ProGuard.
//!
//! ```txt
//! # comment
//! net.minecraft.Apple -> a:
//!     int value -> b
//!     1:3:void grow(int,java.lang.String[]):10:12 -> c
//! net.minecraft.Apple$Seed -> a$d:
//! ```
//!
//! The left hand side is the mapped name, the right hand side the obfuscated one. Types of members are always in the
//! mapped namespace.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use anyhow::{anyhow, Context, Result};
use log::{debug, trace};
use crate::{FieldSpec, Mappings, MappingsBuilder, MethodSpec, TypeSpec};

/// Reads a mappings file, naming the mappings after the file.
pub fn read_file(path: impl AsRef<Path>) -> Result<Mappings> {
	let path = path.as_ref();
	let name = path.file_name().map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned());
	read(name, File::open(path)?)
		.with_context(|| anyhow!("failed to read mappings file {path:?} as mojang mappings"))
}

/// Reads mappings from the given reader.
///
/// ```
/// use mappings::Direction;
///
/// let string = "\
/// org.example.Apple -> a:
///     int value -> b
/// ";
/// let mappings = mappings::mojang::read("example", string.as_bytes()).unwrap();
///
/// assert_eq!(mappings.map_type_name("a"), "org/example/Apple");
/// ```
pub fn read(name: impl Into<String>, reader: impl Read) -> Result<Mappings> {
	let mut builder = MappingsBuilder::new(name);
	let mut current: Option<TypeSpec> = None;

	for (line_number, line) in BufReader::new(reader).lines().enumerate() {
		let line_number = line_number + 1;
		let line = line?;

		read_line(&mut builder, &mut current, &line)
			.with_context(|| anyhow!("in line {line_number}: {line:?}"))?;
	}

	if let Some(spec) = current {
		builder.add_type(spec)?;
	}

	let mappings = builder.freeze();
	debug!("read {} types from mojang mappings {:?}", mappings.len(), mappings.name());
	Ok(mappings)
}

fn dots_to_slashes(s: &str) -> String {
	s.replace('.', "/")
}

/// Strips the `1:3:` prefix ProGuard puts before methods with line numbers.
fn strip_line_numbers(mut s: &str) -> &str {
	for _ in 0..2 {
		match s.split_once(':') {
			Some((digits, rest)) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => s = rest,
			_ => break,
		}
	}
	s
}

fn read_line(builder: &mut MappingsBuilder, current: &mut Option<TypeSpec>, line: &str) -> Result<()> {
	let trimmed = line.trim();
	if trimmed.is_empty() || trimmed.starts_with('#') {
		return Ok(());
	}

	if !line.starts_with(char::is_whitespace) {
		let (mapped, obfuscated) = trimmed.strip_suffix(':')
			.context("class line doesn't end with `:`")?
			.split_once(" -> ")
			.context("class line has no ` -> `")?;

		if let Some(finished) = current.take() {
			trace!("finished type {:?}", finished.obfuscated_name);
			builder.add_type(finished)?;
		}
		*current = Some(TypeSpec::new(dots_to_slashes(obfuscated.trim()), dots_to_slashes(mapped.trim())));
		return Ok(());
	}

	let spec = current.as_mut().context("member line before any class line")?;

	let (left, obfuscated) = trimmed.split_once(" -> ")
		.context("member line has no ` -> `")?;
	let obfuscated = obfuscated.trim();

	if left.contains('(') {
		let (return_type, rest) = strip_line_numbers(left).split_once(' ')
			.context("method has no return type")?;
		let (mapped, rest) = rest.split_once('(')
			.context("method has no `(`")?;
		// anything after the `)` is the line number range of inlined methods
		let (arguments, _) = rest.split_once(')')
			.context("method has no `)`")?;

		let argument_types: Vec<String> = if arguments.is_empty() {
			Vec::new()
		} else {
			arguments.split(',').map(|argument| dots_to_slashes(argument.trim())).collect()
		};

		spec.add_method(MethodSpec::new(obfuscated, mapped, dots_to_slashes(return_type), argument_types));
	} else {
		let (field_type, mapped) = left.split_once(' ')
			.context("field has no type")?;

		spec.add_field(FieldSpec::new(obfuscated, mapped.trim(), dots_to_slashes(field_type)));
	}

	Ok(())
}

#[cfg(test)]
mod testing {
	use anyhow::{anyhow, Result};
	use pretty_assertions::assert_eq;
	use crate::{Direction, Member};
	use crate::mojang::strip_line_numbers;

	const MAPPINGS: &str = "\
# a comment
# another one
net.minecraft.Apple -> a:
    int value -> b
    java.lang.String[] names -> c
    1:3:void grow(int,java.lang.String[]):10:12 -> d
    net.minecraft.Apple$Seed plant(net.minecraft.Apple) -> e
    void <init>() -> <init>
net.minecraft.Apple$Seed -> a$f:
    4:4:boolean isRipe() -> a
net.minecraft.Core -> g:
";

	#[test]
	fn read() -> Result<()> {
		let mappings = super::read("test", MAPPINGS.as_bytes())?;
		assert_eq!(mappings.name(), "test");
		assert_eq!(mappings.len(), 3);

		assert_eq!(mappings.map_type_name("a"), "net/minecraft/Apple");
		assert_eq!(mappings.map_type_name("a$f"), "net/minecraft/Apple$Seed");
		assert_eq!(mappings.obfuscate_type_name("net/minecraft/Core"), "g");

		let apple = mappings.resolve_type("a", Direction::Obfuscated).ok_or_else(|| anyhow!("no a"))?;
		assert_eq!(apple.fields().len(), 2);
		assert_eq!(apple.resolve_field("c", Direction::Obfuscated).map(|f| f.field_type()), Some("java/lang/String[]"));

		let grow = apple.resolve_method(&mappings, "d", "(I[Ljava/lang/String;)V", Direction::Obfuscated)
			.ok_or_else(|| anyhow!("no grow"))?;
		assert_eq!(grow.mapped_name(), "grow");

		let plant = apple.resolve_method(&mappings, "e", "(La;)La$f;", Direction::Obfuscated)
			.ok_or_else(|| anyhow!("no plant"))?;
		assert_eq!(plant.descriptor(&mappings, Direction::Mapped), "(Lnet/minecraft/Apple;)Lnet/minecraft/Apple$Seed;");

		let seed = mappings.resolve_type("net/minecraft/Apple$Seed", Direction::Mapped).ok_or_else(|| anyhow!("no seed"))?;
		assert_eq!(seed.methods()[0].descriptor(&mappings, Direction::Obfuscated), "()Z");
		Ok(())
	}

	#[test]
	fn nested_before_parent_fails() {
		let mappings = "net.minecraft.Apple$Seed -> a$f:\nnet.minecraft.Apple -> a:\n";
		assert!(super::read("test", mappings.as_bytes()).is_err());
	}

	#[test]
	fn member_before_class_fails() {
		let mappings = "    int value -> b\n";
		let error = super::read("test", mappings.as_bytes()).err();
		assert!(error.is_some_and(|e| format!("{e:?}").contains("line 1")));
	}

	#[test]
	fn malformed_class_line_fails() {
		assert!(super::read("test", "net.minecraft.Apple a:\n".as_bytes()).is_err());
		assert!(super::read("test", "net.minecraft.Apple -> a\n".as_bytes()).is_err());
	}

	#[test]
	fn line_numbers() {
		assert_eq!(strip_line_numbers("1:3:void a()"), "void a()");
		assert_eq!(strip_line_numbers("void a()"), "void a()");
		assert_eq!(strip_line_numbers("12:void a()"), "void a()");
	}
}
