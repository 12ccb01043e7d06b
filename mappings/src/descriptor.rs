//! Building descriptors from java style type names like `java/lang/String[]`.

use crate::{Direction, Mappings, Member};

fn primitive(name: &str) -> Option<char> {
	Some(match name {
		"void" => 'V',
		"boolean" => 'Z',
		"char" => 'C',
		"byte" => 'B',
		"short" => 'S',
		"int" => 'I',
		"float" => 'F',
		"long" => 'J',
		"double" => 'D',
		_ => return None,
	})
}

/// Appends the descriptor of a type name in the mapped namespace, translated to `direction`.
fn push_type(s: &mut String, mappings: &Mappings, name: &str, direction: Direction) {
	let mut name = name;
	while let Some(element) = name.strip_suffix("[]") {
		s.push('[');
		name = element;
	}

	if let Some(primitive) = primitive(name) {
		s.push(primitive);
	} else {
		let name = mappings.resolve_type(name, Direction::Mapped)
			.map_or(name, |ty| ty.name(direction));
		s.push('L');
		s.push_str(name);
		s.push(';');
	}
}

pub(crate) fn method_descriptor(mappings: &Mappings, return_type: &str, argument_types: &[String], direction: Direction) -> String {
	let mut s = String::from("(");
	for argument in argument_types {
		push_type(&mut s, mappings, argument, direction);
	}
	s.push(')');
	push_type(&mut s, mappings, return_type, direction);
	s
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use crate::{Direction, MappingsBuilder, TypeSpec};
	use crate::descriptor::method_descriptor;

	#[test]
	fn primitives_and_arrays() {
		let mappings = MappingsBuilder::with_date("empty", "2020-02-02").freeze();
		let args = ["int".to_owned(), "java/lang/String[]".to_owned()];
		assert_eq!(method_descriptor(&mappings, "void", &args, Direction::Mapped), "(I[Ljava/lang/String;)V");

		let args = ["boolean".to_owned(), "char".to_owned(), "byte".to_owned(), "short".to_owned(), "float".to_owned(), "long".to_owned()];
		assert_eq!(method_descriptor(&mappings, "double[][]", &args, Direction::Obfuscated), "(ZCBSFJ)[[D");
	}

	#[test]
	fn names_follow_the_direction() -> anyhow::Result<()> {
		let mut builder = MappingsBuilder::with_date("test", "2020-02-02");
		builder.add_type(TypeSpec::new("a", "pkg/Apple"))?;
		builder.add_type(TypeSpec::new("a$b", "pkg/Apple$Seed"))?;
		let mappings = builder.freeze();

		let args = ["pkg/Apple$Seed[]".to_owned(), "pkg/Unknown".to_owned()];
		assert_eq!(method_descriptor(&mappings, "pkg/Apple", &args, Direction::Mapped), "([Lpkg/Apple$Seed;Lpkg/Unknown;)Lpkg/Apple;");
		assert_eq!(method_descriptor(&mappings, "pkg/Apple", &args, Direction::Obfuscated), "([La$b;Lpkg/Unknown;)La;");
		Ok(())
	}
}
