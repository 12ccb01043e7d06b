//! An immutable tree of class, field and method names, each in an obfuscated and a mapped namespace.
//!
//! Mappings are assembled with a [`MappingsBuilder`], usually by one of the readers ([`mojang`], [`srg`]), and then
//! [frozen][MappingsBuilder::freeze] into [`Mappings`]. Frozen mappings never change, and can be shared between
//! threads.
//!
//! ```
//! use mappings::{Direction, Member, MappingsBuilder, MethodSpec, TypeSpec};
//!
//! let mut builder = MappingsBuilder::with_date("example", "2024-01-01");
//! let mut apple = TypeSpec::new("a", "org/example/Apple");
//! apple.add_method(MethodSpec::new("b", "grow", "void", ["int", "java/lang/String[]"]));
//! builder.add_type(apple).unwrap();
//! builder.add_type(TypeSpec::new("a$c", "org/example/Apple$Seed")).unwrap();
//! let mappings = builder.freeze();
//!
//! assert_eq!(mappings.map_type_name("a$c"), "org/example/Apple$Seed");
//! assert_eq!(mappings.obfuscate_type_name("org/example/Apple"), "a");
//! assert_eq!(mappings.map_type_name("x"), "x");
//!
//! let apple = mappings.resolve_type("a", Direction::Obfuscated).unwrap();
//! let grow = &apple.methods()[0];
//! assert_eq!(grow.descriptor(&mappings, Direction::Mapped), "(I[Ljava/lang/String;)V");
//! assert_eq!(grow.name(Direction::Obfuscated), "b");
//! ```

mod builder;
mod descriptor;
mod tree;
pub mod mojang;
pub mod srg;

pub use builder::{FieldSpec, MappingsBuilder, MemberSpec, MethodSpec, TypeSpec};
pub use tree::{Direction, Field, Mappings, Member, Method, Type, TypeId};
