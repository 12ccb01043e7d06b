//! A crate for reading, rewriting and writing [Java Class Files](https://docs.oracle.com/javase/specs/jvms/se22/html/jvms-4.html).
//!
//! Unlike a full class file model, a [`ClassFile`] keeps its constant pool index-stable: entries are only ever replaced
//! in place or appended. Bytecode, stack map frames and attributes this crate doesn't understand reference the pool by
//! index, so they stay valid without being parsed at all. This is what makes [`remap::remap_class`] cheap.
//!
//! ```
//! use classfile::ClassFile;
//! use classfile::pool::Pool;
//!
//! let mut pool = Pool::new();
//! let this_class = pool.put_class("org/example/Main").unwrap();
//! let super_class = pool.put_class("java/lang/Object").unwrap();
//!
//! let class = ClassFile::new(52, pool, this_class, super_class);
//! let bytes = class.to_bytes().unwrap();
//!
//! let read = ClassFile::read(&bytes).unwrap();
//! assert_eq!(read.name().unwrap(), "org/example/Main");
//! assert_eq!(read.to_bytes().unwrap(), bytes);
//! ```

pub mod class;
pub mod constants;
pub mod pool;
pub mod remap;
pub mod remapper;
mod bytes;
mod signature;
mod jstring;

pub use class::{AttributeInfo, ClassFile, MemberInfo};
pub use remapper::Remapper;
