//! Remapping whole jars.
//!
//! The [`RemapEngine`] reads an archive, finds the classes the [`Mappings`](mappings::Mappings) know about, and rewrites
//! them with a [`NameResolver`]. Members inherited from other classes of the same archive are found through the
//! [`Composite`] chain of their owner.

pub mod composite;
pub mod engine;
pub mod jar;
pub mod resolver;

pub use composite::{ClassHeader, Composite};
pub use engine::{ClassOrder, JarEntry, Phase, PhaseFailure, PoolSize, RemapEngine, RemappedJar, RunConfig, RunReport};
pub use resolver::{Coverage, CoverageReport, NameResolver};
