//! Running the remapping of a whole archive.
//!
//! A run has four phases:
//! - [`Phase::Scan`]: every entry is read once, in archive order. Classes known to the mappings are parsed into the
//!   working set, everything else is kept as is (except for the signing metadata).
//! - [`Phase::BuildComposites`]: the [`Composite`] chain of every class of the working set is computed.
//! - [`Phase::Remap`]: every class of the working set is rewritten through a [`NameResolver`].
//! - writing, see [`RemappedJar::write`].
//!
//! The two middle phases run one unit per class on the blocking thread pool of a `tokio` runtime. Every unit of a phase
//! runs to its end, and if any of them failed, the run fails with a [`PhaseFailure`] listing all of them.

use std::any::Any;
use std::fmt::{Display, Formatter};
use std::io::{Read, Seek, Write};
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use log::{debug, info, trace, warn};
use tokio::runtime::Runtime;
use tokio::task::JoinSet;
use zip::{DateTime, ZipArchive, ZipWriter};
use zip::write::FileOptions;
use classfile::ClassFile;
use classfile::remap::remap_class;
use mappings::{Direction, Mappings};
use crate::composite::{ClassHeader, Composite};
use crate::jar::{strip_manifest, EntryKind};
use crate::resolver::{CoverageReport, NameResolver};

/// How many threads rewrite classes at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolSize {
	Bounded(NonZeroUsize),
	/// Threads are spawned as needed, and reaped when idle.
	Unbounded,
}

impl Default for PoolSize {
	/// As many threads as there are cores, if that's known.
	fn default() -> PoolSize {
		PoolSize::Bounded(std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN))
	}
}

/// The order remapped classes are written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClassOrder {
	/// Sorted by entry name, so that the output doesn't depend on thread scheduling.
	#[default]
	Sorted,
	/// In the order the classes finished remapping.
	Completion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
	pub mappings_name: String,
	pub worker_pool_size: PoolSize,
	pub class_order: ClassOrder,
}

impl RunConfig {
	pub fn new(mappings_name: impl Into<String>) -> RunConfig {
		RunConfig {
			mappings_name: mappings_name.into(),
			worker_pool_size: PoolSize::default(),
			class_order: ClassOrder::default(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	Scan,
	BuildComposites,
	Remap,
}

impl Display for Phase {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			Phase::Scan => "scanning",
			Phase::BuildComposites => "building composites",
			Phase::Remap => "remapping",
		})
	}
}

/// All the classes that failed in one phase.
///
/// This is returned as an [`anyhow::Error`], use [`anyhow::Error::downcast_ref`] to get it back.
#[derive(Debug)]
pub struct PhaseFailure {
	pub phase: Phase,
	/// The class names with their error, sorted by class name.
	pub failures: Vec<(String, anyhow::Error)>,
}

impl Display for PhaseFailure {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} failed for {} classes", self.phase, self.failures.len())?;
		for (class, error) in &self.failures {
			write!(f, "\n\t{class}: {error:#}")?;
		}
		Ok(())
	}
}

impl std::error::Error for PhaseFailure {}

/// An entry of the output archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JarEntry {
	pub name: String,
	pub data: Vec<u8>,
}

/// What happened in a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
	/// Entries copied over, including stripped manifests.
	pub passthrough: usize,
	pub remapped: usize,
	/// Signature files left out.
	pub dropped: usize,
	pub coverage: CoverageReport,
}

impl Display for RunReport {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "remapped {} classes, copied {} entries, dropped {} signature files ({})",
			self.remapped, self.passthrough, self.dropped, self.coverage)
	}
}

/// The result of a successful run, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct RemappedJar {
	entries: Vec<JarEntry>,
	report: RunReport,
}

impl RemappedJar {
	/// The entries in the order they're written: first the copied ones in archive order, then the remapped classes.
	pub fn entries(&self) -> &[JarEntry] {
		&self.entries
	}

	pub fn report(&self) -> RunReport {
		self.report
	}

	/// Writes the entries as a zip archive. All timestamps are set to 1980-01-01 00:00:00.
	pub fn write(&self, writer: impl Write + Seek) -> Result<()> {
		let mut zip = ZipWriter::new(writer);
		for entry in &self.entries {
			if entry.name.ends_with('/') {
				zip.add_directory(entry.name.as_str(), file_options())?;
			} else {
				zip.start_file(entry.name.as_str(), file_options())?;
				zip.write_all(&entry.data)?;
			}
		}
		zip.finish()?;

		Ok(())
	}
}

fn file_options() -> FileOptions<'static, ()> {
	FileOptions::default().last_modified_time(DateTime::default())
}

/// What scanning an archive found.
#[derive(Debug, Default)]
struct Scan {
	passthrough: Vec<JarEntry>,
	/// Keyed by the name of the class.
	classes: IndexMap<String, ClassFile>,
	headers: IndexMap<String, ClassHeader>,
	dropped: usize,
}

/// Remaps archives with one set of mappings.
///
/// ```no_run
/// use std::fs::File;
/// use remapper::{RemapEngine, RunConfig};
///
/// # fn main() -> anyhow::Result<()> {
/// let mappings = mappings::mojang::read_file("client.txt")?;
/// let engine = RemapEngine::new(mappings, RunConfig::new("client.txt"));
///
/// let remapped = engine.run(File::open("client.jar")?)?;
/// remapped.write(File::create("client-mapped.jar")?)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RemapEngine {
	mappings: Arc<Mappings>,
	config: RunConfig,
}

impl RemapEngine {
	pub fn new(mappings: impl Into<Arc<Mappings>>, config: RunConfig) -> RemapEngine {
		RemapEngine {
			mappings: mappings.into(),
			config,
		}
	}

	pub fn config(&self) -> &RunConfig {
		&self.config
	}

	/// Remaps an archive. Either every class remaps, or an error is returned.
	///
	/// This blocks until the run is done. The phases run on a runtime of their own, driven from a thread of their own,
	/// so calling this from within an async context works, but blocks that task's worker thread. Prefer
	/// [`tokio::task::spawn_blocking`] there.
	pub fn run(&self, reader: impl Read + Seek) -> Result<RemappedJar> {
		info!("remapping with mappings {:?} ({} types)", self.config.mappings_name, self.mappings.len());

		let scan = self.scan(reader)?;
		info!("found {} classes to remap, {} other entries", scan.classes.len(), scan.passthrough.len());

		// no runtime is entered on a fresh thread
		std::thread::scope(|scope| {
			scope.spawn(|| self.remap(scan))
				.join()
				.unwrap_or_else(|panic| Err(anyhow!("remapping panicked: {}", panic_message(panic.as_ref()))))
		})
	}

	fn remap(&self, scan: Scan) -> Result<RemappedJar> {
		let runtime = self.runtime()?;

		let Scan { mut passthrough, classes, headers, dropped } = scan;
		let headers = Arc::new(headers);

		let mappings = Arc::clone(&self.mappings);
		let composite_headers = Arc::clone(&headers);
		let composites = run_phase(&runtime, Phase::BuildComposites, headers.keys().map(|name| (name.clone(), ())), move |name, ()| {
			let composite = Composite::build(name, &mappings, &composite_headers);
			trace!("composite of {name:?} has {} types", composite.chain().len());
			Ok(composite)
		})?;
		info!("built {} composites", composites.len());

		// keep the working set order, independent of the order the units finished in
		let mut composites: IndexMap<String, Composite> = composites.into_iter().collect();
		composites.sort_by(|a, _, b, _| headers.get_index_of(a).cmp(&headers.get_index_of(b)));

		let resolver = NameResolver::new(Arc::clone(&self.mappings), Arc::new(composites));
		let unit_resolver = resolver.clone();
		let remapped = run_phase(&runtime, Phase::Remap, classes, move |name, class| {
			let class = remap_class(class, &unit_resolver)?;
			let mapped_name = class.name()?;
			trace!("remapped {name:?} to {mapped_name:?}");

			Ok(JarEntry {
				name: format!("{mapped_name}.class"),
				data: class.to_bytes()?,
			})
		})?;

		let mut remapped: Vec<JarEntry> = remapped.into_iter().map(|(_, entry)| entry).collect();
		if self.config.class_order == ClassOrder::Sorted {
			remapped.sort_by(|a, b| a.name.cmp(&b.name));
		}

		let report = RunReport {
			passthrough: passthrough.len(),
			remapped: remapped.len(),
			dropped,
			coverage: resolver.coverage(),
		};
		info!("{report}");

		passthrough.extend(remapped);
		Ok(RemappedJar { entries: passthrough, report })
	}

	fn runtime(&self) -> Result<Runtime> {
		let mut builder = tokio::runtime::Builder::new_current_thread();
		if let PoolSize::Bounded(size) = self.config.worker_pool_size {
			builder.max_blocking_threads(size.get());
		}
		builder.build().context("failed to create the runtime for remapping")
	}

	fn scan(&self, reader: impl Read + Seek) -> Result<Scan> {
		let mut zip = ZipArchive::new(reader).context("failed to open archive")?;

		let mut scan = Scan::default();
		let mut failures = Vec::new();

		for index in 0..zip.len() {
			let mut file = zip.by_index(index)?;
			let name = file.name().to_owned();

			let mut data = Vec::new();
			file.read_to_end(&mut data)
				.with_context(|| anyhow!("failed to read entry {name:?}"))?;

			match EntryKind::of(&name) {
				EntryKind::Class(class_name) if self.mappings.resolve_type(class_name, Direction::Obfuscated).is_some() => {
					match read_class(&data) {
						Ok((class_name, _, _)) if scan.classes.contains_key(&class_name) => {
							warn!("entry {name:?} declares the class {class_name:?} a second time");
							failures.push((name, anyhow!("class {class_name:?} was already read from an earlier entry")));
						},
						Ok((class_name, class, header)) => {
							trace!("loaded class {class_name:?}");
							scan.headers.insert(class_name.clone(), header);
							scan.classes.insert(class_name, class);
						},
						Err(e) => failures.push((name, e)),
					}
				},
				EntryKind::Manifest => {
					debug!("stripping manifest {name:?}");
					scan.passthrough.push(JarEntry { name, data: strip_manifest(&data) });
				},
				EntryKind::Signature => {
					debug!("dropping signature file {name:?}");
					scan.dropped += 1;
				},
				EntryKind::Class(_) | EntryKind::Directory | EntryKind::Other => {
					scan.passthrough.push(JarEntry { name, data });
				},
			}
		}

		if !failures.is_empty() {
			failures.sort_by(|(a, _), (b, _)| a.cmp(b));
			return Err(PhaseFailure { phase: Phase::Scan, failures }.into());
		}

		Ok(scan)
	}
}

fn read_class(data: &[u8]) -> Result<(String, ClassFile, ClassHeader)> {
	let class = ClassFile::read(data)?;
	let name = class.name()?;
	let header = ClassHeader::of(&class)?;
	Ok((name, class, header))
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
	if let Some(message) = panic.downcast_ref::<&str>() {
		message
	} else if let Some(message) = panic.downcast_ref::<String>() {
		message
	} else {
		"unknown panic payload"
	}
}

/// Runs `work` for every unit on the blocking pool of `runtime`, waiting for all of them to finish.
///
/// Returns the results in the order the units finished, or a [`PhaseFailure`] with every failed unit.
fn run_phase<I, T, F>(runtime: &Runtime, phase: Phase, units: impl IntoIterator<Item=(String, I)>, work: F) -> Result<Vec<(String, T)>>
	where
		I: Send + 'static,
		T: Send + 'static,
		F: Fn(&str, I) -> Result<T> + Send + Sync + 'static,
{
	let work = Arc::new(work);

	runtime.block_on(async {
		let mut set = JoinSet::new();
		for (name, input) in units {
			let work = Arc::clone(&work);
			set.spawn_blocking(move || {
				let result = std::panic::catch_unwind(AssertUnwindSafe(|| work(&name, input)))
					.unwrap_or_else(|panic| Err(anyhow!("panicked: {}", panic_message(panic.as_ref()))));
				(name, result)
			});
		}

		let mut done = Vec::new();
		let mut failures = Vec::new();
		while let Some(joined) = set.join_next().await {
			let (name, result) = joined.with_context(|| anyhow!("a unit of {phase} didn't finish"))?;
			match result {
				Ok(value) => done.push((name, value)),
				Err(e) => failures.push((name, e)),
			}
		}

		if failures.is_empty() {
			debug!("{phase} finished {} units", done.len());
			Ok(done)
		} else {
			failures.sort_by(|(a, _), (b, _)| a.cmp(b));
			Err(PhaseFailure { phase, failures }.into())
		}
	})
}
