use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use log::{debug, info, LevelFilter};
use mappings::Mappings;
use mappings::srg::McpNames;
use remapper::{ClassOrder, PoolSize, RemapEngine, RunConfig};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum MappingsFormat {
	#[default]
	/// The ProGuard format Mojang publishes mappings in.
	Mojang,
	/// The tab indented SRG format, optionally with MCP names.
	Srg,
}

/// Remaps the names of classes, fields and methods inside a jar.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
	/// The mappings file.
	#[arg(short = 'm', long = "mappings")]
	mappings: PathBuf,

	#[arg(long = "format", value_enum, default_value_t)]
	format: MappingsFormat,

	/// The MCP `fields.csv` for SRG mappings.
	#[arg(long = "srg-fields")]
	srg_fields: Option<PathBuf>,

	/// The MCP `methods.csv` for SRG mappings.
	#[arg(long = "srg-methods")]
	srg_methods: Option<PathBuf>,

	/// The jar to remap.
	#[arg(short = 'i', long = "input")]
	input: PathBuf,

	/// Where to put the remapped jar. Only written if remapping succeeds.
	#[arg(short = 'o', long = "output")]
	output: PathBuf,

	/// The number of threads remapping classes. Zero means no limit.
	#[arg(short = 't', long = "threads")]
	threads: Option<usize>,

	/// The name of the mappings in the log. Defaults to the file name.
	#[arg(long = "name")]
	name: Option<String>,

	/// Write remapped classes in the order they're done, instead of sorted by name.
	#[arg(long = "completion-order")]
	completion_order: bool,

	/// Be verbose, twice for even more output.
	#[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
	verbose: u8,

	/// Only print warnings and errors.
	#[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
	quiet: bool,
}

impl Cli {
	fn level(&self) -> LevelFilter {
		match (self.quiet, self.verbose) {
			(true, _) => LevelFilter::Warn,
			(false, 0) => LevelFilter::Info,
			(false, 1) => LevelFilter::Debug,
			(false, _) => LevelFilter::Trace,
		}
	}

	fn worker_pool_size(&self) -> PoolSize {
		match self.threads {
			None => PoolSize::default(),
			Some(threads) => NonZeroUsize::new(threads).map_or(PoolSize::Unbounded, PoolSize::Bounded),
		}
	}

	fn run_config(&self, mappings: &Mappings) -> RunConfig {
		RunConfig {
			mappings_name: self.name.clone().unwrap_or_else(|| mappings.name().to_owned()),
			worker_pool_size: self.worker_pool_size(),
			class_order: if self.completion_order { ClassOrder::Completion } else { ClassOrder::Sorted },
		}
	}

	fn read_mappings(&self) -> Result<Mappings> {
		match self.format {
			MappingsFormat::Mojang => mappings::mojang::read_file(&self.mappings),
			MappingsFormat::Srg => {
				let mut names = McpNames::default();
				if let Some(path) = &self.srg_fields {
					names.fields = mappings::srg::read_names_file(path)?;
				}
				if let Some(path) = &self.srg_methods {
					names.methods = mappings::srg::read_names_file(path)?;
				}
				mappings::srg::read_file(&self.mappings, &names)
			},
		}
	}
}

fn setup_logger(level: LevelFilter) -> Result<()> {
	fern::Dispatch::new()
		.format(|out, message, record| {
			out.finish(format_args!(
				"{} {:<5} [{}] {}",
				chrono::Local::now().format("%H:%M:%S%.3f"),
				record.level(),
				record.target(),
				message,
			))
		})
		.level(level)
		.chain(std::io::stderr())
		.apply()
		.context("failed to set up logging")
}

/// Writes next to `path` first, so that a failed write never leaves a broken archive behind.
fn write_output(path: &Path, write: impl FnOnce(BufWriter<File>) -> Result<()>) -> Result<()> {
	let mut temporary = path.as_os_str().to_owned();
	temporary.push(".tmp");
	let temporary = PathBuf::from(temporary);

	let file = File::create(&temporary)
		.with_context(|| anyhow!("failed to create {temporary:?}"))?;

	if let Err(e) = write(BufWriter::new(file)) {
		if let Err(remove) = std::fs::remove_file(&temporary) {
			debug!("failed to remove {temporary:?}: {remove}");
		}
		return Err(e);
	}

	std::fs::rename(&temporary, path)
		.with_context(|| anyhow!("failed to move {temporary:?} to {path:?}"))
}

fn main() -> Result<()> {
	let cli = Cli::parse();
	setup_logger(cli.level())?;

	let start = std::time::Instant::now();

	let mappings = cli.read_mappings()?;
	info!("read {} types from {:?} in {:?}", mappings.len(), cli.mappings, start.elapsed());

	let config = cli.run_config(&mappings);
	let engine = RemapEngine::new(mappings, config);

	let input = File::open(&cli.input)
		.with_context(|| anyhow!("failed to open input jar {:?}", cli.input))?;
	let remapped = engine.run(BufReader::new(input))
		.with_context(|| anyhow!("failed to remap {:?}", cli.input))?;

	write_output(&cli.output, |writer| remapped.write(writer))
		.with_context(|| anyhow!("failed to write output jar {:?}", cli.output))?;

	info!("wrote {:?} in {:?}", cli.output, start.elapsed());
	Ok(())
}
