//! Command-line front end (SPEC_FULL.md §2) — a thin `clap` derive that
//! parses argv into typed plan records; all real work happens in the
//! domain modules this dispatches to.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// One `--generate <kind>[:<dir>]` argument, grounded in
/// `cli/_utils.py::parse_generate_option`: the output directory defaults to
/// `.` when omitted or given empty.
#[derive(Debug, Clone)]
pub struct GenerateSpec {
	pub format: GenerateFormat,
	pub output_dir: PathBuf,
}

fn parse_generate_option(option: &str) -> Result<GenerateSpec, String> {
	let (kind, dir) = match option.split_once(':') {
		Some((kind, dir)) => (kind, dir),
		None => (option, ""),
	};
	let output_dir = if dir.is_empty() { PathBuf::from(".") } else { PathBuf::from(dir) };
	let format = match kind {
		"quadlet" => GenerateFormat::Quadlet,
		"kube" => GenerateFormat::Kube,
		"compose" => GenerateFormat::Compose,
		other => return Err(format!("invalid generate kind '{other}' (expected quadlet, kube, or compose)")),
	};
	Ok(GenerateSpec { format, output_dir })
}

/// One `--add-to-unit SECTION:KEY:VALUE` argument (quadlet-only custom line
/// injection).
#[derive(Debug, Clone)]
pub struct CustomUnitLine {
	pub section: String,
	pub key: String,
	pub value: String,
}

fn parse_custom_unit_line(option: &str) -> Result<CustomUnitLine, String> {
	let mut parts = option.splitn(3, ':');
	let (Some(section), Some(key), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
		return Err(format!("invalid --add-to-unit '{option}' (expected SECTION:KEY:VALUE)"));
	};
	Ok(CustomUnitLine { section: section.to_string(), key: key.to_string(), value: value.to_string() })
}

#[derive(Debug, Parser)]
#[command(name = "modelrun", about = "Local lifecycle manager for large language models")]
pub struct Cli {
	/// Explicit configuration file path (overrides layered discovery).
	#[arg(long, global = true)]
	pub config: Option<PathBuf>,

	/// Override the content-addressed store root.
	#[arg(long, global = true)]
	pub store: Option<PathBuf>,

	/// Override the container engine binary (`podman` or `docker`).
	#[arg(long, global = true)]
	pub engine: Option<String>,

	/// Print the assembled container engine command instead of running it.
	#[arg(long, global = true)]
	pub dry_run: bool,

	/// Log every error with its full chain instead of the short summary.
	#[arg(long, global = true)]
	pub debug: bool,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Pull a model into the local store.
	Pull {
		reference: String,
		#[arg(long)]
		tls_verify: bool,
		#[arg(long)]
		authfile: Option<PathBuf>,
		#[arg(long)]
		quiet: bool,
		#[arg(long)]
		include_draft: bool,
	},
	/// Remove one or more models from the local store.
	#[command(alias = "rm")]
	Remove {
		references: Vec<String>,
		#[arg(long)]
		ignore: bool,
		#[arg(long)]
		all: bool,
	},
	/// List models currently in the local store.
	List {
		#[arg(long)]
		show_partial: bool,
	},
	/// Assemble and run (or print) a container-engine invocation that serves
	/// a single model.
	Serve {
		reference: String,
		#[arg(long)]
		port: Option<u16>,
		#[arg(long)]
		detach: bool,
		#[arg(long)]
		name: Option<String>,
	},
	/// Serve every GGUF-bearing model in the store behind one router.
	ServeAll {
		#[arg(long)]
		port: Option<u16>,
	},
	/// Emit a quadlet/kube/compose unit for a model instead of running it.
	Generate {
		reference: String,
		/// `<kind>[:<dir>]`, e.g. `quadlet` or `quadlet:./units`.
		#[arg(long, value_parser = parse_generate_option)]
		generate: GenerateSpec,
		/// `SECTION:KEY:VALUE`, repeatable; quadlet-only custom line injection.
		#[arg(long = "add-to-unit", value_parser = parse_custom_unit_line)]
		add_to_unit: Vec<CustomUnitLine>,
	},
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum GenerateFormat {
	Quadlet,
	Kube,
	Compose,
}
