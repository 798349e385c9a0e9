//! Unit-file generators (spec.md §4.K) — emit a quadlet/kube/compose
//! definition for a model instead of running it, grounded in
//! `original_source/ramalama/runtime/generators/compose.py` and its
//! siblings for quadlet and kube.

mod compose;
mod kube;
mod quadlet;

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::Kind;

#[derive(Debug, Error)]
pub enum GeneratorError {
	#[error("{0}")]
	Io(#[from] io::Error),
}

impl GeneratorError {
	pub fn kind(&self) -> Kind {
		Kind::Io
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
	Quadlet,
	Kube,
	Compose,
}

/// Everything a generator needs to describe a single served model, already
/// resolved by the serve-assembly engine (SPEC_FULL.md §9: generators never
/// re-derive runtime choice or port, they only reformat an assembled plan).
#[derive(Debug, Clone)]
pub struct GeneratorInput {
	pub served_identity: String,
	pub container_name: String,
	pub image: String,
	pub mount_spec: String,
	pub host_port: u16,
	pub container_port: u16,
	pub command: Vec<String>,
	/// Accelerator device nodes to leak into the generated unit
	/// (spec.md §4.H device auto-detection).
	pub devices: Vec<String>,
	/// Environment variables to set on the generated unit.
	pub env: Vec<(String, String)>,
	/// `(section, key, value)` lines to splice into a quadlet unit
	/// (`--add-to-unit SECTION:KEY:VALUE`); ignored by the other formats.
	pub custom_lines: Vec<(String, String, String)>,
}

pub fn render(format: OutputFormat, input: &GeneratorInput) -> String {
	match format {
		OutputFormat::Quadlet => quadlet::render(input),
		OutputFormat::Kube => kube::render(input),
		OutputFormat::Compose => compose::render(input),
	}
}

/// Render and write the generated unit to `output_dir`, returning the path
/// written. File name and extension follow each format's own convention.
pub fn write_to(format: OutputFormat, input: &GeneratorInput, output_dir: &Path) -> Result<PathBuf, GeneratorError> {
	std::fs::create_dir_all(output_dir)?;
	let file_name = match format {
		OutputFormat::Quadlet => format!("{}.container", input.container_name),
		OutputFormat::Kube => format!("{}.yaml", input.container_name),
		OutputFormat::Compose => "docker-compose.yaml".to_string(),
	};
	let path = output_dir.join(file_name);
	std::fs::write(&path, render(format, input))?;
	Ok(path)
}

#[cfg(test)]
pub(crate) fn sample_input() -> GeneratorInput {
	GeneratorInput {
		served_identity: "ollama/library/tinyllama:latest".to_string(),
		container_name: "modelrun-tinyllama".to_string(),
		image: "quay.io/modelrun/runtime:0.1-cpu".to_string(),
		mount_spec: "type=bind,src=/store/snapshot,destination=/mnt/models,ro".to_string(),
		host_port: 8080,
		container_port: 8080,
		command: vec![
			"llama-server".to_string(),
			"-m".to_string(),
			"/mnt/models/model.gguf".to_string(),
		],
		devices: Vec::new(),
		env: Vec::new(),
		custom_lines: Vec::new(),
	}
}
