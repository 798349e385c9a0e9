//! Content-addressed model store (spec.md §3, §4.B).
//!
//! Layout: `<root>/<scheme>/<path>/{blobs,snapshots,refs}`. The ref file is
//! the authoritative index; a model is "present" iff its ref exists, every
//! blob it names exists, and nothing is marked partial.

pub mod lock;
pub mod reference;
pub mod reffile;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::Kind;
pub use lock::{ExclusiveLock, SharedLock};
pub use reference::{ModelReference, ReferenceError, Scheme};
pub use reffile::{FileRole, ModelFileEntry, RefFile, RefFileError};

const LOCK_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum StoreError {
	#[error("{0}")]
	Io(#[from] std::io::Error),
	#[error(transparent)]
	Lock(#[from] lock::LockError),
	#[error(transparent)]
	RefFile(#[from] RefFileError),
	#[error(transparent)]
	Reference(#[from] ReferenceError),
	#[error("model not present: {0}")]
	NotFound(String),
}

impl StoreError {
	pub fn kind(&self) -> Kind {
		match self {
			StoreError::Io(_) => Kind::Io,
			StoreError::Lock(e) => e.kind(),
			StoreError::RefFile(e) => e.kind(),
			StoreError::Reference(e) => e.kind(),
			StoreError::NotFound(_) => Kind::NotFound,
		}
	}
}

#[derive(Debug, Clone)]
pub struct FileInfo {
	pub name: String,
	pub role: FileRole,
	pub size: u64,
	pub modified: DateTime<Utc>,
	pub is_partial: bool,
}

pub struct ModelStore {
	root: PathBuf,
}

impl ModelStore {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	fn model_dir(&self, r: &ModelReference) -> PathBuf {
		self.root.join(r.scheme.as_str()).join(&r.path)
	}

	pub fn blobs_dir(&self, r: &ModelReference) -> PathBuf {
		self.model_dir(r).join("blobs")
	}

	pub fn snapshot_dir(&self, r: &ModelReference) -> PathBuf {
		self.model_dir(r).join("snapshots").join(&r.tag)
	}

	fn refs_dir(&self, r: &ModelReference) -> PathBuf {
		self.model_dir(r).join("refs")
	}

	fn ref_path(&self, r: &ModelReference) -> PathBuf {
		self.refs_dir(r).join(format!("{}.json", r.tag))
	}

	/// Acquire the exclusive writer lock for `r`'s directory (pull/remove).
	pub fn reserve(&self, r: &ModelReference) -> Result<ExclusiveLock, StoreError> {
		let dir = self.model_dir(r);
		fs::create_dir_all(&dir)?;
		Ok(ExclusiveLock::acquire(&dir, LOCK_TIMEOUT)?)
	}

	/// Atomically replace the ref file under the lock held by `reserve`.
	/// `_handle` is taken by reference purely to prove the caller is still
	/// holding the lock; the lock itself guards nothing in-process beyond
	/// that proof.
	pub fn commit(
		&self,
		_handle: &ExclusiveLock,
		r: &ModelReference,
		ref_file: &RefFile,
	) -> Result<(), StoreError> {
		fs::create_dir_all(self.refs_dir(r))?;
		ref_file.commit(&self.ref_path(r))?;
		Ok(())
	}

	pub fn exists(&self, r: &ModelReference) -> bool {
		match self.load_ref(r) {
			Ok(rf) => rf.is_complete(&self.blobs_dir(r)),
			Err(_) => false,
		}
	}

	fn load_ref(&self, r: &ModelReference) -> Result<RefFile, StoreError> {
		let path = self.ref_path(r);
		if !path.is_file() {
			return Err(StoreError::NotFound(r.canonical()));
		}
		Ok(RefFile::load(&path, &r.tag, &self.snapshot_dir(r))?)
	}

	/// Take a shared reader lock and return the snapshot directory plus the
	/// parsed ref, for serve-time consumption (spec.md §4.B
	/// `open_for_serve`).
	pub fn open_for_serve(&self, r: &ModelReference) -> Result<(SharedLock, PathBuf, RefFile), StoreError> {
		let ref_file = self.load_ref(r)?;
		if !ref_file.is_complete(&self.blobs_dir(r)) {
			return Err(StoreError::NotFound(r.canonical()));
		}
		let dir = self.model_dir(r);
		let lock = SharedLock::acquire(&dir, LOCK_TIMEOUT)?;
		Ok((lock, self.snapshot_dir(r), ref_file))
	}

	/// Remove ref, snapshot, and any now-orphaned blobs (spec.md §3, §4.B).
	/// Ref is deleted before the snapshot, and the snapshot before blobs, so
	/// a concurrent reader that already saw the ref still finds its blobs.
	pub fn remove(&self, r: &ModelReference) -> Result<bool, StoreError> {
		let lock = self.reserve(r)?;
		let ref_path = self.ref_path(r);
		if !ref_path.is_file() {
			return Ok(false);
		}

		let ref_file = RefFile::load(&ref_path, &r.tag, &self.snapshot_dir(r))?;
		fs::remove_file(&ref_path)?;

		let snapshot_dir = self.snapshot_dir(r);
		if snapshot_dir.is_dir() {
			fs::remove_dir_all(&snapshot_dir)?;
		}

		let still_referenced = self.referenced_hashes_excluding(r, &r.tag)?;
		let blobs_dir = self.blobs_dir(r);
		for file in &ref_file.model_files {
			if still_referenced.contains(file.hash_hex()) {
				continue;
			}
			let blob_path = blobs_dir.join(file.hash_hex());
			let _ = fs::remove_file(blob_path);
		}

		drop(lock);
		Ok(true)
	}

	fn referenced_hashes_excluding(
		&self,
		r: &ModelReference,
		excluding_tag: &str,
	) -> Result<std::collections::HashSet<String>, StoreError> {
		let mut hashes = std::collections::HashSet::new();
		let refs_dir = self.refs_dir(r);
		if !refs_dir.is_dir() {
			return Ok(hashes);
		}
		for entry in fs::read_dir(refs_dir)? {
			let entry = entry?;
			let file_name = entry.file_name().to_string_lossy().to_string();
			let Some(tag) = file_name.strip_suffix(".json") else {
				continue;
			};
			if tag == excluding_tag {
				continue;
			}
			let other_ref = ModelReference {
				scheme: r.scheme,
				path: r.path.clone(),
				tag: tag.to_string(),
			};
			if let Ok(rf) = self.load_ref(&other_ref) {
				for f in rf.model_files {
					hashes.insert(f.hash_hex().to_string());
				}
			}
		}
		Ok(hashes)
	}

	/// Walk the whole store, returning every (reference, ref file) pair
	/// whose ref is syntactically loadable, skipping anything that fails to
	/// parse. Used by `list_models` and the router planner.
	pub fn walk_refs(&self) -> Result<Vec<(ModelReference, RefFile)>, StoreError> {
		let mut out = Vec::new();
		if !self.root.is_dir() {
			return Ok(out);
		}
		for scheme_entry in fs::read_dir(&self.root)? {
			let scheme_entry = scheme_entry?;
			if !scheme_entry.file_type()?.is_dir() {
				continue;
			}
			let Ok(scheme) = parse_scheme_dir(&scheme_entry.file_name().to_string_lossy()) else {
				continue;
			};
			self.walk_scheme_dir(scheme, &scheme_entry.path(), "", &mut out)?;
		}
		Ok(out)
	}

	fn walk_scheme_dir(
		&self,
		scheme: Scheme,
		dir: &Path,
		path_prefix: &str,
		out: &mut Vec<(ModelReference, RefFile)>,
	) -> Result<(), StoreError> {
		let refs_dir = dir.join("refs");
		if refs_dir.is_dir() {
			for entry in fs::read_dir(&refs_dir)? {
				let entry = entry?;
				let name = entry.file_name().to_string_lossy().to_string();
				let Some(tag) = name.strip_suffix(".json") else {
					continue;
				};
				let r = ModelReference {
					scheme,
					path: path_prefix.trim_start_matches('/').to_string(),
					tag: tag.to_string(),
				};
				if let Ok(rf) = self.load_ref(&r) {
					out.push((r, rf));
				}
			}
		}

		for entry in fs::read_dir(dir)? {
			let entry = entry?;
			if !entry.file_type()?.is_dir() {
				continue;
			}
			let name = entry.file_name().to_string_lossy().to_string();
			if matches!(name.as_str(), "blobs" | "snapshots" | "refs") {
				continue;
			}
			let next_prefix = format!("{path_prefix}/{name}");
			self.walk_scheme_dir(scheme, &entry.path(), &next_prefix, out)?;
		}
		Ok(())
	}

	/// Enumerate every complete model, aggregating per-ref file metadata
	/// (spec.md §4.B `list_models`). Partial refs are skipped unless
	/// `show_partial` is set.
	pub fn list_models(
		&self,
		show_partial: bool,
	) -> Result<BTreeMap<String, Vec<FileInfo>>, StoreError> {
		let mut out = BTreeMap::new();
		for (r, rf) in self.walk_refs()? {
			let complete = rf.is_complete(&self.blobs_dir(&r));
			if !complete && !show_partial {
				continue;
			}
			let infos = rf
				.model_files
				.iter()
				.map(|f| FileInfo {
					name: f.name.clone(),
					role: f.role,
					size: f.size,
					modified: DateTime::from_timestamp(f.modified as i64, 0).unwrap_or_else(Utc::now),
					is_partial: f.is_partial,
				})
				.collect();
			out.insert(r.canonical(), infos);
		}
		Ok(out)
	}
}

fn parse_scheme_dir(name: &str) -> Result<Scheme, ReferenceError> {
	match name {
		"hf" => Ok(Scheme::Hf),
		"ollama" => Ok(Scheme::Ollama),
		"ms" => Ok(Scheme::ModelScope),
		"oci" => Ok(Scheme::Oci),
		"http" => Ok(Scheme::Http),
		"https" => Ok(Scheme::Https),
		"file" => Ok(Scheme::File),
		other => Err(ReferenceError::UnknownScheme(other.to_string())),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use reffile::{FileRole, ModelFileEntry};

	fn make_ref(path: &str, tag: &str) -> ModelReference {
		ModelReference {
			scheme: Scheme::Ollama,
			path: path.to_string(),
			tag: tag.to_string(),
		}
	}

	fn write_committed_model(store: &ModelStore, r: &ModelReference, content: &[u8]) -> String {
		let hash = {
			use sha2::{Digest, Sha256};
			let mut hasher = Sha256::new();
			hasher.update(content);
			hex::encode(hasher.finalize())
		};
		fs::create_dir_all(store.blobs_dir(r)).unwrap();
		fs::write(store.blobs_dir(r).join(&hash), content).unwrap();
		fs::create_dir_all(store.snapshot_dir(r)).unwrap();
		#[cfg(unix)]
		std::os::unix::fs::symlink(
			store.blobs_dir(r).join(&hash),
			store.snapshot_dir(r).join("model.gguf"),
		)
		.unwrap();

		let lock = store.reserve(r).unwrap();
		let mut rf = RefFile::new(&r.tag);
		rf.model_files.push(ModelFileEntry {
			name: "model.gguf".to_string(),
			hash: format!("sha256-{hash}"),
			role: FileRole::Model,
			is_partial: false,
			size: content.len() as u64,
			modified: reffile::now_unix(),
			extra: serde_json::Map::new(),
		});
		store.commit(&lock, r, &rf).unwrap();
		hash
	}

	#[test]
	fn pull_then_exists_and_list() {
		let dir = tempfile::tempdir().unwrap();
		let store = ModelStore::new(dir.path());
		let r = make_ref("library/tinyllama", "latest");
		write_committed_model(&store, &r, b"weights");

		assert!(store.exists(&r));
		let models = store.list_models(false).unwrap();
		assert_eq!(models.len(), 1);
		assert!(models.contains_key("ollama://library/tinyllama:latest"));
	}

	#[test]
	fn remove_deletes_unshared_blob_but_keeps_shared() {
		let dir = tempfile::tempdir().unwrap();
		let store = ModelStore::new(dir.path());
		let r_a = make_ref("library/tinyllama", "a");
		let r_b = make_ref("library/tinyllama", "b");
		let hash = write_committed_model(&store, &r_a, b"shared-weights");
		// second ref pointing at the same bytes, hence same hash
		fs::create_dir_all(store.snapshot_dir(&r_b)).unwrap();
		#[cfg(unix)]
		std::os::unix::fs::symlink(
			store.blobs_dir(&r_a).join(&hash),
			store.snapshot_dir(&r_b).join("model.gguf"),
		)
		.unwrap();
		let lock = store.reserve(&r_b).unwrap();
		let mut rf = RefFile::new("b");
		rf.model_files.push(ModelFileEntry {
			name: "model.gguf".to_string(),
			hash: format!("sha256-{hash}"),
			role: FileRole::Model,
			is_partial: false,
			size: 14,
			modified: reffile::now_unix(),
			extra: serde_json::Map::new(),
		});
		store.commit(&lock, &r_b, &rf).unwrap();
		drop(lock);

		assert!(store.remove(&r_a).unwrap());
		assert!(!store.exists(&r_a));
		assert!(store.exists(&r_b));
		assert!(store.blobs_dir(&r_a).join(&hash).exists());

		assert!(store.remove(&r_b).unwrap());
		assert!(!store.blobs_dir(&r_b).join(&hash).exists());
	}

	#[test]
	fn remove_missing_model_returns_false() {
		let dir = tempfile::tempdir().unwrap();
		let store = ModelStore::new(dir.path());
		let r = make_ref("nope/nope", "latest");
		assert!(!store.remove(&r).unwrap());
	}

	#[test]
	fn partial_file_excluded_from_list_by_default() {
		let dir = tempfile::tempdir().unwrap();
		let store = ModelStore::new(dir.path());
		let r = make_ref("library/partial", "latest");
		fs::create_dir_all(store.refs_dir(&r)).unwrap();
		let mut rf = RefFile::new("latest");
		rf.model_files.push(ModelFileEntry {
			name: "model.gguf".to_string(),
			hash: format!("sha256-{}", "d".repeat(64)),
			role: FileRole::Model,
			is_partial: true,
			size: 0,
			modified: reffile::now_unix(),
			extra: serde_json::Map::new(),
		});
		rf.commit(&store.ref_path(&r)).unwrap();

		let models = store.list_models(false).unwrap();
		assert!(!models.contains_key("ollama://library/partial:latest"));
	}
}
