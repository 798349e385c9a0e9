use std::fs;
use std::path::Path;

use modelrun::store::{FileRole, ModelFileEntry, ModelReference, ModelStore, RefFile, Scheme};

/// Commit a fully-present model directly into `store`'s on-disk layout,
/// bypassing the pull engine — mirrors `store::mod.rs`'s own test helper.
pub fn write_committed_model(
	store: &ModelStore,
	scheme: Scheme,
	path: &str,
	tag: &str,
	file_name: &str,
	content: &[u8],
) -> ModelReference {
	let r = ModelReference {
		scheme,
		path: path.to_string(),
		tag: tag.to_string(),
	};

	let hash = {
		use sha2::{Digest, Sha256};
		let mut hasher = Sha256::new();
		hasher.update(content);
		hex::encode(hasher.finalize())
	};

	fs::create_dir_all(store.blobs_dir(&r)).unwrap();
	fs::write(store.blobs_dir(&r).join(&hash), content).unwrap();
	fs::create_dir_all(store.snapshot_dir(&r)).unwrap();
	symlink_or_copy(&store.blobs_dir(&r).join(&hash), &store.snapshot_dir(&r).join(file_name));

	let lock = store.reserve(&r).unwrap();
	let mut rf = RefFile::new(&r.tag);
	rf.model_files.push(ModelFileEntry {
		name: file_name.to_string(),
		hash: format!("sha256-{hash}"),
		role: FileRole::Model,
		is_partial: false,
		size: content.len() as u64,
		modified: 0.0,
		extra: serde_json::Map::new(),
	});
	store.commit(&lock, &r, &rf).unwrap();
	r
}

#[cfg(unix)]
fn symlink_or_copy(src: &Path, dst: &Path) {
	std::os::unix::fs::symlink(src, dst).unwrap();
}

#[cfg(not(unix))]
fn symlink_or_copy(src: &Path, dst: &Path) {
	fs::copy(src, dst).unwrap();
}
