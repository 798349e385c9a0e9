//! Pull engine (spec.md §4.G) — resumable, bounded-concurrency download of a
//! transport's manifest into the content-addressed store.
//!
//! Grounded in the teacher's `deploy/async_pipeline.rs` worker-pool shape
//! (a `Semaphore` gating a pool of `tokio::spawn`ed workers) and in
//! `original_source/ramalama/transports/huggingface.py`'s `.partial` staging
//! convention for resumable GETs.

mod retry;

use std::path::Path;
use std::sync::Arc;

use futures_util::StreamExt;
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::checksum::{self, ChecksumError, Endian};
use crate::error::Kind;
use crate::store::{ModelReference, ModelStore, ModelFileEntry, RefFile, StoreError};
use crate::transport::{ManifestEntry, PullOptions};

const MAX_ATTEMPTS: u32 = 5;
const MAX_CONCURRENT_DOWNLOADS: usize = 4;

#[derive(Debug, Error)]
pub enum PullError {
	#[error("{0}")]
	Io(#[from] std::io::Error),
	#[error("download failed: {0}")]
	Request(#[from] reqwest::Error),
	#[error(transparent)]
	Checksum(#[from] ChecksumError),
	#[error(transparent)]
	Store(#[from] StoreError),
	#[error("GGUF endian mismatch for {0}, quarantined")]
	EndianMismatch(String),
	#[error("download did not complete after {0} attempts: {1}")]
	ExhaustedRetries(u32, String),
}

impl PullError {
	pub fn kind(&self) -> Kind {
		match self {
			PullError::Io(_) => Kind::Io,
			PullError::Request(_) => Kind::Transient,
			PullError::Checksum(e) => e.kind(),
			PullError::Store(e) => e.kind(),
			PullError::EndianMismatch(_) => Kind::EndianMismatch,
			PullError::ExhaustedRetries(..) => Kind::Transient,
		}
	}
}

pub struct PullEngine {
	client: reqwest::Client,
	semaphore: Arc<Semaphore>,
}

impl Default for PullEngine {
	fn default() -> Self {
		Self::new(MAX_CONCURRENT_DOWNLOADS)
	}
}

impl PullEngine {
	pub fn new(max_concurrent: usize) -> Self {
		Self {
			client: reqwest::Client::new(),
			semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
		}
	}

	/// Download every entry in `manifest` into `store`'s blob pool for
	/// `reference`, then commit a ref file naming them all. Entries already
	/// present under their expected hash are skipped.
	pub async fn pull_manifest(
		&self,
		store: &ModelStore,
		reference: &ModelReference,
		manifest: &[ManifestEntry],
		opts: &PullOptions,
	) -> Result<(), PullError> {
		let lock = store.reserve(reference)?;
		let blobs_dir = store.blobs_dir(reference);
		let snapshot_dir = store.snapshot_dir(reference);
		fs::create_dir_all(&blobs_dir).await?;
		fs::create_dir_all(&snapshot_dir).await?;

		let mut ref_file = RefFile::new(&reference.tag);

		let results = futures_util::future::join_all(manifest.iter().map(|entry| {
			let engine = self;
			let blobs_dir = blobs_dir.clone();
			async move { engine.fetch_one(entry, &blobs_dir, opts.quiet).await }
		}))
		.await;

		for (entry, result) in manifest.iter().zip(results) {
			let hash = result?;
			let blob_path = blobs_dir.join(&hash);
			let link_path = snapshot_dir.join(&entry.name);
			let _ = fs::remove_file(&link_path).await;
			link(&blob_path, &link_path)?;

			ref_file.model_files.push(ModelFileEntry {
				name: entry.name.clone(),
				hash: format!("sha256-{hash}"),
				role: entry.role,
				is_partial: false,
				size: fs::metadata(&blob_path).await?.len(),
				modified: crate::store::reffile::now_unix(),
				extra: serde_json::Map::new(),
			});
		}

		store.commit(&lock, reference, &ref_file)?;
		info!(model = %reference.canonical(), files = ref_file.model_files.len(), "pull committed");
		Ok(())
	}

	/// Fetch one manifest entry with retry/backoff, verify its digest, guard
	/// against byte-swapped GGUF payloads, and return its content hash. A
	/// blob already present under its expected hash is skipped entirely
	/// (spec.md §4.G step 1); a checksum mismatch is retried once, deleting
	/// the partial first, before being treated as fatal.
	async fn fetch_one(&self, entry: &ManifestEntry, blobs_dir: &Path, quiet: bool) -> Result<String, PullError> {
		if !entry.expected_sha256.is_empty() {
			let existing = blobs_dir.join(&entry.expected_sha256);
			if existing.is_file() && checksum::digest(&existing)? == entry.expected_sha256 {
				if !quiet {
					info!(file = %entry.name, "already present and verified, skipping");
				}
				return Ok(entry.expected_sha256.clone());
			}
		}

		let _permit = self.semaphore.acquire().await.expect("semaphore not closed");
		let partial_path = blobs_dir.join(format!("{}.partial", entry.name));

		let mut corrupt_attempts = 0;
		loop {
			let mut attempt = 0;
			loop {
				attempt += 1;
				match self.download_once(entry, &partial_path, quiet).await {
					Ok(()) => break,
					Err(err) if attempt < MAX_ATTEMPTS && is_transient(&err) => {
						let delay = retry::backoff_delay(attempt);
						warn!(file = %entry.name, attempt, ?delay, "retrying download");
						tokio::time::sleep(delay).await;
						continue;
					}
					Err(err) => return Err(err),
				}
			}

			let hash = checksum::digest(&partial_path)?;
			if !entry.expected_sha256.is_empty() && hash != entry.expected_sha256 {
				let _ = fs::remove_file(&partial_path).await;
				corrupt_attempts += 1;
				if corrupt_attempts <= 1 {
					warn!(file = %entry.name, "checksum mismatch, retrying once");
					continue;
				}
				return Err(PullError::Checksum(ChecksumError::Mismatch {
					path: entry.name.clone(),
					expected: entry.expected_sha256.clone(),
					actual: hash,
				}));
			}

			if entry.name.ends_with(".gguf") {
				if let Endian::Swapped = checksum::gguf_endian(&partial_path)? {
					let quarantine = blobs_dir.join(format!("{hash}.wrongendian"));
					fs::rename(&partial_path, &quarantine).await?;
					return Err(PullError::EndianMismatch(entry.name.clone()));
				}
			}

			let final_path = blobs_dir.join(&hash);
			fs::rename(&partial_path, &final_path).await?;
			return Ok(hash);
		}
	}

	async fn download_once(&self, entry: &ManifestEntry, dest: &Path, quiet: bool) -> Result<(), PullError> {
		let resume_from = match fs::metadata(dest).await {
			Ok(meta) => meta.len(),
			Err(_) => 0,
		};

		let mut request = self.client.get(&entry.url);
		if resume_from > 0 {
			request = request.header("Range", format!("bytes={resume_from}-"));
		}
		let response = request.send().await?;
		let resumed = response.status() == reqwest::StatusCode::PARTIAL_CONTENT;

		let mut file = if resumed {
			tokio::fs::OpenOptions::new().append(true).open(dest).await?
		} else {
			File::create(dest).await?
		};

		let mut stream = response.bytes_stream();
		let mut written = if resumed { resume_from } else { 0 };
		while let Some(chunk) = stream.next().await {
			let chunk = chunk?;
			file.write_all(&chunk).await?;
			written += chunk.len() as u64;
		}
		file.flush().await?;
		if !quiet {
			info!(file = %entry.name, bytes = written, "downloaded");
		}
		Ok(())
	}
}

fn is_transient(err: &PullError) -> bool {
	matches!(err, PullError::Request(_) | PullError::Io(_))
}

#[cfg(unix)]
fn link(src: &Path, dst: &Path) -> Result<(), PullError> {
	std::os::unix::fs::symlink(src, dst)?;
	Ok(())
}

#[cfg(not(unix))]
fn link(src: &Path, dst: &Path) -> Result<(), PullError> {
	std::fs::copy(src, dst)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn retries_io_and_request_errors_but_not_endian_mismatch() {
		assert!(is_transient(&PullError::Io(std::io::Error::new(
			std::io::ErrorKind::Other,
			"boom"
		))));
		assert!(!is_transient(&PullError::EndianMismatch("x".to_string())));
	}
}
