//! Per-(scheme,path) advisory locking (spec.md §4.B, §5).
//!
//! Generalizes the teacher's `file_lock.rs::FileLock` marker-file approach
//! (portable across Unix and Windows, since we can't rely on `flock(2)`
//! uniformly) from a single exclusive lock into the exclusive-writer /
//! shared-reader pair spec.md §5 requires: a writer drains readers before
//! committing, and a reader never observes a half-written ref because the
//! exclusive marker is held for the whole pull/remove.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::error::Kind;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum LockError {
	#[error("{0}")]
	Io(#[from] io::Error),
	#[error("timed out waiting for lock on {0}")]
	TimedOut(String),
}

impl LockError {
	pub fn kind(&self) -> Kind {
		Kind::Io
	}
}

fn exclusive_marker(dir: &Path) -> PathBuf {
	dir.join(".lock")
}

fn readers_dir(dir: &Path) -> PathBuf {
	dir.join(".readers")
}

/// Exclusive, single-writer lock over a model directory. Held for the
/// duration of a pull or remove; dropped (and the marker removed) when the
/// handle goes out of scope.
pub struct ExclusiveLock {
	marker: PathBuf,
}

impl ExclusiveLock {
	/// Acquire the lock, waiting up to `timeout` for any shared readers to
	/// drain and for any other exclusive holder to release.
	pub fn acquire(dir: &Path, timeout: Duration) -> Result<Self, LockError> {
		fs::create_dir_all(dir)?;
		let marker = exclusive_marker(dir);
		let readers = readers_dir(dir);
		let deadline = std::time::Instant::now() + timeout;

		loop {
			match OpenOptions::new().write(true).create_new(true).open(&marker) {
				Ok(_) => break,
				Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
					if std::time::Instant::now() >= deadline {
						return Err(LockError::TimedOut(dir.display().to_string()));
					}
					thread::sleep(POLL_INTERVAL);
					continue;
				}
				Err(e) => return Err(e.into()),
			}
		}

		while readers.is_dir() && fs::read_dir(&readers)?.next().is_some() {
			if std::time::Instant::now() >= deadline {
				let _ = fs::remove_file(&marker);
				return Err(LockError::TimedOut(dir.display().to_string()));
			}
			thread::sleep(POLL_INTERVAL);
		}

		Ok(Self { marker })
	}
}

impl Drop for ExclusiveLock {
	fn drop(&mut self) {
		let _ = fs::remove_file(&self.marker);
	}
}

/// Shared, multi-reader lock. Serve-time reads take this so a concurrent
/// writer knows to wait for them to finish before committing.
pub struct SharedLock {
	reader_marker: PathBuf,
}

impl SharedLock {
	pub fn acquire(dir: &Path, timeout: Duration) -> Result<Self, LockError> {
		fs::create_dir_all(dir)?;
		let marker = exclusive_marker(dir);
		let readers = readers_dir(dir);
		fs::create_dir_all(&readers)?;
		let deadline = std::time::Instant::now() + timeout;

		while marker.exists() {
			if std::time::Instant::now() >= deadline {
				return Err(LockError::TimedOut(dir.display().to_string()));
			}
			thread::sleep(POLL_INTERVAL);
		}

		let reader_marker = readers.join(format!("{}.reader", std::process::id()));
		// best-effort uniqueness: append a thread-local counter-free suffix
		let reader_marker = unique_path(reader_marker);
		fs::write(&reader_marker, b"")?;
		Ok(Self { reader_marker })
	}
}

fn unique_path(base: PathBuf) -> PathBuf {
	let mut candidate = base.clone();
	let mut n = 0u32;
	while candidate.exists() {
		n += 1;
		candidate = base.with_extension(format!("{n}"));
	}
	candidate
}

impl Drop for SharedLock {
	fn drop(&mut self) {
		let _ = fs::remove_file(&self.reader_marker);
	}
}
