//! Checksum & endian verifier (spec.md §4.A).
//!
//! Grounded in the teacher's `hash_utils.rs::sha256_hex_bytes` (streaming
//! digest shape) and in `original_source/ramalama/utils/crypto.py::
//! verify_checksum` (the `sha256-`/`sha256:` filename convention and the
//! `BadName` failure mode).

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::error::Kind;

const GGUF_MAGIC: [u8; 4] = *b"GGUF";

#[derive(Debug, Error)]
pub enum ChecksumError {
	#[error("{0}")]
	Io(#[from] io::Error),
	#[error("filename does not carry a sha256 checksum: {0}")]
	BadName(String),
	#[error("checksum mismatch for {path}: expected {expected}, got {actual}")]
	Mismatch {
		path: String,
		expected: String,
		actual: String,
	},
}

impl ChecksumError {
	pub fn kind(&self) -> Kind {
		match self {
			ChecksumError::Io(_) => Kind::Io,
			ChecksumError::BadName(_) => Kind::BadName,
			ChecksumError::Mismatch { .. } => Kind::Corrupt,
		}
	}
}

/// GGUF magic-header inspection result (spec.md §4.A).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
	Native,
	Swapped,
	NotGguf,
}

/// Streaming SHA-256 of a file's contents, returned as lowercase hex.
pub fn digest(path: &Path) -> Result<String, ChecksumError> {
	let file = File::open(path)?;
	digest_reader(BufReader::new(file))
}

fn digest_reader<R: Read>(mut reader: R) -> Result<String, ChecksumError> {
	let mut hasher = Sha256::new();
	let mut buf = [0u8; 64 * 1024];
	loop {
		let n = reader.read(&mut buf)?;
		if n == 0 {
			break;
		}
		hasher.update(&buf[..n]);
	}
	Ok(hex::encode(hasher.finalize()))
}

/// Extract the expected digest from a `sha256-<hex>` or `sha256:<hex>` file
/// name. Returns `BadName` if the name carries no recognizable checksum.
pub fn expected_digest(path: &Path) -> Result<String, ChecksumError> {
	let name = path
		.file_name()
		.and_then(|n| n.to_str())
		.ok_or_else(|| ChecksumError::BadName(path.display().to_string()))?;

	let hex_part = if let Some(rest) = name.strip_prefix("sha256-") {
		rest
	} else if let Some(rest) = name.strip_prefix("sha256:") {
		rest
	} else {
		return Err(ChecksumError::BadName(name.to_string()));
	};

	if hex_part.len() < 64 || !hex_part[..64].chars().all(|c| c.is_ascii_hexdigit()) {
		return Err(ChecksumError::BadName(name.to_string()));
	}

	Ok(hex_part[..64].to_lowercase())
}

/// Verify that `path`'s contents hash to the digest carried in its filename.
pub fn verify(path: &Path) -> Result<bool, ChecksumError> {
	let expected = expected_digest(path)?;
	let actual = digest(path)?;
	Ok(actual == expected)
}

/// Verify and return a typed error describing the mismatch, rather than a
/// bare bool, for callers that want to report specifics (e.g. the pull
/// engine rolling back a ref).
pub fn verify_strict(path: &Path) -> Result<(), ChecksumError> {
	let expected = expected_digest(path)?;
	let actual = digest(path)?;
	if actual != expected {
		return Err(ChecksumError::Mismatch {
			path: path.display().to_string(),
			expected,
			actual,
		});
	}
	Ok(())
}

/// Inspect the first 8 bytes of `path` for the GGUF magic, native or
/// byte-swapped.
pub fn gguf_endian(path: &Path) -> Result<Endian, ChecksumError> {
	let mut file = File::open(path)?;
	let mut head = [0u8; 8];
	let n = file.read(&mut head)?;
	if n < 8 {
		return Ok(Endian::NotGguf);
	}

	let magic: [u8; 4] = head[..4].try_into().unwrap();
	if magic == GGUF_MAGIC {
		return Ok(Endian::Native);
	}

	let mut reversed = magic;
	reversed.reverse();
	if reversed == GGUF_MAGIC {
		return Ok(Endian::Swapped);
	}

	Ok(Endian::NotGguf)
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn digest_matches_known_vector() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("empty.bin");
		File::create(&path).unwrap();
		let got = digest(&path).unwrap();
		assert_eq!(
			got,
			"e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b85"
		);
	}

	#[test]
	fn expected_digest_rejects_bad_name() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("model.gguf");
		File::create(&path).unwrap();
		assert!(matches!(
			expected_digest(&path),
			Err(ChecksumError::BadName(_))
		));
	}

	#[test]
	fn verify_roundtrip() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("staging.bin");
		let mut f = File::create(&path).unwrap();
		f.write_all(b"hello world").unwrap();
		drop(f);
		let hash = digest(&path).unwrap();
		let named = dir.path().join(format!("sha256-{hash}"));
		std::fs::rename(&path, &named).unwrap();
		assert!(verify(&named).unwrap());
	}

	#[test]
	fn gguf_endian_detects_native_and_swapped() {
		let dir = tempfile::tempdir().unwrap();
		let native = dir.path().join("native.gguf");
		std::fs::write(&native, b"GGUF\x03\x00\x00\x00").unwrap();
		assert_eq!(gguf_endian(&native).unwrap(), Endian::Native);

		let swapped = dir.path().join("swapped.gguf");
		let mut bytes = b"GGUF\x03\x00\x00\x00".to_vec();
		bytes[0..4].reverse();
		std::fs::write(&swapped, bytes).unwrap();
		assert_eq!(gguf_endian(&swapped).unwrap(), Endian::Swapped);

		let not_gguf = dir.path().join("plain.txt");
		std::fs::write(&not_gguf, b"not a model file").unwrap();
		assert_eq!(gguf_endian(&not_gguf).unwrap(), Endian::NotGguf);
	}
}
