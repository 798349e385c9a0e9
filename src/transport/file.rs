//! Local file transport (spec.md §4.F) — the model already lives on disk;
//! pulling is a copy/link, not a download.

use std::path::Path;

use crate::store::{FileRole, ModelReference};

use super::{ManifestEntry, PullOptions, TransportError};

pub struct FileTransport {
	pub reference: ModelReference,
}

impl FileTransport {
	pub fn new(reference: ModelReference) -> Self {
		Self { reference }
	}

	fn local_path(&self) -> &str {
		&self.reference.path
	}

	pub async fn manifest(&self, _opts: &PullOptions) -> Result<Vec<ManifestEntry>, TransportError> {
		let path = self.local_path();
		if !Path::new(path).exists() {
			return Err(TransportError::LocalPathMissing(path.to_string()));
		}

		let name = path.rsplit('/').next().unwrap_or(path).to_string();
		Ok(vec![ManifestEntry {
			url: format!("file://{path}"),
			expected_sha256: String::new(),
			size: std::fs::metadata(path).map(|m| m.len()).unwrap_or(0),
			role: FileRole::Model,
			name,
		}])
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::Scheme;
	use tempfile::NamedTempFile;

	#[tokio::test]
	async fn missing_local_path_is_hard_error() {
		let reference = ModelReference {
			scheme: Scheme::File,
			path: "/nonexistent/path/model.gguf".to_string(),
			tag: "latest".to_string(),
		};
		let t = FileTransport::new(reference);
		let err = t.manifest(&PullOptions::default()).await.unwrap_err();
		assert!(matches!(err, TransportError::LocalPathMissing(_)));
	}

	#[tokio::test]
	async fn existing_local_path_yields_one_manifest_entry() {
		let file = NamedTempFile::new().unwrap();
		let reference = ModelReference {
			scheme: Scheme::File,
			path: file.path().to_str().unwrap().to_string(),
			tag: "latest".to_string(),
		};
		let t = FileTransport::new(reference);
		let manifest = t.manifest(&PullOptions::default()).await.unwrap();
		assert_eq!(manifest.len(), 1);
	}
}
