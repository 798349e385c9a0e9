//! ModelScope transport (spec.md §4.F).
//!
//! File listing and filtering mirror the HuggingFace transport; only the
//! API shape differs.

use reqwest::Client;
use serde::Deserialize;

use crate::store::ModelReference;

use super::huggingface::select_model_files;
use super::{ManifestEntry, PullOptions, TransportError};

#[derive(Debug, Deserialize)]
struct FilesResponse {
	#[serde(rename = "Data")]
	data: FilesData,
}

#[derive(Debug, Deserialize)]
struct FilesData {
	#[serde(rename = "Files")]
	files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
	#[serde(rename = "Path")]
	path: String,
}

pub struct ModelScopeTransport {
	pub reference: ModelReference,
	client: Client,
}

impl ModelScopeTransport {
	pub fn new(reference: ModelReference) -> Self {
		Self {
			reference,
			client: Client::new(),
		}
	}

	fn api_url(&self) -> String {
		format!(
			"https://modelscope.cn/api/v1/models/{}/repo/files",
			self.reference.path
		)
	}

	fn download_url(&self, filename: &str) -> String {
		format!(
			"https://modelscope.cn/models/{}/resolve/{}/{}",
			self.reference.path, self.reference.tag, filename
		)
	}

	pub async fn manifest(&self, opts: &PullOptions) -> Result<Vec<ManifestEntry>, TransportError> {
		let response = self.client.get(self.api_url()).send().await?;
		if !response.status().is_success() {
			return Err(TransportError::from_status(
				response.status(),
				&self.reference.canonical(),
			));
		}
		let parsed: FilesResponse = response.json().await?;

		Ok(select_model_files(
			parsed.data.files.into_iter().map(|f| f.path).collect(),
			opts.include_draft,
		)
		.into_iter()
		.map(|(name, role)| ManifestEntry {
			url: self.download_url(&name),
			expected_sha256: String::new(),
			size: 0,
			role,
			name,
		})
		.collect())
	}
}
