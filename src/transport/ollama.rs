//! Ollama transport (spec.md §4.F) — walks a registry v2 manifest.
//!
//! Grounded in the teacher's `enrichment/ollama.rs::OllamaClient` for the
//! `reqwest::Client` + typed-response shape.

use reqwest::Client;
use serde::Deserialize;

use crate::naming;
use crate::store::{FileRole, ModelReference};

use super::{ManifestEntry, PullOptions, TransportError};

#[derive(Debug, Deserialize)]
struct RegistryManifest {
	layers: Vec<Layer>,
}

#[derive(Debug, Deserialize)]
struct Layer {
	digest: String,
	size: u64,
	#[serde(rename = "mediaType")]
	media_type: String,
}

pub struct OllamaTransport {
	pub reference: ModelReference,
	client: Client,
}

impl OllamaTransport {
	pub fn new(reference: ModelReference) -> Self {
		Self {
			reference,
			client: Client::new(),
		}
	}

	fn manifest_url(&self) -> String {
		format!(
			"https://registry.ollama.ai/v2/{}/manifests/{}",
			self.reference.path, self.reference.tag
		)
	}

	fn blob_url(&self, digest: &str) -> String {
		format!(
			"https://registry.ollama.ai/v2/{}/blobs/{}",
			self.reference.path, digest
		)
	}

	pub async fn manifest(&self, _opts: &PullOptions) -> Result<Vec<ManifestEntry>, TransportError> {
		let response = self.client.get(self.manifest_url()).send().await?;
		if !response.status().is_success() {
			return Err(TransportError::from_status(
				response.status(),
				&self.reference.canonical(),
			));
		}
		let manifest: RegistryManifest = response.json().await?;

		Ok(manifest
			.layers
			.into_iter()
			.filter(|l| layer_role(&l.media_type).is_some())
			.map(|l| {
				let role = layer_role(&l.media_type).unwrap();
				let hash = naming::rm_until_substring(&l.digest, "sha256:");
				ManifestEntry {
					name: format!("sha256-{hash}.gguf"),
					url: self.blob_url(&l.digest),
					expected_sha256: hash.clone(),
					size: l.size,
					role,
				}
			})
			.collect())
	}
}

fn layer_role(media_type: &str) -> Option<FileRole> {
	match media_type {
		"application/vnd.ollama.image.model" => Some(FileRole::Model),
		"application/vnd.ollama.image.projector" => Some(FileRole::Mmproj),
		"application/vnd.ollama.image.template" => Some(FileRole::ChatTemplate),
		_ => None,
	}
}
