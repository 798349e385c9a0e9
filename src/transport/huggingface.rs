//! HuggingFace transport (spec.md §4.F).
//!
//! Lists repo files via the HF API, filters to weights/mmproj/chat
//! template, and enumerates split GGUF shards up front. Grounded in the
//! teacher's `enrichment/ollama.rs::OllamaClient` for the `reqwest::Client`
//! shape.

use reqwest::Client;
use serde::Deserialize;

use crate::naming;
use crate::store::{FileRole, ModelReference};

use super::{ManifestEntry, PullOptions, TransportError};

#[derive(Debug, Deserialize)]
struct RepoInfo {
	siblings: Vec<Sibling>,
}

#[derive(Debug, Deserialize)]
struct Sibling {
	rfilename: String,
}

pub struct HuggingFaceTransport {
	pub reference: ModelReference,
	client: Client,
}

impl HuggingFaceTransport {
	pub fn new(reference: ModelReference) -> Self {
		Self {
			reference,
			client: Client::new(),
		}
	}

	fn api_url(&self) -> String {
		format!("https://huggingface.co/api/models/{}", self.reference.path)
	}

	fn download_url(&self, filename: &str) -> String {
		format!(
			"https://huggingface.co/{}/resolve/{}/{}",
			self.reference.path, self.reference.tag, filename
		)
	}

	pub async fn manifest(&self, opts: &PullOptions) -> Result<Vec<ManifestEntry>, TransportError> {
		let mut request = self.client.get(self.api_url());
		if let Some(token) = hf_token(opts) {
			request = request.bearer_auth(token);
		}
		let response = request.send().await?;
		if !response.status().is_success() {
			return Err(TransportError::from_status(
				response.status(),
				&self.reference.canonical(),
			));
		}
		let info: RepoInfo = response.json().await?;

		Ok(select_model_files(
			info.siblings.into_iter().map(|s| s.rfilename).collect(),
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

fn hf_token(opts: &PullOptions) -> Option<String> {
	std::env::var("HF_TOKEN").ok().or_else(|| {
		opts.authfile
			.as_ref()
			.and_then(|p| std::fs::read_to_string(p).ok())
			.map(|s| s.trim().to_string())
	})
}

/// Classify a repo's file listing into the roles spec.md §4.F cares about,
/// including up-front enumeration of split GGUF shards.
pub(super) fn select_model_files(files: Vec<String>, include_draft: bool) -> Vec<(String, FileRole)> {
	let mut out = Vec::new();
	for file in &files {
		if let Some(total) = naming::is_split_file_model(file) {
			out.push((file.clone(), FileRole::Model));
			for index in 2..=total {
				out.push((naming::split_shard_name(file, index, total), FileRole::Model));
			}
			continue;
		}

		if !file.ends_with(".gguf") {
			if file.contains("mmproj") {
				out.push((file.clone(), FileRole::Mmproj));
			} else if file == "chat_template.jinja" || file.ends_with("tokenizer_config.json") {
				out.push((file.clone(), FileRole::ChatTemplate));
			} else if include_draft && file.contains("draft") {
				out.push((file.clone(), FileRole::Draft));
			}
			continue;
		}

		if file.contains("mmproj") {
			out.push((file.clone(), FileRole::Mmproj));
		} else if file.contains("draft") {
			if include_draft {
				out.push((file.clone(), FileRole::Draft));
			}
		} else {
			out.push((file.clone(), FileRole::Model));
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn filters_to_weights_mmproj_and_chat_template() {
		let files = vec![
			"model.gguf".to_string(),
			"mmproj-model.gguf".to_string(),
			"chat_template.jinja".to_string(),
			"README.md".to_string(),
		];
		let selected = select_model_files(files, false);
		assert_eq!(selected.len(), 3);
		assert!(selected.iter().any(|(_, r)| *r == FileRole::Mmproj));
		assert!(selected.iter().any(|(_, r)| *r == FileRole::ChatTemplate));
	}

	#[test]
	fn draft_excluded_unless_explicitly_requested() {
		let files = vec!["draft-model.gguf".to_string()];
		assert!(select_model_files(files.clone(), false).is_empty());
		assert_eq!(select_model_files(files, true).len(), 1);
	}

	#[test]
	fn split_shards_enumerated_up_front() {
		let files = vec!["big-00001-of-00003.gguf".to_string()];
		let selected = select_model_files(files, false);
		assert_eq!(selected.len(), 3);
		assert_eq!(selected[1].0, "big-00002-of-00003.gguf");
		assert_eq!(selected[2].0, "big-00003-of-00003.gguf");
	}
}
