//! Plain URL transport (spec.md §4.F) — a single file, named from the
//! trailing path component of the URL.

use crate::store::{FileRole, ModelReference};

use super::{ManifestEntry, PullOptions, TransportError};

pub struct UrlTransport {
	pub reference: ModelReference,
}

impl UrlTransport {
	pub fn new(reference: ModelReference) -> Self {
		Self { reference }
	}

	fn filename(&self) -> String {
		self.reference
			.path
			.rsplit('/')
			.next()
			.unwrap_or(&self.reference.path)
			.to_string()
	}

	pub async fn manifest(&self, _opts: &PullOptions) -> Result<Vec<ManifestEntry>, TransportError> {
		Ok(vec![ManifestEntry {
			name: self.filename(),
			url: format!("{}://{}", self.reference.scheme, self.reference.path),
			expected_sha256: String::new(),
			size: 0,
			role: FileRole::Model,
		}])
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::Scheme;

	#[test]
	fn filename_is_trailing_path_component() {
		let reference = ModelReference {
			scheme: Scheme::Https,
			path: "example.com/models/weights.gguf".to_string(),
			tag: "latest".to_string(),
		};
		let t = UrlTransport::new(reference);
		assert_eq!(t.filename(), "weights.gguf");
	}
}
