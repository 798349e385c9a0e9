//! Transport interfaces and tagged-variant dispatch (spec.md §4.E, §4.F).
//!
//! The source's per-registry class hierarchy collapses here into one enum
//! with a struct per variant (SPEC_FULL.md §9 design notes) — no trait
//! object, no inheritance, dispatch is a `match`.

pub mod file;
pub mod huggingface;
pub mod modelscope;
pub mod oci;
pub mod ollama;
pub mod url;

use std::path::PathBuf;

use thiserror::Error;

use crate::error::Kind;
use crate::pull::{PullEngine, PullError};
use crate::store::{FileRole, ModelReference, ModelStore, Scheme, StoreError};

#[derive(Debug, Error)]
pub enum TransportError {
	#[error(transparent)]
	Store(#[from] StoreError),
	#[error(transparent)]
	Pull(#[from] PullError),
	#[error("registry request failed: {0}")]
	Request(#[from] reqwest::Error),
	#[error("model not found on registry: {0}")]
	NotFound(String),
	#[error("authentication required for {0}")]
	AuthRequired(String),
	#[error("transient registry error: {0}")]
	Transient(String),
	#[error("OCI transport requires a container engine")]
	EngineRequired,
	#[error("container engine command failed: {0}")]
	EngineFailure(String),
	#[error("local path does not exist: {0}")]
	LocalPathMissing(String),
}

impl TransportError {
	pub fn kind(&self) -> Kind {
		match self {
			TransportError::Store(e) => e.kind(),
			TransportError::Pull(e) => e.kind(),
			TransportError::Request(_) => Kind::Transient,
			TransportError::NotFound(_) => Kind::NotFound,
			TransportError::AuthRequired(_) => Kind::AuthRequired,
			TransportError::Transient(_) => Kind::Transient,
			TransportError::EngineRequired => Kind::EngineMissing,
			TransportError::EngineFailure(_) => Kind::EngineFailure,
			TransportError::LocalPathMissing(_) => Kind::NotFound,
		}
	}

	/// Map a registry HTTP status onto the taxonomy in spec.md §4.F.
	pub fn from_status(status: reqwest::StatusCode, what: &str) -> Self {
		if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
			TransportError::AuthRequired(what.to_string())
		} else if status == reqwest::StatusCode::NOT_FOUND {
			TransportError::NotFound(what.to_string())
		} else if status.is_server_error() {
			TransportError::Transient(format!("{what}: {status}"))
		} else {
			TransportError::Transient(format!("{what}: unexpected status {status}"))
		}
	}
}

/// One file a transport needs pulled: URL, destination digest, size, role.
#[derive(Debug, Clone)]
pub struct ManifestEntry {
	pub name: String,
	pub url: String,
	pub expected_sha256: String,
	pub size: u64,
	pub role: FileRole,
}

/// Typed options threaded through every transport call (SPEC_FULL.md §9:
/// no duck-typed `args` namespace — one record per operation).
#[derive(Debug, Clone, Default)]
pub struct PullOptions {
	pub tls_verify: bool,
	pub authfile: Option<PathBuf>,
	pub engine: Option<String>,
	pub quiet: bool,
	pub include_draft: bool,
}

#[derive(Debug, Clone, Default)]
pub struct RemoveOptions {
	pub ignore: bool,
	pub engine: Option<String>,
}

pub enum Transport {
	HuggingFace(huggingface::HuggingFaceTransport),
	ModelScope(modelscope::ModelScopeTransport),
	Ollama(ollama::OllamaTransport),
	Url(url::UrlTransport),
	File(file::FileTransport),
	Oci(oci::OciTransport),
}

impl Transport {
	/// Select exactly one transport for a canonical reference. `oci://` is
	/// also used as the fallback for a plain `name:tag` that matched no
	/// other scheme (spec.md §4.E), represented here by the caller passing
	/// `Scheme::Oci` directly rather than this function guessing.
	pub fn from_reference(reference: ModelReference) -> Self {
		match reference.scheme {
			Scheme::Hf => Transport::HuggingFace(huggingface::HuggingFaceTransport::new(reference)),
			Scheme::ModelScope => Transport::ModelScope(modelscope::ModelScopeTransport::new(reference)),
			Scheme::Ollama => Transport::Ollama(ollama::OllamaTransport::new(reference)),
			Scheme::Http | Scheme::Https => Transport::Url(url::UrlTransport::new(reference)),
			Scheme::File => Transport::File(file::FileTransport::new(reference)),
			Scheme::Oci => Transport::Oci(oci::OciTransport::new(reference, None)),
		}
	}

	pub fn reference(&self) -> &ModelReference {
		match self {
			Transport::HuggingFace(t) => &t.reference,
			Transport::ModelScope(t) => &t.reference,
			Transport::Ollama(t) => &t.reference,
			Transport::Url(t) => &t.reference,
			Transport::File(t) => &t.reference,
			Transport::Oci(t) => &t.reference,
		}
	}

	pub fn model_name(&self) -> &str {
		&self.reference().path
	}

	pub fn model_tag(&self) -> &str {
		&self.reference().tag
	}

	pub fn model_alias(&self) -> String {
		self.reference().served_identity()
	}

	pub async fn manifest(&self, opts: &PullOptions) -> Result<Vec<ManifestEntry>, TransportError> {
		match self {
			Transport::HuggingFace(t) => t.manifest(opts).await,
			Transport::ModelScope(t) => t.manifest(opts).await,
			Transport::Ollama(t) => t.manifest(opts).await,
			Transport::Url(t) => t.manifest(opts).await,
			Transport::File(t) => t.manifest(opts).await,
			Transport::Oci(_) => Ok(Vec::new()),
		}
	}

	pub async fn pull(
		&self,
		store: &ModelStore,
		engine: &PullEngine,
		opts: &PullOptions,
	) -> Result<(), TransportError> {
		match self {
			Transport::Oci(t) => t.pull(opts).await,
			_ => {
				let manifest = self.manifest(opts).await?;
				engine
					.pull_manifest(store, self.reference(), &manifest, opts)
					.await?;
				Ok(())
			}
		}
	}

	pub async fn remove(&self, store: &ModelStore, opts: &RemoveOptions) -> Result<bool, TransportError> {
		match self {
			Transport::Oci(t) => t.remove(opts).await,
			_ => Ok(store.remove(self.reference())?),
		}
	}

	pub fn exists(&self, store: &ModelStore) -> bool {
		match self {
			Transport::Oci(t) => t.exists(),
			_ => store.exists(self.reference()),
		}
	}

	/// The raw `--mount` spec (no flag prefix) for this model's snapshot,
	/// ready to hand to [`crate::engine::EnginePlanBuilder::mount`].
	pub async fn mount_cmd(&self, store: &ModelStore) -> Result<String, TransportError> {
		match self {
			Transport::Oci(t) => Ok(t.mount_cmd()),
			_ => {
				let dir = store.snapshot_dir(self.reference());
				Ok(format!("type=bind,src={},destination=/mnt/models,ro", dir.display()))
			}
		}
	}

	pub async fn ensure_model_exists(
		&self,
		store: &ModelStore,
		engine: &PullEngine,
		opts: &PullOptions,
	) -> Result<(), TransportError> {
		if self.exists(store) {
			return Ok(());
		}
		self.pull(store, engine, opts).await
	}
}
