//! OCI artifact transport (spec.md §4.F).
//!
//! Unlike the other transports, OCI artifacts are pulled, inspected and
//! removed entirely through the container engine's own image store — no
//! content-addressed blob lives under the model store. Grounded in
//! `original_source/ramalama/transports/oci.py`: `remove` tries
//! `manifest rm`, then falls back to `rmi`, then to `artifact rm`, and an
//! engine invocation failure other than "not found" is fatal even under
//! `--ignore`.

use std::process::Stdio;

use tokio::process::Command;

use crate::store::ModelReference;

use super::{PullOptions, RemoveOptions, TransportError};

const DEFAULT_ENGINE: &str = "podman";

pub struct OciTransport {
	pub reference: ModelReference,
	engine: String,
}

impl OciTransport {
	pub fn new(reference: ModelReference, engine: Option<String>) -> Self {
		Self {
			reference,
			engine: engine.unwrap_or_else(|| DEFAULT_ENGINE.to_string()),
		}
	}

	fn engine_name<'a>(&'a self, override_name: &'a Option<String>) -> &'a str {
		override_name.as_deref().unwrap_or(&self.engine)
	}

	fn image_ref(&self) -> String {
		format!("{}:{}", self.reference.path, self.reference.tag)
	}

	async fn run(&self, engine: &str, args: &[&str]) -> Result<bool, TransportError> {
		let output = Command::new(engine)
			.args(args)
			.stdout(Stdio::null())
			.stderr(Stdio::piped())
			.output()
			.await
			.map_err(|e| TransportError::EngineFailure(e.to_string()))?;

		if output.status.success() {
			return Ok(true);
		}

		let stderr = String::from_utf8_lossy(&output.stderr);
		if stderr.to_lowercase().contains("no such") || stderr.to_lowercase().contains("not found") {
			return Ok(false);
		}
		Err(TransportError::EngineFailure(stderr.trim().to_string()))
	}

	pub async fn pull(&self, opts: &PullOptions) -> Result<(), TransportError> {
		let engine = self.engine_name(&opts.engine);
		let image = self.image_ref();
		let mut args = vec!["pull"];
		if !opts.tls_verify {
			args.push("--tls-verify=false");
		}
		args.push(&image);
		self.run(engine, &args).await?;
		Ok(())
	}

	/// `manifest rm` → `rmi` → `artifact rm`, stopping at the first success.
	/// Under `opts.ignore`, a NotFound from every step is tolerated; any
	/// other engine failure still propagates.
	pub async fn remove(&self, opts: &RemoveOptions) -> Result<bool, TransportError> {
		let engine = self.engine_name(&opts.engine);
		let image = self.image_ref();

		for args in [
			vec!["manifest", "rm", image.as_str()],
			vec!["rmi", image.as_str()],
			vec!["artifact", "rm", image.as_str()],
		] {
			if self.run(engine, &args).await? {
				return Ok(true);
			}
		}

		if opts.ignore {
			Ok(false)
		} else {
			Err(TransportError::NotFound(image))
		}
	}

	pub fn exists(&self) -> bool {
		// Existence is cheap to approximate synchronously by checking the
		// engine's local image list would require another subprocess; the
		// router and CLI instead call `pull`, which is a no-op cache hit
		// when the engine already has the image.
		false
	}

	pub fn mount_cmd(&self) -> String {
		format!("type=image,src={},destination=/mnt/models,ro", self.image_ref())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::Scheme;

	fn reference() -> ModelReference {
		ModelReference {
			scheme: Scheme::Oci,
			path: "quay.io/example/model".to_string(),
			tag: "latest".to_string(),
		}
	}

	#[test]
	fn mount_cmd_uses_image_type() {
		let t = OciTransport::new(reference(), None);
		assert!(t.mount_cmd().starts_with("type=image,src=quay.io/example/model:latest"));
	}

	#[test]
	fn engine_override_takes_precedence() {
		let t = OciTransport::new(reference(), Some("podman".to_string()));
		let opts_engine = Some("docker".to_string());
		assert_eq!(t.engine_name(&opts_engine), "docker");
		assert_eq!(t.engine_name(&None), "podman");
	}
}
