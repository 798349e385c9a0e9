//! Router mode (spec.md §4.J) — serve every GGUF-bearing model in the store
//! behind one llama.cpp instance, bind-mounted in together under
//! disambiguated aliases. Grounded in `original_source/ramalama/cli/
//! commands/serve.py`'s `_serve_router` / `_enumerate_store_gguf_models`.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::config::Config;
use crate::engine::{self, accel, EnginePlanBuilder, EngineError, EnginePlan};
use crate::error::Kind;
use crate::store::{FileRole, ModelReference, ModelStore, StoreError};

#[derive(Debug, Error)]
pub enum RouterError {
	#[error(transparent)]
	Store(#[from] StoreError),
	#[error(transparent)]
	Engine(#[from] EngineError),
	#[error("no GGUF-bearing models found in the store to route")]
	Empty,
}

impl RouterError {
	pub fn kind(&self) -> Kind {
		match self {
			RouterError::Store(e) => e.kind(),
			RouterError::Engine(e) => e.kind(),
			RouterError::Empty => Kind::NotFound,
		}
	}

	pub fn exit_code(&self) -> i32 {
		match self {
			RouterError::Engine(e) => e.exit_code(),
			other => other.kind().exit_code(),
		}
	}
}

/// One GGUF-bearing model mounted into the router container, with the
/// alias it's mounted under (disambiguated if two refs would otherwise
/// collide on the same bind destination).
#[derive(Debug, Clone)]
pub struct RoutedModel {
	pub served_identity: String,
	pub alias: String,
	pub snapshot_path: String,
}

#[derive(Debug, Clone)]
pub struct RouterPlan {
	pub engine_plan: EnginePlan,
	pub port: u16,
	pub models: Vec<RoutedModel>,
}

/// The flat `<scheme>-<path>-<tag>.gguf` mount alias for `reference`
/// (spec.md §4.J), before hash-prefix disambiguation.
fn base_alias(reference: &ModelReference) -> String {
	let flat_path = reference.path.replace('/', "-");
	format!("{}-{flat_path}-{}.gguf", reference.scheme.as_str(), reference.tag)
}

struct Candidate {
	reference: ModelReference,
	snapshot_path: String,
	base_alias: String,
	hash8: String,
}

/// Enumerate every complete, GGUF-bearing model in the store, assigning
/// each a mount alias in `<scheme>-<path>-<tag>.gguf` form. Two refs whose
/// base alias collides are disambiguated by appending the first 8 hex of
/// their GGUF blob's hash (spec.md §4.J).
fn enumerate_store_gguf_models(store: &ModelStore) -> Result<Vec<RoutedModel>, RouterError> {
	let mut candidates = Vec::new();

	for (reference, ref_file) in store.walk_refs()? {
		let Some(gguf) = ref_file
			.model_files
			.iter()
			.find(|f| f.role == FileRole::Model && f.name.ends_with(".gguf"))
		else {
			continue;
		};
		if !ref_file.is_complete(&store.blobs_dir(&reference)) {
			continue;
		}

		candidates.push(Candidate {
			snapshot_path: store.snapshot_dir(&reference).display().to_string(),
			base_alias: base_alias(&reference),
			hash8: gguf.hash_hex().chars().take(8).collect(),
			reference,
		});
	}

	let mut counts: HashMap<String, u32> = HashMap::new();
	for c in &candidates {
		*counts.entry(c.base_alias.clone()).or_insert(0) += 1;
	}

	let routed = candidates
		.into_iter()
		.map(|c| {
			let alias = if counts[&c.base_alias] > 1 {
				let stem = c.base_alias.strip_suffix(".gguf").unwrap_or(&c.base_alias);
				format!("{stem}-{}.gguf", c.hash8)
			} else {
				c.base_alias
			};
			RoutedModel {
				served_identity: c.reference.served_identity(),
				alias,
				snapshot_path: c.snapshot_path,
			}
		})
		.collect();

	Ok(routed)
}

/// Assemble a single llama.cpp container invocation that bind-mounts every
/// GGUF-bearing model in the store, each under its own disambiguated alias.
pub async fn plan_router(
	store: &ModelStore,
	config: &Config,
	port: Option<u16>,
) -> Result<RouterPlan, RouterError> {
	let models = enumerate_store_gguf_models(store)?;
	if models.is_empty() {
		return Err(RouterError::Empty);
	}

	let engine_binary = config
		.container_engine
		.clone()
		.unwrap_or_else(|| "podman".to_string());
	let image = accel::accel_image(&config.default_image, accel::detect());
	let resolved_port = engine::compute_serving_port(port, &HashSet::new())?;

	let mut builder = EnginePlanBuilder::new(&engine_binary, "run")
		.detach()
		.name(&crate::naming::genname())
		.security_defaults(config.suppress_cap_drop, config.privileged)
		.devices_auto(config.devices_none)
		.publish(resolved_port, 8080);

	for model in &models {
		builder = builder.mount(&format!(
			"type=bind,src={},destination=/mnt/models/{},ro",
			model.snapshot_path, model.alias
		));
	}

	let builder = builder.image(&image);

	let trailing = vec![
		"llama-server".to_string(),
		"--host".to_string(),
		config.host.clone(),
		"--port".to_string(),
		"8080".to_string(),
		"--router".to_string(),
		"--models-dir".to_string(),
		"/mnt/models".to_string(),
	];

	Ok(RouterPlan {
		engine_plan: builder.trailing_args(trailing).build(),
		port: resolved_port,
		models,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn base_alias_flattens_path_and_uses_gguf_suffix() {
		let r = ModelReference {
			scheme: crate::store::Scheme::Ollama,
			path: "library/tinyllama".to_string(),
			tag: "latest".to_string(),
		};
		assert_eq!(base_alias(&r), "ollama-library-tinyllama-latest.gguf");
	}

	#[test]
	fn disambiguates_colliding_aliases_with_hash_prefix() {
		let mut counts: HashMap<String, u32> = HashMap::new();
		counts.insert("ollama-library-tinyllama-latest.gguf".to_string(), 2);

		let stem = "ollama-library-tinyllama-latest.gguf".strip_suffix(".gguf").unwrap();
		let first = format!("{stem}-{}.gguf", "aaaaaaaa");
		let second = format!("{stem}-{}.gguf", "bbbbbbbb");
		assert_ne!(first, second);
		assert!(first.ends_with("-aaaaaaaa.gguf"));
	}
}
