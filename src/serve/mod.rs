//! Serve-assembly engine (spec.md §4.I) — composes a container-engine
//! invocation for one of three inference runtimes from a resolved model and
//! a [`ServeOptions`] record, grounded in `original_source/ramalama/cli/
//! commands/serve.py`'s `runtime_options` dispatch.

mod llama_cpp;
mod mlx;
mod vllm;

use std::collections::HashSet;

use thiserror::Error;

use crate::config::Config;
use crate::engine::{self, accel, EnginePlan, EngineError};
use crate::error::Kind;
use crate::naming;
use crate::store::{FileRole, ModelReference, ModelStore, StoreError};
use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum PlanError {
	#[error(transparent)]
	Store(#[from] StoreError),
	#[error(transparent)]
	Engine(#[from] EngineError),
	#[error(transparent)]
	Transport(#[from] TransportError),
	#[error("no model file found to serve in {0}")]
	NothingToServe(String),
}

impl PlanError {
	pub fn kind(&self) -> Kind {
		match self {
			PlanError::Store(e) => e.kind(),
			PlanError::Engine(e) => e.kind(),
			PlanError::Transport(e) => e.kind(),
			PlanError::NothingToServe(_) => Kind::NotFound,
		}
	}

	pub fn exit_code(&self) -> i32 {
		match self {
			PlanError::Engine(e) => e.exit_code(),
			other => other.kind().exit_code(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runtime {
	LlamaCpp,
	Vllm,
	Mlx,
}

/// Typed options for one serve invocation (SPEC_FULL.md §9: no duck-typed
/// `args` namespace).
#[derive(Debug, Clone)]
pub struct ServeOptions {
	pub port: Option<u16>,
	pub detach: bool,
	pub name: Option<String>,
	pub host: String,
	pub ctx_size: i64,
	pub threads: i64,
	pub max_tokens: i64,
	pub cache_reuse: i64,
	pub rpc_nodes: Option<String>,
	/// `--n-gpu-layers`; negative suppresses the flag.
	pub n_gpu_layers: i64,
	/// `--temp`; non-positive suppresses the flag.
	pub temp: f64,
	/// `--embedding --pooling last`, for embedding-only serving.
	pub embedding: bool,
	/// Serve the web UI; `false` emits `--no-webui`.
	pub webui: bool,
	pub suppress_cap_drop: bool,
	pub privileged: bool,
	pub devices_none: bool,
}

impl ServeOptions {
	pub fn from_config(config: &Config) -> Self {
		Self {
			port: config.port,
			detach: false,
			name: None,
			host: config.host.clone(),
			ctx_size: config.ctx_size,
			threads: config.threads,
			max_tokens: config.max_tokens,
			cache_reuse: config.cache_reuse,
			rpc_nodes: config.llamacpp_rpc_nodes.clone(),
			n_gpu_layers: config.n_gpu_layers,
			temp: config.temp,
			embedding: false,
			webui: config.webui,
			suppress_cap_drop: config.suppress_cap_drop,
			privileged: config.privileged,
			devices_none: config.devices_none,
		}
	}
}

/// The model/mmproj/chat-template file names resolved from a ref file, as
/// they'll appear under the engine's `/mnt/models` mount.
#[derive(Debug, Clone, Default)]
pub(crate) struct ModelFiles {
	pub model_name: String,
	pub mmproj_name: Option<String>,
	pub has_chat_template: bool,
}

/// Shared inputs every runtime planner needs; assembled once in
/// [`plan_serve`] and handed to the per-runtime `plan` function.
pub(crate) struct ServeContext {
	pub engine_binary: String,
	pub image: String,
	pub mount_spec: String,
	pub served_identity: String,
	pub port: u16,
	pub detach: bool,
	pub name: Option<String>,
	pub options: ServeOptions,
	pub files: ModelFiles,
}

#[derive(Debug, Clone)]
pub struct ServePlan {
	pub runtime: Runtime,
	pub engine_plan: EnginePlan,
	pub port: u16,
	pub served_identity: String,
	pub image: String,
	/// The in-container command only, as run inside the engine's mount —
	/// distinct from `engine_plan.args`, which is the full `podman run`
	/// invocation. This is what generator output's `command:`/`Exec=` line
	/// should render.
	pub command: Vec<String>,
}

/// Pick a runtime for a model by inspecting its snapshot's file roles: a
/// GGUF payload always wins (llama.cpp); otherwise Metal hosts run MLX
/// natively, everything else runs vLLM. Also resolves the model/mmproj/
/// chat-template file names the chosen planner needs to reference inside
/// the container mount.
fn detect_runtime(store: &ModelStore, reference: &ModelReference) -> Result<(Runtime, ModelFiles), PlanError> {
	let (_lock, _dir, ref_file) = store.open_for_serve(reference)?;

	let mmproj_name = ref_file
		.model_files
		.iter()
		.find(|f| f.role == FileRole::Mmproj)
		.map(|f| f.name.clone());
	let has_chat_template = ref_file.model_files.iter().any(|f| f.role == FileRole::ChatTemplate);

	let gguf = ref_file
		.model_files
		.iter()
		.find(|f| f.role == FileRole::Model && f.name.ends_with(".gguf"));
	if let Some(gguf) = gguf {
		return Ok((
			Runtime::LlamaCpp,
			ModelFiles {
				model_name: gguf.name.clone(),
				mmproj_name,
				has_chat_template,
			},
		));
	}

	let Some(model_file) = ref_file.model_files.iter().find(|f| f.role == FileRole::Model) else {
		return Err(PlanError::NothingToServe(reference.canonical()));
	};

	let runtime = if accel::detect() == accel::Accel::Metal {
		Runtime::Mlx
	} else {
		Runtime::Vllm
	};
	Ok((
		runtime,
		ModelFiles {
			model_name: model_file.name.clone(),
			mmproj_name,
			has_chat_template,
		},
	))
}

/// Assemble a full [`ServePlan`] for `reference`: resolve runtime, image,
/// mount point and port, then hand off to the matching planner.
pub async fn plan_serve(
	store: &ModelStore,
	config: &Config,
	reference: &ModelReference,
	mount_spec: String,
	opts: ServeOptions,
	exclude_ports: &HashSet<u16>,
) -> Result<ServePlan, PlanError> {
	let (runtime, files) = detect_runtime(store, reference)?;
	let engine_binary = config
		.container_engine
		.clone()
		.unwrap_or_else(|| "podman".to_string());
	let image = accel::accel_image(&config.default_image, accel::detect());
	let port = engine::compute_serving_port(opts.port, exclude_ports)?;
	let name = opts.name.clone().or_else(|| Some(naming::genname()));

	let ctx = ServeContext {
		engine_binary,
		image,
		mount_spec,
		served_identity: reference.served_identity(),
		port,
		detach: opts.detach,
		name,
		options: opts,
		files,
	};

	let (builder, command) = match runtime {
		Runtime::LlamaCpp => llama_cpp::plan(&ctx),
		Runtime::Vllm => vllm::plan(&ctx),
		Runtime::Mlx => mlx::plan(&ctx),
	};

	Ok(ServePlan {
		runtime,
		image: ctx.image.clone(),
		engine_plan: builder.build(),
		port,
		served_identity: ctx.served_identity,
		command,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn default_opts() -> ServeOptions {
		ServeOptions {
			port: Some(8080),
			detach: true,
			name: Some("test-model".to_string()),
			host: "0.0.0.0".to_string(),
			ctx_size: 4096,
			threads: 4,
			max_tokens: 0,
			cache_reuse: 0,
			rpc_nodes: None,
			n_gpu_layers: -1,
			temp: 0.0,
			embedding: false,
			webui: true,
			suppress_cap_drop: false,
			privileged: false,
			devices_none: false,
		}
	}

	#[test]
	fn llama_cpp_plan_includes_context_threads_and_alias() {
		let ctx = ServeContext {
			engine_binary: "podman".to_string(),
			image: "quay.io/modelrun/runtime:0.1-cpu".to_string(),
			mount_spec: "type=bind,src=/a,destination=/mnt/models,ro".to_string(),
			served_identity: "ollama/library/tinyllama:latest".to_string(),
			port: 8080,
			detach: true,
			name: Some("test-model".to_string()),
			options: default_opts(),
			files: ModelFiles {
				model_name: "model.gguf".to_string(),
				mmproj_name: None,
				has_chat_template: false,
			},
		};
		let (builder, command) = llama_cpp::plan(&ctx);
		assert!(command.contains(&"--ctx-size".to_string()));
		assert!(command.contains(&"--alias".to_string()));
		let plan = builder.build();
		assert!(plan.args.contains(&"--ctx-size".to_string()));
		assert!(plan.args.contains(&"4096".to_string()));
		assert!(plan.args.contains(&"--model".to_string()));
		assert!(plan.args.contains(&"/mnt/models/model.gguf".to_string()));
	}
}
