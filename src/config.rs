//! Process-scope configuration (SPEC_FULL.md §2).
//!
//! Layered the way the teacher layers its own config: local `./config.json`
//! below `/etc/<crate>/config.json` below the user config directory, with an
//! explicit `--config` path overriding all of them. Environment variables
//! from spec.md §6 are applied last, over whatever the files produced.

use std::path::PathBuf;

use config::File;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::cli::Cli;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Root of the content-addressed model store.
	pub store_path: PathBuf,
	/// `podman` or `docker`; None means auto-detect at use time.
	pub container_engine: Option<String>,
	/// Run inside a container by default (`RAMALAMA_IN_CONTAINER`).
	pub in_container: bool,
	/// Default OCI image used to run inference runtimes.
	pub default_image: String,
	/// llama.cpp RPC topology, space-separated host:port list.
	pub llamacpp_rpc_nodes: Option<String>,
	/// HuggingFace bearer token.
	pub hf_token: Option<String>,
	pub ctx_size: i64,
	pub threads: i64,
	pub host: String,
	pub port: Option<u16>,
	pub max_tokens: i64,
	pub cache_reuse: i64,
	pub keep_groups: bool,
	/// llama.cpp `--n-gpu-layers`; negative means "don't pass the flag".
	pub n_gpu_layers: i64,
	/// llama.cpp `--temp`; non-positive means "don't pass the flag".
	pub temp: f64,
	/// Serve the web UI by default; `false` emits `--no-webui`.
	pub webui: bool,
	/// Suppress `--cap-drop=all` on every engine invocation.
	pub suppress_cap_drop: bool,
	/// Add `--privileged` to every engine invocation (opt-in, spec.md §4.H).
	pub privileged: bool,
	/// Suppress accelerator device auto-mounting (`--device none`).
	pub devices_none: bool,
}

impl Default for Config {
	fn default() -> Self {
		let store_path = dirs::data_local_dir()
			.or_else(dirs::data_dir)
			.map(|d| d.join("modelrun").join("store"))
			.unwrap_or_else(|| PathBuf::from("./data/store"));

		Self {
			store_path,
			container_engine: None,
			in_container: false,
			default_image: "quay.io/modelrun/runtime".to_string(),
			llamacpp_rpc_nodes: None,
			hf_token: None,
			ctx_size: 0,
			threads: -1,
			host: "0.0.0.0".to_string(),
			port: None,
			max_tokens: 0,
			cache_reuse: 256,
			keep_groups: false,
			n_gpu_layers: -1,
			temp: 0.0,
			webui: true,
			suppress_cap_drop: false,
			privileged: false,
			devices_none: false,
		}
	}
}

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("configuration file path is not valid UTF-8")]
	InvalidPath,
	#[error("could not determine a user configuration directory")]
	NoConfigDir,
	#[error(transparent)]
	Source(#[from] config::ConfigError),
}

impl Config {
	/// Load layered configuration, then apply environment and CLI overrides.
	pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
		let explicit = cli
			.config
			.clone()
			.or_else(|| std::env::var("RAMALAMA_CONFIG").ok().map(PathBuf::from));

		let mut config = if let Some(path) = explicit {
			debug!(path = %path.display(), "loading configuration from explicit path");
			let path_str = path.to_str().ok_or(ConfigError::InvalidPath)?;
			let builder =
				config::Config::builder().add_source(File::with_name(path_str).required(true));
			builder.build()?.try_deserialize()?
		} else {
			Self::load_layered()?
		};

		config.apply_env_overrides();
		config.apply_cli_overrides(cli);
		Ok(config)
	}

	fn load_layered() -> Result<Self, ConfigError> {
		let local_path = PathBuf::from("./config.json");
		let system_path = PathBuf::from("/etc/modelrun/config.json");
		let user_path = dirs::config_local_dir()
			.or_else(dirs::config_dir)
			.map(|d| d.join("modelrun").join("config.json"));
		if user_path.is_none() {
			warn!("could not determine user config directory");
		}

		let mut builder = config::Config::builder()
			.add_source(File::with_name(system_path.to_str().ok_or(ConfigError::InvalidPath)?).required(false));
		if let Some(user_path) = &user_path {
			builder = builder.add_source(
				File::with_name(user_path.to_str().ok_or(ConfigError::InvalidPath)?).required(false),
			);
		}
		builder = builder
			.add_source(File::with_name(local_path.to_str().ok_or(ConfigError::InvalidPath)?).required(false));

		Ok(builder.build()?.try_deserialize()?)
	}

	fn apply_env_overrides(&mut self) {
		if let Ok(engine) = std::env::var("RAMALAMA_CONTAINER_ENGINE") {
			self.container_engine = Some(engine);
		}
		if std::env::var("RAMALAMA_IN_CONTAINER").is_ok() {
			self.in_container = true;
		}
		if let Ok(image) = std::env::var("RAMALAMA_IMAGE") {
			self.default_image = image;
		}
		if let Ok(nodes) = std::env::var("RAMALAMA_LLAMACPP_RPC_NODES") {
			self.llamacpp_rpc_nodes = Some(nodes);
		}
		if let Ok(token) = std::env::var("HF_TOKEN") {
			self.hf_token = Some(token);
		}
	}

	fn apply_cli_overrides(&mut self, cli: &Cli) {
		if let Some(store) = &cli.store {
			self.store_path = store.clone();
		}
		if let Some(engine) = &cli.engine {
			self.container_engine = Some(engine.clone());
		}
	}
}
