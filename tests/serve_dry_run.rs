//! Assembling a llama.cpp serve plan for a locally stored GGUF model
//! (spec.md §8 scenario 5) — argv is assembled but never executed.

mod common;

use std::collections::HashSet;

use modelrun::config::Config;
use modelrun::serve::{plan_serve, Runtime, ServeOptions};
use modelrun::store::{ModelStore, Scheme};
use modelrun::transport::Transport;

#[tokio::test]
async fn llama_cpp_plan_mounts_snapshot_and_publishes_port() {
	let dir = tempfile::tempdir().unwrap();
	let store = ModelStore::new(dir.path());
	let reference = common::write_committed_model(
		&store,
		Scheme::Ollama,
		"library/tinyllama",
		"latest",
		"model.gguf",
		b"weights",
	);

	let mut config = Config::default();
	config.store_path = dir.path().to_path_buf();
	config.host = "127.0.0.1".to_string();

	let transport = Transport::from_reference(reference.clone());
	let mount_spec = transport.mount_cmd(&store).await.unwrap();

	let mut opts = ServeOptions::from_config(&config);
	opts.port = Some(28080);
	opts.detach = true;
	opts.name = Some("test-tinyllama".to_string());
	opts.ctx_size = 4096;

	let plan = plan_serve(&store, &config, &reference, mount_spec, opts, &HashSet::new())
		.await
		.unwrap();

	assert_eq!(plan.runtime, Runtime::LlamaCpp);
	assert_eq!(plan.port, 28080);
	assert!(plan.engine_plan.args.iter().any(|a| a.contains("type=bind")));
	assert!(plan.engine_plan.to_shell_string().contains("llama-server"));

	assert!(plan.command.contains(&"--port".to_string()));
	assert!(plan.command.contains(&"28080".to_string()));
	assert!(plan.command.contains(&"--ctx-size".to_string()));
	assert!(plan.command.contains(&"4096".to_string()));
	assert!(plan.command.contains(&"--model".to_string()));
	assert!(plan.command.contains(&"/mnt/models/model.gguf".to_string()));
	assert!(plan.command.contains(&"--alias".to_string()));
	assert!(plan.command.iter().any(|a| a == &reference.served_identity()));
	assert!(!plan.command.contains(&"-m".to_string()));
	assert!(!plan.command.contains(&"-c".to_string()));
}
