//! Router enumeration only mounts GGUF-bearing models, with disambiguated
//! aliases (spec.md §8 scenario 4).

mod common;

use modelrun::config::Config;
use modelrun::store::{ModelStore, Scheme};

#[tokio::test]
async fn router_mounts_only_gguf_models_with_unique_aliases() {
	let dir = tempfile::tempdir().unwrap();
	let store = ModelStore::new(dir.path());

	let gguf_a = common::write_committed_model(
		&store,
		Scheme::Ollama,
		"library/tinyllama",
		"latest",
		"model.gguf",
		b"gguf-weights-a",
	);
	let gguf_b = common::write_committed_model(
		&store,
		Scheme::Hf,
		"org/other-model",
		"v1",
		"model.gguf",
		b"gguf-weights-b",
	);
	common::write_committed_model(
		&store,
		Scheme::Hf,
		"org/safetensors-model",
		"v1",
		"model.safetensors",
		b"not-gguf",
	);

	let mut config = Config::default();
	config.store_path = dir.path().to_path_buf();

	let plan = modelrun::router::plan_router(&store, &config, Some(18080))
		.await
		.unwrap();

	assert_eq!(plan.models.len(), 2);
	let identities: Vec<_> = plan.models.iter().map(|m| m.served_identity.clone()).collect();
	assert!(identities.contains(&gguf_a.served_identity()));
	assert!(identities.contains(&gguf_b.served_identity()));

	let aliases: std::collections::HashSet<_> = plan.models.iter().map(|m| m.alias.clone()).collect();
	assert_eq!(aliases.len(), plan.models.len(), "aliases must be unique");
	assert!(plan.models.iter().all(|m| m.alias.ends_with(".gguf")));
	assert!(plan.models.iter().any(|m| m.alias == "ollama-library-tinyllama-latest.gguf"));
	assert!(plan.models.iter().any(|m| m.alias == "hf-org-other-model-v1.gguf"));

	assert!(plan.engine_plan.args.iter().any(|a| a.contains("--router")));
}
