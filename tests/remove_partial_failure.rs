//! `remove --all` tolerates one model's engine failure without touching the
//! others (spec.md §8 scenario 6).

mod common;

use modelrun::store::{ModelReference, ModelStore, Scheme};
use modelrun::transport::{RemoveOptions, Transport};

#[tokio::test]
async fn engine_failure_on_one_model_does_not_affect_others() {
	let dir = tempfile::tempdir().unwrap();
	let store = ModelStore::new(dir.path());

	let a = common::write_committed_model(&store, Scheme::Ollama, "library/a", "latest", "model.gguf", b"a");
	let b = common::write_committed_model(&store, Scheme::Ollama, "library/b", "latest", "model.gguf", b"b");

	let broken_oci = ModelReference {
		scheme: Scheme::Oci,
		path: "quay.io/example/broken".to_string(),
		tag: "latest".to_string(),
	};

	let opts = RemoveOptions {
		ignore: false,
		engine: Some("modelrun-nonexistent-engine-binary".to_string()),
	};

	let result_a = Transport::from_reference(a.clone()).remove(&store, &opts).await;
	let result_broken = Transport::from_reference(broken_oci).remove(&store, &opts).await;
	let result_b = Transport::from_reference(b.clone()).remove(&store, &opts).await;

	assert!(result_a.unwrap());
	assert!(result_broken.is_err());
	assert!(result_b.unwrap());

	assert!(!store.exists(&a));
	assert!(!store.exists(&b));
}
