//! A byte-swapped GGUF payload is quarantined and no ref is committed
//! (spec.md §8 scenario 2).

use std::io::{Read, Write};
use std::net::TcpListener;

use modelrun::pull::PullEngine;
use modelrun::store::{ModelReference, ModelStore, Scheme};
use modelrun::transport::{ManifestEntry, PullOptions};

/// Serve exactly one GET request with a fixed byte body, then exit. Good
/// enough for a single manifest-entry download in a test.
fn serve_once(body: Vec<u8>) -> u16 {
	let listener = TcpListener::bind("127.0.0.1:0").unwrap();
	let port = listener.local_addr().unwrap().port();
	std::thread::spawn(move || {
		if let Ok((mut stream, _)) = listener.accept() {
			let mut buf = [0u8; 1024];
			let _ = stream.read(&mut buf);
			let response = format!(
				"HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
				body.len()
			);
			let _ = stream.write_all(response.as_bytes());
			let _ = stream.write_all(&body);
		}
	});
	port
}

#[tokio::test]
async fn swapped_gguf_is_quarantined_and_ref_not_committed() {
	let mut swapped = b"GGUF".to_vec();
	swapped.reverse(); // "FUGG" — the byte-swapped magic
	swapped.extend_from_slice(&[0, 0, 0, 3, 0, 0, 0, 0]);

	let port = serve_once(swapped);

	let dir = tempfile::tempdir().unwrap();
	let store = ModelStore::new(dir.path());
	let reference = ModelReference {
		scheme: Scheme::Ollama,
		path: "library/swapped".to_string(),
		tag: "latest".to_string(),
	};

	let manifest = vec![ManifestEntry {
		name: "model.gguf".to_string(),
		url: format!("http://127.0.0.1:{port}/model.gguf"),
		expected_sha256: String::new(),
		size: 0,
		role: modelrun::store::FileRole::Model,
	}];

	let engine = PullEngine::default();
	let result = engine
		.pull_manifest(&store, &reference, &manifest, &PullOptions::default())
		.await;

	assert!(result.is_err());
	assert!(!store.exists(&reference));

	let blobs_dir = store.blobs_dir(&reference);
	let quarantined = std::fs::read_dir(&blobs_dir)
		.unwrap()
		.filter_map(|e| e.ok())
		.any(|e| e.file_name().to_string_lossy().ends_with(".wrongendian"));
	assert!(quarantined);
}
