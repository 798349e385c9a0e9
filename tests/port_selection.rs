//! Port selection with an explicit exclusion set (spec.md §8 scenario 3).

use std::collections::HashSet;

use modelrun::engine::compute_serving_port;

#[test]
fn excluded_ports_are_skipped_and_bound_ports_advance() {
	let mut exclude = HashSet::new();
	exclude.insert(8080);
	exclude.insert(8081);

	let first = compute_serving_port(Some(8080), &exclude).unwrap();
	assert_eq!(first, 8082);

	// Simulate the port actually getting bound by something else: hold it
	// open and ask again with the same exclusion set, which should not by
	// itself know about the bind — compute_serving_port re-probes the OS.
	let listener = std::net::TcpListener::bind(("127.0.0.1", first)).unwrap();
	let second = compute_serving_port(Some(8080), &exclude).unwrap();
	assert_eq!(second, 8083);
	drop(listener);
}
