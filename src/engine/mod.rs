//! Container-engine invocation assembly (spec.md §4.H).
//!
//! An `EnginePlan` is an immutable argv record, built up through
//! `EnginePlanBuilder` the way the teacher's `deploy_manager.rs` assembles a
//! subprocess invocation: typed setters, then one `build()`, never a
//! duck-typed options map. The binary name is opaque — never interpolated
//! into a shell string, always exec'd (or dry-run printed, shell-quoted)
//! as an argv vector.

pub mod accel;

use std::collections::HashSet;
use std::net::TcpListener;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::{info, warn};

use crate::error::Kind;

const DEFAULT_PORT: u16 = 8080;
const MAX_PORT_SCAN: u16 = 200;

#[derive(Debug, Error)]
pub enum EngineError {
	#[error("container engine binary not found: {0}")]
	EngineMissing(String),
	#[error("container engine command failed: {message}")]
	EngineFailure { message: String, code: Option<i32> },
	#[error("{0}")]
	Io(#[from] std::io::Error),
	#[error("no free port found starting from {0}")]
	NoFreePort(u16),
}

impl EngineError {
	pub fn kind(&self) -> Kind {
		match self {
			EngineError::EngineMissing(_) => Kind::EngineMissing,
			EngineError::EngineFailure { .. } => Kind::EngineFailure,
			EngineError::Io(_) => Kind::Io,
			EngineError::NoFreePort(_) => Kind::NotSupported,
		}
	}

	/// Exit code for this error: a failed engine invocation passes through
	/// the subprocess's own return code (spec.md §6 "other engine
	/// returncodes passed through"); everything else falls back to its
	/// `Kind`'s fixed code.
	pub fn exit_code(&self) -> i32 {
		match self {
			EngineError::EngineFailure { code: Some(code), .. } => *code,
			other => other.kind().exit_code(),
		}
	}

}

/// An immutable, fully assembled container-engine invocation.
#[derive(Debug, Clone)]
pub struct EnginePlan {
	pub binary: String,
	pub args: Vec<String>,
}

impl EnginePlan {
	/// Shell-quoted form for `--dry-run` printing; never used to actually
	/// execute anything.
	pub fn to_shell_string(&self) -> String {
		let mut parts = vec![shell_quote(&self.binary)];
		parts.extend(self.args.iter().map(|a| shell_quote(a)));
		parts.join(" ")
	}

	pub async fn run(&self) -> Result<(), EngineError> {
		let status = Command::new(&self.binary)
			.args(&self.args)
			.status()
			.await
			.map_err(|e| {
				if e.kind() == std::io::ErrorKind::NotFound {
					EngineError::EngineMissing(self.binary.clone())
				} else {
					EngineError::Io(e)
				}
			})?;
		if !status.success() {
			return Err(EngineError::EngineFailure {
				message: format!("{} exited with {:?}", self.binary, status.code()),
				code: status.code(),
			});
		}
		Ok(())
	}
}

fn shell_quote(arg: &str) -> String {
	if arg.chars().all(|c| c.is_ascii_alphanumeric() || "-_./:=,@".contains(c)) {
		arg.to_string()
	} else {
		format!("'{}'", arg.replace('\'', "'\\''"))
	}
}

pub struct EnginePlanBuilder {
	binary: String,
	args: Vec<String>,
}

impl EnginePlanBuilder {
	pub fn new(binary: impl Into<String>, subcommand: &str) -> Self {
		Self {
			binary: binary.into(),
			args: vec![subcommand.to_string()],
		}
	}

	/// Like [`Self::new`] but for binaries invoked directly with flags, no
	/// leading subcommand (e.g. `mlx_lm.server --model ...`).
	pub fn bare(binary: impl Into<String>) -> Self {
		Self {
			binary: binary.into(),
			args: Vec::new(),
		}
	}

	pub fn detach(mut self) -> Self {
		self.args.push("-d".to_string());
		self
	}

	pub fn name(mut self, name: &str) -> Self {
		self.args.push("--name".to_string());
		self.args.push(name.to_string());
		self
	}

	pub fn mount(mut self, spec: &str) -> Self {
		self.args.push(format!("--mount={spec}"));
		self
	}

	pub fn env(mut self, key: &str, value: &str) -> Self {
		self.args.push("-e".to_string());
		self.args.push(format!("{key}={value}"));
		self
	}

	pub fn device(mut self, path: &str) -> Self {
		self.args.push("--device".to_string());
		self.args.push(path.to_string());
		self
	}

	pub fn label(mut self, key: &str, value: &str) -> Self {
		self.args.push("--label".to_string());
		self.args.push(format!("{key}={value}"));
		self
	}

	pub fn security_opt(mut self, opt: &str) -> Self {
		self.args.push("--security-opt".to_string());
		self.args.push(opt.to_string());
		self
	}

	fn flag(mut self, flag: &str) -> Self {
		self.args.push(flag.to_string());
		self
	}

	/// Apply the security policy spec.md §4.H requires on every container
	/// invocation: `--selinux` always, `--cap-drop=all` unless suppressed,
	/// `--privileged` only when opted in.
	pub fn security_defaults(mut self, suppress_cap_drop: bool, privileged: bool) -> Self {
		self = self.flag("--selinux");
		if !suppress_cap_drop {
			self = self.flag("--cap-drop=all");
		}
		if privileged {
			self = self.flag("--privileged");
		}
		self
	}

	/// Apply the accelerator device policy from spec.md §4.H:
	/// `/dev/dri`/`/dev/kfd`/`/dev/accel` are auto-added if present on the
	/// host; `suppress` (`--device none`) drops all of them.
	pub fn devices_auto(mut self, suppress: bool) -> Self {
		if suppress {
			return self.device("none");
		}
		for path in detect_devices() {
			self = self.device(path);
		}
		self
	}

	pub fn publish(mut self, host_port: u16, container_port: u16) -> Self {
		self.args.push("-p".to_string());
		self.args.push(format!("{host_port}:{container_port}"));
		self
	}

	pub fn image(mut self, image: &str) -> Self {
		self.args.push(image.to_string());
		self
	}

	pub fn trailing_args(mut self, extra: impl IntoIterator<Item = String>) -> Self {
		self.args.extend(extra);
		self
	}

	pub fn build(self) -> EnginePlan {
		EnginePlan {
			binary: self.binary,
			args: self.args,
		}
	}
}

const CANDIDATE_DEVICES: &[&str] = &["/dev/dri", "/dev/kfd", "/dev/accel"];

/// Accelerator device nodes present on this host (spec.md §4.H: "auto-added
/// if present").
fn detect_devices() -> Vec<&'static str> {
	CANDIDATE_DEVICES
		.iter()
		.copied()
		.filter(|path| std::path::Path::new(path).is_file() || std::path::Path::new(path).is_dir())
		.collect()
}

/// Owned form of [`detect_devices`] for callers outside this module (e.g.
/// the unit generators), with the same `--device none` suppression as
/// [`EnginePlanBuilder::devices_auto`].
pub fn detect_devices_owned(suppress: bool) -> Vec<String> {
	if suppress {
		return Vec::new();
	}
	detect_devices().into_iter().map(str::to_string).collect()
}

/// Pick a free port starting from `preferred` (or [`DEFAULT_PORT`]),
/// skipping anything in `exclude` and anything the OS reports as already
/// bound. The exclusion set is always an explicit parameter (SPEC_FULL.md
/// §9): a caller serving several models in the same process must track
/// which ports it already handed out itself.
pub fn compute_serving_port(preferred: Option<u16>, exclude: &HashSet<u16>) -> Result<u16, EngineError> {
	let start = preferred.unwrap_or(DEFAULT_PORT);
	for offset in 0..MAX_PORT_SCAN {
		let candidate = start.saturating_add(offset);
		if candidate == 0 || exclude.contains(&candidate) {
			continue;
		}
		if TcpListener::bind(("127.0.0.1", candidate)).is_ok() {
			return Ok(candidate);
		}
	}
	Err(EngineError::NoFreePort(start))
}

/// Ensure a podman machine is running before any `podman` invocation on a
/// platform that needs one (macOS/Windows). A no-op for docker or on Linux.
pub async fn ensure_machine_ready(binary: &str) -> Result<(), EngineError> {
	if binary != "podman" || !cfg!(any(target_os = "macos", target_os = "windows")) {
		return Ok(());
	}

	let inspect = Command::new(binary)
		.args(["machine", "inspect"])
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.status()
		.await?;
	if inspect.success() {
		return Ok(());
	}

	info!("no podman machine detected, starting one");
	let init = Command::new(binary).args(["machine", "init"]).status().await?;
	if !init.success() {
		warn!("podman machine init failed, assuming one already exists");
	}
	let start = Command::new(binary).args(["machine", "start"]).status().await?;
	if !start.success() {
		return Err(EngineError::EngineFailure {
			message: "podman machine start failed".to_string(),
			code: start.code(),
		});
	}
	Ok(())
}

/// Seed a named volume from an image's contents by running a throwaway
/// container that copies `src_path` in the image onto the volume mount.
pub async fn populate_volume_from_image(
	binary: &str,
	image: &str,
	src_path: &str,
	volume_name: &str,
) -> Result<(), EngineError> {
	let plan = EnginePlanBuilder::new(binary, "run")
		.trailing_args(["--rm".to_string()])
		.mount(&format!("type=volume,src={volume_name},destination=/dst"))
		.image(image)
		.trailing_args(["cp".to_string(), "-a".to_string(), format!("{src_path}/."), "/dst".to_string()])
		.build();
	plan.run().await
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn shell_quote_leaves_plain_args_alone() {
		assert_eq!(shell_quote("--name"), "--name");
		assert_eq!(shell_quote("quay.io/modelrun/runtime:0.1-cpu"), "quay.io/modelrun/runtime:0.1-cpu");
	}

	#[test]
	fn shell_quote_wraps_args_with_special_chars() {
		assert_eq!(shell_quote("a b"), "'a b'");
	}

	#[test]
	fn builder_assembles_expected_argv() {
		let plan = EnginePlanBuilder::new("podman", "run")
			.detach()
			.name("modelrun-abc")
			.mount("type=bind,src=/a,destination=/mnt/models,ro")
			.publish(8080, 8080)
			.image("quay.io/modelrun/runtime:0.1-cpu")
			.build();
		assert_eq!(plan.binary, "podman");
		assert!(plan.args.contains(&"--name".to_string()));
		assert!(plan.to_shell_string().starts_with("podman run -d"));
	}

	#[test]
	fn compute_serving_port_respects_exclusion_set() {
		let mut exclude = HashSet::new();
		exclude.insert(8080);
		exclude.insert(8081);
		let port = compute_serving_port(Some(8080), &exclude).unwrap();
		assert!(port >= 8082);
	}
}
