//! Accelerator image tag resolution (SPEC_FULL.md §3), grounded in
//! `original_source/ramalama/transports/oci.py`'s `accel_image` /
//! `tagged_image` helpers. Detection result is memoized once per process
//! since it never changes for the lifetime of a run.

use std::sync::OnceLock;

/// Coarse accelerator classes a serve plan picks an image variant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accel {
	Cuda,
	Rocm,
	Metal,
	Cpu,
}

impl Accel {
	fn image_suffix(self) -> &'static str {
		match self {
			Accel::Cuda => "cuda",
			Accel::Rocm => "rocm",
			Accel::Metal => "metal",
			Accel::Cpu => "cpu",
		}
	}
}

static DETECTED: OnceLock<Accel> = OnceLock::new();

/// Detect the local accelerator once per process. Real detection shells out
/// to `nvidia-smi`/`rocminfo`/`sysctl`; absent those, falls back to CPU.
pub fn detect() -> Accel {
	*DETECTED.get_or_init(|| {
		if std::path::Path::new("/dev/nvidia0").exists() {
			Accel::Cuda
		} else if std::path::Path::new("/dev/kfd").exists() {
			Accel::Rocm
		} else if cfg!(target_os = "macos") {
			Accel::Metal
		} else {
			Accel::Cpu
		}
	})
}

/// Resolve `base_image` (e.g. `quay.io/modelrun/runtime`) to a fully tagged
/// image for the detected accelerator and the crate's minor release, e.g.
/// `quay.io/modelrun/runtime:0.1-cuda`.
pub fn accel_image(base_image: &str, accel: Accel) -> String {
	format!("{base_image}:{}-{}", minor_release(), accel.image_suffix())
}

/// `MAJOR.MINOR` of the crate's own version, used as the image tag's release
/// component so a serve plan always pulls an image built for this binary.
pub fn minor_release() -> String {
	let version = env!("CARGO_PKG_VERSION");
	version.splitn(3, '.').take(2).collect::<Vec<_>>().join(".")
}

/// Accelerator-related environment variables to forward into a generated
/// unit, mirroring `utils/gpu.py::get_accel_env_vars` — currently just
/// `GGML_VK_VISIBLE_DEVICES`, passed through only if the host process has it
/// set.
pub fn accel_env_vars() -> Vec<(String, String)> {
	const GPU_ENV_VARS: &[&str] = &["GGML_VK_VISIBLE_DEVICES"];
	GPU_ENV_VARS
		.iter()
		.filter_map(|key| std::env::var(key).ok().map(|value| (key.to_string(), value)))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accel_image_embeds_release_and_suffix() {
		let image = accel_image("quay.io/modelrun/runtime", Accel::Cpu);
		assert!(image.starts_with("quay.io/modelrun/runtime:"));
		assert!(image.ends_with("-cpu"));
	}
}
