//! MLX runtime planner (spec.md §4.I) — Apple Silicon native inference,
//! never containerized: `mlx_lm.server` runs directly on the host, since
//! MLX depends on Metal which is unavailable inside a Linux container.

use crate::engine::EnginePlanBuilder;

use super::ServeContext;

pub fn plan(ctx: &ServeContext) -> (EnginePlanBuilder, Vec<String>) {
	let trailing = vec![
		"--model".to_string(),
		"/mnt/models".to_string(),
		"--host".to_string(),
		ctx.options.host.clone(),
		"--port".to_string(),
		ctx.port.to_string(),
	];
	let mut command = vec!["mlx_lm.server".to_string()];
	command.extend(trailing.iter().cloned());

	// Native invocation, no container flags apply: `--label`/`--name` are
	// podman/docker run options and would corrupt a bare mlx_lm.server argv.
	let builder = EnginePlanBuilder::bare("mlx_lm.server").trailing_args(trailing);

	(builder, command)
}
