//! vLLM runtime planner (spec.md §4.I) — used for safetensors-format
//! models on accelerators that support CUDA/ROCm batched inference.

use crate::engine::EnginePlanBuilder;

use super::ServeContext;

pub fn plan(ctx: &ServeContext) -> (EnginePlanBuilder, Vec<String>) {
	let mut builder = EnginePlanBuilder::new(&ctx.engine_binary, "run")
		.mount(&ctx.mount_spec)
		.publish(ctx.port, 8000)
		.label("modelrun.model", &ctx.served_identity)
		.security_defaults(ctx.options.suppress_cap_drop, ctx.options.privileged)
		.devices_auto(ctx.options.devices_none)
		.image(&ctx.image);

	if ctx.detach {
		builder = builder.detach();
	}
	if let Some(name) = &ctx.name {
		builder = builder.name(name);
	}

	let mut trailing = vec![
		"python3".to_string(),
		"-m".to_string(),
		"vllm.entrypoints.openai.api_server".to_string(),
		"--model".to_string(),
		"/mnt/models".to_string(),
		"--host".to_string(),
		ctx.options.host.clone(),
		"--port".to_string(),
		"8000".to_string(),
	];
	if ctx.options.max_tokens > 0 {
		trailing.push("--max-model-len".to_string());
		trailing.push(ctx.options.max_tokens.to_string());
	}

	let command = trailing.clone();
	(builder.trailing_args(trailing), command)
}
