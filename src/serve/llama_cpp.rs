//! llama.cpp runtime planner (spec.md §4.I).

use crate::engine::EnginePlanBuilder;

use super::ServeContext;

pub fn plan(ctx: &ServeContext) -> (EnginePlanBuilder, Vec<String>) {
	let mut builder = EnginePlanBuilder::new(&ctx.engine_binary, "run")
		.mount(&ctx.mount_spec)
		.publish(ctx.port, ctx.port)
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
		"llama-server".to_string(),
		"--host".to_string(),
		ctx.options.host.clone(),
		"--port".to_string(),
		ctx.port.to_string(),
		"--model".to_string(),
		format!("/mnt/models/{}", ctx.files.model_name),
		"--alias".to_string(),
		ctx.served_identity.clone(),
	];
	if ctx.options.ctx_size > 0 {
		trailing.push("--ctx-size".to_string());
		trailing.push(ctx.options.ctx_size.to_string());
	}
	if ctx.options.threads > 0 {
		trailing.push("--threads".to_string());
		trailing.push(ctx.options.threads.to_string());
	}
	if let Some(nodes) = &ctx.options.rpc_nodes {
		trailing.push("--rpc".to_string());
		trailing.push(nodes.clone());
	}
	if ctx.options.cache_reuse > 0 {
		trailing.push("--cache-reuse".to_string());
		trailing.push(ctx.options.cache_reuse.to_string());
	}
	if ctx.options.n_gpu_layers >= 0 {
		trailing.push("--n-gpu-layers".to_string());
		trailing.push(ctx.options.n_gpu_layers.to_string());
	}
	if ctx.options.temp > 0.0 {
		trailing.push("--temp".to_string());
		trailing.push(ctx.options.temp.to_string());
	}
	if ctx.files.has_chat_template {
		trailing.push("--jinja".to_string());
	}
	if let Some(mmproj) = &ctx.files.mmproj_name {
		trailing.push("--mmproj".to_string());
		trailing.push(format!("/mnt/models/{mmproj}"));
	}
	if ctx.options.embedding {
		trailing.push("--embedding".to_string());
		trailing.push("--pooling".to_string());
		trailing.push("last".to_string());
	}
	if !ctx.options.webui {
		trailing.push("--no-webui".to_string());
	}

	let command = trailing.clone();
	(builder.trailing_args(trailing), command)
}
