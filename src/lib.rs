//! Library entry point: parses no argv itself (that's [`cli::Cli`]), just
//! dispatches an already-parsed command to the domain modules.

pub mod checksum;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod generator;
pub mod health;
pub mod naming;
pub mod pull;
pub mod router;
pub mod serve;
pub mod shortname;
pub mod store;
pub mod transport;

use std::collections::HashSet;

use tracing::info;

use cli::{Cli, Command, GenerateFormat};
use config::Config;
use error::RunError;
use pull::PullEngine;
use shortname::ShortnameTable;
use store::{ModelReference, ModelStore};
use transport::{PullOptions, RemoveOptions, Transport};

pub async fn run(cli: Cli) -> Result<(), RunError> {
	let config = Config::load(&cli)?;
	let store = ModelStore::new(&config.store_path);
	let shortnames = ShortnameTable::default_table();

	match &cli.command {
		Command::Pull {
			reference,
			tls_verify,
			authfile,
			quiet,
			include_draft,
		} => {
			let resolved = shortnames.resolve(reference)?;
			let model_reference = ModelReference::parse(&resolved).map_err(store::StoreError::from)?;
			let transport = Transport::from_reference(model_reference);
			let engine = PullEngine::default();
			let opts = PullOptions {
				tls_verify: *tls_verify,
				authfile: authfile.clone(),
				engine: cli.engine.clone(),
				quiet: *quiet,
				include_draft: *include_draft,
			};
			transport.ensure_model_exists(&store, &engine, &opts).await?;
			info!(model = %transport.model_alias(), "pull complete");
		}

		Command::Remove { references, ignore, all } => {
			let targets: Vec<String> = if *all {
				store.list_models(true)?.into_keys().collect()
			} else {
				references.clone()
			};
			let opts = RemoveOptions {
				ignore: *ignore,
				engine: cli.engine.clone(),
			};
			for raw in targets {
				let resolved = shortnames.resolve(&raw)?;
				let model_reference = ModelReference::parse(&resolved).map_err(store::StoreError::from)?;
				let transport = Transport::from_reference(model_reference);
				match transport.remove(&store, &opts).await {
					Ok(removed) => info!(model = %transport.model_alias(), removed, "remove complete"),
					Err(e) if opts.ignore => info!(model = %transport.model_alias(), error = %e, "remove skipped"),
					Err(e) => return Err(e.into()),
				}
			}
		}

		Command::List { show_partial } => {
			let models = store.list_models(*show_partial)?;
			let now = chrono::Utc::now();
			for (identity, files) in models {
				let total: u64 = files.iter().map(|f| f.size).sum();
				let newest = files.iter().map(|f| f.modified).max().unwrap_or(now);
				let age = naming::human_duration((now - newest).num_seconds().max(0));
				println!(
					"{identity}\t{}\t{}\t{age} ago",
					files.len(),
					naming::human_readable_size(total as f64)
				);
			}
		}

		Command::Serve { reference, port, detach, name } => {
			let resolved = shortnames.resolve(reference)?;
			let model_reference = ModelReference::parse(&resolved).map_err(store::StoreError::from)?;
			let transport = Transport::from_reference(model_reference.clone());
			let pull_engine = PullEngine::default();
			let pull_opts = PullOptions::default();
			transport.ensure_model_exists(&store, &pull_engine, &pull_opts).await?;

			let mount_spec = transport.mount_cmd(&store).await?;
			let mut opts = serve::ServeOptions::from_config(&config);
			opts.port = port.or(opts.port);
			opts.detach = *detach;
			opts.name = name.clone();

			let plan = serve::plan_serve(&store, &config, &model_reference, mount_spec, opts, &HashSet::new()).await?;
			engine::ensure_machine_ready(&plan.engine_plan.binary).await?;
			if cli.dry_run {
				println!("{}", plan.engine_plan.to_shell_string());
			} else {
				plan.engine_plan.run().await?;
			}
		}

		Command::ServeAll { port } => {
			let plan = router::plan_router(&store, &config, *port).await?;
			engine::ensure_machine_ready(&plan.engine_plan.binary).await?;
			if cli.dry_run {
				println!("{}", plan.engine_plan.to_shell_string());
			} else {
				plan.engine_plan.run().await?;
			}
		}

		Command::Generate { reference, generate, add_to_unit } => {
			let resolved = shortnames.resolve(reference)?;
			let model_reference = ModelReference::parse(&resolved).map_err(store::StoreError::from)?;
			let transport = Transport::from_reference(model_reference.clone());
			let mount_spec = transport.mount_cmd(&store).await?;
			let opts = serve::ServeOptions::from_config(&config);
			let plan = serve::plan_serve(&store, &config, &model_reference, mount_spec.clone(), opts, &HashSet::new()).await?;

			let output_format = match generate.format {
				GenerateFormat::Quadlet => generator::OutputFormat::Quadlet,
				GenerateFormat::Kube => generator::OutputFormat::Kube,
				GenerateFormat::Compose => generator::OutputFormat::Compose,
			};
			let input = generator::GeneratorInput {
				served_identity: plan.served_identity.clone(),
				container_name: naming::sanitize_filename(&plan.served_identity),
				image: plan.image.clone(),
				mount_spec,
				host_port: plan.port,
				container_port: plan.port,
				command: plan.command.clone(),
				devices: engine::detect_devices_owned(config.devices_none),
				env: engine::accel::accel_env_vars(),
				custom_lines: add_to_unit
					.iter()
					.map(|line| (line.section.clone(), line.key.clone(), line.value.clone()))
					.collect(),
			};
			let written = generator::write_to(output_format, &input, &generate.output_dir)?;
			println!("wrote {}", written.display());
		}
	}

	Ok(())
}
