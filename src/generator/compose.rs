//! `docker-compose.yaml` generation (spec.md §4.K).

use super::GeneratorInput;

pub fn render(input: &GeneratorInput) -> String {
	let mut out = format!(
		"services:\n\
  {name}:\n\
    image: {image}\n\
    container_name: {name}\n\
    command: {command:?}\n\
    ports:\n\
      - \"{host_port}:{container_port}\"\n\
    volumes:\n\
      - \"{mount_spec}\"\n",
		name = input.container_name,
		image = input.image,
		command = input.command,
		host_port = input.host_port,
		container_port = input.container_port,
		mount_spec = compose_volume(&input.mount_spec),
	);

	if !input.env.is_empty() {
		out.push_str("    environment:\n");
		for (key, value) in &input.env {
			out.push_str(&format!("      - {key}={value}\n"));
		}
	}

	if !input.devices.is_empty() {
		out.push_str("    devices:\n");
		for device in &input.devices {
			out.push_str(&format!("      - \"{device}:{device}\"\n"));
		}
	}

	if is_gpu_image(&input.image) {
		out.push_str(
			"    deploy:\n\
      resources:\n\
        reservations:\n\
          devices:\n\
            - driver: nvidia\n\
              count: all\n\
              capabilities: [gpu]\n",
		);
	}

	out.push_str("    restart: on-failure\n");
	out
}

fn is_gpu_image(image: &str) -> bool {
	let lower = image.to_lowercase();
	["cuda", "rocm", "gpu"].iter().any(|kw| lower.contains(kw))
}

fn compose_volume(mount_spec: &str) -> String {
	let src = mount_spec.split(',').find_map(|kv| kv.strip_prefix("src=")).unwrap_or("/");
	format!("{src}:/mnt/models:ro")
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::generator::sample_input;

	#[test]
	fn compose_service_carries_port_mapping() {
		let rendered = render(&sample_input());
		assert!(rendered.contains("\"8080:8080\""));
		assert!(rendered.contains("/store/snapshot:/mnt/models:ro"));
	}

	#[test]
	fn compose_service_adds_gpu_reservation_for_accelerated_image() {
		let mut input = sample_input();
		input.image = "quay.io/modelrun/runtime:0.1-cuda".to_string();
		input.devices = vec!["/dev/dri".to_string()];
		input.env = vec![("GGML_VK_VISIBLE_DEVICES".to_string(), "0".to_string())];
		let rendered = render(&input);
		assert!(rendered.contains("capabilities: [gpu]"));
		assert!(rendered.contains("\"/dev/dri:/dev/dri\""));
		assert!(rendered.contains("GGML_VK_VISIBLE_DEVICES=0"));
	}

	#[test]
	fn compose_service_skips_gpu_reservation_for_cpu_image() {
		let rendered = render(&sample_input());
		assert!(!rendered.contains("capabilities: [gpu]"));
	}
}
