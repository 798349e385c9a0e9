//! systemd quadlet `.container` unit generation (spec.md §4.K).

use std::collections::BTreeMap;

use super::GeneratorInput;

pub fn render(input: &GeneratorInput) -> String {
	let mut sections: BTreeMap<String, Vec<String>> = BTreeMap::new();
	sections.entry("Unit".to_string()).or_default().push(format!("Description=modelrun serve {}", input.served_identity));

	let container = sections.entry("Container".to_string()).or_default();
	container.push(format!("Image={}", input.image));
	container.push(format!("ContainerName={}", input.container_name));
	container.push(format!("Mount={}", input.mount_spec));
	container.push(format!("PublishPort={}:{}", input.host_port, input.container_port));
	for device in &input.devices {
		container.push(format!("AddDevice={device}"));
	}
	for (key, value) in &input.env {
		container.push(format!("Environment={key}={value}"));
	}
	container.push(format!("Exec={}", input.command.join(" ")));

	sections.entry("Service".to_string()).or_default().push("Restart=on-failure".to_string());
	sections.entry("Install".to_string()).or_default().push("WantedBy=default.target".to_string());

	for (section, key, value) in &input.custom_lines {
		sections.entry(section.clone()).or_default().push(format!("{key}={value}"));
	}

	let order = ["Unit", "Container", "Service", "Install"];
	let mut out = String::new();
	for section in order {
		let Some(lines) = sections.remove(section) else { continue };
		write_section(&mut out, section, &lines);
	}
	for (section, lines) in &sections {
		write_section(&mut out, section, lines);
	}

	out
}

fn write_section(out: &mut String, name: &str, lines: &[String]) {
	out.push_str(&format!("[{name}]\n"));
	for line in lines {
		out.push_str(line);
		out.push('\n');
	}
	out.push('\n');
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::generator::sample_input;

	#[test]
	fn quadlet_unit_carries_image_and_mount() {
		let rendered = render(&sample_input());
		assert!(rendered.contains("Image=quay.io/modelrun/runtime:0.1-cpu"));
		assert!(rendered.contains("PublishPort=8080:8080"));
	}

	#[test]
	fn quadlet_unit_splices_custom_lines_into_named_section() {
		let mut input = sample_input();
		input.custom_lines = vec![("Container".to_string(), "PodmanArgs".to_string(), "--memory=4g".to_string())];
		let rendered = render(&input);
		assert!(rendered.contains("PodmanArgs=--memory=4g"));
	}

	#[test]
	fn quadlet_unit_appends_arbitrary_custom_section() {
		let mut input = sample_input();
		input.custom_lines = vec![("X-Custom".to_string(), "Key".to_string(), "value".to_string())];
		let rendered = render(&input);
		assert!(rendered.contains("[X-Custom]"));
		assert!(rendered.contains("Key=value"));
	}
}
