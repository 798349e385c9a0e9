//! Kubernetes Pod YAML generation (spec.md §4.K).

use super::GeneratorInput;

pub fn render(input: &GeneratorInput) -> String {
	format!(
		"apiVersion: v1\n\
kind: Pod\n\
metadata:\n\
  name: {name}\n\
  labels:\n\
    app: {name}\n\
spec:\n\
  containers:\n\
    - name: {name}\n\
      image: {image}\n\
      command: {command:?}\n\
      ports:\n\
        - containerPort: {container_port}\n\
      volumeMounts:\n\
        - name: models\n\
          mountPath: /mnt/models\n\
          readOnly: true\n\
  volumes:\n\
    - name: models\n\
      hostPath:\n\
        path: {host_path}\n",
		name = input.container_name,
		image = input.image,
		command = input.command,
		container_port = input.container_port,
		host_path = mount_source(&input.mount_spec),
	)
}

fn mount_source(mount_spec: &str) -> &str {
	mount_spec
		.split(',')
		.find_map(|kv| kv.strip_prefix("src="))
		.unwrap_or("/")
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::generator::sample_input;

	#[test]
	fn kube_pod_carries_container_port_and_host_path() {
		let rendered = render(&sample_input());
		assert!(rendered.contains("containerPort: 8080"));
		assert!(rendered.contains("path: /store/snapshot"));
	}
}
