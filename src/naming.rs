//! Naming and formatting helpers (SPEC_FULL.md §3, grounded in
//! `original_source/ramalama/utils/naming.py` and `cli/_utils.py`).

use rand::Rng;

/// Matches `<anything>-00001-of-NNNNN.gguf`, the naming convention for the
/// first shard of a split GGUF archive (spec.md §4.F).
pub fn is_split_file_model(path: &str) -> Option<u32> {
	let file_name = path.rsplit('/').next().unwrap_or(path);
	let rest = file_name.strip_suffix(".gguf")?;
	let (head, shard_count) = rest.rsplit_once("-of-")?;
	if !head.ends_with("-00001") {
		return None;
	}
	shard_count.parse::<u32>().ok()
}

/// Build the sibling shard filename for split archive `index` of `total`,
/// given the first shard's name.
pub fn split_shard_name(first_shard: &str, index: u32, total: u32) -> String {
	first_shard.replacen(
		&format!("-00001-of-{total:05}.gguf"),
		&format!("-{index:05}-of-{total:05}.gguf"),
		1,
	)
}

pub fn sanitize_filename(name: &str) -> String {
	name.replace(':', "-")
}

/// A random container name of the form `modelrun-<10 alnum>`.
pub fn genname() -> String {
	const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
	let mut rng = rand::thread_rng();
	let suffix: String = (0..10)
		.map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
		.collect();
	format!("modelrun-{suffix}")
}

pub fn rm_until_substring(input: &str, substring: &str) -> String {
	match input.find(substring) {
		Some(pos) => input[pos + substring.len()..].to_string(),
		None => input.to_string(),
	}
}

pub fn human_readable_size(mut size: f64) -> String {
	for unit in ["B", "KB", "MB", "GB", "TB"] {
		if size < 1024.0 {
			return format!("{:.2} {unit}", size);
		}
		size /= 1024.0;
	}
	format!("{:.2} PB", size)
}

pub fn human_duration(seconds: i64) -> String {
	match seconds {
		s if s < 1 => "less than a second".to_string(),
		1 => "1 second".to_string(),
		s if s < 60 => format!("{s} seconds"),
		s if s < 120 => "1 minute".to_string(),
		s if s < 3600 => format!("{} minutes", s / 60),
		s if s < 7200 => "1 hour".to_string(),
		s if s < 86400 => format!("{} hours", s / 3600),
		s if s < 172800 => "1 day".to_string(),
		s if s < 604800 => format!("{} days", s / 86400),
		s if s < 1209600 => "1 week".to_string(),
		s => format!("{} weeks", s / 604800),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn detects_split_shard_first_file() {
		assert_eq!(
			is_split_file_model("model-00001-of-00003.gguf"),
			Some(3)
		);
		assert_eq!(is_split_file_model("model.gguf"), None);
	}

	#[test]
	fn builds_sibling_shard_name() {
		let name = split_shard_name("model-00001-of-00003.gguf", 2, 3);
		assert_eq!(name, "model-00002-of-00003.gguf");
	}

	#[test]
	fn sanitizes_colons() {
		assert_eq!(sanitize_filename("foo:bar:v1"), "foo-bar-v1");
	}

	#[test]
	fn genname_has_expected_shape() {
		let name = genname();
		assert!(name.starts_with("modelrun-"));
		assert_eq!(name.len(), "modelrun-".len() + 10);
	}

	#[test]
	fn human_readable_size_scales_units() {
		assert_eq!(human_readable_size(512.0), "512.00 B");
		assert_eq!(human_readable_size(2048.0), "2.00 KB");
	}
}
