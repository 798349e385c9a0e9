//! Shortname resolver (spec.md §4.D).
//!
//! The alias table itself is an external collaborator (spec.md §1): callers
//! load `(alias, canonical_ref)` pairs from wherever their configuration
//! says to (a shipped shortnames file, a config key, …) and hand them to
//! [`ShortnameTable::new`]. Resolution here is exact-match only; a
//! reference that already contains `://` passes through unchanged.

use std::collections::HashMap;

use thiserror::Error;

use crate::error::Kind;
use crate::store::ModelReference;

#[derive(Debug, Error)]
pub enum ShortnameError {
	#[error("unknown shortname: {0}")]
	Unresolved(String),
}

impl ShortnameError {
	pub fn kind(&self) -> Kind {
		Kind::NotFound
	}
}

pub struct ShortnameTable {
	aliases: HashMap<String, String>,
}

impl ShortnameTable {
	pub fn new(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
		Self {
			aliases: pairs.into_iter().collect(),
		}
	}

	pub fn empty() -> Self {
		Self {
			aliases: HashMap::new(),
		}
	}

	/// The table this binary actually ships with (SPEC_FULL.md §1: "the
	/// table contents ship as static data"). A small curated set of common
	/// model names mapped to their canonical `ollama://library/...`
	/// reference, enough to resolve spec.md §8 scenario 1 end to end; not
	/// meant to mirror any upstream registry's full catalog.
	pub fn default_table() -> Self {
		const PAIRS: &[(&str, &str)] = &[
			("tinyllama", "ollama://library/tinyllama:latest"),
			("llama3", "ollama://library/llama3:latest"),
			("llama3.1", "ollama://library/llama3.1:latest"),
			("mistral", "ollama://library/mistral:latest"),
			("gemma", "ollama://library/gemma:latest"),
			("gemma2", "ollama://library/gemma2:latest"),
			("phi3", "ollama://library/phi3:latest"),
			("qwen2", "ollama://library/qwen2:latest"),
			("granite", "ollama://library/granite3-dense:latest"),
		];
		Self::new(PAIRS.iter().map(|(k, v)| (k.to_string(), v.to_string())))
	}

	/// Resolve one input string to a canonical `scheme://path[:tag]`
	/// reference. A string already containing `://` is passed through
	/// unchanged (already qualified); an HTTPS URL to a known host is
	/// rewritten to its native scheme before the `://` check, so a
	/// `https://huggingface.co/org/repo` argument also short-circuits here.
	/// Anything else must match an alias exactly, or resolution fails.
	pub fn resolve(&self, input: &str) -> Result<String, ShortnameError> {
		let rewritten = ModelReference::rewrite_known_host(input);
		if rewritten.contains("://") {
			return Ok(rewritten);
		}

		self.aliases
			.get(input)
			.cloned()
			.ok_or_else(|| ShortnameError::Unresolved(input.to_string()))
	}

	/// Resolve each element of a list independently (spec.md §4.D).
	pub fn resolve_many(&self, inputs: &[String]) -> Result<Vec<String>, ShortnameError> {
		inputs.iter().map(|s| self.resolve(s)).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn table() -> ShortnameTable {
		ShortnameTable::new([(
			"tinyllama".to_string(),
			"ollama://library/tinyllama:latest".to_string(),
		)])
	}

	#[test]
	fn resolves_exact_alias() {
		let t = table();
		assert_eq!(
			t.resolve("tinyllama").unwrap(),
			"ollama://library/tinyllama:latest"
		);
	}

	#[test]
	fn passes_through_qualified_reference() {
		let t = ShortnameTable::empty();
		assert_eq!(t.resolve("hf://org/repo").unwrap(), "hf://org/repo");
	}

	#[test]
	fn unmatched_shortname_is_hard_failure() {
		let t = ShortnameTable::empty();
		assert!(t.resolve("does-not-exist").is_err());
	}

	#[test]
	fn substring_match_never_applies() {
		let t = table();
		assert!(t.resolve("tinyllama-extra").is_err());
	}

	#[test]
	fn default_table_resolves_tinyllama() {
		let t = ShortnameTable::default_table();
		assert_eq!(t.resolve("tinyllama").unwrap(), "ollama://library/tinyllama:latest");
	}

	#[test]
	fn resolve_many_is_elementwise() {
		let t = table();
		let resolved = t
			.resolve_many(&["tinyllama".to_string(), "hf://org/repo".to_string()])
			.unwrap();
		assert_eq!(resolved[0], "ollama://library/tinyllama:latest");
		assert_eq!(resolved[1], "hf://org/repo");
	}
}
