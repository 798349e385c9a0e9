//! Model reference parsing (spec.md §3 "Model Reference").
//!
//! `<scheme>://<path>[:<tag>]`, missing tag defaults to `latest`. Aliases
//! (`huggingface` → `hf`, `modelscope` → `ms`) are normalized to their short
//! form so store paths and canonical strings are stable regardless of which
//! spelling the user typed.

use std::fmt;

use thiserror::Error;

use crate::error::Kind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
	Hf,
	Ollama,
	ModelScope,
	Oci,
	Http,
	Https,
	File,
}

impl Scheme {
	/// Short form used in store paths and canonical references.
	pub fn as_str(self) -> &'static str {
		match self {
			Scheme::Hf => "hf",
			Scheme::Ollama => "ollama",
			Scheme::ModelScope => "ms",
			Scheme::Oci => "oci",
			Scheme::Http => "http",
			Scheme::Https => "https",
			Scheme::File => "file",
		}
	}

	fn parse(raw: &str) -> Result<Self, ReferenceError> {
		match raw {
			"hf" | "huggingface" => Ok(Scheme::Hf),
			"ollama" => Ok(Scheme::Ollama),
			"ms" | "modelscope" => Ok(Scheme::ModelScope),
			"oci" => Ok(Scheme::Oci),
			"http" => Ok(Scheme::Http),
			"https" => Ok(Scheme::Https),
			"file" => Ok(Scheme::File),
			other => Err(ReferenceError::UnknownScheme(other.to_string())),
		}
	}
}

impl fmt::Display for Scheme {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Error)]
pub enum ReferenceError {
	#[error("malformed model reference: {0}")]
	Malformed(String),
	#[error("unknown transport scheme: {0}")]
	UnknownScheme(String),
	#[error("unresolved shortname: {0}")]
	UnresolvedShortname(String),
}

impl ReferenceError {
	pub fn kind(&self) -> Kind {
		Kind::BadName
	}
}

/// A fully resolved, transport-qualified model reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelReference {
	pub scheme: Scheme,
	pub path: String,
	pub tag: String,
}

impl ModelReference {
	/// Parse `<scheme>://<path>[:<tag>]`. Callers are expected to have
	/// already run shortname resolution and HTTPS-host rewriting; a string
	/// lacking `://` is a hard `Malformed` error here.
	pub fn parse(raw: &str) -> Result<Self, ReferenceError> {
		let (scheme_raw, rest) = raw
			.split_once("://")
			.ok_or_else(|| ReferenceError::Malformed(raw.to_string()))?;
		let scheme = Scheme::parse(scheme_raw)?;

		if rest.is_empty() {
			return Err(ReferenceError::Malformed(raw.to_string()));
		}

		// Tag is the last `:NAME` segment, but only if it doesn't belong to
		// a port number preceded by a slash-free host (http/https/oci refs
		// can carry a registry port). We split on the last ':' that is not
		// immediately followed by '//' and that occurs after the last '/'.
		let last_slash = rest.rfind('/').map(|i| i + 1).unwrap_or(0);
		let (path, tag) = match rest[last_slash..].rfind(':') {
			Some(rel_idx) => {
				let idx = last_slash + rel_idx;
				(rest[..idx].to_string(), rest[idx + 1..].to_string())
			}
			None => (rest.to_string(), "latest".to_string()),
		};

		if path.is_empty() {
			return Err(ReferenceError::Malformed(raw.to_string()));
		}

		Ok(Self { scheme, path, tag })
	}

	/// Rewrite a `https://` URL pointing at a known host to its native
	/// transport scheme (spec.md §3), e.g.
	/// `https://huggingface.co/org/repo` → `hf://org/repo`.
	///
	/// Only rewrites URLs whose path has exactly two segments
	/// (`/org/repo`); anything else is returned unchanged so it falls
	/// through to the plain URL transport.
	pub fn rewrite_known_host(raw: &str) -> String {
		let Some(after_scheme) = raw
			.strip_prefix("https://")
			.or_else(|| raw.strip_prefix("http://"))
		else {
			return raw.to_string();
		};

		let (host, path) = match after_scheme.split_once('/') {
			Some((h, p)) => (h, p),
			None => return raw.to_string(),
		};

		let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
		if segments.len() != 2 {
			return raw.to_string();
		}

		let native = match host {
			"hf.co" | "huggingface.co" => "hf",
			"ollama.com" => "ollama",
			_ => return raw.to_string(),
		};

		format!("{native}://{}", segments.join("/"))
	}

	/// Store-path-qualified string, e.g. `ollama://library/tinyllama:latest`.
	pub fn canonical(&self) -> String {
		format!("{}://{}:{}", self.scheme, self.path, self.tag)
	}

	/// OpenAI-compatible served identity (spec.md §6): `<scheme>/<path>:<tag>`.
	pub fn served_identity(&self) -> String {
		format!("{}/{}:{}", self.scheme, self.path, self.tag)
	}
}

impl fmt::Display for ModelReference {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.canonical())
	}
}
