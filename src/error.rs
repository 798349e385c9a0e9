//! Shared error taxonomy (spec.md §7).
//!
//! Every fallible module defines its own `thiserror` enum; this module only
//! holds the cross-cutting [`Kind`] used to map a typed error onto an exit
//! code, plus the aggregate [`RunError`] returned from [`crate::run`].

use thiserror::Error;

use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::generator::GeneratorError;
use crate::pull::PullError;
use crate::router::RouterError;
use crate::serve::PlanError;
use crate::shortname::ShortnameError;
use crate::store::StoreError;
use crate::transport::TransportError;

/// Error kind taxonomy from spec.md §7. Used to pick an exit code without
/// matching on every concrete error type at the CLI boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
	NotFound,
	AuthRequired,
	Transient,
	Corrupt,
	EndianMismatch,
	BadName,
	NotSupported,
	EngineMissing,
	EngineFailure,
	Usage,
	Io,
}

impl Kind {
	/// Exit code per spec.md §6/§7. `EndianMismatch` exits silently with 1.
	pub fn exit_code(self) -> i32 {
		match self {
			Kind::EndianMismatch => 1,
			Kind::Usage => 2,
			Kind::NotFound => 2,
			Kind::BadName => 22,     // EINVAL
			Kind::AuthRequired => 22, // EINVAL (bad credentials)
			Kind::NotSupported => 38, // ENOSYS
			Kind::Transient => 110,  // ETIMEDOUT
			Kind::Io => 5,           // EIO
			Kind::EngineMissing => 2,
			Kind::EngineFailure => 1,
			Kind::Corrupt => 5,
		}
	}
}

#[derive(Debug, Error)]
pub enum RunError {
	#[error(transparent)]
	Config(#[from] ConfigError),
	#[error(transparent)]
	Store(#[from] StoreError),
	#[error(transparent)]
	Transport(#[from] TransportError),
	#[error(transparent)]
	Pull(#[from] PullError),
	#[error(transparent)]
	Engine(#[from] EngineError),
	#[error(transparent)]
	Plan(#[from] PlanError),
	#[error(transparent)]
	Router(#[from] RouterError),
	#[error(transparent)]
	Shortname(#[from] ShortnameError),
	#[error(transparent)]
	Generator(#[from] GeneratorError),
}

impl RunError {
	pub fn kind(&self) -> Kind {
		match self {
			RunError::Config(_) => Kind::Usage,
			RunError::Store(e) => e.kind(),
			RunError::Transport(e) => e.kind(),
			RunError::Pull(e) => e.kind(),
			RunError::Engine(e) => e.kind(),
			RunError::Plan(e) => e.kind(),
			RunError::Router(e) => e.kind(),
			RunError::Shortname(e) => e.kind(),
			RunError::Generator(e) => e.kind(),
		}
	}

	/// Exit code for this error. Delegates to [`Kind::exit_code`] for most
	/// variants, but an engine invocation failure anywhere in the chain
	/// passes through the subprocess's own return code instead (spec.md §6).
	pub fn exit_code(&self) -> i32 {
		match self {
			RunError::Engine(e) => e.exit_code(),
			RunError::Plan(e) => e.exit_code(),
			RunError::Router(e) => e.exit_code(),
			other => other.kind().exit_code(),
		}
	}
}
