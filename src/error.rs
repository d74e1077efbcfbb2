use crate::mismatch::Mismatch;
use thiserror::Error;

/// The closed set of classifications a `verify` call can fail with.
///
/// Every other failure mode internal to a component (I/O while preparing a
/// sandbox, a malformed version-list file, ...) is modelled by that
/// component's own narrow error type and mapped into one of these variants
/// (or wrapped as [`VerificationError::Internal`]) at the point where it
/// crosses into orchestrator-visible territory.
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("compiler binary not found")]
    CompilerNotFound,

    #[error("unsupported compiler version: {0}")]
    UnsupportedVersion(String),

    #[error("invalid compiler version: {0}")]
    InvalidVersion(String),

    #[error("compilation failed: {0}")]
    CompilationFailed(String),

    #[error("operation timed out")]
    Timeout,

    #[error("no code deployed at the requested address")]
    NoDeployedCode,

    #[error("bytecode mismatch: {0}")]
    BytecodeMismatch(Mismatch<String>),

    #[error("invalid constructor arguments: {0}")]
    InvalidConstructorArgs(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Failures outside the closed taxonomy (transport errors from the
    /// bytecode provider, persistence failures, ...). Kept distinct from
    /// `CompilationFailed` so callers can tell "the compiler rejected this"
    /// from "something upstream broke" even though both ultimately surface
    /// as an opaque message.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl VerificationError {
    /// A short, stable name for the classification, suitable for metrics
    /// labels and log fields. `Internal` is reported as `"internal"`.
    pub fn classification(&self) -> &'static str {
        match self {
            Self::CompilerNotFound => "compiler_not_found",
            Self::UnsupportedVersion(_) => "unsupported_version",
            Self::InvalidVersion(_) => "invalid_version",
            Self::CompilationFailed(_) => "compilation_failed",
            Self::Timeout => "timeout",
            Self::NoDeployedCode => "no_deployed_code",
            Self::BytecodeMismatch(_) => "bytecode_mismatch",
            Self::InvalidConstructorArgs(_) => "invalid_constructor_args",
            Self::InvalidInput(_) => "invalid_input",
            Self::Internal(_) => "internal",
        }
    }
}
