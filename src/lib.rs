//! Contract Verification Core: given the on-chain runtime bytecode deployed
//! at an address and user-submitted Solidity source with declared
//! compilation settings, re-compiles the source, normalizes both bytecodes
//! for metadata hashes and immutable-variable slots, and decides whether
//! they represent the same program.
//!
//! The crate exposes exactly one operational entry point,
//! [`orchestrator::VerifierOrchestrator::verify`], plus the two
//! collaborator traits it depends on ([`orchestrator::BytecodeProvider`],
//! [`orchestrator::VerificationSink`]). Everything else -- the GraphQL
//! resolver, the historical indexer, the storage backend, the RPC proxy --
//! is external to this crate and consumes this entry point as an adapter.

pub mod compiler;
pub mod config;
pub mod equivalence;
pub mod error;
pub mod immutable;
pub mod logging;
pub mod metadata;
pub mod metrics;
pub mod mismatch;
pub mod orchestrator;
pub mod types;

pub use equivalence::EquivalenceConfig;
pub use error::VerificationError;
pub use orchestrator::{BytecodeProvider, Compile, VerificationSink, VerifierOrchestrator};
pub use types::{
    Address, CompilationArtifact, CompilerConfig, CompilerVersion, HexBytes, ImmutableReference,
    ImmutableReferences, SourceInput, VerificationRecord, VerificationRequest, VerificationResult,
};
