//! The data model shared across every component (§3 of the design).

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use ethers_core::types::Address as H160Address;
use serde::{Deserialize, Serialize};

/// A 20-byte identifier for a deployed contract.
pub type Address = H160Address;

/// A hexadecimal-encoded byte string.
///
/// Input is accepted with or without a `0x` prefix and in any case; the
/// canonical form produced by [`HexBytes::canonical`] is prefix-stripped and
/// lower-case. `HexBytes` never validates that its contents are valid hex
/// beyond what was true of the string it was built from -- components that
/// need a decoded `Vec<u8>` call [`HexBytes::decode`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HexBytes(String);

impl HexBytes {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Prefix-stripped, lower-case canonical form. Idempotent: calling this
    /// again on the result is a no-op (§8 invariant 1).
    pub fn canonical(&self) -> String {
        canonical_hex(&self.0)
    }

    pub fn is_empty_code(&self) -> bool {
        let c = self.canonical();
        c.is_empty()
    }

    pub fn decode(&self) -> Result<Vec<u8>, hex::FromHexError> {
        let c = self.canonical();
        let padded = if c.len() % 2 == 1 {
            format!("0{c}")
        } else {
            c
        };
        hex::decode(padded)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.canonical())
    }
}

impl From<String> for HexBytes {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl From<&str> for HexBytes {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

/// Strips an optional `0x`/`0X` prefix and lower-cases the remainder.
/// Idempotent by construction: the output never carries a prefix, so
/// re-applying it is the identity function.
pub fn canonical_hex(s: &str) -> String {
    let trimmed = s.trim();
    let without_prefix = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    without_prefix.to_ascii_lowercase()
}

/// A dotted-numeric identifier naming a specific compiler release, e.g.
/// `0.8.20+commit.a1b79de6`. Equality is string equality; no semver
/// ordering is assumed by the core, but a [`semver::Version`] is kept
/// alongside for components (the Version Store's download URL, mostly)
/// that need the numeric triple.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompilerVersion(String);

impl CompilerVersion {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `major.minor.patch` numeric triple, parsed from the leading
    /// dotted-numeric segment (everything up to the first `-` or `+`).
    pub fn semver(&self) -> Result<semver::Version, semver::Error> {
        let numeric_prefix = self
            .0
            .trim_start_matches('v')
            .split(['-', '+'])
            .next()
            .unwrap_or(&self.0);
        semver::Version::parse(numeric_prefix)
    }
}

impl fmt::Display for CompilerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq for CompilerVersion {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl Eq for CompilerVersion {}

impl std::hash::Hash for CompilerVersion {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl FromStr for CompilerVersion {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

/// Settings that, together with the source, make compilation deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    pub optimization_enabled: bool,
    pub optimization_runs: usize,
    pub evm_version: Option<String>,
    /// label -> address, for linking. Usually empty.
    pub libraries: BTreeMap<String, String>,
    /// May be `ContractName` or `path/file.sol:ContractName`.
    pub contract_name: Option<String>,
}

/// Either a single raw Solidity source unit, or a Standard-JSON document.
/// The driver auto-distinguishes these (§4.2).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceInput {
    SingleSource(String),
    StandardJson(String),
}

impl SourceInput {
    /// Classifies raw text per §4.2: trimmed text starting with `{` and
    /// containing both `"language"` and `"sources"` is Standard-JSON.
    pub fn classify(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let trimmed = raw.trim_start();
        let looks_like_standard_json = trimmed.starts_with('{')
            && raw.contains("\"language\"")
            && raw.contains("\"sources\"");
        if looks_like_standard_json {
            SourceInput::StandardJson(raw)
        } else {
            SourceInput::SingleSource(raw)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            SourceInput::SingleSource(s) | SourceInput::StandardJson(s) => s.trim().is_empty(),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SourceInput::SingleSource(s) | SourceInput::StandardJson(s) => s,
        }
    }
}

/// `{start, length}` in bytes, referring to a position inside runtime
/// bytecode reserved for an immutable value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmutableReference {
    pub start: usize,
    pub length: usize,
}

/// AST-node-id -> ordered sequence of references for that node.
pub type ImmutableReferences = BTreeMap<String, Vec<ImmutableReference>>;

/// Produced by the Compiler Driver (C2).
#[derive(Clone, Debug)]
pub struct CompilationArtifact {
    /// Always the *deployed / runtime* bytecode, never creation bytecode.
    pub runtime_bytecode: HexBytes,
    pub abi: String,
    pub metadata: String,
    pub immutable_references: ImmutableReferences,
    pub compiler_version: CompilerVersion,
}

/// A request to verify the source at a given address.
#[derive(Clone, Debug)]
pub struct VerificationRequest {
    pub address: Address,
    pub source: SourceInput,
    pub compiler_version: CompilerVersion,
    pub config: CompilerConfig,
    /// Opaque hex, stored for display; never used in the equivalence
    /// decision (runtime code contains no constructor arguments).
    pub constructor_arguments: Option<HexBytes>,
    pub license_type: Option<String>,
}

/// The outcome of one `verify` call, returned to the caller before any
/// persistence happens.
#[derive(Clone, Debug)]
pub struct VerificationResult {
    pub success: bool,
    pub deployed_bytecode: HexBytes,
    pub compiled_bytecode: Option<HexBytes>,
    pub abi: Option<String>,
    pub metadata: Option<String>,
    pub error: Option<String>,
}

/// The persisted outcome of a successful verification. The orchestrator
/// only ever constructs one of these when the equivalence decision is
/// `true` (§3 invariant: "persisted records are only written when the
/// equivalence decision is true").
#[derive(Clone, Debug)]
pub struct VerificationRecord {
    pub address: Address,
    pub is_verified: bool,
    pub contract_name: Option<String>,
    pub compiler_version: CompilerVersion,
    pub config: CompilerConfig,
    pub source: String,
    pub abi: String,
    pub constructor_arguments: Option<HexBytes>,
    pub metadata: String,
    pub license_type: Option<String>,
    pub verified_at: DateTime<Utc>,
}

