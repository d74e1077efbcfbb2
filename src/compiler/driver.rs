//! C2: Compiler Driver.
//!
//! Invokes the `solc` subprocess under a deadline via `--standard-json`,
//! the only CLI surface that reports runtime bytecode
//! (`evm.deployedBytecode.object`) and immutable references -- both of
//! which every caller of this core needs for its equivalence decision. A
//! raw single-source submission is wrapped into an equivalent Standard-JSON
//! document rather than driven through `--combined-json`, whose `bin` field
//! is creation bytecode. Grounded on the corpus's own
//! `Solc::async_compile_output` (spawn, feed stdin, collect stdout/stderr,
//! classify nonzero exit).

use std::{path::Path, process::Stdio, time::Duration};

use serde_json::{json, Value};
use thiserror::Error;
use tokio::{
    io::AsyncWriteExt,
    process::Command,
    time::timeout,
};
use tracing::instrument;

use crate::{
    compiler::{
        output::{self, select_contract, ParsedContract},
        version_store::{VersionStore, VersionStoreError},
    },
    types::{CompilationArtifact, CompilerConfig, CompilerVersion, HexBytes, SourceInput},
};

/// File name used when wrapping a raw single-source submission into a
/// Standard-JSON document; only matters for contract selection by
/// `file:name` and for error messages, since there is only ever one source
/// file on this path.
const SINGLE_SOURCE_FILENAME: &str = "source.sol";

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("source input must not be empty")]
    EmptySource,
    #[error("compiler version must not be empty")]
    EmptyVersion,
    #[error("compiler binary not found for version {0}")]
    CompilerNotFound(String),
    #[error("compilation failed: {0}")]
    CompilationFailed(String),
    #[error("compilation timed out after {0:?}")]
    Timeout(Duration),
    #[error("no contract matched the requested selector")]
    NoMatchingContract,
    #[error("io error driving the compiler subprocess: {0}")]
    Io(#[from] std::io::Error),
    #[error("version store error: {0}")]
    VersionStore(#[from] VersionStoreError),
}

/// Drives `solc` subprocess invocations against a [`VersionStore`]-backed
/// set of binaries.
pub struct CompilerDriver {
    version_store: VersionStore,
    auto_download: bool,
}

impl CompilerDriver {
    pub fn new(version_store: VersionStore, auto_download: bool) -> Self {
        Self {
            version_store,
            auto_download,
        }
    }

    #[instrument(skip(self, source, config), fields(compiler_version = %version))]
    pub async fn compile(
        &self,
        source: &SourceInput,
        version: &CompilerVersion,
        config: &CompilerConfig,
        deadline: Duration,
    ) -> Result<CompilationArtifact, DriverError> {
        if source.is_empty() {
            return Err(DriverError::EmptySource);
        }
        if version.as_str().trim().is_empty() {
            return Err(DriverError::EmptyVersion);
        }

        let solc_path = self.resolve_binary(version).await?;
        let document = document_for(source, config);

        let run = self.run_standard_json(&solc_path, &document);
        let contracts = match timeout(deadline, run).await {
            Ok(result) => result?,
            Err(_) => return Err(DriverError::Timeout(deadline)),
        };

        let selected = select_contract(&contracts, config.contract_name.as_deref())
            .ok_or(DriverError::NoMatchingContract)?;

        Ok(to_artifact(selected, version))
    }

    async fn resolve_binary(&self, version: &CompilerVersion) -> Result<std::path::PathBuf, DriverError> {
        if self.version_store.has_version(version).await {
            return Ok(self.version_store.path_of(version));
        }
        if !self.auto_download {
            return Err(DriverError::CompilerNotFound(version.to_string()));
        }
        self.version_store
            .download(version)
            .await
            .map_err(|e| match e {
                VersionStoreError::NotFound(v, _) => DriverError::CompilerNotFound(v),
                other => DriverError::VersionStore(other),
            })
    }

    /// `--standard-json`, document fed via stdin.
    async fn run_standard_json(
        &self,
        solc_path: &Path,
        document: &str,
    ) -> Result<Vec<ParsedContract>, DriverError> {
        let mut child = Command::new(solc_path)
            .arg("--standard-json")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        {
            let stdin = child
                .stdin
                .as_mut()
                .expect("stdin was configured as piped");
            stdin.write_all(document.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(DriverError::CompilationFailed(stderr));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        output::parse_standard_json(&stdout).map_err(DriverError::CompilationFailed)
    }
}

/// Produces the `--standard-json` document to feed the subprocess: a
/// Standard-JSON input is passed through unchanged, a raw single source is
/// wrapped via [`standard_json_from_single_source`] so the output always
/// carries `evm.deployedBytecode.object`, never `--combined-json`'s `bin`.
fn document_for(source: &SourceInput, config: &CompilerConfig) -> String {
    match source {
        SourceInput::StandardJson(document) => document.clone(),
        SourceInput::SingleSource(text) => {
            standard_json_from_single_source(SINGLE_SOURCE_FILENAME, text, config).to_string()
        }
    }
}

fn to_artifact(contract: &ParsedContract, version: &CompilerVersion) -> CompilationArtifact {
    CompilationArtifact {
        runtime_bytecode: HexBytes::new(contract.runtime_bytecode.clone()),
        abi: contract.abi.clone(),
        metadata: contract.metadata.clone(),
        immutable_references: contract.immutable_references.clone(),
        compiler_version: version.clone(),
    }
}

/// Builds a minimal standard-json document for a single in-memory source
/// file, used by callers that only have raw Solidity text but need the
/// richer standard-json output (notably: runtime bytecode and immutable
/// references, neither of which combined-json exposes).
pub fn standard_json_from_single_source(
    filename: &str,
    content: &str,
    config: &CompilerConfig,
) -> Value {
    let output_selection = json!({
        "*": {
            "*": ["abi", "metadata", "evm.deployedBytecode.object", "evm.deployedBytecode.immutableReferences"]
        }
    });

    json!({
        "language": "Solidity",
        "sources": {
            filename: { "content": content }
        },
        "settings": {
            "optimizer": {
                "enabled": config.optimization_enabled,
                "runs": config.optimization_runs,
            },
            "evmVersion": config.evm_version,
            "libraries": single_file_libraries(filename, &config.libraries),
            "outputSelection": output_selection,
        }
    })
}

fn single_file_libraries(
    filename: &str,
    libraries: &std::collections::BTreeMap<String, String>,
) -> Value {
    if libraries.is_empty() {
        return json!({});
    }
    let mut inner = serde_json::Map::new();
    for (label, address) in libraries {
        inner.insert(label.clone(), Value::String(address.clone()));
    }
    json!({ filename: inner })
}
