//! C6: Verifier Orchestrator.
//!
//! The one externally visible entry point. Sequences
//! fetch (bytecode provider) -> compile (C2) -> compare (C5) and produces a
//! [`VerificationResult`], persisting a [`VerificationRecord`] through the
//! sink only on success.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::{
    equivalence::{self, EquivalenceConfig},
    error::VerificationError,
    metrics,
    mismatch::Mismatch,
    types::{
        Address, CompilationArtifact, CompilerConfig, HexBytes, SourceInput, VerificationRecord,
        VerificationRequest, VerificationResult,
    },
};

/// The bytecode provider collaborator (§6): fetches the runtime code
/// currently deployed at an address. An empty string or `"0x"` denotes "no
/// code"; anything else returned successfully is handed to the driver as-is.
/// Transport-level failures are surfaced through the `anyhow::Error`
/// associated type rather than forced into the closed taxonomy -- see the
/// "Transport errors vs. no code" open question.
#[async_trait]
pub trait BytecodeProvider: Send + Sync {
    async fn code_at(&self, address: Address) -> anyhow::Result<String>;
}

/// The persistence sink collaborator (§6): stores a verification record.
/// Called only on a successful verification; idempotence and
/// transactionality are the sink's concern, not the core's.
#[async_trait]
pub trait VerificationSink: Send + Sync {
    async fn put(&self, record: VerificationRecord) -> anyhow::Result<()>;
}

/// Anything capable of turning a [`SourceInput`] + [`CompilerConfig`] into a
/// [`CompilationArtifact`]. Implemented by [`crate::compiler::CompilerDriver`];
/// expressed as a trait here so the orchestrator can be tested against a
/// fake without spawning real `solc` subprocesses.
#[async_trait]
pub trait Compile: Send + Sync {
    async fn compile(
        &self,
        source: &SourceInput,
        version: &crate::types::CompilerVersion,
        config: &CompilerConfig,
        deadline: Duration,
    ) -> Result<CompilationArtifact, VerificationError>;
}

#[async_trait]
impl Compile for crate::compiler::CompilerDriver {
    async fn compile(
        &self,
        source: &SourceInput,
        version: &crate::types::CompilerVersion,
        config: &CompilerConfig,
        deadline: Duration,
    ) -> Result<CompilationArtifact, VerificationError> {
        crate::compiler::CompilerDriver::compile(self, source, version, config, deadline)
            .await
            .map_err(map_driver_error)
    }
}

fn map_driver_error(err: crate::compiler::DriverError) -> VerificationError {
    use crate::compiler::DriverError as D;
    match err {
        D::EmptySource | D::EmptyVersion => {
            VerificationError::InvalidInput(err.to_string())
        }
        D::CompilerNotFound(_) => VerificationError::CompilerNotFound,
        D::CompilationFailed(message) => VerificationError::CompilationFailed(message),
        D::Timeout(_) => VerificationError::Timeout,
        D::NoMatchingContract => {
            VerificationError::CompilationFailed("no matching contract in compiler output".into())
        }
        D::Io(_) | D::VersionStore(_) => VerificationError::Internal(err.into()),
    }
}

/// Sequences fetch -> compile -> compare for one verification request.
pub struct VerifierOrchestrator<C, S> {
    compiler: C,
    sink: S,
    equivalence_config: EquivalenceConfig,
    deadline: Duration,
}

impl<C, S> VerifierOrchestrator<C, S>
where
    C: Compile,
    S: VerificationSink,
{
    pub fn new(compiler: C, sink: S, equivalence_config: EquivalenceConfig, deadline: Duration) -> Self {
        Self {
            compiler,
            sink,
            equivalence_config,
            deadline,
        }
    }

    #[instrument(skip(self, provider, request), fields(address = %request.address))]
    pub async fn verify(
        &self,
        provider: &dyn BytecodeProvider,
        request: VerificationRequest,
    ) -> Result<VerificationResult, VerificationError> {
        if request.source.is_empty() {
            return Err(VerificationError::InvalidInput(
                "source input must not be empty".into(),
            ));
        }

        let timer = metrics::VERIFY_DURATION_SECONDS.start_timer();
        let outcome = self.verify_inner(provider, &request).await;
        timer.observe_duration();
        metrics::VERIFY_TOTAL
            .with_label_values(&[outcome
                .as_ref()
                .err()
                .map(VerificationError::classification)
                .unwrap_or("success")])
            .inc();

        match &outcome {
            Ok(_) => info!("verification succeeded"),
            Err(e) => warn!(error = %e, "verification failed"),
        }
        outcome
    }

    async fn verify_inner(
        &self,
        provider: &dyn BytecodeProvider,
        request: &VerificationRequest,
    ) -> Result<VerificationResult, VerificationError> {
        let deployed_raw = provider
            .code_at(request.address)
            .await
            .map_err(VerificationError::Internal)?;
        let deployed_bytecode = HexBytes::new(deployed_raw);
        if deployed_bytecode.is_empty_code() {
            return Err(VerificationError::NoDeployedCode);
        }

        let artifact = self
            .compiler
            .compile(
                &request.source,
                &request.compiler_version,
                &request.config,
                self.deadline,
            )
            .await?;

        let matches = equivalence::decide(
            &deployed_bytecode.canonical(),
            &artifact.runtime_bytecode.canonical(),
            &artifact.immutable_references,
            &self.equivalence_config,
        );

        if !matches {
            let mismatch = Mismatch::new(
                deployed_bytecode.canonical(),
                artifact.runtime_bytecode.canonical(),
            );
            return Ok(VerificationResult {
                success: false,
                deployed_bytecode,
                compiled_bytecode: Some(artifact.runtime_bytecode),
                abi: Some(artifact.abi),
                metadata: Some(artifact.metadata),
                error: Some(VerificationError::BytecodeMismatch(mismatch).to_string()),
            });
        }

        let record = VerificationRecord {
            address: request.address,
            is_verified: true,
            contract_name: request.config.contract_name.clone(),
            compiler_version: artifact.compiler_version.clone(),
            config: request.config.clone(),
            source: request.source.as_str().to_string(),
            abi: artifact.abi.clone(),
            constructor_arguments: request.constructor_arguments.clone(),
            metadata: artifact.metadata.clone(),
            license_type: request.license_type.clone(),
            verified_at: Utc::now(),
        };

        let result = VerificationResult {
            success: true,
            deployed_bytecode,
            compiled_bytecode: Some(artifact.runtime_bytecode),
            abi: Some(artifact.abi),
            metadata: Some(artifact.metadata),
            error: None,
        };

        self.sink
            .put(record)
            .await
            .map_err(VerificationError::Internal)?;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CompilerVersion, ImmutableReferences};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    struct FakeProvider {
        code: String,
    }

    #[async_trait]
    impl BytecodeProvider for FakeProvider {
        async fn code_at(&self, _address: Address) -> anyhow::Result<String> {
            Ok(self.code.clone())
        }
    }

    struct FakeSink {
        records: Arc<Mutex<Vec<VerificationRecord>>>,
    }

    #[async_trait]
    impl VerificationSink for FakeSink {
        async fn put(&self, record: VerificationRecord) -> anyhow::Result<()> {
            self.records.lock().push(record);
            Ok(())
        }
    }

    struct FakeCompiler {
        runtime_bytecode: String,
    }

    #[async_trait]
    impl Compile for FakeCompiler {
        async fn compile(
            &self,
            _source: &SourceInput,
            version: &CompilerVersion,
            _config: &CompilerConfig,
            _deadline: Duration,
        ) -> Result<CompilationArtifact, VerificationError> {
            Ok(CompilationArtifact {
                runtime_bytecode: HexBytes::new(self.runtime_bytecode.clone()),
                abi: "[]".to_string(),
                metadata: "{}".to_string(),
                immutable_references: ImmutableReferences::new(),
                compiler_version: version.clone(),
            })
        }
    }

    fn request(source: &str) -> VerificationRequest {
        VerificationRequest {
            address: Address::zero(),
            source: SourceInput::SingleSource(source.to_string()),
            compiler_version: CompilerVersion::new("0.8.20"),
            config: CompilerConfig::default(),
            constructor_arguments: None,
            license_type: None,
        }
    }

    #[tokio::test]
    async fn s1_matching_bytecode_succeeds_and_persists() {
        let records = Arc::new(Mutex::new(Vec::new()));
        let orchestrator = VerifierOrchestrator::new(
            FakeCompiler {
                runtime_bytecode: "6080604052".to_string(),
            },
            FakeSink {
                records: records.clone(),
            },
            EquivalenceConfig::default(),
            Duration::from_secs(5),
        );
        let provider = FakeProvider {
            code: "6080604052".to_string(),
        };

        let result = orchestrator
            .verify(&provider, request("contract A {}"))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(records.lock().len(), 1);
    }

    #[tokio::test]
    async fn s2_prefixed_bytecode_succeeds() {
        let orchestrator = VerifierOrchestrator::new(
            FakeCompiler {
                runtime_bytecode: "0x6080604052".to_string(),
            },
            FakeSink {
                records: Arc::new(Mutex::new(Vec::new())),
            },
            EquivalenceConfig::default(),
            Duration::from_secs(5),
        );
        let provider = FakeProvider {
            code: "0x6080604052".to_string(),
        };

        let result = orchestrator
            .verify(&provider, request("contract A {}"))
            .await
            .unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn s5_mismatched_bytecode_fails_without_persisting() {
        let records = Arc::new(Mutex::new(Vec::new()));
        let orchestrator = VerifierOrchestrator::new(
            FakeCompiler {
                runtime_bytecode: "bb".repeat(100),
            },
            FakeSink {
                records: records.clone(),
            },
            EquivalenceConfig::default(),
            Duration::from_secs(5),
        );
        let provider = FakeProvider {
            code: "aa".repeat(100),
        };

        let result = orchestrator
            .verify(&provider, request("contract A {}"))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("bytecode mismatch"));
        assert!(records.lock().is_empty());
    }

    #[tokio::test]
    async fn s6_empty_deployed_code_is_rejected_before_compiling() {
        let orchestrator = VerifierOrchestrator::new(
            FakeCompiler {
                runtime_bytecode: "irrelevant-if-reached".to_string(),
            },
            FakeSink {
                records: Arc::new(Mutex::new(Vec::new())),
            },
            EquivalenceConfig::default(),
            Duration::from_secs(5),
        );
        let provider = FakeProvider {
            code: "0x".to_string(),
        };

        let err = orchestrator
            .verify(&provider, request("contract A {}"))
            .await
            .unwrap_err();
        assert!(matches!(err, VerificationError::NoDeployedCode));
    }

    #[tokio::test]
    async fn empty_source_is_rejected() {
        let orchestrator = VerifierOrchestrator::new(
            FakeCompiler {
                runtime_bytecode: "6080604052".to_string(),
            },
            FakeSink {
                records: Arc::new(Mutex::new(Vec::new())),
            },
            EquivalenceConfig::default(),
            Duration::from_secs(5),
        );
        let provider = FakeProvider {
            code: "6080604052".to_string(),
        };

        let err = orchestrator
            .verify(&provider, request(""))
            .await
            .unwrap_err();
        assert!(matches!(err, VerificationError::InvalidInput(_)));
    }
}
