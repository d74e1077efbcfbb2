//! C5: Equivalence Engine.
//!
//! Decides whether a deployed and a compiled runtime bytecode represent the
//! same program. State-free: every call is independent, driven entirely by
//! its arguments and an [`EquivalenceConfig`].

use serde::{Deserialize, Serialize};

use crate::{immutable, metadata, types::ImmutableReferences};

/// Tunables for the equivalence ladder (§4.5). Defaults reproduce the two
/// historical thresholds verbatim rather than unifying them -- see the
/// "Threshold defaults" open question in the design notes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EquivalenceConfig {
    /// Step 3: allow a metadata-only difference to still count as a match
    /// when no immutable references are involved.
    pub allow_metadata_variance: bool,
    /// θ used when immutable references are present (step 2's fallback into
    /// step 4 when the masked compare still disagrees).
    pub threshold_with_immutables: f64,
    /// θ used when no immutable references apply.
    pub threshold_without_immutables: f64,
}

impl Default for EquivalenceConfig {
    fn default() -> Self {
        Self {
            allow_metadata_variance: true,
            threshold_with_immutables: 0.93,
            threshold_without_immutables: 0.95,
        }
    }
}

/// Decides equivalence between `deployed` and `compiled` runtime bytecode,
/// given an optional map of immutable references extracted from the
/// compiled artifact. Both inputs may carry a `0x` prefix; it is stripped
/// before any comparison.
pub fn decide(
    deployed: &str,
    compiled: &str,
    immutable_references: &ImmutableReferences,
    config: &EquivalenceConfig,
) -> bool {
    let deployed = crate::types::canonical_hex(deployed);
    let compiled = crate::types::canonical_hex(compiled);

    // 1. exact equality
    if deployed == compiled {
        return true;
    }

    let has_immutables = !immutable_references.is_empty();

    // 2. metadata-stripped + immutable-masked compare
    if has_immutables {
        let deployed_masked = immutable::mask(metadata::strip(&deployed), immutable_references);
        let compiled_masked = immutable::mask(metadata::strip(&compiled), immutable_references);
        if deployed_masked == compiled_masked {
            return true;
        }
        let ratio = similarity_ratio(&deployed_masked, &compiled_masked);
        return ratio > config.threshold_with_immutables;
    }

    // 3. metadata-stripped compare, only when variance is allowed and there
    //    are no immutables to worry about.
    let deployed_stripped = metadata::strip(&deployed);
    let compiled_stripped = metadata::strip(&compiled);
    if config.allow_metadata_variance && deployed_stripped == compiled_stripped {
        return true;
    }

    // 4. similarity fallback
    let ratio = similarity_ratio(deployed_stripped, compiled_stripped);
    ratio > config.threshold_without_immutables
}

/// *(number of positions i < min(|a|,|b|) with a[i]==b[i]) / max(|a|,|b|)*.
/// Byte-parallel (here, nibble-parallel over hex chars), no alignment.
/// Lies in `[0, 1]`; `0` for two nonempty, equal-length, fully-disjoint
/// strings; `1` only for equal-length, byte-equal strings. By convention,
/// empty vs. empty is defined as `1.0` (handled by the exact-equality short
/// circuit before this is ever reached in that case).
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 1.0;
    }
    let matching = a
        .chars()
        .zip(b.chars())
        .filter(|(ca, cb)| ca == cb)
        .count();
    matching as f64 / max_len as f64
}
