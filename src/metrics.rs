//! Ambient instrumentation: `verify` call counts by outcome classification
//! and call duration. No HTTP exposition endpoint is built here -- that is
//! the excluded API-surface layer's concern -- but the registry is public
//! so an embedding service can scrape it, mirroring the corpus's own
//! `prometheus` + `lazy_static`-registered metrics.

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_histogram, CounterVec, Histogram};

lazy_static! {
    pub static ref VERIFY_TOTAL: CounterVec = register_counter_vec!(
        "contract_verifier_verify_total",
        "Number of verify calls, by outcome classification",
        &["classification"]
    )
    .expect("metric names and labels are valid");
    pub static ref VERIFY_DURATION_SECONDS: Histogram = register_histogram!(
        "contract_verifier_verify_duration_seconds",
        "Duration of verify calls in seconds"
    )
    .expect("metric name is valid");
}
