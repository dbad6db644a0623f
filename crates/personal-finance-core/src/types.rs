use serde::{Deserialize, Serialize};
use std::time::Instant;

/// All monetary values, always rounded to cents by the engines.
pub type Money = rust_decimal::Decimal;

/// Rates expressed as decimals (0.05 = 5%) unless a field name says `_pct`.
pub type Rate = rust_decimal::Decimal;

/// Precision tag reported on every computation.
pub const PRECISION: &str = "rust_decimal_128bit";

/// Envelope returned by every engine entry point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    /// Echo of the inputs that drove the result.
    pub assumptions: serde_json::Value,
    /// Non-fatal notes: clamped prepayments, capped deductions, partial periods.
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

impl<T: Serialize> ComputationOutput<T> {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Wrap a result in the envelope, timing it from `start`.
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    start: Instant,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: start.elapsed().as_micros() as u64,
            precision: PRECISION.to_string(),
        },
    }
}
