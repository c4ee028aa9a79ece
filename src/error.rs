use thiserror::Error;

use crate::oracle::OracleError;

/// Failures a pipeline operation reports to its caller.
///
/// Decode failures in verse analysis never appear here; those paths fall
/// back to an identity grouping instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("oracle unavailable: {0}")]
    OracleUnavailable(#[from] OracleError),

    #[error(
        "transformed code seems incomplete ({transformed_lines} lines for {original_lines} input lines)"
    )]
    Incomplete {
        original_lines: usize,
        transformed_lines: usize,
    },

    #[error("no code provided")]
    EmptyInput,

    #[error("no text provided")]
    EmptyText,

    #[error("target verse count must be at least 1")]
    InvalidTargetCount,

    #[error("no string elements found in the array")]
    NoElements,
}
