//! Error types for the `settlement-economy` crate.

/// Errors that can occur while computing production or population deltas.
#[derive(Debug, thiserror::Error)]
pub enum EconomyError {
    /// Arithmetic overflow while evaluating a production or population
    /// formula.
    #[error("arithmetic overflow computing {context}")]
    ArithmeticOverflow {
        /// Description of what was being computed.
        context: &'static str,
    },
}
