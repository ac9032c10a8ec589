use thiserror::Error;

/// Errors reported by the model-checking API.
///
/// All search and fixpoint routines are total over well-formed inputs; the
/// only runtime failures are name-resolution problems at the API boundary and
/// formula shapes a particular algorithm does not implement.
#[derive(Debug, Error)]
pub enum Error {
    /// The selected algorithm cannot evaluate this strategic operator.
    ///
    /// Only `backward` raises this, for `CAU`, `CAF`, `CEW` and `CEG`;
    /// pick another implementation for such formulas.
    #[error("unsupported formula for this implementation: {formula}")]
    UnsupportedOperator { formula: String },

    /// An atom that was never registered on the system.
    #[error("unknown atom: {0}")]
    UnknownAtom(String),

    /// An agent or group name that the system does not declare.
    #[error("unknown agent or group: {0}")]
    UnknownAgent(String),

    /// An implementation name outside `naive`, `partial`, `early`,
    /// `backward`, `symbolic`.
    #[error("unknown implementation: {0}")]
    UnknownImplementation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
