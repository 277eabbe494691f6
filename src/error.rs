use thiserror::Error;

/// Result alias for errors emitted by without internals.
pub type WithoutResult<T> = Result<T, WithoutError>;

/// Structured error type for without subsystems.
#[derive(Debug, Error)]
pub enum WithoutError {
    /// The input tree cannot be rewritten: a `With` block without a governing
    /// expression, or a binding name that is not an identifier.
    #[error("malformed input: {0}")]
    MalformedInput(String),
}

impl WithoutError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedInput(msg.into())
    }

    pub fn is_malformed_input(&self) -> bool {
        matches!(self, Self::MalformedInput(_))
    }
}

/// Mirrors `anyhow::ensure!`, failing with [`WithoutError::MalformedInput`].
#[macro_export]
macro_rules! ensure_well_formed {
    ($cond:expr, $($arg:tt)*) => {
        if !($cond) {
            return Err($crate::error::WithoutError::malformed(format!($($arg)*)));
        }
    };
}
