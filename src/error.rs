use thiserror::Error;

/// Lifecycle misuse of a session. Mistyped characters are never errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("session is already complete; call reset_session before submitting more keystrokes")]
    AlreadyComplete,

    #[error("session was abandoned; call reset_session before submitting more keystrokes")]
    Abandoned,

    #[error("session text is empty; there is nothing to type")]
    EmptyText,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("markov order must be at least 1, got {0}")]
    InvalidOrder(usize),
}
