// ABOUTME: Closed error taxonomy for the runtime core.
// ABOUTME: Splits startup-fatal registration errors from user-reportable runtime failures.

use thiserror::Error;

use crate::events::MemberId;

/// Registration-time errors. Fatal at startup: the command table is built
/// once, before dispatch begins, and a bad table is a configuration bug.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate command registration: '{0}'")]
    DuplicateCommand(String),
}

/// Continuation engine errors.
#[derive(Debug, Error)]
pub enum ContinuationError {
    #[error("a prompt is already pending for {author}")]
    AlreadyPending { author: MemberId },
}

/// Failures surfaced while executing a command. All variants are non-fatal
/// to the event loop; their Display text is what the invoking channel sees.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("'{command}' needs at least {min} argument(s)")]
    MissingArgument { command: String, min: usize },

    #[error("could not resolve '{token}' to a known member")]
    ArgumentResolution { token: String },

    #[error("you already have a pending prompt; answer it first or wait for it to expire")]
    AlreadyPending,

    /// Unexpected failure inside a handler body. Caught at the invocation
    /// boundary; the channel gets a generic report, the log gets the cause.
    #[error("command failed")]
    Handler(#[from] anyhow::Error),
}

impl From<ContinuationError> for CommandError {
    fn from(_: ContinuationError) -> Self {
        CommandError::AlreadyPending
    }
}
