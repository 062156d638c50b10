//! Session layer errors

use thiserror::Error;

use crate::transport::TransportError;

/// Boxed error returned by attached session resources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Every validation problem found while building an agent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .problems.join("; "))]
pub struct OptionsError {
    pub problems: Vec<String>,
}

/// Errors surfaced by the session layer
#[derive(Debug, Error)]
pub enum AgentError {
    /// One or more builder options were invalid
    #[error("Invalid agent options: {0}")]
    InvalidOptions(#[from] OptionsError),

    /// The NDK endpoint could not be reached
    #[error("Failed to connect to NDK endpoint {endpoint}")]
    Connect {
        endpoint: String,
        #[source]
        source: TransportError,
    },

    /// Registration did not succeed within the retry budget
    #[error("Agent registration failed after {attempts} attempts")]
    RegistrationExhausted { attempts: u32 },

    /// Unregistration was rejected or could not be sent
    #[error("Agent unregistration failed: {message}")]
    Unregister { message: String },

    /// The category's queue already has its producer
    #[error("{category} notifications have already been started")]
    CategoryAlreadyStarted { category: &'static str },

    /// The session has been shut down
    #[error("Session has been shut down")]
    SessionClosed,

    /// Transport failure outside the cases above
    #[error(transparent)]
    Transport(#[from] TransportError),
}
