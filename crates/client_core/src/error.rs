use thiserror::Error;

/// Failure modes for the read-only collaborator endpoints (UID source,
/// roster store). "No UID yet" is not an error; it is `Ok(None)` from the
/// source, so the polling loop can never mistake it for an outage.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("protocol error: {0}")]
    Protocol(String),
}

#[derive(Debug, Clone, Error)]
pub enum RegistrationError {
    /// Non-2xx from the registration sink; the backend message is passed
    /// through verbatim so the operator sees exactly what was rejected.
    #[error("registration rejected: {message}")]
    Rejected { message: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
    #[error("no captured UID; wait for a scan before submitting")]
    NoCapturedUid,
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("login rejected: {0}")]
    Rejected(String),
    #[error("login response did not contain a token")]
    MissingToken,
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("transport error: {0}")]
    Transport(String),
}
