use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsError {
    #[error("subscription to {0:?} requires a session scoped to its own user")]
    UserScopeMismatch(crate::subscription::Topic),

    #[error("malformed client frame: {0}")]
    MalformedFrame(String),
}
