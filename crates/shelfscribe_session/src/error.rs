use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("another refresh is already in progress")]
    InProgress,
    #[error("auth token does not match the stored value")]
    Invalid,
    #[error("auth token has expired")]
    Expired,
    #[error("refresh requested too early")]
    TooEarly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UpgradeError {
    #[error("missing or malformed auth token")]
    Unauthorized,
    #[error("auth token expired")]
    Expired,
    #[error("a socket is already attached to this job")]
    AlreadyAttached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("photo index {index} out of range for {count} photos")]
    IndexOutOfRange { index: usize, count: usize },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session actor task has shut down")]
    Gone,
}
