use shelfscribe_session::SessionError;

/// Everything a driver's top frame catches and converts into a `SendError` +
/// `FailJobState` pair (§7 "Driver/internal").
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("session actor is gone")]
    SessionGone,
    #[error("{0}")]
    External(String),
}

impl From<SessionError> for DriverError {
    fn from(_: SessionError) -> Self {
        DriverError::SessionGone
    }
}
