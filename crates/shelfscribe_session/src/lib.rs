//! The per-job Session actor, its handle, and the Registry that owns one Session per
//! `jobId` at a time (§4.E, §4.F).

mod actor;
mod alarm;
mod command;
mod error;
mod handle;
mod outbound;
mod registry;
pub mod socket;

pub use alarm::AlarmHandler;
pub use command::{JobPatch, ReadyOutcome, RefreshedToken};
pub use error::{BatchError, RefreshError, SessionError, UpgradeError};
pub use handle::SessionHandle;
pub use registry::Registry;
