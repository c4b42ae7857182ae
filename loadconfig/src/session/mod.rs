//! Device session layer.
//!
//! [`DeviceSession`] is the capability interface the load workflow drives:
//! exactly the candidate-configuration operations it needs and nothing else.
//! [`NetconfSession`] implements it against Junos over NETCONF/SSH; tests
//! substitute a recording fake.

mod builder;
pub mod facts;
mod netconf;
pub mod payload;
pub mod rpc;

#[cfg(test)]
pub(crate) mod testing;

pub use builder::SessionBuilder;
pub use facts::{DeviceFacts, PlatformInfo};
pub use netconf::{CONFIRM_TIMEOUT_RANGE, NetconfSession};
pub use payload::{ConfigPayload, LoadAction, LoadFormat};

use std::fmt;
use std::future::Future;

use secrecy::SecretString;

use crate::error::Result;

/// Index into the device's rollback history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RollbackTarget(pub u32);

impl RollbackTarget {
    /// `rollback 0`: the active configuration; discards the candidate.
    pub const CANDIDATE: RollbackTarget = RollbackTarget(0);

    /// `rollback 1`: the generation before the most recent commit.
    pub const PREVIOUS: RollbackTarget = RollbackTarget(1);

    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for RollbackTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rollback {}", self.0)
    }
}

/// Login credentials for a device.
#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Operations on one authenticated device session.
///
/// Every call blocks the workflow until the device answers. `close()`
/// consumes the session, so a session can only ever be closed once.
pub trait DeviceSession: Send {
    /// Facts gathered at connect time.
    fn facts(&self) -> &DeviceFacts;

    /// Acquire exclusive access to the candidate configuration.
    fn lock(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Release the candidate lock.
    fn unlock(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Stage configuration into the candidate.
    fn load_config(&mut self, payload: &ConfigPayload) -> impl Future<Output = Result<()>> + Send;

    /// Validate the candidate without committing.
    fn commit_check(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Human-readable diff of candidate against active.
    fn config_delta(&mut self) -> impl Future<Output = Result<String>> + Send;

    /// Commit with automatic revert after `timeout_minutes` unless confirmed.
    fn commit_confirmed(&mut self, timeout_minutes: u32)
    -> impl Future<Output = Result<()>> + Send;

    /// Plain commit; makes a pending confirmed commit permanent.
    fn commit(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Restore a prior configuration generation.
    fn rollback(&mut self, target: RollbackTarget) -> impl Future<Output = Result<()>> + Send;

    /// End the session.
    fn close(self) -> impl Future<Output = Result<()>> + Send;
}

/// Opens device sessions.
pub trait Connector {
    type Session: DeviceSession;

    /// Establish an authenticated session to `target`.
    fn connect(
        &self,
        target: &str,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Self::Session>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_rollback_target_display() {
        assert_eq!(RollbackTarget::CANDIDATE.to_string(), "rollback 0");
        assert_eq!(RollbackTarget::PREVIOUS.index(), 1);
    }

    #[test]
    fn test_credentials_redacted() {
        let creds = Credentials::new("netops", "hunter2");
        assert_eq!(creds.password.expose_secret(), "hunter2");
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }
}
