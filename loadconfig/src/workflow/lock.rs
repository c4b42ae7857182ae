//! RAII guard for the candidate configuration lock.
//!
//! The guard holds `&mut S`, so while the lock is held every session call
//! goes through it, and `release()` consumes it, so an acquired lock is
//! unlocked at most once.

use log::{debug, warn};

use crate::error::Result;
use crate::session::DeviceSession;

/// Proof that this process holds the candidate lock.
pub struct CandidateLock<'a, S: DeviceSession> {
    session: &'a mut S,
    released: bool,
}

impl<'a, S: DeviceSession> CandidateLock<'a, S> {
    /// Lock the candidate configuration.
    pub async fn acquire(session: &'a mut S) -> Result<Self> {
        session.lock().await?;
        debug!("candidate configuration locked");
        Ok(Self {
            session,
            released: false,
        })
    }

    /// The locked session.
    pub fn session(&mut self) -> &mut S {
        &mut *self.session
    }

    /// Unlock the candidate, consuming the guard.
    pub async fn release(mut self) -> Result<()> {
        self.released = true;
        self.session.unlock().await?;
        debug!("candidate configuration unlocked");
        Ok(())
    }
}

impl<S: DeviceSession> Drop for CandidateLock<'_, S> {
    fn drop(&mut self) {
        if !self.released {
            warn!("candidate lock dropped without unlock; it is released when the session closes");
        }
    }
}
