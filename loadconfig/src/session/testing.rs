//! Recording fake session for workflow tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use super::facts::{DeviceFacts, PlatformInfo};
use super::payload::ConfigPayload;
use super::{Connector, Credentials, DeviceSession, RollbackTarget};
use crate::error::{NetconfError, Result, TransportError};

/// Shared, ordered log of session calls such as `"lock"` or `"rollback(1)"`.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Connector handing out [`FakeSession`]s that fail the named operations.
pub struct FakeConnector {
    failing: HashSet<&'static str>,
    calls: CallLog,
    loaded: Arc<Mutex<Vec<String>>>,
}

impl FakeConnector {
    /// A connector whose sessions succeed at everything.
    pub fn new() -> Self {
        Self {
            failing: HashSet::new(),
            calls: Arc::default(),
            loaded: Arc::default(),
        }
    }

    /// Make an operation fail. Names: `connect`, `lock`, `unlock`,
    /// `load_config`, `commit_check`, `config_delta`, `commit_confirmed`,
    /// `commit`, `rollback`, `close`.
    pub fn failing(mut self, operation: &'static str) -> Self {
        self.failing.insert(operation);
        self
    }

    /// Calls made so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls with the given name (arguments included).
    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    /// Payload texts passed to `load_config`.
    pub fn loaded(&self) -> Vec<String> {
        self.loaded.lock().unwrap().clone()
    }
}

impl Connector for FakeConnector {
    type Session = FakeSession;

    async fn connect(&self, target: &str, credentials: &Credentials) -> Result<FakeSession> {
        if self.failing.contains("connect") {
            return Err(TransportError::AuthenticationFailed {
                user: credentials.username.clone(),
            }
            .into());
        }
        let mut facts = DeviceFacts {
            hostname: target.to_string(),
            ..Default::default()
        };
        facts.platforms.insert(
            "re0".to_string(),
            PlatformInfo {
                model: "vmx".to_string(),
                version: "23.2R1.13".to_string(),
            },
        );
        Ok(FakeSession {
            failing: self.failing.clone(),
            calls: self.calls.clone(),
            loaded: self.loaded.clone(),
            facts,
        })
    }
}

/// Session that records every call and fails the scripted ones.
pub struct FakeSession {
    failing: HashSet<&'static str>,
    calls: CallLog,
    loaded: Arc<Mutex<Vec<String>>>,
    facts: DeviceFacts,
}

impl FakeSession {
    fn record(&self, operation: &'static str, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.contains(operation) {
            return Err(NetconfError::Rpc {
                operation: operation.to_string(),
                message: "scripted failure".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl DeviceSession for FakeSession {
    fn facts(&self) -> &DeviceFacts {
        &self.facts
    }

    async fn lock(&mut self) -> Result<()> {
        self.record("lock", "lock".to_string())
    }

    async fn unlock(&mut self) -> Result<()> {
        self.record("unlock", "unlock".to_string())
    }

    async fn load_config(&mut self, payload: &ConfigPayload) -> Result<()> {
        self.loaded.lock().unwrap().push(payload.text().to_string());
        self.record("load_config", "load_config".to_string())
    }

    async fn commit_check(&mut self) -> Result<()> {
        self.record("commit_check", "commit_check".to_string())
    }

    async fn config_delta(&mut self) -> Result<String> {
        self.record("config_delta", "config_delta".to_string())?;
        Ok("[edit system]\n+  host-name lab-mx1-new;".to_string())
    }

    async fn commit_confirmed(&mut self, timeout_minutes: u32) -> Result<()> {
        self.record(
            "commit_confirmed",
            format!("commit_confirmed({})", timeout_minutes),
        )
    }

    async fn commit(&mut self) -> Result<()> {
        self.record("commit", "commit".to_string())
    }

    async fn rollback(&mut self, target: RollbackTarget) -> Result<()> {
        self.record("rollback", format!("rollback({})", target.index()))
    }

    async fn close(self) -> Result<()> {
        self.record("close", "close".to_string())
    }
}
