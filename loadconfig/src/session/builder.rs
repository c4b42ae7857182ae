//! Builder for opening NETCONF sessions.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use super::netconf::NetconfSession;
use super::{Connector, Credentials};
use crate::error::{Error, Result};
use crate::transport::config::{AuthMethod, HostKeyVerification, NETCONF_PORT, SshConfig};

/// Builder holding connection settings shared by every session it opens.
///
/// # Example
///
/// ```rust,no_run
/// use loadconfig::session::{Connector, Credentials, DeviceSession, SessionBuilder};
///
/// # async fn example() -> Result<(), loadconfig::Error> {
/// let credentials = Credentials::new("netops", "secret");
/// let session = SessionBuilder::new()
///     .port(830)
///     .connect("192.168.1.1", &credentials)
///     .await?;
/// println!("connected to {}", session.facts().hostname);
/// session.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SessionBuilder {
    port: u16,
    timeout: Duration,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    private_key: Option<(PathBuf, Option<SecretString>)>,
}

impl SessionBuilder {
    /// Create a builder with NETCONF defaults (port 830, 30s timeout).
    pub fn new() -> Self {
        Self {
            port: NETCONF_PORT,
            timeout: Duration::from_secs(30),
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            private_key: None,
        }
    }

    /// Set the SSH port (default: 830).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the connection and per-RPC timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the host key verification mode.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Use a specific known_hosts file instead of `~/.ssh/known_hosts`.
    pub fn known_hosts(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Authenticate with a private key instead of the password.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.private_key = Some((key_path.into(), None));
        self
    }

    /// Authenticate with an encrypted private key.
    pub fn private_key_with_passphrase(
        mut self,
        key_path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
    ) -> Self {
        self.private_key = Some((key_path.into(), Some(SecretString::from(passphrase.into()))));
        self
    }

    /// Whether key authentication is configured (no password needed).
    pub fn uses_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    /// Build the SSH configuration for one connection.
    pub fn ssh_config(&self, target: &str, credentials: &Credentials) -> Result<SshConfig> {
        if target.is_empty() {
            return Err(Error::InvalidConfig {
                message: "Router must be specified".to_string(),
            });
        }
        if credentials.username.is_empty() {
            return Err(Error::InvalidConfig {
                message: "Username is required".to_string(),
            });
        }

        let auth = match self.private_key {
            Some((ref path, ref passphrase)) => AuthMethod::PrivateKey {
                path: path.clone(),
                passphrase: passphrase
                    .as_ref()
                    .map(|p| SecretString::from(p.expose_secret().to_owned())),
            },
            None => AuthMethod::Password(SecretString::from(
                credentials.password.expose_secret().to_owned(),
            )),
        };

        Ok(SshConfig {
            host: target.to_string(),
            port: self.port,
            username: credentials.username.clone(),
            auth,
            timeout: self.timeout,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path.clone(),
        })
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for SessionBuilder {
    type Session = NetconfSession;

    async fn connect(&self, target: &str, credentials: &Credentials) -> Result<NetconfSession> {
        let config = self.ssh_config(target, credentials)?;
        NetconfSession::connect(config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let creds = Credentials::new("netops", "secret");
        let config = SessionBuilder::new().ssh_config("mx1", &creds).unwrap();
        assert_eq!(config.port, 830);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.host_key_verification, HostKeyVerification::AcceptNew);
        match config.auth {
            AuthMethod::Password(ref p) => assert_eq!(p.expose_secret(), "secret"),
            ref other => panic!("expected password auth, got {:?}", other),
        }
    }

    #[test]
    fn test_private_key_overrides_password() {
        let creds = Credentials::new("netops", "");
        let builder = SessionBuilder::new()
            .port(22)
            .private_key_with_passphrase("/home/netops/.ssh/id_ed25519", "pass")
            .known_hosts("/tmp/known_hosts")
            .host_key_verification(HostKeyVerification::Strict);
        assert!(builder.uses_private_key());

        let config = builder.ssh_config("mx1", &creds).unwrap();
        assert_eq!(config.socket_addr(), "mx1:22");
        assert_eq!(config.known_hosts_path, Some(PathBuf::from("/tmp/known_hosts")));
        assert!(matches!(config.auth, AuthMethod::PrivateKey { passphrase: Some(_), .. }));
    }

    #[test]
    fn test_requires_target_and_user() {
        let builder = SessionBuilder::new();
        assert!(builder.ssh_config("", &Credentials::new("netops", "x")).is_err());
        assert!(builder.ssh_config("mx1", &Credentials::new("", "x")).is_err());
    }
}
