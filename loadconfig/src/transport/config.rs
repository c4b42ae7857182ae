//! Connection settings for the NETCONF SSH transport.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

/// IANA port for NETCONF over SSH (RFC 6242).
pub const NETCONF_PORT: u16 = 830;

/// How the server's host key is checked against known_hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostKeyVerification {
    /// Only hosts already present in known_hosts are accepted.
    Strict,

    /// Unknown hosts are trusted and recorded; a changed key is refused.
    #[default]
    AcceptNew,

    /// No checking at all. Lab devices only.
    Disabled,
}

/// Everything needed to reach and log in to one device.
#[derive(Debug)]
pub struct SshConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth: AuthMethod,

    /// Bound on connect and on every RPC reply.
    pub timeout: Duration,

    pub host_key_verification: HostKeyVerification,

    /// Overrides `~/.ssh/known_hosts`.
    pub known_hosts_path: Option<PathBuf>,
}

impl SshConfig {
    /// `host:port`, for logs.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Login method. Secrets stay wrapped until handed to russh.
#[derive(Debug)]
pub enum AuthMethod {
    Password(SecretString),

    /// Key file on disk, optionally encrypted.
    PrivateKey {
        path: PathBuf,
        passphrase: Option<SecretString>,
    },
}
