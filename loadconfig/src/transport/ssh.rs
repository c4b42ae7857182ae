//! SSH transport for NETCONF, built on russh.
//!
//! Connects, verifies the host key, logs in and hands out the byte stream of
//! the `netconf` subsystem. Framing and RPCs live above this layer.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use russh::ChannelStream;
use russh::client::{self, Handle, Msg};
use russh::keys::{self, PrivateKeyWithHashAlg, PublicKey};
use secrecy::{ExposeSecret, SecretString};

use super::config::{AuthMethod, HostKeyVerification, SshConfig};
use crate::error::{Result, TransportError};

/// Byte stream of an open `netconf` subsystem channel.
pub type NetconfStream = ChannelStream<Msg>;

/// SSH subsystem name registered for NETCONF (RFC 6242).
const NETCONF_SUBSYSTEM: &str = "netconf";

/// Keeps long operator pauses at the confirmation prompts from idling out.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// An authenticated SSH connection to one device.
pub struct SshTransport {
    handle: Handle<NetconfClient>,
    host: String,
}

impl SshTransport {
    /// Connect, verify the host key and authenticate.
    pub async fn connect(config: SshConfig) -> Result<Self> {
        let client_config = Arc::new(client::Config {
            inactivity_timeout: None,
            keepalive_interval: Some(KEEPALIVE_INTERVAL),
            ..Default::default()
        });

        let rejection = Arc::new(Mutex::new(None));
        let client = NetconfClient {
            known_hosts: KnownHosts {
                host: config.host.clone(),
                port: config.port,
                path: config.known_hosts_path.clone(),
            },
            policy: config.host_key_verification,
            rejection: Arc::clone(&rejection),
        };

        debug!("connecting to {}", config.socket_addr());
        let connecting = client::connect(client_config, (config.host.as_str(), config.port), client);
        let mut handle = match tokio::time::timeout(config.timeout, connecting).await {
            Err(_) => return Err(TransportError::Timeout(config.timeout).into()),
            Ok(Err(e)) => return Err(take_rejection(&rejection).unwrap_or(e).into()),
            Ok(Ok(handle)) => handle,
        };

        login(&mut handle, &config.username, &config.auth).await?;
        info!("authenticated to {} as {}", config.socket_addr(), config.username);

        Ok(Self {
            handle,
            host: config.host,
        })
    }

    /// Open a session channel and start the `netconf` subsystem on it.
    pub async fn open_netconf(&self) -> Result<NetconfStream> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(TransportError::from)?;
        channel
            .request_subsystem(true, NETCONF_SUBSYSTEM)
            .await
            .map_err(TransportError::from)?;

        debug!("netconf subsystem open on {}", self.host);
        Ok(channel.into_stream())
    }

    /// Disconnect.
    pub async fn close(self) -> Result<()> {
        debug!("disconnecting from {}", self.host);
        self.handle
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::from)?;
        Ok(())
    }
}

/// The detailed host-key error, if verification is why the handshake failed.
fn take_rejection(slot: &Mutex<Option<TransportError>>) -> Option<TransportError> {
    slot.lock().ok().and_then(|mut rejection| rejection.take())
}

async fn login(
    handle: &mut Handle<NetconfClient>,
    username: &str,
    auth: &AuthMethod,
) -> std::result::Result<(), TransportError> {
    let accepted = match auth {
        AuthMethod::Password(password) => handle
            .authenticate_password(username, password.expose_secret())
            .await?
            .success(),
        AuthMethod::PrivateKey { path, passphrase } => {
            let key = load_key(path, passphrase.as_ref())?;
            let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
            handle
                .authenticate_publickey(username, PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg))
                .await?
                .success()
        }
    };

    if accepted {
        Ok(())
    } else {
        Err(TransportError::AuthenticationFailed {
            user: username.to_string(),
        })
    }
}

fn load_key(
    path: &Path,
    passphrase: Option<&SecretString>,
) -> std::result::Result<keys::PrivateKey, TransportError> {
    keys::load_secret_key(path, passphrase.map(|p| p.expose_secret()))
        .map_err(|e| TransportError::Key(format!("{}: {}", path.display(), e)))
}

/// The known_hosts entry for one `host:port`.
struct KnownHosts {
    host: String,
    port: u16,
    path: Option<PathBuf>,
}

impl KnownHosts {
    /// `Ok(false)` when the host has no entry yet.
    fn contains(&self, key: &PublicKey) -> std::result::Result<bool, TransportError> {
        let checked = match self.path {
            Some(ref path) => keys::check_known_hosts_path(&self.host, self.port, key, path),
            None => keys::check_known_hosts(&self.host, self.port, key),
        };
        checked.map_err(|e| match e {
            keys::Error::KeyChanged { line } => TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            },
            other => TransportError::KnownHosts(other.to_string()),
        })
    }

    fn learn(&self, key: &PublicKey) -> std::result::Result<(), TransportError> {
        let learned = match self.path {
            Some(ref path) => {
                keys::known_hosts::learn_known_hosts_path(&self.host, self.port, key, path)
            }
            None => keys::known_hosts::learn_known_hosts(&self.host, self.port, key),
        };
        learned.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    /// Apply `policy` to the key the server presented.
    fn verify(
        &self,
        policy: HostKeyVerification,
        key: &PublicKey,
    ) -> std::result::Result<(), TransportError> {
        if policy == HostKeyVerification::Disabled {
            return Ok(());
        }
        if self.contains(key)? {
            return Ok(());
        }
        match policy {
            HostKeyVerification::Strict => Err(TransportError::HostKeyUnknown {
                host: self.host.clone(),
                port: self.port,
            }),
            _ => {
                info!("learning host key for {}:{}", self.host, self.port);
                if let Err(e) = self.learn(key) {
                    warn!("Failed to save host key: {}", e);
                }
                Ok(())
            }
        }
    }
}

/// russh client callbacks.
struct NetconfClient {
    known_hosts: KnownHosts,
    policy: HostKeyVerification,

    /// Where a refused host key is explained, since russh only reports
    /// `UnknownKey` to the caller.
    rejection: Arc<Mutex<Option<TransportError>>>,
}

impl client::Handler for NetconfClient {
    type Error = TransportError;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        match self.known_hosts.verify(self.policy, server_public_key) {
            Ok(()) => Ok(true),
            Err(e) => {
                if let Ok(mut slot) = self.rejection.lock() {
                    *slot = Some(e);
                }
                Ok(false)
            }
        }
    }
}
