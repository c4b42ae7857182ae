//! Junos NETCONF session.
//!
//! Speaks NETCONF base:1.0 over the SSH `netconf` subsystem. The session is
//! generic over its byte stream so the RPC sequencing can be exercised against
//! a scripted stream in tests; real sessions use [`NetconfStream`].

use std::time::Duration;

use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};

use super::facts::DeviceFacts;
use super::payload::ConfigPayload;
use super::rpc::{self, Hello, Rpc, RpcReply};
use super::{DeviceSession, RollbackTarget};
use crate::channel::FramedChannel;
use crate::error::{Error, NetconfError, Result};
use crate::transport::{NetconfStream, SshConfig, SshTransport};

/// Junos accepts `commit confirmed` timeouts of 1 to 65535 minutes.
pub const CONFIRM_TIMEOUT_RANGE: std::ops::RangeInclusive<u32> = 1..=65535;

/// An open NETCONF session to one Junos device.
pub struct NetconfSession<S = NetconfStream> {
    /// Framed message channel.
    channel: FramedChannel<S>,

    /// SSH connection carrying the channel (None for bare streams).
    transport: Option<SshTransport>,

    /// Facts gathered after the hello exchange.
    facts: DeviceFacts,

    /// Session id assigned by the device.
    session_id: Option<u64>,

    /// Message-id for the next request.
    next_message_id: u64,

    /// Device address, for log context.
    host: String,
}

impl NetconfSession<NetconfStream> {
    /// Connect over SSH, start the `netconf` subsystem and exchange hellos.
    pub async fn connect(config: SshConfig) -> Result<Self> {
        let host = config.host.clone();
        let timeout = config.timeout;

        let transport = SshTransport::connect(config).await?;
        let stream = match transport.open_netconf().await {
            Ok(stream) => stream,
            Err(e) => {
                let _ = transport.close().await;
                return Err(e);
            }
        };

        match Self::establish(stream, host, timeout).await {
            Ok(mut session) => {
                session.transport = Some(transport);
                Ok(session)
            }
            Err(e) => {
                let _ = transport.close().await;
                Err(e)
            }
        }
    }
}

impl<S> NetconfSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Run the hello exchange on an already open stream and gather facts.
    pub async fn establish(stream: S, host: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut session = Self {
            channel: FramedChannel::new(stream, timeout),
            transport: None,
            facts: DeviceFacts::default(),
            session_id: None,
            next_message_id: 1,
            host: host.into(),
        };

        session.channel.send(&rpc::hello()).await?;
        let hello = Hello::parse(&session.channel.recv().await?)?;
        if !hello.supports_base_1_0() {
            return Err(NetconfError::Protocol {
                message: "device does not offer NETCONF base:1.0".to_string(),
            }
            .into());
        }
        session.session_id = hello.session_id;
        debug!(
            "netconf session {:?} established with {}",
            session.session_id, session.host
        );

        // Facts are informational; a restricted login class may not be allowed
        // to run get-software-information.
        match session.call(Rpc::GetSoftwareInformation).await {
            Ok(reply) => session.facts = DeviceFacts::from_software_information(reply.root()),
            Err(e) => warn!("unable to gather facts from {}: {}", session.host, e),
        }

        Ok(session)
    }

    /// Session id assigned by the device in its hello.
    pub fn session_id(&self) -> Option<u64> {
        self.session_id
    }

    /// Send one RPC and wait for its reply.
    async fn call(&mut self, rpc: Rpc<'_>) -> Result<RpcReply> {
        let message_id = self.next_message_id;
        self.next_message_id += 1;

        debug!("{}: {} (message-id {})", self.host, rpc.name(), message_id);
        self.channel.send(&rpc.to_xml(message_id)).await?;

        let limit = self.channel.timeout();
        let reply = tokio::time::timeout(limit, self.read_reply(message_id))
            .await
            .map_err(|_| NetconfError::Timeout(limit))??;

        Ok(reply.check(rpc.name())?)
    }

    /// Read replies until the one for `message_id` arrives.
    ///
    /// Replies to earlier requests that timed out are still in flight and
    /// are dropped here, so one slow RPC does not poison every later call.
    async fn read_reply(&mut self, message_id: u64) -> Result<RpcReply> {
        loop {
            let reply = RpcReply::parse(&self.channel.recv().await?)?;
            let Some(ref id) = reply.message_id else {
                return Ok(reply);
            };
            match id.parse::<u64>() {
                Ok(id) if id == message_id => return Ok(reply),
                Ok(id) if id < message_id => {
                    warn!("{}: discarding late reply to message-id {}", self.host, id);
                }
                _ => {
                    return Err(NetconfError::Protocol {
                        message: format!(
                            "reply message-id {} does not match request {}",
                            id, message_id
                        ),
                    }
                    .into());
                }
            }
        }
    }
}

impl<S> DeviceSession for NetconfSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn facts(&self) -> &DeviceFacts {
        &self.facts
    }

    async fn lock(&mut self) -> Result<()> {
        self.call(Rpc::Lock).await.map(|_| ())
    }

    async fn unlock(&mut self) -> Result<()> {
        self.call(Rpc::Unlock).await.map(|_| ())
    }

    async fn load_config(&mut self, payload: &ConfigPayload) -> Result<()> {
        debug!(
            "loading {} lines from {} ({} format, {})",
            payload.line_count(),
            payload
                .source()
                .map_or_else(|| "memory".into(), |path| path.display().to_string()),
            payload.format(),
            payload.action()
        );
        self.call(Rpc::LoadConfiguration(payload)).await.map(|_| ())
    }

    async fn commit_check(&mut self) -> Result<()> {
        self.call(Rpc::CommitCheck).await.map(|_| ())
    }

    async fn config_delta(&mut self) -> Result<String> {
        let reply = self.call(Rpc::CompareRollback(0)).await?;
        Ok(reply
            .root()
            .find("configuration-output")
            .map(|node| node.text().to_string())
            .unwrap_or_default())
    }

    async fn commit_confirmed(&mut self, timeout_minutes: u32) -> Result<()> {
        if !CONFIRM_TIMEOUT_RANGE.contains(&timeout_minutes) {
            return Err(Error::InvalidConfig {
                message: format!(
                    "commit confirmed timeout must be 1-65535 minutes, got {}",
                    timeout_minutes
                ),
            });
        }
        self.call(Rpc::CommitConfirmed(timeout_minutes))
            .await
            .map(|_| ())
    }

    async fn commit(&mut self) -> Result<()> {
        self.call(Rpc::Commit).await.map(|_| ())
    }

    /// Load the rollback generation into the candidate and commit it.
    ///
    /// Committing is what makes `rollback 1` cancel a pending confirmed
    /// commit instead of waiting for the device timer.
    async fn rollback(&mut self, target: RollbackTarget) -> Result<()> {
        info!("{}: {}", self.host, target);
        self.call(Rpc::LoadRollback(target.index())).await?;
        self.call(Rpc::Commit).await.map(|_| ())
    }

    async fn close(mut self) -> Result<()> {
        let result = self.call(Rpc::CloseSession).await.map(|_| ());
        if let Err(ref e) = result {
            debug!("close-session on {} failed: {}", self.host, e);
        }
        if self.channel.has_unread() {
            debug!("{}: unread data left on channel at close", self.host);
        }
        if let Err(e) = self.channel.shutdown().await {
            debug!("channel shutdown on {} failed: {}", self.host, e);
        }
        if let Some(transport) = self.transport.take() {
            transport.close().await?;
        }
        result
    }
}
