//! SSH transport layer wrapping russh.
//!
//! This module provides the low-level SSH connection management,
//! handling connection setup, authentication, and opening the
//! `netconf` subsystem channel.

pub mod config;
mod ssh;

pub use config::{AuthMethod, HostKeyVerification, NETCONF_PORT, SshConfig};
pub use ssh::{NetconfStream, SshTransport};
