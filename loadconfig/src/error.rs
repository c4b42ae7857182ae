//! Error types for loadconfig.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for loadconfig operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// NETCONF framing and RPC errors
    #[error("NETCONF error: {0}")]
    Netconf(#[from] NetconfError),

    /// Configuration payload errors
    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    /// The operator prompt could not be read
    #[error("Prompt failed: {0}")]
    Prompt(#[source] io::Error),

    /// Invalid settings supplied by the caller
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host is not present in known_hosts (strict checking)
    #[error("Host key for {host}:{port} is not known")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the known_hosts entry
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// NETCONF layer errors (framing, XML, rpc-error replies).
#[derive(Error, Debug)]
pub enum NetconfError {
    /// The peer closed the stream before a complete message arrived
    #[error("Session closed by peer")]
    Closed,

    /// No complete message within the deadline
    #[error("No reply within {0:?}")]
    Timeout(std::time::Duration),

    /// Malformed XML in a reply
    #[error("Malformed reply: {0}")]
    Xml(String),

    /// Reply did not follow the protocol (wrong message-id, missing hello...)
    #[error("Protocol violation: {message}")]
    Protocol { message: String },

    /// Device answered with one or more rpc-error elements
    #[error("{operation} failed: {message}")]
    Rpc { operation: String, message: String },

    /// Stream I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Configuration payload errors.
#[derive(Error, Debug)]
pub enum PayloadError {
    /// The configuration file could not be read
    #[error("Unable to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type alias using loadconfig's Error.
pub type Result<T> = std::result::Result<T, Error>;
