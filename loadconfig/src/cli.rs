//! CLI argument parsing

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use loadconfig::session::{LoadAction, LoadFormat, SessionBuilder};
use loadconfig::transport::{HostKeyVerification, NETCONF_PORT};
use loadconfig::workflow::{DEFAULT_CONFIRM_TIMEOUT_MINUTES, WorkflowConfig};

#[derive(Parser, Debug)]
#[command(name = "loadconfig")]
#[command(version, about = "Loads Juniper Junos configuration from --config file", long_about = None)]
pub struct Cli {
    /// Router hostname or IP address
    #[arg(short, long)]
    pub router: String,

    /// Junos configuration commands file
    #[arg(short, long)]
    pub config: PathBuf,

    /// Username (prompted when omitted)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Password, or key passphrase with --key (prompted when omitted)
    #[arg(short, long)]
    pub pass: Option<String>,

    /// Enable debugging
    #[arg(short, long)]
    pub debug: bool,

    /// NETCONF over SSH port
    #[arg(long, default_value_t = NETCONF_PORT)]
    pub port: u16,

    /// Minutes before an unconfirmed commit is rolled back by the device
    #[arg(long, default_value_t = DEFAULT_CONFIRM_TIMEOUT_MINUTES,
          value_parser = clap::value_parser!(u32).range(1..=65535))]
    pub confirm_minutes: u32,

    /// Connect and per-RPC timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Host key verification policy
    #[arg(long, value_enum, default_value_t = HostKeyCheck::AcceptNew)]
    pub host_key_check: HostKeyCheck,

    /// known_hosts file (default: ~/.ssh/known_hosts)
    #[arg(long)]
    pub known_hosts: Option<PathBuf>,

    /// Authenticate with this private key instead of a password
    #[arg(long)]
    pub key: Option<PathBuf>,

    /// Format of the configuration file
    #[arg(long, value_enum, default_value_t = Format::Set)]
    pub format: Format,

    /// Replace matching hierarchies instead of merging (text and xml formats)
    #[arg(long)]
    pub replace: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKeyCheck {
    /// Reject hosts missing from known_hosts
    Strict,
    /// Trust and record unknown hosts, reject changed keys
    AcceptNew,
    /// Accept any host key
    Disabled,
}

impl From<HostKeyCheck> for HostKeyVerification {
    fn from(check: HostKeyCheck) -> Self {
        match check {
            HostKeyCheck::Strict => HostKeyVerification::Strict,
            HostKeyCheck::AcceptNew => HostKeyVerification::AcceptNew,
            HostKeyCheck::Disabled => HostKeyVerification::Disabled,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `set` / `delete` commands
    Set,
    /// Curly-brace configuration text
    Text,
    /// Junos XML configuration
    Xml,
}

impl From<Format> for LoadFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Set => LoadFormat::Set,
            Format::Text => LoadFormat::Text,
            Format::Xml => LoadFormat::Xml,
        }
    }
}

impl Cli {
    /// The immutable run settings.
    pub fn workflow_config(&self) -> WorkflowConfig {
        let action = if self.replace {
            LoadAction::Replace
        } else {
            LoadAction::Merge
        };
        WorkflowConfig::new(self.router.clone(), self.config.clone())
            .with_format(self.format.into())
            .with_action(action)
            .with_confirm_timeout(self.confirm_minutes)
    }

    /// Connection settings; the key passphrase, if any, comes from `--pass`.
    pub fn session_builder(&self) -> SessionBuilder {
        let mut builder = SessionBuilder::new()
            .port(self.port)
            .timeout(Duration::from_secs(self.timeout))
            .host_key_verification(self.host_key_check.into());
        if let Some(ref path) = self.known_hosts {
            builder = builder.known_hosts(path);
        }
        match (&self.key, &self.pass) {
            (Some(key), Some(passphrase)) => {
                builder.private_key_with_passphrase(key, passphrase.as_str())
            }
            (Some(key), None) => builder.private_key(key),
            (None, _) => builder,
        }
    }
}
