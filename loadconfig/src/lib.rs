//! # loadconfig
//!
//! Push a Junos configuration file to a device over NETCONF with a
//! two-phase confirmed commit.
//!
//! The load runs as lock → load → commit check → diff → operator
//! confirmation → `commit confirmed` → unlock → second confirmation → final
//! commit. Any failure or rejection rolls the device back, so an abandoned
//! change never outlives the run (and a lost connection is covered by the
//! device's own confirm timer).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use loadconfig::{
//!     ConsoleReporter, Credentials, PromptConfirm, SessionBuilder, WorkflowConfig, run_workflow,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = WorkflowConfig::new("192.0.2.1", "change.set");
//!     let credentials = Credentials::new("netops", "secret");
//!     let connector = SessionBuilder::new();
//!
//!     let outcome = run_workflow(
//!         &config,
//!         &credentials,
//!         &connector,
//!         &mut PromptConfirm::stdio(),
//!         &mut ConsoleReporter::new("loadconfig", "1.0.0"),
//!     )
//!     .await;
//!
//!     std::process::exit(outcome.exit_code().into());
//! }
//! ```

pub mod channel;
pub mod error;
pub mod session;
pub mod transport;
pub mod workflow;

// Re-export main types for convenience
pub use error::Error;
pub use session::{
    ConfigPayload, Connector, Credentials, DeviceFacts, DeviceSession, LoadAction, LoadFormat,
    NetconfSession, RollbackTarget, SessionBuilder,
};
pub use transport::{AuthMethod, HostKeyVerification, SshConfig};
pub use workflow::{
    Confirm, ConsoleReporter, Outcome, Phase, PromptConfirm, Reporter, WorkflowConfig,
    run_workflow,
};
