//! Two-phase confirmed-commit workflow.
//!
//! Drives one configuration push through
//! lock → load → check → diff → confirm → commit confirmed → unlock →
//! confirm → commit, compensating with a rollback on every failure or
//! rejection:
//!
//! ```text
//! CONNECTING ─► LOCKING ─► LOADING ─► CHECKING ─► DIFFING ─► CONFIRM_1
//!     │            │          │           │                    │   │
//!   exit 1       close      rollback 0 + unlock, exit 1     no │   │ yes
//!                exit 1                                        │   ▼
//!                       rollback 0 + unlock, exit 0 ◄──────────┘ COMMIT_CONFIRM ──fail──► rollback 0 + unlock, exit 1
//!                                                                  │ unlock
//!                                                                  ▼
//!                              rollback 1, exit 0 ◄──── no ──── CONFIRM_2
//!                                                                  │ yes
//!                                                                  ▼
//!                              rollback 0, exit 1 ◄──── fail ── COMMIT_FINAL ──► exit 0
//! ```
//!
//! The session is closed exactly once on every path that opened it.

mod confirm;
mod lock;
mod report;

pub use confirm::{Confirm, PromptConfirm, RETRY_HINT, parse_answer};
pub use lock::CandidateLock;
pub use report::{ConsoleReporter, Event, Reporter, SilentReporter};

use std::fmt;
use std::path::PathBuf;

use log::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::session::{
    CONFIRM_TIMEOUT_RANGE, ConfigPayload, Connector, Credentials, DeviceSession, LoadAction,
    LoadFormat, RollbackTarget,
};

/// Minutes before the device reverts an unconfirmed commit.
pub const DEFAULT_CONFIRM_TIMEOUT_MINUTES: u32 = 5;

/// Question asked after the diff is shown.
pub const FIRST_QUESTION: &str = "Commit changes? [yes/no]";

/// Question asked while the confirmed commit is pending.
pub const SECOND_QUESTION: &str = "Confirm commit changes? [yes/no]";

/// Settings for one run. Built once from the command line, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Device hostname or address.
    pub target: String,
    /// File holding the configuration to load.
    pub config_path: PathBuf,
    pub format: LoadFormat,
    pub action: LoadAction,
    pub confirm_timeout_minutes: u32,
}

impl WorkflowConfig {
    /// Set-format merge with the default 5 minute confirm timeout.
    pub fn new(target: impl Into<String>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            config_path: config_path.into(),
            format: LoadFormat::Set,
            action: LoadAction::Merge,
            confirm_timeout_minutes: DEFAULT_CONFIRM_TIMEOUT_MINUTES,
        }
    }

    pub fn with_format(mut self, format: LoadFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_action(mut self, action: LoadAction) -> Self {
        self.action = action;
        self
    }

    pub fn with_confirm_timeout(mut self, minutes: u32) -> Self {
        self.confirm_timeout_minutes = minutes;
        self
    }

    /// Reject settings that could only fail later, after the device is touched.
    pub fn validate(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "router must not be empty".to_string(),
            });
        }
        if self.config_path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig {
                message: "config file must not be empty".to_string(),
            });
        }
        if self.format == LoadFormat::Set && self.action == LoadAction::Replace {
            return Err(Error::InvalidConfig {
                message: "set-format loads cannot use replace; use text or xml format"
                    .to_string(),
            });
        }
        if !CONFIRM_TIMEOUT_RANGE.contains(&self.confirm_timeout_minutes) {
            return Err(Error::InvalidConfig {
                message: format!(
                    "confirm timeout must be 1-65535 minutes, got {}",
                    self.confirm_timeout_minutes
                ),
            });
        }
        Ok(())
    }
}

/// Workflow phases, named after the state they are in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    Locking,
    Loading,
    Checking,
    Diffing,
    FirstConfirmation,
    CommitConfirm,
    SecondConfirmation,
    FinalCommit,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Connecting => "Connect",
            Phase::Locking => "Lock",
            Phase::Loading => "Load",
            Phase::Checking => "Commit check",
            Phase::Diffing => "Diff",
            Phase::FirstConfirmation => "Commit prompt",
            Phase::CommitConfirm => "Commit confirmed",
            Phase::SecondConfirmation => "Final commit prompt",
            Phase::FinalCommit => "Final commit",
        })
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The change is permanently committed.
    Committed,
    /// The operator rejected the change at `phase` and it was rolled back.
    Declined { phase: Phase },
    /// A hard failure at `phase`; compensation has been attempted.
    Failed { phase: Phase, reason: String },
}

impl Outcome {
    /// Process exit status: 0 for commit or deliberate abort, 1 for failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Committed | Outcome::Declined { .. } => 0,
            Outcome::Failed { .. } => 1,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code() == 0
    }
}

/// Run one configuration push against `config.target`.
pub async fn run_workflow<C, P, R>(
    config: &WorkflowConfig,
    credentials: &Credentials,
    connector: &C,
    confirm: &mut P,
    reporter: &mut R,
) -> Outcome
where
    C: Connector,
    P: Confirm,
    R: Reporter,
{
    Workflow::new(config, confirm, reporter)
        .run(connector, credentials)
        .await
}

/// The workflow controller.
pub struct Workflow<'a, P, R> {
    config: &'a WorkflowConfig,
    confirm: &'a mut P,
    reporter: &'a mut R,
}

impl<'a, P: Confirm, R: Reporter> Workflow<'a, P, R> {
    pub fn new(config: &'a WorkflowConfig, confirm: &'a mut P, reporter: &'a mut R) -> Self {
        Self {
            config,
            confirm,
            reporter,
        }
    }

    /// Connect, drive the session to a terminal state, and close it.
    pub async fn run<C: Connector>(mut self, connector: &C, credentials: &Credentials) -> Outcome {
        let config = self.config;

        if let Err(e) = config.validate() {
            return self.failed(Phase::Connecting, &e);
        }

        self.reporter.report(&Event::Starting {
            target: &config.target,
            config_path: &config.config_path,
        });
        debug!("router: {}", config.target);
        debug!("config file: {}", config.config_path.display());

        // No session means nothing to compensate and nothing to close.
        let mut session = match connector.connect(&config.target, credentials).await {
            Ok(session) => session,
            Err(e) => return self.failed(Phase::Connecting, &e),
        };
        self.reporter.report(&Event::Connected {
            facts: session.facts(),
        });

        let outcome = self.drive(&mut session).await;

        if let Err(e) = session.close().await {
            warn!("closing session to {} failed: {}", config.target, e);
            self.reporter.report(&Event::CleanupFailed {
                action: "Close",
                error: &e,
            });
        }
        self.reporter.report(&Event::Closed {
            target: &config.target,
        });

        info!("{}: {:?}", config.target, outcome);
        outcome
    }

    async fn drive<S: DeviceSession>(&mut self, session: &mut S) -> Outcome {
        let config = self.config;

        self.reporter.report(&Event::Locking);
        let mut lock = match CandidateLock::acquire(&mut *session).await {
            Ok(lock) => lock,
            Err(e) => return self.failed(Phase::Locking, &e),
        };

        // A read or load failure is compensated like a failed check.
        let loaded = match ConfigPayload::read(&config.config_path, config.format, config.action) {
            Ok(payload) => {
                self.reporter.report(&Event::Loading {
                    config_path: &config.config_path,
                    lines: Some(payload.line_count()),
                });
                debug!("payload:\n{}", payload.text());
                for (line_no, line) in payload.suspicious_lines() {
                    warn!("line {} does not look like a set command: {}", line_no, line);
                }
                lock.session().load_config(&payload).await
            }
            Err(e) => {
                self.reporter.report(&Event::Loading {
                    config_path: &config.config_path,
                    lines: None,
                });
                Err(e.into())
            }
        };
        if let Err(e) = loaded {
            return self.abandon(lock, Phase::Loading, &e).await;
        }

        self.reporter.report(&Event::Checking);
        if let Err(e) = lock.session().commit_check().await {
            return self.abandon(lock, Phase::Checking, &e).await;
        }
        self.reporter.report(&Event::CheckPassed);

        let delta = match lock.session().config_delta().await {
            Ok(delta) => Some(delta),
            Err(e) => {
                warn!("no difference in config? {}", e);
                None
            }
        };
        self.reporter.report(&Event::Diff {
            delta: delta.as_deref(),
        });

        match self.confirm.confirm(FIRST_QUESTION) {
            Ok(true) => {}
            Ok(false) => {
                self.reporter.report(&Event::Declined {
                    phase: Phase::FirstConfirmation,
                });
                self.rollback(lock.session(), RollbackTarget::CANDIDATE)
                    .await;
                self.release(lock).await;
                return Outcome::Declined {
                    phase: Phase::FirstConfirmation,
                };
            }
            Err(e) => {
                return self
                    .abandon(lock, Phase::FirstConfirmation, &Error::Prompt(e))
                    .await;
            }
        }

        let minutes = config.confirm_timeout_minutes;
        self.reporter
            .report(&Event::CommitConfirming { minutes });
        if let Err(e) = lock.session().commit_confirmed(minutes).await {
            return self.abandon(lock, Phase::CommitConfirm, &e).await;
        }
        self.reporter.report(&Event::CommitConfirmed { minutes });

        // From here on the device reverts by itself unless the final commit lands.
        self.release(lock).await;

        self.reporter.report(&Event::AwaitingFinal);
        match self.confirm.confirm(SECOND_QUESTION) {
            Ok(true) => {}
            Ok(false) => {
                self.reporter.report(&Event::Declined {
                    phase: Phase::SecondConfirmation,
                });
                self.rollback(session, RollbackTarget::PREVIOUS).await;
                return Outcome::Declined {
                    phase: Phase::SecondConfirmation,
                };
            }
            Err(e) => {
                let outcome = self.failed(Phase::SecondConfirmation, &Error::Prompt(e));
                self.rollback(session, RollbackTarget::PREVIOUS).await;
                return outcome;
            }
        }

        self.reporter.report(&Event::Committing);
        if let Err(e) = session.commit().await {
            // Lock was released after the confirmed commit; only roll back.
            // Rollback 0 commits, and that commit confirms the pending change.
            let outcome = self.failed(Phase::FinalCommit, &e);
            self.rollback(session, RollbackTarget::CANDIDATE).await;
            self.reporter.report(&Event::CommitStateUnknown);
            return outcome;
        }
        self.reporter.report(&Event::Committed);

        Outcome::Committed
    }

    /// Report a hard failure and build its outcome.
    fn failed(&mut self, phase: Phase, error: &Error) -> Outcome {
        error!("{} failed: {}", phase, error);
        self.reporter.report(&Event::Failed { phase, error });
        Outcome::Failed {
            phase,
            reason: error.to_string(),
        }
    }

    /// Fail while the lock is held: rollback 0, then unlock.
    async fn abandon<S: DeviceSession>(
        &mut self,
        mut lock: CandidateLock<'_, S>,
        phase: Phase,
        error: &Error,
    ) -> Outcome {
        let outcome = self.failed(phase, error);
        self.rollback(lock.session(), RollbackTarget::CANDIDATE)
            .await;
        self.release(lock).await;
        outcome
    }

    /// Best-effort rollback; failure is reported, never propagated.
    async fn rollback<S: DeviceSession>(&mut self, session: &mut S, target: RollbackTarget) {
        self.reporter.report(&Event::RollingBack { target });
        match session.rollback(target).await {
            Ok(()) => self.reporter.report(&Event::RolledBack { target }),
            Err(e) => {
                error!("{} failed: {}", target, e);
                self.reporter.report(&Event::CleanupFailed {
                    action: "Rollback",
                    error: &e,
                });
            }
        }
    }

    /// Best-effort unlock; failure is reported, never propagated.
    async fn release<S: DeviceSession>(&mut self, lock: CandidateLock<'_, S>) {
        match lock.release().await {
            Ok(()) => self.reporter.report(&Event::Unlocked),
            Err(e) => {
                error!("unable to unlock candidate config: {}", e);
                self.reporter.report(&Event::CleanupFailed {
                    action: "Unlock",
                    error: &e,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::{self, Write};
    use std::path::Path;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::session::testing::FakeConnector;

    /// Confirm that replays scripted answers and runs dry with EOF.
    struct ScriptedConfirm {
        answers: VecDeque<io::Result<bool>>,
        questions: Vec<String>,
    }

    impl ScriptedConfirm {
        fn new(answers: &[bool]) -> Self {
            Self {
                answers: answers.iter().map(|a| Ok(*a)).collect(),
                questions: Vec::new(),
            }
        }
    }

    impl Confirm for ScriptedConfirm {
        fn confirm(&mut self, question: &str) -> io::Result<bool> {
            self.questions.push(question.to_string());
            self.answers
                .pop_front()
                .unwrap_or_else(|| Err(io::Error::from(io::ErrorKind::UnexpectedEof)))
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        events: Vec<&'static str>,
    }

    impl Reporter for RecordingReporter {
        fn report(&mut self, event: &Event<'_>) {
            self.events.push(match event {
                Event::Starting { .. } => "starting",
                Event::Connected { .. } => "connected",
                Event::Locking => "locking",
                Event::Loading { .. } => "loading",
                Event::Checking => "checking",
                Event::CheckPassed => "check_passed",
                Event::Diff { delta: Some(_) } => "diff",
                Event::Diff { delta: None } => "diff_missing",
                Event::CommitConfirming { .. } => "commit_confirming",
                Event::CommitConfirmed { .. } => "commit_confirmed",
                Event::Unlocked => "unlocked",
                Event::AwaitingFinal => "awaiting_final",
                Event::Committing => "committing",
                Event::Committed => "committed",
                Event::Declined { .. } => "declined",
                Event::RollingBack { .. } => "rolling_back",
                Event::RolledBack { .. } => "rolled_back",
                Event::CommitStateUnknown => "commit_state_unknown",
                Event::Failed { .. } => "failed",
                Event::CleanupFailed { .. } => "cleanup_failed",
                Event::Closed { .. } => "closed",
            });
        }
    }

    fn config_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "set system host-name lab-mx1-new").unwrap();
        writeln!(file, "set system ntp server 192.0.2.10").unwrap();
        file
    }

    struct Run {
        outcome: Outcome,
        calls: Vec<String>,
        questions: Vec<String>,
        events: Vec<&'static str>,
    }

    async fn run_with(connector: FakeConnector, path: &Path, answers: &[bool]) -> Run {
        let config = WorkflowConfig::new("lab-mx1", path);
        run_config(connector, &config, ScriptedConfirm::new(answers)).await
    }

    async fn run_config(
        connector: FakeConnector,
        config: &WorkflowConfig,
        mut confirm: ScriptedConfirm,
    ) -> Run {
        let credentials = Credentials::new("netops", "pw");
        let mut reporter = RecordingReporter::default();

        let outcome = run_workflow(config, &credentials, &connector, &mut confirm, &mut reporter).await;

        Run {
            outcome,
            calls: connector.calls(),
            questions: confirm.questions,
            events: reporter.events,
        }
    }

    #[test]
    fn test_outcome_exit_codes() {
        assert_eq!(Outcome::Committed.exit_code(), 0);
        assert_eq!(
            Outcome::Declined {
                phase: Phase::SecondConfirmation
            }
            .exit_code(),
            0
        );
        let failed = Outcome::Failed {
            phase: Phase::Locking,
            reason: "busy".to_string(),
        };
        assert_eq!(failed.exit_code(), 1);
        assert!(!failed.is_success());
    }

    #[test]
    fn test_config_validate() {
        assert!(WorkflowConfig::new("mx1", "change.set").validate().is_ok());
        assert!(WorkflowConfig::new("  ", "change.set").validate().is_err());
        assert!(WorkflowConfig::new("mx1", "").validate().is_err());
        assert!(
            WorkflowConfig::new("mx1", "change.set")
                .with_confirm_timeout(0)
                .validate()
                .is_err()
        );
        assert!(
            WorkflowConfig::new("mx1", "change.set")
                .with_action(LoadAction::Replace)
                .validate()
                .is_err()
        );
        assert!(
            WorkflowConfig::new("mx1", "change.conf")
                .with_format(LoadFormat::Text)
                .with_action(LoadAction::Replace)
                .validate()
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_accept_both_commits() {
        let file = config_file();
        let run = run_with(FakeConnector::new(), file.path(), &[true, true]).await;

        assert_eq!(run.outcome, Outcome::Committed);
        assert_eq!(
            run.calls,
            vec![
                "lock",
                "load_config",
                "commit_check",
                "config_delta",
                "commit_confirmed(5)",
                "unlock",
                "commit",
                "close",
            ]
        );
        assert_eq!(run.questions, vec![FIRST_QUESTION, SECOND_QUESTION]);
        assert!(!run.events.contains(&"rolling_back"));
        assert_eq!(run.events.last(), Some(&"closed"));
    }

    #[tokio::test]
    async fn test_payload_reaches_device() {
        let file = config_file();
        let connector = FakeConnector::new();
        let config = WorkflowConfig::new("lab-mx1", file.path());
        let credentials = Credentials::new("netops", "pw");
        let mut confirm = ScriptedConfirm::new(&[false]);

        run_workflow(
            &config,
            &credentials,
            &connector,
            &mut confirm,
            &mut SilentReporter,
        )
        .await;

        assert_eq!(
            connector.loaded(),
            vec!["set system host-name lab-mx1-new\nset system ntp server 192.0.2.10\n"]
        );
    }

    #[tokio::test]
    async fn test_reject_first_prompt_discards_candidate() {
        let file = config_file();
        let run = run_with(FakeConnector::new(), file.path(), &[false]).await;

        assert_eq!(
            run.outcome,
            Outcome::Declined {
                phase: Phase::FirstConfirmation
            }
        );
        assert_eq!(run.outcome.exit_code(), 0);
        assert_eq!(
            run.calls,
            vec![
                "lock",
                "load_config",
                "commit_check",
                "config_delta",
                "rollback(0)",
                "unlock",
                "close",
            ]
        );
        assert_eq!(run.questions, vec![FIRST_QUESTION]);
    }

    #[tokio::test]
    async fn test_reject_second_prompt_restores_previous() {
        let file = config_file();
        let run = run_with(FakeConnector::new(), file.path(), &[true, false]).await;

        assert_eq!(
            run.outcome,
            Outcome::Declined {
                phase: Phase::SecondConfirmation
            }
        );
        assert_eq!(run.outcome.exit_code(), 0);
        assert_eq!(
            run.calls,
            vec![
                "lock",
                "load_config",
                "commit_check",
                "config_delta",
                "commit_confirmed(5)",
                "unlock",
                "rollback(1)",
                "close",
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_check_rolls_back_without_prompting() {
        let file = config_file();
        let run = run_with(
            FakeConnector::new().failing("commit_check"),
            file.path(),
            &[true, true],
        )
        .await;

        assert!(matches!(
            run.outcome,
            Outcome::Failed {
                phase: Phase::Checking,
                ..
            }
        ));
        assert_eq!(run.outcome.exit_code(), 1);
        assert_eq!(
            run.calls,
            vec!["lock", "load_config", "commit_check", "rollback(0)", "unlock", "close"]
        );
        assert!(run.questions.is_empty());
        assert!(!run.calls.iter().any(|c| c.starts_with("commit_confirmed")));
    }

    #[tokio::test]
    async fn test_failed_commit_confirmed_rolls_back_and_unlocks() {
        let file = config_file();
        let run = run_with(
            FakeConnector::new().failing("commit_confirmed"),
            file.path(),
            &[true, true],
        )
        .await;

        assert!(matches!(
            run.outcome,
            Outcome::Failed {
                phase: Phase::CommitConfirm,
                ..
            }
        ));
        assert_eq!(
            run.calls,
            vec![
                "lock",
                "load_config",
                "commit_check",
                "config_delta",
                "commit_confirmed(5)",
                "rollback(0)",
                "unlock",
                "close",
            ]
        );
        assert_eq!(run.questions, vec![FIRST_QUESTION]);
    }

    #[tokio::test]
    async fn test_connect_failure_touches_nothing() {
        let file = config_file();
        let run = run_with(FakeConnector::new().failing("connect"), file.path(), &[]).await;

        assert!(matches!(
            run.outcome,
            Outcome::Failed {
                phase: Phase::Connecting,
                ..
            }
        ));
        assert!(run.calls.is_empty());
        assert!(!run.events.contains(&"closed"));
    }

    #[tokio::test]
    async fn test_lock_failure_only_closes() {
        let file = config_file();
        let run = run_with(FakeConnector::new().failing("lock"), file.path(), &[]).await;

        assert!(matches!(
            run.outcome,
            Outcome::Failed {
                phase: Phase::Locking,
                ..
            }
        ));
        assert_eq!(run.calls, vec!["lock", "close"]);
    }

    #[tokio::test]
    async fn test_load_failure_rolls_back_and_unlocks() {
        let file = config_file();
        let run = run_with(FakeConnector::new().failing("load_config"), file.path(), &[]).await;

        assert!(matches!(
            run.outcome,
            Outcome::Failed {
                phase: Phase::Loading,
                ..
            }
        ));
        assert_eq!(
            run.calls,
            vec!["lock", "load_config", "rollback(0)", "unlock", "close"]
        );
    }

    #[tokio::test]
    async fn test_unreadable_config_file_rolls_back_and_unlocks() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.set");
        let run = run_with(FakeConnector::new(), &missing, &[true, true]).await;

        match &run.outcome {
            Outcome::Failed { phase, reason } => {
                assert_eq!(*phase, Phase::Loading);
                assert!(reason.contains("missing.set"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(run.calls, vec!["lock", "rollback(0)", "unlock", "close"]);
    }

    #[tokio::test]
    async fn test_final_commit_failure_rolls_back_without_unlock() {
        let file = config_file();
        let run = run_with(FakeConnector::new().failing("commit"), file.path(), &[true, true]).await;

        assert!(matches!(
            run.outcome,
            Outcome::Failed {
                phase: Phase::FinalCommit,
                ..
            }
        ));
        assert_eq!(
            &run.calls[4..],
            &["commit_confirmed(5)", "unlock", "commit", "rollback(0)", "close"]
        );
        assert_eq!(run.calls.iter().filter(|c| *c == "unlock").count(), 1);
        assert_eq!(run.events.last(), Some(&"closed"));
        assert!(run.events.contains(&"commit_state_unknown"));
    }

    #[tokio::test]
    async fn test_unlock_failure_after_failed_check_keeps_outcome() {
        let file = config_file();
        let connector = FakeConnector::new().failing("commit_check").failing("unlock");
        let run = run_with(connector, file.path(), &[]).await;

        assert!(matches!(
            run.outcome,
            Outcome::Failed {
                phase: Phase::Checking,
                ..
            }
        ));
        assert_eq!(run.outcome.exit_code(), 1);
        assert!(run.events.contains(&"cleanup_failed"));
        assert!(!run.events.contains(&"unlocked"));
        assert_eq!(run.calls.iter().filter(|c| *c == "close").count(), 1);
        assert_eq!(run.calls.last().map(String::as_str), Some("close"));
    }

    #[tokio::test]
    async fn test_unlock_failure_after_rejection_keeps_outcome() {
        let file = config_file();
        let run = run_with(FakeConnector::new().failing("unlock"), file.path(), &[false]).await;

        assert_eq!(
            run.outcome,
            Outcome::Declined {
                phase: Phase::FirstConfirmation
            }
        );
        assert_eq!(run.outcome.exit_code(), 0);
        assert!(run.events.contains(&"cleanup_failed"));
        assert_eq!(&run.calls[4..], &["rollback(0)", "unlock", "close"]);
        assert_eq!(run.calls.iter().filter(|c| *c == "close").count(), 1);
    }

    #[tokio::test]
    async fn test_missing_diff_still_prompts() {
        let file = config_file();
        let run = run_with(
            FakeConnector::new().failing("config_delta"),
            file.path(),
            &[true, true],
        )
        .await;

        assert_eq!(run.outcome, Outcome::Committed);
        assert!(run.events.contains(&"diff_missing"));
        assert_eq!(run.questions.len(), 2);
    }

    #[tokio::test]
    async fn test_close_failure_keeps_outcome() {
        let file = config_file();
        let run = run_with(FakeConnector::new().failing("close"), file.path(), &[true, true]).await;

        assert_eq!(run.outcome, Outcome::Committed);
        assert_eq!(run.calls.iter().filter(|c| *c == "close").count(), 1);
        assert!(run.events.contains(&"cleanup_failed"));
    }

    #[tokio::test]
    async fn test_rollback_failure_keeps_outcome() {
        let file = config_file();
        let run = run_with(FakeConnector::new().failing("rollback"), file.path(), &[false]).await;

        assert_eq!(run.outcome.exit_code(), 0);
        assert!(run.events.contains(&"cleanup_failed"));
        assert!(!run.events.contains(&"rolled_back"));
        assert_eq!(&run.calls[4..], &["rollback(0)", "unlock", "close"]);
    }

    #[tokio::test]
    async fn test_closed_input_at_first_prompt_fails() {
        let file = config_file();
        let run = run_with(FakeConnector::new(), file.path(), &[]).await;

        assert!(matches!(
            run.outcome,
            Outcome::Failed {
                phase: Phase::FirstConfirmation,
                ..
            }
        ));
        assert_eq!(&run.calls[4..], &["rollback(0)", "unlock", "close"]);
    }

    #[tokio::test]
    async fn test_closed_input_at_second_prompt_restores_previous() {
        let file = config_file();
        let run = run_with(FakeConnector::new(), file.path(), &[true]).await;

        assert!(matches!(
            run.outcome,
            Outcome::Failed {
                phase: Phase::SecondConfirmation,
                ..
            }
        ));
        assert_eq!(&run.calls[5..], &["unlock", "rollback(1)", "close"]);
    }

    #[tokio::test]
    async fn test_custom_confirm_timeout() {
        let file = config_file();
        let config = WorkflowConfig::new("lab-mx1", file.path()).with_confirm_timeout(10);
        let run = run_config(FakeConnector::new(), &config, ScriptedConfirm::new(&[true, true])).await;

        assert!(run.calls.contains(&"commit_confirmed(10)".to_string()));
    }

    #[tokio::test]
    async fn test_invalid_config_never_connects() {
        let file = config_file();
        let config = WorkflowConfig::new("lab-mx1", file.path()).with_confirm_timeout(0);
        let run = run_config(FakeConnector::new(), &config, ScriptedConfirm::new(&[])).await;

        assert!(matches!(
            run.outcome,
            Outcome::Failed {
                phase: Phase::Connecting,
                ..
            }
        ));
        assert!(run.calls.is_empty());
    }
}
