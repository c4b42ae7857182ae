//! Operator-facing narration of workflow progress.
//!
//! The controller only emits [`Event`]s; how (or whether) they are shown is
//! up to the [`Reporter`]. Nothing a reporter does can influence control flow.

use std::path::Path;

use colored::Colorize;

use super::Phase;
use crate::error::Error;
use crate::session::{DeviceFacts, RollbackTarget};

/// Something the operator should be told about.
#[derive(Debug)]
pub enum Event<'a> {
    Starting { target: &'a str, config_path: &'a Path },
    Connected { facts: &'a DeviceFacts },
    Locking,
    Loading { config_path: &'a Path, lines: Option<usize> },
    Checking,
    CheckPassed,
    Diff { delta: Option<&'a str> },
    CommitConfirming { minutes: u32 },
    CommitConfirmed { minutes: u32 },
    Unlocked,
    AwaitingFinal,
    Committing,
    Committed,
    Declined { phase: Phase },
    RollingBack { target: RollbackTarget },
    RolledBack { target: RollbackTarget },
    /// The final commit failed while a confirmed commit was pending.
    CommitStateUnknown,
    Failed { phase: Phase, error: &'a Error },
    CleanupFailed { action: &'static str, error: &'a Error },
    Closed { target: &'a str },
}

/// Receives workflow events.
pub trait Reporter {
    fn report(&mut self, event: &Event<'_>);
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn report(&mut self, _event: &Event<'_>) {}
}

/// Colored terminal narration for interactive runs.
#[derive(Debug)]
pub struct ConsoleReporter {
    program: &'static str,
    version: &'static str,
}

impl ConsoleReporter {
    pub fn new(program: &'static str, version: &'static str) -> Self {
        Self { program, version }
    }

    fn hr() {
        println!("{}", "--".repeat(20));
    }
}

impl Reporter for ConsoleReporter {
    fn report(&mut self, event: &Event<'_>) {
        match event {
            Event::Starting {
                target,
                config_path,
            } => {
                println!("\n{} - {}", self.program.bright_green().bold(), self.version);
                Self::hr();
                println!("{}", "Starting session....".bright_cyan().bold());
                println!("{}", format!("\t     router:  {:<6}", target).bright_yellow());
                println!(
                    "{}",
                    format!("\tconfig file:  {:<6}", config_path.display()).bright_yellow()
                );
                Self::hr();
            }
            Event::Connected { facts } => {
                println!("{}", "\n------------------------".bright_cyan().bold());
                println!("{}", "Gathering system facts ...".bright_cyan().bold());
                println!("{}", "------------------------".bright_cyan().bold());
                println!("HOSTNAME :\t{:<10}", facts.hostname);
                for (re, platform) in &facts.platforms {
                    println!("      RE :\t{:<10}", re);
                    println!("   MODEL :\t{:<10}", platform.model);
                    println!("   JUNOS :\t{:<10}", platform.version);
                }
                Self::hr();
            }
            Event::Locking => println!("{}", "Locking candidate config".bright_yellow()),
            Event::Loading { config_path, lines } => {
                let detail = lines.map(|n| format!(" ({} lines)", n)).unwrap_or_default();
                println!(
                    "{}",
                    format!("Loading config from {}{} ...", config_path.display(), detail)
                        .bright_green()
                        .bold()
                );
            }
            Event::Checking => println!("Checking candidate config"),
            Event::CheckPassed => println!("candidate config is OK!"),
            Event::Diff { delta } => {
                println!("Config diff::");
                match delta {
                    Some(text) if !text.trim().is_empty() => println!("{}", text),
                    _ => println!("{}", "(no differences reported)".dimmed()),
                }
            }
            Event::CommitConfirming { minutes } => println!(
                "Committing changes with {} minute auto-rollback......",
                minutes
            ),
            Event::CommitConfirmed { minutes } => {
                println!("{}", "Commit SUCCESSFUL!".bright_green().bold());
                println!(
                    "{}",
                    format!(
                        "configuration will automatically rollback in {} mins",
                        minutes
                    )
                    .bright_yellow()
                );
            }
            Event::Unlocked => println!("{}", "Configuration Unlocked".bright_yellow()),
            Event::AwaitingFinal => {
                Self::hr();
                println!(
                    "{}",
                    "Validate device status before continuing!".bright_red().bold()
                );
                Self::hr();
            }
            Event::Committing => println!("Committing ......"),
            Event::Committed => {
                println!("{}", "Final commit is SUCCESSFUL!".bright_green().bold());
                Self::hr();
                println!("{}", "Goodbye!".bright_green().bold());
                Self::hr();
            }
            Event::Declined { phase } => {
                let message = match phase {
                    Phase::SecondConfirmation => "Commit not finalized",
                    _ => "Configuration not committed",
                };
                println!("{}", message.bright_red().bold());
            }
            Event::RollingBack { target } => {
                println!("{}", format!("Initiating {}", target).bright_red().bold())
            }
            Event::RolledBack { target } => println!(
                "{}",
                format!("{} committed", target).bright_yellow()
            ),
            Event::CommitStateUnknown => println!(
                "{}",
                "The rollback commit may have made the pending change permanent; verify the device configuration"
                    .bright_red()
                    .bold()
            ),
            Event::Failed { phase, error } => eprintln!(
                "{} {}",
                format!("{} FAILED:", phase).bright_red().bold(),
                error
            ),
            Event::CleanupFailed { action, error } => eprintln!(
                "{} {}",
                format!("{} failed, verify device state manually:", action)
                    .bright_red()
                    .bold(),
                error
            ),
            Event::Closed { target } => println!("Connection closed to: {}", target),
        }
    }
}
