//! loadconfig - load Junos configuration with a confirmed commit
//!
//! Reads a configuration file, stages it on the router over NETCONF and walks
//! the operator through two confirmations before the change is made
//! permanent. See the library docs for the workflow itself.

mod cli;
mod prompt;

use std::process::ExitCode;

use clap::Parser;
use cli::Cli;
use loadconfig::{ConsoleReporter, Credentials, PromptConfirm, run_workflow};
use log::error;

const PROGRAM_NAME: &str = "loadconfig";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    let default_filter = if cli.debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = cli.workflow_config();
    if let Err(e) = config.validate() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    let credentials = match credentials(&cli) {
        Ok(credentials) => credentials,
        Err(message) => {
            error!("{}", message);
            return ExitCode::FAILURE;
        }
    };
    let connector = cli.session_builder();

    let outcome = run_workflow(
        &config,
        &credentials,
        &connector,
        &mut PromptConfirm::stdio(),
        &mut ConsoleReporter::new(PROGRAM_NAME, env!("CARGO_PKG_VERSION")),
    )
    .await;

    ExitCode::from(outcome.exit_code())
}

/// Credentials from flags, prompting for whatever is missing.
fn credentials(cli: &Cli) -> Result<Credentials, String> {
    let username = match cli.user {
        Some(ref user) => user.clone(),
        None => prompt::prompt_user("Username: ")
            .map_err(|e| format!("Username not provided: {}", e))?,
    };

    // With --key, --pass is the key passphrase and no password is used.
    let password = match (&cli.key, &cli.pass) {
        (Some(_), _) => String::new(),
        (None, Some(pass)) => pass.clone(),
        (None, None) => prompt::prompt_password("Password: ")
            .map_err(|e| format!("Password not provided: {}", e))?,
    };

    Ok(Credentials::new(username, password))
}
