//! Interactive credential prompts.

use std::io::{self, BufRead, IsTerminal, Write};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

/// Ask for a value on stdin, echoing input. An empty answer is an error.
pub fn prompt_user(field: &str) -> io::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", field)?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let value = line.trim();
    if value.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "no value entered"));
    }
    Ok(value.to_string())
}

/// Ask for a password without echo.
///
/// Falls back to a plain line read when stdin is not a terminal.
pub fn prompt_password(field: &str) -> io::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", field)?;
    stdout.flush()?;

    if !io::stdin().is_terminal() {
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        return Ok(line.trim_end_matches(['\r', '\n']).to_string());
    }

    let password = {
        let _raw = RawMode::enable()?;
        read_hidden()?
    };
    writeln!(stdout)?;
    Ok(password)
}

fn read_hidden() -> io::Result<String> {
    let mut password = String::new();
    loop {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind,
            ..
        }) = event::read()?
        else {
            continue;
        };
        if kind == KeyEventKind::Release {
            continue;
        }
        match code {
            KeyCode::Enter => return Ok(password),
            KeyCode::Backspace => {
                password.pop();
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                return Err(io::Error::new(io::ErrorKind::Interrupted, "password entry cancelled"));
            }
            KeyCode::Char(c) => password.push(c),
            _ => {}
        }
    }
}

/// Terminal raw mode for the lifetime of the value.
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(RawMode)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            log::warn!("failed to restore terminal mode: {}", e);
        }
    }
}
