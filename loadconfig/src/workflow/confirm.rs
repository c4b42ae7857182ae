//! Yes/no confirmation prompt.

use std::io::{self, BufRead, Write};

/// Answers that accept.
const YES: [&str; 5] = ["y", "Y", "yes", "Yes", "YES"];

/// Answers that reject.
const NO: [&str; 5] = ["n", "N", "no", "No", "NO"];

/// Printed after an unrecognized answer.
pub const RETRY_HINT: &str = "Please type yes or no and then press enter:";

/// Source of operator decisions.
pub trait Confirm {
    /// Ask `question` and block until the operator accepts or rejects.
    fn confirm(&mut self, question: &str) -> io::Result<bool>;
}

/// Map one line of input to a decision; `None` means ask again.
pub fn parse_answer(input: &str) -> Option<bool> {
    let answer = input.trim();
    if YES.contains(&answer) {
        Some(true)
    } else if NO.contains(&answer) {
        Some(false)
    } else {
        None
    }
}

/// Line-based prompt over any reader/writer pair (stdin/stdout in the binary).
///
/// Re-asks until a recognized answer arrives; there is no retry limit.
pub struct PromptConfirm<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl PromptConfirm<io::StdinLock<'static>, io::Stdout> {
    /// Prompt on the process terminal.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Confirm for PromptConfirm<R, W> {
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        writeln!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        loop {
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "input closed before an answer was given",
                ));
            }
            match parse_answer(&line) {
                Some(answer) => return Ok(answer),
                None => {
                    writeln!(self.output, "{}", RETRY_HINT)?;
                    self.output.flush()?;
                }
            }
        }
    }
}
