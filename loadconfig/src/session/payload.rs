//! Configuration payload read from the operator's file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::PayloadError;

/// Syntax of the configuration text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadFormat {
    /// `set`/`delete` style commands, one per line.
    #[default]
    Set,
    /// Curly-brace configuration text.
    Text,
    /// Junos XML configuration.
    Xml,
}

/// How loaded configuration combines with the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadAction {
    /// Merge into the existing candidate.
    #[default]
    Merge,
    /// Replace the statements present in the payload.
    Replace,
}

impl fmt::Display for LoadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoadFormat::Set => "set",
            LoadFormat::Text => "text",
            LoadFormat::Xml => "xml",
        })
    }
}

impl fmt::Display for LoadAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoadAction::Merge => "merge",
            LoadAction::Replace => "replace",
        })
    }
}

/// Configuration text to stage into the candidate. Immutable once read.
#[derive(Debug, Clone)]
pub struct ConfigPayload {
    text: String,
    format: LoadFormat,
    action: LoadAction,
    source: Option<PathBuf>,
}

impl ConfigPayload {
    /// Build a payload from in-memory text.
    pub fn new(text: impl Into<String>, format: LoadFormat, action: LoadAction) -> Self {
        Self {
            text: text.into(),
            format,
            action,
            source: None,
        }
    }

    /// Read the payload from a file. The content is not parsed.
    pub fn read(
        path: impl AsRef<Path>,
        format: LoadFormat,
        action: LoadAction,
    ) -> Result<Self, PayloadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PayloadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            text,
            format,
            action,
            source: Some(path.to_path_buf()),
        })
    }

    /// Raw configuration text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn format(&self) -> LoadFormat {
        self.format
    }

    pub fn action(&self) -> LoadAction {
        self.action
    }

    /// File the payload was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Number of non-blank lines.
    pub fn line_count(&self) -> usize {
        self.text.lines().filter(|l| !l.trim().is_empty()).count()
    }

    /// Lines of a `set`-format payload that do not start with a known verb.
    ///
    /// Blank lines and `#` comments are ignored. Always empty for other formats.
    pub fn suspicious_lines(&self) -> Vec<(usize, &str)> {
        if self.format != LoadFormat::Set {
            return Vec::new();
        }
        let verbs = set_verb_pattern();
        self.text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
            .filter(|(_, line)| !verbs.is_match(line))
            .collect()
    }
}

fn set_verb_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(set|delete|activate|deactivate|annotate|insert|rename|copy|replace|protect|unprotect|edit|top|up)(\s|$)",
        )
        .expect("set verb pattern is a valid regex")
    })
}
