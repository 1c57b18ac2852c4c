//! Replay script steps
//!
//! Each step is one line: `<dropdown> <command> [argument]`.
//!
//! | Command | Argument | Effect |
//! |---------|----------|--------|
//! | `open`, `close` | | lifecycle |
//! | `next`/`down`, `prev`/`up`, `first`/`home`, `last`/`end` | | move the cursor |
//! | `select`/`enter` | | toggle the active option |
//! | `type` | text | type-ahead, one character at a time |
//! | `key` | key name | interpret a key (`ArrowDown`, `Escape`, `x`, ...) |
//! | `search` | text (may be empty) | set the search term |
//! | `toggle` | option id | toggle an option by id |
//! | `clear` | | clear the value |
//! | `write` | JSON | write a value from the form side |
//! | `disable`, `enable` | | form-level disabled state |

use anyhow::{Context, Result};
use dropsel_select::{Key, NavCommand};
use serde_json::Value;
use std::fmt;

/// A parsed command
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Open,
    Close,
    Navigate(NavCommand),
    Select,
    Type(String),
    Key(Key),
    Search(String),
    Toggle(String),
    Clear,
    Write(Value),
    Disable,
    Enable,
}

/// One script line
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub target: String,
    pub command: Command,
    source: String,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Step {
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let mut parts = line.splitn(3, char::is_whitespace);
        let target = parts
            .next()
            .filter(|target| !target.is_empty())
            .context("Empty script step")?;
        let name = parts
            .next()
            .with_context(|| format!("Step '{}' has no command", line))?;
        let arg = parts.next().map(str::trim);

        let require = |what: &str| {
            arg.filter(|arg| !arg.is_empty())
                .with_context(|| format!("'{}' needs {} (in step '{}')", name, what, line))
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "open" => Command::Open,
            "close" => Command::Close,
            "next" | "down" => Command::Navigate(NavCommand::Next),
            "prev" | "up" => Command::Navigate(NavCommand::Prev),
            "first" | "home" => Command::Navigate(NavCommand::First),
            "last" | "end" => Command::Navigate(NavCommand::Last),
            "select" | "enter" => Command::Select,
            "type" => Command::Type(require("text")?.to_string()),
            "key" => {
                let key = require("a key name")?;
                Command::Key(Key::parse(key).with_context(|| format!("Unknown key '{}'", key))?)
            }
            "search" => Command::Search(arg.unwrap_or_default().to_string()),
            "toggle" => Command::Toggle(require("an option id")?.to_string()),
            "clear" => Command::Clear,
            "write" => {
                let json = require("a JSON value")?;
                Command::Write(
                    serde_json::from_str(json)
                        .with_context(|| format!("Invalid JSON in step '{}'", line))?,
                )
            }
            "disable" => Command::Disable,
            "enable" => Command::Enable,
            other => anyhow::bail!("Unknown command '{}' in step '{}'", other, line),
        };

        Ok(Self {
            target: target.to_string(),
            command,
            source: line.to_string(),
        })
    }
}

/// Parse every line, reporting the first failure with its position
pub fn parse_script(lines: &[String]) -> Result<Vec<Step>> {
    lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            Step::parse(line).with_context(|| format!("Script step {}", index + 1))
        })
        .collect()
}
